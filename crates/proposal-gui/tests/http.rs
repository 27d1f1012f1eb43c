use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use axum_test::TestServer;
use proposal_core::{
    Actor, ActorRuntime, BoundTool, ProposalError, SearchHit, SearchProvider, StageRequest,
    Toolkit,
};
use proposal_gui::routes::build_router;
use proposal_gui::state::AppState;
use serde_json::{Value, json};
use tempfile::TempDir;

struct StubSearch {
    fail: bool,
}

#[async_trait]
impl SearchProvider for StubSearch {
    async fn search(&self, _query: &str) -> Result<Vec<SearchHit>, ProposalError> {
        if self.fail {
            return Err(ProposalError::Search("quota exceeded".into()));
        }
        Ok(vec![SearchHit {
            title: "Retail demand forecasting".into(),
            url: "https://www.kaggle.com/datasets/retail-demand".into(),
            content: "weekly store sales".into(),
            score: None,
        }])
    }
}

#[derive(Default)]
struct StubRuntime {
    calls: AtomicUsize,
    /// Extra text appended to every stage answer.
    trailer: &'static str,
}

#[async_trait]
impl ActorRuntime for StubRuntime {
    async fn invoke(&self, actor: &Actor, request: &StageRequest) -> Result<String, ProposalError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let mut lines = vec![format!("## {}", request.stage)];
        for tool in actor.tools() {
            if let BoundTool::Search(search) = tool {
                for hit in search.search("AI applications in retail").await? {
                    lines.push(format!("- [{}]({})", hit.title, hit.url));
                }
            }
        }
        if !self.trailer.is_empty() {
            lines.push(self.trailer.to_string());
        }
        Ok(lines.join("\n"))
    }
}

fn server(runtime: Arc<StubRuntime>, fail_search: bool) -> (TestServer, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let toolkit = Toolkit::new(
        runtime,
        Arc::new(StubSearch { fail: fail_search }),
        dir.path(),
    );
    let router = build_router(AppState::new(toolkit, 2));
    (TestServer::new(router).unwrap(), dir)
}

#[tokio::test]
async fn index_serves_the_form() {
    let (server, _dir) = server(Arc::new(StubRuntime::default()), false);

    let response = server.get("/").await;
    assert_eq!(response.status_code(), 200);

    let page = response.text();
    assert!(page.contains("id=\"company\""));
    assert!(page.contains("id=\"industry\""));
    assert!(page.contains("Generated Proposal"));
    assert!(page.contains("Resources"));
}

#[tokio::test]
async fn empty_fields_are_rejected_without_running() {
    let runtime = Arc::new(StubRuntime::default());
    let (server, _dir) = server(runtime.clone(), false);

    let response = server
        .post("/api/proposals")
        .json(&json!({ "company": "   ", "industry": "Retail" }))
        .await;
    assert_eq!(response.status_code(), 400);
    let body = response.json::<Value>();
    assert_eq!(body["error"], "Please enter a company name.");

    let response = server
        .post("/api/proposals")
        .json(&json!({ "company": "Acme Corp" }))
        .await;
    assert_eq!(response.status_code(), 400);

    assert_eq!(runtime.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn successful_run_returns_both_sections() {
    let runtime = Arc::new(StubRuntime::default());
    let (server, _dir) = server(runtime.clone(), false);

    let response = server
        .post("/api/proposals")
        .json(&json!({ "company": "Acme Corp", "industry": "Retail" }))
        .await;
    assert_eq!(response.status_code(), 200);

    let body = response.json::<Value>();
    assert!(body["run_id"].as_str().is_some_and(|id| !id.is_empty()));
    assert!(body["proposal"].as_str().is_some_and(|text| !text.is_empty()));
    assert!(body["resources"].as_str().unwrap().contains("http"));
    assert!(body["proposal_html"].as_str().unwrap().contains("<h2>"));
    assert!(body["resources_html"].as_str().unwrap().contains("<a href="));
    assert_eq!(body["links"][0], "https://www.kaggle.com/datasets/retail-demand");

    let stages = body["stages"].as_array().unwrap();
    let ids: Vec<&str> = stages
        .iter()
        .map(|stage| stage["stage"].as_str().unwrap())
        .collect();
    assert_eq!(ids, ["research", "use_cases", "resources", "proposal"]);
    assert_eq!(runtime.calls.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn html_in_stage_output_is_not_rendered() {
    let runtime = Arc::new(StubRuntime {
        trailer: "\n<img src=x onerror=\"alert(document.cookie)\">\n\n[docs](javascript:alert(1))",
        ..StubRuntime::default()
    });
    let (server, _dir) = server(runtime, false);

    let response = server
        .post("/api/proposals")
        .json(&json!({ "company": "Acme Corp", "industry": "Retail" }))
        .await;
    assert_eq!(response.status_code(), 200);

    let body = response.json::<Value>();
    assert!(body["proposal"].as_str().unwrap().contains("onerror"));
    for field in ["proposal_html", "resources_html"] {
        let html = body[field].as_str().unwrap();
        assert!(!html.contains("onerror"), "{field}: {html}");
        assert!(!html.contains("javascript:"), "{field}: {html}");
        assert!(html.contains("<h2>"), "{field}: {html}");
    }
}

#[tokio::test]
async fn search_failure_returns_error_without_partial_output() {
    let runtime = Arc::new(StubRuntime::default());
    let (server, _dir) = server(runtime.clone(), true);

    let response = server
        .post("/api/proposals")
        .json(&json!({ "company": "Acme Corp", "industry": "Retail" }))
        .await;
    assert_eq!(response.status_code(), 502);

    let body = response.json::<Value>();
    assert!(body["error"].as_str().unwrap().contains("quota exceeded"));
    assert!(body.get("proposal").is_none());
    assert!(body.get("resources").is_none());
    assert_eq!(runtime.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn health_reports_capacity() {
    let (server, _dir) = server(Arc::new(StubRuntime::default()), false);

    let response = server.get("/health/live").await;
    assert_eq!(response.status_code(), 200);
    let body = response.json::<Value>();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["metrics"]["max_concurrency"], 2);
    assert_eq!(body["metrics"]["available_permits"], 2);

    let response = server.get("/health/ready").await;
    assert_eq!(response.status_code(), 200);
}

#[tokio::test]
async fn failed_and_completed_runs_are_counted() {
    let (server, _dir) = server(Arc::new(StubRuntime::default()), false);

    server
        .post("/api/proposals")
        .json(&json!({ "company": "Acme Corp", "industry": "Retail" }))
        .await;

    let body = server.get("/health/live").await.json::<Value>();
    assert_eq!(body["metrics"]["completed_runs"], 1);
    assert_eq!(body["metrics"]["failed_runs"], 0);
    assert_eq!(body["metrics"]["running_runs"], 0);
}
