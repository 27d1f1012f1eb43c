use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use proposal_core::{
    Actor, ActorRuntime, BoundTool, ProposalError, RunInputs, RunOptions, SearchHit,
    SearchProvider, StageKind, StageRequest, Toolkit, extract_links, generate_proposal,
    run_pipeline,
};
use tempfile::TempDir;

/// Search provider that can be told to fail on its n-th call (1-based).
struct FakeSearch {
    calls: AtomicUsize,
    fail_on_call: Option<usize>,
}

impl FakeSearch {
    fn healthy() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail_on_call: None,
        }
    }

    fn failing_on(call: usize) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail_on_call: Some(call),
        }
    }
}

#[async_trait]
impl SearchProvider for FakeSearch {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, ProposalError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on_call == Some(call) {
            return Err(ProposalError::Search("provider unavailable".into()));
        }
        Ok(vec![SearchHit {
            title: format!("Result for {query}"),
            url: format!("https://www.kaggle.com/datasets/item-{call}"),
            content: "dataset".into(),
            score: Some(0.8),
        }])
    }
}

#[derive(Debug, Clone)]
struct Invocation {
    sequence: usize,
    stage: StageKind,
    role: String,
    context: Vec<String>,
}

/// Instrumented runtime that exercises the actor's tools the way a model would.
#[derive(Default)]
struct ScriptedRuntime {
    sequence: AtomicUsize,
    invocations: Mutex<Vec<Invocation>>,
    swallow_tool_errors: bool,
    empty_answer_for: Option<StageKind>,
}

impl ScriptedRuntime {
    fn invocations(&self) -> Vec<Invocation> {
        self.invocations.lock().unwrap().clone()
    }
}

#[async_trait]
impl ActorRuntime for ScriptedRuntime {
    async fn invoke(&self, actor: &Actor, request: &StageRequest) -> Result<String, ProposalError> {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst);
        self.invocations.lock().unwrap().push(Invocation {
            sequence,
            stage: request.stage,
            role: actor.role().title().to_string(),
            context: request.context.clone(),
        });

        if self.empty_answer_for == Some(request.stage) {
            return Ok("   ".into());
        }

        let mut notes = Vec::new();
        for tool in actor.tools() {
            match tool {
                BoundTool::Search(search) => {
                    let query = format!("{} {}", actor.role(), request.stage);
                    match search.search(&query).await {
                        Ok(hits) => notes.extend(
                            hits.into_iter()
                                .map(|hit| format!("- [{}]({})", hit.title, hit.url)),
                        ),
                        Err(err) if self.swallow_tool_errors => {
                            notes.push(format!("search unavailable: {err}"));
                        }
                        Err(err) => return Err(err),
                    }
                }
                BoundTool::FileSink(sink) => {
                    let filename = format!("{}.md", request.stage);
                    let confirmation = sink.save(&notes.join("\n"), &filename).await?;
                    assert!(confirmation.contains(&filename));
                    notes.push(confirmation);
                }
            }
        }

        Ok(format!("## {} by {}\n{}", request.stage, actor.role(), notes.join("\n")))
    }
}

fn toolkit(runtime: Arc<ScriptedRuntime>, search: FakeSearch) -> (Toolkit, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let toolkit = Toolkit::new(runtime, Arc::new(search), dir.path());
    (toolkit, dir)
}

#[tokio::test]
async fn acme_retail_run_completes_four_stages() {
    let runtime = Arc::new(ScriptedRuntime::default());
    let (toolkit, dir) = toolkit(runtime.clone(), FakeSearch::healthy());

    let outcome = generate_proposal(&toolkit, "Acme Corp", "Retail")
        .await
        .expect("run should succeed");

    assert!(!outcome.proposal.trim().is_empty());
    assert!(!outcome.resources.trim().is_empty());
    assert!(outcome.resources.contains("http"));
    assert!(!extract_links(&outcome.resources).is_empty());

    let stages: Vec<StageKind> = outcome.stages.iter().map(|report| report.stage).collect();
    assert_eq!(stages, StageKind::ALL);
    assert_eq!(runtime.invocations().len(), 4);

    assert!(dir.path().join("resources.md").exists());
    assert!(dir.path().join("proposal.md").exists());

    let subjects: Vec<&str> = outcome
        .trace_events
        .iter()
        .map(|event| event.subject.as_str())
        .collect();
    assert_eq!(subjects.first(), Some(&"run"));
    assert_eq!(subjects.last(), Some(&"run"));
}

#[tokio::test]
async fn each_stage_receives_only_the_previous_output() {
    let runtime = Arc::new(ScriptedRuntime::default());
    let (toolkit, _dir) = toolkit(runtime.clone(), FakeSearch::healthy());

    let inputs = RunInputs::new("Acme Corp", "Retail").unwrap();
    let outcome = run_pipeline(&toolkit, RunOptions::new(inputs).with_run_id("ordered-run"))
        .await
        .expect("run should succeed");
    assert_eq!(outcome.run_id, "ordered-run");

    let invocations = runtime.invocations();
    let order: Vec<StageKind> = invocations.iter().map(|call| call.stage).collect();
    assert_eq!(order, StageKind::ALL);

    for (index, call) in invocations.iter().enumerate() {
        assert_eq!(call.sequence, index);
    }

    assert!(invocations[0].context.is_empty());
    assert_eq!(invocations[0].role, "Market Research Analyst");
    for pair in invocations.windows(2) {
        let (previous, current) = (&pair[0], &pair[1]);
        assert_eq!(current.context.len(), 1);
        assert!(
            current.context[0].starts_with(&format!("## {} by", previous.stage)),
            "{} should see {} output, got {:?}",
            current.stage,
            previous.stage,
            current.context
        );
    }

    // The resources text returned to the caller is the curator's output, fed to the writer.
    assert_eq!(invocations[3].context[0], outcome.resources);
}

#[tokio::test]
async fn search_failure_in_any_searching_stage_aborts_the_run() {
    // One search call per searching stage: research, use cases, resources.
    let cases = [
        (1, StageKind::Research),
        (2, StageKind::UseCases),
        (3, StageKind::Resources),
    ];

    for (failing_call, failing_stage) in cases {
        let runtime = Arc::new(ScriptedRuntime::default());
        let (toolkit, _dir) = toolkit(runtime.clone(), FakeSearch::failing_on(failing_call));

        let err = generate_proposal(&toolkit, "Acme Corp", "Retail")
            .await
            .expect_err("run should fail");

        match err {
            ProposalError::StageFailed { stage, reason } => {
                assert_eq!(stage, failing_stage);
                assert!(reason.contains("provider unavailable"), "{reason}");
            }
            other => panic!("unexpected error: {other}"),
        }

        let reached: Vec<StageKind> = runtime.invocations().iter().map(|call| call.stage).collect();
        assert_eq!(reached.last(), Some(&failing_stage));
        assert_eq!(reached.len(), failing_stage.position());
    }
}

#[tokio::test]
async fn swallowed_tool_error_still_fails_the_stage() {
    let runtime = Arc::new(ScriptedRuntime {
        swallow_tool_errors: true,
        ..ScriptedRuntime::default()
    });
    let (toolkit, _dir) = toolkit(runtime.clone(), FakeSearch::failing_on(2));

    let err = generate_proposal(&toolkit, "Acme Corp", "Retail")
        .await
        .expect_err("latched tool failure should abort");

    assert!(matches!(
        err,
        ProposalError::StageFailed {
            stage: StageKind::UseCases,
            ..
        }
    ));
    assert_eq!(runtime.invocations().len(), 2);
}

#[tokio::test]
async fn empty_inputs_never_invoke_the_pipeline() {
    let runtime = Arc::new(ScriptedRuntime::default());
    let (toolkit, _dir) = toolkit(runtime.clone(), FakeSearch::healthy());

    for (company, industry) in [("", "Retail"), ("Acme Corp", ""), ("  ", "\t")] {
        let err = generate_proposal(&toolkit, company, industry)
            .await
            .expect_err("validation should fail");
        assert!(err.is_validation(), "unexpected error: {err}");
    }

    assert!(runtime.invocations().is_empty());
}

#[tokio::test]
async fn empty_stage_answer_fails_the_run() {
    let runtime = Arc::new(ScriptedRuntime {
        empty_answer_for: Some(StageKind::Resources),
        ..ScriptedRuntime::default()
    });
    let (toolkit, _dir) = toolkit(runtime.clone(), FakeSearch::healthy());

    let err = generate_proposal(&toolkit, "Acme Corp", "Retail")
        .await
        .expect_err("empty answer should fail");

    assert!(matches!(
        err,
        ProposalError::StageFailed {
            stage: StageKind::Resources,
            ..
        }
    ));
    assert_eq!(runtime.invocations().len(), 3);
}

#[tokio::test]
async fn runs_are_independent() {
    let runtime = Arc::new(ScriptedRuntime::default());
    let (toolkit, _dir) = toolkit(runtime.clone(), FakeSearch::healthy());

    let first = generate_proposal(&toolkit, "Acme Corp", "Retail").await.unwrap();
    let second = generate_proposal(&toolkit, "Globex", "Manufacturing").await.unwrap();

    assert_ne!(first.run_id, second.run_id);
    assert_eq!(second.stages.len(), 4);
    assert_eq!(runtime.invocations().len(), 8);
    assert!(runtime.invocations()[4].context.is_empty());
}
