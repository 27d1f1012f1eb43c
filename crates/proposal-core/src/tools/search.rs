use std::sync::Arc;

use async_trait::async_trait;
use rig::completion::ToolDefinition;
use rig::tool::Tool;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, instrument, warn};

use super::{FailureLatch, ToolError};
use crate::config::SearchConfig;
use crate::{ProposalError, SecretValue};

pub(super) const TOOL_NAME: &str = "web_search";

/// One search hit. Fields beyond the URL are passed to the model as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

/// External search provider boundary.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, ProposalError>;
}

/// Tavily search API client.
pub struct TavilyClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: SecretValue,
    search_depth: String,
    max_results: Option<u8>,
}

#[derive(Serialize)]
struct TavilyRequest<'a> {
    query: &'a str,
    search_depth: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_results: Option<u8>,
}

#[derive(Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<SearchHit>,
}

impl TavilyClient {
    pub fn new(config: &SearchConfig, api_key: SecretValue) -> Self {
        Self::with_http(reqwest::Client::new(), config, api_key)
    }

    pub fn with_http(http: reqwest::Client, config: &SearchConfig, api_key: SecretValue) -> Self {
        Self {
            http,
            endpoint: format!("{}/search", config.base_url.trim_end_matches('/')),
            api_key,
            search_depth: config.search_depth.clone(),
            max_results: config.max_results,
        }
    }
}

#[async_trait]
impl SearchProvider for TavilyClient {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, ProposalError> {
        let body = TavilyRequest {
            query,
            search_depth: &self.search_depth,
            max_results: self.max_results,
        };

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose())
            .json(&body)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|err| ProposalError::Search(err.to_string()))?;

        let payload: TavilyResponse = response
            .json()
            .await
            .map_err(|err| ProposalError::Search(format!("malformed response: {err}")))?;

        Ok(payload.results)
    }
}

/// Web search exposed to actors.
#[derive(Clone)]
pub struct WebSearchTool {
    provider: Arc<dyn SearchProvider>,
    latch: FailureLatch,
}

#[derive(Debug, Deserialize)]
pub struct WebSearchArgs {
    pub query: String,
}

impl WebSearchTool {
    pub fn new(provider: Arc<dyn SearchProvider>) -> Self {
        Self {
            provider,
            latch: FailureLatch::default(),
        }
    }

    pub(super) fn latch(&self) -> &FailureLatch {
        &self.latch
    }

    /// Run one provider call. Every call goes out to the provider; nothing is cached.
    #[instrument(name = "tool.search", skip(self))]
    pub async fn search(&self, query: &str) -> Result<Vec<SearchHit>, ProposalError> {
        if query.trim().is_empty() {
            let err = ProposalError::Search("query must not be empty".into());
            self.latch.record(err.to_string());
            return Err(err);
        }

        match self.provider.search(query).await {
            Ok(hits) => {
                debug!(hits = hits.len(), "search returned results");
                Ok(hits)
            }
            Err(err) => {
                warn!(error = %err, "search provider failed");
                self.latch.record(err.to_string());
                Err(err)
            }
        }
    }
}

impl Tool for WebSearchTool {
    const NAME: &'static str = TOOL_NAME;

    type Error = ToolError;
    type Args = WebSearchArgs;
    type Output = Vec<SearchHit>;

    async fn definition(&self, _prompt: String) -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME.to_string(),
            description: "Useful for when you need to search the web for information.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "The search query."
                    }
                },
                "required": ["query"]
            }),
        }
    }

    async fn call(&self, args: Self::Args) -> Result<Self::Output, Self::Error> {
        self.search(&args.query).await.map_err(|err| ToolError {
            tool: TOOL_NAME,
            message: err.to_string(),
        })
    }
}
