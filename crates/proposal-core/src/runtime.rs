//! Model invocation boundary.
//!
//! [`ActorRuntime`] is the seam between the pipeline and whatever drives the
//! language model. [`RigRuntime`] drives any OpenAI-compatible chat endpoint
//! through `rig`, registering the actor's tools for multi-turn tool calling.

use async_trait::async_trait;
use rig::client::CompletionClient;
use rig::completion::Prompt;
use tracing::{info, instrument};

use crate::actors::Actor;
use crate::config::LlmConfig;
use crate::stages::StageKind;
use crate::tools::BoundTool;
use crate::{ProposalError, SecretValue};

/// Everything an actor needs to carry out one stage.
#[derive(Debug, Clone)]
pub struct StageRequest {
    pub stage: StageKind,
    pub instruction: String,
    pub expected_output: String,
    /// Outputs of predecessor stages, oldest first.
    pub context: Vec<String>,
}

#[async_trait]
pub trait ActorRuntime: Send + Sync {
    /// Run `request` as `actor` and return the final text answer.
    async fn invoke(&self, actor: &Actor, request: &StageRequest) -> Result<String, ProposalError>;
}

/// System prompt framing the actor's role.
pub fn compose_preamble(actor: &Actor) -> String {
    let mut preamble = format!(
        "You are {}. {}\nYour personal goal is: {}",
        actor.role().title(),
        actor.backstory(),
        actor.goal()
    );

    let tools = actor.tool_names();
    if !tools.is_empty() {
        preamble.push_str(&format!(
            "\nYou have access to the following tools: {}. Use them whenever they help you complete the task.",
            tools.join(", ")
        ));
    }

    preamble
}

/// User prompt carrying the brief, the expected output and any prior context.
pub fn compose_prompt(request: &StageRequest) -> String {
    let mut prompt = format!(
        "{}\n\nThis is the expected criteria for your final answer: {}\n\
         You MUST return the actual complete content as the final answer, not a summary.",
        request.instruction.trim(),
        request.expected_output.trim()
    );

    if !request.context.is_empty() {
        prompt.push_str("\n\nThis is the context you're working with:\n");
        prompt.push_str(&request.context.join("\n\n"));
    }

    prompt
}

/// Runtime backed by a `rig` agent per stage.
#[derive(Clone)]
pub struct RigRuntime {
    client: rig::providers::openai::Client,
    model: String,
    temperature: f64,
    max_turns: usize,
}

impl RigRuntime {
    pub fn new(config: &LlmConfig, api_key: &SecretValue) -> Self {
        let client = rig::providers::openai::Client::builder(api_key.expose())
            .base_url(&config.base_url)
            .build();

        Self {
            client,
            model: config.model.clone(),
            temperature: config.temperature,
            max_turns: config.max_turns,
        }
    }
}

#[async_trait]
impl ActorRuntime for RigRuntime {
    #[instrument(
        name = "runtime.invoke",
        skip(self, actor, request),
        fields(stage = %request.stage, role = %actor.role(), model = %self.model)
    )]
    async fn invoke(&self, actor: &Actor, request: &StageRequest) -> Result<String, ProposalError> {
        let capabilities = actor.capabilities();
        info!(
            memory = capabilities.memory,
            allow_delegation = capabilities.allow_delegation,
            tools = ?actor.tool_names(),
            context_items = request.context.len(),
            "invoking model"
        );

        let preamble = compose_preamble(actor);
        let prompt = compose_prompt(request);

        let builder = self
            .client
            .completion_model(&self.model)
            .completions_api()
            .into_agent_builder()
            .preamble(&preamble)
            .temperature(self.temperature);

        // Binding the first tool switches rig to its tool-carrying builder.
        let agent = match actor.tools().split_first() {
            None => builder.build(),
            Some((first, rest)) => {
                let mut builder = match first {
                    BoundTool::Search(search) => builder.tool(search.clone()),
                    BoundTool::FileSink(sink) => builder.tool(sink.clone()),
                };
                for tool in rest {
                    builder = match tool {
                        BoundTool::Search(search) => builder.tool(search.clone()),
                        BoundTool::FileSink(sink) => builder.tool(sink.clone()),
                    };
                }
                builder.build()
            }
        };

        agent
            .prompt(prompt.as_str())
            .multi_turn(self.max_turns)
            .await
            .map_err(|err| ProposalError::Model(err.to_string()))
    }
}
