use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use graph_flow::{Context, GraphError, NextAction, Task, TaskResult};
use tracing::{debug, info, instrument};

use crate::runtime::StageRequest;
use crate::stages::{Stage, StageOutput};

/// Context key holding every stage output produced so far, in order.
pub const OUTPUTS_KEY: &str = "run.outputs";

/// Runs one pipeline stage inside the graph.
pub struct StageTask {
    stage: Stage,
}

impl StageTask {
    pub fn new(stage: Stage) -> Self {
        Self { stage }
    }

    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    async fn collect_context(&self, context: &Context) -> graph_flow::Result<Vec<String>> {
        let mut collected = Vec::with_capacity(self.stage.context_from.len());
        for predecessor in &self.stage.context_from {
            let text: String = context
                .get(&predecessor.output_key())
                .await
                .ok_or_else(|| {
                    GraphError::TaskExecutionFailed(format!(
                        "{} cannot start before {} has produced output",
                        self.stage.kind, predecessor
                    ))
                })?;
            collected.push(text);
        }
        Ok(collected)
    }
}

#[async_trait]
impl Task for StageTask {
    fn id(&self) -> &str {
        self.stage.kind.id()
    }

    #[instrument(name = "task.stage", skip(self, context), fields(stage = %self.stage.kind))]
    async fn run(&self, context: Context) -> graph_flow::Result<TaskResult> {
        let kind = self.stage.kind;
        let actor = &self.stage.actor;

        let request = StageRequest {
            stage: kind,
            instruction: self.stage.instruction.clone(),
            expected_output: self.stage.expected_output.clone(),
            context: self.collect_context(&context).await?,
        };

        debug!(
            role = %actor.role(),
            context_items = request.context.len(),
            "stage starting"
        );

        let started = Instant::now();
        let text = actor
            .perform(&request)
            .await
            .map_err(|err| GraphError::TaskExecutionFailed(err.to_string()))?;
        let duration_ms = started.elapsed().as_millis() as u64;

        if text.trim().is_empty() {
            return Err(GraphError::TaskExecutionFailed(format!(
                "{} returned an empty answer",
                actor.role()
            )));
        }

        context.set(kind.output_key(), text.clone()).await;

        let mut outputs: Vec<StageOutput> = context.get(OUTPUTS_KEY).await.unwrap_or_default();
        outputs.push(StageOutput {
            stage: kind,
            role: actor.role().title().to_string(),
            text,
            duration_ms,
            completed_at: Utc::now(),
        });
        context.set(OUTPUTS_KEY, &outputs).await;

        info!(
            role = %actor.role(),
            duration_ms,
            completed_stages = outputs.len(),
            "stage completed"
        );

        let next = if kind.is_last() {
            NextAction::End
        } else {
            NextAction::Continue
        };

        Ok(TaskResult::new(
            Some(format!("{} completed by {}", kind, actor.role())),
            next,
        ))
    }
}
