use std::path::PathBuf;
use std::sync::Arc;

use graph_flow::{
    ExecutionStatus, FlowRunner, GraphBuilder, InMemorySessionStorage, Session, SessionStorage,
};
use serde::Serialize;
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::actors::{Roster, RunTools};
use crate::config::Config;
use crate::runtime::{ActorRuntime, RigRuntime};
use crate::stages::{RunInputs, Stage, StageKind, StageOutput};
use crate::tasks::{OUTPUTS_KEY, StageTask};
use crate::tools::{SaveToFileTool, SearchProvider, TavilyClient, WebSearchTool};
use crate::trace::{TraceCollector, TraceEvent};
use crate::ProposalError;

/// Process-wide handles shared by every run.
#[derive(Clone)]
pub struct Toolkit {
    runtime: Arc<dyn ActorRuntime>,
    search: Arc<dyn SearchProvider>,
    output_dir: PathBuf,
}

impl Toolkit {
    pub fn new(
        runtime: Arc<dyn ActorRuntime>,
        search: Arc<dyn SearchProvider>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            runtime,
            search,
            output_dir: output_dir.into(),
        }
    }

    /// Resolve secrets and build the model and search clients once.
    pub fn from_config(config: &Config) -> Result<Self, ProposalError> {
        let llm_key = config.llm_api_key()?;
        let search_key = config.search_api_key()?;

        let runtime = RigRuntime::new(&config.llm, &llm_key);
        let search = TavilyClient::new(&config.search, search_key);

        info!(
            model = %config.llm.model,
            base_url = %config.llm.base_url,
            search_depth = %config.search.search_depth,
            output_dir = %config.output.dir.display(),
            "toolkit initialised"
        );

        Ok(Self::new(
            Arc::new(runtime),
            Arc::new(search),
            config.output.dir.clone(),
        ))
    }

    fn fresh_tools(&self) -> RunTools {
        RunTools {
            search: WebSearchTool::new(self.search.clone()),
            file_sink: SaveToFileTool::new(self.output_dir.clone()),
        }
    }
}

/// Lifecycle of a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Running { stage: StageKind },
    Completed,
    Failed { stage: StageKind },
}

impl RunState {
    pub fn start(self) -> Result<Self, ProposalError> {
        match self {
            RunState::Idle => Ok(RunState::Running {
                stage: StageKind::Research,
            }),
            other => Err(invalid_transition(other, "start")),
        }
    }

    /// Move to the next stage after the current one finished.
    pub fn advance(self) -> Result<Self, ProposalError> {
        match self {
            RunState::Running { stage } => stage
                .successor()
                .map(|next| RunState::Running { stage: next })
                .ok_or_else(|| invalid_transition(self, "advance")),
            other => Err(invalid_transition(other, "advance")),
        }
    }

    pub fn complete(self) -> Result<Self, ProposalError> {
        match self {
            RunState::Running { stage } if stage.is_last() => Ok(RunState::Completed),
            other => Err(invalid_transition(other, "complete")),
        }
    }

    pub fn fail(self) -> Result<Self, ProposalError> {
        match self {
            RunState::Running { stage } => Ok(RunState::Failed { stage }),
            other => Err(invalid_transition(other, "fail")),
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::Completed | RunState::Failed { .. })
    }
}

fn invalid_transition(state: RunState, action: &str) -> ProposalError {
    ProposalError::Pipeline(format!("cannot {action} a run in state {state:?}"))
}

/// Per-stage summary returned with the outcome.
#[derive(Debug, Clone, Serialize)]
pub struct StageReport {
    pub stage: StageKind,
    pub role: String,
    pub duration_ms: u64,
    pub characters: usize,
}

impl From<&StageOutput> for StageReport {
    fn from(output: &StageOutput) -> Self {
        Self {
            stage: output.stage,
            role: output.role.clone(),
            duration_ms: output.duration_ms,
            characters: output.text.chars().count(),
        }
    }
}

/// Result of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct ProposalOutcome {
    pub run_id: String,
    pub proposal: String,
    pub resources: String,
    pub stages: Vec<StageReport>,
    pub trace_events: Vec<TraceEvent>,
}

/// Options for a single run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub inputs: RunInputs,
    pub run_id: Option<String>,
}

impl RunOptions {
    pub fn new(inputs: RunInputs) -> Self {
        Self {
            inputs,
            run_id: None,
        }
    }

    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = Some(run_id.into());
        self
    }
}

fn build_graph(stages: Vec<Stage>) -> Result<Arc<graph_flow::Graph>, ProposalError> {
    let tasks: Vec<Arc<StageTask>> = stages
        .into_iter()
        .map(|stage| Arc::new(StageTask::new(stage)))
        .collect();

    let first = tasks
        .first()
        .map(|task| task.stage().kind)
        .ok_or_else(|| ProposalError::Pipeline("no stages planned".into()))?;

    let mut builder = GraphBuilder::new("proposal_pipeline");
    for task in &tasks {
        builder = builder.add_task(task.clone());
    }
    for pair in tasks.windows(2) {
        builder = builder.add_edge(pair[0].stage().kind.id(), pair[1].stage().kind.id());
    }

    Ok(Arc::new(builder.set_start_task(first.id()).build()))
}

/// Run the four-stage pipeline for `company` / `industry`.
pub async fn generate_proposal(
    toolkit: &Toolkit,
    company: &str,
    industry: &str,
) -> Result<ProposalOutcome, ProposalError> {
    let inputs = RunInputs::new(company, industry)?;
    run_pipeline(toolkit, RunOptions::new(inputs)).await
}

/// Run the pipeline. All-or-nothing: any stage failure aborts the run.
#[instrument(
    name = "pipeline.run",
    skip_all,
    fields(company = %options.inputs.company(), industry = %options.inputs.industry())
)]
pub async fn run_pipeline(
    toolkit: &Toolkit,
    options: RunOptions,
) -> Result<ProposalOutcome, ProposalError> {
    let run_id = options
        .run_id
        .clone()
        .unwrap_or_else(|| format!("run-{}", Uuid::new_v4()));

    let tools = toolkit.fresh_tools();
    let roster = Roster::assemble(toolkit.runtime.clone(), &tools);
    let stages = Stage::plan(&options.inputs, &roster);
    let graph = build_graph(stages)?;

    let storage = Arc::new(InMemorySessionStorage::new());
    let runner = FlowRunner::new(graph, storage.clone());

    let session = Session::new_from_task(run_id.clone(), StageKind::Research.id());
    session
        .context
        .set("run.company", options.inputs.company().to_string())
        .await;
    session
        .context
        .set("run.industry", options.inputs.industry().to_string())
        .await;
    storage
        .save(session)
        .await
        .map_err(|err| ProposalError::Pipeline(format!("failed to persist session: {err}")))?;

    let mut trace = TraceCollector::new();
    let mut state = RunState::Idle.start()?;
    trace.record("run", format!("started {run_id}"));
    info!(%run_id, "proposal run started");

    while let RunState::Running { stage } = state {
        trace.record(stage.id(), "started");

        let step = runner.run(&run_id).await;
        let failure = match step {
            Ok(result) => match result.status {
                ExecutionStatus::Completed => {
                    trace.record(stage.id(), "completed");
                    state = state.complete()?;
                    None
                }
                ExecutionStatus::Error(message) => Some(message),
                _ => {
                    trace.record(stage.id(), "completed");
                    state = state.advance()?;
                    None
                }
            },
            Err(err) => Some(err.to_string()),
        };

        if let Some(reason) = failure {
            let failed = state.fail()?;
            trace.record(stage.id(), format!("failed: {reason}"));
            trace.record("run", "failed");
            error!(%run_id, %stage, state = ?failed, %reason, "proposal run failed");
            return Err(ProposalError::StageFailed { stage, reason });
        }
    }

    let session = storage
        .get(&run_id)
        .await
        .map_err(|err| ProposalError::Pipeline(format!("failed to reload session: {err}")))?
        .ok_or_else(|| ProposalError::Pipeline("session missing after execution".into()))?;

    let outputs: Vec<StageOutput> = session.context.get(OUTPUTS_KEY).await.unwrap_or_default();
    let order: Vec<StageKind> = outputs.iter().map(|output| output.stage).collect();
    if order != StageKind::ALL {
        return Err(ProposalError::Pipeline(format!(
            "expected outputs for {:?}, found {:?}",
            StageKind::ALL,
            order
        )));
    }

    let text_of = |kind: StageKind| {
        outputs
            .iter()
            .find(|output| output.stage == kind)
            .map(|output| output.text.clone())
            .unwrap_or_default()
    };
    let proposal = text_of(StageKind::Proposal);
    let resources = text_of(StageKind::Resources);

    trace.record("run", "completed");
    info!(%run_id, state = ?state, "proposal run completed");

    Ok(ProposalOutcome {
        run_id,
        proposal,
        resources,
        stages: outputs.iter().map(StageReport::from).collect(),
        trace_events: trace.into_events(),
    })
}
