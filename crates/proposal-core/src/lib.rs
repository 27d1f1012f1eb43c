//! Core of the AI/ML proposal generator, built directly on top of `graph_flow`.
//!
//! A run walks four stages in a fixed chain (research, use cases, resources,
//! proposal). Each stage is carried out by one actor whose model runtime can
//! call the web-search and file-save tools, and each stage's text becomes the
//! next stage's context.

pub mod actors;
mod config;
mod error;
mod links;
pub mod runtime;
mod security;
pub mod stages;
mod tasks;
mod telemetry;
pub mod tools;
mod trace;
mod workflow;

pub use actors::{Actor, ActorRole, Capabilities, Roster, RunTools};
pub use config::{Config, ConfigLoader, LlmConfig, LoggingConfig, OutputConfig, SearchConfig};
pub use error::ProposalError;
pub use links::extract_links;
pub use runtime::{ActorRuntime, RigRuntime, StageRequest, compose_preamble, compose_prompt};
pub use security::{SecretValue, require_env};
pub use stages::{RunInputs, Stage, StageKind, StageOutput};
pub use tasks::StageTask;
pub use telemetry::{TelemetryOptions, init_telemetry};
pub use tools::{BoundTool, SaveToFileTool, SearchHit, SearchProvider, TavilyClient, WebSearchTool};
pub use trace::{TraceCollector, TraceEvent, persist_trace, render_markdown};
pub use workflow::{
    ProposalOutcome, RunOptions, RunState, StageReport, Toolkit, generate_proposal, run_pipeline,
};
