//! Tools the actors can call while a stage runs.
//!
//! Both tools wrap process-wide handles and are cheap to clone. Each clone
//! shares a [`FailureLatch`] so a failed tool call aborts the stage even when
//! the model runtime would otherwise feed the error back to the model.

mod file_sink;
mod search;

use std::sync::{Arc, Mutex};

use thiserror::Error;

pub use file_sink::{SaveToFileArgs, SaveToFileTool};
pub use search::{SearchHit, SearchProvider, TavilyClient, WebSearchArgs, WebSearchTool};

/// Error surfaced to the model runtime when a tool call fails.
#[derive(Debug, Error)]
#[error("{tool} tool failed: {message}")]
pub struct ToolError {
    pub tool: &'static str,
    pub message: String,
}

/// First failure observed by a tool since the latch was last drained.
#[derive(Debug, Clone, Default)]
pub struct FailureLatch {
    slot: Arc<Mutex<Option<String>>>,
}

impl FailureLatch {
    pub fn record(&self, message: impl Into<String>) {
        let mut slot = self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if slot.is_none() {
            *slot = Some(message.into());
        }
    }

    pub fn take(&self) -> Option<String> {
        self.slot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
    }
}

/// A tool bound to an actor.
#[derive(Clone)]
pub enum BoundTool {
    Search(WebSearchTool),
    FileSink(SaveToFileTool),
}

impl BoundTool {
    pub fn name(&self) -> &'static str {
        match self {
            BoundTool::Search(_) => search::TOOL_NAME,
            BoundTool::FileSink(_) => file_sink::TOOL_NAME,
        }
    }

    /// Drain the first failure recorded by this tool, if any.
    pub fn take_failure(&self) -> Option<String> {
        match self {
            BoundTool::Search(tool) => tool.latch().take(),
            BoundTool::FileSink(tool) => tool.latch().take(),
        }
    }
}

impl std::fmt::Debug for BoundTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
