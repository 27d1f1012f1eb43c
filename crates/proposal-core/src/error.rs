use std::path::PathBuf;

use thiserror::Error;

use crate::stages::StageKind;

/// Core error type for the proposal pipeline.
#[derive(Debug, Error)]
pub enum ProposalError {
    #[error("configuration error: {0}")]
    InvalidConfiguration(String),
    #[error("missing environment variable: {0}")]
    MissingSecret(String),
    #[error("I/O error while reading {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{0}")]
    Validation(String),
    #[error("search failed: {0}")]
    Search(String),
    #[error("failed to save {filename}: {source}")]
    FileSink {
        filename: String,
        #[source]
        source: std::io::Error,
    },
    #[error("tool call failed: {0}")]
    ToolFailed(String),
    #[error("model invocation failed: {0}")]
    Model(String),
    #[error("stage {stage} failed: {reason}")]
    StageFailed { stage: StageKind, reason: String },
    #[error("pipeline error: {0}")]
    Pipeline(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ProposalError {
    pub fn config_io(path: PathBuf, source: std::io::Error) -> Self {
        Self::ConfigIo { path, source }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// True when the error was raised before any stage ran.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}
