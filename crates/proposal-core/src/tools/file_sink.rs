use std::path::{Path, PathBuf};

use rig::completion::ToolDefinition;
use rig::tool::Tool;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};

use super::{FailureLatch, ToolError};
use crate::ProposalError;

pub(super) const TOOL_NAME: &str = "save_to_file";

/// Writes agent output to disk, replacing whatever was there.
#[derive(Debug, Clone)]
pub struct SaveToFileTool {
    base_dir: PathBuf,
    latch: FailureLatch,
}

#[derive(Debug, Deserialize)]
pub struct SaveToFileArgs {
    pub content: String,
    pub filename: String,
}

impl SaveToFileTool {
    /// Relative filenames are resolved against `base_dir`.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            latch: FailureLatch::default(),
        }
    }

    pub(super) fn latch(&self) -> &FailureLatch {
        &self.latch
    }

    fn resolve(&self, filename: &str) -> PathBuf {
        let path = Path::new(filename);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// Overwrite `filename` with `content` and return a confirmation naming the file.
    #[instrument(name = "tool.save", skip(self, content), fields(bytes = content.len()))]
    pub async fn save(&self, content: &str, filename: &str) -> Result<String, ProposalError> {
        let path = self.resolve(filename);
        match tokio::fs::write(&path, content).await {
            Ok(()) => {
                info!(path = %path.display(), "saved agent output");
                Ok(format!("File saved to {filename}"))
            }
            Err(source) => {
                warn!(path = %path.display(), error = %source, "failed to save agent output");
                let err = ProposalError::FileSink {
                    filename: filename.to_string(),
                    source,
                };
                self.latch.record(err.to_string());
                Err(err)
            }
        }
    }
}

impl Tool for SaveToFileTool {
    const NAME: &'static str = TOOL_NAME;

    type Error = ToolError;
    type Args = SaveToFileArgs;
    type Output = String;

    async fn definition(&self, _prompt: String) -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME.to_string(),
            description: "Useful for saving content to a file.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "content": {
                        "type": "string",
                        "description": "Full text to write."
                    },
                    "filename": {
                        "type": "string",
                        "description": "Name of the file to write, e.g. resources.md."
                    }
                },
                "required": ["content", "filename"]
            }),
        }
    }

    async fn call(&self, args: Self::Args) -> Result<Self::Output, Self::Error> {
        self.save(&args.content, &args.filename)
            .await
            .map_err(|err| ToolError {
                tool: TOOL_NAME,
                message: err.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn confirmation_names_the_exact_filename() {
        let dir = tempdir().unwrap();
        let tool = SaveToFileTool::new(dir.path());

        let confirmation = tool
            .save("[Kaggle](https://www.kaggle.com)", "resources.md")
            .await
            .expect("save should succeed");

        assert!(confirmation.contains("resources.md"));
        let written = std::fs::read_to_string(dir.path().join("resources.md")).unwrap();
        assert_eq!(written, "[Kaggle](https://www.kaggle.com)");
    }

    #[tokio::test]
    async fn existing_file_is_overwritten() {
        let dir = tempdir().unwrap();
        let tool = SaveToFileTool::new(dir.path());

        tool.save("first draft with more text", "notes.txt").await.unwrap();
        tool.save("second", "notes.txt").await.unwrap();

        let written = std::fs::read_to_string(dir.path().join("notes.txt")).unwrap();
        assert_eq!(written, "second");
    }

    #[tokio::test]
    async fn io_errors_propagate_and_latch() {
        let dir = tempdir().unwrap();
        let tool = SaveToFileTool::new(dir.path());

        let err = tool
            .save("content", "missing-dir/resources.md")
            .await
            .unwrap_err();

        assert!(matches!(err, ProposalError::FileSink { ref filename, .. } if filename == "missing-dir/resources.md"));
        assert!(tool.latch().take().is_some());
    }
}
