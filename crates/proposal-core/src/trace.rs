use std::fmt::Write as _;
use std::fs::{File, create_dir_all};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceEvent {
    /// `run` for run-level events, otherwise the stage id.
    pub subject: String,
    pub message: String,
    pub timestamp_ms: i64,
}

impl TraceEvent {
    pub fn new(subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            message: message.into(),
            timestamp_ms: Utc::now().timestamp_millis(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TraceCollector {
    events: Vec<TraceEvent>,
}

impl TraceCollector {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn record(&mut self, subject: impl Into<String>, message: impl Into<String>) {
        self.events.push(TraceEvent::new(subject, message));
    }

    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }

    pub fn into_events(self) -> Vec<TraceEvent> {
        self.events
    }
}

/// Markdown list of trace events, numbered in recording order.
pub fn render_markdown(events: &[TraceEvent]) -> String {
    if events.is_empty() {
        return "No trace events recorded.".to_string();
    }
    let mut output = String::from("### Run Trace\n");
    for (idx, event) in events.iter().enumerate() {
        let _ = writeln!(output, "{}. {} → {}", idx + 1, event.subject, event.message);
    }
    output
}

pub fn persist_trace<P: AsRef<Path>>(
    dir: P,
    run_id: &str,
    events: &[TraceEvent],
) -> Result<PathBuf> {
    let dir = dir.as_ref();
    create_dir_all(dir)
        .with_context(|| format!("failed to create trace directory {}", dir.display()))?;
    let path = dir.join(format!("{run_id}.trace.json"));
    let payload = serde_json::to_vec_pretty(events)?;
    let mut file = File::create(&path)
        .with_context(|| format!("failed to create trace file {}", path.display()))?;
    file.write_all(&payload)
        .with_context(|| format!("failed to write trace file {}", path.display()))?;
    Ok(path)
}
