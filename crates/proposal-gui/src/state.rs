use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use proposal_core::{ProposalError, ProposalOutcome, RunInputs, RunOptions, Toolkit, run_pipeline};
use serde::Serialize;
use tokio::sync::Semaphore;
use tracing::info;

use crate::metrics;

#[derive(Clone)]
pub struct AppState {
    proposal_service: Arc<ProposalService>,
}

impl AppState {
    pub fn new(toolkit: Toolkit, max_concurrency: usize) -> Self {
        Self {
            proposal_service: Arc::new(ProposalService::new(toolkit, max_concurrency)),
        }
    }

    pub fn proposal_service(&self) -> Arc<ProposalService> {
        self.proposal_service.clone()
    }

    pub fn metrics(&self) -> RunMetrics {
        self.proposal_service.metrics()
    }
}

/// Admits independent runs, at most `max_concurrency` at a time.
pub struct ProposalService {
    toolkit: Arc<Toolkit>,
    semaphore: Arc<Semaphore>,
    max_concurrency: usize,
    completed: AtomicUsize,
    failed: AtomicUsize,
}

impl ProposalService {
    pub fn new(toolkit: Toolkit, max_concurrency: usize) -> Self {
        let max_concurrency = max_concurrency.max(1);
        Self {
            toolkit: Arc::new(toolkit),
            semaphore: Arc::new(Semaphore::new(max_concurrency)),
            max_concurrency,
            completed: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
        }
    }

    /// Validate the form fields, then run the pipeline to completion.
    ///
    /// Invalid input is rejected before a permit is taken.
    pub async fn generate(
        &self,
        company: &str,
        industry: &str,
    ) -> Result<ProposalOutcome, ProposalError> {
        let inputs = RunInputs::new(company, industry)?;

        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|err| ProposalError::Pipeline(format!("run admission closed: {err}")))?;

        let snapshot = self.metrics();
        metrics::run_started(
            inputs.company(),
            inputs.industry(),
            snapshot.running_runs,
            snapshot.available_permits,
        );

        let result = run_pipeline(&self.toolkit, RunOptions::new(inputs)).await;
        drop(permit);

        match &result {
            Ok(outcome) => {
                self.completed.fetch_add(1, Ordering::Relaxed);
                info!(run_id = %outcome.run_id, "proposal generated");
                metrics::run_completed(
                    &outcome.run_id,
                    outcome.stages.len(),
                    outcome.trace_events.len(),
                    self.metrics().running_runs,
                );
            }
            Err(err) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                let snapshot = self.metrics();
                metrics::run_failed(
                    snapshot.running_runs,
                    snapshot.available_permits,
                    &err.to_string(),
                );
            }
        }

        result
    }

    pub fn metrics(&self) -> RunMetrics {
        let available_permits = self.semaphore.available_permits();
        RunMetrics {
            max_concurrency: self.max_concurrency,
            available_permits,
            running_runs: self.max_concurrency.saturating_sub(available_permits),
            completed_runs: self.completed.load(Ordering::Relaxed),
            failed_runs: self.failed.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct RunMetrics {
    pub max_concurrency: usize,
    pub available_permits: usize,
    pub running_runs: usize,
    pub completed_runs: usize,
    pub failed_runs: usize,
}
