use tracing::info;

pub fn run_started(company: &str, industry: &str, running: usize, available_permits: usize) {
    info!(
        target: "telemetry.gui",
        company,
        industry,
        running_runs = running,
        available_permits,
        event = "run_started"
    );
}

pub fn run_completed(run_id: &str, stages: usize, trace_events: usize, running: usize) {
    info!(
        target: "telemetry.gui",
        run_id,
        stages,
        trace_events,
        running_runs = running,
        event = "run_completed"
    );
}

pub fn run_failed(running: usize, available_permits: usize, error: &str) {
    info!(
        target: "telemetry.gui",
        running_runs = running,
        available_permits,
        error,
        event = "run_failed"
    );
}
