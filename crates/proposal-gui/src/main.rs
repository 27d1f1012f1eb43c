use anyhow::Result;
use axum::Router;
use proposal_core::{ConfigLoader, TelemetryOptions, Toolkit, init_telemetry};
use proposal_gui::config::AppConfig;
use proposal_gui::routes;
use proposal_gui::state::AppState;
use tokio::net::TcpListener;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let app_config = AppConfig::from_env()?;
    let config = ConfigLoader::load(None)?;
    init_telemetry(TelemetryOptions::default().with_default_filter(config.logging.level.clone()))?;

    // Missing API keys fail here, before the listener is bound.
    let toolkit = Toolkit::from_config(&config)?;
    let state = AppState::new(toolkit, app_config.max_concurrency);

    let app: Router = routes::build_router(state);

    let listener = TcpListener::bind(&app_config.listen_addr).await?;
    info!(
        address = %app_config.listen_addr,
        max_concurrency = app_config.max_concurrency,
        "proposal-gui listening"
    );

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| {
            error!(error = %err, "server shutdown with error");
            err
        })?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        if let Ok(mut stream) = signal(SignalKind::terminate()) {
            stream.recv().await;
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("shutdown signal received");
}
