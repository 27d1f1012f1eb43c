mod health;
mod proposal;

use axum::{Router, response::Html, routing::get};
use health::health_router;
use proposal::proposal_router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

const INDEX_HTML: &str = include_str!("../../web/index.html");

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .nest("/health", health_router())
        .nest("/api", proposal_router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}
