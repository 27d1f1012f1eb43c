use axum::{Json, Router, extract::State, routing::post};
use proposal_core::{StageReport, extract_links};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::AppError;
use crate::render::markdown_to_html;
use crate::state::{AppState, RunMetrics};

#[derive(Debug, Deserialize)]
pub struct ProposalRequest {
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub industry: String,
}

#[derive(Debug, Serialize)]
pub struct ProposalResponse {
    pub run_id: String,
    pub proposal: String,
    pub resources: String,
    pub proposal_html: String,
    pub resources_html: String,
    /// Links found in the resources text, in order of appearance.
    pub links: Vec<String>,
    pub stages: Vec<StageReport>,
    pub capacity: RunMetrics,
}

pub fn proposal_router() -> Router<AppState> {
    Router::new().route("/proposals", post(create_proposal))
}

#[instrument(skip_all, fields(company = %payload.company, industry = %payload.industry))]
async fn create_proposal(
    State(state): State<AppState>,
    Json(payload): Json<ProposalRequest>,
) -> Result<Json<ProposalResponse>, AppError> {
    let service = state.proposal_service();
    let outcome = service
        .generate(&payload.company, &payload.industry)
        .await
        .map_err(AppError::from)?;

    let response = ProposalResponse {
        proposal_html: markdown_to_html(&outcome.proposal),
        resources_html: markdown_to_html(&outcome.resources),
        links: extract_links(&outcome.resources),
        run_id: outcome.run_id,
        proposal: outcome.proposal,
        resources: outcome.resources,
        stages: outcome.stages,
        capacity: service.metrics(),
    };

    Ok(Json(response))
}
