//! `POST /orchestration/run`, `GET /orchestration/runs`,
//! `GET /orchestration/runs/{runId}`.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use common::{error::AppError, storage::types::orchestration_run::RunStatus};
use orchestration::{contracts::TargetBatch, OrchestrationResult};
use persistence::{ListRunsParams, RunDetail, RunSummary};
use serde::Deserialize;

use crate::{
    api_state::ApiState,
    envelope::{Envelope, Timer},
    error::ApiError,
};

#[derive(Debug, Deserialize)]
pub struct RunRequest {
    pub user_request: String,
    #[serde(default)]
    pub batch: Option<TargetBatch>,
}

pub async fn run(
    State(state): State<ApiState>,
    Json(body): Json<RunRequest>,
) -> Result<Json<Envelope<OrchestrationResult>>, ApiError> {
    let timer = Timer::start();

    if body.user_request.trim().is_empty() {
        return Err(ApiError::from(AppError::Validation("userRequest must not be empty".to_string())));
    }
    let target_batch = body.batch.unwrap_or_default();
    if target_batch.size <= 0.0 {
        return Err(ApiError::from(AppError::InvalidBatch(format!(
            "batch size must be positive, got {}",
            target_batch.size
        ))));
    }

    let result = state.orchestrator.run(body.user_request, target_batch).await?;

    persistence::persist(&state.store, &result).await?;

    if is_run_timeout(&result) {
        return Err(ApiError::from(AppError::RunTimeout(std::time::Duration::from_secs(30))));
    }

    let warnings = result.warnings.clone();
    Ok(Json(Envelope::ok_with_warnings(result, warnings, &timer)))
}

/// A run timeout shows up as every not-yet-attempted agent recorded
/// `skipped` with a `"run timeout"` error -- the 30s deadline firing mid-run,
/// as opposed to an individual agent failing on its own.
fn is_run_timeout(result: &OrchestrationResult) -> bool {
    result
        .invocations
        .iter()
        .any(|inv| inv.error.as_deref() == Some("run timeout"))
}

#[derive(Debug, Deserialize)]
pub struct ListRunsQuery {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub status: Option<RunStatus>,
    pub start_date: Option<chrono::DateTime<chrono::Utc>>,
    pub end_date: Option<chrono::DateTime<chrono::Utc>>,
}

pub async fn list_runs(
    State(state): State<ApiState>,
    Query(query): Query<ListRunsQuery>,
) -> Result<Json<Envelope<Vec<RunSummary>>>, ApiError> {
    let timer = Timer::start();
    let params = ListRunsParams {
        limit: query.limit,
        offset: query.offset,
        status: query.status,
        start_date: query.start_date,
        end_date: query.end_date,
    };
    let summaries = state.history.list(params).await?;
    Ok(Json(Envelope::ok(summaries, &timer)))
}

pub async fn get_run(
    State(state): State<ApiState>,
    Path(run_id): Path<String>,
) -> Result<Json<Envelope<RunDetail>>, ApiError> {
    let timer = Timer::start();
    let detail = state
        .history
        .get(&run_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("orchestration run {run_id} not found")))?;
    Ok(Json(Envelope::ok(detail, &timer)))
}
