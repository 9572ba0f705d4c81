//! `GET /metrics`: Prometheus text-exposition format, outside the
//! `{success,data,error}` envelope every other endpoint returns.

use axum::{extract::State, http::StatusCode, response::IntoResponse};

use crate::api_state::ApiState;

pub async fn metrics(State(state): State<ApiState>) -> impl IntoResponse {
    match state.metrics.render() {
        Ok(body) => (StatusCode::OK, body),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
    }
}
