use axum::{
    routing::{get, post},
    Router,
};
use routes::{ai, health, metrics, nutrition, orchestration};

pub mod api_state;
pub mod envelope;
pub mod error;
mod routes;

pub use api_state::ApiState;

/// Router for API functionality, version 1. Nested under `/api/v1` by the
/// binary crate, which supplies the shared `ApiState` via `.with_state`.
pub fn api_routes_v1() -> Router<ApiState> {
    Router::new()
        .route("/orchestration/run", post(orchestration::run))
        .route("/orchestration/runs", get(orchestration::list_runs))
        .route("/orchestration/runs/{run_id}", get(orchestration::get_run))
        .route(
            "/formulations/{formulation_id}/nutrition-label",
            post(nutrition::create_label),
        )
        .route(
            "/formulations/{formulation_id}/nutrition-labels",
            get(nutrition::history),
        )
        .route("/nutrition/label/{label_id}", get(nutrition::get_by_id))
        .route("/ai/query", post(ai::query))
        .route("/metrics", get(metrics::metrics))
        .route("/health", get(health::health))
}
