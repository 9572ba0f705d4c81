//! `GET /health`: a cheap liveness/readiness probe for each external
//! dependency, used by `service_mode: auto` callers and by k8s-style probes.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::{
    api_state::ApiState,
    envelope::{Envelope, Timer},
};

#[derive(Debug, Serialize)]
pub struct CacheHitRates {
    pub ingredient: f64,
    pub density: f64,
    pub cost: f64,
    pub fdc: f64,
}

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub llm_available: bool,
    pub store_available: bool,
    pub graphrag_available: bool,
    pub cache_hit_rate: CacheHitRates,
}

pub async fn health(State(state): State<ApiState>) -> Json<Envelope<HealthStatus>> {
    let timer = Timer::start();

    let store_available = state.store.is_available().await;
    let llm_available = state.llm.is_available().await;
    // GraphRAG degrades gracefully when the vector index is unreachable but
    // still needs the store up; it has no independent dependency to probe.
    let graphrag_available = store_available;

    let status = if store_available { "ok" } else { "degraded" };

    let cache_hit_rate = CacheHitRates {
        ingredient: state.metrics.cache_hit_rate("ingredient"),
        density: state.metrics.cache_hit_rate("density"),
        cost: state.metrics.cache_hit_rate("cost"),
        fdc: state.metrics.cache_hit_rate("fdc"),
    };

    let body = HealthStatus { status, llm_available, store_available, graphrag_available, cache_hit_rate };
    Json(Envelope::ok(body, &timer))
}
