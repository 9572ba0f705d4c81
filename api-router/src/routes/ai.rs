//! `POST /ai/query`: embeds the question, runs the GraphRAG hybrid retrieval,
//! and asks the LLM to answer grounded in the retrieved chunks -- unless
//! `service_mode` says to skip the LLM call entirely.

use axum::{extract::State, Json};
use common::{clients::llm::CompletionParams, utils::config::ServiceMode};
use retrieval_pipeline::HybridResult;
use serde::{Deserialize, Serialize};

use crate::{
    api_state::ApiState,
    envelope::{Envelope, Timer},
    error::ApiError,
};

#[derive(Debug, Deserialize)]
pub struct AiQueryRequest {
    pub query: String,
    #[serde(default)]
    pub include_graph: bool,
    #[serde(default = "default_service_mode")]
    pub service_mode: ServiceMode,
}

fn default_service_mode() -> ServiceMode {
    ServiceMode::Auto
}

#[derive(Debug, Serialize)]
pub struct AiQueryResponse {
    pub answer: String,
    pub node_highlights: Vec<String>,
    pub relationship_summaries: Vec<String>,
    pub recommendations: Vec<String>,
    pub sources: Vec<String>,
    pub confidence: f64,
    pub execution_time_ms: u64,
}

pub async fn query(
    State(state): State<ApiState>,
    Json(body): Json<AiQueryRequest>,
) -> Result<Json<Envelope<AiQueryResponse>>, ApiError> {
    let timer = Timer::start();

    let structured_limit = if body.include_graph { None } else { Some(0) };
    let hybrid = state.graphrag.retrieve(&body.query, None, structured_limit).await?;

    let answer = match body.service_mode {
        ServiceMode::Offline => templated_answer(&hybrid),
        ServiceMode::Online => llm_answer(&state, &body.query, &hybrid).await?,
        ServiceMode::Auto => match llm_answer(&state, &body.query, &hybrid).await {
            Ok(answer) => answer,
            Err(_) => templated_answer(&hybrid),
        },
    };

    let node_highlights = hybrid.structured_entities.iter().map(|e| e.label.clone()).collect();
    let relationship_summaries = hybrid
        .structured_entities
        .iter()
        .flat_map(|e| e.relationships.iter())
        .map(|r| format!("{} --{}--> {}", r.source, r.edge_type, r.target))
        .collect();
    let recommendations = hybrid
        .structured_entities
        .iter()
        .take(3)
        .map(|e| format!("Review related entity: {}", e.label))
        .collect();
    let sources = hybrid.chunks.iter().map(|c| c.id.clone()).collect();
    let confidence = confidence_for(&hybrid);

    let response = AiQueryResponse {
        answer,
        node_highlights,
        relationship_summaries,
        recommendations,
        sources,
        confidence,
        execution_time_ms: timer.elapsed_ms(),
    };

    Ok(Json(Envelope::ok(response, &timer)))
}

async fn llm_answer(state: &ApiState, query: &str, hybrid: &HybridResult) -> Result<String, common::error::AppError> {
    let context: String = hybrid
        .chunks
        .iter()
        .map(|c| c.content.as_str())
        .collect::<Vec<_>>()
        .join("\n---\n");
    let prompt = format!(
        "Answer the following question using only the context below. \
         If the context does not contain the answer, say so plainly.\n\nContext:\n{context}\n\nQuestion: {query}"
    );
    state.llm.complete(&prompt, CompletionParams::default()).await
}

fn templated_answer(hybrid: &HybridResult) -> String {
    match hybrid.chunks.first() {
        Some(chunk) => chunk.content.clone(),
        None => "No grounded context was retrieved for this query.".to_string(),
    }
}

fn confidence_for(hybrid: &HybridResult) -> f64 {
    if hybrid.degraded {
        0.2
    } else if hybrid.chunks.is_empty() {
        0.3
    } else {
        (0.5 + 0.1 * hybrid.chunks.len() as f64).min(0.95)
    }
}
