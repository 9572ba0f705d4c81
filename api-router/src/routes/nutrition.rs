//! `POST /formulations/{formulationId}/nutrition-label`,
//! `GET /formulations/{formulationId}/nutrition-labels`,
//! `GET /nutrition/label/{labelId}`.
//!
//! Ingredient-level nutrient aggregation against USDA FDC data is out of
//! scope (the ingestion scripts that would populate it are excluded); the
//! caller — an external PLM/ERP adapter — supplies the computed nutrient
//! figures in the request body, and this service only versions and stores
//! them.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use common::error::AppError;
use persistence::nutrition_label::ComputedLabel;
use serde::{Deserialize, Serialize};

use crate::{
    api_state::ApiState,
    envelope::{Envelope, Timer},
    error::ApiError,
};

const DEFAULT_HISTORY_LIMIT: u32 = 20;

fn default_save_to_neo4j() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct NutritionLabelQuery {
    pub serving_size: f64,
    pub serving_size_unit: String,
    pub servings_per_container: Option<f64>,
    #[serde(default = "default_save_to_neo4j")]
    pub save_to_neo4j: bool,
}

#[derive(Debug, Deserialize)]
pub struct NutritionLabelRequest {
    pub calories: f64,
    #[serde(default)]
    pub nutrients: serde_json::Value,
    #[serde(default)]
    pub additional_nutrients: serde_json::Value,
    #[serde(default = "default_generated_by")]
    pub generated_by: String,
}

fn default_generated_by() -> String {
    "nutrition_label_service".to_string()
}

#[derive(Debug, Serialize)]
pub struct NutritionLabelResponse {
    pub label_id: Option<String>,
    pub version: Option<u32>,
    pub formulation_id: String,
    pub serving_size: f64,
    pub serving_size_unit: String,
    pub servings_per_container: Option<f64>,
    pub calories: f64,
    pub nutrients: serde_json::Value,
    pub additional_nutrients: serde_json::Value,
}

/// `save_to_neo4j=false` returns the computed label without persisting it --
/// preserved for back-compatibility; new clients should always persist.
pub async fn create_label(
    State(state): State<ApiState>,
    Path(formulation_id): Path<String>,
    Query(query): Query<NutritionLabelQuery>,
    Json(body): Json<NutritionLabelRequest>,
) -> Result<Json<Envelope<NutritionLabelResponse>>, ApiError> {
    let timer = Timer::start();

    if query.serving_size <= 0.0 {
        return Err(ApiError::from(AppError::Validation(format!(
            "servingSize must be positive, got {}",
            query.serving_size
        ))));
    }

    let computed = ComputedLabel {
        serving_size: query.serving_size,
        serving_size_unit: query.serving_size_unit.clone(),
        servings_per_container: query.servings_per_container,
        calories: body.calories,
        nutrients: body.nutrients.clone(),
        additional_nutrients: body.additional_nutrients.clone(),
    };

    let (label_id, version) = if query.save_to_neo4j {
        let (label_id, version) = state
            .nutrition_labels
            .save(&formulation_id, computed, &body.generated_by)
            .await?;
        (Some(label_id), Some(version))
    } else {
        (None, None)
    };

    let response = NutritionLabelResponse {
        label_id,
        version,
        formulation_id,
        serving_size: query.serving_size,
        serving_size_unit: query.serving_size_unit,
        servings_per_container: query.servings_per_container,
        calories: body.calories,
        nutrients: body.nutrients,
        additional_nutrients: body.additional_nutrients,
    };

    Ok(Json(Envelope::ok(response, &timer)))
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<u32>,
}

pub async fn history(
    State(state): State<ApiState>,
    Path(formulation_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Envelope<Vec<common::storage::types::nutrition_label::NutritionLabel>>>, ApiError> {
    let timer = Timer::start();
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    let labels = state.nutrition_labels.history(&formulation_id, limit).await?;
    Ok(Json(Envelope::ok(labels, &timer)))
}

pub async fn get_by_id(
    State(state): State<ApiState>,
    Path(label_id): Path<String>,
) -> Result<Json<Envelope<common::storage::types::nutrition_label::NutritionLabel>>, ApiError> {
    let timer = Timer::start();
    let label = state
        .nutrition_labels
        .get_by_id(&label_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("nutrition label {label_id} not found")))?;
    Ok(Json(Envelope::ok(label, &timer)))
}
