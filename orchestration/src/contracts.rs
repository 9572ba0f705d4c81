//! Typed hand-off payloads between pipeline stages. Each agent declares a
//! typed input DTO; it reads only the documented fields of its predecessors'
//! outputs, never the whole upstream context.

use serde::{Deserialize, Serialize};

use common::storage::types::{
    calculation_result::CalculationResult, graph_snapshot::GraphSnapshot,
    recipe_version::RecipeVersion, validation_report::ValidationReport,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeEngineerInput {
    pub user_request: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetBatch {
    pub size: f64,
    pub unit: String,
}

impl Default for TargetBatch {
    fn default() -> Self {
        Self { size: 1.0, unit: "kg".to_string() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScalingCalculatorInput {
    pub recipe: RecipeVersion,
    pub target_batch: TargetBatch,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphBuilderInput {
    pub recipe: RecipeVersion,
    pub calculation: CalculationResult,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QaValidatorInput {
    pub recipe: RecipeVersion,
    pub calculation: CalculationResult,
    pub graph: GraphSnapshot,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiDesignerInput {
    pub recipe: RecipeVersion,
    pub calculation: CalculationResult,
    pub validation: ValidationReport,
}
