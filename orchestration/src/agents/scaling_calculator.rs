//! ScalingCalculator: expands a percentage-based [`RecipeVersion`] against a
//! target batch size into absolute quantities, a cost breakdown, and yield
//! figures.

use common::{
    cache::CacheLayer,
    error::AppError,
    storage::types::calculation_result::{CalculationResult, CostBreakdown, ScaledIngredient, StepYield},
};

use crate::{contracts::ScalingCalculatorInput, ingredient_data};

/// Units treated as volumetric; a density lookup converts mass<->volume for these.
const VOLUME_UNITS: [&str; 5] = ["l", "ml", "gal", "fl_oz", "kl"];

/// Ratios applied on top of material cost for labor/overhead/packaging.
/// Not specified by the upstream request; fixed here and recorded as an
/// Open Question resolution (see DESIGN.md).
const LABOR_RATIO: f64 = 0.05;
const OVERHEAD_RATIO: f64 = 0.03;
const PACKAGING_RATIO: f64 = 0.02;

/// Fixed production line applied to every batch: `(step name, yield fraction,
/// byproduct fraction, waste fraction)`, each triple summing to `1.0` so
/// every step balances exactly. Not specified by the upstream request;
/// fixed here as a representative bar-production line and recorded as an
/// Open Question resolution (see DESIGN.md).
const PROCESS_STEPS: [(&str, f64, f64, f64); 4] = [
    ("mixing", 1.0, 0.0, 0.0),
    ("forming", 0.99, 0.0, 0.01),
    ("baking", 0.94, 0.06, 0.0),
    ("packaging", 0.995, 0.0, 0.005),
];

pub fn run(caches: &CacheLayer, input: ScalingCalculatorInput) -> Result<CalculationResult, AppError> {
    if input.target_batch.size <= 0.0 {
        return Err(AppError::InvalidBatch(format!(
            "target batch size must be positive, got {}",
            input.target_batch.size
        )));
    }

    let target_mass_kg = to_mass_kg(caches, &input.target_batch.unit, input.target_batch.size);
    let scaling_factor = target_mass_kg / total_recipe_mass_kg(caches, &input.recipe);

    let mut warnings = Vec::new();
    if scaling_factor < 0.1 {
        warnings.push(format!("scale factor {scaling_factor:.3} is unusually small"));
    } else if scaling_factor > 100.0 {
        warnings.push(format!("scale factor {scaling_factor:.3} is unusually large"));
    }

    let mut scaled_ingredients = Vec::with_capacity(input.recipe.ingredients.len());
    let mut material_cost = 0.0;

    for ingredient in &input.recipe.ingredients {
        let quantity_kg = target_mass_kg * (ingredient.pct / 100.0);
        let cost_per_kg = ingredient_data::cost_per_kg_for(caches, &ingredient.id);
        material_cost += quantity_kg * cost_per_kg;

        scaled_ingredients.push(ScaledIngredient {
            id: ingredient.id.clone(),
            name: ingredient.name.clone(),
            quantity: plant_round(quantity_kg),
            unit: "kg".to_string(),
        });
    }

    let step_yields = derive_step_yields(target_mass_kg);

    let overall_yield = step_yields
        .iter()
        .map(|s| s.yield_pct / 100.0)
        .product::<f64>()
        * 100.0;

    let cost_breakdown = CostBreakdown {
        material: material_cost,
        labor: material_cost * LABOR_RATIO,
        overhead: material_cost * OVERHEAD_RATIO,
        packaging: material_cost * PACKAGING_RATIO,
        byproduct_credit: 0.0,
    };
    let cost_per_unit = cost_breakdown.total() / target_mass_kg;

    let now = chrono::Utc::now();
    Ok(CalculationResult {
        id: format!("calc:{}", uuid::Uuid::new_v4()),
        created_at: now,
        updated_at: now,
        scaling_factor,
        batch_size: input.target_batch.size,
        batch_unit: input.target_batch.unit,
        scaled_ingredients,
        step_yields,
        overall_yield,
        cost_breakdown,
        cost_per_unit,
        warnings,
    })
}

/// Runs the target batch mass through the fixed [`PROCESS_STEPS`] line,
/// each step's input being the prior step's output, so `overall_yield`
/// reflects real cumulative loss rather than a constant 100%.
fn derive_step_yields(target_mass_kg: f64) -> Vec<StepYield> {
    let mut stage_input = target_mass_kg;
    PROCESS_STEPS
        .iter()
        .map(|&(step, yield_fraction, byproduct_fraction, waste_fraction)| {
            let input_mass = stage_input;
            let output_mass = input_mass * yield_fraction;
            let byproduct_mass = input_mass * byproduct_fraction;
            let waste_mass = input_mass * waste_fraction;
            stage_input = output_mass;
            StepYield {
                step: step.to_string(),
                input_mass,
                output_mass,
                byproduct_mass,
                waste_mass,
                yield_pct: yield_fraction * 100.0,
            }
        })
        .collect()
}

fn total_recipe_mass_kg(caches: &CacheLayer, recipe: &common::storage::types::recipe_version::RecipeVersion) -> f64 {
    if recipe.yield_target > 0.0 {
        to_mass_kg(caches, &recipe.yield_unit, recipe.yield_target)
    } else {
        1.0
    }
}

fn to_mass_kg(caches: &CacheLayer, unit: &str, quantity: f64) -> f64 {
    let lower = unit.to_lowercase();
    if VOLUME_UNITS.contains(&lower.as_str()) {
        let density = ingredient_data::density_for(caches, "water");
        quantity * density
    } else {
        quantity
    }
}

/// Plant rounding: quantities at or above one unit round to 2dp; smaller
/// quantities round to 3dp, matching finer-grained batching of minor
/// ingredients.
fn plant_round(quantity: f64) -> f64 {
    let places = if quantity.abs() >= 1.0 { 2 } else { 3 };
    let factor = 10f64.powi(places);
    (quantity * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{
        metrics::Metrics,
        storage::types::recipe_version::{IngredientLine, RecipeVersion},
    };

    use crate::contracts::TargetBatch;

    fn sample_recipe() -> RecipeVersion {
        let now = chrono::Utc::now();
        RecipeVersion {
            id: "recipe:1".into(),
            created_at: now,
            updated_at: now,
            name: "Protein bar".into(),
            total_percentage: 100.0,
            ingredients: vec![
                IngredientLine {
                    id: "oat_flour".into(),
                    name: "oat flour".into(),
                    pct: 85.0,
                    quantity: 0.0,
                    unit: "kg".into(),
                    function: "base".into(),
                },
                IngredientLine {
                    id: "whey".into(),
                    name: "whey".into(),
                    pct: 15.0,
                    quantity: 0.0,
                    unit: "kg".into(),
                    function: "protein".into(),
                },
            ],
            yield_target: 100.0,
            yield_unit: "kg".into(),
        }
    }

    #[test]
    fn happy_path_scales_to_literal_quantities() {
        let caches = CacheLayer::new(Metrics::new_for_test());
        let input = ScalingCalculatorInput {
            recipe: sample_recipe(),
            target_batch: TargetBatch { size: 1000.0, unit: "kg".to_string() },
        };
        let result = run(&caches, input).expect("scaling succeeds");
        assert_eq!(result.scaled_ingredients[0].quantity, 850.0);
        assert_eq!(result.scaled_ingredients[1].quantity, 150.0);
        assert!((result.scaling_factor - 10.0).abs() < 1e-9);
        assert!(result.overall_yield_in_range());
        assert!(result.overall_yield < 100.0);
        assert!(result.mass_balance_ok(0.01));
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn step_yields_compose_multiplicatively_and_balance() {
        let caches = CacheLayer::new(Metrics::new_for_test());
        let input = ScalingCalculatorInput {
            recipe: sample_recipe(),
            target_batch: TargetBatch { size: 1000.0, unit: "kg".to_string() },
        };
        let result = run(&caches, input).expect("scaling succeeds");
        assert_eq!(result.step_yields.len(), PROCESS_STEPS.len());
        let expected_overall = PROCESS_STEPS.iter().map(|&(_, y, _, _)| y).product::<f64>() * 100.0;
        assert!((result.overall_yield - expected_overall).abs() < 1e-6);
        // each step's output feeds the next step's input
        for window in result.step_yields.windows(2) {
            assert!((window[0].output_mass - window[1].input_mass).abs() < 1e-9);
        }
        assert!(result.mass_balance_ok(0.01));
    }

    #[test]
    fn oversized_scale_factor_emits_a_warning() {
        let caches = CacheLayer::new(Metrics::new_for_test());
        let input = ScalingCalculatorInput {
            recipe: sample_recipe(),
            target_batch: TargetBatch { size: 200_000.0, unit: "kg".to_string() },
        };
        let result = run(&caches, input).expect("scaling succeeds");
        assert!(result.scaling_factor > 100.0);
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("unusually large"));
    }

    #[test]
    fn undersized_scale_factor_emits_a_warning() {
        let caches = CacheLayer::new(Metrics::new_for_test());
        let input = ScalingCalculatorInput {
            recipe: sample_recipe(),
            target_batch: TargetBatch { size: 0.05, unit: "kg".to_string() },
        };
        let result = run(&caches, input).expect("scaling succeeds");
        assert!(result.scaling_factor < 0.1);
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("unusually small"));
    }

    #[test]
    fn non_positive_batch_is_invalid() {
        let caches = CacheLayer::new(Metrics::new_for_test());
        let input = ScalingCalculatorInput {
            recipe: sample_recipe(),
            target_batch: TargetBatch { size: 0.0, unit: "kg".to_string() },
        };
        let err = run(&caches, input).expect_err("should reject");
        assert_eq!(err.code(), "INVALID_BATCH");
    }

    #[test]
    fn small_quantities_round_to_three_decimal_places() {
        assert_eq!(plant_round(0.123456), 0.123);
        assert_eq!(plant_round(12.3456), 12.35);
    }
}
