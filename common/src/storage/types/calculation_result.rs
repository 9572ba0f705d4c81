use serde::{Deserialize, Serialize};

use crate::stored_object;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScaledIngredient {
    pub id: String,
    pub name: String,
    pub quantity: f64,
    pub unit: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StepYield {
    pub step: String,
    pub input_mass: f64,
    pub output_mass: f64,
    pub byproduct_mass: f64,
    pub waste_mass: f64,
    pub yield_pct: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct CostBreakdown {
    pub material: f64,
    pub labor: f64,
    pub overhead: f64,
    pub packaging: f64,
    pub byproduct_credit: f64,
}

impl CostBreakdown {
    pub fn total(&self) -> f64 {
        self.material + self.labor + self.overhead + self.packaging - self.byproduct_credit
    }
}

stored_object!(CalculationResult, "calculation_result", {
    scaling_factor: f64,
    batch_size: f64,
    batch_unit: String,
    scaled_ingredients: Vec<ScaledIngredient>,
    step_yields: Vec<StepYield>,
    overall_yield: f64,
    cost_breakdown: CostBreakdown,
    cost_per_unit: f64,
    warnings: Vec<String>,
});

impl CalculationResult {
    pub fn mass_balance_ok(&self, tolerance: f64) -> bool {
        self.step_yields.iter().all(|s| {
            (s.input_mass - s.output_mass - s.byproduct_mass - s.waste_mass).abs() <= tolerance
        })
    }

    pub fn overall_yield_in_range(&self) -> bool {
        (0.0..=100.0).contains(&self.overall_yield)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cost_breakdown_totals_nets_byproduct_credit() {
        let breakdown = CostBreakdown {
            material: 10.0,
            labor: 2.0,
            overhead: 1.0,
            packaging: 0.5,
            byproduct_credit: 1.5,
        };
        assert_eq!(breakdown.total(), 12.0);
    }

    #[test]
    fn mass_balance_within_tolerance() {
        let now = chrono::Utc::now();
        let result = CalculationResult {
            id: "calc:1".into(),
            created_at: now,
            updated_at: now,
            scaling_factor: 1.0,
            batch_size: 1.0,
            batch_unit: "kg".into(),
            scaled_ingredients: vec![],
            step_yields: vec![StepYield {
                step: "mix".into(),
                input_mass: 1.0,
                output_mass: 0.94,
                byproduct_mass: 0.01,
                waste_mass: 0.0,
                yield_pct: 94.0,
            }],
            overall_yield: 94.0,
            cost_breakdown: CostBreakdown::default(),
            cost_per_unit: 0.0,
            warnings: vec![],
        };
        // off by 0.05 on a 1kg batch exceeds the 0.01 tolerance
        assert!(!result.mass_balance_ok(0.01));
        assert!(result.mass_balance_ok(0.1));
    }
}
