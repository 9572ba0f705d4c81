use serde::{Deserialize, Serialize};

use crate::stored_object;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IngredientLine {
    pub id: String,
    pub name: String,
    pub pct: f64,
    pub quantity: f64,
    pub unit: String,
    pub function: String,
}

stored_object!(RecipeVersion, "recipe_version", {
    name: String,
    total_percentage: f64,
    ingredients: Vec<IngredientLine>,
    yield_target: f64,
    yield_unit: String,
});

/// Tolerance for `sum(ingredient.pct) == 100` enforced by RecipeEngineer.
pub const PERCENTAGE_TOLERANCE: f64 = 0.1;

/// Hard cap on the number of ingredients in a single recipe.
pub const MAX_INGREDIENTS: usize = 20;

impl RecipeVersion {
    pub fn percentage_error(&self) -> f64 {
        (self.total_percentage - 100.0).abs()
    }

    pub fn percentages_balanced(&self) -> bool {
        self.percentage_error() <= PERCENTAGE_TOLERANCE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(total_percentage: f64) -> RecipeVersion {
        let now = chrono::Utc::now();
        RecipeVersion {
            id: "recipe:1".into(),
            created_at: now,
            updated_at: now,
            name: "Protein bar".into(),
            total_percentage,
            ingredients: vec![
                IngredientLine {
                    id: "oat_flour".into(),
                    name: "Oat flour".into(),
                    pct: 85.0,
                    quantity: 850.0,
                    unit: "kg".into(),
                    function: "base".into(),
                },
                IngredientLine {
                    id: "whey".into(),
                    name: "Whey".into(),
                    pct: 15.0,
                    quantity: 150.0,
                    unit: "kg".into(),
                    function: "protein".into(),
                },
            ],
            yield_target: 1000.0,
            yield_unit: "kg".into(),
        }
    }

    #[test]
    fn balanced_within_tolerance() {
        assert!(sample(100.0).percentages_balanced());
        assert!(sample(100.1).percentages_balanced());
        assert!(!sample(98.5).percentages_balanced());
    }
}
