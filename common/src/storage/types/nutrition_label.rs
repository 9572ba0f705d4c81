use serde::{Deserialize, Serialize};

use crate::stored_object;

stored_object!(NutritionLabel, "nutrition_label", {
    formulation_id: String,
    version: u32,
    serving_size: f64,
    serving_size_unit: String,
    servings_per_container: Option<f64>,
    calories: f64,
    nutrients: serde_json::Value,
    additional_nutrients: serde_json::Value,
    generated_at: chrono::DateTime<chrono::Utc>,
    generated_by: String,
});

/// Labels are append-only; versions for a given formulation must be a
/// contiguous sequence starting at 1, with no gaps or duplicates.
pub fn versions_are_contiguous(labels: &[NutritionLabel]) -> bool {
    let mut versions: Vec<u32> = labels.iter().map(|l| l.version).collect();
    versions.sort_unstable();
    versions.iter().enumerate().all(|(idx, v)| *v == idx as u32 + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label(version: u32) -> NutritionLabel {
        let now = chrono::Utc::now();
        NutritionLabel {
            id: format!("label:{version}"),
            created_at: now,
            updated_at: now,
            formulation_id: "formulation:1".into(),
            version,
            serving_size: 40.0,
            serving_size_unit: "g".into(),
            servings_per_container: Some(12.0),
            calories: 150.0,
            nutrients: serde_json::json!({}),
            additional_nutrients: serde_json::json!({}),
            generated_at: now,
            generated_by: "nutrition_label_service".into(),
        }
    }

    #[test]
    fn contiguous_versions_pass() {
        assert!(versions_are_contiguous(&[label(1), label(2), label(3)]));
    }

    #[test]
    fn gap_fails() {
        assert!(!versions_are_contiguous(&[label(1), label(3)]));
    }
}
