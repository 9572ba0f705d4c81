use common::{
    error::AppError,
    storage::{db::GraphStore, types::nutrition_label::NutritionLabel},
};

const MAX_HISTORY_LIMIT: u32 = 100;
const MAX_VERSION_ATTEMPTS: u32 = 5;

/// Caller-supplied inputs for a new nutrition label. Ingredient-level
/// nutrient aggregation from USDA FDC data is out of scope (the ingestion
/// scripts that would populate it are explicitly excluded); the caller
/// supplies the computed figures and this service only versions and stores
/// them.
#[derive(Debug, Clone)]
pub struct ComputedLabel {
    pub serving_size: f64,
    pub serving_size_unit: String,
    pub servings_per_container: Option<f64>,
    pub calories: f64,
    pub nutrients: serde_json::Value,
    pub additional_nutrients: serde_json::Value,
}

#[derive(Clone)]
pub struct NutritionLabelService {
    store: GraphStore,
}

impl NutritionLabelService {
    pub fn new(store: GraphStore) -> Self {
        Self { store }
    }

    /// Saves a new version of a formulation's nutrition label. Versions are
    /// contiguous starting at 1; a unique constraint on
    /// `(formulation_id, version)` rejects concurrent writers racing for the
    /// same version number, and this retries a handful of times on that race
    /// rather than surfacing it to the caller.
    pub async fn save(
        &self,
        formulation_id: &str,
        computed: ComputedLabel,
        generated_by: &str,
    ) -> Result<(String, u32), AppError> {
        for _ in 0..MAX_VERSION_ATTEMPTS {
            let next_version = self.next_version(formulation_id).await?;
            let label_id = format!("label:{}", uuid::Uuid::new_v4());
            let now = chrono::Utc::now();
            let label = NutritionLabel {
                id: label_id.clone(),
                created_at: now,
                updated_at: now,
                formulation_id: formulation_id.to_string(),
                version: next_version,
                serving_size: computed.serving_size,
                serving_size_unit: computed.serving_size_unit.clone(),
                servings_per_container: computed.servings_per_container,
                calories: computed.calories,
                nutrients: computed.nutrients.clone(),
                additional_nutrients: computed.additional_nutrients.clone(),
                generated_at: now,
                generated_by: generated_by.to_string(),
            };

            match self.store.store_item(label).await {
                Ok(_) => return Ok((label_id, next_version)),
                Err(AppError::Database(err)) if err.to_string().to_lowercase().contains("unique") => {
                    continue;
                }
                Err(err) => return Err(err),
            }
        }

        Err(AppError::PersistenceFailed(format!(
            "could not allocate a unique nutrition label version for formulation {formulation_id} after {MAX_VERSION_ATTEMPTS} attempts"
        )))
    }

    async fn next_version(&self, formulation_id: &str) -> Result<u32, AppError> {
        let existing = self.history(formulation_id, MAX_HISTORY_LIMIT).await?;
        Ok(existing.iter().map(|l| l.version).max().unwrap_or(0) + 1)
    }

    /// Returns up to `limit` labels for a formulation, newest version first.
    /// `limit` must be in `1..=100`.
    pub async fn history(&self, formulation_id: &str, limit: u32) -> Result<Vec<NutritionLabel>, AppError> {
        if limit == 0 || limit > MAX_HISTORY_LIMIT {
            return Err(AppError::Validation(format!(
                "limit must be between 1 and {MAX_HISTORY_LIMIT}, got {limit}"
            )));
        }

        let mut labels: Vec<NutritionLabel> = self.store.run_read(
            "SELECT * FROM nutrition_label WHERE formulation_id = $formulation_id ORDER BY version DESC LIMIT $limit;",
            vec![
                ("formulation_id", formulation_id.into()),
                ("limit", i64::from(limit).into()),
            ],
        ).await?;
        labels.sort_by(|a, b| b.version.cmp(&a.version));
        Ok(labels)
    }

    pub async fn get_by_id(&self, label_id: &str) -> Result<Option<NutritionLabel>, AppError> {
        self.store.get_item(label_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn computed() -> ComputedLabel {
        ComputedLabel {
            serving_size: 40.0,
            serving_size_unit: "g".into(),
            servings_per_container: Some(12.0),
            calories: 150.0,
            nutrients: serde_json::json!({ "protein_g": 10.0 }),
            additional_nutrients: serde_json::json!({}),
        }
    }

    #[tokio::test]
    async fn versions_increment_from_one() {
        let store = GraphStore::memory("test_ns", &uuid::Uuid::new_v4().to_string())
            .await
            .expect("in-memory store");
        let service = NutritionLabelService::new(store);

        let (_, v1) = service.save("formulation:1", computed(), "nutrition_label_service").await.expect("save v1");
        let (_, v2) = service.save("formulation:1", computed(), "nutrition_label_service").await.expect("save v2");
        assert_eq!(v1, 1);
        assert_eq!(v2, 2);
    }

    #[tokio::test]
    async fn history_rejects_out_of_range_limit() {
        let store = GraphStore::memory("test_ns", &uuid::Uuid::new_v4().to_string())
            .await
            .expect("in-memory store");
        let service = NutritionLabelService::new(store);

        let zero = service.history("formulation:1", 0).await.expect_err("limit 0 rejected");
        assert_eq!(zero.code(), "VALIDATION_ERROR");

        let too_many = service.history("formulation:1", 101).await.expect_err("limit 101 rejected");
        assert_eq!(too_many.code(), "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn history_returns_newest_version_first() {
        let store = GraphStore::memory("test_ns", &uuid::Uuid::new_v4().to_string())
            .await
            .expect("in-memory store");
        let service = NutritionLabelService::new(store);

        service.save("formulation:2", computed(), "nutrition_label_service").await.expect("save v1");
        service.save("formulation:2", computed(), "nutrition_label_service").await.expect("save v2");

        let history = service.history("formulation:2", 10).await.expect("history");
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].version, 2);
        assert_eq!(history[1].version, 1);
    }
}
