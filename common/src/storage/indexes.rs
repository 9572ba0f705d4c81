use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::{error::AppError, storage::db::GraphStore};

const INDEX_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Schema Registry: the closed set of node tables, their primary-key
/// uniqueness constraints, and the one vector index (`chunks`) over
/// `chunk.embedding`. `bootstrap` is idempotent and safe to call on every
/// startup; schema changes are additive only within a major version.
#[derive(Clone, Copy)]
struct UniqueConstraint {
    table: &'static str,
    index_name: &'static str,
    fields: &'static str,
}

const fn unique_constraints() -> [UniqueConstraint; 10] {
    [
        UniqueConstraint { table: "orchestration_run", index_name: "uniq_orchestration_run_id", fields: "id" },
        UniqueConstraint { table: "recipe_version", index_name: "uniq_recipe_version_id", fields: "id" },
        UniqueConstraint { table: "calculation_result", index_name: "uniq_calculation_result_id", fields: "id" },
        UniqueConstraint { table: "graph_snapshot", index_name: "uniq_graph_snapshot_id", fields: "id" },
        UniqueConstraint { table: "graph_entity", index_name: "uniq_graph_entity_id", fields: "id" },
        UniqueConstraint { table: "validation_report", index_name: "uniq_validation_report_id", fields: "id" },
        UniqueConstraint { table: "ui_config", index_name: "uniq_ui_config_id", fields: "id" },
        UniqueConstraint { table: "agent_invocation", index_name: "uniq_agent_invocation_id", fields: "id" },
        UniqueConstraint { table: "formulation", index_name: "uniq_formulation_id", fields: "id" },
        UniqueConstraint { table: "nutrition_label", index_name: "uniq_nutrition_label_id", fields: "id" },
    ]
}

/// `NutritionLabel` additionally enforces `(formulationId, version)`
/// uniqueness so concurrent `save` calls cannot race to the same version.
const NUTRITION_LABEL_VERSION_CONSTRAINT: UniqueConstraint = UniqueConstraint {
    table: "nutrition_label",
    index_name: "uniq_nutrition_label_version",
    fields: "formulation_id, version",
};

const CHUNK_VECTOR_INDEX_NAME: &str = "chunks";

#[derive(Clone, Copy)]
struct HnswIndexSpec {
    index_name: &'static str,
    table: &'static str,
    field: &'static str,
}

const CHUNK_HNSW_SPEC: HnswIndexSpec = HnswIndexSpec {
    index_name: CHUNK_VECTOR_INDEX_NAME,
    table: "chunk",
    field: "embedding",
};

impl HnswIndexSpec {
    fn definition_if_not_exists(&self, dimension: usize) -> String {
        format!(
            "DEFINE INDEX IF NOT EXISTS {index} ON TABLE {table} \
             FIELDS {field} HNSW DIMENSION {dimension} DIST COSINE TYPE F32 EFC 100 M 8 CONCURRENTLY;",
            index = self.index_name,
            table = self.table,
            field = self.field,
        )
    }

    fn definition_overwrite(&self, dimension: usize) -> String {
        format!(
            "DEFINE INDEX OVERWRITE {index} ON TABLE {table} \
             FIELDS {field} HNSW DIMENSION {dimension} DIST COSINE TYPE F32 EFC 100 M 8 CONCURRENTLY;",
            index = self.index_name,
            table = self.table,
            field = self.field,
        )
    }
}

/// Idempotently creates every uniqueness constraint and the `chunks` vector
/// index at dimension `embedding_dimension`. Overwrites the vector index
/// definition when the configured dimension changes from what is stored.
pub async fn bootstrap(store: &GraphStore, embedding_dimension: usize) -> Result<(), AppError> {
    bootstrap_inner(store, embedding_dimension)
        .await
        .map_err(|err| AppError::InternalError(err.to_string()))
}

async fn bootstrap_inner(store: &GraphStore, embedding_dimension: usize) -> Result<()> {
    for constraint in unique_constraints() {
        define_unique_constraint(store, constraint).await?;
    }
    define_unique_constraint(store, NUTRITION_LABEL_VERSION_CONSTRAINT).await?;

    match hnsw_state(store, &CHUNK_HNSW_SPEC, embedding_dimension).await? {
        HnswState::Missing => {
            run_definition(store, CHUNK_HNSW_SPEC.definition_if_not_exists(embedding_dimension))
                .await?;
        }
        HnswState::Matches => {}
        HnswState::Different(existing) => {
            info!(
                existing_dimension = existing,
                target_dimension = embedding_dimension,
                "overwriting chunks vector index to match configured embedding dimension"
            );
            run_definition(store, CHUNK_HNSW_SPEC.definition_overwrite(embedding_dimension)).await?;
        }
    }

    Ok(())
}

async fn define_unique_constraint(store: &GraphStore, constraint: UniqueConstraint) -> Result<()> {
    let query = format!(
        "DEFINE TABLE IF NOT EXISTS {table} SCHEMALESS; \
         DEFINE INDEX IF NOT EXISTS {index} ON TABLE {table} FIELDS {fields} UNIQUE;",
        table = constraint.table,
        index = constraint.index_name,
        fields = constraint.fields,
    );
    let response = store
        .client
        .query(query)
        .await
        .with_context(|| format!("defining constraint {}", constraint.index_name))?;
    response
        .check()
        .with_context(|| format!("constraint definition rejected for {}", constraint.index_name))?;
    Ok(())
}

enum HnswState {
    Missing,
    Matches,
    Different(u64),
}

async fn hnsw_state(
    store: &GraphStore,
    spec: &HnswIndexSpec,
    expected_dimension: usize,
) -> Result<HnswState> {
    match existing_hnsw_dimension(store, spec).await? {
        None => Ok(HnswState::Missing),
        Some(current) if current == expected_dimension => Ok(HnswState::Matches),
        Some(current) => Ok(HnswState::Different(current as u64)),
    }
}

async fn existing_hnsw_dimension(store: &GraphStore, spec: &HnswIndexSpec) -> Result<Option<usize>> {
    let Some(indexes) = table_index_definitions(store, spec.table).await? else {
        return Ok(None);
    };

    let Some(definition) = indexes
        .get(spec.index_name)
        .and_then(|details| details.get("Strand"))
        .and_then(|v| v.as_str())
    else {
        return Ok(None);
    };

    Ok(extract_dimension(definition).and_then(|d| usize::try_from(d).ok()))
}

fn extract_dimension(definition: &str) -> Option<u64> {
    definition
        .split("DIMENSION")
        .nth(1)
        .and_then(|rest| rest.split_whitespace().next())
        .and_then(|token| token.trim_end_matches(';').parse::<u64>().ok())
}

async fn run_definition(store: &GraphStore, definition: String) -> Result<()> {
    let mut attempts = 0;
    const MAX_ATTEMPTS: usize = 3;
    loop {
        attempts += 1;
        let response = store
            .client
            .query(definition.clone())
            .await
            .context("submitting index definition")?;
        match response.check() {
            Ok(_) => break,
            Err(err) => {
                let conflict = err.to_string().contains("read or write conflict");
                warn!(error = ?err, attempt = attempts, "index definition failed");
                if conflict && attempts < MAX_ATTEMPTS {
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    continue;
                }
                return Err(err).context("index definition failed");
            }
        }
    }

    poll_index_build_status(store, CHUNK_VECTOR_INDEX_NAME, "chunk", INDEX_POLL_INTERVAL).await
}

async fn poll_index_build_status(
    store: &GraphStore,
    index_name: &str,
    table: &str,
    poll_every: Duration,
) -> Result<()> {
    loop {
        tokio::time::sleep(poll_every).await;

        let info_query = format!("INFO FOR INDEX {index_name} ON TABLE {table};");
        let mut response = store
            .client
            .query(info_query)
            .await
            .with_context(|| format!("checking build status for {index_name}"))?;
        let info: Option<Value> = response.take(0).context("parsing INFO FOR INDEX")?;

        let Some(info) = info else {
            warn!(index = index_name, "INFO FOR INDEX returned nothing; assuming ready");
            break;
        };

        let status = info
            .get("building")
            .and_then(|b| b.get("status"))
            .and_then(|s| s.as_str())
            .unwrap_or("ready")
            .to_string();

        debug!(index = index_name, status = %status, "chunks index build status");

        if status.eq_ignore_ascii_case("ready") || status.eq_ignore_ascii_case("error") {
            break;
        }
    }
    Ok(())
}

async fn table_index_definitions(
    store: &GraphStore,
    table: &str,
) -> Result<Option<Map<String, Value>>> {
    let info_query = format!("INFO FOR TABLE {table};");
    let mut response = store
        .client
        .query(info_query)
        .await
        .with_context(|| format!("fetching table info for {table}"))?;

    let info: surrealdb::Value = response.take(0).context("taking table info response")?;
    let info_json: Value = serde_json::to_value(info).context("serializing table info")?;

    Ok(info_json
        .get("Object")
        .and_then(|o| o.get("indexes"))
        .and_then(|i| i.get("Object"))
        .and_then(|i| i.as_object())
        .cloned())
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct CountRow {
    count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn extract_dimension_parses_value() {
        let definition = "DEFINE INDEX chunks ON TABLE chunk FIELDS embedding HNSW DIMENSION 1536 DIST COSINE TYPE F32 EFC 100 M 8;";
        assert_eq!(extract_dimension(definition), Some(1536));
    }

    #[tokio::test]
    async fn bootstrap_is_idempotent() {
        let namespace = "indexes_ns";
        let database = &Uuid::new_v4().to_string();
        let store = GraphStore::memory(namespace, database).await.expect("in-memory store");

        bootstrap(&store, 1536).await.expect("first bootstrap");
        bootstrap(&store, 1536).await.expect("second bootstrap is a no-op");
    }

    #[tokio::test]
    async fn bootstrap_overwrites_index_on_dimension_change() {
        let namespace = "indexes_dim";
        let database = &Uuid::new_v4().to_string();
        let store = GraphStore::memory(namespace, database).await.expect("in-memory store");

        bootstrap(&store, 1536).await.expect("initial bootstrap");
        bootstrap(&store, 768).await.expect("dimension change bootstrap");
    }
}
