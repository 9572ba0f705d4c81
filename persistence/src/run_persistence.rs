use std::time::Duration;

use common::{error::AppError, storage::db::GraphStore};
use orchestration::pipeline::OrchestrationResult;
use tracing::warn;

/// IDs of every artifact a persisted run left behind, handed back to the
/// caller alongside the orchestration result.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PersistedRunIds {
    pub run_id: String,
    pub recipe_id: Option<String>,
    pub calculation_id: Option<String>,
    pub graph_snapshot_id: Option<String>,
    pub validation_id: Option<String>,
    pub ui_config_id: Option<String>,
    pub graph_entity_ids: Vec<String>,
}

const MAX_ATTEMPTS: u32 = 3;

/// Persists one orchestration run: the run record, whichever artifacts it
/// produced, the `AgentInvocation` trail, and (for a graph snapshot) the
/// exploded `GraphEntity` rows plus their relationships. Runs as a single
/// write transaction; every id is reused across retries so a retried persist
/// converges on the same rows rather than duplicating them.
pub async fn persist(store: &GraphStore, result: &OrchestrationResult) -> Result<PersistedRunIds, AppError> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        match persist_once(store, result).await {
            Ok(ids) => return Ok(ids),
            Err(err) if attempt < MAX_ATTEMPTS && is_transient(&err) => {
                warn!(attempt, run_id = %result.run_id, error = %err, "transient persistence failure, retrying");
                tokio::time::sleep(Duration::from_millis(100 * u64::from(attempt))).await;
            }
            Err(err) => return Err(AppError::PersistenceFailed(err.to_string())),
        }
    }
}

fn is_transient(err: &AppError) -> bool {
    matches!(err, AppError::StoreUnavailable(_) | AppError::Database(_))
}

/// Builds and runs one atomic `UPSERT`-based transaction. `UPSERT` rather
/// than `CREATE` is what makes a retried persist idempotent: every id below
/// is derived deterministically from `result.run_id`, so re-running this
/// against the same result converges on the same rows instead of duplicating
/// them.
async fn persist_once(store: &GraphStore, result: &OrchestrationResult) -> Result<PersistedRunIds, AppError> {
    let mut statements = String::new();
    let mut params: Vec<(String, serde_json::Value)> = Vec::new();

    let run_id = &result.run_id;
    let now = chrono::Utc::now();
    let run_record = common::storage::types::orchestration_run::OrchestrationRun {
        id: run_id.clone(),
        created_at: now,
        updated_at: now,
        status: result.status,
        timestamp: now,
        total_duration_ms: result.total_duration_ms,
        user_request: result.user_request.clone(),
    };
    push_upsert(&mut statements, &mut params, "orchestration_run", run_id, "run_content", &run_record);

    let mut recipe_id = None;
    if let Some(recipe) = &result.recipe {
        push_upsert(&mut statements, &mut params, "recipe_version", &recipe.id, "recipe_content", recipe);
        push_edge(&mut statements, &mut params, "used_recipe", run_id, "orchestration_run", &recipe.id, "recipe_version");
        recipe_id = Some(recipe.id.clone());
    }

    let mut calculation_id = None;
    if let Some(calculation) = &result.calculation {
        push_upsert(&mut statements, &mut params, "calculation_result", &calculation.id, "calculation_content", calculation);
        push_edge(&mut statements, &mut params, "has_calculation", run_id, "orchestration_run", &calculation.id, "calculation_result");
        calculation_id = Some(calculation.id.clone());
    }

    let mut graph_snapshot_id = None;
    let mut graph_entity_ids = Vec::new();
    if let Some(graph) = &result.graph {
        push_upsert(&mut statements, &mut params, "graph_snapshot", &graph.id, "graph_content", graph);
        push_edge(&mut statements, &mut params, "has_graph_snapshot", run_id, "orchestration_run", &graph.id, "graph_snapshot");
        graph_snapshot_id = Some(graph.id.clone());

        for node in &graph.nodes {
            let entity_id = format!("{run_id}#{}", node.id);
            let entity = common::storage::types::graph_entity::GraphEntity {
                id: entity_id.clone(),
                created_at: chrono::Utc::now(),
                updated_at: chrono::Utc::now(),
                entity_type: node.node_type.clone(),
                label: node.label.clone(),
                properties: node.properties.clone(),
                run_id: run_id.clone(),
            };
            push_upsert(&mut statements, &mut params, "graph_entity", &entity_id, &format!("entity_{entity_id}_content"), &entity);
            push_edge(&mut statements, &mut params, "generated_entity", run_id, "orchestration_run", &entity_id, "graph_entity");
            graph_entity_ids.push(entity_id);
        }

        for edge in &graph.edges {
            let source_id = format!("{run_id}#{}", edge.source);
            let target_id = format!("{run_id}#{}", edge.target);
            let rel_id = format!("{run_id}#{}", edge.id);
            let rel = serde_json::json!({
                "source": source_id,
                "target": target_id,
                "edge_type": edge.edge_type,
                "run_id": run_id,
                "properties": edge.properties,
            });
            push_raw_upsert(&mut statements, &mut params, "entity_relationship", &rel_id, &format!("rel_{rel_id}_content"), rel);
        }
    }

    let mut validation_id = None;
    if let Some(validation) = &result.validation {
        push_upsert(&mut statements, &mut params, "validation_report", &validation.id, "validation_content", validation);
        push_edge(&mut statements, &mut params, "has_validation", run_id, "orchestration_run", &validation.id, "validation_report");
        validation_id = Some(validation.id.clone());
    }

    let mut ui_config_id = None;
    if let Some(ui_config) = &result.ui_config {
        push_upsert(&mut statements, &mut params, "ui_config", &ui_config.id, "ui_config_content", ui_config);
        push_edge(&mut statements, &mut params, "has_ui_config", run_id, "orchestration_run", &ui_config.id, "ui_config");
        ui_config_id = Some(ui_config.id.clone());
    }

    for invocation in &result.invocations {
        let param_name = format!("invocation_{}_content", invocation.id);
        push_upsert(&mut statements, &mut params, "agent_invocation", &invocation.id, &param_name, invocation);
        push_edge(&mut statements, &mut params, "has_agent_invocation", run_id, "orchestration_run", &invocation.id, "agent_invocation");
    }

    store.run_write_values(&statements, params).await?;

    Ok(PersistedRunIds {
        run_id: run_id.clone(),
        recipe_id,
        calculation_id,
        graph_snapshot_id,
        validation_id,
        ui_config_id,
        graph_entity_ids,
    })
}

fn push_upsert<T: serde::Serialize>(
    statements: &mut String,
    params: &mut Vec<(String, serde_json::Value)>,
    table: &str,
    id: &str,
    param_name: &str,
    content: &T,
) {
    let id_param = format!("{param_name}_id");
    statements.push_str(&format!(
        "UPSERT type::thing('{table}', ${id_param}) CONTENT ${param_name};\n"
    ));
    params.push((id_param, serde_json::Value::String(id.to_string())));
    params.push((
        param_name.to_string(),
        serde_json::to_value(content).unwrap_or(serde_json::Value::Null),
    ));
}

fn push_raw_upsert(
    statements: &mut String,
    params: &mut Vec<(String, serde_json::Value)>,
    table: &str,
    id: &str,
    param_name: &str,
    content: serde_json::Value,
) {
    let id_param = format!("{param_name}_id");
    statements.push_str(&format!(
        "UPSERT type::thing('{table}', ${id_param}) CONTENT ${param_name};\n"
    ));
    params.push((id_param, serde_json::Value::String(id.to_string())));
    params.push((param_name.to_string(), content));
}

fn push_edge(
    statements: &mut String,
    params: &mut Vec<(String, serde_json::Value)>,
    edge_table: &str,
    from_id: &str,
    from_table: &str,
    to_id: &str,
    to_table: &str,
) {
    let edge_id = format!("{edge_table}_{from_id}_{to_id}");
    let edge_id_param = format!("{edge_id}_id");
    let from_param = format!("{edge_id}_from");
    let to_param = format!("{edge_id}_to");
    statements.push_str(&format!(
        "UPSERT type::thing('{edge_table}', ${edge_id_param}) SET \
         in = type::thing('{from_table}', ${from_param}), \
         out = type::thing('{to_table}', ${to_param}), \
         created_at = time::now();\n"
    ));
    params.push((edge_id_param, serde_json::Value::String(edge_id)));
    params.push((from_param, serde_json::Value::String(from_id.to_string())));
    params.push((to_param, serde_json::Value::String(to_id.to_string())));
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::storage::types::{
        agent_invocation::{AgentInvocation, AgentName, InvocationStatus},
        orchestration_run::RunStatus,
        recipe_version::{IngredientLine, RecipeVersion},
    };

    fn sample_result() -> OrchestrationResult {
        let now = chrono::Utc::now();
        let recipe = RecipeVersion {
            id: "recipe:test".into(),
            created_at: now,
            updated_at: now,
            name: "Test recipe".into(),
            total_percentage: 100.0,
            ingredients: vec![IngredientLine {
                id: "oat_flour".into(),
                name: "oat flour".into(),
                pct: 100.0,
                quantity: 0.0,
                unit: "kg".into(),
                function: "base".into(),
            }],
            yield_target: 0.0,
            yield_unit: "kg".into(),
        };
        let mut invocation = AgentInvocation::new("run:test", 1, AgentName::RecipeEngineer);
        invocation.status = InvocationStatus::Success;

        OrchestrationResult {
            run_id: "run:test".into(),
            status: RunStatus::Partial,
            total_duration_ms: 42,
            user_request: "make a protein bar".into(),
            invocations: vec![invocation],
            recipe: Some(recipe),
            calculation: None,
            graph: None,
            validation: None,
            ui_config: None,
            warnings: vec![],
        }
    }

    #[tokio::test]
    async fn persists_partial_run_and_is_idempotent_on_retry() {
        let store = GraphStore::memory("test_ns", &uuid::Uuid::new_v4().to_string())
            .await
            .expect("in-memory store");
        let result = sample_result();

        let first = persist(&store, &result).await.expect("first persist");
        assert_eq!(first.run_id, "run:test");
        assert_eq!(first.recipe_id.as_deref(), Some("recipe:test"));

        // A retried persist of the same result must not create duplicate rows.
        let second = persist(&store, &result).await.expect("second persist");
        assert_eq!(second.run_id, first.run_id);

        let recipes: Vec<RecipeVersion> = store.get_all_stored_items().await.expect("select recipes");
        assert_eq!(recipes.len(), 1);

        let invocations: Vec<AgentInvocation> = store.get_all_stored_items().await.expect("select invocations");
        assert_eq!(invocations.len(), 1);
    }
}
