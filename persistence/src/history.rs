//! Read side for orchestration runs: list/filter and single-run detail,
//! backing `GET /orchestration/runs` and `GET /orchestration/runs/{runId}`.

use common::{
    error::AppError,
    storage::{
        db::GraphStore,
        types::{
            agent_invocation::AgentInvocation, calculation_result::CalculationResult,
            graph_snapshot::GraphSnapshot, orchestration_run::{OrchestrationRun, RunStatus},
            recipe_version::RecipeVersion, ui_config::UIConfig, validation_report::ValidationReport,
        },
    },
};

const DEFAULT_LIMIT: u32 = 50;
const MAX_LIMIT: u32 = 100;

#[derive(Debug, Clone, Default)]
pub struct ListRunsParams {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub status: Option<RunStatus>,
    pub start_date: Option<chrono::DateTime<chrono::Utc>>,
    pub end_date: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct RunSummary {
    pub run_id: String,
    pub status: RunStatus,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub total_duration_ms: u64,
    pub recipe_name: Option<String>,
    pub agent_count: usize,
    pub success_count: usize,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct RunDetail {
    pub run: OrchestrationRun,
    pub invocations: Vec<AgentInvocation>,
    pub recipe: Option<RecipeVersion>,
    pub calculation: Option<CalculationResult>,
    pub graph: Option<GraphSnapshot>,
    pub validation: Option<ValidationReport>,
    pub ui_config: Option<UIConfig>,
}

#[derive(Clone)]
pub struct RunHistoryService {
    store: GraphStore,
}

impl RunHistoryService {
    pub fn new(store: GraphStore) -> Self {
        Self { store }
    }

    pub async fn list(&self, params: ListRunsParams) -> Result<Vec<RunSummary>, AppError> {
        let limit = params.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
        let offset = params.offset.unwrap_or(0);

        let mut runs: Vec<OrchestrationRun> = self.store.get_all_stored_items().await?;
        runs.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        let filtered: Vec<OrchestrationRun> = runs
            .into_iter()
            .filter(|r| params.status.map_or(true, |s| s == r.status))
            .filter(|r| params.start_date.map_or(true, |d| r.timestamp >= d))
            .filter(|r| params.end_date.map_or(true, |d| r.timestamp <= d))
            .collect();

        let page: Vec<OrchestrationRun> = filtered
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();

        let mut summaries = Vec::with_capacity(page.len());
        for run in page {
            let invocations: Vec<AgentInvocation> = self
                .store
                .run_read(
                    "SELECT * FROM agent_invocation WHERE run_id = $run_id;",
                    vec![("run_id", run.id.as_str().into())],
                )
                .await?;
            let success_count = invocations
                .iter()
                .filter(|inv| matches!(inv.status, common::storage::types::agent_invocation::InvocationStatus::Success))
                .count();
            let recipe = self.single_artifact_for_run::<RecipeVersion>("recipe_version", &run.id).await?;

            summaries.push(RunSummary {
                run_id: run.id,
                status: run.status,
                timestamp: run.timestamp,
                total_duration_ms: run.total_duration_ms,
                recipe_name: recipe.map(|r| r.name),
                agent_count: invocations.len(),
                success_count,
            });
        }

        Ok(summaries)
    }

    pub async fn get(&self, run_id: &str) -> Result<Option<RunDetail>, AppError> {
        let Some(run) = self.store.get_item::<OrchestrationRun>(run_id).await? else {
            return Ok(None);
        };

        let invocations: Vec<AgentInvocation> = self
            .store
            .run_read(
                "SELECT * FROM agent_invocation WHERE run_id = $run_id ORDER BY sequence ASC;",
                vec![("run_id", run_id.into())],
            )
            .await?;

        let recipe = self.single_artifact_for_run::<RecipeVersion>("recipe_version", run_id).await?;
        let calculation = self.single_artifact_for_run::<CalculationResult>("calculation_result", run_id).await?;
        let graph = self.single_artifact_for_run::<GraphSnapshot>("graph_snapshot", run_id).await?;
        let validation = self.single_artifact_for_run::<ValidationReport>("validation_report", run_id).await?;
        let ui_config = self.single_artifact_for_run::<UIConfig>("ui_config", run_id).await?;

        Ok(Some(RunDetail { run, invocations, recipe, calculation, graph, validation, ui_config }))
    }

    /// Artifacts don't carry a back-reference to their run; they're reached
    /// by walking the provenance edge the persistence service created.
    async fn single_artifact_for_run<T>(&self, table: &str, run_id: &str) -> Result<Option<T>, AppError>
    where
        T: for<'de> serde::Deserialize<'de>,
    {
        let edge_table = match table {
            "recipe_version" => "used_recipe",
            "calculation_result" => "has_calculation",
            "graph_snapshot" => "has_graph_snapshot",
            "validation_report" => "has_validation",
            "ui_config" => "has_ui_config",
            _ => return Ok(None),
        };
        let query = format!(
            "SELECT out.* AS artifact FROM {edge_table} WHERE in = type::thing('orchestration_run', $run_id) LIMIT 1;"
        );
        #[derive(serde::Deserialize)]
        struct Row<U> {
            artifact: U,
        }
        let rows: Vec<Row<T>> = self.store.run_read(&query, vec![("run_id", run_id.into())]).await?;
        Ok(rows.into_iter().next().map(|r| r.artifact))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orchestration::pipeline::OrchestrationResult;

    fn sample_result(run_id: &str, status: RunStatus) -> OrchestrationResult {
        use common::storage::types::agent_invocation::{AgentInvocation, AgentName, InvocationStatus};

        let now = chrono::Utc::now();
        let recipe = RecipeVersion {
            id: format!("recipe:{run_id}"),
            created_at: now,
            updated_at: now,
            name: "Protein bar".into(),
            total_percentage: 100.0,
            ingredients: vec![],
            yield_target: 0.0,
            yield_unit: "kg".into(),
        };
        let mut invocation = AgentInvocation::new(run_id, 1, AgentName::RecipeEngineer);
        invocation.status = InvocationStatus::Success;

        OrchestrationResult {
            run_id: run_id.to_string(),
            status,
            total_duration_ms: 10,
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
    async fn list_summaries_include_recipe_name_and_agent_counts() {
        let store = GraphStore::memory("test_ns", &uuid::Uuid::new_v4().to_string())
            .await
            .expect("in-memory store");
        crate::run_persistence::persist(&store, &sample_result("run:history_1", RunStatus::Partial))
            .await
            .expect("persist");

        let service = RunHistoryService::new(store);
        let summaries = service.list(ListRunsParams::default()).await.expect("list");
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].recipe_name.as_deref(), Some("Protein bar"));
        assert_eq!(summaries[0].agent_count, 1);
        assert_eq!(summaries[0].success_count, 1);
    }

    #[tokio::test]
    async fn get_returns_detail_with_artifacts_and_none_for_missing_run() {
        let store = GraphStore::memory("test_ns", &uuid::Uuid::new_v4().to_string())
            .await
            .expect("in-memory store");
        crate::run_persistence::persist(&store, &sample_result("run:history_2", RunStatus::Partial))
            .await
            .expect("persist");

        let service = RunHistoryService::new(store);
        let detail = service.get("run:history_2").await.expect("get").expect("run exists");
        assert!(detail.recipe.is_some());
        assert!(detail.calculation.is_none());

        assert!(service.get("run:does_not_exist").await.expect("get").is_none());
    }
}
