//! Drives the fixed five-agent DAG for one orchestration run: admission,
//! per-agent memory/latency enforcement, cancellation, and result
//! aggregation. Generalizes the teacher's `prepare_content` /
//! `retrieve_related` / `enrich` / `persist` composition to the five
//! formulation agents.

pub mod config;
pub mod state;

use std::sync::{Arc, Mutex};
use std::time::Instant;

use common::{
    cache::CacheLayer,
    clients::llm::LlmClient,
    error::AppError,
    metrics::Metrics,
    storage::types::{
        agent_invocation::{AgentInvocation, AgentName, InvocationStatus},
        calculation_result::CalculationResult,
        graph_snapshot::GraphSnapshot,
        orchestration_run::RunStatus,
        recipe_version::RecipeVersion,
        ui_config::UIConfig,
        validation_report::ValidationReport,
    },
};
use tracing::warn;

use crate::{
    admission::AdmissionQueue,
    agents,
    contracts::{
        GraphBuilderInput, QaValidatorInput, RecipeEngineerInput, ScalingCalculatorInput, TargetBatch,
        UiDesignerInput,
    },
    ingredient_data::{self as _ingredient_data},
    memory_guard,
};

use config::{budget_for, OrchestrationConfig};

/// Aggregated outcome of one orchestration run: the overall status, every
/// attempted agent invocation (in sequence order), and whichever artifacts
/// were produced before the first failure, cancellation, or run timeout.
#[derive(Debug, Clone)]
pub struct OrchestrationResult {
    pub run_id: String,
    pub status: RunStatus,
    pub total_duration_ms: u64,
    pub user_request: String,
    pub invocations: Vec<AgentInvocation>,
    pub recipe: Option<RecipeVersion>,
    pub calculation: Option<CalculationResult>,
    pub graph: Option<GraphSnapshot>,
    pub validation: Option<ValidationReport>,
    pub ui_config: Option<UIConfig>,
    pub warnings: Vec<String>,
}

impl OrchestrationResult {
    fn derive_status(&self) -> RunStatus {
        let succeeded = self
            .invocations
            .iter()
            .filter(|inv| matches!(inv.status, InvocationStatus::Success))
            .count();
        if succeeded == AgentName::SEQUENCE.len() {
            RunStatus::Success
        } else if succeeded > 0 {
            RunStatus::Partial
        } else {
            RunStatus::Failed
        }
    }
}

/// Mutable progress shared between the driving future and the run-level
/// timeout: when the run deadline fires, the orchestrator still has
/// whatever this holds to persist as a partial/failed result.
struct RunProgress {
    run_id: String,
    user_request: String,
    invocations: Vec<AgentInvocation>,
    recipe: Option<RecipeVersion>,
    calculation: Option<CalculationResult>,
    graph: Option<GraphSnapshot>,
    validation: Option<ValidationReport>,
    ui_config: Option<UIConfig>,
}

impl RunProgress {
    fn new(run_id: String, user_request: String) -> Self {
        Self {
            run_id,
            user_request,
            invocations: Vec::new(),
            recipe: None,
            calculation: None,
            graph: None,
            validation: None,
            ui_config: None,
        }
    }

    fn into_result(self, total_duration_ms: u64) -> OrchestrationResult {
        let warnings = self.calculation.as_ref().map(|c| c.warnings.clone()).unwrap_or_default();
        let mut result = OrchestrationResult {
            run_id: self.run_id,
            status: RunStatus::Failed,
            total_duration_ms,
            user_request: self.user_request,
            invocations: self.invocations,
            recipe: self.recipe,
            calculation: self.calculation,
            graph: self.graph,
            validation: self.validation,
            ui_config: self.ui_config,
            warnings,
        };
        result.status = result.derive_status();
        result
    }
}

type SharedProgress = Arc<Mutex<RunProgress>>;

/// Coordinates the five agents, the admission queue, and the memory guard
/// for one logical run. Holds no per-run state itself; every call to
/// `run` is independent and safe to invoke concurrently.
#[derive(Clone)]
pub struct Orchestrator {
    llm: LlmClient,
    caches: CacheLayer,
    metrics: Metrics,
    admission: AdmissionQueue,
    config: OrchestrationConfig,
}

impl Orchestrator {
    pub fn new(
        llm: LlmClient,
        caches: CacheLayer,
        metrics: Metrics,
        admission: AdmissionQueue,
        config: OrchestrationConfig,
    ) -> Self {
        Self { llm, caches, metrics, admission, config }
    }

    pub async fn run(
        &self,
        user_request: String,
        target_batch: TargetBatch,
    ) -> Result<OrchestrationResult, AppError> {
        let _ticket = self.admission.acquire().await?;
        let run_id = format!("run:{}", uuid::Uuid::new_v4());
        let started = Instant::now();
        let progress: SharedProgress = Arc::new(Mutex::new(RunProgress::new(
            run_id.clone(),
            user_request.clone(),
        )));

        let outcome = tokio::time::timeout(
            self.config.tuning.run_timeout,
            self.drive(run_id.clone(), user_request, target_batch, progress.clone()),
        )
        .await;

        let total_duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let result = match outcome {
            Ok(()) => {
                let progress = Mutex::into_inner(
                    Arc::try_unwrap(progress).unwrap_or_else(|shared| Mutex::new(shared.lock().map_or_else(
                        |poison| poison.into_inner().clone_minimal(),
                        |guard| guard.clone_minimal(),
                    ))),
                )
                .unwrap_or_else(std::sync::PoisonError::into_inner);
                progress.into_result(total_duration_ms)
            }
            Err(_) => {
                warn!(run_id = %run_id, "orchestration run exceeded the run-level timeout");
                let mut progress = progress.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
                let remaining: Vec<AgentName> = AgentName::SEQUENCE
                    .into_iter()
                    .skip(progress.invocations.len())
                    .collect();
                for agent_name in remaining {
                    let sequence = u32::try_from(progress.invocations.len() + 1).unwrap_or(u32::MAX);
                    let mut invocation = AgentInvocation::new(&progress.run_id, sequence, agent_name);
                    invocation.status = InvocationStatus::Skipped;
                    invocation.error = Some("run timeout".to_string());
                    progress.invocations.push(invocation);
                }
                self.metrics.record_error("RUN_TIMEOUT", "orchestrator");
                progress.clone_minimal().into_result(total_duration_ms)
            }
        };

        self.metrics.record_run_duration(status_label(result.status), total_duration_ms as f64 / 1_000.0);
        Ok(result)
    }

    async fn drive(
        &self,
        run_id: String,
        user_request: String,
        target_batch: TargetBatch,
        progress: SharedProgress,
    ) {
        let recipe = match self
            .invoke(&progress, &run_id, AgentName::RecipeEngineer, || async {
                agents::recipe_engineer::run(&self.llm, RecipeEngineerInput { user_request: user_request.clone() }).await
            })
            .await
        {
            Some(recipe) => recipe,
            None => return,
        };
        {
            let mut progress = progress.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            progress.recipe = Some(recipe.clone());
        }

        let calculation = match self
            .invoke(&progress, &run_id, AgentName::ScalingCalculator, || async {
                agents::scaling_calculator::run(
                    &self.caches,
                    ScalingCalculatorInput { recipe: recipe.clone(), target_batch: target_batch.clone() },
                )
            })
            .await
        {
            Some(calculation) => calculation,
            None => return,
        };
        {
            let mut progress = progress.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            progress.calculation = Some(calculation.clone());
        }

        let graph = match self
            .invoke(&progress, &run_id, AgentName::GraphBuilder, || async {
                agents::graph_builder::run(GraphBuilderInput {
                    recipe: recipe.clone(),
                    calculation: calculation.clone(),
                })
            })
            .await
        {
            Some(graph) => graph,
            None => return,
        };
        {
            let mut progress = progress.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            progress.graph = Some(graph.clone());
        }

        let validation = match self
            .invoke(&progress, &run_id, AgentName::QaValidator, || async {
                agents::qa_validator::run(QaValidatorInput {
                    recipe: recipe.clone(),
                    calculation: calculation.clone(),
                    graph: graph.clone(),
                })
            })
            .await
        {
            Some(validation) => validation,
            None => return,
        };
        {
            let mut progress = progress.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            progress.validation = Some(validation.clone());
        }

        let ui_config = match self
            .invoke(&progress, &run_id, AgentName::UiDesigner, || async {
                agents::ui_designer::run(UiDesignerInput {
                    recipe: recipe.clone(),
                    calculation: calculation.clone(),
                    validation: validation.clone(),
                })
            })
            .await
        {
            Some(ui_config) => ui_config,
            None => return,
        };
        let mut progress = progress.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        progress.ui_config = Some(ui_config);
    }

    /// Runs one agent under the memory guard and its hard timeout, recording
    /// an `AgentInvocation` regardless of outcome. Returns `None` once the
    /// agent fails, times out, or the memory budget is exceeded — signaling
    /// the caller to stop and let every remaining agent be skipped.
    async fn invoke<T, F, Fut>(
        &self,
        progress: &SharedProgress,
        run_id: &str,
        agent_name: AgentName,
        run_agent: F,
    ) -> Option<T>
    where
        T: Clone + serde::Serialize,
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, AppError>>,
    {
        let sequence = {
            let progress = progress.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            u32::try_from(progress.invocations.len() + 1).unwrap_or(u32::MAX)
        };

        let budget = budget_for(agent_name);
        let ceiling_mb = self.config.tuning.memory_ceiling_mb();

        if let Err(err) = memory_guard::check_budget(ceiling_mb) {
            self.record_failure(progress, run_id, sequence, agent_name, &err);
            return None;
        }

        let started = Instant::now();
        let outcome = tokio::time::timeout(budget.hard_timeout(), run_agent()).await;
        let elapsed = started.elapsed();
        self.metrics.set_agent_memory_bytes(agent_name.as_str(), memory_guard::resident_set_bytes() as i64);

        if elapsed > budget.latency_target {
            warn!(agent = agent_name.as_str(), elapsed_ms = elapsed.as_millis(), "agent exceeded its latency target");
        }

        match outcome {
            Ok(Ok(output)) => {
                let mut progress = progress.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
                let mut invocation = AgentInvocation::new(run_id, sequence, agent_name);
                invocation.status = InvocationStatus::Success;
                invocation.duration_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
                invocation.output_snapshot = serde_json::to_value(&output).unwrap_or(serde_json::Value::Null);
                progress.invocations.push(invocation);
                Some(output)
            }
            Ok(Err(err)) => {
                self.record_failure(progress, run_id, sequence, agent_name, &err);
                None
            }
            Err(_) => {
                let err = AppError::AgentTimeout(format!("{} exceeded its hard timeout", agent_name.as_str()));
                self.record_failure(progress, run_id, sequence, agent_name, &err);
                None
            }
        }
    }

    fn record_failure(
        &self,
        progress: &SharedProgress,
        run_id: &str,
        sequence: u32,
        agent_name: AgentName,
        err: &AppError,
    ) {
        self.metrics.record_error(err.code(), agent_name.as_str());
        let mut progress = progress.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut invocation = AgentInvocation::new(run_id, sequence, agent_name);
        invocation.status = InvocationStatus::Failed;
        invocation.error = Some(err.to_string());
        progress.invocations.push(invocation);
    }
}

impl RunProgress {
    /// Clones the parts needed to build a result without requiring the
    /// underlying artifacts to implement `Clone` beyond what they already do.
    fn clone_minimal(&self) -> RunProgress {
        RunProgress {
            run_id: self.run_id.clone(),
            user_request: self.user_request.clone(),
            invocations: self.invocations.clone(),
            recipe: self.recipe.clone(),
            calculation: self.calculation.clone(),
            graph: self.graph.clone(),
            validation: self.validation.clone(),
            ui_config: self.ui_config.clone(),
        }
    }
}

fn status_label(status: RunStatus) -> &'static str {
    match status {
        RunStatus::Success => "success",
        RunStatus::Partial => "partial",
        RunStatus::Failed => "failed",
    }
}
