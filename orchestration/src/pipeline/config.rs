use std::time::Duration;

use common::storage::types::agent_invocation::AgentName;

/// Per-agent latency target, memory target, and derived hard timeout
/// (4x the latency target) from the budget table.
#[derive(Debug, Clone, Copy)]
pub struct AgentBudget {
    pub agent_name: AgentName,
    pub latency_target: Duration,
    pub memory_target_mb: u64,
}

impl AgentBudget {
    pub fn hard_timeout(&self) -> Duration {
        self.latency_target * 4
    }
}

pub const AGENT_BUDGETS: [AgentBudget; 5] = [
    AgentBudget { agent_name: AgentName::RecipeEngineer, latency_target: Duration::from_millis(800), memory_target_mb: 150 },
    AgentBudget { agent_name: AgentName::ScalingCalculator, latency_target: Duration::from_millis(500), memory_target_mb: 120 },
    AgentBudget { agent_name: AgentName::GraphBuilder, latency_target: Duration::from_millis(1_200), memory_target_mb: 200 },
    AgentBudget { agent_name: AgentName::QaValidator, latency_target: Duration::from_millis(400), memory_target_mb: 80 },
    AgentBudget { agent_name: AgentName::UiDesigner, latency_target: Duration::from_millis(300), memory_target_mb: 60 },
];

pub fn budget_for(agent_name: AgentName) -> AgentBudget {
    AGENT_BUDGETS
        .into_iter()
        .find(|b| b.agent_name == agent_name)
        .expect("every AgentName has a declared budget")
}

#[derive(Debug, Clone)]
pub struct OrchestrationTuning {
    /// RSS ceiling (with grace) before the next agent is skipped as `MemoryBudgetExceeded`.
    pub memory_budget_mb: u64,
    /// Grace above the 600 MB target before the guard trips.
    pub memory_grace_mb: u64,
    /// Hard run-level deadline.
    pub run_timeout: Duration,
    /// Admission queue capacity.
    pub admission_capacity: usize,
    /// How long `acquire` waits for a free ticket before `TooManyRequests`.
    pub admission_timeout: Duration,
    pub embedding_batch_size: usize,
}

impl Default for OrchestrationTuning {
    fn default() -> Self {
        Self {
            memory_budget_mb: 600,
            memory_grace_mb: 50,
            run_timeout: Duration::from_secs(30),
            admission_capacity: 3,
            admission_timeout: Duration::from_secs(10),
            embedding_batch_size: 96,
        }
    }
}

impl OrchestrationTuning {
    pub fn memory_ceiling_mb(&self) -> u64 {
        self.memory_budget_mb + self.memory_grace_mb
    }
}

#[derive(Debug, Clone)]
pub struct OrchestrationConfig {
    pub tuning: OrchestrationTuning,
}

impl Default for OrchestrationConfig {
    fn default() -> Self {
        Self {
            tuning: OrchestrationTuning::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hard_timeout_is_four_times_latency_target() {
        let budget = budget_for(AgentName::QaValidator);
        assert_eq!(budget.hard_timeout(), Duration::from_millis(1_600));
    }

    #[test]
    fn memory_ceiling_adds_grace_to_target() {
        let tuning = OrchestrationTuning::default();
        assert_eq!(tuning.memory_ceiling_mb(), 650);
    }
}
