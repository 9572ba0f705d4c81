use serde::{Deserialize, Serialize};

use crate::stored_object;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AgentName {
    RecipeEngineer,
    ScalingCalculator,
    GraphBuilder,
    QaValidator,
    UiDesigner,
}

impl AgentName {
    /// Fixed execution order of the five-agent pipeline.
    pub const SEQUENCE: [AgentName; 5] = [
        AgentName::RecipeEngineer,
        AgentName::ScalingCalculator,
        AgentName::GraphBuilder,
        AgentName::QaValidator,
        AgentName::UiDesigner,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RecipeEngineer => "recipe_engineer",
            Self::ScalingCalculator => "scaling_calculator",
            Self::GraphBuilder => "graph_builder",
            Self::QaValidator => "qa_validator",
            Self::UiDesigner => "ui_designer",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InvocationStatus {
    Pending,
    Running,
    Success,
    Failed,
    Skipped,
}

stored_object!(AgentInvocation, "agent_invocation", {
    run_id: String,
    sequence: u32,
    agent_name: AgentName,
    status: InvocationStatus,
    duration_ms: u64,
    error: Option<String>,
    input_snapshot: serde_json::Value,
    output_snapshot: serde_json::Value,
});

impl AgentInvocation {
    pub fn new(run_id: &str, sequence: u32, agent_name: AgentName) -> Self {
        let now = chrono::Utc::now();
        Self {
            id: format!("{run_id}:{sequence}"),
            created_at: now,
            updated_at: now,
            run_id: run_id.to_string(),
            sequence,
            agent_name,
            status: InvocationStatus::Pending,
            duration_ms: 0,
            error: None,
            input_snapshot: serde_json::Value::Null,
            output_snapshot: serde_json::Value::Null,
        }
    }

    /// `AgentInvocation.sequence` must be dense from 1 to N and unique per run.
    pub fn sequences_are_dense(invocations: &[AgentInvocation]) -> bool {
        let mut sequences: Vec<u32> = invocations.iter().map(|i| i.sequence).collect();
        sequences.sort_unstable();
        sequences.iter().enumerate().all(|(idx, seq)| *seq == idx as u32 + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dense_sequence_passes() {
        let invocations = vec![
            AgentInvocation::new("run:1", 1, AgentName::RecipeEngineer),
            AgentInvocation::new("run:1", 2, AgentName::ScalingCalculator),
            AgentInvocation::new("run:1", 3, AgentName::GraphBuilder),
        ];
        assert!(AgentInvocation::sequences_are_dense(&invocations));
    }

    #[test]
    fn gap_in_sequence_fails() {
        let invocations = vec![
            AgentInvocation::new("run:1", 1, AgentName::RecipeEngineer),
            AgentInvocation::new("run:1", 3, AgentName::GraphBuilder),
        ];
        assert!(!AgentInvocation::sequences_are_dense(&invocations));
    }
}
