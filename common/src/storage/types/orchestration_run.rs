use serde::{Deserialize, Serialize};

use crate::stored_object;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Success,
    Partial,
    Failed,
}

stored_object!(OrchestrationRun, "orchestration_run", {
    status: RunStatus,
    timestamp: chrono::DateTime<chrono::Utc>,
    total_duration_ms: u64,
    user_request: String,
});

impl OrchestrationRun {
    pub fn new(run_id: String, user_request: String) -> Self {
        let now = chrono::Utc::now();
        Self {
            id: run_id,
            created_at: now,
            updated_at: now,
            status: RunStatus::Failed,
            timestamp: now,
            total_duration_ms: 0,
            user_request,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_status_lowercase() {
        let value = serde_json::to_value(RunStatus::Partial).expect("serialize");
        assert_eq!(value, serde_json::json!("partial"));
    }
}
