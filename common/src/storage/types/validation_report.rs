use serde::{Deserialize, Serialize};

use crate::stored_object;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OverallStatus {
    Pass,
    Warn,
    Fail,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CheckSeverity {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckResult {
    pub name: String,
    pub severity: CheckSeverity,
    pub passed: bool,
    pub detail: String,
}

stored_object!(ValidationReport, "validation_report", {
    overall_status: OverallStatus,
    checks: Vec<CheckResult>,
    mass_balance_ok: bool,
    yield_ok: bool,
});

impl ValidationReport {
    /// Derives `overall_status` from the check list: `fail` if any check has
    /// severity `error`, `warn` if any has `warn`, else `pass`.
    pub fn derive_overall_status(checks: &[CheckResult]) -> OverallStatus {
        if checks.iter().any(|c| matches!(c.severity, CheckSeverity::Error)) {
            OverallStatus::Fail
        } else if checks.iter().any(|c| matches!(c.severity, CheckSeverity::Warn)) {
            OverallStatus::Warn
        } else {
            OverallStatus::Pass
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(severity: CheckSeverity) -> CheckResult {
        CheckResult {
            name: "check".into(),
            severity,
            passed: !matches!(severity, CheckSeverity::Error),
            detail: String::new(),
        }
    }

    #[test]
    fn error_dominates_warn_and_info() {
        let checks = vec![check(CheckSeverity::Info), check(CheckSeverity::Warn), check(CheckSeverity::Error)];
        assert_eq!(ValidationReport::derive_overall_status(&checks), OverallStatus::Fail);
    }

    #[test]
    fn warn_without_error_yields_warn() {
        let checks = vec![check(CheckSeverity::Info), check(CheckSeverity::Warn)];
        assert_eq!(ValidationReport::derive_overall_status(&checks), OverallStatus::Warn);
    }

    #[test]
    fn all_info_yields_pass() {
        let checks = vec![check(CheckSeverity::Info)];
        assert_eq!(ValidationReport::derive_overall_status(&checks), OverallStatus::Pass);
    }
}
