use common::error::AppError;
use tracing::warn;

/// Reads the process's current resident set size. Used by the orchestrator
/// to check the memory guard before invoking each agent.
/// `/proc/self/statm` reports page counts; the page size is fixed at 4 KiB on
/// every Linux architecture this process targets.
#[cfg(target_os = "linux")]
const PAGE_SIZE_BYTES: u64 = 4096;

#[cfg(target_os = "linux")]
pub fn resident_set_bytes() -> u64 {
    match std::fs::read_to_string("/proc/self/statm") {
        Ok(contents) => contents
            .split_whitespace()
            .nth(1)
            .and_then(|pages| pages.parse::<u64>().ok())
            .map(|pages| pages.saturating_mul(PAGE_SIZE_BYTES))
            .unwrap_or(0),
        Err(err) => {
            warn!(error = %err, "failed to read /proc/self/statm; reporting 0 RSS");
            0
        }
    }
}

#[cfg(not(target_os = "linux"))]
pub fn resident_set_bytes() -> u64 {
    warn!("memory guard is only implemented for Linux; reporting 0 RSS on this platform");
    0
}

/// Checks the current RSS against the configured ceiling (target + grace).
/// Returns `MemoryBudgetExceeded` when over budget so the caller can skip the
/// next agent rather than invoke it.
pub fn check_budget(ceiling_mb: u64) -> Result<u64, AppError> {
    let rss_bytes = resident_set_bytes();
    let ceiling_bytes = ceiling_mb.saturating_mul(1024 * 1024);
    if rss_bytes > ceiling_bytes {
        return Err(AppError::MemoryBudgetExceeded(format!(
            "resident set size {rss_bytes} bytes exceeds ceiling {ceiling_bytes} bytes"
        )));
    }
    Ok(rss_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn within_budget_returns_measured_rss() {
        let result = check_budget(u64::MAX / (1024 * 1024));
        assert!(result.is_ok());
    }

    #[test]
    fn zero_budget_always_trips() {
        let result = check_budget(0);
        assert!(result.is_err());
    }
}
