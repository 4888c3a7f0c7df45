//! Engine configuration.

use std::time::Duration;

use credex_core::Percent;

/// Configuration for the equivalence engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Minimum percent for a result to be approved rather than rejected.
    pub approval_threshold: Percent,

    /// Timeout for one analysis-provider invocation.
    pub analysis_timeout: Duration,

    /// Total attempts against the provider before the operation fails.
    pub max_analysis_retries: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            approval_threshold: Percent::parse("75.00").expect("literal threshold parses"),
            analysis_timeout: Duration::from_secs(300),
            max_analysis_retries: 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.approval_threshold.as_str(), "75.00");
        assert_eq!(config.max_analysis_retries, 3);
        assert_eq!(config.analysis_timeout, Duration::from_secs(300));
    }
}
