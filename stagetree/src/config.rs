//! Run configuration for stage trees.

use serde::{Deserialize, Serialize};

/// What an async stage does when a child in the current wave fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaveFailurePolicy {
    /// Return on the first failure. Slower siblings of the same wave keep
    /// running detached and their results are dropped.
    #[default]
    FirstError,
    /// Wait for every task of the wave, then return the first failure in
    /// completion order.
    WaitAll,
}

/// Configuration for a stage tree run.
///
/// The same configuration applies to every stage of the tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Failure handling for async waves.
    pub wave_failure_policy: WaveFailurePolicy,
    /// Check the context's cancellation token before every wave.
    pub check_cancellation: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            wave_failure_policy: WaveFailurePolicy::FirstError,
            check_cancellation: true,
        }
    }
}

impl RunConfig {
    /// Creates a new run config.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the wave failure policy.
    #[must_use]
    pub fn with_wave_failure_policy(mut self, policy: WaveFailurePolicy) -> Self {
        self.wave_failure_policy = policy;
        self
    }

    /// Enables or disables the per-wave cancellation check.
    #[must_use]
    pub fn with_cancellation_check(mut self, enabled: bool) -> Self {
        self.check_cancellation = enabled;
        self
    }

    /// Parses a config from JSON. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if `json` is not a valid config object.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = RunConfig::new();
        assert_eq!(config.wave_failure_policy, WaveFailurePolicy::FirstError);
        assert!(config.check_cancellation);
    }

    #[test]
    fn test_builders() {
        let config = RunConfig::new()
            .with_wave_failure_policy(WaveFailurePolicy::WaitAll)
            .with_cancellation_check(false);

        assert_eq!(config.wave_failure_policy, WaveFailurePolicy::WaitAll);
        assert!(!config.check_cancellation);
    }

    #[test]
    fn test_from_json_partial() {
        let config = RunConfig::from_json(r#"{"wave_failure_policy": "wait_all"}"#).unwrap();
        assert_eq!(config.wave_failure_policy, WaveFailurePolicy::WaitAll);
        assert!(config.check_cancellation);

        assert!(RunConfig::from_json(r#"{"wave_failure_policy": "sometimes"}"#).is_err());
    }
}
