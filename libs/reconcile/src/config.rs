//! Scheduler configuration.

use serde::Deserialize;

/// Attempt limits for each scheduler.
///
/// Each attempt computes a full plan and submits it; an attempt is retried
/// when the planner only partially commits it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Attempts for service jobs.
    pub max_service_attempts: usize,

    /// Attempts for batch jobs.
    pub max_batch_attempts: usize,

    /// Attempts for system jobs.
    pub max_system_attempts: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_service_attempts: DEFAULT_MAX_SERVICE_ATTEMPTS,
            max_batch_attempts: DEFAULT_MAX_BATCH_ATTEMPTS,
            max_system_attempts: DEFAULT_MAX_SYSTEM_ATTEMPTS,
        }
    }
}

impl SchedulerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str, default: usize| {
            lookup(key)
                .and_then(|s| s.parse::<usize>().ok())
                .filter(|n| *n > 0)
                .unwrap_or(default)
        };

        Self {
            max_service_attempts: read(
                "FLEET_MAX_SERVICE_ATTEMPTS",
                DEFAULT_MAX_SERVICE_ATTEMPTS,
            ),
            max_batch_attempts: read("FLEET_MAX_BATCH_ATTEMPTS", DEFAULT_MAX_BATCH_ATTEMPTS),
            max_system_attempts: read("FLEET_MAX_SYSTEM_ATTEMPTS", DEFAULT_MAX_SYSTEM_ATTEMPTS),
        }
    }
}

/// Default attempts for service jobs.
pub const DEFAULT_MAX_SERVICE_ATTEMPTS: usize = 5;

/// Default attempts for batch jobs.
pub const DEFAULT_MAX_BATCH_ATTEMPTS: usize = 2;

/// Default attempts for system jobs.
pub const DEFAULT_MAX_SYSTEM_ATTEMPTS: usize = 5;

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn test_defaults() {
        let config = SchedulerConfig::from_lookup(|_| None);
        assert_eq!(config, SchedulerConfig::default());
        assert_eq!(config.max_service_attempts, 5);
        assert_eq!(config.max_batch_attempts, 2);
    }

    #[test]
    fn test_overrides_and_invalid_values() {
        let env = HashMap::from([
            ("FLEET_MAX_SERVICE_ATTEMPTS", "9"),
            ("FLEET_MAX_BATCH_ATTEMPTS", "zero"),
            ("FLEET_MAX_SYSTEM_ATTEMPTS", "0"),
        ]);
        let config = SchedulerConfig::from_lookup(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.max_service_attempts, 9);
        assert_eq!(config.max_batch_attempts, DEFAULT_MAX_BATCH_ATTEMPTS);
        assert_eq!(config.max_system_attempts, DEFAULT_MAX_SYSTEM_ATTEMPTS);
    }

    #[test]
    fn test_deserialize_partial() {
        let config: SchedulerConfig =
            serde_json::from_str(r#"{"max_batch_attempts": 4}"#).unwrap();
        assert_eq!(config.max_batch_attempts, 4);
        assert_eq!(config.max_service_attempts, DEFAULT_MAX_SERVICE_ATTEMPTS);
    }
}
