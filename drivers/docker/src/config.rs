//! Configuration for the container runtime driver.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::CPUSET_RECONCILE_INTERVAL;

/// Driver configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Parent cgroup for task scopes. Empty selects the host default.
    pub cgroup_parent: String,

    /// Interval between cpuset reconciliation passes.
    #[serde(with = "interval_millis")]
    pub cpuset_reconcile_interval: Duration,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            cgroup_parent: String::new(),
            cpuset_reconcile_interval: CPUSET_RECONCILE_INTERVAL,
        }
    }
}

impl DriverConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let cgroup_parent = lookup("FLEET_DOCKER_CGROUP_PARENT").unwrap_or_default();

        let cpuset_reconcile_interval = match lookup("FLEET_DOCKER_CPUSET_RECONCILE_MS") {
            None => CPUSET_RECONCILE_INTERVAL,
            Some(raw) => {
                let ms: u64 = raw
                    .parse()
                    .with_context(|| format!("FLEET_DOCKER_CPUSET_RECONCILE_MS={raw}"))?;
                if ms == 0 {
                    bail!("FLEET_DOCKER_CPUSET_RECONCILE_MS must be positive");
                }
                Duration::from_millis(ms)
            }
        };

        Ok(Self {
            cgroup_parent,
            cpuset_reconcile_interval,
        })
    }

    /// The cgroup parent with the host default applied.
    pub fn resolved_cgroup_parent(&self) -> String {
        fleet_cgutil::get_cgroup_parent(&self.cgroup_parent)
    }
}

mod interval_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
