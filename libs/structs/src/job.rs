//! Jobs, task groups and tasks.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::Resources;

/// The scheduler that handles a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobType {
    /// Long-running service, expanded by count.
    Service,

    /// Run-to-completion work, expanded by count.
    Batch,

    /// One instance on every eligible node.
    System,
}

impl JobType {
    /// Returns the canonical string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Service => "service",
            Self::Batch => "batch",
            Self::System => "system",
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rolling update strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateStrategy {
    /// Delay between rolling update batches.
    #[serde(default, with = "duration_millis")]
    pub stagger: Duration,

    /// Number of allocations updated per batch. Zero disables rolling.
    #[serde(default)]
    pub max_parallel: usize,
}

impl UpdateStrategy {
    /// Returns true if updates should be rolled out in batches.
    pub fn is_rolling(&self) -> bool {
        self.max_parallel > 0
    }
}

/// A job submitted by an operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Unique job identifier.
    pub id: String,

    /// Human-readable name, used as the prefix of allocation names.
    pub name: String,

    /// Which scheduler handles this job.
    #[serde(rename = "type")]
    pub job_type: JobType,

    /// Scheduling priority.
    pub priority: i32,

    /// Datacenters the job may be placed in.
    #[serde(default)]
    pub datacenters: Vec<String>,

    /// Task groups, in declaration order.
    #[serde(default)]
    pub task_groups: Vec<TaskGroup>,

    /// Rolling update strategy.
    #[serde(default)]
    pub update: UpdateStrategy,

    /// Version stamp bumped on every modification.
    pub modify_index: u64,
}

impl Job {
    /// Find a task group by name.
    pub fn lookup_task_group(&self, name: &str) -> Option<&TaskGroup> {
        self.task_groups.iter().find(|tg| tg.name == name)
    }
}

/// A set of tasks placed together on one node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskGroup {
    /// Name, unique within the job.
    pub name: String,

    /// Number of instances to run.
    pub count: usize,

    /// Tasks in the group.
    #[serde(default)]
    pub tasks: Vec<Task>,
}

impl TaskGroup {
    /// Find a task by name.
    pub fn lookup_task(&self, name: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.name == name)
    }
}

/// A single unit of work executed by a driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Name, unique within the task group.
    pub name: String,

    /// Driver that runs the task (e.g. `docker`, `exec`).
    pub driver: String,

    /// Driver-specific configuration.
    #[serde(default)]
    pub config: TaskConfig,

    /// Requested resources.
    #[serde(default)]
    pub resources: Resources,
}

/// Driver-specific task configuration.
///
/// Equality is structural: object keys are compared irrespective of
/// insertion order, arrays element by element, numbers by value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskConfig(BTreeMap<String, serde_json::Value>);

impl TaskConfig {
    /// Create an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a configuration key, returning the previous value if any.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Option<serde_json::Value> {
        self.0.insert(key.into(), value.into())
    }

    /// Look up a configuration key.
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    /// Number of top-level keys.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if no keys are set.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<serde_json::Value>> FromIterator<(K, V)> for TaskConfig {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}
