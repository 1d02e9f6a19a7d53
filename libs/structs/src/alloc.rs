//! Allocations and their placement metrics.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{Job, Resources};

/// What the scheduler wants an allocation to be doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AllocDesiredStatus {
    /// The allocation should run.
    Run,

    /// The allocation should be stopped.
    Stop,

    /// The allocation was evicted to make room.
    Evict,

    /// The allocation could not be placed.
    Failed,
}

impl AllocDesiredStatus {
    /// Returns the canonical string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Run => "run",
            Self::Stop => "stop",
            Self::Evict => "evict",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for AllocDesiredStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the client reports the allocation is doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AllocClientStatus {
    /// Not yet started by the client.
    Pending,

    /// Running on the client.
    Running,

    /// Exited.
    Dead,

    /// Failed on the client.
    Failed,
}

impl AllocClientStatus {
    /// Returns the canonical string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Dead => "dead",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for AllocClientStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A task group instance bound to a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    /// Unique allocation identifier.
    pub id: String,

    /// Evaluation that produced this allocation.
    pub eval_id: String,

    /// Derived name: `{job}.{task_group}[{discriminator}]`.
    pub name: String,

    /// Node the allocation is placed on.
    pub node_id: String,

    /// Job the allocation belongs to.
    pub job_id: String,

    /// Snapshot of the job version this allocation was placed against.
    pub job: Arc<Job>,

    /// Task group name within the job.
    pub task_group: String,

    /// Aggregate resources of all tasks.
    pub resources: Resources,

    /// Resources assigned to each task, keyed by task name.
    #[serde(default)]
    pub task_resources: BTreeMap<String, Resources>,

    /// Placement metrics from the pass that produced this record.
    #[serde(default)]
    pub metrics: AllocMetric,

    /// Status requested by the scheduler.
    pub desired_status: AllocDesiredStatus,

    /// Reason for the desired status.
    #[serde(default)]
    pub desired_description: String,

    /// Status reported by the client.
    pub client_status: AllocClientStatus,

    /// Client-side detail for the status.
    #[serde(default)]
    pub client_description: String,
}

impl Allocation {
    /// Returns true if the allocation will not run again.
    pub fn terminal_status(&self) -> bool {
        match self.desired_status {
            AllocDesiredStatus::Stop | AllocDesiredStatus::Evict | AllocDesiredStatus::Failed => {
                true
            }
            AllocDesiredStatus::Run => matches!(
                self.client_status,
                AllocClientStatus::Dead | AllocClientStatus::Failed
            ),
        }
    }
}

/// Counters describing how a placement decision was reached.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AllocMetric {
    /// Nodes considered.
    pub nodes_evaluated: usize,

    /// Nodes rejected by filters.
    pub nodes_filtered: usize,

    /// Nodes rejected for lack of resources.
    pub nodes_exhausted: usize,

    /// Exhaustion counts per resource dimension.
    #[serde(default)]
    pub dimension_exhausted: BTreeMap<String, usize>,

    /// Final scores per node.
    #[serde(default)]
    pub scores: BTreeMap<String, f64>,

    /// Number of identical failures folded into this record.
    pub coalesced_failures: usize,
}

impl AllocMetric {
    /// Record that a node was considered.
    pub fn evaluate_node(&mut self) {
        self.nodes_evaluated += 1;
    }

    /// Record that a node was filtered out.
    pub fn filter_node(&mut self) {
        self.nodes_filtered += 1;
    }

    /// Record that a node ran out of a resource dimension.
    pub fn exhaust_node(&mut self, dimension: &str) {
        self.nodes_exhausted += 1;
        *self
            .dimension_exhausted
            .entry(dimension.to_string())
            .or_default() += 1;
    }

    /// Record the score of a node.
    pub fn score_node(&mut self, node_id: &str, score: f64) {
        self.scores.insert(node_id.to_string(), score);
    }
}
