//! Evaluations: units of scheduling work.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::JobType;

/// Evaluation triggered by a job registration or update.
pub const EVAL_TRIGGER_JOB_REGISTER: &str = "job-register";

/// Evaluation triggered by a job deregistration.
pub const EVAL_TRIGGER_JOB_DEREGISTER: &str = "job-deregister";

/// Evaluation triggered by a node status change.
pub const EVAL_TRIGGER_NODE_UPDATE: &str = "node-update";

/// Follow-up evaluation continuing a rolling update.
pub const EVAL_TRIGGER_ROLLING_UPDATE: &str = "rolling-update";

/// Lifecycle status of an evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvalStatus {
    /// Waiting to be processed.
    Pending,

    /// Processed successfully.
    Complete,

    /// Processing failed and needs operator follow-up.
    Failed,
}

impl EvalStatus {
    /// Returns the canonical string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Complete => "complete",
            Self::Failed => "failed",
        }
    }

    /// Returns true if the evaluation will not be processed again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }
}

impl fmt::Display for EvalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request to reconcile one job against the cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    /// Unique evaluation identifier.
    pub id: String,

    /// Priority inherited from the job.
    pub priority: i32,

    /// Scheduler that processes this evaluation.
    #[serde(rename = "type")]
    pub job_type: JobType,

    /// What caused the evaluation.
    pub triggered_by: String,

    /// Job being evaluated.
    pub job_id: String,

    /// Job modify index at the time the evaluation was created.
    pub job_modify_index: u64,

    /// Current status.
    pub status: EvalStatus,

    /// Detail for the status.
    #[serde(default)]
    pub status_description: String,

    /// Delay before the evaluation becomes eligible.
    #[serde(default, with = "wait_millis")]
    pub wait: Duration,

    /// Evaluation chained after this one.
    #[serde(default)]
    pub next_eval: Option<String>,

    /// Evaluation this one was chained from.
    #[serde(default)]
    pub previous_eval: Option<String>,
}

mod wait_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}
