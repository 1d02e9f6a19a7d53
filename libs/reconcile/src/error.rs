//! Error types for reconciliation passes.

use fleet_structs::EvalStatus;
use thiserror::Error;

use crate::planner::PlannerError;
use crate::state::StateError;

/// Result type for reconciliation operations.
pub type Result<T> = std::result::Result<T, ReconcileError>;

/// Errors that abort a reconciliation pass.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Reading the state snapshot failed. No partial plan is trusted.
    #[error("state error: {0}")]
    State(#[from] StateError),

    /// Submitting a plan or evaluation failed.
    #[error("planner error: {0}")]
    Planner(#[from] PlannerError),

    /// An allocation name does not carry a task group discriminator.
    #[error("could not determine task group id from {name:?}")]
    InvalidName { name: String },

    /// The evaluation must be moved to a terminal status.
    #[error("{message}")]
    SetStatus {
        message: String,
        eval_status: EvalStatus,
    },
}

impl ReconcileError {
    /// The evaluation status this error requests, if any.
    pub fn eval_status(&self) -> Option<EvalStatus> {
        match self {
            Self::SetStatus { eval_status, .. } => Some(*eval_status),
            _ => None,
        }
    }
}
