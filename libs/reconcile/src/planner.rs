//! Submission of plans and evaluation updates.

use std::sync::Arc;

use fleet_structs::{Evaluation, Plan, PlanResult};
use thiserror::Error;

use crate::state::State;

/// Errors from the planner.
#[derive(Debug, Error)]
pub enum PlannerError {
    /// The planner refused the request.
    #[error("rejected: {0}")]
    Rejected(String),

    /// The request could not be delivered.
    #[error("transport error: {0}")]
    Transport(String),
}

/// The planner applies plans transactionally with optimistic concurrency.
///
/// A plan may be partially committed when it conflicts with a newer state; in
/// that case the planner may hand back a refreshed snapshot to retry against.
pub trait Planner {
    /// Submit a plan for commit.
    fn submit_plan(
        &mut self,
        plan: &Plan,
    ) -> Result<(PlanResult, Option<Arc<dyn State>>), PlannerError>;

    /// Persist a new status for an evaluation.
    fn update_eval(&mut self, eval: &Evaluation) -> Result<(), PlannerError>;

    /// Enqueue a follow-up evaluation.
    fn create_eval(&mut self, eval: &Evaluation) -> Result<(), PlannerError>;
}
