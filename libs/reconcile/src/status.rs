//! Evaluation status updates.

use fleet_structs::{EvalStatus, Evaluation};
use tracing::debug;

use crate::error::Result;
use crate::planner::Planner;

/// Move an evaluation to `status`, optionally chaining `next_eval`.
pub fn set_status(
    planner: &mut dyn Planner,
    eval: &Evaluation,
    next_eval: Option<&Evaluation>,
    status: EvalStatus,
    desc: &str,
) -> Result<()> {
    debug!(eval_id = %eval.id, %status, "Setting evaluation status");

    let mut updated = eval.clone();
    updated.status = status;
    updated.status_description = desc.to_string();
    if let Some(next) = next_eval {
        updated.next_eval = Some(next.id.clone());
    }

    planner.update_eval(&updated)?;
    Ok(())
}
