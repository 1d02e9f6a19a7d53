//! Bounded retries of plan-producing callbacks.

use fleet_structs::EvalStatus;
use tracing::trace;

use crate::error::{ReconcileError, Result};

/// Invoke `cb` until it reports done, at most `max` times.
///
/// An error from `cb` is returned immediately. Running out of attempts fails
/// the evaluation with [`ReconcileError::SetStatus`].
pub fn retry_max<F>(max: usize, mut cb: F) -> Result<()>
where
    F: FnMut() -> Result<bool>,
{
    for attempt in 1..=max {
        if cb()? {
            return Ok(());
        }
        trace!(attempt, max, "Attempt did not complete, retrying");
    }

    Err(ReconcileError::SetStatus {
        message: format!("maximum attempts reached ({max})"),
        eval_status: EvalStatus::Failed,
    })
}
