//! Budgeted evict-and-place.

use fleet_structs::AllocDesiredStatus;

use crate::context::Context;
use crate::diff::{AllocTuple, DiffResult};

/// Stop allocations and queue them for placement, within a shared budget.
///
/// Processes at most `*limit` entries of `allocs`: each gets a staged stop
/// with reason `desc` and re-enters `diff.place`. If all of `allocs` fit,
/// the budget is reduced by their number and `false` is returned. Otherwise
/// the budget is zeroed and `true` is returned: no further disruptive action
/// should be taken in this pass.
pub fn evict_and_place<'a>(
    ctx: &mut dyn Context,
    diff: &mut DiffResult<'a>,
    allocs: &[AllocTuple<'a>],
    desc: &str,
    limit: &mut usize,
) -> bool {
    for tuple in allocs.iter().take(*limit) {
        if let Some(alloc) = tuple.alloc {
            ctx.plan_mut()
                .append_update(alloc, AllocDesiredStatus::Stop, desc);
        }
        diff.place.push(*tuple);
    }

    if allocs.len() <= *limit {
        *limit -= allocs.len();
        return false;
    }

    *limit = 0;
    true
}
