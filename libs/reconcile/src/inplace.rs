//! In-place updates of existing allocations.
//!
//! An allocation whose job changed can sometimes be updated without moving
//! it: when its tasks, drivers, configs and port shapes are unchanged and the
//! node it lives on still fits the new resource ask. Whatever cannot be
//! resolved this way is handed back for evict-and-place.

use std::sync::Arc;

use fleet_structs::{AllocClientStatus, AllocDesiredStatus, Evaluation, Job, TaskGroup};
use tracing::debug;

use crate::context::Context;
use crate::diff::AllocTuple;
use crate::error::Result;
use crate::stack::Stack;
use crate::ALLOC_IN_PLACE;

/// Returns true if the tasks of `a` and `b` differ in a way that rules out an
/// in-place update.
///
/// That is the case when the task sets differ, or when any task changed its
/// driver, its config, its number of networks or the number of dynamic ports
/// in any network.
pub fn tasks_updated(a: &TaskGroup, b: &TaskGroup) -> bool {
    if a.tasks.len() != b.tasks.len() {
        return true;
    }

    for at in &a.tasks {
        let Some(bt) = b.lookup_task(&at.name) else {
            return true;
        };
        if at.driver != bt.driver {
            return true;
        }
        if at.config != bt.config {
            return true;
        }

        let (an, bn) = (&at.resources.networks, &bt.resources.networks);
        if an.len() != bn.len() {
            return true;
        }
        if an
            .iter()
            .zip(bn)
            .any(|(x, y)| x.dynamic_ports.len() != y.dynamic_ports.len())
        {
            return true;
        }
    }

    false
}

/// Attempt to update allocations in place.
///
/// Each resolved allocation is replaced in the plan by a new record on the
/// same node with the new job, fresh resources and its previous network
/// assignments. Returns the candidates that still need evict-and-place; their
/// order is not preserved.
pub fn inplace_update<'a>(
    ctx: &mut dyn Context,
    eval: &Evaluation,
    job: &Arc<Job>,
    stack: &mut dyn Stack,
    updates: Vec<AllocTuple<'a>>,
) -> Result<Vec<AllocTuple<'a>>> {
    let total = updates.len();
    let mut residual = Vec::with_capacity(total);

    for update in updates {
        if !try_inplace(ctx, eval, job, stack, &update)? {
            residual.push(update);
        }
    }

    if total > 0 {
        debug!(
            eval_id = %eval.id,
            inplace = total - residual.len(),
            total,
            "In-place updates"
        );
    }

    Ok(residual)
}

/// Returns true if the update was staged in place.
fn try_inplace(
    ctx: &mut dyn Context,
    eval: &Evaluation,
    job: &Arc<Job>,
    stack: &mut dyn Stack,
    update: &AllocTuple<'_>,
) -> Result<bool> {
    let (Some(tg), Some(alloc)) = (update.task_group, update.alloc) else {
        return Ok(false);
    };

    // Driver or config changes require a rolling upgrade
    let Some(existing) = alloc.job.lookup_task_group(&tg.name) else {
        return Ok(false);
    };
    if tasks_updated(tg, existing) {
        return Ok(false);
    }

    let Some(node) = ctx.state().node_by_id(&alloc.node_id)? else {
        return Ok(false);
    };

    stack.set_nodes(vec![node]);

    // Stage the eviction so the fit accounts for what the allocation holds
    ctx.plan_mut()
        .append_update(alloc, AllocDesiredStatus::Stop, ALLOC_IN_PLACE);
    let option = stack.select(ctx, tg);
    ctx.plan_mut().pop_update(alloc);

    let Some((ranked, size)) = option else {
        return Ok(false);
    };

    // Network assignments are never changed in place. `tasks_updated` has
    // already ruled out differing port shapes.
    let mut task_resources = ranked.task_resources;
    for (task, resources) in task_resources.iter_mut() {
        let Some(previous) = alloc.task_resources.get(task) else {
            return Ok(false);
        };
        resources.networks = previous.networks.clone();
    }

    let mut new_alloc = alloc.clone();
    new_alloc.eval_id = eval.id.clone();
    new_alloc.job = Arc::clone(job);
    new_alloc.resources = size;
    new_alloc.task_resources = task_resources;
    new_alloc.metrics = ctx.metrics().clone();
    new_alloc.desired_status = AllocDesiredStatus::Run;
    new_alloc.client_status = AllocClientStatus::Pending;
    ctx.plan_mut().append_alloc(new_alloc);

    Ok(true)
}
