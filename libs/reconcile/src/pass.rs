//! The reconciliation pass shared by the schedulers.
//!
//! Given the desired instances and the live allocations of a job, a pass:
//! 1. Classifies the nodes the allocations live on
//! 2. Diffs desired against existing
//! 3. Stages stops for allocations no longer required
//! 4. Resolves as many updates in place as possible
//! 5. Evicts and re-places migrations, then the remaining updates, within
//!    the disruption budget
//!
//! Placement of the resulting `place` bucket is left to the scheduler, since
//! candidate nodes differ between job types.

use std::collections::BTreeMap;
use std::sync::Arc;

use fleet_structs::{
    AllocClientStatus, AllocDesiredStatus, Allocation, EvalStatus, Evaluation, Job, Resources,
    EVAL_TRIGGER_ROLLING_UPDATE,
};
use tracing::debug;
use uuid::Uuid;

use crate::context::Context;
use crate::diff::{diff_allocs, AllocTuple, DiffResult};
use crate::error::Result;
use crate::evict::evict_and_place;
use crate::inplace::inplace_update;
use crate::materialize::DesiredGroups;
use crate::stack::Stack;
use crate::taint::tainted_nodes;
use crate::{ALLOC_MIGRATING, ALLOC_NOT_NEEDED, ALLOC_PLACEMENT_FAILED, ALLOC_UPDATING};

/// Outcome of [`reconcile_allocs`].
#[derive(Debug)]
pub struct PassOutcome<'a> {
    /// The diff, with `place` extended by evicted allocations and `update`
    /// reduced to the updates that could not happen in place.
    pub diff: DiffResult<'a>,

    /// Set when the disruption budget ran out.
    pub limit_reached: bool,
}

/// Run steps 1 to 5 of a pass against the context's plan.
pub fn reconcile_allocs<'a>(
    ctx: &mut dyn Context,
    eval: &Evaluation,
    job: &Arc<Job>,
    stack: &mut dyn Stack,
    required: &'a DesiredGroups<'a>,
    allocs: &'a [Allocation],
) -> Result<PassOutcome<'a>> {
    let tainted = tainted_nodes(ctx.state(), allocs)?;

    let mut diff = diff_allocs(job, &tainted, required, allocs);
    debug!(eval_id = %eval.id, %diff, "Computed allocation diff");

    for tuple in &diff.stop {
        if let Some(alloc) = tuple.alloc {
            ctx.plan_mut()
                .append_update(alloc, AllocDesiredStatus::Stop, ALLOC_NOT_NEEDED);
        }
    }

    let updates = std::mem::take(&mut diff.update);
    diff.update = inplace_update(ctx, eval, job, stack, updates)?;

    let mut limit = if job.update.is_rolling() {
        job.update.max_parallel
    } else {
        diff.update.len() + diff.migrate.len()
    };

    let migrate = diff.migrate.clone();
    let update = diff.update.clone();
    let limit_reached = evict_and_place(ctx, &mut diff, &migrate, ALLOC_MIGRATING, &mut limit)
        || evict_and_place(ctx, &mut diff, &update, ALLOC_UPDATING, &mut limit);

    if limit_reached {
        debug!(eval_id = %eval.id, "Disruption budget exhausted for this pass");
    }

    Ok(PassOutcome {
        diff,
        limit_reached,
    })
}

/// Stop every allocation; used when the job no longer exists.
pub fn stop_all(ctx: &mut dyn Context, allocs: &[Allocation]) {
    for alloc in allocs {
        ctx.plan_mut()
            .append_update(alloc, AllocDesiredStatus::Stop, ALLOC_NOT_NEEDED);
    }
}

/// Ask the stack for a node and stage the new allocation.
///
/// When nothing fits, a failed allocation is recorded on the plan instead and
/// `false` is returned.
pub fn place_alloc(
    ctx: &mut dyn Context,
    eval: &Evaluation,
    job: &Arc<Job>,
    stack: &mut dyn Stack,
    missing: &AllocTuple<'_>,
) -> bool {
    let Some(tg) = missing.task_group else {
        return false;
    };

    ctx.reset_metrics();
    let option = stack.select(ctx, tg);

    let mut alloc = Allocation {
        id: Uuid::new_v4().to_string(),
        eval_id: eval.id.clone(),
        name: missing.name.to_string(),
        node_id: String::new(),
        job_id: job.id.clone(),
        job: Arc::clone(job),
        task_group: tg.name.clone(),
        resources: Resources::default(),
        task_resources: BTreeMap::new(),
        metrics: ctx.metrics().clone(),
        desired_status: AllocDesiredStatus::Run,
        desired_description: String::new(),
        client_status: AllocClientStatus::Pending,
        client_description: String::new(),
    };

    match option {
        Some((ranked, size)) => {
            alloc.node_id = ranked.node.id;
            alloc.resources = size;
            alloc.task_resources = ranked.task_resources;
            ctx.plan_mut().append_alloc(alloc);
            true
        }
        None => {
            alloc.desired_status = AllocDesiredStatus::Failed;
            alloc.desired_description = ALLOC_PLACEMENT_FAILED.to_string();
            alloc.client_status = AllocClientStatus::Failed;
            ctx.plan_mut().append_failed(alloc);
            false
        }
    }
}

/// Build the evaluation that continues a rolling update after the stagger.
pub fn next_rolling_eval(eval: &Evaluation, job: &Job) -> Evaluation {
    Evaluation {
        id: Uuid::new_v4().to_string(),
        priority: eval.priority,
        job_type: eval.job_type,
        triggered_by: EVAL_TRIGGER_ROLLING_UPDATE.to_string(),
        job_id: eval.job_id.clone(),
        job_modify_index: eval.job_modify_index,
        status: EvalStatus::Pending,
        status_description: String::new(),
        wait: job.update.stagger,
        next_eval: None,
        previous_eval: Some(eval.id.clone()),
    }
}
