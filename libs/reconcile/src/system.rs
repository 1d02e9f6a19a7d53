//! Scheduler for system jobs.
//!
//! Every ready node in the job's datacenters runs one instance of each task
//! group. The instance name carries the node id, so each missing instance is
//! placed on exactly that node.

use std::collections::HashMap;
use std::sync::Arc;

use fleet_structs::{Evaluation, Node, Plan};
use tracing::{debug, instrument, warn};

use crate::config::SchedulerConfig;
use crate::context::{Context, EvalContext};
use crate::error::Result;
use crate::materialize::{extract_task_group_id, materialize_system_task_groups};
use crate::nodes::ready_nodes_in_dcs;
use crate::pass::{place_alloc, reconcile_allocs, stop_all};
use crate::planner::Planner;
use crate::scheduler::{Core, Scheduler};
use crate::stack::Stack;
use crate::state::State;

/// Scheduler for one-instance-per-node jobs.
pub struct SystemScheduler<P, S> {
    core: Core<P, S>,
    config: SchedulerConfig,
}

impl<P: Planner, S: Stack> SystemScheduler<P, S> {
    /// Create a system scheduler.
    pub fn new(state: Arc<dyn State>, planner: P, stack: S, config: SchedulerConfig) -> Self {
        Self {
            core: Core::new(state, planner, stack),
            config,
        }
    }

    /// The planner plans are submitted to.
    pub fn planner(&self) -> &P {
        &self.core.planner
    }

    /// The follow-up evaluation created for a rolling update, if any.
    pub fn next_eval(&self) -> Option<&Evaluation> {
        self.core.next_eval.as_ref()
    }

    /// Placements that did not fit on their node in the final attempt of the
    /// last evaluation.
    pub fn failed_placements(&self) -> usize {
        self.core.failed_placements
    }
}

impl<P: Planner, S: Stack> Scheduler for SystemScheduler<P, S> {
    #[instrument(skip_all, fields(eval_id = %eval.id, job_id = %eval.job_id))]
    fn process(&mut self, eval: &Evaluation) -> Result<()> {
        self.core.run(eval, self.config.max_system_attempts, |core| {
            attempt(core, eval)
        })
    }
}

fn attempt<P: Planner, S: Stack>(core: &mut Core<P, S>, eval: &Evaluation) -> Result<bool> {
    let job = core.state.job_by_id(&eval.job_id)?;
    let mut allocs = core.state.allocs_by_job(&eval.job_id)?;
    allocs.retain(|alloc| !alloc.terminal_status());

    let mut ctx = EvalContext::new(
        Arc::clone(&core.state),
        Plan::new(eval.id.clone(), eval.priority),
    );

    core.limit_reached = false;

    match &job {
        None => stop_all(&mut ctx, &allocs),
        Some(job) => {
            let nodes = ready_nodes_in_dcs(ctx.state(), &job.datacenters)?;
            let required = materialize_system_task_groups(job, &nodes);
            let outcome =
                reconcile_allocs(&mut ctx, eval, job, &mut core.stack, &required, &allocs)?;
            core.limit_reached = outcome.limit_reached;

            let node_by_id: HashMap<&str, &Node> =
                nodes.iter().map(|node| (node.id.as_str(), node)).collect();

            for missing in &outcome.diff.place {
                let node_id = extract_task_group_id(missing.name)?;
                let Some(node) = node_by_id.get(node_id) else {
                    warn!(name = missing.name, node_id, "Node for placement is not ready");
                    continue;
                };

                core.stack.set_nodes(vec![(*node).clone()]);
                if !place_alloc(&mut ctx, eval, job, &mut core.stack, missing) {
                    debug!(name = missing.name, node_id, "Task group does not fit on node");
                    core.failed_placements += 1;
                }
            }
        }
    }

    core.submit(eval, job.as_deref(), ctx)
}
