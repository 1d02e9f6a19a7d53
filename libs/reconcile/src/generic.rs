//! Scheduler for service and batch jobs.
//!
//! Task groups are expanded by count and new instances may land on any ready
//! node in the job's datacenters. Candidates are shuffled before placement to
//! avoid piling work onto whichever nodes the store happens to list first.

use std::sync::Arc;

use fleet_structs::{Evaluation, Plan};
use tracing::{debug, instrument};

use crate::config::SchedulerConfig;
use crate::context::{Context, EvalContext};
use crate::error::Result;
use crate::materialize::materialize_task_groups;
use crate::nodes::{ready_nodes_in_dcs, shuffle_nodes};
use crate::pass::{place_alloc, reconcile_allocs, stop_all};
use crate::planner::Planner;
use crate::scheduler::{Core, Scheduler};
use crate::stack::Stack;
use crate::state::State;

/// Scheduler for count-based jobs.
pub struct GenericScheduler<P, S> {
    core: Core<P, S>,
    batch: bool,
    config: SchedulerConfig,
}

impl<P: Planner, S: Stack> GenericScheduler<P, S> {
    /// Create a scheduler for service jobs.
    pub fn new_service(
        state: Arc<dyn State>,
        planner: P,
        stack: S,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            core: Core::new(state, planner, stack),
            batch: false,
            config,
        }
    }

    /// Create a scheduler for batch jobs.
    pub fn new_batch(state: Arc<dyn State>, planner: P, stack: S, config: SchedulerConfig) -> Self {
        Self {
            core: Core::new(state, planner, stack),
            batch: true,
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

    /// Placements that found no feasible node in the final attempt of the last
    /// evaluation.
    pub fn failed_placements(&self) -> usize {
        self.core.failed_placements
    }
}

impl<P: Planner, S: Stack> Scheduler for GenericScheduler<P, S> {
    #[instrument(skip_all, fields(eval_id = %eval.id, job_id = %eval.job_id))]
    fn process(&mut self, eval: &Evaluation) -> Result<()> {
        let max_attempts = if self.batch {
            self.config.max_batch_attempts
        } else {
            self.config.max_service_attempts
        };

        self.core
            .run(eval, max_attempts, |core| attempt(core, eval))
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
            let required = materialize_task_groups(job);
            let outcome =
                reconcile_allocs(&mut ctx, eval, job, &mut core.stack, &required, &allocs)?;
            core.limit_reached = outcome.limit_reached;

            if !outcome.diff.place.is_empty() {
                let mut nodes = ready_nodes_in_dcs(ctx.state(), &job.datacenters)?;
                shuffle_nodes(&mut nodes);
                core.stack.set_nodes(nodes);

                for missing in &outcome.diff.place {
                    if !place_alloc(&mut ctx, eval, job, &mut core.stack, missing) {
                        debug!(name = missing.name, "Failed to find a node for placement");
                        core.failed_placements += 1;
                    }
                }
            }
        }
    }

    core.submit(eval, job.as_deref(), ctx)
}
