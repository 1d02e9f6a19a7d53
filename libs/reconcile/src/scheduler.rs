//! Evaluation processing shared by the schedulers.
//!
//! A scheduler turns one evaluation into a committed plan. Each attempt
//! computes a full plan against the current snapshot and submits it; a
//! partial commit hands back a fresher snapshot and the attempt is retried,
//! bounded by the configured attempt count.

use std::sync::Arc;

use fleet_structs::{
    EvalStatus, Evaluation, Job, EVAL_TRIGGER_JOB_DEREGISTER, EVAL_TRIGGER_JOB_REGISTER,
    EVAL_TRIGGER_NODE_UPDATE, EVAL_TRIGGER_ROLLING_UPDATE,
};
use tracing::{debug, warn};

use crate::context::EvalContext;
use crate::error::{ReconcileError, Result};
use crate::pass::next_rolling_eval;
use crate::planner::Planner;
use crate::retry::retry_max;
use crate::stack::Stack;
use crate::state::State;
use crate::status::set_status;

/// Processes evaluations for one kind of job.
pub trait Scheduler {
    /// Reconcile the evaluation's job and record the evaluation outcome.
    fn process(&mut self, eval: &Evaluation) -> Result<()>;
}

/// State carried across the attempts of one evaluation.
///
/// `next_eval` lives for the whole evaluation; `limit_reached` and
/// `failed_placements` describe the latest attempt only.
pub(crate) struct Core<P, S> {
    pub state: Arc<dyn State>,
    pub planner: P,
    pub stack: S,
    pub limit_reached: bool,
    pub next_eval: Option<Evaluation>,
    pub failed_placements: usize,
}

impl<P: Planner, S: Stack> Core<P, S> {
    pub fn new(state: Arc<dyn State>, planner: P, stack: S) -> Self {
        Self {
            state,
            planner,
            stack,
            limit_reached: false,
            next_eval: None,
            failed_placements: 0,
        }
    }

    /// Drive `attempt` under the retry harness and set the final status.
    pub fn run<F>(&mut self, eval: &Evaluation, max_attempts: usize, mut attempt: F) -> Result<()>
    where
        F: FnMut(&mut Self) -> Result<bool>,
    {
        if !handles_trigger(&eval.triggered_by) {
            let desc = format!(
                "scheduler cannot handle '{}' evaluation reason",
                eval.triggered_by
            );
            return set_status(&mut self.planner, eval, None, EvalStatus::Failed, &desc);
        }

        self.next_eval = None;

        match retry_max(max_attempts, || {
            self.failed_placements = 0;
            attempt(self)
        }) {
            Ok(()) => set_status(
                &mut self.planner,
                eval,
                self.next_eval.as_ref(),
                EvalStatus::Complete,
                "",
            ),
            Err(ReconcileError::SetStatus {
                message,
                eval_status,
            }) => {
                warn!(eval_id = %eval.id, error = %message, "Evaluation failed");
                set_status(
                    &mut self.planner,
                    eval,
                    self.next_eval.as_ref(),
                    eval_status,
                    &message,
                )
            }
            Err(e) => Err(e),
        }
    }

    /// Chain a rolling follow-up if needed, then submit the context's plan.
    ///
    /// Returns true when the attempt is complete.
    pub fn submit(
        &mut self,
        eval: &Evaluation,
        job: Option<&Job>,
        ctx: EvalContext,
    ) -> Result<bool> {
        if self.limit_reached && self.next_eval.is_none() {
            if let Some(job) = job {
                let next = next_rolling_eval(eval, job);
                self.planner.create_eval(&next)?;
                debug!(
                    eval_id = %eval.id,
                    next_eval_id = %next.id,
                    "Rolling update limit reached, next eval created"
                );
                self.next_eval = Some(next);
            }
        }

        let plan = ctx.into_plan();
        if plan.is_noop() {
            return Ok(true);
        }

        let (result, new_state) = self.planner.submit_plan(&plan)?;

        if let Some(state) = new_state {
            debug!(eval_id = %eval.id, "Refreshing state");
            self.state = state;
            return Ok(false);
        }

        let (full, expected, actual) = result.full_commit(&plan);
        if !full {
            debug!(
                eval_id = %eval.id,
                expected,
                actual,
                "Plan partially committed, retrying"
            );
            return Ok(false);
        }

        Ok(true)
    }
}

fn handles_trigger(triggered_by: &str) -> bool {
    matches!(
        triggered_by,
        EVAL_TRIGGER_JOB_REGISTER
            | EVAL_TRIGGER_JOB_DEREGISTER
            | EVAL_TRIGGER_NODE_UPDATE
            | EVAL_TRIGGER_ROLLING_UPDATE
    )
}
