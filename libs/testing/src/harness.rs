use std::sync::Arc;

use fleet_reconcile::{Planner, PlannerError, State};
use fleet_structs::{Evaluation, Plan, PlanResult};

/// How the harness answers plan submissions.
#[derive(Clone, Default)]
pub enum CommitMode {
    /// Commit every plan in full.
    #[default]
    Full,

    /// Commit nothing for the first `n` submissions, then commit in full.
    PartialFor(usize),

    /// Hand back a refreshed snapshot for the first `n` submissions.
    RefreshFor(usize, Arc<dyn State>),

    /// Fail every submission.
    Reject,
}

/// Planner that records everything it is asked to do.
#[derive(Default)]
pub struct Harness {
    /// Plans in submission order.
    pub plans: Vec<Plan>,

    /// Evaluation status updates in order.
    pub evals: Vec<Evaluation>,

    /// Follow-up evaluations in order.
    pub created_evals: Vec<Evaluation>,

    mode: CommitMode,
    index: u64,
}

impl Harness {
    /// A harness that commits every plan in full.
    pub fn new() -> Self {
        Self::default()
    }

    /// A harness with the given commit behavior.
    pub fn with_mode(mode: CommitMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// The most recently submitted plan.
    pub fn last_plan(&self) -> Option<&Plan> {
        self.plans.last()
    }

    /// The most recent evaluation status update.
    pub fn last_eval(&self) -> Option<&Evaluation> {
        self.evals.last()
    }
}

impl Planner for Harness {
    fn submit_plan(
        &mut self,
        plan: &Plan,
    ) -> Result<(PlanResult, Option<Arc<dyn State>>), PlannerError> {
        self.plans.push(plan.clone());
        self.index += 1;
        let attempt = self.plans.len();

        let full = PlanResult {
            node_update: plan.node_update.clone(),
            node_allocation: plan.node_allocation.clone(),
            refresh_index: 0,
            alloc_index: self.index,
        };

        match &self.mode {
            CommitMode::Full => Ok((full, None)),
            CommitMode::PartialFor(n) if attempt <= *n => Ok((
                PlanResult {
                    refresh_index: self.index,
                    ..PlanResult::default()
                },
                None,
            )),
            CommitMode::PartialFor(_) => Ok((full, None)),
            CommitMode::RefreshFor(n, state) if attempt <= *n => Ok((
                PlanResult {
                    refresh_index: self.index,
                    ..PlanResult::default()
                },
                Some(Arc::clone(state)),
            )),
            CommitMode::RefreshFor(..) => Ok((full, None)),
            CommitMode::Reject => Err(PlannerError::Rejected("plan rejected".to_string())),
        }
    }

    fn update_eval(&mut self, eval: &Evaluation) -> Result<(), PlannerError> {
        self.evals.push(eval.clone());
        Ok(())
    }

    fn create_eval(&mut self, eval: &Evaluation) -> Result<(), PlannerError> {
        self.created_evals.push(eval.clone());
        Ok(())
    }
}
