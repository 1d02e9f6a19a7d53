//! Per-evaluation scheduling context.

use std::sync::Arc;

use fleet_structs::{AllocMetric, Plan};

use crate::state::State;

/// Capabilities available to a reconciliation pass.
///
/// A context belongs to exactly one evaluation; nothing in it is shared with
/// other evaluations.
pub trait Context {
    /// The state snapshot the pass reads from.
    fn state(&self) -> &dyn State;

    /// The plan being built.
    fn plan(&self) -> &Plan;

    /// Mutable access to the plan being built.
    fn plan_mut(&mut self) -> &mut Plan;

    /// Metrics accumulated by the most recent placement attempt.
    fn metrics(&self) -> &AllocMetric;

    /// Mutable access to the placement metrics.
    fn metrics_mut(&mut self) -> &mut AllocMetric;

    /// Clear placement metrics before a new placement attempt.
    fn reset_metrics(&mut self);

    /// Evaluation the context belongs to.
    fn eval_id(&self) -> &str;
}

/// Context backed by a snapshot handle and an owned plan.
pub struct EvalContext {
    state: Arc<dyn State>,
    plan: Plan,
    metrics: AllocMetric,
}

impl EvalContext {
    /// Create a context for one pass.
    pub fn new(state: Arc<dyn State>, plan: Plan) -> Self {
        Self {
            state,
            plan,
            metrics: AllocMetric::default(),
        }
    }

    /// Consume the context, returning the plan.
    pub fn into_plan(self) -> Plan {
        self.plan
    }
}

impl Context for EvalContext {
    fn state(&self) -> &dyn State {
        self.state.as_ref()
    }

    fn plan(&self) -> &Plan {
        &self.plan
    }

    fn plan_mut(&mut self) -> &mut Plan {
        &mut self.plan
    }

    fn metrics(&self) -> &AllocMetric {
        &self.metrics
    }

    fn metrics_mut(&mut self) -> &mut AllocMetric {
        &mut self.metrics
    }

    fn reset_metrics(&mut self) {
        self.metrics = AllocMetric::default();
    }

    fn eval_id(&self) -> &str {
        &self.plan.eval_id
    }
}
