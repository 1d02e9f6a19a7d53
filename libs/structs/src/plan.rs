//! Plans: the staged outcome of one scheduling pass.
//!
//! A plan never touches cluster state directly. The plan applier validates it
//! against the latest state and commits whatever still fits, reporting back a
//! [`PlanResult`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{AllocDesiredStatus, Allocation};

/// Allocation mutations staged by a scheduling pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    /// Evaluation that produced the plan.
    pub eval_id: String,

    /// Priority of the evaluation.
    pub priority: i32,

    /// Existing allocations to stop or evict, keyed by node id.
    #[serde(default)]
    pub node_update: BTreeMap<String, Vec<Allocation>>,

    /// New allocations to create, keyed by node id.
    #[serde(default)]
    pub node_allocation: BTreeMap<String, Vec<Allocation>>,

    /// Allocations that could not be placed, kept for reporting.
    #[serde(default)]
    pub failed_allocs: Vec<Allocation>,
}

impl Plan {
    /// Create an empty plan for an evaluation.
    pub fn new(eval_id: impl Into<String>, priority: i32) -> Self {
        Self {
            eval_id: eval_id.into(),
            priority,
            ..Default::default()
        }
    }

    /// Stage a status change for an existing allocation.
    ///
    /// The allocation is copied; the caller's record is left untouched.
    pub fn append_update(
        &mut self,
        alloc: &Allocation,
        desired_status: AllocDesiredStatus,
        reason: &str,
    ) {
        let mut staged = alloc.clone();
        staged.desired_status = desired_status;
        staged.desired_description = reason.to_string();
        self.node_update
            .entry(alloc.node_id.clone())
            .or_default()
            .push(staged);
    }

    /// Retract the most recently staged update for an allocation.
    ///
    /// Only the last update on the allocation's node is considered, and only
    /// if it refers to the same allocation id.
    pub fn pop_update(&mut self, alloc: &Allocation) {
        let Some(existing) = self.node_update.get_mut(&alloc.node_id) else {
            return;
        };

        if existing.last().is_some_and(|last| last.id == alloc.id) {
            existing.pop();
            if existing.is_empty() {
                self.node_update.remove(&alloc.node_id);
            }
        }
    }

    /// Stage a new allocation.
    pub fn append_alloc(&mut self, alloc: Allocation) {
        self.node_allocation
            .entry(alloc.node_id.clone())
            .or_default()
            .push(alloc);
    }

    /// Record an allocation that could not be placed.
    pub fn append_failed(&mut self, alloc: Allocation) {
        self.failed_allocs.push(alloc);
    }

    /// Returns true if nothing is staged.
    pub fn is_noop(&self) -> bool {
        self.node_update.is_empty()
            && self.node_allocation.is_empty()
            && self.failed_allocs.is_empty()
    }

    /// Total number of staged updates across all nodes.
    pub fn update_count(&self) -> usize {
        self.node_update.values().map(Vec::len).sum()
    }

    /// Total number of staged new allocations across all nodes.
    pub fn alloc_count(&self) -> usize {
        self.node_allocation.values().map(Vec::len).sum()
    }
}

/// What the plan applier actually committed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanResult {
    /// Updates that were committed, keyed by node id.
    #[serde(default)]
    pub node_update: BTreeMap<String, Vec<Allocation>>,

    /// New allocations that were committed, keyed by node id.
    #[serde(default)]
    pub node_allocation: BTreeMap<String, Vec<Allocation>>,

    /// State index the scheduler must refresh to before retrying.
    #[serde(default)]
    pub refresh_index: u64,

    /// Index at which the plan was committed.
    #[serde(default)]
    pub alloc_index: u64,
}

impl PlanResult {
    /// Check whether every staged mutation of `plan` was committed.
    ///
    /// Returns `(fully_committed, expected, actual)`.
    pub fn full_commit(&self, plan: &Plan) -> (bool, usize, usize) {
        let mut expected = 0;
        let mut actual = 0;

        for (node, allocs) in &plan.node_update {
            expected += allocs.len();
            actual += self.node_update.get(node).map_or(0, Vec::len);
        }
        for (node, allocs) in &plan.node_allocation {
            expected += allocs.len();
            actual += self.node_allocation.get(node).map_or(0, Vec::len);
        }

        (actual == expected, expected, actual)
    }
}
