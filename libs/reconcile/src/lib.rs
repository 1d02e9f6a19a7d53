//! Allocation reconciliation.
//!
//! This library computes, for one job and one cluster snapshot, the minimal
//! set of allocation changes that converge the cluster toward the job:
//!
//! - **Materialize**: expand task groups into named desired instances
//! - **Classify**: find nodes whose allocations must move away
//! - **Diff**: partition names into place / update / migrate / stop / ignore
//! - **In-place**: apply updates without moving allocations where possible
//! - **Evict and place**: stop and re-place the rest, within a budget
//!
//! All changes are staged in a [`fleet_structs::Plan`]; nothing is applied to
//! cluster state directly.
//!
//! # Invariants
//!
//! - Every existing or desired name lands in exactly one diff bucket
//! - Taint takes precedence over a changed job version
//! - Network assignments never change during an in-place update
//! - Any ambiguity resolves toward the disruptive path, never toward
//!   silently dropping an update

mod config;
mod context;
mod diff;
mod error;
mod evict;
mod generic;
mod inplace;
mod materialize;
mod nodes;
mod pass;
mod planner;
mod retry;
mod scheduler;
mod stack;
mod state;
mod status;
mod system;
mod taint;

pub use config::*;
pub use context::{Context, EvalContext};
pub use diff::{diff_allocs, AllocTuple, DiffResult};
pub use error::{ReconcileError, Result};
pub use evict::evict_and_place;
pub use generic::GenericScheduler;
pub use inplace::{inplace_update, tasks_updated};
pub use materialize::{
    alloc_name, extract_task_group_id, materialize_system_task_groups, materialize_task_groups,
    DesiredGroups,
};
pub use nodes::{ready_nodes_in_dcs, shuffle_nodes};
pub use pass::{next_rolling_eval, place_alloc, reconcile_allocs, stop_all, PassOutcome};
pub use planner::{Planner, PlannerError};
pub use retry::retry_max;
pub use scheduler::Scheduler;
pub use stack::{RankedNode, Stack};
pub use state::{NodeIter, State, StateError, StateResult};
pub use status::set_status;
pub use system::SystemScheduler;
pub use taint::{tainted_nodes, TaintedNodes};

/// Reason for stopping an allocation that is no longer required.
pub const ALLOC_NOT_NEEDED: &str = "alloc not needed due to job update";

/// Reason for stopping an allocation on a tainted node.
pub const ALLOC_MIGRATING: &str = "alloc is being migrated";

/// Reason for stopping an allocation that cannot be updated in place.
pub const ALLOC_UPDATING: &str = "alloc is being updated due to job update";

/// Reason for the speculative stop staged during an in-place attempt.
pub const ALLOC_IN_PLACE: &str = "alloc updating in-place";

/// Reason recorded on an allocation that found no feasible node.
pub const ALLOC_PLACEMENT_FAILED: &str = "failed to find a node for placement";
