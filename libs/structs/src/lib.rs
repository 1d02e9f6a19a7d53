//! # fleet-structs
//!
//! Records exchanged between the cluster state store, the scheduler and the
//! plan applier.
//!
//! ## Design Principles
//!
//! - Records are plain data; behavior lives in the scheduler crates
//! - Allocations are never mutated destructively: an update produces a new
//!   record and the previous one is kept only for comparison
//! - Every record round-trips through JSON so snapshots and plans can be
//!   logged and inspected
//!
//! ## Record Types
//!
//! - [`Job`], [`TaskGroup`], [`Task`]: what the operator asked for
//! - [`Node`]: a client machine and its readiness
//! - [`Allocation`]: one task group instance bound to one node
//! - [`Evaluation`]: a unit of scheduling work
//! - [`Plan`], [`PlanResult`]: the staged outcome of one scheduling pass

mod alloc;
mod eval;
mod job;
mod node;
mod plan;
mod resources;

pub use alloc::*;
pub use eval::*;
pub use job::*;
pub use node::*;
pub use plan::*;
pub use resources::*;
