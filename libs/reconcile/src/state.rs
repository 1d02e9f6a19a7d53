//! Read access to a point-in-time cluster state snapshot.

use std::sync::Arc;

use fleet_structs::{Allocation, Job, Node};
use thiserror::Error;

/// Result type for state reads.
pub type StateResult<T> = std::result::Result<T, StateError>;

/// Errors from the state store.
#[derive(Debug, Error)]
pub enum StateError {
    /// A lookup against the snapshot failed.
    #[error("lookup of {table} failed: {message}")]
    Lookup {
        table: &'static str,
        message: String,
    },

    /// The snapshot is no longer readable.
    #[error("snapshot unavailable: {0}")]
    Unavailable(String),
}

/// Boxed node iterator returned by [`State::nodes`].
pub type NodeIter<'a> = Box<dyn Iterator<Item = Node> + 'a>;

/// A consistent, read-only view of cluster state.
///
/// Every method reads against the same snapshot. Implementations are owned
/// by a single evaluation and are never written to by the scheduler.
pub trait State: Send + Sync {
    /// Iterate over all nodes. Calling again restarts the iteration.
    ///
    /// Order is whatever the store yields and must not be relied upon.
    fn nodes(&self) -> StateResult<NodeIter<'_>>;

    /// Look up a node by id.
    fn node_by_id(&self, id: &str) -> StateResult<Option<Node>>;

    /// Look up a job by id.
    fn job_by_id(&self, id: &str) -> StateResult<Option<Arc<Job>>>;

    /// All allocations of a job, terminal ones included.
    fn allocs_by_job(&self, job_id: &str) -> StateResult<Vec<Allocation>>;
}
