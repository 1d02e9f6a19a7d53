//! Classification of nodes whose allocations must migrate away.

use std::collections::HashMap;

use fleet_structs::Allocation;
use tracing::trace;

use crate::error::Result;
use crate::state::State;

/// Node id to "allocations here must migrate".
pub type TaintedNodes = HashMap<String, bool>;

/// Classify every node referenced by `allocs`.
///
/// A node is tainted when it no longer exists, when its status requires
/// draining, or when its drain flag is set. Each node is looked up once. A
/// failed lookup aborts the whole pass.
pub fn tainted_nodes(state: &dyn State, allocs: &[Allocation]) -> Result<TaintedNodes> {
    let mut out = HashMap::new();

    for alloc in allocs {
        if out.contains_key(&alloc.node_id) {
            continue;
        }

        let tainted = match state.node_by_id(&alloc.node_id)? {
            // A vanished node is presumed to have lost its allocations
            None => true,
            Some(node) => node.status.should_drain() || node.drain,
        };

        trace!(node_id = %alloc.node_id, tainted, "Classified node");
        out.insert(alloc.node_id.clone(), tainted);
    }

    Ok(out)
}
