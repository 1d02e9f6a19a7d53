//! Candidate node selection.

use std::collections::HashSet;

use fleet_structs::{Node, NodeStatus};
use rand::Rng;

use crate::error::Result;
use crate::state::State;

/// All ready, non-draining nodes in the given datacenters.
///
/// Order follows the state iterator and must not be relied upon.
pub fn ready_nodes_in_dcs(state: &dyn State, dcs: &[String]) -> Result<Vec<Node>> {
    let dcs: HashSet<&str> = dcs.iter().map(String::as_str).collect();

    Ok(state
        .nodes()?
        .filter(|node| node.status == NodeStatus::Ready)
        .filter(|node| !node.drain)
        .filter(|node| dcs.contains(node.datacenter.as_str()))
        .collect())
}

/// Shuffle nodes in place (Fisher-Yates).
pub fn shuffle_nodes(nodes: &mut [Node]) {
    let mut rng = rand::rng();
    for i in (1..nodes.len()).rev() {
        let j = rng.random_range(0..=i);
        nodes.swap(i, j);
    }
}
