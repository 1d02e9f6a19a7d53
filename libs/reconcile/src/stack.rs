//! Fit capability used to pick a node and resource split for a task group.
//!
//! The bin-packing algorithm itself lives outside this crate; the
//! reconciliation pass only narrows the candidate set and asks for a choice.

use std::collections::BTreeMap;

use fleet_structs::{Node, Resources, TaskGroup};

use crate::context::Context;

/// A node chosen for a task group, with the resources assigned per task.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedNode {
    /// The selected node.
    pub node: Node,

    /// Resources assigned to each task, keyed by task name.
    pub task_resources: BTreeMap<String, Resources>,

    /// Fitness score of the selection.
    pub score: f64,
}

/// Selects nodes for task groups.
pub trait Stack {
    /// Restrict the candidate nodes for subsequent selections.
    fn set_nodes(&mut self, nodes: Vec<Node>);

    /// Pick a node for the task group.
    ///
    /// The context's plan is consulted so that staged stops free up resources.
    /// Returns the choice and the aggregate resources, or `None` if no
    /// candidate fits.
    fn select(
        &mut self,
        ctx: &mut dyn Context,
        task_group: &TaskGroup,
    ) -> Option<(RankedNode, Resources)>;
}
