use std::collections::BTreeMap;

use fleet_reconcile::{Context, RankedNode, Stack};
use fleet_structs::{Node, Resources, TaskGroup};

/// Address handed to every network the stack assigns.
pub const ASSIGNED_IP: &str = "192.168.0.100";

/// Stack that picks the first candidate with room for the task group.
///
/// Room is only checked against the CPU already placed on the node by the
/// plan under construction, which keeps scenarios predictable.
#[derive(Debug, Default)]
pub struct FirstFitStack {
    nodes: Vec<Node>,
    cpu_capacity: Option<u32>,
    selects: usize,
    last_candidates: Vec<String>,
    staged_updates: Vec<usize>,
}

impl FirstFitStack {
    /// A stack with unlimited room on every node.
    pub fn new() -> Self {
        Self::default()
    }

    /// A stack whose nodes each offer `cpu` units.
    pub fn with_cpu_capacity(cpu: u32) -> Self {
        Self {
            cpu_capacity: Some(cpu),
            ..Self::default()
        }
    }

    /// A stack on which nothing ever fits.
    pub fn infeasible() -> Self {
        Self::with_cpu_capacity(0)
    }

    /// Number of calls to `select`.
    pub fn selects(&self) -> usize {
        self.selects
    }

    /// Candidate node ids seen by the last `select`.
    pub fn last_candidates(&self) -> &[String] {
        &self.last_candidates
    }

    /// Staged update count observed by each `select`, in call order.
    pub fn staged_updates(&self) -> &[usize] {
        &self.staged_updates
    }

    fn planned_cpu(ctx: &dyn Context, node_id: &str) -> u32 {
        ctx.plan()
            .node_allocation
            .get(node_id)
            .map(|allocs| allocs.iter().map(|a| a.resources.cpu).sum())
            .unwrap_or(0)
    }
}

impl Stack for FirstFitStack {
    fn set_nodes(&mut self, nodes: Vec<Node>) {
        self.nodes = nodes;
    }

    fn select(
        &mut self,
        ctx: &mut dyn Context,
        task_group: &TaskGroup,
    ) -> Option<(RankedNode, Resources)> {
        self.selects += 1;
        self.last_candidates = self.nodes.iter().map(|n| n.id.clone()).collect();
        self.staged_updates.push(ctx.plan().update_count());

        let demand: u32 = task_group.tasks.iter().map(|t| t.resources.cpu).sum();

        for node in &self.nodes {
            ctx.metrics_mut().evaluate_node();

            if let Some(capacity) = self.cpu_capacity {
                if Self::planned_cpu(ctx, &node.id) + demand > capacity {
                    ctx.metrics_mut().exhaust_node("cpu");
                    continue;
                }
            }

            let mut task_resources = BTreeMap::new();
            let mut size = Resources::default();
            for task in &task_group.tasks {
                let mut resources = task.resources.clone();
                for network in &mut resources.networks {
                    network.ip = ASSIGNED_IP.to_string();
                }
                size.add(&resources);
                task_resources.insert(task.name.clone(), resources);
            }

            ctx.metrics_mut().score_node(&node.id, 1.0);
            let ranked = RankedNode {
                node: node.clone(),
                task_resources,
                score: 1.0,
            };
            return Some((ranked, size));
        }

        None
    }
}
