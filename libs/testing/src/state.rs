use std::collections::HashMap;
use std::sync::Arc;

use fleet_reconcile::{NodeIter, State, StateError, StateResult};
use fleet_structs::{Allocation, Job, Node};

/// In-memory cluster snapshot.
#[derive(Debug, Clone, Default)]
pub struct MemState {
    nodes: Vec<Node>,
    jobs: HashMap<String, Arc<Job>>,
    allocs: Vec<Allocation>,
    fail_node_lookups: bool,
}

impl MemState {
    /// Create an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a node.
    pub fn upsert_node(&mut self, node: Node) -> &mut Self {
        self.nodes.retain(|n| n.id != node.id);
        self.nodes.push(node);
        self
    }

    /// Insert or replace a job.
    pub fn upsert_job(&mut self, job: Job) -> &mut Self {
        self.jobs.insert(job.id.clone(), Arc::new(job));
        self
    }

    /// Insert or replace allocations.
    pub fn upsert_allocs(&mut self, allocs: impl IntoIterator<Item = Allocation>) -> &mut Self {
        for alloc in allocs {
            self.allocs.retain(|a| a.id != alloc.id);
            self.allocs.push(alloc);
        }
        self
    }

    /// Remove a node.
    pub fn delete_node(&mut self, id: &str) -> &mut Self {
        self.nodes.retain(|n| n.id != id);
        self
    }

    /// Make every node lookup fail.
    pub fn fail_node_lookups(&mut self) -> &mut Self {
        self.fail_node_lookups = true;
        self
    }

    /// Freeze into a shareable snapshot.
    pub fn snapshot(&self) -> Arc<dyn State> {
        Arc::new(self.clone())
    }
}

impl State for MemState {
    fn nodes(&self) -> StateResult<NodeIter<'_>> {
        Ok(Box::new(self.nodes.iter().cloned()))
    }

    fn node_by_id(&self, id: &str) -> StateResult<Option<Node>> {
        if self.fail_node_lookups {
            return Err(StateError::Lookup {
                table: "nodes",
                message: format!("injected failure for {id}"),
            });
        }
        Ok(self.nodes.iter().find(|n| n.id == id).cloned())
    }

    fn job_by_id(&self, id: &str) -> StateResult<Option<Arc<Job>>> {
        Ok(self.jobs.get(id).cloned())
    }

    fn allocs_by_job(&self, job_id: &str) -> StateResult<Vec<Allocation>> {
        Ok(self
            .allocs
            .iter()
            .filter(|a| a.job_id == job_id)
            .cloned()
            .collect())
    }
}
