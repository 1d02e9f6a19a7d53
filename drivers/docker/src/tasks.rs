//! Running tasks known to the driver.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::cpuset::Coordinate;

/// A task the driver started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskHandle {
    /// Container running the task.
    pub container_id: String,

    /// Allocation the task belongs to.
    pub alloc_id: String,

    /// Task name within the allocation.
    pub task_name: String,
}

impl TaskHandle {
    /// The cgroup coordinate of this task.
    pub fn coordinate(&self) -> Coordinate {
        Coordinate {
            container_id: self.container_id.clone(),
            alloc_id: self.alloc_id.clone(),
            task: self.task_name.clone(),
        }
    }
}

/// Source of the tasks to reconcile.
#[async_trait]
pub trait TaskSource: Send + Sync {
    /// Snapshot of the currently tracked tasks.
    async fn tracked_tasks(&self) -> HashSet<Coordinate>;
}

/// Tracked tasks keyed by task id.
#[derive(Debug, Default)]
pub struct TaskStore {
    store: RwLock<HashMap<String, TaskHandle>>,
}

impl TaskStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a task, replacing any previous handle with the same id.
    pub async fn set(&self, task_id: impl Into<String>, handle: TaskHandle) {
        self.store.write().await.insert(task_id.into(), handle);
    }

    /// Look up a task.
    pub async fn get(&self, task_id: &str) -> Option<TaskHandle> {
        self.store.read().await.get(task_id).cloned()
    }

    /// Stop tracking a task.
    pub async fn delete(&self, task_id: &str) -> Option<TaskHandle> {
        self.store.write().await.remove(task_id)
    }

    /// Number of tracked tasks.
    pub async fn len(&self) -> usize {
        self.store.read().await.len()
    }

    /// Returns true if no tasks are tracked.
    pub async fn is_empty(&self) -> bool {
        self.store.read().await.is_empty()
    }
}

#[async_trait]
impl TaskSource for TaskStore {
    async fn tracked_tasks(&self) -> HashSet<Coordinate> {
        let store = self.store.read().await;
        store.values().map(TaskHandle::coordinate).collect()
    }
}
