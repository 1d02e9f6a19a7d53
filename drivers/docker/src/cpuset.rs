//! Background cpuset reconciliation.
//!
//! The scheduler records each task's CPU set on `{parent}/{alloc}.{task}.scope`
//! but the container actually runs in `{parent}/docker-{container}.scope`.
//! Reserved cores come and go as tasks start and stop, so the shared pool
//! changes size over time and the copy has to be repeated continuously.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use fleet_cgutil::{copy_cpuset, CgroupMode, V2_CGROUP_ROOT};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, trace};

use crate::config::DriverConfig;
use crate::error::Result;
use crate::tasks::TaskSource;

/// Identifies the two cgroups of one running task.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Coordinate {
    pub container_id: String,
    pub alloc_id: String,
    pub task: String,
}

impl Coordinate {
    /// Scope created by the scheduler for the task.
    pub fn scheduler_scope(&self) -> Result<String> {
        Ok(CgroupMode::V2.cgroup_id(&self.alloc_id, &self.task)?)
    }

    /// Scope created by the container runtime for the container.
    pub fn runtime_scope(&self) -> String {
        format!("docker-{}.scope", self.container_id)
    }
}

/// Keeps container cpusets in line with the scheduler's assignment.
///
/// Only runs on hosts using the unified cgroup hierarchy.
pub struct CpusetFixer {
    root: PathBuf,
    parent: String,
    interval: Duration,
    tasks: Arc<dyn TaskSource>,
    started: AtomicBool,
}

impl CpusetFixer {
    /// Create a fixer for the tasks in `tasks`.
    pub fn new(config: &DriverConfig, tasks: Arc<dyn TaskSource>) -> Self {
        Self {
            root: PathBuf::from(V2_CGROUP_ROOT),
            parent: CgroupMode::V2.parent(&config.cgroup_parent),
            interval: config.cpuset_reconcile_interval,
            tasks,
            started: AtomicBool::new(false),
        }
    }

    /// Use a different cgroup mount point.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    /// The directory holding task scopes.
    pub fn parent_dir(&self) -> PathBuf {
        self.root.join(&self.parent)
    }

    /// Start the background loop.
    ///
    /// Only the first call has any effect, and the loop is only spawned on a
    /// unified hierarchy. Returns the loop's handle if it was spawned.
    pub fn start(self: &Arc<Self>, shutdown: watch::Receiver<bool>) -> Option<JoinHandle<()>> {
        if self.started.swap(true, Ordering::SeqCst) {
            return None;
        }
        if !fleet_cgutil::use_v2() {
            debug!("Cgroup v1 in use, cpuset reconciliation disabled");
            return None;
        }

        let fixer = Arc::clone(self);
        Some(tokio::spawn(async move { fixer.run(shutdown).await }))
    }

    /// Run the reconciliation loop until shutdown.
    ///
    /// The first pass runs immediately; later passes follow `interval` after
    /// the previous one finished.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            parent = %self.parent_dir().display(),
            interval_ms = u64::try_from(self.interval.as_millis()).unwrap_or(u64::MAX),
            "Starting cpuset reconciliation"
        );

        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                _ = interval.tick() => {
                    self.scan().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Cpuset reconciliation shutting down");
    }

    /// Reconcile every tracked task once. Returns the number of tasks fixed.
    pub async fn scan(&self) -> usize {
        let coordinates: HashSet<Coordinate> = self.tasks.tracked_tasks().await;

        let mut fixed = 0;
        for c in &coordinates {
            match self.fix(c) {
                Ok(()) => fixed += 1,
                Err(e) => trace!(
                    container_id = %c.container_id,
                    alloc_id = %c.alloc_id,
                    task = %c.task,
                    error = %e,
                    "Failed to copy cpuset"
                ),
            }
        }
        fixed
    }

    fn fix(&self, c: &Coordinate) -> Result<()> {
        let parent = self.parent_dir();
        let source = parent.join(c.scheduler_scope()?);
        let destination = parent.join(c.runtime_scope());
        copy_cpuset(&source, &destination)?;
        Ok(())
    }
}
