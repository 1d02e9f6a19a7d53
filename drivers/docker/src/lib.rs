//! Container runtime driver support.
//!
//! The container runtime places every container in a cgroup of its own
//! choosing, outside the scope the scheduler created for the task. CPU
//! pinning is recorded on the scheduler's scope, so a background loop keeps
//! copying `cpuset.cpus` across for every tracked task.
//!
//! - [`TaskStore`]: running tasks known to the driver
//! - [`CpusetFixer`]: the periodic cpuset copy
//! - [`DriverConfig`]: driver settings

mod config;
mod cpuset;
mod error;
mod tasks;

pub use config::DriverConfig;
pub use cpuset::{Coordinate, CpusetFixer};
pub use error::{DriverError, Result};
pub use tasks::{TaskHandle, TaskSource, TaskStore};

/// Default interval between cpuset reconciliation passes.
pub const CPUSET_RECONCILE_INTERVAL: std::time::Duration = std::time::Duration::from_secs(1);
