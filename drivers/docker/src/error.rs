use fleet_cgutil::CgroupError;
use thiserror::Error;

/// Errors from driver operations.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("cgroup error: {0}")]
    Cgroup(#[from] CgroupError),
}

/// Result type for driver operations.
pub type Result<T> = std::result::Result<T, DriverError>;
