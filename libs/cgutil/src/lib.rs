//! Control group helpers for task drivers.
//!
//! Tasks run inside a cgroup named after their allocation and task. The
//! naming and default parent depend on whether the host mounts the unified
//! (v2) hierarchy or the legacy (v1) per-controller hierarchies.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use thiserror::Error;
use tracing::debug;

/// Errors from cgroup operations.
#[derive(Debug, Error)]
pub enum CgroupError {
    #[error("cgroup id requires an allocation id and a task name")]
    EmptyId,

    #[error("{op} {}: {source}", path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Result type for cgroup operations.
pub type Result<T> = std::result::Result<T, CgroupError>;

/// Which cgroup hierarchy the host uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CgroupMode {
    /// Per-controller hierarchies.
    V1,

    /// Single unified hierarchy.
    V2,
}

impl CgroupMode {
    /// Probe the host. The result is cached for the life of the process.
    pub fn detect() -> Self {
        static MODE: OnceLock<CgroupMode> = OnceLock::new();
        *MODE.get_or_init(|| {
            let mode = if is_unified(Path::new(V2_CGROUP_ROOT)) {
                CgroupMode::V2
            } else {
                CgroupMode::V1
            };
            debug!(?mode, "Detected cgroup mode");
            mode
        })
    }

    /// The parent cgroup to use, falling back to this mode's default.
    pub fn parent(self, parent: &str) -> String {
        if !parent.is_empty() {
            return parent.to_string();
        }
        match self {
            Self::V1 => DEFAULT_CGROUP_PARENT_V1.to_string(),
            Self::V2 => DEFAULT_CGROUP_PARENT_V2.to_string(),
        }
    }

    /// The cgroup name of a task in an allocation.
    pub fn cgroup_id(self, alloc_id: &str, task: &str) -> Result<String> {
        if alloc_id.is_empty() || task.is_empty() {
            return Err(CgroupError::EmptyId);
        }
        Ok(match self {
            Self::V1 => format!("{task}.{alloc_id}"),
            Self::V2 => format!("{alloc_id}.{task}.scope"),
        })
    }
}

/// Returns true if the host uses the unified hierarchy.
pub fn use_v2() -> bool {
    CgroupMode::detect() == CgroupMode::V2
}

/// The parent cgroup to use on this host.
pub fn get_cgroup_parent(parent: &str) -> String {
    CgroupMode::detect().parent(parent)
}

/// The cgroup name of a task on this host.
pub fn cgroup_id(alloc_id: &str, task: &str) -> Result<String> {
    CgroupMode::detect().cgroup_id(alloc_id, task)
}

/// Split a v2 cgroup path into its parent slice and the remaining path.
///
/// `/sys/fs/cgroup/fleet.slice/a.web.scope` splits into `fleet.slice` and
/// `/a.web.scope`. The remainder always starts with `/`.
pub fn split_path(path: &str) -> (String, String) {
    let p = path.strip_prefix(V2_CGROUP_ROOT).unwrap_or(path);
    let p = p.strip_prefix('/').unwrap_or(p);
    let p = p.strip_suffix('/').unwrap_or(p);

    let mut parts = p.split('/');
    let parent = parts.next().unwrap_or_default().to_string();
    let rest: Vec<&str> = parts.filter(|s| !s.is_empty()).collect();
    (parent, format!("/{}", rest.join("/")))
}

/// Copy `cpuset.cpus` from the `source` cgroup into the `destination` cgroup.
///
/// The destination interface file must already exist.
pub fn copy_cpuset(source: &Path, destination: &Path) -> Result<()> {
    let src = source.join(CPUSET_CPUS);
    let cpus = fs::read_to_string(&src).map_err(|source| CgroupError::Io {
        op: "read",
        path: src.clone(),
        source,
    })?;

    let dst = destination.join(CPUSET_CPUS);
    let write = || -> io::Result<()> {
        let mut file = OpenOptions::new().write(true).truncate(true).open(&dst)?;
        file.write_all(cpus.as_bytes())
    };
    write().map_err(|source| CgroupError::Io {
        op: "write",
        path: dst,
        source,
    })
}

#[cfg(target_os = "linux")]
fn is_unified(root: &Path) -> bool {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let Ok(path) = CString::new(root.as_os_str().as_bytes()) else {
        return false;
    };

    let mut buf: libc::statfs = unsafe { std::mem::zeroed() };
    let rc = unsafe { libc::statfs(path.as_ptr(), &mut buf) };
    if rc != 0 {
        return false;
    }

    #[allow(clippy::unnecessary_cast)]
    let magic = buf.f_type as u64;
    magic == CGROUP2_SUPER_MAGIC
}

#[cfg(not(target_os = "linux"))]
fn is_unified(_root: &Path) -> bool {
    false
}

/// Mount point of the unified hierarchy.
pub const V2_CGROUP_ROOT: &str = "/sys/fs/cgroup";

/// Default parent cgroup under the unified hierarchy.
pub const DEFAULT_CGROUP_PARENT_V2: &str = "fleet.slice";

/// Default parent cgroup under the legacy hierarchies.
pub const DEFAULT_CGROUP_PARENT_V1: &str = "/fleet";

/// Interface file holding the CPUs a cgroup may run on.
pub const CPUSET_CPUS: &str = "cpuset.cpus";

/// Filesystem magic of cgroup2fs.
const CGROUP2_SUPER_MAGIC: u64 = 0x6367_7270;
