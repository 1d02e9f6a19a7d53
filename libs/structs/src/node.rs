//! Client nodes.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Node readiness as reported by the health checker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    /// Registered but not yet ready for work.
    Init,

    /// Ready to accept allocations.
    Ready,

    /// Missed its heartbeats.
    Down,
}

impl NodeStatus {
    /// Returns true if allocations on a node in this status must move away.
    pub fn should_drain(&self) -> bool {
        match self {
            Self::Init | Self::Ready => false,
            Self::Down => true,
        }
    }

    /// Returns the canonical string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Ready => "ready",
            Self::Down => "down",
        }
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A client machine that runs allocations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Unique node identifier.
    pub id: String,

    /// Datacenter the node belongs to.
    pub datacenter: String,

    /// Human-readable name.
    #[serde(default)]
    pub name: String,

    /// Readiness status.
    pub status: NodeStatus,

    /// Set when the operator asked for the node to be emptied.
    #[serde(default)]
    pub drain: bool,
}

impl Node {
    /// Returns true if the node can accept new allocations.
    pub fn is_eligible(&self) -> bool {
        self.status == NodeStatus::Ready && !self.drain
    }
}
