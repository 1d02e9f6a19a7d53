//! Resource requests and assignments.

use serde::{Deserialize, Serialize};

/// Compute, memory, disk and network resources.
///
/// Used both for what a task asks for and for what the scheduler assigned to
/// it on a specific node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resources {
    /// CPU in MHz.
    pub cpu: u32,

    /// Memory in MB.
    pub memory_mb: u32,

    /// Disk in MB.
    pub disk_mb: u32,

    /// Disk IOPS.
    pub iops: u32,

    /// Network resources, one entry per requested network.
    #[serde(default)]
    pub networks: Vec<NetworkResource>,
}

impl Resources {
    /// Accumulate another resource set into this one.
    pub fn add(&mut self, other: &Resources) {
        self.cpu = self.cpu.saturating_add(other.cpu);
        self.memory_mb = self.memory_mb.saturating_add(other.memory_mb);
        self.disk_mb = self.disk_mb.saturating_add(other.disk_mb);
        self.iops = self.iops.saturating_add(other.iops);
        self.networks.extend(other.networks.iter().cloned());
    }
}

/// A network request or assignment.
///
/// When requested, `dynamic_ports` holds port labels; once assigned,
/// `reserved_ports` and `ip` describe the concrete binding on the node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkResource {
    /// Name of the host device.
    #[serde(default)]
    pub device: String,

    /// CIDR block of addresses.
    #[serde(default)]
    pub cidr: String,

    /// Assigned IP address.
    #[serde(default)]
    pub ip: String,

    /// Throughput in megabits.
    pub mbits: u32,

    /// Statically reserved ports.
    #[serde(default)]
    pub reserved_ports: Vec<u16>,

    /// Labels of dynamically assigned ports.
    #[serde(default)]
    pub dynamic_ports: Vec<String>,
}
