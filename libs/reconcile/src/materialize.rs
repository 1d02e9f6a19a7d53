//! Expansion of a job's task groups into named desired instances.
//!
//! Instance names have the form `{job}.{task_group}[{discriminator}]`, where
//! the discriminator is the zero-based index for count-expanded groups and the
//! node id for system jobs.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use fleet_structs::{Job, Node, TaskGroup};
use regex::Regex;

use crate::error::{ReconcileError, Result};

/// Desired instances keyed by name.
pub type DesiredGroups<'a> = BTreeMap<String, &'a TaskGroup>;

fn task_group_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r".+\..+\[(.*)\]").expect("task group id pattern is valid"))
}

/// Format a desired instance name.
pub fn alloc_name(job: &str, task_group: &str, discriminator: impl std::fmt::Display) -> String {
    format!("{job}.{task_group}[{discriminator}]")
}

/// Expand every task group by its count.
pub fn materialize_task_groups(job: &Job) -> DesiredGroups<'_> {
    let mut out = BTreeMap::new();
    for tg in &job.task_groups {
        for i in 0..tg.count {
            out.insert(alloc_name(&job.name, &tg.name, i), tg);
        }
    }
    out
}

/// Expand every task group once per node.
pub fn materialize_system_task_groups<'a>(job: &'a Job, nodes: &[Node]) -> DesiredGroups<'a> {
    let mut out = BTreeMap::new();
    for tg in &job.task_groups {
        for node in nodes {
            out.insert(alloc_name(&job.name, &tg.name, &node.id), tg);
        }
    }
    out
}

/// Extract the discriminator from a desired instance name.
///
/// For system jobs this is the node id, otherwise the instance index.
pub fn extract_task_group_id(name: &str) -> Result<&str> {
    task_group_id_pattern()
        .captures(name)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .ok_or_else(|| ReconcileError::InvalidName {
            name: name.to_string(),
        })
}
