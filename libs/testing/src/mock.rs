//! Fixture builders.
//!
//! Ids are random so fixtures never collide; everything else is fixed.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use fleet_reconcile::alloc_name;
use fleet_structs::{
    AllocClientStatus, AllocDesiredStatus, AllocMetric, Allocation, EvalStatus, Evaluation, Job,
    JobType, NetworkResource, Node, NodeStatus, Resources, Task, TaskConfig, TaskGroup,
    UpdateStrategy, EVAL_TRIGGER_JOB_REGISTER,
};
use uuid::Uuid;

/// Address recorded on fixture allocations' networks.
pub const ALLOC_IP: &str = "10.0.0.5";

fn id() -> String {
    Uuid::new_v4().to_string()
}

/// A ready node in `dc1`.
pub fn node() -> Node {
    let id = id();
    Node {
        name: format!("node-{}", &id[..8]),
        id,
        datacenter: "dc1".to_string(),
        status: NodeStatus::Ready,
        drain: false,
    }
}

/// The single task every fixture job runs.
pub fn task() -> Task {
    let config: TaskConfig = [("command", "/bin/date")].into_iter().collect();
    Task {
        name: "web".to_string(),
        driver: "exec".to_string(),
        config,
        resources: Resources {
            cpu: 500,
            memory_mb: 256,
            networks: vec![NetworkResource {
                mbits: 50,
                dynamic_ports: vec!["http".to_string()],
                ..Default::default()
            }],
            ..Default::default()
        },
    }
}

/// A service job with one task group of ten instances in `dc1`.
pub fn job() -> Job {
    Job {
        id: id(),
        name: "my-job".to_string(),
        job_type: JobType::Service,
        priority: 50,
        datacenters: vec!["dc1".to_string()],
        task_groups: vec![TaskGroup {
            name: "web".to_string(),
            count: 10,
            tasks: vec![task()],
        }],
        update: UpdateStrategy::default(),
        modify_index: 1,
    }
}

/// A system job with one task group in `dc1`.
pub fn system_job() -> Job {
    let mut job = job();
    job.job_type = JobType::System;
    job.task_groups[0].count = 1;
    job
}

/// A running allocation of `job`'s first task group.
///
/// Its per-task resources match the task ask, with [`ALLOC_IP`] and one
/// reserved port on every network.
pub fn alloc(job: &Arc<Job>, node: &Node, name: impl Into<String>) -> Allocation {
    let tg = &job.task_groups[0];

    let mut resources = Resources::default();
    let mut task_resources = BTreeMap::new();
    for task in &tg.tasks {
        let mut r = task.resources.clone();
        for network in &mut r.networks {
            network.ip = ALLOC_IP.to_string();
            network.reserved_ports = vec![5000];
        }
        resources.add(&r);
        task_resources.insert(task.name.clone(), r);
    }

    Allocation {
        id: id(),
        eval_id: id(),
        name: name.into(),
        node_id: node.id.clone(),
        job_id: job.id.clone(),
        job: Arc::clone(job),
        task_group: tg.name.clone(),
        resources,
        task_resources,
        metrics: AllocMetric::default(),
        desired_status: AllocDesiredStatus::Run,
        desired_description: String::new(),
        client_status: AllocClientStatus::Running,
        client_description: String::new(),
    }
}

/// Allocations `0..count` of `job`'s first task group, all on `node`.
pub fn allocs(job: &Arc<Job>, node: &Node, count: usize) -> Vec<Allocation> {
    let tg = &job.task_groups[0].name;
    (0..count)
        .map(|i| alloc(job, node, alloc_name(&job.name, tg, i)))
        .collect()
}

/// A pending job-register evaluation for `job`.
pub fn eval(job: &Job) -> Evaluation {
    Evaluation {
        id: id(),
        priority: job.priority,
        job_type: job.job_type,
        triggered_by: EVAL_TRIGGER_JOB_REGISTER.to_string(),
        job_id: job.id.clone(),
        job_modify_index: job.modify_index,
        status: EvalStatus::Pending,
        status_description: String::new(),
        wait: Duration::ZERO,
        next_eval: None,
        previous_eval: None,
    }
}
