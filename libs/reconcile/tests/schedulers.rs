//! End-to-end evaluation processing against an in-memory cluster.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use fleet_reconcile::{
    GenericScheduler, ReconcileError, Scheduler, SchedulerConfig, SystemScheduler,
    ALLOC_MIGRATING, ALLOC_NOT_NEEDED, ALLOC_PLACEMENT_FAILED, ALLOC_UPDATING,
};
use fleet_structs::{
    AllocDesiredStatus, Allocation, EvalStatus, Job, Node, NodeStatus, Plan,
    EVAL_TRIGGER_NODE_UPDATE, EVAL_TRIGGER_ROLLING_UPDATE,
};
use fleet_testing::{init_tracing, mock, CommitMode, FirstFitStack, Harness, MemState};

fn service(
    state: &MemState,
    harness: Harness,
    stack: FirstFitStack,
) -> GenericScheduler<Harness, FirstFitStack> {
    GenericScheduler::new_service(state.snapshot(), harness, stack, SchedulerConfig::default())
}

fn placed(plan: &Plan) -> Vec<&Allocation> {
    plan.node_allocation.values().flatten().collect()
}

fn stopped(plan: &Plan) -> Vec<&Allocation> {
    plan.node_update.values().flatten().collect()
}

/// A cluster with one ready node running `count` allocations of `job`.
fn running(job: &Job, count: usize) -> (MemState, Node, Vec<Allocation>) {
    let node = mock::node();
    let allocs = mock::allocs(&Arc::new(job.clone()), &node, count);
    let mut state = MemState::new();
    state.upsert_node(node.clone()).upsert_allocs(allocs.clone());
    (state, node, allocs)
}

#[test]
fn test_service_job_register() {
    init_tracing();

    let mut state = MemState::new();
    let nodes: Vec<_> = (0..3).map(|_| mock::node()).collect();
    for node in &nodes {
        state.upsert_node(node.clone());
    }
    let job = mock::job();
    state.upsert_job(job.clone());

    let eval = mock::eval(&job);
    let mut sched = service(&state, Harness::new(), FirstFitStack::new());
    sched.process(&eval).unwrap();

    let harness = sched.planner();
    assert_eq!(harness.plans.len(), 1);
    let plan = &harness.plans[0];
    assert_eq!(plan.update_count(), 0);
    assert_eq!(plan.alloc_count(), 10);

    let names: BTreeSet<_> = placed(plan).iter().map(|a| a.name.clone()).collect();
    let expected: BTreeSet<_> = (0..10).map(|i| format!("my-job.web[{i}]")).collect();
    assert_eq!(names, expected);

    let node_ids: BTreeSet<_> = nodes.iter().map(|n| n.id.as_str()).collect();
    assert!(placed(plan)
        .iter()
        .all(|a| node_ids.contains(a.node_id.as_str()) && a.eval_id == eval.id));

    let last = harness.last_eval().unwrap();
    assert_eq!(last.id, eval.id);
    assert_eq!(last.status, EvalStatus::Complete);
    assert!(last.next_eval.is_none());
    assert_eq!(sched.failed_placements(), 0);
}

#[test]
fn test_service_job_unchanged_is_noop() {
    let job = mock::job();
    let (mut state, _, _) = running(&job, 10);
    state.upsert_job(job.clone());

    let eval = mock::eval(&job);
    let mut sched = service(&state, Harness::new(), FirstFitStack::new());
    sched.process(&eval).unwrap();

    assert!(sched.planner().plans.is_empty());
    assert_eq!(
        sched.planner().last_eval().unwrap().status,
        EvalStatus::Complete
    );
}

#[test]
fn test_service_job_modify_in_place() {
    let job = mock::job();
    let (mut state, node, allocs) = running(&job, 10);

    let mut updated = job.clone();
    updated.modify_index += 1;
    updated.task_groups[0].tasks[0].resources.memory_mb = 512;
    state.upsert_job(updated.clone());

    let eval = mock::eval(&updated);
    let mut sched = service(&state, Harness::new(), FirstFitStack::new());
    sched.process(&eval).unwrap();

    let plan = &sched.planner().plans[0];
    assert_eq!(plan.update_count(), 0);
    assert_eq!(plan.alloc_count(), 10);

    let ids: BTreeSet<_> = allocs.iter().map(|a| a.id.as_str()).collect();
    for alloc in placed(plan) {
        assert!(ids.contains(alloc.id.as_str()));
        assert_eq!(alloc.node_id, node.id);
        assert_eq!(alloc.resources.memory_mb, 512);
        assert_eq!(alloc.job.modify_index, updated.modify_index);
    }
}

#[test]
fn test_service_job_destructive_update() {
    let job = mock::job();
    let (mut state, _, _) = running(&job, 10);

    let mut updated = job.clone();
    updated.modify_index += 1;
    updated.task_groups[0].tasks[0].driver = "docker".to_string();
    state.upsert_job(updated.clone());

    let eval = mock::eval(&updated);
    let mut sched = service(&state, Harness::new(), FirstFitStack::new());
    sched.process(&eval).unwrap();

    let harness = sched.planner();
    let plan = &harness.plans[0];
    assert_eq!(plan.update_count(), 10);
    assert_eq!(plan.alloc_count(), 10);
    assert!(stopped(plan).iter().all(|a| a.desired_status
        == AllocDesiredStatus::Stop
        && a.desired_description == ALLOC_UPDATING));
    assert!(harness.created_evals.is_empty());
}

#[test]
fn test_service_job_rolling_update() {
    let mut job = mock::job();
    job.update.max_parallel = 3;
    job.update.stagger = Duration::from_secs(30);
    let (mut state, _, _) = running(&job, 10);

    let mut updated = job.clone();
    updated.modify_index += 1;
    updated.task_groups[0].tasks[0]
        .config
        .insert("command", "/bin/other");
    state.upsert_job(updated.clone());

    let eval = mock::eval(&updated);
    let mut sched = service(&state, Harness::new(), FirstFitStack::new());
    sched.process(&eval).unwrap();

    let harness = sched.planner();
    let plan = &harness.plans[0];
    assert_eq!(plan.update_count(), 3);
    assert_eq!(plan.alloc_count(), 3);

    assert_eq!(harness.created_evals.len(), 1);
    let next = &harness.created_evals[0];
    assert_eq!(next.triggered_by, EVAL_TRIGGER_ROLLING_UPDATE);
    assert_eq!(next.wait, Duration::from_secs(30));
    assert_eq!(next.previous_eval.as_deref(), Some(eval.id.as_str()));
    assert_eq!(next.job_id, updated.id);

    let last = harness.last_eval().unwrap();
    assert_eq!(last.status, EvalStatus::Complete);
    assert_eq!(last.next_eval.as_deref(), Some(next.id.as_str()));
    assert_eq!(sched.next_eval(), Some(next));
}

#[test]
fn test_rolling_follow_up_per_evaluation() {
    let mut job = mock::job();
    job.update.max_parallel = 3;
    let (mut state, _, _) = running(&job, 10);

    let mut updated = job.clone();
    updated.modify_index += 1;
    updated.task_groups[0].tasks[0]
        .config
        .insert("command", "/bin/other");
    state.upsert_job(updated.clone());

    let first = mock::eval(&updated);
    let second = mock::eval(&updated);
    let mut sched = service(&state, Harness::new(), FirstFitStack::new());
    sched.process(&first).unwrap();
    sched.process(&second).unwrap();

    let harness = sched.planner();
    assert_eq!(harness.created_evals.len(), 2);
    let (next_first, next_second) = (&harness.created_evals[0], &harness.created_evals[1]);
    assert_ne!(next_first.id, next_second.id);
    assert_eq!(next_second.previous_eval.as_deref(), Some(second.id.as_str()));

    assert_eq!(harness.evals.len(), 2);
    assert_eq!(harness.evals[0].next_eval.as_deref(), Some(next_first.id.as_str()));
    assert_eq!(harness.evals[1].next_eval.as_deref(), Some(next_second.id.as_str()));
    assert_eq!(sched.next_eval(), Some(next_second));
}

#[test]
fn test_service_job_scale_down() {
    let job = mock::job();
    let (mut state, _, _) = running(&job, 10);

    let mut updated = job.clone();
    updated.modify_index += 1;
    updated.task_groups[0].count = 5;
    state.upsert_job(updated.clone());

    let eval = mock::eval(&updated);
    let mut sched = service(&state, Harness::new(), FirstFitStack::new());
    sched.process(&eval).unwrap();

    let plan = &sched.planner().plans[0];
    assert_eq!(plan.update_count(), 5);
    assert_eq!(plan.alloc_count(), 5);
    assert!(stopped(plan)
        .iter()
        .all(|a| a.desired_description == ALLOC_NOT_NEEDED));

    let kept: BTreeSet<_> = placed(plan).iter().map(|a| a.name.clone()).collect();
    let expected: BTreeSet<_> = (0..5).map(|i| format!("my-job.web[{i}]")).collect();
    assert_eq!(kept, expected);
}

#[test]
fn test_node_down_migrates_allocs() {
    let job = mock::job();
    let (mut state, mut node, _) = running(&job, 10);
    node.status = NodeStatus::Down;
    let spare = mock::node();
    state
        .upsert_node(node.clone())
        .upsert_node(spare.clone())
        .upsert_job(job.clone());

    let mut eval = mock::eval(&job);
    eval.triggered_by = EVAL_TRIGGER_NODE_UPDATE.to_string();
    let mut sched = service(&state, Harness::new(), FirstFitStack::new());
    sched.process(&eval).unwrap();

    let plan = &sched.planner().plans[0];
    assert_eq!(plan.node_update[&node.id].len(), 10);
    assert!(stopped(plan)
        .iter()
        .all(|a| a.desired_description == ALLOC_MIGRATING));
    assert_eq!(plan.node_allocation[&spare.id].len(), 10);
    assert!(!plan.node_allocation.contains_key(&node.id));
}

#[test]
fn test_job_deregister_stops_all() {
    let job = mock::job();
    let (state, _, allocs) = running(&job, 4);

    let eval = mock::eval(&job);
    let mut sched = service(&state, Harness::new(), FirstFitStack::new());
    sched.process(&eval).unwrap();

    let plan = &sched.planner().plans[0];
    assert_eq!(plan.update_count(), allocs.len());
    assert_eq!(plan.alloc_count(), 0);
    assert!(stopped(plan)
        .iter()
        .all(|a| a.desired_status == AllocDesiredStatus::Stop
            && a.desired_description == ALLOC_NOT_NEEDED));
    assert!(sched.next_eval().is_none());
}

#[test]
fn test_terminal_allocs_are_not_stopped_again() {
    let job = mock::job();
    let node = mock::node();
    let mut allocs = mock::allocs(&Arc::new(job.clone()), &node, 2);
    allocs[0].desired_status = AllocDesiredStatus::Stop;

    let mut state = MemState::new();
    state.upsert_node(node).upsert_allocs(allocs);

    let eval = mock::eval(&job);
    let mut sched = service(&state, Harness::new(), FirstFitStack::new());
    sched.process(&eval).unwrap();

    assert_eq!(sched.planner().plans[0].update_count(), 1);
}

#[test]
fn test_partial_commit_is_retried() {
    let mut state = MemState::new();
    state.upsert_node(mock::node());
    let job = mock::job();
    state.upsert_job(job.clone());

    let eval = mock::eval(&job);
    let harness = Harness::with_mode(CommitMode::PartialFor(1));
    let mut sched = service(&state, harness, FirstFitStack::new());
    sched.process(&eval).unwrap();

    let harness = sched.planner();
    assert_eq!(harness.plans.len(), 2);
    assert_eq!(harness.plans[1].alloc_count(), 10);
    assert_eq!(harness.last_eval().unwrap().status, EvalStatus::Complete);
}

#[test]
fn test_refreshed_state_is_used_for_retry() {
    let node = mock::node();
    let job = mock::job();
    let mut state = MemState::new();
    state.upsert_node(node.clone()).upsert_job(job.clone());

    // Another scheduler already placed everything
    let mut refreshed = state.clone();
    refreshed.upsert_allocs(mock::allocs(&Arc::new(job.clone()), &node, 10));

    let eval = mock::eval(&job);
    let harness = Harness::with_mode(CommitMode::RefreshFor(1, refreshed.snapshot()));
    let mut sched = service(&state, harness, FirstFitStack::new());
    sched.process(&eval).unwrap();

    let harness = sched.planner();
    assert_eq!(harness.plans.len(), 1);
    assert_eq!(harness.last_eval().unwrap().status, EvalStatus::Complete);
}

#[test]
fn test_max_attempts_fails_eval() {
    let mut state = MemState::new();
    state.upsert_node(mock::node());
    let job = mock::job();
    state.upsert_job(job.clone());

    let eval = mock::eval(&job);
    let harness = Harness::with_mode(CommitMode::PartialFor(usize::MAX));
    let mut sched = GenericScheduler::new_batch(
        state.snapshot(),
        harness,
        FirstFitStack::new(),
        SchedulerConfig::default(),
    );
    sched.process(&eval).unwrap();

    let harness = sched.planner();
    assert_eq!(harness.plans.len(), 2);
    let last = harness.last_eval().unwrap();
    assert_eq!(last.status, EvalStatus::Failed);
    assert_eq!(last.status_description, "maximum attempts reached (2)");
}

#[test]
fn test_unsupported_trigger_fails_eval() {
    let job = mock::job();
    let mut eval = mock::eval(&job);
    eval.triggered_by = "periodic-job".to_string();

    let mut sched = service(&MemState::new(), Harness::new(), FirstFitStack::new());
    sched.process(&eval).unwrap();

    let harness = sched.planner();
    assert!(harness.plans.is_empty());
    let last = harness.last_eval().unwrap();
    assert_eq!(last.status, EvalStatus::Failed);
    assert_eq!(
        last.status_description,
        "scheduler cannot handle 'periodic-job' evaluation reason"
    );
}

#[test]
fn test_planner_rejection_is_propagated() {
    let mut state = MemState::new();
    state.upsert_node(mock::node());
    let job = mock::job();
    state.upsert_job(job.clone());

    let eval = mock::eval(&job);
    let harness = Harness::with_mode(CommitMode::Reject);
    let mut sched = service(&state, harness, FirstFitStack::new());
    let err = sched.process(&eval).unwrap_err();

    assert!(matches!(err, ReconcileError::Planner(_)));
    assert!(sched.planner().evals.is_empty());
}

#[test]
fn test_no_feasible_node_records_failures() {
    let mut state = MemState::new();
    state.upsert_node(mock::node());
    let job = mock::job();
    state.upsert_job(job.clone());

    let eval = mock::eval(&job);
    let mut sched = service(&state, Harness::new(), FirstFitStack::infeasible());
    sched.process(&eval).unwrap();

    let plan = &sched.planner().plans[0];
    assert_eq!(plan.alloc_count(), 0);
    assert_eq!(plan.failed_allocs.len(), 10);
    assert!(plan.failed_allocs.iter().all(|a| a.desired_status
        == AllocDesiredStatus::Failed
        && a.desired_description == ALLOC_PLACEMENT_FAILED));
    assert_eq!(sched.failed_placements(), 10);
    assert_eq!(
        sched.planner().last_eval().unwrap().status,
        EvalStatus::Complete
    );
}

#[test]
fn test_failed_placements_count_final_attempt_only() {
    let mut state = MemState::new();
    state.upsert_node(mock::node());
    let job = mock::job();
    state.upsert_job(job.clone());

    let eval = mock::eval(&job);
    let harness = Harness::with_mode(CommitMode::PartialFor(1));
    let mut sched = service(&state, harness, FirstFitStack::with_cpu_capacity(2000));
    sched.process(&eval).unwrap();

    let harness = sched.planner();
    assert_eq!(harness.plans.len(), 2);
    let last = harness.last_plan().unwrap();
    assert_eq!(last.alloc_count(), 4);
    assert_eq!(last.failed_allocs.len(), 6);
    assert_eq!(sched.failed_placements(), 6);
    assert_eq!(harness.last_eval().unwrap().status, EvalStatus::Complete);
}

#[test]
fn test_system_job_one_per_ready_node() {
    init_tracing();

    let ready: Vec<_> = (0..3).map(|_| mock::node()).collect();
    let mut down = mock::node();
    down.status = NodeStatus::Down;

    let mut state = MemState::new();
    for node in ready.iter().chain([&down]) {
        state.upsert_node(node.clone());
    }
    let job = mock::system_job();
    state.upsert_job(job.clone());

    let eval = mock::eval(&job);
    let mut sched = SystemScheduler::new(
        state.snapshot(),
        Harness::new(),
        FirstFitStack::new(),
        SchedulerConfig::default(),
    );
    sched.process(&eval).unwrap();

    let plan = &sched.planner().plans[0];
    assert_eq!(plan.alloc_count(), 3);
    for node in &ready {
        let allocs = &plan.node_allocation[&node.id];
        assert_eq!(allocs.len(), 1);
        assert_eq!(allocs[0].name, format!("my-job.web[{}]", node.id));
    }
    assert!(!plan.node_allocation.contains_key(&down.id));
}

#[test]
fn test_system_job_stops_alloc_on_lost_node() {
    let job = mock::system_job();
    let shared = Arc::new(job.clone());
    let keep = mock::node();
    let mut lost = mock::node();
    lost.status = NodeStatus::Down;

    let allocs = vec![
        mock::alloc(&shared, &keep, format!("my-job.web[{}]", keep.id)),
        mock::alloc(&shared, &lost, format!("my-job.web[{}]", lost.id)),
    ];
    let mut state = MemState::new();
    state
        .upsert_node(keep.clone())
        .upsert_node(lost.clone())
        .upsert_job(job.clone())
        .upsert_allocs(allocs);

    let mut eval = mock::eval(&job);
    eval.triggered_by = EVAL_TRIGGER_NODE_UPDATE.to_string();
    let mut sched = SystemScheduler::new(
        state.snapshot(),
        Harness::new(),
        FirstFitStack::new(),
        SchedulerConfig::default(),
    );
    sched.process(&eval).unwrap();

    let plan = &sched.planner().plans[0];
    assert_eq!(plan.alloc_count(), 0);
    assert_eq!(plan.update_count(), 1);
    assert_eq!(plan.node_update[&lost.id][0].desired_description, ALLOC_NOT_NEEDED);
}

#[test]
fn test_system_job_no_room_on_node() {
    let mut state = MemState::new();
    for _ in 0..2 {
        state.upsert_node(mock::node());
    }
    let job = mock::system_job();
    state.upsert_job(job.clone());

    let eval = mock::eval(&job);
    let mut sched = SystemScheduler::new(
        state.snapshot(),
        Harness::new(),
        FirstFitStack::with_cpu_capacity(400),
        SchedulerConfig::default(),
    );
    sched.process(&eval).unwrap();

    assert_eq!(sched.failed_placements(), 2);
    assert_eq!(sched.planner().plans[0].failed_allocs.len(), 2);
}
