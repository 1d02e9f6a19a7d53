//! Partitioning of existing and desired allocations.
//!
//! Every name in (existing allocations ∪ desired instances) lands in exactly
//! one of five buckets:
//!
//! - **place**: desired, no existing allocation
//! - **update**: existing, placed against an older job version
//! - **migrate**: existing, on a tainted node
//! - **stop**: existing, no longer desired
//! - **ignore**: existing and up to date

use std::collections::HashSet;
use std::fmt;

use fleet_structs::{Allocation, Job, TaskGroup};

use crate::materialize::DesiredGroups;
use crate::taint::TaintedNodes;

/// Correlates a name with its desired task group and existing allocation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AllocTuple<'a> {
    /// Allocation name.
    pub name: &'a str,

    /// Desired task group; `None` when the allocation is no longer required.
    pub task_group: Option<&'a TaskGroup>,

    /// Existing allocation; `None` for a pure placement.
    pub alloc: Option<&'a Allocation>,
}

/// The five-way partition computed for one pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiffResult<'a> {
    pub place: Vec<AllocTuple<'a>>,
    pub update: Vec<AllocTuple<'a>>,
    pub migrate: Vec<AllocTuple<'a>>,
    pub stop: Vec<AllocTuple<'a>>,
    pub ignore: Vec<AllocTuple<'a>>,
}

impl fmt::Display for DiffResult<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "allocs: (place {}) (update {}) (migrate {}) (stop {}) (ignore {})",
            self.place.len(),
            self.update.len(),
            self.migrate.len(),
            self.stop.len(),
            self.ignore.len()
        )
    }
}

/// Diff the desired instances against the existing allocations.
///
/// Precedence for an existing allocation is stop, then migrate, then update,
/// then ignore. Any change to the job marks every live allocation for update;
/// a later stage decides whether the update can happen in place.
pub fn diff_allocs<'a>(
    job: &Job,
    tainted: &TaintedNodes,
    required: &'a DesiredGroups<'a>,
    allocs: &'a [Allocation],
) -> DiffResult<'a> {
    let mut result = DiffResult::default();
    let mut existing = HashSet::with_capacity(allocs.len());

    for exist in allocs {
        let name = exist.name.as_str();
        existing.insert(name);

        let Some(tg) = required.get(name).copied() else {
            result.stop.push(AllocTuple {
                name,
                task_group: None,
                alloc: Some(exist),
            });
            continue;
        };

        let tuple = AllocTuple {
            name,
            task_group: Some(tg),
            alloc: Some(exist),
        };

        if tainted.get(&exist.node_id).copied().unwrap_or(false) {
            result.migrate.push(tuple);
        } else if job.modify_index != exist.job.modify_index {
            result.update.push(tuple);
        } else {
            result.ignore.push(tuple);
        }
    }

    for (name, tg) in required {
        if !existing.contains(name.as_str()) {
            result.place.push(AllocTuple {
                name: name.as_str(),
                task_group: Some(*tg),
                alloc: None,
            });
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, HashMap};
    use std::sync::Arc;

    use fleet_structs::{
        AllocClientStatus, AllocDesiredStatus, AllocMetric, JobType, Resources, UpdateStrategy,
    };
    use proptest::prelude::*;

    use super::*;
    use crate::materialize::materialize_task_groups;

    fn job(count: usize, modify_index: u64) -> Job {
        Job {
            id: "web".to_string(),
            name: "web".to_string(),
            job_type: JobType::Service,
            priority: 50,
            datacenters: vec!["dc1".to_string()],
            task_groups: vec![TaskGroup {
                name: "api".to_string(),
                count,
                tasks: vec![],
            }],
            update: UpdateStrategy::default(),
            modify_index,
        }
    }

    fn alloc(name: &str, node_id: &str, modify_index: u64) -> Allocation {
        Allocation {
            id: format!("alloc-{name}"),
            eval_id: "e0".to_string(),
            name: name.to_string(),
            node_id: node_id.to_string(),
            job_id: "web".to_string(),
            job: Arc::new(job(2, modify_index)),
            task_group: "api".to_string(),
            resources: Resources::default(),
            task_resources: BTreeMap::new(),
            metrics: AllocMetric::default(),
            desired_status: AllocDesiredStatus::Run,
            desired_description: String::new(),
            client_status: AllocClientStatus::Running,
            client_description: String::new(),
        }
    }

    fn names(tuples: &[AllocTuple<'_>]) -> Vec<String> {
        let mut out: Vec<_> = tuples.iter().map(|t| t.name.to_string()).collect();
        out.sort();
        out
    }

    #[test]
    fn test_diff_scenario_drain_and_current() {
        let job = job(2, 5);
        let required = materialize_task_groups(&job);
        let allocs = vec![alloc("web.api[0]", "N1", 5), alloc("web.api[1]", "N2", 4)];
        let tainted: TaintedNodes =
            HashMap::from([("N1".to_string(), false), ("N2".to_string(), true)]);

        let diff = diff_allocs(&job, &tainted, &required, &allocs);

        assert_eq!(names(&diff.migrate), vec!["web.api[1]"]);
        assert_eq!(names(&diff.ignore), vec!["web.api[0]"]);
        assert!(diff.place.is_empty());
        assert!(diff.update.is_empty());
        assert!(diff.stop.is_empty());
    }

    #[test]
    fn test_diff_all_buckets() {
        let job = job(4, 7);
        let required = materialize_task_groups(&job);
        let allocs = vec![
            alloc("web.api[0]", "N1", 7), // ignore
            alloc("web.api[1]", "N1", 6), // update
            alloc("web.api[2]", "N2", 7), // migrate
            alloc("web.api[9]", "N2", 6), // stop
            alloc("web.cache[0]", "N1", 7), // stop
        ];
        let tainted: TaintedNodes =
            HashMap::from([("N1".to_string(), false), ("N2".to_string(), true)]);

        let diff = diff_allocs(&job, &tainted, &required, &allocs);

        assert_eq!(names(&diff.ignore), vec!["web.api[0]"]);
        assert_eq!(names(&diff.update), vec!["web.api[1]"]);
        assert_eq!(names(&diff.migrate), vec!["web.api[2]"]);
        assert_eq!(names(&diff.stop), vec!["web.api[9]", "web.cache[0]"]);
        assert_eq!(names(&diff.place), vec!["web.api[3]"]);

        assert!(diff.stop.iter().all(|t| t.task_group.is_none()));
        assert!(diff.place.iter().all(|t| t.alloc.is_none()));
        assert_eq!(
            diff.to_string(),
            "allocs: (place 1) (update 1) (migrate 1) (stop 2) (ignore 1)"
        );
    }

    #[test]
    fn test_diff_unknown_node_not_tainted() {
        let job = job(1, 2);
        let required = materialize_task_groups(&job);
        let allocs = vec![alloc("web.api[0]", "N9", 2)];

        let diff = diff_allocs(&job, &TaintedNodes::new(), &required, &allocs);
        assert_eq!(names(&diff.ignore), vec!["web.api[0]"]);
    }

    #[test]
    fn test_diff_empty_cluster_places_everything() {
        let job = job(3, 1);
        let required = materialize_task_groups(&job);

        let diff = diff_allocs(&job, &TaintedNodes::new(), &required, &[]);

        assert_eq!(
            names(&diff.place),
            vec!["web.api[0]", "web.api[1]", "web.api[2]"]
        );
        assert!(diff.place.iter().all(|t| t.task_group.is_some()));
    }

    proptest! {
        #[test]
        fn prop_diff_partitions_names(
            count in 0usize..6,
            job_index in 1u64..4,
            existing in proptest::collection::vec((0usize..8, 0usize..3, 1u64..4), 0..8),
            taint in proptest::collection::vec(any::<bool>(), 3),
        ) {
            let job = job(count, job_index);
            let required = materialize_task_groups(&job);

            let mut seen = HashSet::new();
            let allocs: Vec<_> = existing
                .into_iter()
                .filter(|(idx, _, _)| seen.insert(*idx))
                .map(|(idx, node, index)| {
                    alloc(&format!("web.api[{idx}]"), &format!("N{node}"), index)
                })
                .collect();
            let tainted: TaintedNodes = taint
                .iter()
                .enumerate()
                .map(|(i, t)| (format!("N{i}"), *t))
                .collect();

            let diff = diff_allocs(&job, &tainted, &required, &allocs);

            let mut all: Vec<String> = Vec::new();
            for bucket in [&diff.place, &diff.update, &diff.migrate, &diff.stop, &diff.ignore] {
                all.extend(bucket.iter().map(|t| t.name.to_string()));
            }
            let total = all.len();
            let unique: HashSet<_> = all.into_iter().collect();
            prop_assert_eq!(unique.len(), total);

            let mut expected: HashSet<String> = required.keys().cloned().collect();
            expected.extend(allocs.iter().map(|a| a.name.clone()));
            prop_assert_eq!(unique, expected);

            for t in &diff.stop {
                prop_assert!(!required.contains_key(t.name));
            }
            for t in &diff.migrate {
                let a = t.alloc.unwrap();
                prop_assert!(tainted[&a.node_id]);
            }
            for t in &diff.update {
                let a = t.alloc.unwrap();
                prop_assert!(!tainted[&a.node_id]);
                prop_assert_ne!(a.job.modify_index, job.modify_index);
            }
        }
    }
}
