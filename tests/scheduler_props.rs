// tests/scheduler_props.rs

use std::collections::{BTreeSet, HashSet, VecDeque};

use proptest::prelude::*;

use assetdag::config::ConfigFile;
use assetdag::dag::{Scheduler, TaskRunState};
use assetdag::engine::TaskOutcome;
use assetdag_test_utils::builders::{ConfigFileBuilder, TaskConfigBuilder};

// Acyclic by construction: task N only refers to tasks 0..N-1. Some tasks
// are parallel composites of their picks instead of `after` lists.
fn dag_config_strategy(max_tasks: usize) -> impl Strategy<Value = ConfigFile> {
    (1..=max_tasks).prop_flat_map(|num_tasks| {
        let deps = proptest::collection::vec(
            (proptest::collection::vec(any::<usize>(), 0..num_tasks), any::<bool>()),
            num_tasks,
        );

        deps.prop_map(move |raw| {
            let mut builder = ConfigFileBuilder::new();
            for (i, (picks, composite)) in raw.into_iter().enumerate() {
                let name = format!("task_{i}");
                let valid: BTreeSet<String> = if i == 0 {
                    BTreeSet::new()
                } else {
                    picks.iter().map(|d| format!("task_{}", d % i)).collect()
                };

                let task = if composite && !valid.is_empty() {
                    let members: Vec<&str> = valid.iter().map(String::as_str).collect();
                    TaskConfigBuilder::parallel(&members).build()
                } else {
                    let mut b = TaskConfigBuilder::new();
                    for dep in &valid {
                        b = b.after(dep);
                    }
                    b.build()
                };
                builder = builder.with_task(&name, task);
            }
            builder.build()
        })
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn runs_terminate_and_respect_dependencies(
        cfg in dag_config_strategy(8),
        root_idx in 0..8usize,
        failing in proptest::collection::hash_set(0..8usize, 0..3),
    ) {
        let mut scheduler = Scheduler::from_config(&cfg).unwrap();
        let mut names: Vec<String> = scheduler.task_names().map(str::to_string).collect();
        names.sort();
        let root = names[root_idx % names.len()].clone();
        let failing: HashSet<String> = failing.iter().map(|i| format!("task_{i}")).collect();

        let plan = scheduler.plan_of(&root).unwrap().clone();
        let plan_has_failing = plan.tasks().any(|t| failing.contains(t));

        let mut executing: VecDeque<String> = VecDeque::new();
        let mut succeeded: HashSet<String> = HashSet::new();
        let mut report = None;

        let step = scheduler.step_trigger(&root);
        executing.extend(step.newly_scheduled.into_iter().map(|t| t.name));

        let mut in_run = scheduler.tasks_in_current_run();
        in_run.sort();
        let mut expected: Vec<String> = plan.tasks().map(str::to_string).collect();
        expected.sort();
        prop_assert_eq!(in_run, expected);

        let mut completions = 0;
        while let Some(task) = executing.pop_front() {
            completions += 1;
            prop_assert!(completions <= plan.len(), "task ran more than once per run");

            for dep in plan.deps_of(&task) {
                prop_assert!(succeeded.contains(dep), "{} ran before {}", task, dep);
            }

            let outcome = if failing.contains(&task) {
                TaskOutcome::Failed("boom".to_string())
            } else {
                succeeded.insert(task.clone());
                TaskOutcome::Success
            };

            let step = scheduler.step_completion(&task, outcome);
            executing.extend(step.newly_scheduled.into_iter().map(|t| t.name));
            if step.report.is_some() {
                report = step.report;
            }

            // Ready tasks are dispatched in the same step; none stay Pending.
            for name in plan.tasks() {
                if scheduler.run_state_of(name) == Some(TaskRunState::Pending) {
                    prop_assert_eq!(scheduler.deps_satisfied(name), Some(false));
                }
            }
        }

        prop_assert!(scheduler.is_idle(), "run never finished");
        prop_assert!(report.is_some());
        let report = report.unwrap();
        prop_assert_eq!(report.outcomes.len(), plan.len());
        prop_assert_eq!(report.is_success(), !plan_has_failing);
        for (_, by) in report.blocked() {
            prop_assert!(!by.is_empty());
        }
    }
}
