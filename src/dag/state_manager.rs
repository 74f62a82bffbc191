// src/dag/state_manager.rs

//! Per-run state management for tasks in the scheduler.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, info, warn};

use crate::dag::plan::ExecutionPlan;
use crate::dag::task_info::{RunState, ScheduledTask, TaskInfo};
use crate::engine::{RunReport, TaskName, TaskReport};

/// Manages per-run state transitions for tasks.
pub struct StateManager<'a> {
    tasks: &'a mut HashMap<TaskName, TaskInfo>,
    current_run_id: Option<u64>,
}

impl<'a> StateManager<'a> {
    pub fn new(tasks: &'a mut HashMap<TaskName, TaskInfo>, current_run_id: Option<u64>) -> Self {
        Self {
            tasks,
            current_run_id,
        }
    }

    /// Merge a plan into the current run.
    ///
    /// - Tasks not yet part of the run are marked `Pending` with the plan's
    ///   dependencies.
    /// - Tasks already participating keep their state and dependencies, so a
    ///   merge never adds edges to work that is already under way.
    ///
    /// Returns the names of tasks newly added to the run.
    pub fn merge_plan(&mut self, plan: &ExecutionPlan) -> Vec<TaskName> {
        let mut added = Vec::new();

        for name in plan.tasks() {
            match self.tasks.get_mut(name) {
                Some(info) if info.run_state.is_none() => {
                    info.run_state = Some(RunState::Pending);
                    info.run_deps = plan.deps_of(name).map(str::to_string).collect();
                    debug!(
                        task = %info.name,
                        root = %plan.root(),
                        deps = ?info.run_deps,
                        "marked Pending for this run"
                    );
                    added.push(info.name.clone());
                }
                Some(_) => {}
                None => {
                    // Should not happen with a validated config.
                    warn!(task = %name, "plan task not present in tasks map");
                }
            }
        }

        added
    }

    /// Whether every run dependency of `info` has succeeded in this run.
    pub fn deps_satisfied_for_info(&self, info: &TaskInfo) -> bool {
        ReadOnlyStateManager::new(self.tasks).deps_satisfied_for_info(info)
    }

    /// Mark every `Pending` task with a failed or blocked dependency as
    /// `Blocked`, repeating until nothing changes.
    ///
    /// Returns the tasks newly blocked, in the order they were blocked.
    pub fn propagate_blocks(&mut self) -> Vec<TaskName> {
        let mut newly_blocked = Vec::new();

        loop {
            let mut to_block: Vec<(TaskName, Vec<TaskName>)> = Vec::new();

            for info in self.tasks.values() {
                if info.run_state != Some(RunState::Pending) {
                    continue;
                }
                let culprits: Vec<TaskName> = info
                    .run_deps
                    .iter()
                    .filter(|dep| {
                        matches!(
                            self.tasks.get(*dep).and_then(|d| d.run_state),
                            Some(RunState::Failed) | Some(RunState::Blocked)
                        )
                    })
                    .cloned()
                    .collect();
                if !culprits.is_empty() {
                    to_block.push((info.name.clone(), culprits));
                }
            }

            if to_block.is_empty() {
                break;
            }

            to_block.sort();
            for (name, culprits) in to_block {
                if let Some(info) = self.tasks.get_mut(&name) {
                    debug!(
                        task = %info.name,
                        blocked_by = ?culprits,
                        "dependency failed; task will not run in this run"
                    );
                    info.run_state = Some(RunState::Blocked);
                    info.blocked_by = culprits;
                    newly_blocked.push(name);
                }
            }
        }

        newly_blocked
    }

    /// Collect tasks that are `Pending` and whose dependencies are satisfied,
    /// mark them as `Running`, and return them as `ScheduledTask`s.
    pub fn collect_new_ready_tasks(&mut self) -> Vec<ScheduledTask> {
        let mut candidates: Vec<TaskName> = self
            .tasks
            .values()
            .filter(|info| {
                info.run_state == Some(RunState::Pending) && self.deps_satisfied_for_info(info)
            })
            .map(|info| info.name.clone())
            .collect();
        candidates.sort();

        let mut ready = Vec::with_capacity(candidates.len());
        for name in candidates {
            if let Some(info) = self.tasks.get_mut(&name) {
                let is_rerun = info.last_successful_run.is_some() || info.last_failed_run.is_some();
                if is_rerun {
                    info!(
                        task = %info.name,
                        run_id = self.current_run_id,
                        "scheduling task for re-run"
                    );
                } else {
                    info!(
                        task = %info.name,
                        run_id = self.current_run_id,
                        "scheduling task"
                    );
                }

                info.run_state = Some(RunState::Running);
                ready.push(ScheduledTask::from_task_info(
                    info,
                    self.current_run_id.unwrap_or(0),
                ));
            }
        }

        ready
    }

    /// True when no task is `Pending` or `Running`.
    pub fn all_tasks_terminal(&self) -> bool {
        self.tasks
            .values()
            .all(|info| info.run_state.is_none_or(RunState::is_terminal))
    }

    /// Summarise every task that took part in the run.
    pub fn build_report(&self, run_id: u64) -> RunReport {
        let outcomes: BTreeMap<TaskName, TaskReport> = self
            .tasks
            .values()
            .filter_map(|info| {
                let report = match info.run_state? {
                    RunState::Succeeded => TaskReport::Succeeded,
                    RunState::Failed => TaskReport::Failed(
                        info.failure.clone().unwrap_or_else(|| "failed".to_string()),
                    ),
                    RunState::Blocked => TaskReport::Blocked {
                        by: info.blocked_by.clone(),
                    },
                    RunState::Pending | RunState::Running => return None,
                };
                Some((info.name.clone(), report))
            })
            .collect();

        RunReport { run_id, outcomes }
    }
}

/// A read-only view for checking dependency satisfaction.
pub struct ReadOnlyStateManager<'a> {
    tasks: &'a HashMap<TaskName, TaskInfo>,
}

impl<'a> ReadOnlyStateManager<'a> {
    pub fn new(tasks: &'a HashMap<TaskName, TaskInfo>) -> Self {
        Self { tasks }
    }

    pub fn deps_satisfied_for_info(&self, info: &TaskInfo) -> bool {
        info.run_deps.iter().all(|dep_name| match self.tasks.get(dep_name) {
            Some(dep) => dep.run_state == Some(RunState::Succeeded),
            None => {
                warn!(
                    task = %info.name,
                    dep = %dep_name,
                    "dependency missing from tasks map"
                );
                false
            }
        })
    }
}
