// src/dag/task_info.rs

//! Task metadata and per-run state.

use std::collections::BTreeSet;

use crate::dag::graph::TaskAction;
use crate::engine::TaskName;

/// Per-run state of a task (internal).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Part of this run, waiting on dependencies.
    Pending,
    /// Dispatched to the executor.
    Running,
    Succeeded,
    Failed,
    /// Will not run: a dependency failed or was blocked.
    Blocked,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::Succeeded | RunState::Failed | RunState::Blocked)
    }
}

/// Public, read-only view of a task's per-run state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskRunState {
    /// The task is not currently participating in this run.
    NotInRun,
    Pending,
    Running,
    Succeeded,
    Failed,
    Blocked,
}

impl From<Option<RunState>> for TaskRunState {
    fn from(state: Option<RunState>) -> Self {
        match state {
            None => TaskRunState::NotInRun,
            Some(RunState::Pending) => TaskRunState::Pending,
            Some(RunState::Running) => TaskRunState::Running,
            Some(RunState::Succeeded) => TaskRunState::Succeeded,
            Some(RunState::Failed) => TaskRunState::Failed,
            Some(RunState::Blocked) => TaskRunState::Blocked,
        }
    }
}

/// Static task information plus per-run state.
#[derive(Debug, Clone)]
pub struct TaskInfo {
    pub name: TaskName,
    pub action: TaskAction,

    /// Per-run state (None if not participating in the current run).
    pub run_state: Option<RunState>,
    /// Tasks this one waits for in the current run, from the merged plans.
    pub run_deps: BTreeSet<TaskName>,
    /// Failure message when `run_state == Failed`.
    pub failure: Option<String>,
    /// Dependencies responsible when `run_state == Blocked`.
    pub blocked_by: Vec<TaskName>,

    /// Last run ID in which this task succeeded.
    pub last_successful_run: Option<u64>,
    /// Last run ID in which this task failed.
    pub last_failed_run: Option<u64>,
}

impl TaskInfo {
    pub fn new(name: TaskName, action: TaskAction) -> Self {
        Self {
            name,
            action,
            run_state: None,
            run_deps: BTreeSet::new(),
            failure: None,
            blocked_by: Vec::new(),
            last_successful_run: None,
            last_failed_run: None,
        }
    }

    /// Forget everything about the previous run.
    pub fn reset_run(&mut self) {
        self.run_state = None;
        self.run_deps.clear();
        self.failure = None;
        self.blocked_by.clear();
    }
}

/// Description of a task that the scheduler wants the executor to run now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledTask {
    pub name: TaskName,
    pub action: TaskAction,
    /// Monotonically increasing run identifier.
    ///
    /// All tasks that belong to the same run share the same `run_id`.
    pub run_id: u64,
}

impl ScheduledTask {
    pub fn from_task_info(info: &TaskInfo, run_id: u64) -> Self {
        Self {
            name: info.name.clone(),
            action: info.action.clone(),
            run_id,
        }
    }
}
