use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::config::model::ConfigFile;
use crate::dag::graph::{DagGraph, TaskAction};
use crate::dag::plan::ExecutionPlan;
use crate::dag::scheduler_step::SchedulerStep;
use crate::dag::state_manager::{ReadOnlyStateManager, StateManager};
use crate::dag::task_info::{RunState, TaskInfo, TaskRunState};
use crate::engine::{TaskName, TaskOutcome};
use crate::errors::Result;

/// Scheduler holds the immutable task graph, one precomputed plan per task,
/// and mutable per-run state.
///
/// It is responsible for:
/// - remembering which tasks are part of the current run
/// - merging a triggered task's plan into the run
/// - deciding when a task is ready (all run dependencies succeeded)
/// - marking tasks as succeeded/failed and blocking their dependents
/// - producing a [`RunReport`](crate::engine::RunReport) when the run ends
#[derive(Debug)]
pub struct Scheduler {
    graph: DagGraph,
    plans: HashMap<TaskName, ExecutionPlan>,
    tasks: HashMap<TaskName, TaskInfo>,
    /// Monotonically increasing run ID.
    run_counter: u64,
    /// Currently active run ID, or `None` if there is no active run.
    current_run_id: Option<u64>,
}

impl Scheduler {
    /// Construct a scheduler from a validated [`ConfigFile`].
    pub fn from_config(cfg: &ConfigFile) -> Result<Self> {
        Self::from_graph(DagGraph::from_config(cfg))
    }

    /// Construct a scheduler from a graph, computing every task's plan.
    pub fn from_graph(graph: DagGraph) -> Result<Self> {
        let mut plans = HashMap::new();
        let mut tasks = HashMap::new();

        for name in graph.tasks() {
            plans.insert(name.to_string(), ExecutionPlan::for_root(&graph, name)?);
            let action = graph.action_of(name).cloned().unwrap_or(TaskAction::Noop);
            tasks.insert(name.to_string(), TaskInfo::new(name.to_string(), action));
        }

        Ok(Self {
            graph,
            plans,
            tasks,
            run_counter: 0,
            current_run_id: None,
        })
    }

    pub fn graph(&self) -> &DagGraph {
        &self.graph
    }

    pub fn plan_of(&self, task: &str) -> Option<&ExecutionPlan> {
        self.plans.get(task)
    }

    /// Returns `true` if there is currently no active run.
    pub fn is_idle(&self) -> bool {
        self.current_run_id.is_none()
    }

    /// Current run ID, if any.
    pub fn current_run_id(&self) -> Option<u64> {
        self.current_run_id
    }

    /// Read-only view of the given task's run state.
    pub fn run_state_of(&self, task: &str) -> Option<TaskRunState> {
        let info = self.tasks.get(task)?;
        Some(info.run_state.into())
    }

    /// Names of tasks participating in the *active* run.
    pub fn tasks_in_current_run(&self) -> Vec<TaskName> {
        if self.current_run_id.is_none() {
            return Vec::new();
        }

        let mut names: Vec<TaskName> = self
            .tasks
            .values()
            .filter(|info| info.run_state.is_some())
            .map(|info| info.name.clone())
            .collect();
        names.sort();
        names
    }

    /// Whether the run dependencies of `task` are satisfied.
    ///
    /// Returns `None` if the task is unknown.
    pub fn deps_satisfied(&self, task: &str) -> Option<bool> {
        let info = self.tasks.get(task)?;
        let mgr = ReadOnlyStateManager::new(&self.tasks);
        Some(mgr.deps_satisfied_for_info(info))
    }

    /// Start a new run, clearing per-run state but keeping history.
    pub fn start_new_run(&mut self) {
        self.run_counter += 1;
        self.current_run_id = Some(self.run_counter);

        for info in self.tasks.values_mut() {
            info.reset_run();
        }

        debug!(run_id = self.run_counter, "scheduler: starting new run");
    }

    /// Merge `task`'s plan into the active run, starting one if idle.
    pub fn step_trigger(&mut self, task: &str) -> SchedulerStep {
        self.trigger_step_internal(task)
    }

    /// Record a running task's outcome and schedule whatever became ready.
    pub fn step_completion(&mut self, task: &str, outcome: TaskOutcome) -> SchedulerStep {
        self.completion_step_internal(task, outcome)
    }

    pub fn task_names(&self) -> impl Iterator<Item = &str> {
        self.graph.tasks()
    }

    /// If every task in the run is terminal, close the run and return its
    /// report.
    fn maybe_finish_run(&mut self, step: &mut SchedulerStep) {
        let Some(run_id) = self.current_run_id else {
            return;
        };

        let manager = StateManager::new(&mut self.tasks, self.current_run_id);
        if manager.all_tasks_terminal() {
            let report = manager.build_report(run_id);
            info!(
                run_id,
                success = report.is_success(),
                "scheduler: all tasks terminal; run finished"
            );
            self.current_run_id = None;
            step.run_just_finished = true;
            step.report = Some(report);
        }
    }

    fn trigger_step_internal(&mut self, task: &str) -> SchedulerStep {
        let mut step = SchedulerStep::default();

        if !self.plans.contains_key(task) {
            warn!(task = %task, "trigger for unknown task; ignoring");
            return step;
        }

        if self.current_run_id.is_none() {
            debug!(task = %task, "trigger with no active run; implicitly starting a new run");
            self.start_new_run();
        }

        let Some(plan) = self.plans.get(task) else {
            return step;
        };

        let mut manager = StateManager::new(&mut self.tasks, self.current_run_id);
        manager.merge_plan(plan);
        step.newly_failed = manager.propagate_blocks();
        step.newly_scheduled = manager.collect_new_ready_tasks();

        self.maybe_finish_run(&mut step);
        step
    }

    fn completion_step_internal(&mut self, task: &str, outcome: TaskOutcome) -> SchedulerStep {
        let mut step = SchedulerStep::default();

        let Some(run_id) = self.current_run_id else {
            warn!(task = %task, "completion with no active run; ignoring");
            return step;
        };

        let Some(info) = self.tasks.get_mut(task) else {
            warn!(task = %task, "completion for unknown task; ignoring");
            return step;
        };

        if info.run_state != Some(RunState::Running) {
            warn!(
                task = %task,
                run_id,
                state = ?info.run_state,
                "completion for a task that is not running; ignoring"
            );
            return step;
        }

        match outcome {
            TaskOutcome::Success => {
                info.run_state = Some(RunState::Succeeded);
                info.last_successful_run = Some(run_id);
                debug!(task = %info.name, run_id, "task completed successfully");
            }
            TaskOutcome::Failed(message) => {
                warn!(
                    task = %info.name,
                    run_id,
                    error = %message,
                    "task failed; blocking dependents in this run"
                );
                info.run_state = Some(RunState::Failed);
                info.last_failed_run = Some(run_id);
                info.failure = Some(message);
                step.newly_failed.push(info.name.clone());
            }
        }

        let mut manager = StateManager::new(&mut self.tasks, self.current_run_id);
        step.newly_failed.extend(manager.propagate_blocks());
        step.newly_scheduled = manager.collect_new_ready_tasks();

        self.maybe_finish_run(&mut step);
        step
    }
}
