// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use std::collections::BTreeSet;

use tracing::debug;

use crate::dag::{ScheduledTask, Scheduler, SchedulerStep, TaskRunState};
use crate::engine::queue::TriggerQueue;
use crate::engine::{RunReport, RuntimeOptions, TaskName, TaskOutcome, TriggerReason};

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone)]
pub enum CoreCommand {
    /// Send these tasks to the executor.
    DispatchTasks(Vec<ScheduledTask>),
    /// A run finished; report it.
    RunFinished(RunReport),
    /// Request that the process exits (idle with nothing queued).
    RequestExit,
}

/// Decision returned by the core after handling a single `RuntimeEvent`.
#[derive(Debug, Clone)]
pub struct CoreStep {
    /// Commands the IO shell should execute (dispatch, report, exit).
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

/// Handle a task trigger event.
///
/// - If the scheduler is idle, start a new run seeded with this trigger plus
///   anything already queued.
/// - If a run is active:
///   - a task already participating is recorded in the queue for a *future*
///     run (queue/cancel semantics);
///   - a task *not* in the current run has its plan merged into the run
///     immediately, sharing the run id.
pub fn handle_task_trigger(
    scheduler: &mut Scheduler,
    queue: &mut TriggerQueue,
    options: &RuntimeOptions,
    task: TaskName,
    reason: TriggerReason,
) -> CoreStep {
    let mut commands = Vec::new();

    if scheduler.is_idle() {
        let mut triggers: BTreeSet<TaskName> = queue.drain_pending().into_iter().collect();
        triggers.insert(task);
        commands.extend(start_new_run_from_triggers(
            scheduler,
            triggers.into_iter().collect(),
        ));
    } else {
        match scheduler.run_state_of(&task) {
            None => {
                debug!(task = %task, "trigger for unknown task; ignoring");
            }
            Some(TaskRunState::NotInRun) => {
                debug!(task = %task, ?reason, "merging trigger into active run");
                let step = scheduler.step_trigger(&task);
                push_step(&mut commands, step);
            }
            Some(_already_in_run) => {
                debug!(task = %task, ?reason, "task already in active run; queueing trigger");
                queue.record_trigger(&task);
            }
        }
    }

    commands.extend(maybe_start_queued_run(scheduler, queue));
    finish(commands, scheduler, queue, options)
}

/// Handle a task completion event.
pub fn handle_task_completion(
    scheduler: &mut Scheduler,
    queue: &mut TriggerQueue,
    options: &RuntimeOptions,
    task: TaskName,
    outcome: TaskOutcome,
) -> CoreStep {
    let mut commands = Vec::new();

    let step = scheduler.step_completion(&task, outcome);
    push_step(&mut commands, step);

    commands.extend(maybe_start_queued_run(scheduler, queue));
    finish(commands, scheduler, queue, options)
}

/// Seed a new run from a set of triggers.
///
/// This mirrors the async runtime's logic, but is pure and returns
/// commands instead of performing IO.
pub fn start_new_run_from_triggers(
    scheduler: &mut Scheduler,
    triggers: Vec<TaskName>,
) -> Vec<CoreCommand> {
    let mut commands = Vec::new();

    if triggers.is_empty() {
        return commands;
    }

    scheduler.start_new_run();

    for task in triggers {
        let step = scheduler.step_trigger(&task);
        push_step(&mut commands, step);
    }

    commands
}

fn push_step(commands: &mut Vec<CoreCommand>, step: SchedulerStep) {
    if !step.newly_scheduled.is_empty() {
        commands.push(CoreCommand::DispatchTasks(step.newly_scheduled));
    }
    if let Some(report) = step.report {
        commands.push(CoreCommand::RunFinished(report));
    }
}

/// If the scheduler is idle and there are queued triggers, start a new run.
fn maybe_start_queued_run(scheduler: &mut Scheduler, queue: &mut TriggerQueue) -> Vec<CoreCommand> {
    if !scheduler.is_idle() {
        return Vec::new();
    }

    let triggers = queue.drain_pending();
    if triggers.is_empty() {
        return Vec::new();
    }

    start_new_run_from_triggers(scheduler, triggers)
}

fn finish(
    mut commands: Vec<CoreCommand>,
    scheduler: &Scheduler,
    queue: &TriggerQueue,
    options: &RuntimeOptions,
) -> CoreStep {
    let mut keep_running = true;
    if options.exit_when_idle && scheduler.is_idle() && queue.is_empty() {
        keep_running = false;
        commands.push(CoreCommand::RequestExit);
    }

    CoreStep {
        commands,
        keep_running,
    }
}
