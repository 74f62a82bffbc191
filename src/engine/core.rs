// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! This module contains a synchronous, deterministic "core runtime" that
//! consumes [`RuntimeEvent`]s and produces:
//! - an updated core state
//! - a list of "commands" describing what the IO shell should do next
//!
//! The async/IO-heavy shell (`engine::runtime::Runtime`) is responsible for:
//! - reading events from channels
//! - sending `ScheduledTask`s to the executor
//! - handling Ctrl+C / shutdown
//!
//! The core is unit tested without Tokio, channels, filesystem, or processes.

use tracing::{debug, error};

use crate::dag::{Scheduler, TaskAction};
use crate::engine::event_handlers::{
    CoreCommand, CoreStep, handle_task_completion, handle_task_trigger,
};
use crate::engine::queue::TriggerQueue;
use crate::engine::{RuntimeEvent, RuntimeOptions, TaskOutcome};
use crate::types::TriggerWhileRunningBehaviour;

/// Pure core runtime state.
///
/// Owns the scheduler, the trigger queue and the runtime options. It has
/// **no** channels, no Tokio types, and does not perform any IO.
///
/// A failed `serve` task is fatal: the active run is allowed to finish so it
/// is reported, then the core requests exit regardless of `exit_when_idle`.
#[derive(Debug)]
pub struct CoreRuntime {
    scheduler: Scheduler,
    queue: TriggerQueue,
    options: RuntimeOptions,
    stopping: bool,
}

impl CoreRuntime {
    pub fn new(
        scheduler: Scheduler,
        behaviour: TriggerWhileRunningBehaviour,
        queue_length: usize,
        options: RuntimeOptions,
    ) -> Self {
        let queue = TriggerQueue::new(behaviour, queue_length);
        Self {
            scheduler,
            queue,
            options,
            stopping: false,
        }
    }

    /// Expose whether the scheduler is idle (for tests).
    pub fn is_idle(&self) -> bool {
        self.scheduler.is_idle()
    }

    /// Expose queue emptiness (for tests).
    pub fn queue_is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Handle a single runtime event, updating core state and returning the
    /// resulting commands for the IO shell.
    pub fn step(&mut self, event: RuntimeEvent) -> CoreStep {
        match event {
            RuntimeEvent::TaskTriggered { task, reason } if self.stopping => {
                debug!(task = %task, ?reason, "stopping after a fatal failure; ignoring trigger");
                self.exit_if_stopped(CoreStep {
                    commands: Vec::new(),
                    keep_running: true,
                })
            }
            RuntimeEvent::TaskTriggered { task, reason } => handle_task_trigger(
                &mut self.scheduler,
                &mut self.queue,
                &self.options,
                task,
                reason,
            ),
            RuntimeEvent::TaskCompleted { task, outcome } => {
                if matches!(outcome, TaskOutcome::Failed(_)) && self.is_fatal(&task) {
                    error!(task = %task, "dev server could not start; exiting after this run");
                    self.stopping = true;
                    self.queue.drain_pending();
                }
                let step = handle_task_completion(
                    &mut self.scheduler,
                    &mut self.queue,
                    &self.options,
                    task,
                    outcome,
                );
                self.exit_if_stopped(step)
            }
            RuntimeEvent::ShutdownRequested => CoreStep {
                commands: Vec::new(),
                keep_running: false,
            },
        }
    }

    fn is_fatal(&self, task: &str) -> bool {
        matches!(self.scheduler.graph().action_of(task), Some(TaskAction::Serve))
    }

    fn exit_if_stopped(&self, mut step: CoreStep) -> CoreStep {
        if self.stopping && self.scheduler.is_idle() && step.keep_running {
            step.commands.push(CoreCommand::RequestExit);
            step.keep_running = false;
        }
        step
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::DagGraph;
    use crate::engine::TriggerReason;

    fn core(exit_when_idle: bool) -> CoreRuntime {
        let mut g = DagGraph::new();
        g.register("clean", vec![], vec![], TaskAction::Clean);
        g.register(
            "css",
            vec![],
            vec![],
            TaskAction::Build {
                asset: "css".into(),
                full: false,
            },
        );
        g.register(
            "dev",
            vec![],
            vec![vec!["clean".into()], vec!["css".into()]],
            TaskAction::Noop,
        );
        let scheduler = Scheduler::from_graph(g).unwrap();
        CoreRuntime::new(
            scheduler,
            TriggerWhileRunningBehaviour::Queue,
            1,
            RuntimeOptions { exit_when_idle },
        )
    }

    fn dispatched(step: &CoreStep) -> Vec<String> {
        step.commands
            .iter()
            .filter_map(|c| match c {
                CoreCommand::DispatchTasks(tasks) => Some(tasks.iter().map(|t| t.name.clone())),
                _ => None,
            })
            .flatten()
            .collect()
    }

    fn trigger(task: &str, reason: TriggerReason) -> RuntimeEvent {
        RuntimeEvent::TaskTriggered {
            task: task.into(),
            reason,
        }
    }

    fn done(task: &str) -> RuntimeEvent {
        RuntimeEvent::TaskCompleted {
            task: task.into(),
            outcome: TaskOutcome::Success,
        }
    }

    #[test]
    fn sequence_runs_step_by_step_and_exits_when_idle() {
        let mut core = core(true);

        let step = core.step(trigger("dev", TriggerReason::Manual));
        assert_eq!(dispatched(&step), vec!["clean"]);

        let step = core.step(done("clean"));
        assert_eq!(dispatched(&step), vec!["css"]);

        let step = core.step(done("css"));
        assert_eq!(dispatched(&step), vec!["dev"]);
        assert!(step.keep_running);

        let step = core.step(done("dev"));
        assert!(!step.keep_running);
        assert!(step
            .commands
            .iter()
            .any(|c| matches!(c, CoreCommand::RunFinished(r) if r.is_success())));
    }

    #[test]
    fn retrigger_during_run_is_queued_for_the_next_run() {
        let mut core = core(false);

        core.step(trigger("css", TriggerReason::FileWatch));
        let step = core.step(trigger("css", TriggerReason::FileWatch));
        assert!(dispatched(&step).is_empty());
        assert!(!core.queue_is_empty());

        let step = core.step(done("css"));
        // The run finished and the queued trigger started the next one.
        assert_eq!(dispatched(&step), vec!["css"]);
        assert!(step
            .commands
            .iter()
            .any(|c| matches!(c, CoreCommand::RunFinished(_))));
        assert!(!core.is_idle());
    }

    #[test]
    fn failed_serve_ends_a_long_lived_session_after_the_run() {
        let mut g = DagGraph::new();
        g.register("serve", vec![], vec![], TaskAction::Serve);
        g.register("watch", vec![], vec![], TaskAction::Watch);
        g.register("work", vec![], vec![vec!["serve".into(), "watch".into()]], TaskAction::Noop);
        let scheduler = Scheduler::from_graph(g).unwrap();
        let mut core = CoreRuntime::new(
            scheduler,
            TriggerWhileRunningBehaviour::Queue,
            1,
            RuntimeOptions {
                exit_when_idle: false,
            },
        );

        let step = core.step(trigger("work", TriggerReason::Manual));
        assert_eq!(dispatched(&step), vec!["serve", "watch"]);

        let step = core.step(RuntimeEvent::TaskCompleted {
            task: "serve".into(),
            outcome: TaskOutcome::Failed("cannot bind".into()),
        });
        assert!(step.keep_running, "watch is still running");

        // Changes seen by the watcher no longer start runs.
        let step = core.step(trigger("watch", TriggerReason::FileWatch));
        assert!(dispatched(&step).is_empty());

        let step = core.step(done("watch"));
        assert!(!step.keep_running);
        assert!(step
            .commands
            .iter()
            .any(|c| matches!(c, CoreCommand::RunFinished(r) if !r.is_success())));
        assert!(step.commands.iter().any(|c| matches!(c, CoreCommand::RequestExit)));
    }
}
