// src/dag/mod.rs

//! Task graph and scheduling.
//!
//! - [`graph`] holds the registered tasks, their `after` lists, composite
//!   groups and actions.
//! - [`plan`] expands a root task into an [`ExecutionPlan`].
//! - [`scheduler`] contains the per-run state machine that decides
//!   which tasks are ready to run, and when dependents can be scheduled.
//! - [`task_info`] provides task metadata and scheduled task types.
//! - [`scheduler_step`] defines the result type for scheduler steps.
//! - [`state_manager`] manages per-run state transitions.

pub mod graph;
pub mod plan;
pub mod scheduler;
pub mod scheduler_step;
pub mod state_manager;
pub mod task_info;

pub use graph::{DagGraph, TaskAction};
pub use plan::ExecutionPlan;
pub use scheduler::Scheduler;
pub use scheduler_step::SchedulerStep;
pub use task_info::{ScheduledTask, TaskRunState};
