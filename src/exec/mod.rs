// src/exec/mod.rs

//! Task execution layer.
//!
//! - [`executor_loop`] owns the loop that runs scheduled tasks.
//! - [`task_runner`] runs one task's action (clean, build, serve, watch) and
//!   reports back to the runtime via `RuntimeEvent`s.
//! - [`services`] holds the shared task environment and the long-lived
//!   services started by `serve` and `watch`.
//! - [`backend`] provides the `ExecutorBackend` trait and the
//!   `RealExecutorBackend` used in production, which tests replace with a
//!   fake implementation.

pub mod backend;
pub mod executor_loop;
pub mod services;
pub mod task_runner;

pub use backend::{ExecutorBackend, RealExecutorBackend};
pub use executor_loop::spawn_executor;
pub use services::{Services, TaskEnv};
