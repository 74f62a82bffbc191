// src/engine/report.rs

//! Per-run outcome reporting.

use std::collections::BTreeMap;
use std::fmt;

use crate::engine::TaskName;

/// Final state of one task in a finished run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskReport {
    Succeeded,
    /// The task's own body failed.
    Failed(String),
    /// Never ran because these dependencies failed or were blocked.
    Blocked { by: Vec<TaskName> },
}

impl TaskReport {
    pub fn is_success(&self) -> bool {
        matches!(self, TaskReport::Succeeded)
    }
}

/// Outcome of a complete run: every participating task, once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub run_id: u64,
    pub outcomes: BTreeMap<TaskName, TaskReport>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.outcomes.values().all(TaskReport::is_success)
    }

    pub fn outcome_of(&self, task: &str) -> Option<&TaskReport> {
        self.outcomes.get(task)
    }

    /// Tasks whose own body failed, with their messages.
    pub fn failures(&self) -> Vec<(&str, &str)> {
        self.outcomes
            .iter()
            .filter_map(|(name, report)| match report {
                TaskReport::Failed(msg) => Some((name.as_str(), msg.as_str())),
                _ => None,
            })
            .collect()
    }

    pub fn blocked(&self) -> Vec<(&str, &[TaskName])> {
        self.outcomes
            .iter()
            .filter_map(|(name, report)| match report {
                TaskReport::Blocked { by } => Some((name.as_str(), by.as_slice())),
                _ => None,
            })
            .collect()
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ok = self.outcomes.values().filter(|r| r.is_success()).count();
        write!(
            f,
            "run {}: {}/{} tasks succeeded",
            self.run_id,
            ok,
            self.outcomes.len()
        )
    }
}
