// src/watch/dag_filter.rs

//! DAG-aware filtering of watch triggers.

use std::collections::BTreeSet;

use crate::dag::DagGraph;
use crate::engine::TaskName;

/// Drop every task that another matched task already pulls in.
///
/// Triggering a task runs its whole plan, so if `dev` and `css` both match
/// and `dev` depends on `css`, triggering `dev` alone is enough.
pub fn roots_only(graph: &DagGraph, matched: &BTreeSet<TaskName>) -> Vec<TaskName> {
    matched
        .iter()
        .filter(|task| {
            !matched
                .iter()
                .any(|other| other != *task && graph.depends_on(other, task))
        })
        .cloned()
        .collect()
}
