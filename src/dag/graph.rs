// src/dag/graph.rs

use std::collections::HashMap;

use crate::config::model::{BuiltinAction, ConfigFile, TaskConfig};
use crate::engine::TaskName;

/// What a task does once its dependencies are satisfied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskAction {
    /// Pure composite: nothing of its own to do.
    Noop,
    /// Remove the output root.
    Clean,
    /// Run an asset set pipeline.
    Build { asset: String, full: bool },
    /// Start the dev server.
    Serve,
    /// Start the file watcher.
    Watch,
}

impl TaskAction {
    /// Services that keep running after the task reports success.
    pub fn is_long_lived(&self) -> bool {
        matches!(self, TaskAction::Serve | TaskAction::Watch)
    }

    fn from_task_config(task: &TaskConfig) -> Self {
        match (&task.action, &task.build) {
            (Some(BuiltinAction::Clean), _) => TaskAction::Clean,
            (Some(BuiltinAction::Serve), _) => TaskAction::Serve,
            (Some(BuiltinAction::Watch), _) => TaskAction::Watch,
            (None, Some(asset)) => TaskAction::Build {
                asset: asset.clone(),
                full: task.full,
            },
            (None, None) => TaskAction::Noop,
        }
    }
}

/// Internal node structure: stores immediate deps and dependents.
#[derive(Debug, Clone)]
struct DagNode {
    /// Explicit `after` dependencies.
    after: Vec<TaskName>,
    /// Composite groups, run one after another.
    steps: Vec<Vec<TaskName>>,
    action: TaskAction,
    /// Direct dependents: tasks that list this one in `after` or as a member.
    dependents: Vec<TaskName>,
}

/// In-memory task graph keyed by task name.
///
/// A task depends directly on its `after` list and on every member of its
/// composite groups. Acyclicity is checked per root by
/// [`ExecutionPlan::for_root`](crate::dag::ExecutionPlan::for_root).
#[derive(Debug, Clone, Default)]
pub struct DagGraph {
    nodes: HashMap<TaskName, DagNode>,
}

impl DagGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the graph from a validated [`ConfigFile`]: every `[task.*]` plus
    /// one build task per `[asset.*]`.
    pub fn from_config(cfg: &ConfigFile) -> Self {
        let mut graph = Self::new();

        for name in cfg.asset.keys() {
            graph.register(
                name.clone(),
                Vec::new(),
                Vec::new(),
                TaskAction::Build {
                    asset: name.clone(),
                    full: false,
                },
            );
        }

        for (name, task) in cfg.task.iter() {
            graph.register(
                name.clone(),
                task.after.clone(),
                task.steps(),
                TaskAction::from_task_config(task),
            );
        }

        graph
    }

    /// Add (or replace) a task.
    pub fn register(
        &mut self,
        name: impl Into<TaskName>,
        after: Vec<TaskName>,
        steps: Vec<Vec<TaskName>>,
        action: TaskAction,
    ) {
        self.nodes.insert(
            name.into(),
            DagNode {
                after,
                steps,
                action,
                dependents: Vec::new(),
            },
        );
        self.rebuild_dependents();
    }

    fn rebuild_dependents(&mut self) {
        for node in self.nodes.values_mut() {
            node.dependents.clear();
        }

        let edges: Vec<(TaskName, TaskName)> = self
            .nodes
            .iter()
            .flat_map(|(name, node)| {
                node.after
                    .iter()
                    .chain(node.steps.iter().flatten())
                    .map(move |dep| (dep.clone(), name.clone()))
            })
            .collect();

        for (dep, dependent) in edges {
            if let Some(dep_node) = self.nodes.get_mut(&dep) {
                if !dep_node.dependents.contains(&dependent) {
                    dep_node.dependents.push(dependent);
                }
            }
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    /// Return all task names.
    pub fn tasks(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(|s| s.as_str())
    }

    pub fn action_of(&self, name: &str) -> Option<&TaskAction> {
        self.nodes.get(name).map(|n| &n.action)
    }

    /// Explicit `after` dependencies of a task.
    pub fn after_of(&self, name: &str) -> &[TaskName] {
        self.nodes
            .get(name)
            .map(|n| n.after.as_slice())
            .unwrap_or(&[])
    }

    /// Composite groups of a task (empty for leaf tasks).
    pub fn steps_of(&self, name: &str) -> &[Vec<TaskName>] {
        self.nodes
            .get(name)
            .map(|n| n.steps.as_slice())
            .unwrap_or(&[])
    }

    /// Immediate dependencies: `after` plus every composite member.
    pub fn dependencies_of(&self, name: &str) -> Vec<TaskName> {
        let mut deps: Vec<TaskName> = self.after_of(name).to_vec();
        for member in self.steps_of(name).iter().flatten() {
            if !deps.contains(member) {
                deps.push(member.clone());
            }
        }
        deps
    }

    /// Immediate dependents of a task.
    pub fn dependents_of(&self, name: &str) -> &[TaskName] {
        self.nodes
            .get(name)
            .map(|n| n.dependents.as_slice())
            .unwrap_or(&[])
    }

    /// True if `task` transitively depends on `on`.
    pub fn depends_on(&self, task: &str, on: &str) -> bool {
        let mut stack = self.dependencies_of(task);
        let mut seen = std::collections::HashSet::new();
        while let Some(next) = stack.pop() {
            if next == on {
                return true;
            }
            if seen.insert(next.clone()) {
                stack.extend(self.dependencies_of(&next));
            }
        }
        false
    }
}
