// src/dag/plan.rs

//! Execution plans: the set of tasks one root needs, with run-order edges.

use std::collections::{BTreeMap, BTreeSet};

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::dag::graph::DagGraph;
use crate::engine::TaskName;
use crate::errors::{AssetdagError, Result};

/// Every task reachable from `root`, each exactly once, mapped to the tasks
/// it must wait for within a run.
///
/// Edges come from three places:
/// - `after` lists;
/// - a composite waits for all of its members;
/// - members of sequence step *k+1* (and everything they pull in) wait for
///   every member of step *k*. Tasks already pulled in by an earlier step are
///   shared and not re-ordered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionPlan {
    root: TaskName,
    deps: BTreeMap<TaskName, BTreeSet<TaskName>>,
}

impl ExecutionPlan {
    pub fn for_root(graph: &DagGraph, root: &str) -> Result<Self> {
        if !graph.contains(root) {
            return Err(AssetdagError::TaskNotFound(root.to_string()));
        }

        let tasks = closure(graph, [root.to_string()]);
        let mut deps: BTreeMap<TaskName, BTreeSet<TaskName>> = tasks
            .iter()
            .map(|t| (t.clone(), BTreeSet::new()))
            .collect();

        for task in tasks.iter() {
            if let Some(entry) = deps.get_mut(task) {
                entry.extend(graph.dependencies_of(task));
            }

            let steps = graph.steps_of(task);
            let mut earlier: BTreeSet<TaskName> = BTreeSet::new();
            for pair in steps.windows(2) {
                earlier.extend(closure(graph, pair[0].iter().cloned()));
                for member in pair[1].iter() {
                    for pulled in closure(graph, [member.clone()]) {
                        if earlier.contains(&pulled) {
                            continue;
                        }
                        if let Some(entry) = deps.get_mut(&pulled) {
                            entry.extend(pair[0].iter().cloned());
                        }
                    }
                }
            }
        }

        let plan = Self {
            root: root.to_string(),
            deps,
        };
        plan.check_acyclic()?;
        Ok(plan)
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn contains(&self, task: &str) -> bool {
        self.deps.contains_key(task)
    }

    pub fn tasks(&self) -> impl Iterator<Item = &str> {
        self.deps.keys().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.deps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deps.is_empty()
    }

    /// Tasks `task` waits for in this plan.
    pub fn deps_of<'a>(&'a self, task: &str) -> impl Iterator<Item = &'a str> + use<'a> {
        self.deps
            .get(task)
            .into_iter()
            .flat_map(|d| d.iter().map(|s| s.as_str()))
    }

    /// Topological order (dependencies first).
    pub fn order(&self) -> Result<Vec<TaskName>> {
        let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
        for (task, deps) in self.deps.iter() {
            graph.add_node(task.as_str());
            for dep in deps {
                graph.add_edge(dep.as_str(), task.as_str(), ());
            }
        }

        match toposort(&graph, None) {
            Ok(order) => Ok(order.into_iter().map(str::to_string).collect()),
            Err(cycle) => Err(AssetdagError::DagCycle(format!(
                "cycle in plan for '{}' involving task '{}'",
                self.root,
                cycle.node_id()
            ))),
        }
    }

    fn check_acyclic(&self) -> Result<()> {
        self.order().map(|_| ())
    }
}

/// Tasks reachable from `roots` through `after` and composite membership,
/// roots included.
fn closure(graph: &DagGraph, roots: impl IntoIterator<Item = TaskName>) -> BTreeSet<TaskName> {
    let mut seen = BTreeSet::new();
    let mut stack: Vec<TaskName> = roots.into_iter().collect();
    while let Some(name) = stack.pop() {
        if seen.insert(name.clone()) {
            stack.extend(graph.dependencies_of(&name));
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::graph::TaskAction;

    fn leaf(g: &mut DagGraph, name: &str) {
        g.register(name, vec![], vec![], TaskAction::Noop);
    }

    #[test]
    fn sequence_orders_whole_subtrees() {
        let mut g = DagGraph::new();
        leaf(&mut g, "clean");
        leaf(&mut g, "plugins-js");
        leaf(&mut g, "html");
        g.register("plugins", vec![], vec![vec!["plugins-js".into()]], TaskAction::Noop);
        g.register(
            "dev",
            vec![],
            vec![vec!["clean".into()], vec!["plugins".into(), "html".into()]],
            TaskAction::Noop,
        );

        let plan = ExecutionPlan::for_root(&g, "dev").unwrap();
        assert_eq!(plan.len(), 5);

        // Members of a nested composite also wait for the earlier step.
        let plugin_js_deps: Vec<_> = plan.deps_of("plugins-js").collect();
        assert_eq!(plugin_js_deps, vec!["clean"]);

        let dev_deps: Vec<_> = plan.deps_of("dev").collect();
        assert_eq!(dev_deps, vec!["clean", "html", "plugins"]);

        let order = plan.order().unwrap();
        assert_eq!(order.first().map(String::as_str), Some("clean"));
        assert_eq!(order.last().map(String::as_str), Some("dev"));
    }

    #[test]
    fn diamond_dependencies_appear_once() {
        let mut g = DagGraph::new();
        leaf(&mut g, "a");
        g.register("b", vec!["a".into()], vec![], TaskAction::Noop);
        g.register("c", vec!["a".into()], vec![], TaskAction::Noop);
        g.register("d", vec!["b".into(), "c".into()], vec![], TaskAction::Noop);

        let plan = ExecutionPlan::for_root(&g, "d").unwrap();
        let tasks: Vec<_> = plan.tasks().collect();
        assert_eq!(tasks, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn unknown_root_is_task_not_found() {
        let g = DagGraph::new();
        let err = ExecutionPlan::for_root(&g, "nope").unwrap_err();
        assert!(matches!(err, AssetdagError::TaskNotFound(_)));
    }
}
