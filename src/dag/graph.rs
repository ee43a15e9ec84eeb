// src/dag/graph.rs

use std::collections::{BTreeMap, HashMap};

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::dag::TaskName;
use crate::dag::task_info::Action;
use crate::errors::{BuildloopError, Result};

/// How a task's dependencies are run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Composition {
    /// One after another, in declaration order; stop at the first failure.
    #[default]
    Series,
    /// All at once; the task fails if any of them failed.
    Parallel,
}

/// Declaration of a single task.
#[derive(Debug, Clone, Default)]
pub struct TaskDef {
    pub depends_on: Vec<TaskName>,
    pub composition: Composition,
    /// Runs after every dependency succeeded. Pure composite tasks have none.
    pub action: Option<Action>,
}

impl TaskDef {
    /// A leaf task with a single action and no dependencies.
    pub fn action(action: Action) -> Self {
        Self {
            action: Some(action),
            ..Self::default()
        }
    }

    pub fn series(deps: &[&str]) -> Self {
        Self {
            depends_on: deps.iter().map(|d| d.to_string()).collect(),
            composition: Composition::Series,
            action: None,
        }
    }

    pub fn parallel(deps: &[&str]) -> Self {
        Self {
            depends_on: deps.iter().map(|d| d.to_string()).collect(),
            composition: Composition::Parallel,
            action: None,
        }
    }

    pub fn with_action(mut self, action: Action) -> Self {
        self.action = Some(action);
        self
    }
}

/// Collects task declarations; [`TaskGraphBuilder::build`] validates them.
#[derive(Debug, Default)]
pub struct TaskGraphBuilder {
    tasks: BTreeMap<TaskName, TaskDef>,
    duplicates: Vec<TaskName>,
}

impl TaskGraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, name: impl Into<TaskName>, def: TaskDef) -> Self {
        let name = name.into();
        if self.tasks.contains_key(&name) {
            self.duplicates.push(name.clone());
        }
        self.tasks.insert(name, def);
        self
    }

    /// Validate and freeze the graph.
    ///
    /// This checks:
    /// - there is at least one task
    /// - no task is registered twice
    /// - all dependencies refer to registered tasks, and none to itself
    /// - the graph has no cycles
    pub fn build(self) -> Result<TaskGraph> {
        ensure_has_tasks(&self.tasks)?;

        if let Some(name) = self.duplicates.first() {
            return Err(BuildloopError::ConfigError(format!(
                "task '{}' is registered more than once",
                name
            )));
        }

        validate_task_dependencies(&self.tasks)?;
        validate_dag(&self.tasks)?;

        Ok(TaskGraph::new(self.tasks))
    }
}

fn ensure_has_tasks(tasks: &BTreeMap<TaskName, TaskDef>) -> Result<()> {
    if tasks.is_empty() {
        return Err(BuildloopError::ConfigError(
            "task graph must contain at least one task".to_string(),
        ));
    }
    Ok(())
}

fn validate_task_dependencies(tasks: &BTreeMap<TaskName, TaskDef>) -> Result<()> {
    for (name, def) in tasks.iter() {
        for dep in def.depends_on.iter() {
            if dep == name {
                return Err(BuildloopError::ConfigError(format!(
                    "task '{}' cannot depend on itself",
                    name
                )));
            }
            if !tasks.contains_key(dep) {
                return Err(BuildloopError::ConfigError(format!(
                    "task '{}' has unknown dependency '{}'",
                    name, dep
                )));
            }
        }
    }
    Ok(())
}

fn validate_dag(tasks: &BTreeMap<TaskName, TaskDef>) -> Result<()> {
    // Edge direction: dep -> task.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in tasks.keys() {
        graph.add_node(name.as_str());
    }

    for (name, def) in tasks.iter() {
        for dep in def.depends_on.iter() {
            graph.add_edge(dep.as_str(), name.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(BuildloopError::DagCycle(format!(
            "cycle detected in task graph involving task '{}'",
            cycle.node_id()
        ))),
    }
}

/// Validated, read-only task graph.
#[derive(Debug, Clone)]
pub struct TaskGraph {
    tasks: BTreeMap<TaskName, TaskDef>,
    dependents: HashMap<TaskName, Vec<TaskName>>,
}

impl TaskGraph {
    fn new(tasks: BTreeMap<TaskName, TaskDef>) -> Self {
        let mut dependents: HashMap<TaskName, Vec<TaskName>> = HashMap::new();
        for (name, def) in tasks.iter() {
            for dep in def.depends_on.iter() {
                dependents.entry(dep.clone()).or_default().push(name.clone());
            }
        }

        Self { tasks, dependents }
    }

    pub fn builder() -> TaskGraphBuilder {
        TaskGraphBuilder::new()
    }

    pub fn get(&self, name: &str) -> Option<&TaskDef> {
        self.tasks.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    /// All task names, sorted.
    pub fn tasks(&self) -> impl Iterator<Item = &str> {
        self.tasks.keys().map(|s| s.as_str())
    }

    /// Immediate dependencies of a task.
    pub fn dependencies_of(&self, name: &str) -> &[TaskName] {
        self.tasks
            .get(name)
            .map(|d| d.depends_on.as_slice())
            .unwrap_or(&[])
    }

    /// Immediate dependents of a task (tasks that list it as a dependency).
    pub fn dependents_of(&self, name: &str) -> &[TaskName] {
        self.dependents
            .get(name)
            .map(|d| d.as_slice())
            .unwrap_or(&[])
    }

    /// Flattened list of `(task, action)` pairs in the order a run would
    /// start them; members of a parallel group appear in declaration order.
    pub fn action_plan(&self, name: &str) -> Result<Vec<(TaskName, Action)>> {
        if !self.contains(name) {
            return Err(BuildloopError::TaskNotFound(name.to_string()));
        }
        let mut plan = Vec::new();
        self.collect_plan(name, &mut plan);
        Ok(plan)
    }

    fn collect_plan(&self, name: &str, plan: &mut Vec<(TaskName, Action)>) {
        if let Some(def) = self.tasks.get(name) {
            for dep in def.depends_on.iter() {
                self.collect_plan(dep, plan);
            }
            if let Some(action) = def.action {
                plan.push((name.to_string(), action));
            }
        }
    }
}
