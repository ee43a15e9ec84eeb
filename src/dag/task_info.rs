// src/dag/task_info.rs

//! Task actions and per-run bookkeeping.

use std::collections::BTreeMap;
use std::fmt;

use crate::dag::TaskName;

/// Built-in unit of work a task can perform once its dependencies are done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Remove the output directory.
    Clean,
    /// Copy the markup file into the output directory.
    CopyMarkup,
    /// Run the script bundler.
    BundleScripts,
    /// Discover and compile style-sheets.
    CompileStyles,
    /// Run the configured style lint command.
    LintStyles,
    /// Run the configured script lint command.
    LintScripts,
    /// Run the configured markup validation command.
    ValidateMarkup,
    /// Switch the session into watch mode.
    ConfigureWatch,
    /// Start the file watcher and the rebuild loop.
    Watch,
    /// Start the backing server and the reload channel.
    StartServer,
    /// Push a full reload to connected browsers.
    ReloadBrowsers,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Clean => "clean",
            Action::CopyMarkup => "copy-markup",
            Action::BundleScripts => "bundle-scripts",
            Action::CompileStyles => "compile-styles",
            Action::LintStyles => "lint-styles",
            Action::LintScripts => "lint-scripts",
            Action::ValidateMarkup => "validate-markup",
            Action::ConfigureWatch => "configure-watch",
            Action::Watch => "watch",
            Action::StartServer => "start-server",
            Action::ReloadBrowsers => "reload-browsers",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State of a task within one `Orchestrator::run` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskRunState {
    /// The task was not reached in this run.
    NotInRun,
    /// Dependencies or the action are in progress.
    Running,
    DoneSuccess,
    /// The action failed, or a dependency did and the task was aborted.
    DoneFailed,
}

/// Start/finish of a task's action, in the order they happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionEvent {
    Started(TaskName),
    Finished { task: TaskName, success: bool },
}

/// What happened during one run: per-task state and the action timeline.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    states: BTreeMap<TaskName, TaskRunState>,
    events: Vec<ActionEvent>,
}

impl RunReport {
    pub fn state_of(&self, task: &str) -> TaskRunState {
        self.states
            .get(task)
            .copied()
            .unwrap_or(TaskRunState::NotInRun)
    }

    pub fn events(&self) -> &[ActionEvent] {
        &self.events
    }

    /// Names of tasks whose action started, in start order.
    pub fn started_actions(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|e| match e {
                ActionEvent::Started(name) => Some(name.as_str()),
                ActionEvent::Finished { .. } => None,
            })
            .collect()
    }

    pub(crate) fn set_state(&mut self, task: &str, state: TaskRunState) {
        self.states.insert(task.to_string(), state);
    }

    pub(crate) fn push(&mut self, event: ActionEvent) {
        self.events.push(event);
    }
}
