// src/dag/registry.rs

//! The built-in task graph.

use crate::dag::graph::{TaskDef, TaskGraph};
use crate::dag::task_info::Action;
use crate::errors::Result;

pub const CLEAN: &str = "clean";
pub const HTML: &str = "html";
pub const BUILD_JS: &str = "build:js";
pub const BUILD_SASS: &str = "build:sass";
pub const BUILD_ASSETS: &str = "build:assets";
pub const BUILD_OUTPUT: &str = "build:output";
pub const BUILD: &str = "build";
pub const LINT_SCSS: &str = "lint:scss";
pub const LINT_JS: &str = "lint:js";
pub const VALIDATE_HTML: &str = "validate-html";
pub const LINT: &str = "lint";
pub const CONFIGURE_WATCHER: &str = "configure:watcher";
pub const WATCH: &str = "watch";
pub const SERVER_START: &str = "server:start";
pub const RELOAD: &str = "reload";
pub const START: &str = "start";
pub const DEFAULT: &str = "default";

/// Build and validate the task graph every `buildloop` invocation uses.
///
/// - `build` = clean, then {html | (build:js, then build:sass)}
/// - `lint` = {lint:scss | lint:js | validate-html}
/// - `start` = configure:watcher, build, watch, server:start
/// - `default` = clean
pub fn builtin_task_graph() -> Result<TaskGraph> {
    TaskGraph::builder()
        .register(CLEAN, TaskDef::action(Action::Clean))
        .register(HTML, TaskDef::action(Action::CopyMarkup))
        .register(BUILD_JS, TaskDef::action(Action::BundleScripts))
        .register(BUILD_SASS, TaskDef::action(Action::CompileStyles))
        // Styles run after scripts: discovery reads the module graph the
        // bundler just recorded.
        .register(BUILD_ASSETS, TaskDef::series(&[BUILD_JS, BUILD_SASS]))
        .register(BUILD_OUTPUT, TaskDef::parallel(&[HTML, BUILD_ASSETS]))
        .register(BUILD, TaskDef::series(&[CLEAN, BUILD_OUTPUT]))
        .register(LINT_SCSS, TaskDef::action(Action::LintStyles))
        .register(LINT_JS, TaskDef::action(Action::LintScripts))
        .register(VALIDATE_HTML, TaskDef::action(Action::ValidateMarkup))
        .register(LINT, TaskDef::parallel(&[LINT_SCSS, LINT_JS, VALIDATE_HTML]))
        .register(CONFIGURE_WATCHER, TaskDef::action(Action::ConfigureWatch))
        .register(WATCH, TaskDef::action(Action::Watch))
        .register(SERVER_START, TaskDef::action(Action::StartServer))
        .register(RELOAD, TaskDef::action(Action::ReloadBrowsers))
        .register(
            START,
            TaskDef::series(&[CONFIGURE_WATCHER, BUILD, WATCH, SERVER_START]),
        )
        .register(DEFAULT, TaskDef::series(&[CLEAN]))
        .build()
}
