// src/dag/mod.rs

//! Task graph and one-shot task orchestration.
//!
//! - [`graph`] holds the validated task graph and its builder.
//! - [`registry`] declares the built-in tasks (`build`, `lint`, `start`, ...).
//! - [`orchestrator`] runs a task and its dependencies with series/parallel
//!   composition.
//! - [`task_info`] provides task actions and per-run bookkeeping.

/// Canonical task name type.
pub type TaskName = String;

pub mod graph;
pub mod orchestrator;
pub mod registry;
pub mod task_info;

pub use graph::{Composition, TaskDef, TaskGraph, TaskGraphBuilder};
pub use orchestrator::Orchestrator;
pub use registry::builtin_task_graph;
pub use task_info::{Action, ActionEvent, RunReport, TaskRunState};
