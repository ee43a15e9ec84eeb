// src/engine/mod.rs

//! Watch-mode rebuild engine.
//!
//! This module ties together:
//! - the trigger queue (what happens to changes that arrive mid-rebuild)
//! - the main runtime event loop that reacts to:
//!   - file changes
//!   - finished rebuild batches and server restarts
//!   - shutdown signals
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`].

use crate::types::WatchTarget;

/// Result of one rebuild batch.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BatchOutcome {
    /// Targets rebuilt in this batch, in execution order.
    pub targets: Vec<WatchTarget>,
    /// The subset whose rebuild reported an error.
    pub failed: Vec<WatchTarget>,
}

impl BatchOutcome {
    pub fn succeeded(&self) -> impl Iterator<Item = WatchTarget> + '_ {
        self.targets.iter().copied().filter(|t| !self.failed.contains(t))
    }
}

/// Events flowing into the runtime from the watcher and rebuild tasks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeEvent {
    /// A file relevant to `target` changed (`path` is root-relative).
    Changed { target: WatchTarget, path: String },
    /// The in-flight rebuild batch finished.
    RebuildCompleted(BatchOutcome),
    /// The running server restart finished, successfully or not.
    RestartCompleted,
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

pub mod core;
pub mod event_handlers;
pub mod queue;
pub mod runtime;

pub use core::CoreRuntime;
pub use event_handlers::{CoreCommand, CoreStep};
pub use queue::TriggerQueue;
pub use runtime::{RebuildBackend, Runtime};
