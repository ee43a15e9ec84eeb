// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! This module contains a synchronous, deterministic "core runtime" that
//! consumes [`RuntimeEvent`]s and produces:
//! - an updated core state
//! - a list of "commands" describing what the IO shell should do next
//!
//! The async shell (`engine::runtime::Runtime`) reads events from the
//! channel and carries out the commands. The core has no channels, no
//! Tokio types and performs no IO, so it can be tested directly.

use crate::engine::RuntimeEvent;
use crate::engine::event_handlers::{
    CoreCommand, CoreStep, RestartState, handle_change, handle_completion,
    handle_restart_completion, handle_server_change,
};
use crate::engine::queue::TriggerQueue;
use crate::types::{RebuildPolicy, WatchTarget};

/// Pure core runtime state.
///
/// At most one rebuild batch is in flight; changes arriving meanwhile wait in
/// the [`TriggerQueue`]. Server restarts are tracked separately and run
/// alongside rebuilds, one at a time.
#[derive(Debug)]
pub struct CoreRuntime {
    in_flight: Option<Vec<WatchTarget>>,
    queue: TriggerQueue,
    restart: RestartState,
}

impl CoreRuntime {
    pub fn new(policy: RebuildPolicy) -> Self {
        Self {
            in_flight: None,
            queue: TriggerQueue::new(policy),
            restart: RestartState::default(),
        }
    }

    /// No batch is running.
    pub fn is_idle(&self) -> bool {
        self.in_flight.is_none()
    }

    pub fn in_flight(&self) -> Option<&[WatchTarget]> {
        self.in_flight.as_deref()
    }

    pub fn queue_is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn restart_in_flight(&self) -> bool {
        self.restart.in_flight
    }

    /// Handle a single runtime event, updating core state and returning the
    /// resulting commands for the IO shell.
    pub fn step(&mut self, event: RuntimeEvent) -> CoreStep {
        match event {
            RuntimeEvent::Changed {
                target: WatchTarget::Server,
                ..
            } => handle_server_change(&mut self.restart),
            RuntimeEvent::Changed { target, .. } => {
                handle_change(&mut self.in_flight, &mut self.queue, target)
            }
            RuntimeEvent::RestartCompleted => handle_restart_completion(&mut self.restart),
            RuntimeEvent::RebuildCompleted(outcome) => {
                handle_completion(&mut self.in_flight, &mut self.queue, outcome)
            }
            RuntimeEvent::ShutdownRequested => CoreStep {
                commands: vec![CoreCommand::RequestExit],
                keep_running: false,
            },
        }
    }
}
