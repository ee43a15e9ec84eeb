// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use tracing::{debug, info};

use crate::engine::BatchOutcome;
use crate::engine::queue::TriggerQueue;
use crate::types::{ReloadKind, WatchTarget};

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreCommand {
    /// Rebuild these targets, in order, as one batch.
    DispatchRebuild(Vec<WatchTarget>),
    /// Restart the backing server.
    RestartServer,
    /// Tell connected browsers to reload.
    NotifyReload(ReloadKind),
    /// Stop the runtime.
    RequestExit,
}

/// Decision returned by the core after handling a single `RuntimeEvent`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreStep {
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    pub fn running(commands: Vec<CoreCommand>) -> Self {
        Self {
            commands,
            keep_running: true,
        }
    }
}

/// Server restart bookkeeping: at most one restart runs at a time, and any
/// number of changes during it collapse into one follow-up restart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestartState {
    pub in_flight: bool,
    pub pending: bool,
}

/// Handle a changed server file. Restarts never wait for a rebuild batch.
pub fn handle_server_change(restart: &mut RestartState) -> CoreStep {
    if restart.in_flight {
        if !restart.pending {
            debug!("server restart in progress; queueing one more");
        }
        restart.pending = true;
        return CoreStep::running(Vec::new());
    }

    restart.in_flight = true;
    CoreStep::running(vec![CoreCommand::RestartServer])
}

/// Handle the end of a server restart, starting the queued one if any.
pub fn handle_restart_completion(restart: &mut RestartState) -> CoreStep {
    if !restart.in_flight {
        debug!("restart completion without a restart in flight; ignoring");
    }

    if restart.pending {
        restart.pending = false;
        restart.in_flight = true;
        return CoreStep::running(vec![CoreCommand::RestartServer]);
    }

    restart.in_flight = false;
    CoreStep::running(Vec::new())
}

/// Handle a changed script, style-sheet or markup file.
///
/// - If no batch is in flight, a new one starts with this target plus
///   anything still queued.
/// - Otherwise the target is queued for the follow-up batch.
pub fn handle_change(
    in_flight: &mut Option<Vec<WatchTarget>>,
    queue: &mut TriggerQueue,
    target: WatchTarget,
) -> CoreStep {
    if in_flight.is_some() {
        queue.record_trigger(target);
        return CoreStep::running(Vec::new());
    }

    queue.record_trigger(target);
    CoreStep::running(start_batch(in_flight, queue))
}

/// Handle the end of the in-flight batch: notify browsers about what was
/// rebuilt, then start the follow-up batch if changes were queued.
pub fn handle_completion(
    in_flight: &mut Option<Vec<WatchTarget>>,
    queue: &mut TriggerQueue,
    outcome: BatchOutcome,
) -> CoreStep {
    let mut commands = Vec::new();

    if in_flight.take().is_none() {
        debug!("completion without a batch in flight; ignoring");
    }

    if !outcome.failed.is_empty() {
        info!(failed = ?outcome.failed, "rebuild finished with errors");
    }

    if let Some(kind) = outcome
        .succeeded()
        .map(|t| t.reload_kind())
        .reduce(ReloadKind::merge)
    {
        commands.push(CoreCommand::NotifyReload(kind));
    }

    commands.extend(start_batch(in_flight, queue));
    CoreStep::running(commands)
}

fn start_batch(in_flight: &mut Option<Vec<WatchTarget>>, queue: &mut TriggerQueue) -> Vec<CoreCommand> {
    let targets = queue.drain_pending();
    if targets.is_empty() {
        return Vec::new();
    }

    debug!(?targets, "starting rebuild batch");
    *in_flight = Some(targets.clone());
    vec![CoreCommand::DispatchRebuild(targets)]
}
