// src/engine/runtime.rs

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::errors::Result;
use crate::types::{ReloadKind, WatchTarget};

use super::core::CoreRuntime;
use super::{BatchOutcome, CoreCommand, RuntimeEvent};

/// What the runtime needs from the outside world to act on its commands.
///
/// Production uses the build context of the running task session; tests
/// provide a recording fake.
pub trait RebuildBackend: Send + Sync + 'static {
    /// Rebuild `targets` in order. Errors are reported per target in the
    /// outcome, never as a failed future.
    fn rebuild(
        &self,
        targets: Vec<WatchTarget>,
    ) -> Pin<Box<dyn Future<Output = BatchOutcome> + Send + '_>>;

    fn restart_server(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    fn notify_reload(&self, kind: ReloadKind);
}

/// Drives the [`CoreRuntime`] from `RuntimeEvent`s and carries out its
/// commands through a [`RebuildBackend`].
///
/// Rebuilds and server restarts run as separate Tokio tasks, so the loop
/// keeps receiving (and queueing) changes while they are in progress.
pub struct Runtime<R: RebuildBackend> {
    core: CoreRuntime,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    event_tx: mpsc::Sender<RuntimeEvent>,
    backend: Arc<R>,
}

impl<R: RebuildBackend> fmt::Debug for Runtime<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

impl<R: RebuildBackend> Runtime<R> {
    /// `event_tx` must feed `event_rx`; finished batches and restarts are
    /// reported through it.
    pub fn new(
        core: CoreRuntime,
        event_rx: mpsc::Receiver<RuntimeEvent>,
        event_tx: mpsc::Sender<RuntimeEvent>,
        backend: Arc<R>,
    ) -> Self {
        Self {
            core,
            event_rx,
            event_tx,
            backend,
        }
    }

    /// Main event loop.
    ///
    /// - Consumes `RuntimeEvent`s from `event_rx`.
    /// - Feeds them into the core runtime.
    /// - Executes the commands returned by the core.
    pub async fn run(mut self) -> Result<()> {
        info!("watch runtime started");

        loop {
            let event = match self.event_rx.recv().await {
                Some(e) => e,
                None => {
                    info!("runtime event channel closed; exiting");
                    break;
                }
            };

            debug!(?event, "runtime received event");

            let step = self.core.step(event);

            for command in step.commands {
                self.execute_command(command);
            }

            if !step.keep_running {
                info!("core requested exit; stopping runtime");
                break;
            }
        }

        info!("runtime exiting");
        Ok(())
    }

    fn execute_command(&self, command: CoreCommand) {
        match command {
            CoreCommand::DispatchRebuild(targets) => {
                info!(?targets, "rebuilding");
                let backend = Arc::clone(&self.backend);
                let tx = self.event_tx.clone();
                tokio::spawn(async move {
                    let outcome = backend.rebuild(targets).await;
                    if tx.send(RuntimeEvent::RebuildCompleted(outcome)).await.is_err() {
                        debug!("runtime stopped before the rebuild finished");
                    }
                });
            }
            CoreCommand::RestartServer => {
                let backend = Arc::clone(&self.backend);
                let tx = self.event_tx.clone();
                tokio::spawn(async move {
                    if let Err(err) = backend.restart_server().await {
                        error!(error = %err, "server restart failed");
                    }
                    if tx.send(RuntimeEvent::RestartCompleted).await.is_err() {
                        debug!("runtime stopped before the restart finished");
                    }
                });
            }
            CoreCommand::NotifyReload(kind) => {
                self.backend.notify_reload(kind);
            }
            CoreCommand::RequestExit => {
                info!("core issued RequestExit command");
            }
        }
    }
}
