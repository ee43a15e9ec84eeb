// src/server/bridge.rs

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use regex::Regex;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

use crate::config::BuildConfig;
use crate::errors::{BuildloopError, Result};
use crate::server::reload::ReloadHub;
use crate::session::{self, SharedSession};
use crate::types::ReloadKind;

/// Environment variable the backing server reads its port from.
pub const SERVER_PORT_ENV: &str = "SERVER_PORT";

/// Lifecycle of the backing server process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BridgeState {
    #[default]
    Stopped,
    Starting,
    Running,
    Restarting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeEvent {
    StartRequested,
    /// The process spawned, or printed its readiness line.
    Ready,
    RestartRequested,
    /// The process went away on its own.
    Exited,
}

impl BridgeState {
    /// Next state after `event`. Events that make no sense in the current
    /// state leave it unchanged.
    pub fn on(self, event: BridgeEvent) -> BridgeState {
        use BridgeEvent::*;
        use BridgeState::*;

        match (self, event) {
            (Stopped, StartRequested) => Starting,
            (Starting | Restarting, Ready) => Running,
            (Running | Starting, RestartRequested) => Restarting,
            // A restart after a crash is just a start.
            (Stopped, RestartRequested) => Starting,
            (_, Exited) => Stopped,
            (state, _) => state,
        }
    }
}

struct RunningProcess {
    cancel_tx: oneshot::Sender<()>,
    done_rx: oneshot::Receiver<()>,
}

/// Launches the backing server, restarts it on demand and tells browsers
/// to reload once a restarted server had time to settle.
pub struct DevServerBridge {
    cfg: Arc<BuildConfig>,
    root: PathBuf,
    session: SharedSession,
    ready_pattern: Option<Regex>,
    hub: Option<Arc<ReloadHub>>,
    state: Arc<Mutex<BridgeState>>,
    generation: Arc<AtomicU64>,
    process: tokio::sync::Mutex<Option<RunningProcess>>,
}

impl std::fmt::Debug for DevServerBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DevServerBridge")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl DevServerBridge {
    pub fn new(cfg: Arc<BuildConfig>, root: impl Into<PathBuf>, session: SharedSession) -> Result<Self> {
        let ready_pattern = match cfg.server.ready_on_stdout.as_deref() {
            Some(pat) => Some(Regex::new(pat).map_err(|e| {
                BuildloopError::ConfigError(format!("invalid server.ready_on_stdout: {}", e))
            })?),
            None => None,
        };

        Ok(Self {
            cfg,
            root: root.into(),
            session,
            ready_pattern,
            hub: None,
            state: Arc::new(Mutex::new(BridgeState::Stopped)),
            generation: Arc::new(AtomicU64::new(0)),
            process: tokio::sync::Mutex::new(None),
        })
    }

    /// Send reload notifications through `hub` after restarts.
    pub fn with_reload(mut self, hub: Arc<ReloadHub>) -> Self {
        self.hub = Some(hub);
        self
    }

    pub fn state(&self) -> BridgeState {
        *lock_state(&self.state)
    }

    /// Start the server.
    ///
    /// Returns `true` if this was the first start of the process lifetime.
    pub async fn start(&self) -> Result<bool> {
        if self.state() != BridgeState::Stopped {
            debug!(state = ?self.state(), "server already started");
            return Ok(false);
        }
        self.apply(BridgeEvent::StartRequested);
        self.launch().await
    }

    /// Stop the running process (if any) and start a fresh one.
    pub async fn restart(&self) -> Result<bool> {
        info!("restarting server");
        self.apply(BridgeEvent::RestartRequested);
        self.kill_current().await;
        self.launch().await
    }

    /// Stop the server for good.
    pub async fn stop(&self) {
        self.kill_current().await;
        self.apply(BridgeEvent::Exited);
        info!("server stopped");
    }

    fn apply(&self, event: BridgeEvent) {
        apply_event(&self.state, event);
    }

    async fn kill_current(&self) {
        // Monitors of older generations must not touch the state any more.
        self.generation.fetch_add(1, Ordering::SeqCst);

        let mut process = self.process.lock().await;
        if let Some(running) = process.take() {
            let _ = running.cancel_tx.send(());
            let _ = running.done_rx.await;
        }
    }

    async fn launch(&self) -> Result<bool> {
        let mut process = self.process.lock().await;

        let server = &self.cfg.server;
        info!(
            runner = %server.runner,
            script = %server.script,
            port = server.raw_port,
            "starting server process"
        );

        let mut cmd = Command::new(&server.runner);
        cmd.arg(&server.script)
            .env(SERVER_PORT_ENV, server.raw_port.to_string())
            .envs(&server.env)
            .current_dir(&self.root)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                self.apply(BridgeEvent::Exited);
                return Err(BuildloopError::ProcessStartError(format!(
                    "spawning '{} {}': {}",
                    server.runner, server.script, e
                )));
            }
        };

        let ready_rx = self.forward_output(&mut child);

        if let Some(ready_rx) = ready_rx {
            if let Err(err) = wait_until_ready(&mut child, ready_rx).await {
                self.apply(BridgeEvent::Exited);
                return Err(err);
            }
        }

        self.apply(BridgeEvent::Ready);

        let (cancel_tx, cancel_rx) = oneshot::channel();
        let (done_tx, done_rx) = oneshot::channel();
        let my_generation = self.generation.load(Ordering::SeqCst);
        spawn_monitor(
            child,
            cancel_rx,
            done_tx,
            Arc::clone(&self.state),
            Arc::clone(&self.generation),
            my_generation,
        );
        *process = Some(RunningProcess { cancel_tx, done_rx });
        drop(process);

        let first = session::lock(&self.session).mark_server_started();
        if first {
            info!(url = %self.server_url(), "server started");
            self.open_browser();
        } else {
            debug!(delay_ms = server.settle_delay_ms, "waiting for the server to settle");
            tokio::time::sleep(self.cfg.settle_delay()).await;
            if let Some(hub) = &self.hub {
                hub.notify(ReloadKind::Full);
            }
        }

        Ok(first)
    }

    /// Log the child's output. With a readiness pattern configured, the
    /// returned receiver fires on the first matching stdout line.
    fn forward_output(&self, child: &mut Child) -> Option<oneshot::Receiver<()>> {
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    warn!(target: "buildloop::server", "{}", line);
                }
            });
        }

        let stdout = child.stdout.take()?;
        let pattern = self.ready_pattern.clone();
        let (ready_tx, ready_rx) = oneshot::channel();
        let wants_ready = pattern.is_some();

        tokio::spawn(async move {
            let mut ready_tx = Some(ready_tx);
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                info!(target: "buildloop::server", "{}", line);
                if let Some(re) = &pattern {
                    if re.is_match(&line) {
                        if let Some(tx) = ready_tx.take() {
                            debug!("server printed its readiness line");
                            let _ = tx.send(());
                        }
                    }
                }
            }
        });

        wants_ready.then_some(ready_rx)
    }

    fn server_url(&self) -> String {
        format!("http://localhost:{}", self.cfg.server.raw_port)
    }

    fn open_browser(&self) {
        let Some(browser) = self.cfg.server.browser.as_deref() else {
            return;
        };
        let url = self.server_url();
        match Command::new(browser).arg(&url).stdin(Stdio::null()).spawn() {
            Ok(_) => info!(%browser, %url, "opened browser"),
            Err(e) => warn!(%browser, error = %e, "failed to open browser"),
        }
    }
}

fn lock_state(state: &Mutex<BridgeState>) -> MutexGuard<'_, BridgeState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn apply_event(state: &Mutex<BridgeState>, event: BridgeEvent) {
    let mut guard = lock_state(state);
    let next = guard.on(event);
    if next != *guard {
        debug!(from = ?*guard, to = ?next, ?event, "server state changed");
    }
    *guard = next;
}

async fn wait_until_ready(child: &mut Child, mut ready_rx: oneshot::Receiver<()>) -> Result<()> {
    let ready = tokio::select! {
        ready = &mut ready_rx => ready.is_ok(),
        status = child.wait() => {
            let status = status?;
            return Err(BuildloopError::ProcessStartError(format!(
                "server exited before it was ready (exit status {:?})",
                status.code()
            )));
        }
    };

    if ready {
        return Ok(());
    }

    // stdout closed without the readiness line.
    let status = child.wait().await?;
    Err(BuildloopError::ProcessStartError(format!(
        "server closed its output before it was ready (exit status {:?})",
        status.code()
    )))
}

fn spawn_monitor(
    mut child: Child,
    mut cancel_rx: oneshot::Receiver<()>,
    done_tx: oneshot::Sender<()>,
    state: Arc<Mutex<BridgeState>>,
    generation: Arc<AtomicU64>,
    my_generation: u64,
) {
    tokio::spawn(async move {
        tokio::select! {
            status = child.wait() => {
                match status {
                    Ok(status) => warn!(exit_code = ?status.code(), "server process exited"),
                    Err(e) => error!(error = %e, "failed to wait for server process"),
                }
                if generation.load(Ordering::SeqCst) == my_generation {
                    apply_event(&state, BridgeEvent::Exited);
                    info!("server is down; it will start again on the next change");
                }
            }
            _ = &mut cancel_rx => {
                debug!("stopping server process");
                if let Err(e) = child.kill().await {
                    warn!(error = %e, "failed to kill server process");
                }
            }
        }
        let _ = done_tx.send(());
    });
}
