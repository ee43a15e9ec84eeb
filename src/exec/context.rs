// src/exec/context.rs

use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::{Arc, OnceLock};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::bundle::{ScriptBundleBuilder, ScriptBundler, bundle_outcome};
use crate::config::BuildConfig;
use crate::engine::{BatchOutcome, CoreRuntime, RebuildBackend, Runtime, RuntimeEvent};
use crate::errors::{BuildloopError, Result};
use crate::exec::command::run_check;
use crate::exec::files;
use crate::fs::FileSystem;
use crate::server::{DevServerBridge, ReloadHub};
use crate::session::{self, SharedSession};
use crate::style::{StyleReport, StyleSheetBuilder, discover};
use crate::types::{ReloadKind, WatchTarget};
use crate::watch::{ChangeFilter, WatchProfiles, WatcherHandle, spawn_watcher};

/// Capacity of the watch runtime's event channel.
const RUNTIME_CHANNEL_CAPACITY: usize = 64;

struct WatchSession {
    _watcher: WatcherHandle,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    runtime: Option<JoinHandle<Result<()>>>,
}

/// Everything the task actions and watch-mode rebuilds operate on.
///
/// The configuration is shared read-only; per-process state lives in the
/// [`SharedSession`]. The reload hub and server bridge are created lazily by
/// the first `server:start`.
pub struct BuildContext<B: ScriptBundler> {
    cfg: Arc<BuildConfig>,
    root: PathBuf,
    fs: Arc<dyn FileSystem>,
    session: SharedSession,
    scripts: ScriptBundleBuilder<B>,
    styles: StyleSheetBuilder,
    hub: OnceLock<Arc<ReloadHub>>,
    bridge: OnceLock<Arc<DevServerBridge>>,
    watch: tokio::sync::Mutex<Option<WatchSession>>,
}

impl<B: ScriptBundler> fmt::Debug for BuildContext<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildContext")
            .field("root", &self.root)
            .field("dist", &self.cfg.dist)
            .finish_non_exhaustive()
    }
}

impl<B: ScriptBundler + 'static> BuildContext<B> {
    pub fn new(
        cfg: Arc<BuildConfig>,
        root: impl Into<PathBuf>,
        fs: Arc<dyn FileSystem>,
        session: SharedSession,
        bundler: B,
    ) -> Self {
        let root = root.into();
        Self {
            scripts: ScriptBundleBuilder::new(bundler, &cfg, root.clone()),
            styles: StyleSheetBuilder::new(&cfg, root.clone()),
            cfg,
            root,
            fs,
            session,
            hub: OnceLock::new(),
            bridge: OnceLock::new(),
            watch: tokio::sync::Mutex::new(None),
        }
    }

    pub fn config(&self) -> &BuildConfig {
        &self.cfg
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn session(&self) -> &SharedSession {
        &self.session
    }

    fn dist_dir(&self) -> PathBuf {
        self.root.join(&self.cfg.dist)
    }

    fn is_watch(&self) -> bool {
        session::lock(&self.session).is_watch()
    }

    pub fn clean(&self) -> Result<()> {
        files::clean(self.fs.as_ref(), &self.dist_dir())
    }

    /// Copy the markup file; in watch mode with the reload client injected.
    pub fn copy_markup(&self) -> Result<()> {
        let reload_port = if self.is_watch() {
            Some(self.hub.get().map_or(self.cfg.server.port, |hub| hub.port()))
        } else {
            None
        };
        let source = self.root.join(&self.cfg.sources.html);
        files::copy_markup(self.fs.as_ref(), &source, &self.dist_dir(), reload_port)
    }

    /// Bundle scripts under the session's error policy.
    pub async fn bundle_scripts(&self) -> Result<()> {
        let result = self.scripts.build(self.fs.as_ref(), &self.session).await;
        bundle_outcome(result, self.is_watch()).map(|_| ())
    }

    /// Discover style-sheets from the current module graph and compile them.
    pub async fn compile_styles(&self) -> Result<StyleReport> {
        let cache = session::lock(&self.session).sources().clone();
        let fs = Arc::clone(&self.fs);
        let root = self.root.clone();
        let globs = self.cfg.sources.scss.clone();
        let builder = self.styles.clone();

        tokio::task::spawn_blocking(move || {
            let paths = discover(fs.as_ref(), &root, &cache, &globs)?;
            info!(count = paths.len(), "compiling style-sheets");
            builder.compile(fs.as_ref(), &paths)
        })
        .await
        .map_err(|e| BuildloopError::Other(e.into()))?
    }

    pub async fn lint(&self, task: &str, cmdline: &str) -> Result<()> {
        run_check(task, cmdline, &self.root).await
    }

    pub fn configure_watch(&self) {
        session::lock(&self.session).enable_watch();
    }

    /// Start the file watcher and the watch runtime (once).
    pub async fn start_watch(self: &Arc<Self>) -> Result<()> {
        let mut slot = self.watch.lock().await;
        if slot.is_some() {
            debug!("watcher already running");
            return Ok(());
        }

        let watch_root = self.root.canonicalize().unwrap_or_else(|_| self.root.clone());
        let profiles = WatchProfiles::from_config(&self.cfg)?;
        let filter = ChangeFilter::new(
            Arc::clone(&self.fs),
            watch_root,
            profiles,
            Arc::clone(&self.session),
            self.cfg.watch.use_hash,
        );

        let (tx, rx) = mpsc::channel(RUNTIME_CHANNEL_CAPACITY);
        let watcher = spawn_watcher(filter, tx.clone())?;

        let core = CoreRuntime::new(self.cfg.watch.rebuild_policy);
        let runtime = Runtime::new(core, rx, tx.clone(), Arc::clone(self));
        let handle = tokio::spawn(runtime.run());

        *slot = Some(WatchSession {
            _watcher: watcher,
            runtime_tx: tx,
            runtime: Some(handle),
        });

        info!(policy = ?self.cfg.watch.rebuild_policy, "watching for changes");
        Ok(())
    }

    pub async fn is_watching(&self) -> bool {
        self.watch.lock().await.is_some()
    }

    /// Sender into the watch runtime, once it is running.
    pub async fn runtime_sender(&self) -> Option<mpsc::Sender<RuntimeEvent>> {
        self.watch.lock().await.as_ref().map(|w| w.runtime_tx.clone())
    }

    /// Bind the reload channel and start the backing server.
    pub async fn start_server(&self) -> Result<()> {
        let hub = match self.hub.get() {
            Some(hub) => Arc::clone(hub),
            None => {
                let hub = Arc::new(ReloadHub::bind(self.cfg.server.port)?);
                Arc::clone(self.hub.get_or_init(|| hub))
            }
        };

        let bridge = match self.bridge.get() {
            Some(bridge) => Arc::clone(bridge),
            None => {
                let bridge = DevServerBridge::new(
                    Arc::clone(&self.cfg),
                    self.root.clone(),
                    Arc::clone(&self.session),
                )?
                .with_reload(hub);
                Arc::clone(self.bridge.get_or_init(|| Arc::new(bridge)))
            }
        };

        bridge.start().await?;
        Ok(())
    }

    /// Push a notification to connected browsers, if the channel is up.
    pub fn push_reload(&self, kind: ReloadKind) {
        match self.hub.get() {
            Some(hub) => hub.notify(kind),
            None => debug!(message = kind.message(), "reload channel not started; skipping"),
        }
    }

    /// Wait until the watch runtime stops (see [`BuildContext::request_shutdown`]).
    pub async fn wait_for_runtime(&self) -> Result<()> {
        let handle = {
            let mut slot = self.watch.lock().await;
            slot.as_mut().and_then(|w| w.runtime.take())
        };
        match handle {
            Some(handle) => handle.await.map_err(|e| BuildloopError::Other(e.into()))?,
            None => Ok(()),
        }
    }

    pub async fn request_shutdown(&self) {
        if let Some(tx) = self.runtime_sender().await {
            let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
        }
    }

    /// Stop watching and stop the server.
    pub async fn shutdown(&self) {
        self.watch.lock().await.take();
        if let Some(bridge) = self.bridge.get() {
            bridge.stop().await;
        }
    }

    async fn rebuild_target(&self, target: WatchTarget) -> Result<()> {
        match target {
            WatchTarget::Markup => self.copy_markup(),
            WatchTarget::Scripts => self
                .scripts
                .build(self.fs.as_ref(), &self.session)
                .await
                .map(|_| ()),
            WatchTarget::Styles => self.compile_styles().await.map(|_| ()),
            WatchTarget::Server => Ok(()),
        }
    }
}

impl<B: ScriptBundler + 'static> RebuildBackend for BuildContext<B> {
    fn rebuild(
        &self,
        targets: Vec<WatchTarget>,
    ) -> Pin<Box<dyn Future<Output = BatchOutcome> + Send + '_>> {
        Box::pin(async move {
            let mut failed = Vec::new();
            for &target in &targets {
                if let Err(err) = self.rebuild_target(target).await {
                    error!(%target, error = %err, "rebuild failed");
                    failed.push(target);
                }
            }
            BatchOutcome { targets, failed }
        })
    }

    fn restart_server(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            match self.bridge.get() {
                Some(bridge) => bridge.restart().await.map(|_| ()),
                None => {
                    warn!("server change detected but the server was never started");
                    Ok(())
                }
            }
        })
    }

    fn notify_reload(&self, kind: ReloadKind) {
        self.push_reload(kind);
    }
}
