// src/exec/backend.rs

//! Pluggable action backend.
//!
//! The orchestrator talks to an `ActionBackend` instead of calling the
//! builders directly, so tests can swap in a fake that records which
//! actions ran (and in which order) without touching the filesystem.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;

use crate::bundle::{EsbuildBundler, ScriptBundler};
use crate::config::BuildConfig;
use crate::dag::{Action, TaskName};
use crate::errors::Result;
use crate::exec::context::BuildContext;
use crate::fs::FileSystem;
use crate::session::SharedSession;
use crate::types::ReloadKind;

/// Trait abstracting how task actions are executed.
pub trait ActionBackend: Send + Sync {
    /// Perform `action` on behalf of `task`.
    fn run_action(
        &self,
        task: TaskName,
        action: Action,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Production backend: runs the builders, linters, watcher and server.
#[derive(Debug)]
pub struct RealActions<B: ScriptBundler + 'static = EsbuildBundler> {
    ctx: Arc<BuildContext<B>>,
}

impl RealActions<EsbuildBundler> {
    pub fn new(
        cfg: Arc<BuildConfig>,
        root: impl Into<PathBuf>,
        fs: Arc<dyn FileSystem>,
        session: SharedSession,
    ) -> Self {
        let bundler = EsbuildBundler::new(cfg.script.bundler.clone());
        Self::with_bundler(cfg, root, fs, session, bundler)
    }
}

impl<B: ScriptBundler + 'static> RealActions<B> {
    pub fn with_bundler(
        cfg: Arc<BuildConfig>,
        root: impl Into<PathBuf>,
        fs: Arc<dyn FileSystem>,
        session: SharedSession,
        bundler: B,
    ) -> Self {
        Self {
            ctx: Arc::new(BuildContext::new(cfg, root, fs, session, bundler)),
        }
    }

    pub fn context(&self) -> &Arc<BuildContext<B>> {
        &self.ctx
    }
}

impl<B: ScriptBundler + 'static> ActionBackend for RealActions<B> {
    fn run_action(
        &self,
        task: TaskName,
        action: Action,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            let ctx = &self.ctx;
            let lint = &ctx.config().lint;

            match action {
                Action::Clean => ctx.clean(),
                Action::CopyMarkup => ctx.copy_markup(),
                Action::BundleScripts => ctx.bundle_scripts().await,
                Action::CompileStyles => ctx.compile_styles().await.map(|_| ()),
                Action::LintStyles => ctx.lint(&task, &lint.scss).await,
                Action::LintScripts => ctx.lint(&task, &lint.js).await,
                Action::ValidateMarkup => ctx.lint(&task, &lint.html).await,
                Action::ConfigureWatch => {
                    ctx.configure_watch();
                    Ok(())
                }
                Action::Watch => ctx.start_watch().await,
                Action::StartServer => ctx.start_server().await,
                Action::ReloadBrowsers => {
                    ctx.push_reload(ReloadKind::Full);
                    Ok(())
                }
            }
        })
    }
}
