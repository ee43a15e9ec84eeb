// src/bundle/builder.rs

use std::path::{Path, PathBuf};

use tracing::{error, info, warn};

use crate::bundle::bundler::{BundleRequest, ScriptBundler};
use crate::bundle::metafile::parse_inputs;
use crate::config::BuildConfig;
use crate::errors::{BuildloopError, Result};
use crate::fs::FileSystem;
use crate::session::{self, SharedSession};

/// Directory (relative to the project root) for build bookkeeping files.
pub const STATE_DIR: &str = ".buildloop";

/// Result of a successful bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleReport {
    pub outfile: PathBuf,
    /// Files in the module graph reported by this build.
    pub inputs: usize,
    /// How many of them were not in the source cache before.
    pub new_inputs: usize,
}

/// Bundles the script entry point and records its module graph in the
/// session's source cache.
#[derive(Debug)]
pub struct ScriptBundleBuilder<B: ScriptBundler> {
    bundler: B,
    request: BundleRequest,
}

impl<B: ScriptBundler> ScriptBundleBuilder<B> {
    pub fn new(bundler: B, cfg: &BuildConfig, root: impl Into<PathBuf>) -> Self {
        let request = BundleRequest {
            root: root.into(),
            entry_point: cfg.script.entry_point.clone(),
            outfile: cfg.dist.join(cfg.bundle_file_name()),
            metafile: Path::new(STATE_DIR).join(format!("{}.meta.json", cfg.script.dest_name)),
            extra_args: cfg.script.bundler_args.clone(),
        };
        Self { bundler, request }
    }

    pub fn request(&self) -> &BundleRequest {
        &self.request
    }

    pub fn bundler(&self) -> &B {
        &self.bundler
    }

    /// Run the bundler, then add every module it reported to the source
    /// cache.
    pub async fn build(&self, fs: &dyn FileSystem, session: &SharedSession) -> Result<BundleReport> {
        info!(entry = %self.request.entry_point, "bundling scripts");
        self.bundler.bundle(&self.request).await?;

        let meta_path = self.request.root.join(&self.request.metafile);
        let json = fs.read_to_string(&meta_path).map_err(|e| {
            BuildloopError::BundleError(format!("reading metafile {:?}: {:#}", meta_path, e))
        })?;
        let inputs = parse_inputs(&json)?;

        let mut guard = session::lock(session);
        let cache = guard.sources_mut();
        let new_inputs = inputs.iter().filter(|p| cache.observe(p.as_str())).count();
        let total = cache.len();
        drop(guard);

        info!(
            inputs = inputs.len(),
            new_inputs,
            cached = total,
            "module graph recorded"
        );

        Ok(BundleReport {
            outfile: self.request.outfile.clone(),
            inputs: inputs.len(),
            new_inputs,
        })
    }
}

/// Apply the bundle error policy.
///
/// Outside watch mode a failed bundle fails the task. In watch mode the
/// error is logged and swallowed so the loop keeps running.
pub fn bundle_outcome(result: Result<BundleReport>, watch: bool) -> Result<Option<BundleReport>> {
    match result {
        Ok(report) => Ok(Some(report)),
        Err(err) if watch => {
            warn!("bundle failed; keeping the previous output while watching");
            error!(error = %err, "script bundle error");
            Ok(None)
        }
        Err(err) => Err(err),
    }
}
