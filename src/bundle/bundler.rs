// src/bundle/bundler.rs

use std::fmt::Debug;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use tokio::process::Command;
use tracing::{debug, info};

use crate::errors::{BuildloopError, Result};
use crate::exec::command::run_command;

/// Everything a bundler needs for one invocation. Paths are relative to
/// `root`, which is also the working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleRequest {
    pub root: PathBuf,
    pub entry_point: String,
    /// Minified output; the source map is written next to it as `<outfile>.map`.
    pub outfile: PathBuf,
    /// JSON description of the module graph (`inputs` keyed by path).
    pub metafile: PathBuf,
    pub extra_args: Vec<String>,
}

/// Turns an entry module into a single minified script.
///
/// Production uses [`EsbuildBundler`]; tests substitute their own.
pub trait ScriptBundler: Send + Sync + Debug {
    fn bundle<'a>(
        &'a self,
        request: &'a BundleRequest,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;
}

/// Runs an esbuild-compatible binary.
#[derive(Debug, Clone)]
pub struct EsbuildBundler {
    program: String,
}

impl EsbuildBundler {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Command-line arguments for `request`.
    pub fn args(&self, request: &BundleRequest) -> Vec<String> {
        let mut args = vec![
            request.entry_point.clone(),
            "--bundle".to_string(),
            "--minify".to_string(),
            "--sourcemap".to_string(),
            format!("--outfile={}", slash_path(&request.outfile)),
            format!("--metafile={}", slash_path(&request.metafile)),
        ];
        args.extend(request.extra_args.iter().cloned());
        args
    }
}

fn slash_path(path: &std::path::Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

impl ScriptBundler for EsbuildBundler {
    fn bundle<'a>(
        &'a self,
        request: &'a BundleRequest,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            if let Some(parent) = request.metafile.parent() {
                tokio::fs::create_dir_all(request.root.join(parent)).await?;
            }

            let args = self.args(request);
            debug!(program = %self.program, ?args, "invoking bundler");

            let mut cmd = Command::new(&self.program);
            cmd.args(&args);

            let output = run_command(&self.program, cmd, &request.root)
                .await
                .map_err(|e| BuildloopError::BundleError(format!("{:#}", e)))?;

            if !output.success {
                let status = output
                    .code
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "signal".to_string());
                return Err(BuildloopError::BundleError(format!(
                    "{} exited with status {}: {}",
                    self.program,
                    status,
                    output.stderr.trim()
                )));
            }

            info!(outfile = ?request.outfile, "bundle written");
            Ok(())
        })
    }
}
