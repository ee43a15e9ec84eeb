// src/style/compile.rs

use std::path::{Component, Path, PathBuf};

use tracing::{debug, error, info, warn};

use crate::config::BuildConfig;
use crate::errors::{BuildloopError, Result};
use crate::fs::FileSystem;
use crate::style::sourcemap::SourceMapBuilder;

/// Outcome of one stylesheet build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyleReport {
    /// Sources that made it into the output, in output order.
    pub compiled: Vec<PathBuf>,
    /// Sources that failed to compile and were skipped.
    pub failed: Vec<PathBuf>,
    /// Written stylesheet, or `None` when nothing compiled.
    pub output: Option<PathBuf>,
}

/// Compile a single style-sheet with `grass`.
pub fn compile_file(path: &Path) -> Result<String> {
    let options = grass::Options::default().style(grass::OutputStyle::Compressed);
    grass::from_path(path, &options).map_err(|e| BuildloopError::StyleCompileError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Whether `path` names a Sass partial.
fn is_partial(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('_'))
}

/// Compiles style-sheets into one aggregated file plus source map.
#[derive(Debug, Clone)]
pub struct StyleSheetBuilder {
    root: PathBuf,
    dist: PathBuf,
    dest_file: String,
}

impl StyleSheetBuilder {
    pub fn new(cfg: &BuildConfig, root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            dist: cfg.dist.clone(),
            dest_file: cfg.style.dest_file.clone(),
        }
    }

    pub fn output_path(&self) -> PathBuf {
        self.root.join(&self.dist).join(&self.dest_file)
    }

    pub fn map_path(&self) -> PathBuf {
        self.root.join(&self.dist).join(format!("{}.map", self.dest_file))
    }

    /// Compile `paths` (relative to the root) in order.
    ///
    /// Partials (`_name.scss`) are only pulled in through imports and are not
    /// compiled on their own. A file that fails to compile is logged and left
    /// out; the others still make it into the output. Only writing the output
    /// can fail the call.
    pub fn compile(&self, fs: &dyn FileSystem, paths: &[PathBuf]) -> Result<StyleReport> {
        let mut report = StyleReport::default();
        let mut chunks = Vec::new();
        let mut map = SourceMapBuilder::new();

        for rel in paths {
            if is_partial(rel) {
                debug!(path = ?rel, "skipping partial");
                continue;
            }
            match compile_file(&self.root.join(rel)) {
                Ok(css) => {
                    let css = css.trim_end().to_string();
                    map.add_source(self.map_source(rel), css.lines().count().max(1));
                    chunks.push(css);
                    report.compiled.push(rel.clone());
                }
                Err(err) => {
                    error!(error = %err, "skipping style-sheet");
                    report.failed.push(rel.clone());
                }
            }
        }

        if chunks.is_empty() {
            if report.failed.is_empty() {
                warn!("no style-sheets to compile");
            } else {
                warn!(failed = report.failed.len(), "every style-sheet failed; output left untouched");
            }
            return Ok(report);
        }

        let output = self.output_path();
        let map_file = format!("{}.map", self.dest_file);

        let mut css = chunks.join("\n");
        css.push_str(&format!("\n/*# sourceMappingURL={} */\n", map_file));
        fs.write(&output, css.as_bytes())?;

        let source_map = map.build(self.dest_file.clone());
        let json = serde_json::to_string(&source_map).map_err(anyhow::Error::from)?;
        fs.write(&self.map_path(), json.as_bytes())?;

        info!(
            output = ?output,
            compiled = report.compiled.len(),
            failed = report.failed.len(),
            "stylesheet written"
        );

        report.output = Some(output);
        Ok(report)
    }

    /// Path of a source as seen from the map file's directory.
    fn map_source(&self, rel: &Path) -> String {
        let depth = self
            .dist
            .components()
            .filter(|c| matches!(c, Component::Normal(_)))
            .count();
        let mut s = "../".repeat(depth);
        s.push_str(&rel.to_string_lossy().replace('\\', "/"));
        s
    }
}
