// src/watch/patterns.rs

use std::fmt;

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::bundle::STATE_DIR;
use crate::config::BuildConfig;
use crate::session::SourceFileCache;
use crate::types::WatchTarget;

/// Paths that never trigger anything, in addition to the output directory.
const ALWAYS_EXCLUDED: &[&str] = &["node_modules/**", ".git/**"];

/// Compiled glob sets deciding which [`WatchTarget`]s a changed path
/// belongs to.
///
/// Paths are relative to the project root, with forward slashes.
#[derive(Clone)]
pub struct WatchProfiles {
    markup: GlobSet,
    scripts: GlobSet,
    styles: GlobSet,
    server: GlobSet,
    server_ignore: GlobSet,
    excluded: GlobSet,
}

impl fmt::Debug for WatchProfiles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchProfiles").finish_non_exhaustive()
    }
}

impl WatchProfiles {
    pub fn from_config(cfg: &BuildConfig) -> Result<Self> {
        let mut excluded: Vec<String> = ALWAYS_EXCLUDED.iter().map(|s| s.to_string()).collect();
        excluded.push(cfg.dist_glob());
        excluded.push(format!("{STATE_DIR}/**"));

        Ok(Self {
            markup: build_globset(std::slice::from_ref(&cfg.sources.html))
                .context("building markup globset")?,
            scripts: build_globset(&cfg.sources.js).context("building script globset")?,
            styles: build_globset(&cfg.sources.scss).context("building style globset")?,
            server: build_globset(&cfg.server.watch).context("building server globset")?,
            server_ignore: build_globset(&cfg.server.ignore)
                .context("building server ignore globset")?,
            excluded: build_globset(&excluded).context("building exclude globset")?,
        })
    }

    /// Targets interested in `rel_path`, in [`WatchTarget`] order.
    ///
    /// Scripts also match every file of the current module graph, so edits
    /// to modules outside the script globs still rebuild the bundle.
    pub fn classify(&self, rel_path: &str, sources: &SourceFileCache) -> Vec<WatchTarget> {
        let rel_path = rel_path.trim_start_matches("./");
        if self.excluded.is_match(rel_path) {
            return Vec::new();
        }

        let mut targets = Vec::new();
        if self.markup.is_match(rel_path) {
            targets.push(WatchTarget::Markup);
        }
        if self.scripts.is_match(rel_path) || sources.contains(std::path::Path::new(rel_path)) {
            targets.push(WatchTarget::Scripts);
        }
        if self.styles.is_match(rel_path) {
            targets.push(WatchTarget::Styles);
        }
        if self.server.is_match(rel_path) && !self.server_ignore.is_match(rel_path) {
            targets.push(WatchTarget::Server);
        }
        targets
    }
}

/// Build a GlobSet from simple string patterns.
pub fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = Glob::new(pat).with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}
