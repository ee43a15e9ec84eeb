// src/style/discover.rs

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::errors::Result;
use crate::fs::{FileSystem, walk_files};
use crate::session::SourceFileCache;
use crate::watch::patterns::build_globset;

const STYLE_EXTENSION: &str = "scss";

/// Find the style-sheets to compile.
///
/// Every cached module whose sibling `<stem>.scss` exists contributes that
/// sibling, in cache order and without duplicates. When the cache is empty
/// or none of the siblings exist, the files matching `fallback_globs` are
/// returned instead (sorted).
///
/// Returned paths are relative to `root`.
pub fn discover(
    fs: &dyn FileSystem,
    root: &Path,
    cache: &SourceFileCache,
    fallback_globs: &[String],
) -> Result<Vec<PathBuf>> {
    let mut seen = HashSet::new();
    let mut found = Vec::new();

    for source in cache.paths() {
        let sibling = source.with_extension(STYLE_EXTENSION);
        if sibling == *source {
            // Already a style-sheet; it is not its own sibling.
            continue;
        }
        if fs.is_file(&root.join(&sibling)) && seen.insert(sibling.clone()) {
            found.push(sibling);
        }
    }

    if !found.is_empty() {
        debug!(count = found.len(), "style-sheets found next to cached modules");
        return Ok(found);
    }

    let globs = build_globset(fallback_globs)?;
    let files = walk_files(fs, root, |rel| globs.is_match(rel))?;
    debug!(
        count = files.len(),
        cached = cache.len(),
        "no sibling style-sheets; using fallback globs"
    );
    Ok(files)
}
