// src/watch/event_handler.rs

//! Turning a changed path into [`RuntimeEvent::Changed`] events.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::engine::RuntimeEvent;
use crate::fs::FileSystem;
use crate::session::{self, SharedSession};
use crate::types::WatchTarget;
use crate::watch::hash::{ContentHashes, compute_file_hash};
use crate::watch::patterns::WatchProfiles;

/// Decides which targets a file change concerns.
#[derive(Debug)]
pub struct ChangeFilter {
    fs: Arc<dyn FileSystem>,
    root: PathBuf,
    profiles: WatchProfiles,
    session: SharedSession,
    hashes: Option<ContentHashes>,
}

impl ChangeFilter {
    /// With `use_hash`, a change only counts if the file content differs
    /// from the last time it was seen.
    pub fn new(
        fs: Arc<dyn FileSystem>,
        root: impl Into<PathBuf>,
        profiles: WatchProfiles,
        session: SharedSession,
        use_hash: bool,
    ) -> Self {
        Self {
            fs,
            root: root.into(),
            profiles,
            session,
            hashes: use_hash.then(ContentHashes::new),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Targets for a change at `path` (below the root).
    pub async fn targets_for(&mut self, path: &Path) -> Vec<WatchTarget> {
        let Some(rel) = relative_str(&self.root, path) else {
            warn!(
                "could not relativize path {:?} against root {:?}",
                path, self.root
            );
            return Vec::new();
        };

        let targets = {
            let session = session::lock(&self.session);
            self.profiles.classify(&rel, session.sources())
        };
        if targets.is_empty() {
            return targets;
        }

        if !self.content_changed(path).await {
            return Vec::new();
        }

        debug!(path = %rel, ?targets, "change matched");
        targets
    }

    async fn content_changed(&mut self, path: &Path) -> bool {
        let Some(hashes) = self.hashes.as_mut() else {
            return true;
        };

        if !self.fs.is_file(path) {
            // Removed (or replaced by a directory): always relevant.
            hashes.forget(path);
            return true;
        }

        let fs = Arc::clone(&self.fs);
        let owned = path.to_path_buf();
        let hash = tokio::task::spawn_blocking(move || compute_file_hash(fs.as_ref(), &owned)).await;

        match hash {
            Ok(Ok(hash)) => hashes.update(path, hash),
            Ok(Err(err)) => {
                warn!(path = ?path, error = %err, "failed to hash file; treating as changed");
                true
            }
            Err(err) => {
                warn!(path = ?path, error = %err, "hashing task failed; treating as changed");
                true
            }
        }
    }
}

/// Run `path` through `filter` and send one event per matching target.
///
/// Returns `false` once the runtime channel is closed.
pub async fn process_file_change(
    filter: &mut ChangeFilter,
    path: &Path,
    runtime_tx: &mpsc::Sender<RuntimeEvent>,
) -> bool {
    let targets = filter.targets_for(path).await;
    if targets.is_empty() {
        return true;
    }

    let rel = relative_str(filter.root(), path).unwrap_or_default();
    for target in targets {
        let event = RuntimeEvent::Changed {
            target,
            path: rel.clone(),
        };
        if let Err(err) = runtime_tx.send(event).await {
            warn!("failed to send RuntimeEvent::Changed: {err}");
            return false;
        }
    }
    true
}

/// `path` relative to `root`, with forward slashes.
///
/// Falls back to comparing canonicalized paths, which helps where the same
/// directory is reachable through different prefixes (symlinks,
/// `/private/var` on macOS).
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    if let Ok(rel) = path.strip_prefix(root) {
        return Some(rel.to_string_lossy().replace('\\', "/"));
    }

    let root_canon = root.canonicalize().ok()?;
    let path_canon = match path.canonicalize() {
        Ok(p) => p,
        // Deleted files cannot be canonicalized; their parent usually can.
        Err(_) => {
            let parent = path.parent()?.canonicalize().ok()?;
            parent.join(path.file_name()?)
        }
    };
    path_canon
        .strip_prefix(&root_canon)
        .ok()
        .map(|rel| rel.to_string_lossy().replace('\\', "/"))
}
