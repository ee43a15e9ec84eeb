// src/session.rs

//! Mutable per-process state shared by the task actions.
//!
//! The build configuration itself is immutable; everything that changes while
//! the process runs lives here instead.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info};

/// Shared handle to the session.
pub type SharedSession = Arc<Mutex<SessionState>>;

/// Ordered, grow-only set of files that make up the current script module
/// graph, as reported by the bundler.
///
/// Paths are relative to the project root and use forward slashes.
#[derive(Debug, Clone, Default)]
pub struct SourceFileCache {
    order: Vec<PathBuf>,
    seen: HashSet<PathBuf>,
}

impl SourceFileCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a file as observed. Returns `true` if it was not known yet.
    pub fn observe(&mut self, path: impl Into<PathBuf>) -> bool {
        let path = normalize(path.into());
        if self.seen.insert(path.clone()) {
            debug!(path = ?path, "source file observed");
            self.order.push(path);
            true
        } else {
            false
        }
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.seen.contains(&normalize(path.to_path_buf()))
    }

    /// Observed files in first-seen order.
    pub fn paths(&self) -> &[PathBuf] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Strip a leading `./` and normalise separators so the same file always maps
/// to one key.
fn normalize(path: PathBuf) -> PathBuf {
    let s = path.to_string_lossy().replace('\\', "/");
    let trimmed = s.trim_start_matches("./");
    PathBuf::from(trimmed)
}

/// Watch flag, server-started guard and module-graph cache.
#[derive(Debug, Default)]
pub struct SessionState {
    watch: bool,
    server_started: bool,
    sources: SourceFileCache,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a fresh session for sharing between actions.
    pub fn shared() -> SharedSession {
        Arc::new(Mutex::new(Self::new()))
    }

    /// Whether watch mode has been enabled for this process.
    pub fn is_watch(&self) -> bool {
        self.watch
    }

    /// Switch the session into watch mode. There is no way back.
    pub fn enable_watch(&mut self) {
        if !self.watch {
            info!("watch mode enabled");
        }
        self.watch = true;
    }

    /// Mark the backing server as started.
    ///
    /// Returns `true` only for the first call, so downstream initialisation
    /// runs once even if the server is restarted many times.
    pub fn mark_server_started(&mut self) -> bool {
        let first = !self.server_started;
        self.server_started = true;
        first
    }

    pub fn server_started(&self) -> bool {
        self.server_started
    }

    pub fn sources(&self) -> &SourceFileCache {
        &self.sources
    }

    pub fn sources_mut(&mut self) -> &mut SourceFileCache {
        &mut self.sources
    }
}

/// Lock a shared session, recovering from a poisoned mutex.
pub fn lock(session: &SharedSession) -> MutexGuard<'_, SessionState> {
    session.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
