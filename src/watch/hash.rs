// src/watch/hash.rs

use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use blake3::Hasher;
use tracing::debug;

use crate::fs::FileSystem;

/// Compute the hash of a single file.
pub fn compute_file_hash(fs: &dyn FileSystem, path: &Path) -> Result<String> {
    let mut hasher = Hasher::new();
    let mut file = fs
        .open_read(path)
        .with_context(|| format!("opening file for hashing: {:?}", path))?;
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().to_hex().to_string())
}

/// Last seen content hash per file.
///
/// Editors often emit several events for one save; only the first one with
/// new content gets through.
#[derive(Debug, Default)]
pub struct ContentHashes {
    hashes: HashMap<PathBuf, String>,
}

impl ContentHashes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `hash` for `path`. Returns `true` if it differs from the
    /// previous one (or there was none).
    pub fn update(&mut self, path: &Path, hash: String) -> bool {
        if self.hashes.get(path) == Some(&hash) {
            debug!(path = ?path, "content unchanged");
            return false;
        }
        self.hashes.insert(path.to_path_buf(), hash);
        true
    }

    /// Drop the stored hash (the file was removed).
    pub fn forget(&mut self, path: &Path) -> bool {
        self.hashes.remove(path).is_some()
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }
}
