// src/watch/mod.rs

//! File watching and change detection.
//!
//! This module is responsible for:
//! - Compiling the source/server globs into per-target profiles.
//! - Wiring up a cross-platform filesystem watcher (`notify`).
//! - Content hashing, so saves that do not change a file are ignored.
//!
//! It does **not** know about rebuilds; it only turns filesystem changes
//! into [`crate::engine::RuntimeEvent::Changed`] events.

pub mod event_handler;
pub mod hash;
pub mod patterns;
pub mod watcher;

pub use event_handler::{ChangeFilter, process_file_change, relative_str};
pub use hash::{ContentHashes, compute_file_hash};
pub use patterns::WatchProfiles;
pub use watcher::{WatcherHandle, is_content_event, spawn_watcher};
