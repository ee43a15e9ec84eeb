// src/errors.rs

//! Crate-wide error type.
//!
//! One-shot task runs surface these to `main`, which prints them and exits
//! with a non-zero status. Watch-mode rebuilds log them and keep going.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BuildloopError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Cycle detected in task graph: {0}")]
    DagCycle(String),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// The script bundler failed to produce a bundle.
    #[error("Failed to build script bundle: {0}")]
    BundleError(String),

    /// A single style-sheet failed to compile. Never fatal for the task.
    #[error("Style compile error in {path:?}: {message}")]
    StyleCompileError { path: PathBuf, message: String },

    /// A lint or markup validation command reported problems.
    #[error("Validation failed in '{task}': {message}")]
    ValidationError { task: String, message: String },

    /// The backing server (or the reload channel) could not be started.
    #[error("Failed to start server: {0}")]
    ProcessStartError(String),

    #[error("File watch error: {0}")]
    WatchError(#[from] notify::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, BuildloopError>;
