// src/config/mod.rs

//! Build configuration.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk and apply environment overrides (`loader.rs`).
//! - Validate paths, ports and patterns (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{apply_env_overrides, load_and_validate, load_from_path, load_with_env};
pub use model::{
    BuildConfig, LintSection, RawBuildConfig, ScriptSection, ServerSection, SourcesSection,
    StyleSection, WatchSection,
};
