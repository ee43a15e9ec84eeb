// src/exec/mod.rs

//! Action execution layer.
//!
//! - [`backend`] provides the `ActionBackend` trait and the production
//!   `RealActions`; tests replace it with a fake implementation.
//! - [`context`] holds the builders and services the actions and watch-mode
//!   rebuilds share.
//! - [`command`] runs external processes (bundler, linters).
//! - [`files`] implements `clean` and the markup copy.

pub mod backend;
pub mod command;
pub mod context;
pub mod files;

pub use backend::{ActionBackend, RealActions};
pub use context::BuildContext;
