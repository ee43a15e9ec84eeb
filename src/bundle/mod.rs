// src/bundle/mod.rs

//! Script bundling.
//!
//! The bundler itself is an external, esbuild-compatible binary behind the
//! [`ScriptBundler`] trait. Its metafile is read after each build to learn
//! which source files make up the module graph.

pub mod builder;
pub mod bundler;
pub mod metafile;

pub use builder::{BundleReport, STATE_DIR, ScriptBundleBuilder, bundle_outcome};
pub use bundler::{BundleRequest, EsbuildBundler, ScriptBundler};
pub use metafile::parse_inputs;
