// src/style/mod.rs

//! Style-sheet discovery and compilation.

pub mod compile;
pub mod discover;
pub mod sourcemap;

pub use compile::{StyleReport, StyleSheetBuilder, compile_file};
pub use discover::discover;
pub use sourcemap::{SourceMap, SourceMapBuilder, encode_vlq};
