// src/style/sourcemap.rs

//! Minimal version-3 source maps for the aggregated stylesheet.
//!
//! Each generated line maps to the start (line 0, column 0) of the source
//! file it came from.

use serde::Serialize;

const BASE64: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

/// Append `value` to `out` as a base64 VLQ.
pub fn encode_vlq(value: i64, out: &mut String) {
    let mut vlq: u64 = if value < 0 {
        ((value.unsigned_abs()) << 1) | 1
    } else {
        (value as u64) << 1
    };

    loop {
        let mut digit = (vlq & 0b1_1111) as usize;
        vlq >>= 5;
        if vlq > 0 {
            digit |= 0b10_0000;
        }
        out.push(BASE64[digit] as char);
        if vlq == 0 {
            break;
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SourceMap {
    pub version: u8,
    pub file: String,
    pub sources: Vec<String>,
    pub names: Vec<String>,
    pub mappings: String,
}

/// Accumulates generated chunks and the source each came from.
#[derive(Debug, Default)]
pub struct SourceMapBuilder {
    sources: Vec<String>,
    lines: Vec<usize>,
}

impl SourceMapBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that the next `line_count` generated lines came from `source`.
    pub fn add_source(&mut self, source: impl Into<String>, line_count: usize) {
        let index = self.sources.len();
        self.sources.push(source.into());
        self.lines.extend(std::iter::repeat_n(index, line_count));
    }

    pub fn build(self, file: impl Into<String>) -> SourceMap {
        let mut mappings = String::new();
        let mut prev_source: i64 = 0;

        for (i, &source) in self.lines.iter().enumerate() {
            if i > 0 {
                mappings.push(';');
            }
            let source = source as i64;
            // generated column, source index, original line, original column
            encode_vlq(0, &mut mappings);
            encode_vlq(source - prev_source, &mut mappings);
            encode_vlq(0, &mut mappings);
            encode_vlq(0, &mut mappings);
            prev_source = source;
        }

        SourceMap {
            version: 3,
            file: file.into(),
            sources: self.sources,
            names: Vec::new(),
            mappings,
        }
    }
}
