// src/bundle/metafile.rs

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::de::IgnoredAny;

use crate::errors::{BuildloopError, Result};

#[derive(Debug, Deserialize)]
struct Metafile {
    #[serde(default)]
    inputs: BTreeMap<String, IgnoredAny>,
}

/// Source files listed in a bundler metafile, relative to the project root.
///
/// Virtual modules (`<stdin>`, `ns:...` namespaces) are skipped.
pub fn parse_inputs(json: &str) -> Result<Vec<String>> {
    let meta: Metafile = serde_json::from_str(json)
        .map_err(|e| BuildloopError::BundleError(format!("invalid metafile: {}", e)))?;

    Ok(meta
        .inputs
        .into_keys()
        .filter(|path| !is_virtual(path))
        .collect())
}

fn is_virtual(path: &str) -> bool {
    if path.starts_with('<') {
        return true;
    }
    // `ns:path`, but not a Windows drive letter such as `C:/src`.
    matches!(path.find(':'), Some(idx) if idx > 1)
}
