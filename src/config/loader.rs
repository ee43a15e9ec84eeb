// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::config::model::{BuildConfig, DEFAULT_PORT, DEFAULT_RAW_PORT, RawBuildConfig};
use crate::errors::Result;

/// Environment variable overriding `[server].raw_port`.
pub const ENV_RAW_PORT: &str = "BUILDLOOP_RAW_PORT";
/// Environment variable overriding `[server].port`.
pub const ENV_PORT: &str = "BUILDLOOP_PORT";
/// Environment variable overriding `[server].script`.
pub const ENV_SERVER_SCRIPT: &str = "BUILDLOOP_SERVER_SCRIPT";

/// Load a configuration file from a given path and return the raw
/// `RawBuildConfig`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawBuildConfig> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawBuildConfig = toml::from_str(&contents)?;

    Ok(config)
}

/// Load, apply process environment overrides and validate.
///
/// - `Some(path)`: the file must exist.
/// - `None`: [`default_config_path`] is used when present, otherwise the
///   built-in defaults.
pub fn load_and_validate(path: Option<&Path>) -> Result<BuildConfig> {
    load_with_env(path, |key| std::env::var(key).ok())
}

/// Same as [`load_and_validate`] with an injectable environment lookup.
pub fn load_with_env<F>(path: Option<&Path>, lookup: F) -> Result<BuildConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let mut raw = match path {
        Some(p) => load_from_path(p)?,
        None => {
            let default_path = default_config_path();
            if default_path.is_file() {
                debug!(path = ?default_path, "loading default config file");
                load_from_path(&default_path)?
            } else {
                debug!("no config file found; using built-in defaults");
                RawBuildConfig::default()
            }
        }
    };

    apply_env_overrides(&mut raw, lookup);
    BuildConfig::try_from(raw)
}

/// Apply environment overrides on top of file values.
///
/// Port variables that are set but do not parse as a non-zero integer fall
/// back to the hard-coded defaults.
pub fn apply_env_overrides<F>(raw: &mut RawBuildConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup(ENV_RAW_PORT) {
        raw.server.raw_port = parse_port(ENV_RAW_PORT, &value, DEFAULT_RAW_PORT);
    }
    if let Some(value) = lookup(ENV_PORT) {
        raw.server.port = parse_port(ENV_PORT, &value, DEFAULT_PORT);
    }
    if let Some(script) = lookup(ENV_SERVER_SCRIPT) {
        if !script.trim().is_empty() {
            raw.server.script = script;
        }
    }
}

fn parse_port(var: &str, value: &str, fallback: u16) -> u16 {
    match value.trim().parse::<u16>() {
        Ok(port) if port > 0 => port,
        _ => {
            warn!(
                var,
                value,
                fallback,
                "ignoring unparsable port from environment"
            );
            fallback
        }
    }
}

/// Default config file, relative to the working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Buildloop.toml")
}
