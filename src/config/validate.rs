// src/config/validate.rs

use std::path::{Component, Path};

use globset::Glob;
use regex::Regex;

use crate::config::model::{BuildConfig, RawBuildConfig};
use crate::errors::{BuildloopError, Result};

impl TryFrom<RawBuildConfig> for BuildConfig {
    type Error = BuildloopError;

    fn try_from(raw: RawBuildConfig) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(BuildConfig::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawBuildConfig) -> Result<()> {
    validate_dist(cfg)?;
    validate_names(cfg)?;
    validate_ports(cfg)?;
    validate_patterns(cfg)?;
    Ok(())
}

fn validate_dist(cfg: &RawBuildConfig) -> Result<()> {
    let dist = Path::new(cfg.dist.trim());

    // `clean` removes this directory, so it must name something below the
    // project root.
    let escapes_root = dist.is_absolute()
        || dist
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::RootDir));
    let is_root = dist
        .components()
        .all(|c| matches!(c, Component::CurDir));

    if cfg.dist.trim().is_empty() || is_root || escapes_root {
        return Err(BuildloopError::ConfigError(format!(
            "dist must be a directory below the project root (got {:?})",
            cfg.dist
        )));
    }
    Ok(())
}

fn validate_names(cfg: &RawBuildConfig) -> Result<()> {
    let required = [
        ("script.entry_point", &cfg.script.entry_point),
        ("script.dest_name", &cfg.script.dest_name),
        ("script.bundler", &cfg.script.bundler),
        ("style.dest_file", &cfg.style.dest_file),
        ("sources.html", &cfg.sources.html),
        ("server.runner", &cfg.server.runner),
        ("server.script", &cfg.server.script),
    ];

    for (key, value) in required {
        if value.trim().is_empty() {
            return Err(BuildloopError::ConfigError(format!(
                "{key} must not be empty"
            )));
        }
    }

    if cfg.style.dest_file.contains('/') || cfg.style.dest_file.contains('\\') {
        return Err(BuildloopError::ConfigError(format!(
            "style.dest_file must be a plain file name (got {:?})",
            cfg.style.dest_file
        )));
    }

    Ok(())
}

fn validate_ports(cfg: &RawBuildConfig) -> Result<()> {
    if cfg.server.raw_port == 0 || cfg.server.port == 0 {
        return Err(BuildloopError::ConfigError(
            "[server] ports must be >= 1".to_string(),
        ));
    }
    if cfg.server.raw_port == cfg.server.port {
        return Err(BuildloopError::ConfigError(format!(
            "[server].raw_port and [server].port must differ (both {})",
            cfg.server.port
        )));
    }
    Ok(())
}

fn validate_patterns(cfg: &RawBuildConfig) -> Result<()> {
    let globs = cfg
        .sources
        .js
        .iter()
        .chain(cfg.sources.scss.iter())
        .chain(std::iter::once(&cfg.sources.html))
        .chain(cfg.server.watch.iter())
        .chain(cfg.server.ignore.iter());

    for pat in globs {
        Glob::new(pat).map_err(|e| {
            BuildloopError::ConfigError(format!("invalid glob pattern {pat:?}: {e}"))
        })?;
    }

    if let Some(ref re) = cfg.server.ready_on_stdout {
        Regex::new(re).map_err(|e| {
            BuildloopError::ConfigError(format!(
                "invalid [server].ready_on_stdout regex {re:?}: {e}"
            ))
        })?;
    }

    Ok(())
}
