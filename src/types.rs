use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// What to do with file changes that arrive while a rebuild batch is running.
///
/// - `Coalesce`: remember every changed target and rebuild all of them once
///   when the current batch finishes (default).
/// - `Latest`: drop previously queued targets and only keep the most recent
///   one.
///
/// Neither policy ever starts a second batch while one is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RebuildPolicy {
    #[default]
    Coalesce,
    Latest,
}

impl FromStr for RebuildPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "coalesce" => Ok(RebuildPolicy::Coalesce),
            "latest" => Ok(RebuildPolicy::Latest),
            other => Err(format!(
                "invalid rebuild_policy: {other} (expected \"coalesce\" or \"latest\")"
            )),
        }
    }
}

/// A group of source files the watch runtime knows how to rebuild.
///
/// The derived order is the order targets run within a batch: scripts come
/// before styles because style discovery reads the module graph the bundler
/// records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum WatchTarget {
    /// The markup file copied into the output directory.
    Markup,
    /// The script module graph.
    Scripts,
    /// Style-sheet sources.
    Styles,
    /// Files of the backing server process.
    Server,
}

impl WatchTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            WatchTarget::Markup => "markup",
            WatchTarget::Scripts => "scripts",
            WatchTarget::Styles => "styles",
            WatchTarget::Server => "server",
        }
    }

    /// Reload notification to send after this target rebuilt successfully.
    pub fn reload_kind(&self) -> ReloadKind {
        match self {
            WatchTarget::Styles => ReloadKind::Styles,
            _ => ReloadKind::Full,
        }
    }
}

impl fmt::Display for WatchTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of reload notification pushed to connected browsers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReloadKind {
    /// Reload the whole page.
    Full,
    /// Only refresh linked stylesheets.
    Styles,
}

impl ReloadKind {
    /// Wire message sent over the websocket channel.
    pub fn message(&self) -> &'static str {
        match self {
            ReloadKind::Full => "reload",
            ReloadKind::Styles => "css",
        }
    }

    /// Merge two pending notifications: a full reload subsumes a style refresh.
    pub fn merge(self, other: ReloadKind) -> ReloadKind {
        match (self, other) {
            (ReloadKind::Styles, ReloadKind::Styles) => ReloadKind::Styles,
            _ => ReloadKind::Full,
        }
    }
}
