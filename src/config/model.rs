// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::types::RebuildPolicy;

/// Build configuration as read from a TOML file.
///
/// Every section is optional; a missing file is equivalent to an empty one.
///
/// ```toml
/// dist = "dist"
///
/// [script]
/// entry_point = "src/index.js"
/// dest_name = "app"
///
/// [sources]
/// scss = ["src/**/*.scss"]
///
/// [server]
/// script = "server.js"
/// raw_port = 3000
/// port = 4000
/// ```
///
/// This is the unvalidated form. Use [`BuildConfig::try_from`] (or
/// `config::load_and_validate`) to get a [`BuildConfig`].
#[derive(Debug, Clone, Deserialize)]
pub struct RawBuildConfig {
    /// Output directory for every artifact.
    #[serde(default = "default_dist")]
    pub dist: String,

    #[serde(default)]
    pub script: ScriptSection,

    #[serde(default)]
    pub style: StyleSection,

    #[serde(default)]
    pub sources: SourcesSection,

    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub lint: LintSection,

    #[serde(default)]
    pub watch: WatchSection,
}

fn default_dist() -> String {
    "dist".to_string()
}

impl Default for RawBuildConfig {
    fn default() -> Self {
        Self {
            dist: default_dist(),
            script: ScriptSection::default(),
            style: StyleSection::default(),
            sources: SourcesSection::default(),
            server: ServerSection::default(),
            lint: LintSection::default(),
            watch: WatchSection::default(),
        }
    }
}

/// `[script]` section: the bundle produced by the script bundler.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScriptSection {
    /// Entry module of the script graph.
    pub entry_point: String,
    /// Base name of the bundle; the artifact is `<dest_name>.min.js`.
    pub dest_name: String,
    /// Bundler program (must accept esbuild's command-line flags).
    pub bundler: String,
    /// Extra arguments appended to the bundler invocation.
    pub bundler_args: Vec<String>,
}

impl Default for ScriptSection {
    fn default() -> Self {
        Self {
            entry_point: "src/index.js".to_string(),
            dest_name: "app".to_string(),
            bundler: "esbuild".to_string(),
            bundler_args: Vec::new(),
        }
    }
}

/// `[style]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StyleSection {
    /// File name of the aggregated stylesheet inside the output directory.
    pub dest_file: String,
}

impl Default for StyleSection {
    fn default() -> Self {
        Self {
            dest_file: "app.css".to_string(),
        }
    }
}

/// `[sources]` section: glob patterns relative to the project root.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourcesSection {
    pub js: Vec<String>,
    /// Fallback style-sheet globs, used when the module graph names no
    /// style-sheet siblings.
    pub scss: Vec<String>,
    /// The single markup file copied into the output directory.
    pub html: String,
}

impl Default for SourcesSection {
    fn default() -> Self {
        Self {
            js: vec!["src/*.js".to_string()],
            scss: vec!["src/**/*.scss".to_string(), "src/*.scss".to_string()],
            html: "src/index.html".to_string(),
        }
    }
}

/// `[server]` section: the backing process and the reload channel.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// Program used to run `script` (e.g. `node`).
    pub runner: String,
    pub script: String,
    /// Port the backing server listens on; passed as `SERVER_PORT`.
    pub raw_port: u16,
    /// Public port of the reload channel.
    pub port: u16,
    /// Pause between a server restart and the browser reload.
    pub settle_delay_ms: u64,
    /// Browser to open on first start, if any.
    pub browser: Option<String>,
    /// Regex; when set, the server counts as running once a stdout line
    /// matches instead of as soon as it spawned.
    pub ready_on_stdout: Option<String>,
    /// Files whose change restarts the server.
    pub watch: Vec<String>,
    pub ignore: Vec<String>,
    /// Extra environment for the server process.
    pub env: BTreeMap<String, String>,
}

impl Default for ServerSection {
    fn default() -> Self {
        let mut env = BTreeMap::new();
        env.insert("NODE_ENV".to_string(), "development".to_string());

        Self {
            runner: "node".to_string(),
            script: "server.js".to_string(),
            raw_port: DEFAULT_RAW_PORT,
            port: DEFAULT_PORT,
            settle_delay_ms: 600,
            browser: None,
            ready_on_stdout: None,
            watch: vec![
                "**/*.js".to_string(),
                "**/*.mjs".to_string(),
                "**/*.json".to_string(),
            ],
            ignore: vec![
                "Buildloop.toml".to_string(),
                "src/**".to_string(),
                "package.json".to_string(),
                "node_modules/**".to_string(),
            ],
            env,
        }
    }
}

/// Fallback for `server.raw_port`.
pub const DEFAULT_RAW_PORT: u16 = 3000;
/// Fallback for `server.port`.
pub const DEFAULT_PORT: u16 = 4000;

/// `[lint]` section: external commands run through the shell.
///
/// A command set to an empty string disables that lint task.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LintSection {
    pub js: String,
    pub scss: String,
    pub html: String,
}

impl Default for LintSection {
    fn default() -> Self {
        Self {
            js: "eslint src".to_string(),
            scss: "sass-lint --verbose".to_string(),
            html: "html-validate src/index.html".to_string(),
        }
    }
}

/// `[watch]` section: behaviour of the watch-mode rebuild loop.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WatchSection {
    pub rebuild_policy: RebuildPolicy,
    /// Skip change events whose file content hash did not change.
    pub use_hash: bool,
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            rebuild_policy: RebuildPolicy::default(),
            use_hash: true,
        }
    }
}

/// Validated, immutable build configuration.
///
/// Shared as `Arc<BuildConfig>` once a task run starts; mutable per-process
/// state lives in [`crate::session::SessionState`] instead.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    pub dist: PathBuf,
    pub script: ScriptSection,
    pub style: StyleSection,
    pub sources: SourcesSection,
    pub server: ServerSection,
    pub lint: LintSection,
    pub watch: WatchSection,
}

impl BuildConfig {
    /// Wrap sections that have already been validated.
    pub(crate) fn new_unchecked(raw: RawBuildConfig) -> Self {
        Self {
            dist: PathBuf::from(raw.dist),
            script: raw.script,
            style: raw.style,
            sources: raw.sources,
            server: raw.server,
            lint: raw.lint,
            watch: raw.watch,
        }
    }

    /// Built-in defaults (what a missing config file resolves to).
    pub fn defaults() -> Self {
        Self::new_unchecked(RawBuildConfig::default())
    }

    /// File name of the minified bundle, e.g. `app.min.js`.
    pub fn bundle_file_name(&self) -> String {
        format!("{}.min.js", self.script.dest_name)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.server.settle_delay_ms)
    }

    /// Glob covering everything below the output directory.
    pub fn dist_glob(&self) -> String {
        let dist = self.dist.to_string_lossy().replace('\\', "/");
        let dist = dist.trim_start_matches("./").trim_end_matches('/');
        format!("{dist}/**")
    }
}
