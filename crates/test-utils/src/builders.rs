#![allow(dead_code)]

use buildloop::config::{BuildConfig, RawBuildConfig};
use buildloop::types::RebuildPolicy;

/// Builder for `BuildConfig` to simplify test setup.
///
/// Starts from the built-in defaults with every lint command disabled, so
/// nothing external runs unless a test asks for it.
pub struct BuildConfigBuilder {
    config: RawBuildConfig,
}

impl BuildConfigBuilder {
    pub fn new() -> Self {
        let mut config = RawBuildConfig::default();
        config.lint.js = String::new();
        config.lint.scss = String::new();
        config.lint.html = String::new();
        Self { config }
    }

    pub fn dist(mut self, dist: &str) -> Self {
        self.config.dist = dist.to_string();
        self
    }

    pub fn entry_point(mut self, entry: &str) -> Self {
        self.config.script.entry_point = entry.to_string();
        self
    }

    pub fn dest_name(mut self, name: &str) -> Self {
        self.config.script.dest_name = name.to_string();
        self
    }

    pub fn style_dest(mut self, file: &str) -> Self {
        self.config.style.dest_file = file.to_string();
        self
    }

    pub fn html(mut self, path: &str) -> Self {
        self.config.sources.html = path.to_string();
        self
    }

    pub fn js_glob(mut self, pattern: &str) -> Self {
        self.config.sources.js.push(pattern.to_string());
        self
    }

    /// Replace the fallback style-sheet globs.
    pub fn scss_globs(mut self, patterns: &[&str]) -> Self {
        self.config.sources.scss = patterns.iter().map(|p| p.to_string()).collect();
        self
    }

    pub fn server_script(mut self, script: &str) -> Self {
        self.config.server.script = script.to_string();
        self
    }

    pub fn server_runner(mut self, runner: &str) -> Self {
        self.config.server.runner = runner.to_string();
        self
    }

    pub fn ports(mut self, raw_port: u16, port: u16) -> Self {
        self.config.server.raw_port = raw_port;
        self.config.server.port = port;
        self
    }

    pub fn settle_delay_ms(mut self, ms: u64) -> Self {
        self.config.server.settle_delay_ms = ms;
        self
    }

    pub fn ready_on_stdout(mut self, pattern: &str) -> Self {
        self.config.server.ready_on_stdout = Some(pattern.to_string());
        self
    }

    pub fn lint_js(mut self, cmd: &str) -> Self {
        self.config.lint.js = cmd.to_string();
        self
    }

    pub fn lint_scss(mut self, cmd: &str) -> Self {
        self.config.lint.scss = cmd.to_string();
        self
    }

    pub fn validate_html(mut self, cmd: &str) -> Self {
        self.config.lint.html = cmd.to_string();
        self
    }

    pub fn rebuild_policy(mut self, policy: RebuildPolicy) -> Self {
        self.config.watch.rebuild_policy = policy;
        self
    }

    pub fn use_hash(mut self, val: bool) -> Self {
        self.config.watch.use_hash = val;
        self
    }

    pub fn raw(self) -> RawBuildConfig {
        self.config
    }

    pub fn build(self) -> BuildConfig {
        BuildConfig::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for BuildConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
