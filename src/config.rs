//! Configuration loading and `~/.claude` path helpers.
//!
//! Configuration follows a precedence chain:
//! 1. Environment variables (highest priority)
//! 2. Project config (`.autopilot/config.toml`)
//! 3. User config (`~/.claude/autopilot.toml`)
//! 4. Defaults (lowest priority)
//!
//! All configuration is optional. The hooks run with sensible defaults when
//! no config exists, and an unparsable config file is ignored rather than
//! surfaced as a failure.

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration struct for autopilot.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Ancestor-walk depth bounds.
    pub walk: WalkConfig,
    /// External process timeouts.
    pub timeouts: TimeoutConfig,
    /// Lint guard behavior.
    pub lint: LintConfig,
}

/// Depth bounds for the ancestor-directory walks.
///
/// Every upward traversal is an explicit loop with a fixed maximum step
/// count plus a parent-equals-self check, so symlink cycles and pathological
/// trees cannot cause unbounded recursion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WalkConfig {
    /// Maximum ancestors examined when the approval guard resolves the
    /// mode marker from tool signals.
    pub mode_max_depth: usize,
    /// Maximum ancestors the other guards examine for the mode marker.
    pub guard_mode_max_depth: usize,
    /// Maximum ancestors examined when locating a project test root.
    pub tests_max_depth: usize,
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self {
            mode_max_depth: 15,
            guard_mode_max_depth: 10,
            tests_max_depth: 10,
        }
    }
}

/// Timeouts for external process calls. Failure or timeout is always
/// treated as "skip this check," never as a block.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Timeout for `git status --porcelain` in seconds.
    pub git_secs: u64,
    /// Timeout for each lint/format/type-check invocation in seconds.
    pub lint_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            git_secs: 10,
            lint_secs: 20,
        }
    }
}

/// Lint guard configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LintConfig {
    /// Whether the lint guard runs at all. The registration is still
    /// installed; disabling here turns it into a silent allow.
    pub enabled: bool,
}

impl Default for LintConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Config {
    /// Load configuration using the full precedence chain, with the project
    /// config resolved relative to `cwd`.
    pub fn load(cwd: &Path) -> Self {
        let mut config = Config::default();

        if let Some(user_path) = user_config_path() {
            config.overlay_file(&user_path);
        }
        config.overlay_file(&cwd.join(".autopilot").join("config.toml"));
        config.apply_env();

        config
    }

    /// Overlay values from a TOML file onto this config.
    ///
    /// Missing or unparsable files are ignored (fail-open).
    fn overlay_file(&mut self, path: &Path) {
        let Ok(content) = fs::read_to_string(path) else {
            return;
        };
        match toml::from_str::<Config>(&content) {
            Ok(parsed) => *self = parsed,
            Err(e) => {
                tracing::warn!("ignoring unparsable config {}: {}", path.display(), e);
            }
        }
    }

    /// Apply `AUTOPILOT_*` environment variable overrides.
    fn apply_env(&mut self) {
        if let Some(v) = env_parse("AUTOPILOT_MODE_WALK_DEPTH") {
            self.walk.mode_max_depth = v;
        }
        if let Some(v) = env_parse("AUTOPILOT_GUARD_WALK_DEPTH") {
            self.walk.guard_mode_max_depth = v;
        }
        if let Some(v) = env_parse("AUTOPILOT_TESTS_WALK_DEPTH") {
            self.walk.tests_max_depth = v;
        }
        if let Some(v) = env_parse("AUTOPILOT_GIT_TIMEOUT_SECS") {
            self.timeouts.git_secs = v;
        }
        if let Some(v) = env_parse("AUTOPILOT_LINT_TIMEOUT_SECS") {
            self.timeouts.lint_secs = v;
        }
        if let Ok(v) = env::var("AUTOPILOT_LINT_ENABLED") {
            self.lint.enabled = matches!(v.as_str(), "1" | "true" | "yes");
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

// =============================================================================
// Path helpers
// =============================================================================

/// The name of the project-scoped state directory owned by the build loop.
pub const AUTOPILOT_DIR_NAME: &str = ".autopilot";

/// Resolve `~/.claude`, the host tool's configuration root.
pub fn claude_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".claude"))
}

/// Resolve a path relative to `~/.claude`.
pub fn claude_path(rel: &str) -> Option<PathBuf> {
    claude_dir().map(|dir| dir.join(rel))
}

/// `~/.claude/settings.json`.
pub fn settings_path() -> Option<PathBuf> {
    claude_path("settings.json")
}

/// `~/.claude/settings.json.bak`, written before any mutation.
pub fn settings_backup_path() -> Option<PathBuf> {
    claude_path("settings.json.bak")
}

/// `~/.claude/autopilot.toml` (user-level config).
pub fn user_config_path() -> Option<PathBuf> {
    claude_path("autopilot.toml")
}

/// `~/.claude/autopilot-crash.log` (panic handler target).
pub fn crash_log_path() -> Option<PathBuf> {
    claude_path("autopilot-crash.log")
}

/// Normalize a path to forward slashes for use in settings.json commands.
/// Claude Code on Windows uses forward-slash paths in hook commands.
pub fn forward_slash(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
