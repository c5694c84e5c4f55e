//! Autopilot - TDD guardrails and autonomous-build hooks for Claude Code
//!
//! Autopilot installs a small set of hook guards into Claude Code: tool
//! calls are auto-approved while a build loop is active, stopping is
//! blocked while planned tasks are pending or changes are uncommitted,
//! and implementation edits without a paired test are caught as they
//! happen. The installer reconciles its `settings.json` entries by an
//! ownership tag, so repeated installs, upgrades, and uninstalls never
//! disturb foreign configuration.

pub mod cli;
pub mod config;
pub mod discovery;
pub mod error;
pub mod exec;
pub mod hooks;
pub mod manifest;
pub mod settings;
pub mod util;

pub use config::Config;
pub use error::{AutopilotError, Result};
pub use hooks::{run_hook, EventContext, HookOutput, Verdict};
pub use manifest::{GuardKind, HookEvent, HookRegistration, TAG};
pub use settings::SettingsDocument;

// CLI commands
pub use cli::{InstallCommand, StatusCommand, UninstallCommand};
