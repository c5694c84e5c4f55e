//! Uninstall command: remove the distributed files and every tagged hook
//! registration, leaving foreign settings content exactly as found.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::manifest::all_files;
use crate::settings::{backup_settings, read_settings, remove_all, write_settings};

/// Options for the uninstall command.
#[derive(Debug, Clone, Default)]
pub struct UninstallOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
}

/// Output format for the uninstall command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UninstallOutput {
    pub success: bool,
    pub files_removed: Vec<String>,
    pub hooks_removed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The uninstall command implementation.
pub struct UninstallCommand {
    claude_dir: PathBuf,
}

impl UninstallCommand {
    pub fn new(claude_dir: impl Into<PathBuf>) -> Self {
        Self {
            claude_dir: claude_dir.into(),
        }
    }

    pub fn run(&self, _options: &UninstallOptions) -> UninstallOutput {
        let mut output = UninstallOutput {
            success: true,
            files_removed: Vec::new(),
            hooks_removed: 0,
            backup: None,
            error: None,
        };

        for entry in all_files() {
            let path = self.claude_dir.join(entry.dest);
            if path.exists() && fs::remove_file(&path).is_ok() {
                output.files_removed.push(path.display().to_string());
            }
        }
        // remove_dir refuses non-empty directories, which is exactly the
        // guard needed: user-added files keep their directory alive.
        for dir in ["commands", "rules"] {
            let _ = fs::remove_dir(self.claude_dir.join(dir));
        }

        let settings_path = self.claude_dir.join("settings.json");
        if settings_path.exists() {
            let backup_path = self.claude_dir.join("settings.json.bak");
            if let Err(e) = backup_settings(&settings_path, &backup_path) {
                output.success = false;
                output.error = Some(e.to_string());
                return output;
            }
            output.backup = Some(backup_path.display().to_string());

            let mut doc = read_settings(&settings_path);
            output.hooks_removed = remove_all(&mut doc);
            if let Err(e) = write_settings(&settings_path, &doc) {
                output.success = false;
                output.error = Some(e.to_string());
                return output;
            }
        }

        output
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &UninstallOutput, options: &UninstallOptions) -> String {
        if options.quiet {
            return String::new();
        }
        if options.json {
            return serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string());
        }

        if !output.success {
            return format!(
                "Uninstall failed: {}\n",
                output.error.as_deref().unwrap_or("unknown error")
            );
        }
        let mut lines = vec![format!(
            "Removed {} file(s) and {} hook registration(s)",
            output.files_removed.len(),
            output.hooks_removed
        )];
        if let Some(backup) = &output.backup {
            lines.push(format!("Settings backup: {backup}"));
        }
        lines.join("\n") + "\n"
    }
}
