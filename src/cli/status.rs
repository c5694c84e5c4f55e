//! Status command: report which distributed files and hook registrations
//! are present.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::manifest::{all_files, all_registrations};
use crate::settings::{is_installed, read_settings};

/// Options for the status command.
#[derive(Debug, Clone, Default)]
pub struct StatusOptions {
    /// Output as JSON.
    pub json: bool,
}

/// One checked item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusItem {
    pub name: String,
    pub present: bool,
}

/// Output format for the status command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusOutput {
    /// Whether every core hook registration is present.
    pub core_installed: bool,
    pub files: Vec<StatusItem>,
    pub hooks: Vec<StatusItem>,
}

/// The status command implementation.
pub struct StatusCommand {
    claude_dir: PathBuf,
}

impl StatusCommand {
    pub fn new(claude_dir: impl Into<PathBuf>) -> Self {
        Self {
            claude_dir: claude_dir.into(),
        }
    }

    pub fn run(&self) -> StatusOutput {
        let files = all_files()
            .into_iter()
            .map(|entry| StatusItem {
                name: entry.dest.to_string(),
                present: self.claude_dir.join(entry.dest).is_file(),
            })
            .collect();

        let doc = read_settings(&self.claude_dir.join("settings.json"));
        let regs = all_registrations();
        let hooks: Vec<StatusItem> = regs
            .iter()
            .map(|reg| StatusItem {
                name: reg.guard.slug().to_string(),
                present: is_installed(&doc, reg),
            })
            .collect();

        let core_installed = regs
            .iter()
            .zip(&hooks)
            .filter(|(reg, _)| reg.guard.is_core())
            .all(|(_, item)| item.present);

        StatusOutput {
            core_installed,
            files,
            hooks,
        }
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &StatusOutput, options: &StatusOptions) -> String {
        if options.json {
            return serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string());
        }

        let mut lines = Vec::new();
        lines.push("Files:".to_string());
        for item in &output.files {
            lines.push(format!(
                "  [{}] {}",
                if item.present { "x" } else { " " },
                item.name
            ));
        }
        lines.push("Hooks:".to_string());
        for item in &output.hooks {
            lines.push(format!(
                "  [{}] {}",
                if item.present { "x" } else { " " },
                item.name
            ));
        }
        lines.push(if output.core_installed {
            "Autopilot core hooks are installed.".to_string()
        } else {
            "Autopilot core hooks are NOT fully installed. Run `autopilot init`.".to_string()
        });
        lines.join("\n") + "\n"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::install::{InstallCommand, InstallOptions};
    use crate::cli::prompt::AssumeYes;
    use tempfile::TempDir;

    #[test]
    fn test_status_clean_machine() {
        let temp = TempDir::new().unwrap();
        let output = StatusCommand::new(temp.path()).run();
        assert!(!output.core_installed);
        assert!(output.files.iter().all(|f| !f.present));
        assert!(output.hooks.iter().all(|h| !h.present));
    }

    #[test]
    fn test_status_after_full_install() {
        let temp = TempDir::new().unwrap();
        InstallCommand::new(temp.path(), "/opt/autopilot/bin/autopilot").run(
            &InstallOptions {
                yes: true,
                ..Default::default()
            },
            &AssumeYes,
        );

        let output = StatusCommand::new(temp.path()).run();
        assert!(output.core_installed);
        assert!(output.files.iter().all(|f| f.present));
        assert!(output.hooks.iter().all(|h| h.present));
    }

    #[test]
    fn test_status_after_core_install() {
        let temp = TempDir::new().unwrap();
        InstallCommand::new(temp.path(), "/opt/autopilot/bin/autopilot").run(
            &InstallOptions {
                yes: true,
                core: true,
                ..Default::default()
            },
            &AssumeYes,
        );

        let output = StatusCommand::new(temp.path()).run();
        assert!(output.core_installed);
        let lint = output.hooks.iter().find(|h| h.name == "lint-check").unwrap();
        assert!(!lint.present);
    }

    #[test]
    fn test_format_human_readable() {
        let temp = TempDir::new().unwrap();
        let cmd = StatusCommand::new(temp.path());
        let formatted = cmd.format_output(&cmd.run(), &StatusOptions::default());
        assert!(formatted.contains("[ ] commands/plan.md"));
        assert!(formatted.contains("NOT fully installed"));
    }
}
