//! Install command: write the distributed files and reconcile hook
//! registrations in `settings.json`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::cli::prompt::Prompter;
use crate::manifest::{
    all_files, registrations_for, GuardKind, HookRegistration, OPTIONAL_REGISTRATIONS,
};
use crate::settings::{
    backup_settings, deduplicate, detect_conflicts, merge, read_settings, write_settings,
};

/// Options for the install command.
#[derive(Debug, Clone, Default)]
pub struct InstallOptions {
    /// Install everything without prompting.
    pub yes: bool,
    /// Install only the core hooks, skipping the optional set.
    pub core: bool,
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
}

/// Output format for the install command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallOutput {
    pub success: bool,
    /// Command and rule files written under the config root.
    pub files_written: Vec<String>,
    /// Guard slugs whose registrations were merged.
    pub hooks_installed: Vec<String>,
    /// Stale foreign entries removed from settings.json.
    pub conflicts_removed: usize,
    /// Where the pre-mutation settings backup was written.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl InstallOutput {
    fn failure(error: impl Into<String>, partial: InstallOutput) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..partial
        }
    }

    fn empty() -> Self {
        Self {
            success: true,
            files_written: Vec::new(),
            hooks_installed: Vec::new(),
            conflicts_removed: 0,
            backup: None,
            error: None,
        }
    }
}

/// The install command implementation.
pub struct InstallCommand {
    /// The host's config root (normally `~/.claude`).
    claude_dir: PathBuf,
    /// The binary path to register in hook commands.
    exe: PathBuf,
}

impl InstallCommand {
    pub fn new(claude_dir: impl Into<PathBuf>, exe: impl Into<PathBuf>) -> Self {
        Self {
            claude_dir: claude_dir.into(),
            exe: exe.into(),
        }
    }

    pub fn run(&self, options: &InstallOptions, prompter: &dyn Prompter) -> InstallOutput {
        let mut output = InstallOutput::empty();

        let regs = registrations_for(&self.select_optional(options, prompter));

        for entry in all_files() {
            let dest = self.claude_dir.join(entry.dest);
            if let Err(e) = write_file(&dest, entry.contents) {
                return InstallOutput::failure(e, output);
            }
            output.files_written.push(dest.display().to_string());
        }

        let settings_path = self.claude_dir.join("settings.json");
        let backup_path = self.claude_dir.join("settings.json.bak");
        let mut doc = read_settings(&settings_path);

        let conflicts = detect_conflicts(&doc, &regs);
        let remove_stale = !conflicts.is_empty()
            && (options.yes
                || prompter.confirm(
                    &format!(
                        "{} existing hook entr{} point at autopilot guards from another \
                         installation. Remove them?",
                        conflicts.len(),
                        if conflicts.len() == 1 { "y" } else { "ies" }
                    ),
                    true,
                ));

        if settings_path.exists() {
            if let Err(e) = backup_settings(&settings_path, &backup_path) {
                return InstallOutput::failure(e.to_string(), output);
            }
            output.backup = Some(backup_path.display().to_string());
        }

        if remove_stale {
            output.conflicts_removed = deduplicate(&mut doc, &regs);
        }
        merge(&mut doc, &regs, &self.exe);

        if let Err(e) = write_settings(&settings_path, &doc) {
            return InstallOutput::failure(e.to_string(), output);
        }
        output.hooks_installed = regs.iter().map(|r| r.guard.slug().to_string()).collect();
        output
    }

    /// Decide which optional guards to register.
    fn select_optional(&self, options: &InstallOptions, prompter: &dyn Prompter) -> Vec<GuardKind> {
        if options.core {
            return Vec::new();
        }
        if options.yes {
            return GuardKind::OPTIONAL.to_vec();
        }
        let items: Vec<String> = OPTIONAL_REGISTRATIONS
            .iter()
            .map(describe_optional)
            .collect();
        prompter
            .multi_select("Optional hooks to install", &items)
            .into_iter()
            .filter_map(|i| OPTIONAL_REGISTRATIONS.get(i).map(|r| r.guard))
            .collect()
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &InstallOutput, options: &InstallOptions) -> String {
        if options.quiet {
            return String::new();
        }
        if options.json {
            return serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string());
        }

        let mut lines = Vec::new();
        if !output.success {
            lines.push(format!(
                "Install failed: {}",
                output.error.as_deref().unwrap_or("unknown error")
            ));
            if !output.files_written.is_empty() {
                lines.push("Written before failure:".to_string());
                for path in &output.files_written {
                    lines.push(format!("  {path}"));
                }
            }
            return lines.join("\n") + "\n";
        }

        lines.push(format!(
            "Installed {} file(s) under {}",
            output.files_written.len(),
            self.claude_dir.display()
        ));
        lines.push(format!(
            "Registered hooks: {}",
            output.hooks_installed.join(", ")
        ));
        if output.conflicts_removed > 0 {
            lines.push(format!(
                "Removed {} stale hook entr{}",
                output.conflicts_removed,
                if output.conflicts_removed == 1 { "y" } else { "ies" }
            ));
        }
        if let Some(backup) = &output.backup {
            lines.push(format!("Settings backup: {backup}"));
        }
        lines.join("\n") + "\n"
    }
}

fn describe_optional(reg: &HookRegistration) -> String {
    let what = match reg.guard {
        GuardKind::Lint => "lint-check: auto-fix and lint after every edit",
        GuardKind::StopGuard => "stop-guard: refuse to stop with uncommitted changes",
        GuardKind::ContextMonitor => "context-monitor: warn when the context window grows large",
        _ => reg.guard.slug(),
    };
    what.to_string()
}

fn write_file(path: &Path, contents: &str) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("failed to create {}: {e}", parent.display()))?;
    }
    fs::write(path, contents).map_err(|e| format!("failed to write {}: {e}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::prompt::{AssumeYes, ScriptedPrompter};
    use crate::manifest::{all_registrations, CORE_REGISTRATIONS, TAG};
    use crate::settings::is_installed;
    use tempfile::TempDir;

    fn command(temp: &TempDir) -> InstallCommand {
        InstallCommand::new(temp.path(), "/opt/autopilot/bin/autopilot")
    }

    #[test]
    fn test_install_yes_writes_everything() {
        let temp = TempDir::new().unwrap();
        let cmd = command(&temp);
        let output = cmd.run(
            &InstallOptions {
                yes: true,
                ..Default::default()
            },
            &AssumeYes,
        );

        assert!(output.success);
        assert_eq!(output.files_written.len(), 8);
        assert_eq!(output.hooks_installed.len(), 6);
        assert!(temp.path().join("commands/plan.md").is_file());
        assert!(temp.path().join("rules/tdd-enforcement.md").is_file());

        let doc = read_settings(&temp.path().join("settings.json"));
        for reg in all_registrations() {
            assert!(is_installed(&doc, &reg), "{} missing", reg.guard.slug());
        }
    }

    #[test]
    fn test_install_core_skips_optional() {
        let temp = TempDir::new().unwrap();
        let cmd = command(&temp);
        let output = cmd.run(
            &InstallOptions {
                core: true,
                yes: true,
                ..Default::default()
            },
            &AssumeYes,
        );

        assert_eq!(output.hooks_installed.len(), 3);
        let doc = read_settings(&temp.path().join("settings.json"));
        assert!(is_installed(&doc, &CORE_REGISTRATIONS[0]));
        assert!(!is_installed(&doc, &OPTIONAL_REGISTRATIONS[0]));
    }

    #[test]
    fn test_install_interactive_selection() {
        let temp = TempDir::new().unwrap();
        let cmd = command(&temp);
        // Select only the second optional entry (stop-guard).
        let prompter = ScriptedPrompter {
            confirm_answer: true,
            selection: vec![1],
        };
        let output = cmd.run(&InstallOptions::default(), &prompter);

        assert_eq!(output.hooks_installed.len(), 4);
        assert!(output.hooks_installed.contains(&"stop-guard".to_string()));
        assert!(!output.hooks_installed.contains(&"lint-check".to_string()));
    }

    #[test]
    fn test_install_backs_up_existing_settings() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("settings.json"), r#"{ "model": "opus" }"#).unwrap();

        let cmd = command(&temp);
        let output = cmd.run(
            &InstallOptions {
                yes: true,
                ..Default::default()
            },
            &AssumeYes,
        );

        assert!(output.backup.is_some());
        let backup = fs::read_to_string(temp.path().join("settings.json.bak")).unwrap();
        assert_eq!(backup, r#"{ "model": "opus" }"#);

        let merged = fs::read_to_string(temp.path().join("settings.json")).unwrap();
        assert!(merged.contains("\"model\": \"opus\""));
        assert!(merged.contains(TAG));
    }

    #[test]
    fn test_install_removes_stale_entries_when_confirmed() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join("settings.json"),
            r#"{
              "hooks": {
                "Stop": [
                  { "hooks": [
                    { "type": "command", "command": "node /old/hooks/build-guard.js" }
                  ] }
                ]
              }
            }"#,
        )
        .unwrap();

        let cmd = command(&temp);
        let output = cmd.run(
            &InstallOptions {
                yes: true,
                ..Default::default()
            },
            &AssumeYes,
        );

        assert_eq!(output.conflicts_removed, 1);
        let doc = read_settings(&temp.path().join("settings.json"));
        assert!(detect_conflicts(&doc, &all_registrations()).is_empty());
    }

    #[test]
    fn test_install_keeps_stale_entries_when_declined() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join("settings.json"),
            r#"{
              "hooks": {
                "Stop": [
                  { "hooks": [
                    { "type": "command", "command": "node /old/hooks/build-guard.js" }
                  ] }
                ]
              }
            }"#,
        )
        .unwrap();

        let cmd = command(&temp);
        let prompter = ScriptedPrompter {
            confirm_answer: false,
            selection: vec![0, 1, 2],
        };
        let output = cmd.run(&InstallOptions::default(), &prompter);

        assert_eq!(output.conflicts_removed, 0);
        let doc = read_settings(&temp.path().join("settings.json"));
        assert_eq!(detect_conflicts(&doc, &all_registrations()).len(), 1);
    }

    #[test]
    fn test_install_idempotent() {
        let temp = TempDir::new().unwrap();
        let cmd = command(&temp);
        let options = InstallOptions {
            yes: true,
            ..Default::default()
        };
        cmd.run(&options, &AssumeYes);
        let first = fs::read_to_string(temp.path().join("settings.json")).unwrap();
        cmd.run(&options, &AssumeYes);
        let second = fs::read_to_string(temp.path().join("settings.json")).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_format_output_json() {
        let temp = TempDir::new().unwrap();
        let cmd = command(&temp);
        let output = cmd.run(
            &InstallOptions {
                yes: true,
                json: true,
                ..Default::default()
            },
            &AssumeYes,
        );
        let formatted = cmd.format_output(
            &output,
            &InstallOptions {
                json: true,
                ..Default::default()
            },
        );
        let parsed: serde_json::Value = serde_json::from_str(&formatted).unwrap();
        assert_eq!(parsed["success"], true);
    }

    #[test]
    fn test_format_output_quiet() {
        let temp = TempDir::new().unwrap();
        let cmd = command(&temp);
        let output = InstallOutput::empty();
        assert_eq!(
            cmd.format_output(
                &output,
                &InstallOptions {
                    quiet: true,
                    ..Default::default()
                }
            ),
            ""
        );
    }
}
