//! Post-edit lint, format, and type-check.
//!
//! Auto-fixable issues are fixed in place; only what remains after fixing
//! can block. A missing tool means the project does not use it, so every
//! lookup failure is a silent skip. Type errors block only in `build`
//! mode and warn otherwise.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::{forward_slash, Config};
use crate::discovery::{candidate_dirs, resolve_mode_from_candidates, Mode, ModeResolution};
use crate::exec::CommandRunner;
use crate::hooks::input::EventContext;
use crate::hooks::output::Verdict;

/// Locate a tool by name, preferring PATH and falling back to the places
/// version managers commonly install to without updating PATH for
/// non-login shells.
fn locate_tool(name: &str) -> Option<String> {
    if let Ok(path) = which::which(name) {
        return Some(forward_slash(&path));
    }
    let mut fallbacks = vec![PathBuf::from("/usr/local/bin").join(name)];
    if let Some(home) = dirs::home_dir() {
        fallbacks.push(home.join(".local/bin").join(name));
    }
    fallbacks
        .into_iter()
        .find(|p| p.is_file())
        .map(|p| forward_slash(&p))
}

pub fn decide(ctx: &EventContext, config: &Config, runner: &dyn CommandRunner) -> Verdict {
    decide_with(ctx, config, runner, &locate_tool)
}

pub fn decide_with(
    ctx: &EventContext,
    config: &Config,
    runner: &dyn CommandRunner,
    locate: &dyn Fn(&str) -> Option<String>,
) -> Verdict {
    if !config.lint.enabled {
        return Verdict::Allow;
    }
    let Some(file_path) = ctx.file_path() else {
        return Verdict::Allow;
    };
    if forward_slash(file_path).contains("/hooks/") {
        return Verdict::Allow;
    }

    let ext = file_path.extension().and_then(|e| e.to_str()).unwrap_or("");
    match ext {
        "py" => check_python(ctx, config, runner, locate, file_path),
        "ts" | "tsx" | "js" | "jsx" => check_script(ctx, config, runner, locate, file_path, ext),
        _ => Verdict::Allow,
    }
}

/// Run a tool, treating execution failures and timeouts as "no result".
fn run_tool(
    runner: &dyn CommandRunner,
    program: &str,
    args: &[&str],
    cwd: &Path,
    timeout: Duration,
) -> Option<crate::exec::ExecOutput> {
    match runner.run(program, args, cwd, timeout) {
        Ok(output) => Some(output),
        Err(e) => {
            tracing::debug!("{program} skipped: {e}");
            None
        }
    }
}

fn check_python(
    ctx: &EventContext,
    config: &Config,
    runner: &dyn CommandRunner,
    locate: &dyn Fn(&str) -> Option<String>,
    file_path: &Path,
) -> Verdict {
    let Some(ruff) = locate("ruff") else {
        return Verdict::Allow;
    };
    let cwd = ctx.working_dir();
    let timeout = Duration::from_secs(config.timeouts.lint_secs);
    let file = forward_slash(file_path);

    run_tool(runner, &ruff, &["check", "--fix", &file], &cwd, timeout);
    run_tool(runner, &ruff, &["format", &file], &cwd, timeout);

    let Some(result) = run_tool(runner, &ruff, &["check", &file], &cwd, timeout) else {
        return Verdict::Allow;
    };
    if result.success {
        return Verdict::Allow;
    }
    Verdict::Block(format!(
        "ruff found unfixable issues in {file}:\n{}",
        combined_output(&result)
    ))
}

fn check_script(
    ctx: &EventContext,
    config: &Config,
    runner: &dyn CommandRunner,
    locate: &dyn Fn(&str) -> Option<String>,
    file_path: &Path,
    ext: &str,
) -> Verdict {
    let cwd = ctx.working_dir();
    let timeout = Duration::from_secs(config.timeouts.lint_secs);
    let file = forward_slash(file_path);

    if let Some(prettier) = locate("prettier") {
        run_tool(runner, &prettier, &["--write", &file], &cwd, timeout);
    }
    if let Some(eslint) = locate("eslint") {
        if let Some(result) = run_tool(runner, &eslint, &["--fix", &file], &cwd, timeout) {
            if !result.success {
                return Verdict::Block(format!(
                    "eslint found unfixable issues in {file}:\n{}",
                    combined_output(&result)
                ));
            }
        }
    }

    if matches!(ext, "ts" | "tsx") {
        if let Some(tsc) = locate("tsc") {
            if let Some(tsconfig) =
                find_nearest_tsconfig(file_path, config.walk.tests_max_depth)
            {
                let project = forward_slash(&tsconfig);
                if let Some(result) =
                    run_tool(runner, &tsc, &["--noEmit", "-p", &project], &cwd, timeout)
                {
                    if !result.success {
                        return type_error_verdict(ctx, config, &file, &result);
                    }
                }
            }
        }
    }
    Verdict::Allow
}

fn type_error_verdict(
    ctx: &EventContext,
    config: &Config,
    file: &str,
    result: &crate::exec::ExecOutput,
) -> Verdict {
    let message = format!(
        "type errors after editing {file}:\n{}",
        combined_output(result)
    );
    let cwd = ctx.working_dir();
    let candidates = candidate_dirs(&ctx.tool_input, Some(&cwd));
    match resolve_mode_from_candidates(&candidates, config.walk.guard_mode_max_depth) {
        ModeResolution::Active { mode: Mode::Build, .. } => Verdict::Block(message),
        _ => Verdict::Warn(message),
    }
}

fn find_nearest_tsconfig(file_path: &Path, max_depth: usize) -> Option<PathBuf> {
    let mut current = file_path.parent()?.to_path_buf();
    for _ in 0..max_depth {
        let candidate = current.join("tsconfig.json");
        if candidate.is_file() {
            return Some(candidate);
        }
        match current.parent() {
            Some(parent) if parent != current => current = parent.to_path_buf(),
            _ => break,
        }
    }
    None
}

fn combined_output(result: &crate::exec::ExecOutput) -> String {
    let mut out = result.stdout.trim_end().to_string();
    let err = result.stderr.trim_end();
    if !err.is_empty() {
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(err);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::testing::{failed_output, ok_output, FnRunner};
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn ctx_for(temp: &TempDir, rel: &str) -> EventContext {
        EventContext {
            tool_name: Some("Write".to_string()),
            tool_input: json!({ "file_path": temp.path().join(rel).to_string_lossy() }),
            cwd: Some(temp.path().to_path_buf()),
            ..Default::default()
        }
    }

    fn found(name: &str) -> Option<String> {
        Some(name.to_string())
    }

    #[test]
    fn test_disabled_config_allows() {
        let temp = TempDir::new().unwrap();
        let mut config = Config::default();
        config.lint.enabled = false;
        let runner = FnRunner::new(|_: &str, _: &[&str]| -> crate::error::Result<crate::exec::ExecOutput> {
            panic!("must not run")
        });
        assert_eq!(
            decide_with(&ctx_for(&temp, "a.py"), &config, &runner, &found),
            Verdict::Allow
        );
    }

    #[test]
    fn test_ruff_clean_after_fixes_allows() {
        let temp = TempDir::new().unwrap();
        let runner = FnRunner::new(|_: &str, _: &[&str]| Ok(ok_output("")));
        assert_eq!(
            decide_with(&ctx_for(&temp, "src/app.py"), &Config::default(), &runner, &found),
            Verdict::Allow
        );
    }

    #[test]
    fn test_ruff_residual_errors_block() {
        let temp = TempDir::new().unwrap();
        let runner = FnRunner::new(|_: &str, args: &[&str]| {
            if args.first() == Some(&"check") && args.len() == 2 {
                Ok(failed_output(1, "app.py:1:1: F821 undefined name", ""))
            } else {
                Ok(ok_output(""))
            }
        });
        let verdict = decide_with(
            &ctx_for(&temp, "src/app.py"),
            &Config::default(),
            &runner,
            &found,
        );
        let Verdict::Block(message) = verdict else {
            panic!("expected block, got {verdict:?}");
        };
        assert!(message.contains("F821"));
    }

    #[test]
    fn test_ruff_missing_allows() {
        let temp = TempDir::new().unwrap();
        let runner = FnRunner::new(|_: &str, _: &[&str]| -> crate::error::Result<crate::exec::ExecOutput> {
            panic!("must not run")
        });
        let not_found = |_: &str| -> Option<String> { None };
        assert_eq!(
            decide_with(
                &ctx_for(&temp, "src/app.py"),
                &Config::default(),
                &runner,
                &not_found
            ),
            Verdict::Allow
        );
    }

    #[test]
    fn test_eslint_errors_block() {
        let temp = TempDir::new().unwrap();
        let runner = FnRunner::new(|program: &str, _: &[&str]| {
            if program == "eslint" {
                Ok(failed_output(1, "1:1 error no-undef", ""))
            } else {
                Ok(ok_output(""))
            }
        });
        let verdict = decide_with(
            &ctx_for(&temp, "src/app.js"),
            &Config::default(),
            &runner,
            &found,
        );
        assert!(verdict.is_block());
    }

    #[test]
    fn test_type_errors_block_in_build_mode() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join(".autopilot");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("mode"), "build").unwrap();
        fs::create_dir_all(temp.path().join("src")).unwrap();
        fs::write(temp.path().join("tsconfig.json"), "{}").unwrap();

        let runner = FnRunner::new(|program: &str, _: &[&str]| {
            if program == "tsc" {
                Ok(failed_output(2, "src/app.ts(1,1): error TS2304", ""))
            } else {
                Ok(ok_output(""))
            }
        });
        let verdict = decide_with(
            &ctx_for(&temp, "src/app.ts"),
            &Config::default(),
            &runner,
            &found,
        );
        assert!(verdict.is_block());
    }

    #[test]
    fn test_type_errors_warn_outside_build_mode() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("src")).unwrap();
        fs::write(temp.path().join("tsconfig.json"), "{}").unwrap();

        let runner = FnRunner::new(|program: &str, _: &[&str]| {
            if program == "tsc" {
                Ok(failed_output(2, "src/app.ts(1,1): error TS2304", ""))
            } else {
                Ok(ok_output(""))
            }
        });
        let verdict = decide_with(
            &ctx_for(&temp, "src/app.ts"),
            &Config::default(),
            &runner,
            &found,
        );
        assert!(matches!(verdict, Verdict::Warn(_)));
    }

    #[test]
    fn test_no_tsconfig_skips_type_check() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("src")).unwrap();
        let runner = FnRunner::new(|program: &str, _: &[&str]| {
            assert_ne!(program, "tsc", "tsc must not run without a tsconfig");
            Ok(ok_output(""))
        });
        assert_eq!(
            decide_with(
                &ctx_for(&temp, "src/app.ts"),
                &Config::default(),
                &runner,
                &found
            ),
            Verdict::Allow
        );
    }

    #[test]
    fn test_hooks_path_skipped() {
        let temp = TempDir::new().unwrap();
        let runner = FnRunner::new(|_: &str, _: &[&str]| -> crate::error::Result<crate::exec::ExecOutput> {
            panic!("must not run")
        });
        assert_eq!(
            decide_with(
                &ctx_for(&temp, "src/hooks/useAuth.ts"),
                &Config::default(),
                &runner,
                &found
            ),
            Verdict::Allow
        );
    }

    #[test]
    fn test_unknown_extension_allows() {
        let temp = TempDir::new().unwrap();
        let runner = FnRunner::new(|_: &str, _: &[&str]| -> crate::error::Result<crate::exec::ExecOutput> {
            panic!("must not run")
        });
        assert_eq!(
            decide_with(
                &ctx_for(&temp, "src/main.rs"),
                &Config::default(),
                &runner,
                &found
            ),
            Verdict::Allow
        );
    }
}
