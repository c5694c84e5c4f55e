//! Bounded execution of external tools (git, linters, type checkers).
//!
//! Every invocation carries a deadline. A tool that hangs must not wedge
//! the hook, so the child is polled and killed at the deadline rather than
//! waited on unconditionally.

use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::error::{AutopilotError, Result};

/// Captured result of a finished external command.
#[derive(Debug, Clone, Default)]
pub struct ExecOutput {
    pub success: bool,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Seam for running external commands, so guard decisions are testable
/// without git or linters on the test machine.
pub trait CommandRunner {
    fn run(&self, program: &str, args: &[&str], cwd: &Path, timeout: Duration)
        -> Result<ExecOutput>;
}

/// The production runner: real processes with deadline enforcement.
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(
        &self,
        program: &str,
        args: &[&str],
        cwd: &Path,
        timeout: Duration,
    ) -> Result<ExecOutput> {
        let mut child = Command::new(program)
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| AutopilotError::exec(format!("failed to spawn {program}: {e}")))?;

        // Drain both pipes on their own threads so a chatty child cannot
        // deadlock against a full pipe buffer while we poll.
        let stdout_reader = spawn_reader(child.stdout.take());
        let stderr_reader = spawn_reader(child.stderr.take());

        let deadline = Instant::now() + timeout;
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {
                    if Instant::now() >= deadline {
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(AutopilotError::ExecTimeout {
                            command: render_command(program, args),
                            timeout_secs: timeout.as_secs(),
                        });
                    }
                    thread::sleep(Duration::from_millis(25));
                }
                Err(e) => {
                    return Err(AutopilotError::exec(format!(
                        "failed waiting for {program}: {e}"
                    )));
                }
            }
        };

        Ok(ExecOutput {
            success: status.success(),
            exit_code: status.code(),
            stdout: stdout_reader.join().unwrap_or_default(),
            stderr: stderr_reader.join().unwrap_or_default(),
        })
    }
}

fn spawn_reader<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = String::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_string(&mut buf);
        }
        buf
    })
}

fn render_command(program: &str, args: &[&str]) -> String {
    let mut rendered = program.to_string();
    for arg in args {
        rendered.push(' ');
        rendered.push_str(arg);
    }
    rendered
}

/// Run `git status --porcelain` in `cwd` and return its stdout.
pub fn git_porcelain(runner: &dyn CommandRunner, cwd: &Path, timeout: Duration) -> Result<String> {
    let output = runner.run("git", &["status", "--porcelain"], cwd, timeout)?;
    if !output.success {
        return Err(AutopilotError::exec(format!(
            "git status failed: {}",
            output.stderr.trim()
        )));
    }
    Ok(output.stdout)
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use std::path::PathBuf;

    fn cwd() -> PathBuf {
        std::env::temp_dir()
    }

    #[test]
    fn test_system_runner_captures_output() {
        let output = SystemRunner
            .run("echo", &["hello"], &cwd(), Duration::from_secs(5))
            .unwrap();
        assert!(output.success);
        assert_eq!(output.stdout.trim(), "hello");
    }

    #[test]
    fn test_system_runner_nonzero_exit() {
        let output = SystemRunner
            .run("false", &[], &cwd(), Duration::from_secs(5))
            .unwrap();
        assert!(!output.success);
        assert_eq!(output.exit_code, Some(1));
    }

    #[test]
    fn test_system_runner_missing_program() {
        let err = SystemRunner
            .run("autopilot-no-such-binary", &[], &cwd(), Duration::from_secs(5))
            .unwrap_err();
        assert!(matches!(err, AutopilotError::Exec { .. }));
    }

    #[test]
    fn test_system_runner_timeout_kills_child() {
        let start = Instant::now();
        let err = SystemRunner
            .run("sleep", &["30"], &cwd(), Duration::from_millis(200))
            .unwrap_err();
        assert!(matches!(err, AutopilotError::ExecTimeout { .. }));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_git_porcelain_returns_stdout() {
        let runner = FnRunner::new(|program: &str, args: &[&str]| {
            assert_eq!(program, "git");
            assert_eq!(args, ["status", "--porcelain"]);
            Ok(ok_output(" M src/app.py\n"))
        });
        let stdout = git_porcelain(&runner, &cwd(), Duration::from_secs(10)).unwrap();
        assert_eq!(stdout, " M src/app.py\n");
    }

    #[test]
    fn test_git_porcelain_failure_is_error() {
        let runner = FnRunner::new(|_: &str, _: &[&str]| {
            Ok(failed_output(128, "", "fatal: not a git repository"))
        });
        assert!(git_porcelain(&runner, &cwd(), Duration::from_secs(10)).is_err());
    }
}
