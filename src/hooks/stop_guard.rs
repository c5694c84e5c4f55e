//! Stop guard for working-tree hygiene: refuse to end the session while
//! `git status` reports uncommitted changes.
//!
//! Git being absent, the cwd not being a repository, or git hanging are
//! all treated as "nothing to check".

use crate::config::Config;
use crate::exec::{git_porcelain, CommandRunner};
use crate::hooks::input::EventContext;
use crate::hooks::output::Verdict;
use std::time::Duration;

pub fn decide(ctx: &EventContext, config: &Config, runner: &dyn CommandRunner) -> Verdict {
    if ctx.stop_hook_active() {
        return Verdict::Allow;
    }

    let cwd = ctx.working_dir();
    let timeout = Duration::from_secs(config.timeouts.git_secs);
    let status = match git_porcelain(runner, &cwd, timeout) {
        Ok(status) => status,
        Err(e) => {
            tracing::debug!("git status unavailable, allowing stop: {e}");
            return Verdict::Allow;
        }
    };

    let lines: Vec<&str> = status.lines().filter(|l| !l.trim().is_empty()).collect();
    if lines.is_empty() {
        return Verdict::Allow;
    }

    let mut message = format!(
        "{} uncommitted change(s) in the working tree:\n",
        lines.len()
    );
    for line in &lines {
        message.push_str(line);
        message.push('\n');
    }
    message.push_str("Commit or stash these changes before stopping.");
    Verdict::Block(message)
}
