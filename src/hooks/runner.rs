//! Entry point for `autopilot hook <guard>`: read the event from stdin,
//! dispatch to the guard, emit the verdict.

use std::io::{self, Read};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use crate::config::Config;
use crate::error::exit_codes;
use crate::exec::{CommandRunner, SystemRunner};
use crate::hooks::input::EventContext;
use crate::hooks::output::Verdict;
use crate::hooks::{approve, build_guard, context, lint, stop_guard, tdd};
use crate::manifest::GuardKind;

/// Run one guard end to end and return its exit code.
pub fn run_hook(guard: GuardKind) -> i32 {
    let Some(raw) = read_stdin_with_deadline(guard.stdin_deadline()) else {
        // No event arrived in time. There is nothing to decide about, and
        // hanging here would stall the host, so allow silently.
        tracing::debug!("no event on stdin for {}", guard.slug());
        return exit_codes::APPROVE;
    };
    let Some(ctx) = EventContext::parse(&raw) else {
        tracing::warn!("unparsable event for {}, allowing", guard.slug());
        return exit_codes::APPROVE;
    };

    let config = Config::load(&ctx.working_dir());
    let verdict = dispatch(guard, &ctx, &config, &SystemRunner);
    emit(&verdict)
}

/// Route an event to its guard's decision function.
pub fn dispatch(
    guard: GuardKind,
    ctx: &EventContext,
    config: &Config,
    runner: &dyn CommandRunner,
) -> Verdict {
    match guard {
        GuardKind::Approve => approve::decide(ctx, config),
        GuardKind::Tdd => tdd::decide(ctx, config),
        GuardKind::BuildGuard => build_guard::decide(ctx, config),
        GuardKind::StopGuard => stop_guard::decide(ctx, config, runner),
        GuardKind::Lint => lint::decide(ctx, config, runner),
        GuardKind::ContextMonitor => context::decide(ctx),
    }
}

/// Print a verdict to the appropriate stream and return its exit code.
fn emit(verdict: &Verdict) -> i32 {
    match verdict {
        Verdict::Allow => {}
        Verdict::AllowWith(output) => {
            if let Ok(json) = serde_json::to_string(output) {
                println!("{json}");
            }
        }
        Verdict::Warn(message) | Verdict::Block(message) => eprintln!("{message}"),
    }
    verdict.exit_code()
}

/// Read all of stdin on a helper thread, giving up at the deadline.
///
/// The host normally writes the event and closes the pipe immediately; the
/// deadline only matters when the hook is invoked by hand or the host
/// misbehaves.
fn read_stdin_with_deadline(deadline: Duration) -> Option<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = String::new();
        if io::stdin().read_to_string(&mut buf).is_ok() {
            let _ = tx.send(buf);
        }
    });
    match rx.recv_timeout(deadline) {
        Ok(buf) if !buf.trim().is_empty() => Some(buf),
        _ => None,
    }
}
