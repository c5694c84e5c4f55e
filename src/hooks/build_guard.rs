//! Stop guard for the build loop: while `build` mode is active and the
//! task ledger has pending entries, the session is not allowed to end.

use crate::config::Config;
use crate::discovery::{load_progress, resolve_mode, Mode, ModeResolution, ProgressRecord};
use crate::hooks::input::EventContext;
use crate::hooks::output::Verdict;

/// Tasks listed in a block message before the rest are summarized.
const MAX_LISTED_TASKS: usize = 5;

pub fn decide(ctx: &EventContext, config: &Config) -> Verdict {
    if ctx.stop_hook_active() {
        return Verdict::Allow;
    }

    let cwd = ctx.working_dir();
    let resolution = resolve_mode(&cwd, config.walk.guard_mode_max_depth);
    let ModeResolution::Active { autopilot_dir, mode } = resolution else {
        return Verdict::Allow;
    };
    if mode != Mode::Build {
        return Verdict::Allow;
    }

    let record = match load_progress(&autopilot_dir) {
        Ok(record) => record,
        Err(e) => {
            return Verdict::Warn(format!(
                "autopilot: build mode is active but progress.json could not be read ({e}); allowing stop"
            ));
        }
    };

    let pending = record.pending();
    if pending.is_empty() {
        return Verdict::Allow;
    }
    Verdict::Block(block_message(&record))
}

fn block_message(record: &ProgressRecord) -> String {
    let pending = record.pending();
    let mut message = format!(
        "Autopilot build incomplete: {}/{} tasks complete.\nPending tasks:\n",
        record.done_count(),
        record.tasks.len()
    );
    for task in pending.iter().take(MAX_LISTED_TASKS) {
        message.push_str(&format!(
            "  #{}: {} ({})\n",
            task.id, task.description, task.status
        ));
    }
    if pending.len() > MAX_LISTED_TASKS {
        message.push_str(&format!(
            "  ... and {} more\n",
            pending.len() - MAX_LISTED_TASKS
        ));
    }
    message.push_str(
        "Continue working, or to stop anyway clear .autopilot/mode \
         or mark the tasks DONE in .autopilot/progress.json.",
    );
    message
}
