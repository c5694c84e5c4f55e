//! PreToolUse auto-approval while an autopilot mode is active.
//!
//! The point of the build loop is unattended progress; permission prompts
//! defeat it. When a candidate directory resolves to `build` or `fix`
//! mode, the guard emits an explicit allow with the mode as the reason.
//! Any other outcome stays silent and defers to the normal permission
//! flow.

use crate::config::Config;
use crate::discovery::{candidate_dirs, resolve_mode_from_candidates, ModeResolution};
use crate::hooks::input::EventContext;
use crate::hooks::output::{HookOutput, Verdict};

pub fn decide(ctx: &EventContext, config: &Config) -> Verdict {
    let cwd = ctx.working_dir();
    let candidates = candidate_dirs(&ctx.tool_input, Some(&cwd));
    match resolve_mode_from_candidates(&candidates, config.walk.mode_max_depth) {
        ModeResolution::Active { mode, .. } if mode.is_autonomous() => Verdict::AllowWith(
            HookOutput::allow_pre_tool_use(format!("Autopilot mode \"{mode}\" active")),
        ),
        _ => Verdict::Allow,
    }
}
