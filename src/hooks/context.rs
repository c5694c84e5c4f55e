//! Context-window monitor.
//!
//! A coarse estimate is enough: the transcript file is stat'd, never read,
//! and a size-derived token count above the threshold injects a warning
//! into the conversation. This guard runs async and must never block.

use std::fs;

use crate::hooks::input::EventContext;
use crate::hooks::output::{HookOutput, Verdict};

/// Estimated tokens above which the warning fires.
const TOKEN_WARN_THRESHOLD: u64 = 150_000;

/// Rough bytes-per-token ratio for transcript JSONL.
const BYTES_PER_TOKEN: u64 = 4;

pub fn decide(ctx: &EventContext) -> Verdict {
    let Some(transcript_path) = ctx.transcript_path.as_deref() else {
        return Verdict::Allow;
    };
    let Ok(metadata) = fs::metadata(transcript_path) else {
        return Verdict::Allow;
    };

    let estimated_tokens = metadata.len() / BYTES_PER_TOKEN;
    if estimated_tokens <= TOKEN_WARN_THRESHOLD {
        return Verdict::Allow;
    }
    Verdict::AllowWith(HookOutput::additional_context(format!(
        "WARNING: Context window ~{}K tokens estimated. Finish the current task, \
         update .autopilot/progress.json, and commit before starting anything new.",
        estimated_tokens / 1000
    )))
}
