//! Project-state discovery: the `.autopilot/` marker directory, the active
//! mode, the task ledger, and test-file correspondence for the TDD guard.

pub mod autopilot;
pub mod testfiles;

pub use autopilot::{
    candidate_dirs, find_autopilot_dir, load_progress, resolve_mode,
    resolve_mode_from_candidates, Mode, ModeResolution, ProgressRecord, Task, TaskId,
};
