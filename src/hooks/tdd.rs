//! Test-first nudges after Write/Edit.
//!
//! While `build` or `fix` mode is active the loop itself owns test
//! discipline, so the guard stays silent. Outside the loop, an
//! implementation file without a paired test gets a warning, as does a
//! test that never imports the implementation. The mode is read again at
//! the warn-vs-block branch rather than trusted from the early skip; a
//! marker flipping to `build` mid-event escalates the missing test to a
//! block.

use std::path::Path;

use crate::config::Config;
use crate::discovery::testfiles::{
    find_candidate_test_file, is_exempt, is_implementation_file, is_test_file,
    references_implementation,
};
use crate::discovery::{candidate_dirs, resolve_mode_from_candidates, Mode, ModeResolution};
use crate::hooks::input::EventContext;
use crate::hooks::output::Verdict;

pub fn decide(ctx: &EventContext, config: &Config) -> Verdict {
    let Some(file_path) = ctx.file_path() else {
        return Verdict::Allow;
    };
    if is_out_of_scope(file_path) {
        return Verdict::Allow;
    }

    let cwd = ctx.working_dir();
    let candidates = candidate_dirs(&ctx.tool_input, Some(&cwd));
    let resolution = resolve_mode_from_candidates(&candidates, config.walk.guard_mode_max_depth);
    // The build loop handles testing itself; skip the hook noise.
    if resolution.mode().is_some_and(Mode::is_autonomous) {
        return Verdict::Allow;
    }

    match find_candidate_test_file(file_path, config.walk.tests_max_depth) {
        Some(test_file) => {
            let stem = file_path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            if references_implementation(&test_file, &stem) {
                Verdict::Allow
            } else {
                Verdict::Warn(format!(
                    "TDD hint: {} exists but may not import \"{stem}\".",
                    test_file.display()
                ))
            }
        }
        None => {
            // Resolve again rather than trusting the early answer.
            let resolution =
                resolve_mode_from_candidates(&candidates, config.walk.guard_mode_max_depth);
            match resolution {
                ModeResolution::Active { mode: Mode::Build, .. } => Verdict::Block(format!(
                    "TDD enforcer: no test found for {}.\n\
                     In build mode every implementation file needs a corresponding test.\n\
                     Write the failing test first, then implement.",
                    file_path.display()
                )),
                _ => Verdict::Warn(format!(
                    "TDD hint: no test found for {}. Consider adding tests.",
                    file_path.display()
                )),
            }
        }
    }
}

fn is_out_of_scope(path: &Path) -> bool {
    let normalized = crate::config::forward_slash(path);
    normalized.contains("/hooks/")
        || !is_implementation_file(path)
        || is_exempt(path)
        || is_test_file(path)
}
