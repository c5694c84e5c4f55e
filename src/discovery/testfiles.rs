//! Test-file correspondence for the TDD guard.
//!
//! Given an edited implementation file, find the test file a project
//! following common Python or TypeScript/JavaScript conventions would pair
//! with it. Classification is purely lexical; only candidate lookup
//! touches the filesystem.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::config::forward_slash;
use crate::util::read_prefix;

/// Extensions the TDD guard considers implementation code.
const IMPLEMENTATION_EXTS: [&str; 5] = ["py", "ts", "tsx", "js", "jsx"];

fn compile_all(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(p).expect("valid regex"))
        .collect()
}

/// Files that never require a paired test: configuration, generated
/// declarations, migrations, markup, and assets.
static EXEMPT_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile_all(&[
        r"\.d\.ts$",
        r"(^|/)conftest\.py$",
        r"(^|/)setup\.(py|cfg)$",
        r"(^|/)pyproject\.toml$",
        r"(^|/)__init__\.py$",
        r"\.config\.(js|ts|mjs|cjs)$",
        r"(^|/)tsconfig[^/]*\.json$",
        r"\.(md|json|yaml|yml|toml|css|scss|svg|png|ico)$",
        r"(^|/)\.env(\.[A-Za-z0-9_.-]+)?$",
        r"(^|/)migrations/",
    ])
});

static TEST_FILE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile_all(&[
        r"(^|/)test_[^/]+\.py$",
        r"[^/]_test\.py$",
        r"\.test\.[^/]+$",
        r"\.spec\.[^/]+$",
        r"(^|/)__tests__/",
    ])
});

/// Whether the path has an implementation extension.
pub fn is_implementation_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| IMPLEMENTATION_EXTS.contains(&ext))
}

/// Whether the path is exempt from test-first enforcement.
pub fn is_exempt(path: &Path) -> bool {
    let normalized = forward_slash(path);
    EXEMPT_PATTERNS.iter().any(|re| re.is_match(&normalized))
}

/// Whether the path is itself a test file.
pub fn is_test_file(path: &Path) -> bool {
    let normalized = forward_slash(path);
    TEST_FILE_PATTERNS.iter().any(|re| re.is_match(&normalized))
}

/// Find the test file paired with an implementation file, or `None` when
/// no conventional candidate exists on disk.
///
/// Python: `test_<name>.py` / `<name>_test.py` beside the module, then the
/// nearest `tests/` directory up the tree (including one level of its
/// subdirectories). TypeScript/JavaScript: `.test.` / `.spec.` siblings
/// and `__tests__/` directories, walking upward; the nearest `tests/`
/// directory ends the walk either way.
pub fn find_candidate_test_file(path: &Path, max_depth: usize) -> Option<PathBuf> {
    let stem = path.file_stem()?.to_str()?;
    let ext = path.extension()?.to_str()?;
    let dir = path.parent()?;

    match ext {
        "py" => find_python_test(dir, stem, max_depth),
        _ => find_script_test(dir, stem, ext, max_depth),
    }
}

fn first_existing(candidates: impl IntoIterator<Item = PathBuf>) -> Option<PathBuf> {
    candidates.into_iter().find(|c| c.is_file())
}

fn python_names(stem: &str) -> [String; 2] {
    [format!("test_{stem}.py"), format!("{stem}_test.py")]
}

fn find_python_test(dir: &Path, stem: &str, max_depth: usize) -> Option<PathBuf> {
    let names = python_names(stem);

    if let Some(found) = first_existing(names.iter().map(|n| dir.join(n))) {
        return Some(found);
    }

    let mut current = dir.to_path_buf();
    for _ in 0..max_depth {
        let tests_dir = current.join("tests");
        if tests_dir.is_dir() {
            if let Some(found) = first_existing(names.iter().map(|n| tests_dir.join(n))) {
                return Some(found);
            }
            // One level of grouping subdirectories (tests/unit/, tests/api/).
            if let Ok(entries) = fs::read_dir(&tests_dir) {
                for entry in entries.flatten() {
                    let sub = entry.path();
                    if sub.is_dir() {
                        if let Some(found) = first_existing(names.iter().map(|n| sub.join(n))) {
                            return Some(found);
                        }
                    }
                }
            }
            return None;
        }
        match current.parent() {
            Some(parent) if parent != current => current = parent.to_path_buf(),
            _ => break,
        }
    }
    None
}

fn script_names(stem: &str, ext: &str) -> [String; 2] {
    [format!("{stem}.test.{ext}"), format!("{stem}.spec.{ext}")]
}

fn find_script_test(dir: &Path, stem: &str, ext: &str, max_depth: usize) -> Option<PathBuf> {
    let names = script_names(stem, ext);

    let same_dir = names
        .iter()
        .map(|n| dir.join(n))
        .chain(names.iter().map(|n| dir.join("__tests__").join(n)));
    if let Some(found) = first_existing(same_dir) {
        return Some(found);
    }

    let mut current = dir.to_path_buf();
    for _ in 0..max_depth {
        match current.parent() {
            Some(parent) if parent != current => current = parent.to_path_buf(),
            _ => break,
        }

        if let Some(found) = first_existing(names.iter().map(|n| current.join("__tests__").join(n)))
        {
            return Some(found);
        }

        let tests_dir = current.join("tests");
        if tests_dir.is_dir() {
            return first_existing(names.iter().map(|n| tests_dir.join(n)));
        }
    }
    None
}

/// Whether a test file appears to import the implementation it is named
/// after, judged by a bounded scan of its leading lines. An unreadable
/// test file counts as referencing (fail-open).
pub fn references_implementation(test_path: &Path, stem: &str) -> bool {
    let Ok(prefix) = read_prefix(test_path, 8192) else {
        return true;
    };
    let Ok(re) = Regex::new(&format!(
        r"\b(import|from|require)\b.*\b{}\b",
        regex::escape(stem)
    )) else {
        return true;
    };
    prefix.lines().take(30).any(|line| re.is_match(line))
}
