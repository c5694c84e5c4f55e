//! Resolution of the `.autopilot/` state directory, the active mode, and
//! the task ledger.
//!
//! Hooks receive paths that may sit anywhere below a project root, and
//! Bash commands may operate on files outside the cwd entirely. Mode
//! resolution therefore works from a list of candidate directories, each
//! walked upward a bounded number of steps.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::config::AUTOPILOT_DIR_NAME;
use crate::error::Result;
use crate::util::read_to_string_limited;

/// The active workflow mode, as written by `/build` and `/fix`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Build,
    Fix,
    Other(String),
}

impl Mode {
    pub fn parse(s: &str) -> Self {
        match s {
            "build" => Self::Build,
            "fix" => Self::Fix,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Build => "build",
            Self::Fix => "fix",
            Self::Other(s) => s,
        }
    }

    /// Modes in which tool calls are auto-approved.
    pub fn is_autonomous(&self) -> bool {
        matches!(self, Self::Build | Self::Fix)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of looking for an autopilot mode near a directory.
///
/// The three cases carry different diagnostics: no `.autopilot/` directory
/// at all, a directory with no usable mode file, and an active mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModeResolution {
    NoAutopilotDir,
    Unset { autopilot_dir: PathBuf },
    Active { autopilot_dir: PathBuf, mode: Mode },
}

impl ModeResolution {
    pub fn mode(&self) -> Option<&Mode> {
        match self {
            Self::Active { mode, .. } => Some(mode),
            _ => None,
        }
    }

    pub fn autopilot_dir(&self) -> Option<&Path> {
        match self {
            Self::Active { autopilot_dir, .. } | Self::Unset { autopilot_dir } => {
                Some(autopilot_dir)
            }
            Self::NoAutopilotDir => None,
        }
    }
}

/// Walk from `start` upward looking for a `.autopilot` directory.
///
/// Bounded by `max_depth` steps, and terminates when the parent equals the
/// current directory, so filesystem roots and degenerate paths cannot
/// loop.
pub fn find_autopilot_dir(start: &Path, max_depth: usize) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    for _ in 0..max_depth {
        let candidate = current.join(AUTOPILOT_DIR_NAME);
        if candidate.is_dir() {
            return Some(candidate);
        }
        match current.parent() {
            Some(parent) if parent != current => current = parent.to_path_buf(),
            _ => break,
        }
    }
    None
}

/// Resolve the mode for a single starting directory.
///
/// The mode is the trimmed first line of `.autopilot/mode`. A missing or
/// empty file is `Unset`, never an error.
pub fn resolve_mode(start: &Path, max_depth: usize) -> ModeResolution {
    let Some(autopilot_dir) = find_autopilot_dir(start, max_depth) else {
        return ModeResolution::NoAutopilotDir;
    };
    let mode_file = autopilot_dir.join("mode");
    let Ok(content) = read_to_string_limited(&mode_file) else {
        return ModeResolution::Unset { autopilot_dir };
    };
    let first_line = content.lines().next().unwrap_or("").trim();
    if first_line.is_empty() {
        ModeResolution::Unset { autopilot_dir }
    } else {
        ModeResolution::Active {
            autopilot_dir,
            mode: Mode::parse(first_line),
        }
    }
}

/// Resolve the mode from an ordered candidate list. The first candidate
/// with an active mode wins; failing that, the first that at least found
/// an `.autopilot` directory is reported, so diagnostics can distinguish
/// "no project" from "mode not set".
pub fn resolve_mode_from_candidates(
    candidates: &[PathBuf],
    max_depth: usize,
) -> ModeResolution {
    let mut best = ModeResolution::NoAutopilotDir;
    for candidate in candidates {
        match resolve_mode(candidate, max_depth) {
            active @ ModeResolution::Active { .. } => return active,
            unset @ ModeResolution::Unset { .. } => {
                if best == ModeResolution::NoAutopilotDir {
                    best = unset;
                }
            }
            ModeResolution::NoAutopilotDir => {}
        }
    }
    best
}

static WINDOWS_PATH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[A-Za-z]:[/\\][^\s"']+"#).expect("valid regex"));
static UNIX_PATH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?:^|[\s"'=])(/[^\s"']+)"#).expect("valid regex"));

/// Build the ordered candidate directories for mode resolution from a
/// tool invocation.
///
/// Order matters: the edited file's directory is the strongest signal,
/// then absolute paths mentioned in a Bash command (each with its parent,
/// since the path may name a file), then the session cwd.
pub fn candidate_dirs(tool_input: &serde_json::Value, cwd: Option<&Path>) -> Vec<PathBuf> {
    let mut candidates: Vec<PathBuf> = Vec::new();
    let mut push = |path: PathBuf| {
        if !candidates.contains(&path) {
            candidates.push(path);
        }
    };

    if let Some(file_path) = tool_input.get("file_path").and_then(|v| v.as_str()) {
        if let Some(parent) = Path::new(file_path).parent() {
            if !parent.as_os_str().is_empty() {
                push(parent.to_path_buf());
            }
        }
    }

    if let Some(command) = tool_input.get("command").and_then(|v| v.as_str()) {
        for m in WINDOWS_PATH_RE.find_iter(command) {
            push(PathBuf::from(m.as_str()));
            // Path::parent does not understand backslashes on Unix hosts,
            // so split Windows matches manually.
            if let Some(parent) = windows_parent(m.as_str()) {
                push(PathBuf::from(parent));
            }
        }
        for caps in UNIX_PATH_RE.captures_iter(command) {
            if let Some(m) = caps.get(1) {
                let path = PathBuf::from(m.as_str());
                push(path.clone());
                if let Some(parent) = path.parent() {
                    push(parent.to_path_buf());
                }
            }
        }
    }

    if let Some(cwd) = cwd {
        push(cwd.to_path_buf());
    }

    candidates
}

fn windows_parent(path: &str) -> Option<&str> {
    let idx = path.rfind(['/', '\\'])?;
    // Keep at least "C:\" worth of prefix.
    (idx > 2).then(|| &path[..idx])
}

/// A task id as found in `progress.json`. Plans emit numbers; hand-edited
/// ledgers sometimes use strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TaskId {
    Number(i64),
    Text(String),
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

/// One task in the ledger.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Task {
    pub id: TaskId,
    pub description: String,
    pub status: String,
}

impl Task {
    /// Whether this task still needs work.
    pub fn is_pending(&self) -> bool {
        matches!(self.status.as_str(), "PENDING" | "IN_PROGRESS")
    }

    /// Whether this task is finished. Statuses are an open set; anything
    /// unrecognized counts as neither pending nor done.
    pub fn is_done(&self) -> bool {
        self.status == "DONE"
    }
}

/// The `progress.json` task ledger.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressRecord {
    pub tasks: Vec<Task>,
}

impl ProgressRecord {
    pub fn pending(&self) -> Vec<&Task> {
        self.tasks.iter().filter(|t| t.is_pending()).collect()
    }

    pub fn done_count(&self) -> usize {
        self.tasks.iter().filter(|t| t.is_done()).count()
    }
}

/// Load `progress.json` from an `.autopilot` directory.
pub fn load_progress(autopilot_dir: &Path) -> Result<ProgressRecord> {
    let content = read_to_string_limited(&autopilot_dir.join("progress.json"))?;
    Ok(serde_json::from_str(&content)?)
}
