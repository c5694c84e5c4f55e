//! Single source of truth for everything autopilot distributes: the
//! command/rule files written under `~/.claude/` and the hook registrations
//! merged into `settings.json`.

use std::path::Path;
use std::time::Duration;

use crate::config::forward_slash;

/// Constant marker identifying settings entries owned by autopilot.
///
/// Kept identical to the value used by the earlier script-based
/// distribution so upgrades reconcile cleanly.
pub const TAG: &str = "__claude-autopilot__";

/// Hook lifecycle events autopilot registers for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookEvent {
    /// Before a tool invocation.
    PreToolUse,
    /// After a tool invocation completes.
    PostToolUse,
    /// When the agent attempts to stop.
    Stop,
}

impl HookEvent {
    /// The event name as it appears in settings.json.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PreToolUse => "PreToolUse",
            Self::PostToolUse => "PostToolUse",
            Self::Stop => "Stop",
        }
    }
}

/// The guards compiled into this binary, one per hook registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GuardKind {
    /// Auto-approve Write/Edit/Bash while an autopilot mode is active.
    Approve,
    /// Test-first enforcement after Write/Edit.
    Tdd,
    /// Stop blocking while a build has pending tasks.
    BuildGuard,
    /// Stop blocking on uncommitted changes.
    StopGuard,
    /// Post-edit lint/format/type-check.
    Lint,
    /// Context-window usage estimate.
    ContextMonitor,
}

impl GuardKind {
    /// All guards, core first.
    pub const ALL: [GuardKind; 6] = [
        GuardKind::Approve,
        GuardKind::Tdd,
        GuardKind::BuildGuard,
        GuardKind::StopGuard,
        GuardKind::Lint,
        GuardKind::ContextMonitor,
    ];

    /// The optional guards, offered for selection at install time.
    pub const OPTIONAL: [GuardKind; 3] = [
        GuardKind::StopGuard,
        GuardKind::Lint,
        GuardKind::ContextMonitor,
    ];

    /// Stable identifier used in the hook command and as the key for
    /// conflict detection and de-duplication. Matches the script basename
    /// used by the prior npm distribution, so stale `node .../<slug>.js`
    /// entries are recognized.
    pub fn slug(&self) -> &'static str {
        match self {
            Self::Approve => "autopilot-approver",
            Self::Tdd => "tdd-enforcer",
            Self::BuildGuard => "build-guard",
            Self::StopGuard => "stop-guard",
            Self::Lint => "lint-check",
            Self::ContextMonitor => "context-monitor",
        }
    }

    /// Parse a guard from its slug.
    pub fn from_slug(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|g| g.slug() == s)
    }

    /// Whether this guard is part of the core set (always installed).
    pub fn is_core(&self) -> bool {
        matches!(self, Self::Approve | Self::Tdd | Self::BuildGuard)
    }

    /// How long the guard waits for its event document on stdin before
    /// deciding there is nothing to decide.
    pub fn stdin_deadline(&self) -> Duration {
        match self {
            Self::Lint => Duration::from_secs(3),
            _ => Duration::from_secs(2),
        }
    }
}

/// One declarative hook registration for settings.json.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HookRegistration {
    /// The lifecycle event this hook fires on.
    pub event: HookEvent,
    /// Tool-name matcher, or `None` for the unmatched/default group.
    pub matcher: Option<&'static str>,
    /// The guard the registered command dispatches to.
    pub guard: GuardKind,
    /// Hook timeout in seconds, as understood by the host runtime.
    pub timeout: u64,
    /// Whether the host should run the hook without waiting for it.
    pub run_async: bool,
}

impl HookRegistration {
    /// Build the settings.json command string for this registration.
    ///
    /// Derived deterministically from the installed binary path and the
    /// guard slug; two registrations are "the same" iff event, matcher,
    /// and command are all equal.
    pub fn command(&self, exe: &Path) -> String {
        format!("{} hook {}", forward_slash(exe), self.guard.slug())
    }
}

/// The core registrations, always installed.
pub const CORE_REGISTRATIONS: [HookRegistration; 3] = [
    HookRegistration {
        event: HookEvent::PreToolUse,
        matcher: Some("Write|Edit|Bash"),
        guard: GuardKind::Approve,
        timeout: 5,
        run_async: false,
    },
    HookRegistration {
        event: HookEvent::PostToolUse,
        matcher: Some("Write|Edit"),
        guard: GuardKind::Tdd,
        timeout: 10,
        run_async: false,
    },
    HookRegistration {
        event: HookEvent::Stop,
        matcher: None,
        guard: GuardKind::BuildGuard,
        timeout: 10,
        run_async: false,
    },
];

/// The optional registrations, subject to install-time selection.
pub const OPTIONAL_REGISTRATIONS: [HookRegistration; 3] = [
    HookRegistration {
        event: HookEvent::PostToolUse,
        matcher: Some("Write|Edit"),
        guard: GuardKind::Lint,
        timeout: 30,
        run_async: false,
    },
    HookRegistration {
        event: HookEvent::Stop,
        matcher: None,
        guard: GuardKind::StopGuard,
        timeout: 15,
        run_async: false,
    },
    HookRegistration {
        event: HookEvent::PostToolUse,
        matcher: Some("Write|Edit|Bash"),
        guard: GuardKind::ContextMonitor,
        timeout: 5,
        run_async: true,
    },
];

/// Collect the registrations for a given optional-guard selection.
pub fn registrations_for(selected_optional: &[GuardKind]) -> Vec<HookRegistration> {
    let mut regs: Vec<HookRegistration> = CORE_REGISTRATIONS.to_vec();
    regs.extend(
        OPTIONAL_REGISTRATIONS
            .iter()
            .filter(|r| selected_optional.contains(&r.guard))
            .copied(),
    );
    regs
}

/// All registrations, core and optional.
pub fn all_registrations() -> Vec<HookRegistration> {
    registrations_for(&GuardKind::OPTIONAL)
}

/// A static file distributed into `~/.claude/`.
#[derive(Debug, Clone, Copy)]
pub struct FileEntry {
    /// Destination relative to `~/.claude/`.
    pub dest: &'static str,
    /// Embedded contents, written verbatim at install time.
    pub contents: &'static str,
}

/// Slash-command files.
pub const COMMAND_FILES: [FileEntry; 4] = [
    FileEntry {
        dest: "commands/plan.md",
        contents: include_str!("../assets/commands/plan.md"),
    },
    FileEntry {
        dest: "commands/build.md",
        contents: include_str!("../assets/commands/build.md"),
    },
    FileEntry {
        dest: "commands/verify.md",
        contents: include_str!("../assets/commands/verify.md"),
    },
    FileEntry {
        dest: "commands/fix.md",
        contents: include_str!("../assets/commands/fix.md"),
    },
];

/// Rule files.
pub const RULE_FILES: [FileEntry; 4] = [
    FileEntry {
        dest: "rules/spec-workflow.md",
        contents: include_str!("../assets/rules/spec-workflow.md"),
    },
    FileEntry {
        dest: "rules/tdd-enforcement.md",
        contents: include_str!("../assets/rules/tdd-enforcement.md"),
    },
    FileEntry {
        dest: "rules/context-continuation.md",
        contents: include_str!("../assets/rules/context-continuation.md"),
    },
    FileEntry {
        dest: "rules/verification-checklist.md",
        contents: include_str!("../assets/rules/verification-checklist.md"),
    },
];

/// All distributed files as a flat list.
pub fn all_files() -> Vec<FileEntry> {
    let mut files: Vec<FileEntry> = COMMAND_FILES.to_vec();
    files.extend(RULE_FILES);
    files
}
