//! Guard decisions and their wire encodings.
//!
//! The host reads two channels: the exit code (0 allow, 2 block) and, for
//! some events, a JSON document on stdout. [`Verdict`] keeps that whole
//! contract in one place so guard logic never touches exit codes.

use serde::Serialize;

use crate::error::exit_codes;

/// The decision a guard hands back to the runner.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// Allow silently.
    Allow,
    /// Allow and emit a JSON document on stdout.
    AllowWith(HookOutput),
    /// Allow, but print a warning to stderr for the transcript.
    Warn(String),
    /// Block: print the reason to stderr and exit with the block code.
    Block(String),
}

impl Verdict {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Allow | Self::AllowWith(_) | Self::Warn(_) => exit_codes::APPROVE,
            Self::Block(_) => exit_codes::BLOCK,
        }
    }

    pub fn is_block(&self) -> bool {
        matches!(self, Self::Block(_))
    }
}

/// A stdout JSON payload accompanying an allow.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum HookOutput {
    Permission {
        #[serde(rename = "hookSpecificOutput")]
        hook_specific_output: PermissionOutput,
    },
    Context {
        #[serde(rename = "additionalContext")]
        additional_context: String,
    },
}

/// The PreToolUse permission-decision envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PermissionOutput {
    #[serde(rename = "hookEventName")]
    pub hook_event_name: String,
    #[serde(rename = "permissionDecision")]
    pub permission_decision: String,
    #[serde(rename = "permissionDecisionReason")]
    pub permission_decision_reason: String,
}

impl HookOutput {
    /// An explicit PreToolUse "allow" with a human-readable reason.
    pub fn allow_pre_tool_use(reason: impl Into<String>) -> Self {
        Self::Permission {
            hook_specific_output: PermissionOutput {
                hook_event_name: "PreToolUse".to_string(),
                permission_decision: "allow".to_string(),
                permission_decision_reason: reason.into(),
            },
        }
    }

    /// Extra context injected into the conversation.
    pub fn additional_context(text: impl Into<String>) -> Self {
        Self::Context {
            additional_context: text.into(),
        }
    }
}
