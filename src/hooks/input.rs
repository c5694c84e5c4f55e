//! The event document hooks receive on stdin.
//!
//! The host sends different field sets per event; everything here is
//! optional and unknown fields are ignored, so a schema addition on the
//! host side never breaks a guard.

use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

/// Deserialized hook event context.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EventContext {
    pub tool_name: Option<String>,
    pub tool_input: serde_json::Value,
    pub cwd: Option<PathBuf>,
    pub transcript_path: Option<PathBuf>,
    pub stop_hook_active: Option<bool>,
}

impl EventContext {
    /// Parse an event document, tolerating any missing fields.
    pub fn parse(raw: &str) -> Option<Self> {
        serde_json::from_str(raw).ok()
    }

    /// The `file_path` argument of the tool invocation, if any. Some
    /// tools name the same argument `path`.
    pub fn file_path(&self) -> Option<&Path> {
        self.tool_input
            .get("file_path")
            .or_else(|| self.tool_input.get("path"))
            .and_then(|v| v.as_str())
            .map(Path::new)
    }

    /// The working directory for this event, falling back to the process
    /// cwd when the host did not send one.
    pub fn working_dir(&self) -> PathBuf {
        self.cwd
            .clone()
            .or_else(|| env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Whether this Stop event was raised while a stop hook was already
    /// running. Guards must allow immediately to avoid blocking loops.
    pub fn stop_hook_active(&self) -> bool {
        self.stop_hook_active.unwrap_or(false)
    }
}
