//! Unified error types for autopilot with fail-open philosophy.
//!
//! Guards must never wedge the host's workflow: infrastructure errors
//! (missing files, unparsable JSON, unavailable tools) degrade to the most
//! permissive applicable decision. Only a genuine policy violation produces
//! the blocking exit code.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for autopilot operations.
#[derive(Error, Debug)]
pub enum AutopilotError {
    /// I/O errors from reading or writing files.
    #[error("storage error at {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// JSON/TOML parsing or serialization errors.
    #[error("serialization error: {message}")]
    Serde { message: String },

    /// Configuration loading errors.
    #[error("config error: {message}")]
    Config { message: String },

    /// settings.json manipulation errors.
    #[error("settings error: {message}")]
    Settings { message: String },

    /// External process failures (git, linters, type checkers).
    #[error("external command failed: {message}")]
    Exec { message: String },

    /// External process exceeded its deadline.
    #[error("external command timed out after {timeout_secs}s: {command}")]
    ExecTimeout { command: String, timeout_secs: u64 },
}

/// A specialized Result type for autopilot operations.
pub type Result<T> = std::result::Result<T, AutopilotError>;

impl AutopilotError {
    /// Create a storage error from an I/O error.
    pub fn storage(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    /// Create a serialization error.
    pub fn serde(message: impl Into<String>) -> Self {
        Self::Serde {
            message: message.into(),
        }
    }

    /// Create a config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a settings error.
    pub fn settings(message: impl Into<String>) -> Self {
        Self::Settings {
            message: message.into(),
        }
    }

    /// Create an external command error.
    pub fn exec(message: impl Into<String>) -> Self {
        Self::Exec {
            message: message.into(),
        }
    }
}

impl From<io::Error> for AutopilotError {
    fn from(err: io::Error) -> Self {
        Self::Storage {
            path: PathBuf::new(),
            source: err,
        }
    }
}

impl From<serde_json::Error> for AutopilotError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde {
            message: err.to_string(),
        }
    }
}

/// Trait for fail-open error handling.
///
/// Log the error and return a safe default instead of propagating a failure
/// that would block the host.
pub trait FailOpen<T> {
    /// Handle an error by logging a warning and returning the default value.
    fn fail_open_default(self, context: &str) -> T
    where
        T: Default;

    /// Handle an error by logging a warning and returning the provided fallback.
    fn fail_open_with(self, context: &str, fallback: T) -> T;
}

impl<T> FailOpen<T> for Result<T> {
    fn fail_open_default(self, context: &str) -> T
    where
        T: Default,
    {
        match self {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!("{}: {} (fail-open: using default)", context, err);
                T::default()
            }
        }
    }

    fn fail_open_with(self, context: &str, fallback: T) -> T {
        match self {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!("{}: {} (fail-open: using fallback)", context, err);
                fallback
            }
        }
    }
}

/// Exit codes for the autopilot CLI.
///
/// Hook handlers communicate decisions to Claude Code through these codes.
/// The host dispatches on them, so they are part of the wire contract.
pub mod exit_codes {
    /// Exit code indicating approval (allow the action / allow the stop).
    pub const APPROVE: i32 = 0;

    /// Exit code for ordinary CLI command failures (install/status).
    pub const ERROR: i32 = 1;

    /// Exit code indicating block (refuse the action / refuse the stop).
    pub const BLOCK: i32 = 2;

    /// Exit code indicating crash (fail-open, the host treats it as approve).
    pub const CRASH: i32 = 3;
}
