//! Hook guards and the runner that dispatches to them.
//!
//! Each guard is a pure decision function from an event context (plus
//! config, plus a command runner where external tools are involved) to a
//! [`Verdict`]. Exit codes and stdout/stderr happen only in the runner.

pub mod approve;
pub mod build_guard;
pub mod context;
pub mod input;
pub mod lint;
pub mod output;
pub mod runner;
pub mod stop_guard;
pub mod tdd;

pub use input::EventContext;
pub use output::{HookOutput, Verdict};
pub use runner::run_hook;
