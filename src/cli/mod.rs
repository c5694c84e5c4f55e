//! CLI commands for autopilot.
//!
//! - **init / uninstall**: manage the distributed files and hook
//!   registrations
//! - **status**: report what is installed
//! - **hook**: the registered guard entry point (see [`crate::hooks`])

pub mod install;
pub mod prompt;
pub mod status;
pub mod uninstall;

pub use install::InstallCommand;
pub use status::StatusCommand;
pub use uninstall::UninstallCommand;
