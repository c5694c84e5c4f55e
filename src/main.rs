//! Autopilot - TDD guardrails and autonomous-build hooks for Claude Code
//!
//! CLI entry point with global panic handler.

use std::io::Write;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};

use autopilot::cli::install::{InstallCommand, InstallOptions};
use autopilot::cli::prompt::TerminalPrompter;
use autopilot::cli::status::{StatusCommand, StatusOptions};
use autopilot::cli::uninstall::{UninstallCommand, UninstallOptions};
use autopilot::config::{claude_dir, crash_log_path};
use autopilot::error::exit_codes;
use autopilot::manifest::GuardKind;

/// Autopilot - TDD guardrails and autonomous-build hooks for Claude Code
#[derive(Parser)]
#[command(name = "autopilot")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// [Internal] Run a hook guard (JSON stdin). Called by Claude Code hooks
    Hook {
        /// The guard to run
        #[arg(value_enum)]
        guard: HookGuard,
    },

    /// Install the autopilot commands, rules, and hook registrations
    Init {
        /// Install everything without prompting
        #[arg(long, short)]
        yes: bool,
        /// Install only the core hooks
        #[arg(long)]
        core: bool,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// Reinstall the current files and registrations (same as `init --yes`)
    Update {
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// Remove everything autopilot installed
    Uninstall {
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// Report what is currently installed
    Status {
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum HookGuard {
    AutopilotApprover,
    TddEnforcer,
    BuildGuard,
    StopGuard,
    LintCheck,
    ContextMonitor,
}

impl From<HookGuard> for GuardKind {
    fn from(guard: HookGuard) -> Self {
        match guard {
            HookGuard::AutopilotApprover => GuardKind::Approve,
            HookGuard::TddEnforcer => GuardKind::Tdd,
            HookGuard::BuildGuard => GuardKind::BuildGuard,
            HookGuard::StopGuard => GuardKind::StopGuard,
            HookGuard::LintCheck => GuardKind::Lint,
            HookGuard::ContextMonitor => GuardKind::ContextMonitor,
        }
    }
}

fn main() -> ExitCode {
    setup_panic_handler();

    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("autopilot error: {}", e);
            ExitCode::from(exit_codes::APPROVE as u8) // Fail-open
        }
    }
}

/// Set up the global panic handler.
///
/// On panic, logs to ~/.claude/autopilot-crash.log and exits with code 3,
/// which the host treats as an allow (fail-open philosophy).
fn setup_panic_handler() {
    std::panic::set_hook(Box::new(|info| {
        eprintln!("autopilot panic: {}", info);

        if let Some(crash_log) = crash_log_path() {
            if let Ok(mut file) = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&crash_log)
            {
                let timestamp = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
                let _ = writeln!(file, "[{}] {}", timestamp, info);
            }
        }

        std::process::exit(exit_codes::CRASH);
    }));
}

/// Run the CLI and return the exit code.
fn run() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Hook { guard } => {
            let code = autopilot::hooks::run_hook(guard.into());
            Ok(ExitCode::from(code as u8))
        }
        Commands::Init {
            yes,
            core,
            json,
            quiet,
        } => run_install(InstallOptions {
            yes,
            core,
            json,
            quiet,
        }),
        Commands::Update { json, quiet } => run_install(InstallOptions {
            yes: true,
            core: false,
            json,
            quiet,
        }),
        Commands::Uninstall { json, quiet } => {
            let claude = claude_dir().ok_or("could not resolve the home directory")?;
            let cmd = UninstallCommand::new(claude);
            let options = UninstallOptions { json, quiet };
            let output = cmd.run(&options);
            print!("{}", cmd.format_output(&output, &options));
            Ok(exit_for(output.success))
        }
        Commands::Status { json } => {
            let claude = claude_dir().ok_or("could not resolve the home directory")?;
            let cmd = StatusCommand::new(claude);
            let output = cmd.run();
            print!("{}", cmd.format_output(&output, &StatusOptions { json }));
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn run_install(options: InstallOptions) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let claude = claude_dir().ok_or("could not resolve the home directory")?;
    let exe = std::env::current_exe()?;
    let cmd = InstallCommand::new(claude, exe);
    let output = cmd.run(&options, &TerminalPrompter);
    print!("{}", cmd.format_output(&output, &options));
    Ok(exit_for(output.success))
}

fn exit_for(success: bool) -> ExitCode {
    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(exit_codes::ERROR as u8)
    }
}
