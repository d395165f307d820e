//! Command-line interface for programs that embed recheck.
//!
//! Checkers are Rust types compiled into the host program, so the host
//! binary builds its checker list and hands it over:
//!
//! ```no_run
//! use std::rc::Rc;
//! use recheck::Checker;
//!
//! struct Users;
//! impl Checker for Users {}
//!
//! fn main() {
//!     let checkers: Vec<Rc<dyn Checker>> = vec![Rc::new(Users)];
//!     std::process::exit(recheck::cli::main_with(checkers));
//! }
//! ```

use std::path::{Path, PathBuf};
use std::rc::Rc;

use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::checker::Checker;
use crate::config::Config;
use crate::error::{ProcessSignal, RecheckError};
use crate::reporter::{available_reporters, build_reporters};
use crate::runner::Runner;
use crate::stats::CountStats;

/// Exit codes.
pub const EXIT_NO_ERRORS: i32 = 0;
pub const EXIT_ANY_ERRORS: i32 = 1;
pub const EXIT_LOAD_ERROR: i32 = 2;
pub const EXIT_RECHECK_ERROR: i32 = 3;

/// Environment variable holding the log filter.
pub const LOG_ENV: &str = "RECHECK_LOG";

/// Run data-quality checks against production data.
#[derive(Parser)]
#[command(name = "recheck")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run checks
    Run(RunArgs),
    /// List available reporters
    Reporters,
}

/// Arguments for the run command.
#[derive(Parser)]
pub struct RunArgs {
    /// Reporter as name or name:arg, repeatable (default: from config, else "default")
    #[arg(short, long, value_name = "SPEC")]
    pub reporter: Vec<String>,

    /// Path to config YAML file (default: auto-discover)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Log runner progress to stderr
    #[arg(short, long)]
    pub verbose: bool,
}

/// Map run totals to the process exit code.
pub fn exit_code_for(stats: &CountStats) -> i32 {
    if stats.all_pass() {
        EXIT_NO_ERRORS
    } else {
        EXIT_ANY_ERRORS
    }
}

/// Install the stderr log subscriber. Safe to call more than once.
pub fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("recheck=debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| "warn".into())
    };
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

/// Run the checkers with the reporters and config resolved from `args`,
/// discovering a config file in the current directory.
pub fn run_checks(args: &RunArgs, checkers: Vec<Rc<dyn Checker>>) -> anyhow::Result<i32> {
    let cwd = std::env::current_dir()?;
    run_checks_in(args, checkers, &cwd)
}

/// As [`run_checks`], discovering the config file in `dir`.
pub fn run_checks_in(
    args: &RunArgs,
    checkers: Vec<Rc<dyn Checker>>,
    dir: &Path,
) -> anyhow::Result<i32> {
    if checkers.is_empty() {
        eprintln!("No checks detected.");
        return Ok(EXIT_LOAD_ERROR);
    }

    let config = match Config::load(args.config.as_deref(), dir) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return Ok(EXIT_LOAD_ERROR);
        }
    };

    let specs = config.reporter_specs(&args.reporter);
    let reporters = match build_reporters(&specs) {
        Ok(reporters) => reporters,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Run 'recheck reporters' to see available reporters");
            return Ok(EXIT_LOAD_ERROR);
        }
    };

    match Runner::new(checkers, reporters).run() {
        Ok(stats) => Ok(exit_code_for(&stats)),
        Err(RecheckError::Signal(ProcessSignal::Exit(code))) => Ok(code),
        Err(RecheckError::Signal(ProcessSignal::Interrupt)) => {
            println!("\nOperation cancelled by user.");
            Ok(EXIT_RECHECK_ERROR)
        }
        Err(e) => {
            error!(error = %e, "run aborted");
            eprintln!("Error: {}", e);
            Ok(EXIT_RECHECK_ERROR)
        }
    }
}

/// Print the built-in reporters.
pub fn list_reporters() -> anyhow::Result<i32> {
    println!("Available reporters:");
    println!();
    for info in available_reporters() {
        println!("  {:<10} {}", info.name, info.help);
    }
    println!();
    println!("Usage:");
    println!("  recheck run --reporter <name>[:<arg>]");
    Ok(EXIT_NO_ERRORS)
}

/// Execute a parsed command line.
pub fn dispatch(cli: &Cli, checkers: Vec<Rc<dyn Checker>>) -> anyhow::Result<i32> {
    match &cli.command {
        Commands::Run(args) => {
            init_logging(args.verbose);
            run_checks(args, checkers)
        }
        Commands::Reporters => list_reporters(),
    }
}

/// Parse the process arguments, run, and return the exit code.
pub fn main_with(checkers: Vec<Rc<dyn Checker>>) -> i32 {
    let cli = Cli::parse();
    match dispatch(&cli, checkers) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            EXIT_RECHECK_ERROR
        }
    }
}
