//! Recheck - pluggable data-quality checks for production data.
//!
//! A [`Checker`] declares query operations that fetch candidate records and
//! check operations that validate each record. The [`Runner`] runs every check
//! against every record and feeds each result through a chain of
//! [`Reporter`]s, which wrap the run, each checker, and each check.
//!
//! # Architecture
//!
//! - `checker`: the capability contract checkers implement
//! - `record`: type-erased records passed from queries to checks
//! - `result`: pass/error results and the closed set of error kinds
//! - `stats`: result counting and the blanket failure threshold
//! - `runner`: orchestration, reporter chaining, and yield bookkeeping
//! - `reporter`: the reporter hooks and the built-in reporters
//! - `config`: optional YAML configuration
//! - `cli`: command-line entry point for host binaries

pub mod checker;
pub mod cli;
pub mod config;
pub mod error;
pub mod record;
pub mod reporter;
pub mod result;
pub mod runner;
pub mod stats;

pub use checker::{Check, Checker, Query, RecordStream};
pub use config::Config;
pub use error::{ProcessSignal, RecheckError, Result};
pub use record::{Identify, Record};
pub use reporter::{
    build_reporters, CheckContext, CheckerContext, CronReporter, DefaultReporter,
    JsonCheckReport, JsonException, JsonReporter, JsonResults, Next, Reporter, ReporterSpec,
    SilentReporter,
};
pub use result::{CapturedException, CheckError, CheckResult, ErrorKind, ResultKind};
pub use runner::{Hook, Runner};
pub use stats::{CountStats, BLANKET_FAILURE_THRESHOLD};
