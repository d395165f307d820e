//! Reporters: observers wrapped around the run, each checker, and each check.
//!
//! A run flows like this, with each reporter's hooks nested around it:
//!
//! ```text
//! around_run
//!   for each checker:
//!     around_checker
//!       for each query, for each record, for each check:
//!         around_check -> check(record)
//! ```
//!
//! Every hook receives a [`Next`] and must call it exactly once. Results that
//! have no check invocation to wrap (a checker that cannot run, a blanket
//! failure) are delivered through [`Reporter::halt`].

mod cron;
mod default;
mod format;
mod json;
mod silent;

use std::any::type_name;
use std::rc::Rc;
use std::str::FromStr;

use crate::checker::{short_type_name, Checker};
use crate::error::{RecheckError, Result};
use crate::record::Record;
use crate::result::{CheckError, CheckResult};
use crate::stats::CountStats;

pub use cron::CronReporter;
pub use default::DefaultReporter;
pub use json::{JsonCheckReport, JsonException, JsonReporter, JsonResults};
pub use silent::SilentReporter;

/// Continuation handed to a reporter hook.
pub struct Next<'a, T> {
    proceed: &'a mut dyn FnMut() -> Result<T>,
}

impl<'a, T> Next<'a, T> {
    pub(crate) fn new(proceed: &'a mut dyn FnMut() -> Result<T>) -> Self {
        Self { proceed }
    }

    /// Run the wrapped work and return its value.
    ///
    /// Must be called exactly once per hook invocation. Errors must be
    /// propagated, not swallowed.
    pub fn call(&mut self) -> Result<T> {
        (self.proceed)()
    }
}

/// What a reporter sees around one checker.
///
/// `queries` and `checks` are `None` when the checker does not declare them.
#[derive(Clone, Copy)]
pub struct CheckerContext<'a> {
    pub checker: &'a dyn Checker,
    pub queries: Option<&'a [String]>,
    pub checks: Option<&'a [String]>,
}

/// What a reporter sees around one check invocation.
///
/// `check` and `record` are `None` when a query operation itself failed.
#[derive(Clone, Copy)]
pub struct CheckContext<'a> {
    pub checker: &'a dyn Checker,
    pub query: Option<&'a str>,
    pub check: Option<&'a str>,
    pub record: Option<&'a Record>,
}

/// An observer composed into the run.
///
/// Hooks take `&self`; reporters keep their state behind interior
/// mutability because hooks nest (a reporter's `around_checker` runs while
/// its own `around_run` is still on the stack).
pub trait Reporter {
    fn name(&self) -> String {
        short_type_name(type_name::<Self>()).to_string()
    }

    fn around_run(
        &self,
        _checkers: &[Rc<dyn Checker>],
        next: &mut Next<'_, CountStats>,
    ) -> Result<()> {
        next.call().map(drop)
    }

    fn around_checker(
        &self,
        _ctx: &CheckerContext<'_>,
        next: &mut Next<'_, CountStats>,
    ) -> Result<()> {
        next.call().map(drop)
    }

    fn around_check(
        &self,
        _ctx: &CheckContext<'_>,
        next: &mut Next<'_, CheckResult>,
    ) -> Result<()> {
        next.call().map(drop)
    }

    /// Running the checker was halted, so no check result is available.
    fn halt(&self, _checker: &dyn Checker, _error: &CheckError) -> Result<()> {
        Ok(())
    }
}

/// A built-in reporter's name and help text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReporterInfo {
    pub name: &'static str,
    pub help: &'static str,
}

static REPORTERS: &[ReporterInfo] = &[
    ReporterInfo {
        name: "default",
        help: "Used when no --reporter is named. Prints incremental progress to stdout. No options.",
    },
    ReporterInfo {
        name: "cron",
        help: "Prints failures/exceptions but nothing on success. For use in cron jobs, which use silence to indicate success.",
    },
    ReporterInfo {
        name: "json",
        help: "Outputs JSON-formatted results to a file or stdout. Arg is filename or blank for stdout.",
    },
    ReporterInfo {
        name: "silent",
        help: "Prints nothing. Useful for checks that can automatically fix issues.",
    },
];

/// All built-in reporters.
pub fn available_reporters() -> &'static [ReporterInfo] {
    REPORTERS
}

/// A reporter selection such as `json` or `json:results.json`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReporterSpec {
    pub name: String,
    pub arg: Option<String>,
}

impl FromStr for ReporterSpec {
    type Err = RecheckError;

    fn from_str(s: &str) -> Result<Self> {
        let (name, arg) = match s.split_once(':') {
            Some((name, arg)) => (name, Some(arg.to_string())),
            None => (s, None),
        };
        let name = name.trim().to_lowercase();
        if name.is_empty() {
            return Err(RecheckError::UnknownReporter(s.to_string()));
        }
        Ok(Self {
            name,
            arg: arg.filter(|a| !a.is_empty()),
        })
    }
}

impl std::fmt::Display for ReporterSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.arg {
            Some(arg) => write!(f, "{}:{}", self.name, arg),
            None => write!(f, "{}", self.name),
        }
    }
}

impl ReporterSpec {
    /// Instantiate the named built-in reporter.
    pub fn build(&self) -> Result<Rc<dyn Reporter>> {
        let reporter: Rc<dyn Reporter> = match self.name.as_str() {
            "default" => {
                self.reject_arg()?;
                Rc::new(DefaultReporter::new())
            }
            "cron" => {
                self.reject_arg()?;
                Rc::new(CronReporter::new())
            }
            "json" => match &self.arg {
                Some(path) => Rc::new(JsonReporter::to_file(path)),
                None => Rc::new(JsonReporter::new()),
            },
            "silent" => {
                self.reject_arg()?;
                Rc::new(SilentReporter)
            }
            _ => return Err(RecheckError::UnknownReporter(self.name.clone())),
        };
        Ok(reporter)
    }

    fn reject_arg(&self) -> Result<()> {
        match &self.arg {
            Some(_) => Err(RecheckError::ReporterArgument {
                reporter: self.name.clone(),
                message: "does not take options".to_string(),
            }),
            None => Ok(()),
        }
    }
}

/// Parse and instantiate reporter specs, in order.
pub fn build_reporters<S: AsRef<str>>(specs: &[S]) -> Result<Vec<Rc<dyn Reporter>>> {
    specs
        .iter()
        .map(|spec| spec.as_ref().parse::<ReporterSpec>()?.build())
        .collect()
}
