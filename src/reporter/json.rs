//! Machine-readable results, keyed by checker and check.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::checker::Checker;
use crate::error::Result;
use crate::result::{CheckError, CheckResult, ErrorKind};
use crate::stats::CountStats;

use super::{CheckContext, CheckerContext, Next, Reporter};

/// Key for results with no check to attribute them to.
const META: &str = "meta";

/// Results for one check (or query, or `meta`) of a checker.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JsonCheckReport {
    pub counts: CountStats,
    /// Ids of records the check failed.
    pub fail: Vec<String>,
    pub exception: Vec<JsonException>,
    /// Set when the checker was halted instead of run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub halt: Option<ErrorKind>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonException {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub causes: Vec<String>,
}

/// Checker name to check name to results.
pub type JsonResults = BTreeMap<String, BTreeMap<String, JsonCheckReport>>;

enum Destination {
    /// Rewritten after every checker so a partial run leaves usable output.
    File(PathBuf),
    /// Written once, when the run completes.
    Stream(RefCell<Box<dyn Write>>),
}

pub struct JsonReporter {
    destination: Destination,
    results: RefCell<JsonResults>,
}

impl JsonReporter {
    /// Print results to stdout at the end of the run.
    pub fn new() -> Self {
        Self::with_writer(std::io::stdout())
    }

    pub fn to_file(path: impl Into<PathBuf>) -> Self {
        Self {
            destination: Destination::File(path.into()),
            results: RefCell::new(BTreeMap::new()),
        }
    }

    pub fn with_writer(out: impl Write + 'static) -> Self {
        Self {
            destination: Destination::Stream(RefCell::new(Box::new(out))),
            results: RefCell::new(BTreeMap::new()),
        }
    }

    /// Results gathered so far.
    pub fn results(&self) -> JsonResults {
        self.results.borrow().clone()
    }

    fn write_file(&self) -> Result<()> {
        if let Destination::File(path) = &self.destination {
            let json = serde_json::to_string_pretty(&*self.results.borrow())?;
            std::fs::write(path, json)?;
            debug!(path = %path.display(), "wrote json results");
        }
        Ok(())
    }

    fn write_stream(&self) -> Result<()> {
        if let Destination::Stream(out) = &self.destination {
            let json = serde_json::to_string_pretty(&*self.results.borrow())?;
            let mut out = out.borrow_mut();
            writeln!(out, "{}", json)?;
            out.flush()?;
        }
        Ok(())
    }
}

impl Default for JsonReporter {
    fn default() -> Self {
        Self::new()
    }
}

fn exception_entry(error: &CheckError) -> JsonException {
    let (message, causes) = match error.exception() {
        Some(exception) => (exception.message.clone(), exception.causes.clone()),
        None => (String::new(), Vec::new()),
    };
    JsonException {
        id: error.record_id().map(str::to_string),
        message,
        causes,
    }
}

impl Reporter for JsonReporter {
    fn around_run(
        &self,
        _checkers: &[Rc<dyn Checker>],
        next: &mut Next<'_, CountStats>,
    ) -> Result<()> {
        next.call()?;
        self.write_file()?;
        self.write_stream()
    }

    fn around_checker(
        &self,
        ctx: &CheckerContext<'_>,
        next: &mut Next<'_, CountStats>,
    ) -> Result<()> {
        {
            // Checkers sharing a name share an entry.
            let mut results = self.results.borrow_mut();
            let checks = results.entry(ctx.checker.name()).or_default();
            for check in ctx.checks.unwrap_or_default() {
                checks.entry(check.clone()).or_default();
            }
        }

        next.call()?;
        self.write_file()
    }

    fn around_check(&self, ctx: &CheckContext<'_>, next: &mut Next<'_, CheckResult>) -> Result<()> {
        let result = next.call()?;

        let key = ctx.check.or(ctx.query).unwrap_or(META).to_string();
        let mut results = self.results.borrow_mut();
        let report = results
            .entry(ctx.checker.name())
            .or_default()
            .entry(key)
            .or_default();
        report.counts.increment(result.kind());
        if let CheckResult::Error(error) = &result {
            match error.kind() {
                ErrorKind::Fail => report
                    .fail
                    .push(error.record_id().unwrap_or_default().to_string()),
                ErrorKind::Exception => report.exception.push(exception_entry(error)),
                _ => {}
            }
        }
        Ok(())
    }

    fn halt(&self, checker: &dyn Checker, error: &CheckError) -> Result<()> {
        let key = error.check().unwrap_or(META).to_string();
        self.results
            .borrow_mut()
            .entry(checker.name())
            .or_default()
            .entry(key)
            .or_default()
            .halt = Some(error.kind());
        Ok(())
    }
}
