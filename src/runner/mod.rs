//! Runner that drives checkers through the reporter chain.
//!
//! One run is strictly sequential: checkers in the order given, then for each
//! checker its queries, the records each query yields, and the checks run
//! against every record.

mod chain;
mod yields;

use std::any::Any;
use std::cell::RefCell;
use std::ops::ControlFlow;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use anyhow::anyhow;
use tracing::{debug, info, warn};

use crate::checker::{Check, Checker, Query};
use crate::error::{escalate, Result};
use crate::record::Record;
use crate::reporter::{CheckContext, CheckerContext, Reporter};
use crate::result::{CapturedException, CheckError, CheckResult, ErrorKind, ResultKind};
use crate::stats::{CountStats, BLANKET_FAILURE_THRESHOLD};

use chain::ReporterChain;

pub use yields::{Hook, ReporterKey, YieldTracker};

/// Runs checkers and feeds every result through the reporters.
pub struct Runner {
    checkers: Vec<Rc<dyn Checker>>,
    reporters: Vec<Rc<dyn Reporter>>,
}

impl Runner {
    /// Create a runner. Checkers and reporters passed more than once (the
    /// same `Rc`) are kept only at their first position.
    pub fn new<C, R>(checkers: C, reporters: R) -> Self
    where
        C: IntoIterator<Item = Rc<dyn Checker>>,
        R: IntoIterator<Item = Rc<dyn Reporter>>,
    {
        Self {
            checkers: unique(checkers),
            reporters: unique(reporters),
        }
    }

    pub fn checkers(&self) -> &[Rc<dyn Checker>] {
        &self.checkers
    }

    pub fn reporters(&self) -> &[Rc<dyn Reporter>] {
        &self.reporters
    }

    /// Run every checker and return the total counts.
    ///
    /// Errors raised by checks and queries become results. The run only
    /// fails for a reporter that breaks the hook contract, a reporter that
    /// fails on its own, or a [`ProcessSignal`](crate::error::ProcessSignal).
    pub fn run(&self) -> Result<CountStats> {
        debug!(
            checkers = self.checkers.len(),
            reporters = self.reporters.len(),
            "starting run"
        );
        let tracker = RefCell::new(YieldTracker::new());
        let chain = ReporterChain::new(&self.reporters, &tracker);

        let totals = chain.around(
            Hook::Run,
            |reporter, next| reporter.around_run(&self.checkers, next),
            || {
                let mut totals = CountStats::new();
                for checker in &self.checkers {
                    let session = CheckerSession {
                        checker: checker.as_ref(),
                        name: checker.name(),
                        chain: &chain,
                        reporters: &self.reporters,
                    };
                    totals.merge(&session.run()?);
                }
                Ok(totals)
            },
        )?;

        info!(summary = %totals.summary(), "run finished");
        Ok(totals)
    }
}

fn unique<T: ?Sized>(items: impl IntoIterator<Item = Rc<T>>) -> Vec<Rc<T>> {
    let mut unique: Vec<Rc<T>> = Vec::new();
    for item in items {
        if !unique.iter().any(|seen| Rc::ptr_eq(seen, &item)) {
            unique.push(item);
        }
    }
    unique
}

/// One checker's pass through the run.
struct CheckerSession<'s> {
    checker: &'s dyn Checker,
    name: String,
    chain: &'s ReporterChain<'s>,
    reporters: &'s [Rc<dyn Reporter>],
}

impl CheckerSession<'_> {
    fn run(&self) -> Result<CountStats> {
        debug!(checker = %self.name, "running checker");

        let queries = match self.checker.query_methods() {
            Some(queries) => queries,
            None => return self.cant_run(None, None, ErrorKind::NoQueryMethods),
        };
        let query_names: Vec<String> = queries.iter().map(|q| q.name().to_string()).collect();
        if queries.is_empty() {
            return self.cant_run(Some(&query_names), None, ErrorKind::NoQueries);
        }

        let checks = match self.checker.check_methods() {
            Some(checks) => checks,
            None => return self.cant_run(Some(&query_names), None, ErrorKind::NoCheckMethods),
        };
        let check_names: Vec<String> = checks.iter().map(|c| c.name().to_string()).collect();
        if checks.is_empty() {
            return self.cant_run(Some(&query_names), Some(&check_names), ErrorKind::NoChecks);
        }

        let ctx = CheckerContext {
            checker: self.checker,
            queries: Some(&query_names),
            checks: Some(&check_names),
        };
        let counts = self.chain.around(
            Hook::Checker,
            |reporter, next| reporter.around_checker(&ctx, next),
            || self.run_queries(&queries, &checks),
        )?;

        debug!(checker = %self.name, summary = %counts.summary(), "checker finished");
        Ok(counts)
    }

    /// Report a checker that does not declare runnable operations.
    fn cant_run(
        &self,
        queries: Option<&[String]>,
        checks: Option<&[String]>,
        kind: ErrorKind,
    ) -> Result<CountStats> {
        warn!(checker = %self.name, %kind, "checker cannot run");
        let error = CheckError::new(self.name.clone(), kind);
        let ctx = CheckerContext {
            checker: self.checker,
            queries,
            checks,
        };
        self.chain.around(
            Hook::Checker,
            |reporter, next| reporter.around_checker(&ctx, next),
            || {
                self.halt(&error)?;
                let mut counts = CountStats::new();
                counts.increment(kind.into());
                Ok(counts)
            },
        )
    }

    fn run_queries(&self, queries: &[Query<'_>], checks: &[Check<'_>]) -> Result<CountStats> {
        let mut counts = CountStats::new();
        for query in queries {
            counts.increment_queries();
            if self.run_query(query, checks, &mut counts)?.is_break() {
                break;
            }
        }
        Ok(counts)
    }

    /// Run every check over every record of one query. Breaks when the
    /// checker tripped the blanket failure breaker.
    fn run_query(
        &self,
        query: &Query<'_>,
        checks: &[Check<'_>],
        counts: &mut CountStats,
    ) -> Result<ControlFlow<()>> {
        let mut records = match guarded(|| query.records())? {
            Ok(records) => records,
            Err(err) => return self.query_raised(query, err, counts),
        };

        loop {
            let record = match guarded(|| records.next().transpose())? {
                Ok(Some(record)) => record,
                Ok(None) => return Ok(ControlFlow::Continue(())),
                Err(err) => return self.query_raised(query, err, counts),
            };
            for check in checks {
                let result = self.run_check(query, check, &record)?;
                if self.tally(&result, counts)?.is_break() {
                    return Ok(ControlFlow::Break(()));
                }
            }
        }
    }

    fn query_raised(
        &self,
        query: &Query<'_>,
        err: anyhow::Error,
        counts: &mut CountStats,
    ) -> Result<ControlFlow<()>> {
        warn!(checker = %self.name, query = query.name(), error = %err, "query failed");
        let error = CheckError::raised(
            self.name.clone(),
            Some(query.name().to_string()),
            None,
            None,
            CapturedException::from(&err),
        );
        let ctx = CheckContext {
            checker: self.checker,
            query: Some(query.name()),
            check: None,
            record: None,
        };
        let result = self.chain.around(
            Hook::Check,
            |reporter, next| reporter.around_check(&ctx, next),
            || Ok(CheckResult::Error(error)),
        )?;
        self.tally(&result, counts)
    }

    fn run_check(&self, query: &Query<'_>, check: &Check<'_>, record: &Record) -> Result<CheckResult> {
        let ctx = CheckContext {
            checker: self.checker,
            query: Some(query.name()),
            check: Some(check.name()),
            record: Some(record),
        };
        self.chain.around(
            Hook::Check,
            |reporter, next| reporter.around_check(&ctx, next),
            || self.evaluate(query, check, record),
        )
    }

    fn evaluate(&self, query: &Query<'_>, check: &Check<'_>, record: &Record) -> Result<CheckResult> {
        let result = match guarded(|| check.run(record))? {
            Ok(true) => CheckResult::Pass,
            Ok(false) => {
                CheckError::failed(self.name.clone(), query.name(), check.name(), record.clone()).into()
            }
            Err(err) => {
                debug!(
                    checker = %self.name,
                    check = check.name(),
                    record = %record,
                    error = %err,
                    "check raised"
                );
                CheckError::raised(
                    self.name.clone(),
                    Some(query.name().to_string()),
                    Some(check.name().to_string()),
                    Some(record.clone()),
                    CapturedException::from(&err),
                )
                .into()
            }
        };
        Ok(result)
    }

    /// Count a result, tripping the blanket failure breaker if every result
    /// so far failed.
    fn tally(&self, result: &CheckResult, counts: &mut CountStats) -> Result<ControlFlow<()>> {
        counts.increment(result.kind());
        if result.is_pass() || !counts.reached_blanket_failure() {
            return Ok(ControlFlow::Continue(()));
        }

        warn!(
            checker = %self.name,
            threshold = BLANKET_FAILURE_THRESHOLD,
            "first results all failed, skipping the rest of the checker"
        );
        counts.increment(ResultKind::Blanket);
        self.halt(&CheckError::new(self.name.clone(), ErrorKind::Blanket))?;
        Ok(ControlFlow::Break(()))
    }

    fn halt(&self, error: &CheckError) -> Result<()> {
        for reporter in self.reporters {
            reporter.halt(self.checker, error)?;
        }
        Ok(())
    }
}

/// Run user code, turning panics into errors. The outer `Err` carries
/// conditions that must end the run; the inner one is a recoverable failure.
fn guarded<T>(op: impl FnOnce() -> anyhow::Result<T>) -> Result<anyhow::Result<T>> {
    let outcome = match panic::catch_unwind(AssertUnwindSafe(op)) {
        Ok(outcome) => outcome,
        Err(payload) => Err(anyhow!("panicked: {}", panic_message(payload.as_ref()))),
    };
    match outcome {
        Ok(value) => Ok(Ok(value)),
        Err(err) => escalate(err).map(Err),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}
