//! Progress reporter used when no reporter is named.

use std::cell::RefCell;
use std::io::{IsTerminal, Write};
use std::rc::Rc;

use colored::Colorize;

use crate::checker::Checker;
use crate::error::Result;
use crate::result::{CheckError, CheckResult};
use crate::stats::CountStats;

use super::format::error_details;
use super::{CheckContext, CheckerContext, Next, Reporter};

/// Results between progress marks.
const PROGRESS_INTERVAL: u64 = 1000;

/// Prints a progress mark every thousand results, then a per-checker summary
/// with error details, then run totals.
pub struct DefaultReporter {
    out: RefCell<Box<dyn Write>>,
    color: bool,
    progress: RefCell<CountStats>,
    errors: RefCell<Vec<CheckError>>,
}

impl DefaultReporter {
    /// Write to stdout, colored when stdout is a terminal.
    pub fn new() -> Self {
        let color = std::io::stdout().is_terminal();
        let mut reporter = Self::with_writer(std::io::stdout());
        reporter.color = color;
        reporter
    }

    /// Write uncolored output to `out`.
    pub fn with_writer(out: impl Write + 'static) -> Self {
        Self {
            out: RefCell::new(Box::new(out)),
            color: false,
            progress: RefCell::new(CountStats::new()),
            errors: RefCell::new(Vec::new()),
        }
    }

    fn print_progress(&self) -> Result<()> {
        let all_pass = self.progress.borrow().all_pass();
        let mark = match (all_pass, self.color) {
            (true, true) => ".".green().to_string(),
            (true, false) => ".".to_string(),
            (false, true) => "x".red().to_string(),
            (false, false) => "x".to_string(),
        };
        *self.progress.borrow_mut() = CountStats::new();
        let mut out = self.out.borrow_mut();
        write!(out, "{}", mark)?;
        out.flush()?;
        Ok(())
    }

    fn print_summary(&self, counts: &CountStats) -> Result<()> {
        let summary = counts.summary();
        let summary = match (self.color, counts.any_errors()) {
            (false, _) => summary,
            (true, true) => summary.red().to_string(),
            (true, false) => summary.green().to_string(),
        };
        let mut out = self.out.borrow_mut();
        writeln!(out, "  {}", summary)?;
        for line in error_details(&self.errors.borrow(), self.color) {
            writeln!(out, "{}", line)?;
        }
        Ok(())
    }
}

impl Default for DefaultReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Reporter for DefaultReporter {
    fn around_run(
        &self,
        _checkers: &[Rc<dyn Checker>],
        next: &mut Next<'_, CountStats>,
    ) -> Result<()> {
        let totals = next.call()?;

        let mut out = self.out.borrow_mut();
        let total = format!("Total: {}", totals.summary());
        if self.color {
            writeln!(out, "{}", total.bold())?;
        } else {
            writeln!(out, "{}", total)?;
        }
        if totals.all_zero() {
            writeln!(
                out,
                "Queries found no records to check (this is OK when queries can select only invalid data)"
            )?;
        }
        out.flush()?;
        Ok(())
    }

    fn around_checker(
        &self,
        ctx: &CheckerContext<'_>,
        next: &mut Next<'_, CountStats>,
    ) -> Result<()> {
        self.errors.borrow_mut().clear();
        {
            let mut out = self.out.borrow_mut();
            write!(out, "{}: ", ctx.checker.name())?;
            out.flush()?;
        }

        let counts = next.call()?;

        // The last mark may already be printed.
        if self.progress.borrow().total() % PROGRESS_INTERVAL != 0 {
            self.print_progress()?;
        }
        self.print_summary(&counts)
    }

    fn around_check(&self, _ctx: &CheckContext<'_>, next: &mut Next<'_, CheckResult>) -> Result<()> {
        let result = next.call()?;

        let due = {
            let mut progress = self.progress.borrow_mut();
            progress.increment(result.kind());
            progress.total() % PROGRESS_INTERVAL == 0
        };
        if due {
            self.print_progress()?;
        }

        if let CheckResult::Error(error) = result {
            self.errors.borrow_mut().push(error);
        }
        Ok(())
    }

    fn halt(&self, _checker: &dyn Checker, error: &CheckError) -> Result<()> {
        self.errors.borrow_mut().push(error.clone());
        Ok(())
    }
}
