//! Reporter for unattended runs: silent unless something went wrong.

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use crate::checker::Checker;
use crate::error::Result;
use crate::result::{CheckError, CheckResult};
use crate::stats::CountStats;

use super::format::error_details;
use super::{CheckContext, CheckerContext, Next, Reporter};

pub struct CronReporter {
    out: RefCell<Box<dyn Write>>,
    errors: RefCell<Vec<CheckError>>,
}

impl CronReporter {
    pub fn new() -> Self {
        Self::with_writer(std::io::stdout())
    }

    pub fn with_writer(out: impl Write + 'static) -> Self {
        Self {
            out: RefCell::new(Box::new(out)),
            errors: RefCell::new(Vec::new()),
        }
    }
}

impl Default for CronReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Reporter for CronReporter {
    fn around_run(
        &self,
        _checkers: &[Rc<dyn Checker>],
        next: &mut Next<'_, CountStats>,
    ) -> Result<()> {
        let totals = next.call()?;
        if totals.any_errors() {
            let mut out = self.out.borrow_mut();
            writeln!(out, "Total: {}", totals.summary())?;
            out.flush()?;
        }
        Ok(())
    }

    fn around_checker(
        &self,
        ctx: &CheckerContext<'_>,
        next: &mut Next<'_, CountStats>,
    ) -> Result<()> {
        self.errors.borrow_mut().clear();

        let counts = next.call()?;

        if counts.any_errors() {
            let mut out = self.out.borrow_mut();
            writeln!(out, "{}: {}", ctx.checker.name(), counts.summary())?;
            for line in error_details(&self.errors.borrow(), false) {
                writeln!(out, "{}", line)?;
            }
        }
        Ok(())
    }

    fn around_check(&self, _ctx: &CheckContext<'_>, next: &mut Next<'_, CheckResult>) -> Result<()> {
        if let CheckResult::Error(error) = next.call()? {
            self.errors.borrow_mut().push(error);
        }
        Ok(())
    }

    fn halt(&self, _checker: &dyn Checker, error: &CheckError) -> Result<()> {
        self.errors.borrow_mut().push(error.clone());
        Ok(())
    }
}
