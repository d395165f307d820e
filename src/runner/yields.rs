//! Bookkeeping that every reporter continues exactly once per hook.

use std::collections::BTreeMap;

use crate::error::{RecheckError, Result};

/// The three points where reporters wrap the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Hook {
    Run,
    Checker,
    Check,
}

impl Hook {
    pub fn as_str(&self) -> &'static str {
        match self {
            Hook::Run => "around_run",
            Hook::Checker => "around_checker",
            Hook::Check => "around_check",
        }
    }
}

impl std::fmt::Display for Hook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Identity of a reporter within one run: its position in the deduplicated
/// reporter list, plus a name for messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReporterKey {
    pub index: usize,
    pub name: String,
}

impl ReporterKey {
    pub fn new(index: usize, name: impl Into<String>) -> Self {
        Self {
            index,
            name: name.into(),
        }
    }
}

#[derive(Debug)]
struct Expectation {
    reporter: ReporterKey,
    ran: bool,
}

/// Tracks, per hook, which reporters were expected to continue and which did.
#[derive(Debug, Default)]
pub struct YieldTracker {
    executions: BTreeMap<Hook, Vec<Expectation>>,
}

impl YieldTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expect `reporter` to continue in its next `hook` invocation.
    /// Resets any earlier expectation for the same pair.
    pub fn expect(&mut self, hook: Hook, reporter: ReporterKey) {
        let expectations = self.executions.entry(hook).or_default();
        match expectations
            .iter_mut()
            .find(|e| e.reporter.index == reporter.index)
        {
            Some(existing) => {
                existing.reporter = reporter;
                existing.ran = false;
            }
            None => expectations.push(Expectation {
                reporter,
                ran: false,
            }),
        }
    }

    /// Record that `reporter` continued in `hook`.
    pub fn ran(&mut self, hook: Hook, reporter: &ReporterKey) -> Result<()> {
        let expectations =
            self.executions
                .get_mut(&hook)
                .ok_or_else(|| RecheckError::UnexpectedHookYield {
                    hook,
                    reporter: reporter.name.clone(),
                })?;
        let expectation = expectations
            .iter_mut()
            .find(|e| e.reporter.index == reporter.index)
            .ok_or_else(|| RecheckError::UnexpectedReporterYield {
                hook,
                reporter: reporter.name.clone(),
            })?;
        if expectation.ran {
            return Err(RecheckError::HookYieldedTwice {
                hook,
                reporter: reporter.name.clone(),
            });
        }
        expectation.ran = true;
        Ok(())
    }

    /// Fail unless every reporter expected at `hook` has continued.
    pub fn assert_all_yielded(&self, hook: Hook) -> Result<()> {
        let didnt_yield: Vec<String> = self
            .executions
            .get(&hook)
            .map(|expectations| {
                expectations
                    .iter()
                    .filter(|e| !e.ran)
                    .map(|e| e.reporter.name.clone())
                    .collect()
            })
            .unwrap_or_default();

        if didnt_yield.is_empty() {
            Ok(())
        } else {
            Err(RecheckError::HookDidNotYield {
                hook,
                reporters: didnt_yield,
            })
        }
    }
}
