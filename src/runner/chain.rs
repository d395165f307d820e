//! Composition of reporters into nested middleware around a unit of work.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::{RecheckError, Result};
use crate::reporter::{Next, Reporter};

use super::yields::{Hook, ReporterKey, YieldTracker};

/// Ordered reporters sharing one run's yield bookkeeping.
///
/// The first reporter is outermost: with `[A, B]` around some work the call
/// order is A-before, B-before, work, B-after, A-after.
pub(crate) struct ReporterChain<'r> {
    reporters: &'r [Rc<dyn Reporter>],
    keys: Vec<ReporterKey>,
    tracker: &'r RefCell<YieldTracker>,
}

/// Per-invocation state threaded through the layers.
struct Layers<T, W> {
    work: Option<W>,
    output: Option<T>,
    failure: Option<RecheckError>,
}

impl<T, W> Layers<T, W>
where
    T: Clone,
    W: FnOnce() -> Result<T>,
{
    fn run_work(&mut self) -> Result<()> {
        if let Some(work) = self.work.take() {
            self.output = Some(work()?);
        }
        Ok(())
    }

    /// Keep the first failure; reporters see a stand-in.
    fn fail(&mut self, hook: Hook, err: RecheckError) -> RecheckError {
        if self.failure.is_none() && !matches!(err, RecheckError::Unwound { .. }) {
            self.failure = Some(err);
        }
        RecheckError::Unwound { hook }
    }
}

impl<'r> ReporterChain<'r> {
    pub fn new(reporters: &'r [Rc<dyn Reporter>], tracker: &'r RefCell<YieldTracker>) -> Self {
        let keys = reporters
            .iter()
            .enumerate()
            .map(|(index, reporter)| ReporterKey::new(index, reporter.name()))
            .collect();
        Self {
            reporters,
            keys,
            tracker,
        }
    }

    /// Run `work` wrapped in every reporter's `hook`, returning the work's
    /// value. `invoke` calls the hook method on one reporter.
    pub fn around<T, H, W>(&self, hook: Hook, invoke: H, work: W) -> Result<T>
    where
        T: Clone,
        H: Fn(&dyn Reporter, &mut Next<'_, T>) -> Result<()>,
        W: FnOnce() -> Result<T>,
    {
        if self.reporters.is_empty() {
            return work();
        }

        {
            let mut tracker = self.tracker.borrow_mut();
            for key in &self.keys {
                tracker.expect(hook, key.clone());
            }
        }

        let mut layers = Layers {
            work: Some(work),
            output: None,
            failure: None,
        };
        let outcome = self.layer(0, hook, &invoke, &mut layers);
        if let Some(failure) = layers.failure.take() {
            return Err(failure);
        }
        outcome?;
        self.tracker.borrow().assert_all_yielded(hook)?;
        layers.output.ok_or_else(|| RecheckError::HookDidNotYield {
            hook,
            reporters: self.keys.iter().map(|k| k.name.clone()).collect(),
        })
    }

    fn layer<T, H, W>(
        &self,
        index: usize,
        hook: Hook,
        invoke: &H,
        layers: &mut Layers<T, W>,
    ) -> Result<()>
    where
        T: Clone,
        H: Fn(&dyn Reporter, &mut Next<'_, T>) -> Result<()>,
        W: FnOnce() -> Result<T>,
    {
        let reporter = self.reporters[index].as_ref();
        let mut proceed = || -> Result<T> {
            if let Err(err) = self.tracker.borrow_mut().ran(hook, &self.keys[index]) {
                return Err(layers.fail(hook, err));
            }

            let inner = if index + 1 < self.reporters.len() {
                self.layer(index + 1, hook, invoke, layers)
            } else {
                layers.run_work()
            };
            if let Err(err) = inner {
                return Err(layers.fail(hook, err));
            }

            match layers.output.clone() {
                Some(value) => Ok(value),
                // An inner reporter returned without continuing.
                None => {
                    let err = match self.tracker.borrow().assert_all_yielded(hook) {
                        Err(err) => err,
                        Ok(()) => RecheckError::Unwound { hook },
                    };
                    Err(layers.fail(hook, err))
                }
            }
        };
        invoke(reporter, &mut Next::new(&mut proceed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::CountStats;

    /// Logs before/after around every run hook.
    struct Logging {
        label: &'static str,
        log: Rc<RefCell<Vec<String>>>,
        continues: usize,
    }

    impl Logging {
        fn new(label: &'static str, log: &Rc<RefCell<Vec<String>>>) -> Rc<dyn Reporter> {
            Self::continuing(label, log, 1)
        }

        fn continuing(
            label: &'static str,
            log: &Rc<RefCell<Vec<String>>>,
            continues: usize,
        ) -> Rc<dyn Reporter> {
            Rc::new(Self {
                label,
                log: Rc::clone(log),
                continues,
            })
        }
    }

    impl Reporter for Logging {
        fn name(&self) -> String {
            self.label.to_string()
        }

        fn around_run(
            &self,
            _checkers: &[Rc<dyn crate::checker::Checker>],
            next: &mut Next<'_, CountStats>,
        ) -> Result<()> {
            self.log.borrow_mut().push(format!("{}-before", self.label));
            for _ in 0..self.continues {
                next.call()?;
            }
            self.log.borrow_mut().push(format!("{}-after", self.label));
            Ok(())
        }
    }

    fn run_chain(reporters: &[Rc<dyn Reporter>], log: &Rc<RefCell<Vec<String>>>) -> Result<CountStats> {
        let tracker = RefCell::new(YieldTracker::new());
        let chain = ReporterChain::new(reporters, &tracker);
        chain.around(
            Hook::Run,
            |reporter, next| reporter.around_run(&[], next),
            || {
                log.borrow_mut().push("work".to_string());
                let mut stats = CountStats::new();
                stats.pass = 4;
                Ok(stats)
            },
        )
    }

    #[test]
    fn test_nests_first_reporter_outermost() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let reporters = vec![Logging::new("A", &log), Logging::new("B", &log)];

        let stats = run_chain(&reporters, &log).unwrap();

        assert_eq!(stats.pass, 4);
        assert_eq!(
            *log.borrow(),
            vec!["A-before", "B-before", "work", "B-after", "A-after"]
        );
    }

    #[test]
    fn test_empty_chain_runs_work_directly() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let stats = run_chain(&[], &log).unwrap();
        assert_eq!(stats.pass, 4);
        assert_eq!(*log.borrow(), vec!["work"]);
    }

    #[test]
    fn test_reporter_that_never_continues() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let reporters = vec![Logging::new("A", &log), Logging::continuing("B", &log, 0)];

        match run_chain(&reporters, &log) {
            Err(RecheckError::HookDidNotYield { hook, reporters }) => {
                assert_eq!(hook, Hook::Run);
                assert_eq!(reporters, vec!["B".to_string()]);
            }
            other => panic!("expected HookDidNotYield, got {:?}", other),
        }
        assert!(!log.borrow().contains(&"work".to_string()));
    }

    #[test]
    fn test_reporter_that_continues_twice() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let reporters = vec![Logging::continuing("A", &log, 2)];

        match run_chain(&reporters, &log) {
            Err(RecheckError::HookYieldedTwice { hook, reporter }) => {
                assert_eq!(hook, Hook::Run);
                assert_eq!(reporter, "A");
            }
            other => panic!("expected HookYieldedTwice, got {:?}", other),
        }
        assert_eq!(log.borrow().iter().filter(|l| *l == "work").count(), 1);
    }

    #[test]
    fn test_work_failure_surfaces_through_reporters() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let reporters = vec![Logging::new("A", &log)];
        let tracker = RefCell::new(YieldTracker::new());
        let chain = ReporterChain::new(&reporters, &tracker);

        let result: Result<CountStats> = chain.around(
            Hook::Run,
            |reporter, next| reporter.around_run(&[], next),
            || Err(crate::error::ProcessSignal::Interrupt.into()),
        );

        assert!(matches!(result, Err(RecheckError::Signal(_))));
        assert_eq!(*log.borrow(), vec!["A-before"]);
    }
}
