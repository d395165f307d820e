//! Result counting for a run.

use serde::{Deserialize, Serialize};

use crate::error::{RecheckError, Result};
use crate::result::ResultKind;

/// Consecutive fails (or exceptions) with no pass that mark a checker broken.
pub const BLANKET_FAILURE_THRESHOLD: u64 = 20;

/// Counts of results by kind, plus the number of queries run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountStats {
    pub queries: u64,
    pub pass: u64,
    pub fail: u64,
    pub exception: u64,
    pub blanket: u64,
    pub no_query_methods: u64,
    pub no_queries: u64,
    pub no_check_methods: u64,
    pub no_checks: u64,
}

impl CountStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current count for a kind.
    pub fn get(&self, kind: ResultKind) -> u64 {
        match kind {
            ResultKind::Pass => self.pass,
            ResultKind::Fail => self.fail,
            ResultKind::Exception => self.exception,
            ResultKind::Blanket => self.blanket,
            ResultKind::NoQueryMethods => self.no_query_methods,
            ResultKind::NoQueries => self.no_queries,
            ResultKind::NoCheckMethods => self.no_check_methods,
            ResultKind::NoChecks => self.no_checks,
        }
    }

    fn counter_mut(&mut self, kind: ResultKind) -> &mut u64 {
        match kind {
            ResultKind::Pass => &mut self.pass,
            ResultKind::Fail => &mut self.fail,
            ResultKind::Exception => &mut self.exception,
            ResultKind::Blanket => &mut self.blanket,
            ResultKind::NoQueryMethods => &mut self.no_query_methods,
            ResultKind::NoQueries => &mut self.no_queries,
            ResultKind::NoCheckMethods => &mut self.no_check_methods,
            ResultKind::NoChecks => &mut self.no_checks,
        }
    }

    pub fn increment(&mut self, kind: ResultKind) {
        *self.counter_mut(kind) += 1;
    }

    pub fn increment_queries(&mut self) {
        self.queries += 1;
    }

    /// Increment by name; `"queries"` bumps the query counter.
    pub fn increment_named(&mut self, name: &str) -> Result<()> {
        if name == "queries" {
            self.increment_queries();
            return Ok(());
        }
        let kind =
            ResultKind::parse(name).ok_or_else(|| RecheckError::UnknownResultKind(name.to_string()))?;
        self.increment(kind);
        Ok(())
    }

    /// Add another set of counts into this one.
    pub fn merge(&mut self, other: &CountStats) -> &mut Self {
        self.queries += other.queries;
        for kind in ResultKind::ALL {
            *self.counter_mut(kind) += other.get(kind);
        }
        self
    }

    /// No error of any kind was counted. Passes are irrelevant.
    pub fn all_pass(&self) -> bool {
        ResultKind::ALL
            .into_iter()
            .filter(ResultKind::is_error)
            .all(|kind| self.get(kind) == 0)
    }

    pub fn any_errors(&self) -> bool {
        !self.all_pass()
    }

    /// Nothing at all was counted (queries aside).
    pub fn all_zero(&self) -> bool {
        self.total() == 0
    }

    pub fn reached_blanket_failure(&self) -> bool {
        self.pass == 0
            && (self.fail == BLANKET_FAILURE_THRESHOLD
                || self.exception == BLANKET_FAILURE_THRESHOLD)
    }

    /// Sum of all result counters. Does not include `queries`.
    pub fn total(&self) -> u64 {
        ResultKind::ALL.into_iter().map(|kind| self.get(kind)).sum()
    }

    /// One-line summary, e.g. `"2 queries, 4 pass, 1 fail, 1 exception"`.
    ///
    /// `pass` and `fail` are always shown; other kinds only when nonzero.
    pub fn summary(&self) -> String {
        let noun = if self.queries == 1 { "query" } else { "queries" };
        let mut parts = vec![format!("{} {}", self.queries, noun)];
        parts.extend(
            ResultKind::ALL
                .into_iter()
                .filter(|kind| {
                    matches!(kind, ResultKind::Pass | ResultKind::Fail) || self.get(*kind) > 0
                })
                .map(|kind| format!("{} {}", self.get(kind), kind)),
        );
        parts.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(kinds: &[ResultKind], queries: u64) -> CountStats {
        let mut stats = CountStats::new();
        for kind in kinds {
            stats.increment(*kind);
        }
        stats.queries = queries;
        stats
    }

    #[test]
    fn test_initialization() {
        let stats = CountStats::new();
        assert_eq!(stats.pass, 0);
        assert_eq!(stats.fail, 0);
        assert_eq!(stats.exception, 0);
        assert_eq!(stats.queries, 0);
        assert_eq!(stats.total(), 0);
        assert!(stats.all_zero());
        assert!(stats.all_pass());
    }

    #[test]
    fn test_increment() {
        let mut stats = CountStats::new();
        stats.increment(ResultKind::Pass);
        stats.increment(ResultKind::Fail);
        stats.increment(ResultKind::Exception);
        stats.increment_queries();
        assert_eq!((stats.pass, stats.fail, stats.exception), (1, 1, 1));
        assert_eq!(stats.queries, 1);
        assert_eq!(stats.total(), 3);
    }

    #[test]
    fn test_increment_named() {
        let mut stats = CountStats::new();
        stats.increment_named("queries").unwrap();
        stats.increment_named("no_checks").unwrap();
        assert_eq!(stats.queries, 1);
        assert_eq!(stats.no_checks, 1);

        let err = stats.increment_named("invalid_type").unwrap_err();
        assert!(matches!(err, RecheckError::UnknownResultKind(ref k) if k == "invalid_type"));
    }

    #[test]
    fn test_total_is_sum_of_kind_counters() {
        let mut stats = CountStats::new();
        for (i, kind) in ResultKind::ALL.into_iter().enumerate() {
            for _ in 0..=i {
                stats.increment(kind);
            }
            stats.increment_queries();
        }
        let sum: u64 = ResultKind::ALL.into_iter().map(|k| stats.get(k)).sum();
        assert_eq!(stats.total(), sum);
        assert_eq!(stats.total(), 36);
    }

    #[test]
    fn test_all_pass_ignores_passes() {
        let mut stats = stats(&[ResultKind::Pass, ResultKind::Pass], 1);
        assert!(stats.all_pass());
        assert!(!stats.all_zero());

        for kind in ResultKind::ALL.into_iter().filter(ResultKind::is_error) {
            let mut with_error = stats.clone();
            with_error.increment(kind);
            assert!(!with_error.all_pass(), "{} should break all_pass", kind);
            assert!(with_error.any_errors());
        }

        stats.increment(ResultKind::Pass);
        assert!(stats.all_pass());
    }

    #[test]
    fn test_all_zero_ignores_queries() {
        let stats = stats(&[], 3);
        assert!(stats.all_zero());
        assert!(!self::stats(&[ResultKind::Pass], 0).all_zero());
    }

    #[test]
    fn test_reached_blanket_failure_with_fails() {
        let mut stats = CountStats::new();
        for _ in 0..19 {
            stats.increment(ResultKind::Fail);
        }
        assert!(!stats.reached_blanket_failure());
        stats.increment(ResultKind::Fail);
        assert!(stats.reached_blanket_failure());
    }

    #[test]
    fn test_reached_blanket_failure_with_exceptions() {
        let mut stats = CountStats::new();
        for _ in 0..19 {
            stats.increment(ResultKind::Exception);
        }
        assert!(!stats.reached_blanket_failure());
        stats.increment(ResultKind::Exception);
        assert!(stats.reached_blanket_failure());
    }

    #[test]
    fn test_pass_prevents_blanket_failure() {
        let mut stats = CountStats::new();
        for _ in 0..20 {
            stats.increment(ResultKind::Fail);
        }
        assert!(stats.reached_blanket_failure());
        stats.increment(ResultKind::Pass);
        assert!(!stats.reached_blanket_failure());

        let mut stats = CountStats::new();
        stats.increment(ResultKind::Pass);
        for _ in 0..20 {
            stats.increment(ResultKind::Fail);
        }
        assert!(!stats.reached_blanket_failure());
    }

    #[test]
    fn test_merge() {
        let mut a = stats(&[ResultKind::Pass, ResultKind::Fail], 1);
        let b = stats(&[ResultKind::Pass, ResultKind::Exception], 2);
        a.merge(&b);
        assert_eq!((a.pass, a.fail, a.exception), (2, 1, 1));
        assert_eq!(a.queries, 3);
        assert_eq!(a.total(), 4);
    }

    #[test]
    fn test_merge_is_associative_and_commutative() {
        let a = stats(&[ResultKind::Pass, ResultKind::Fail, ResultKind::NoChecks], 2);
        let b = stats(&[ResultKind::Exception, ResultKind::Blanket], 1);
        let c = stats(&[ResultKind::Pass, ResultKind::NoQueryMethods, ResultKind::Fail], 5);

        let mut left = a.clone();
        left.merge(&b).merge(&c);

        let mut bc = b.clone();
        bc.merge(&c);
        let mut right = a.clone();
        right.merge(&bc);
        assert_eq!(left, right);

        let mut ab = a.clone();
        ab.merge(&b);
        let mut ba = b.clone();
        ba.merge(&a);
        assert_eq!(ab, ba);
    }

    #[test]
    fn test_summary() {
        let stats = stats(&[ResultKind::Pass, ResultKind::Pass, ResultKind::Blanket], 1);
        assert_eq!(stats.summary(), "1 query, 2 pass, 0 fail, 1 blanket");
        assert_eq!(CountStats::new().summary(), "0 queries, 0 pass, 0 fail");
    }
}
