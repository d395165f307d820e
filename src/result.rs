//! Check results: a pass marker and structured errors.

use serde::{Deserialize, Serialize};

use crate::error::{RecheckError, Result};
use crate::record::Record;

/// Every kind of result a run can count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultKind {
    Pass,
    Fail,
    Exception,
    Blanket,
    NoQueryMethods,
    NoQueries,
    NoCheckMethods,
    NoChecks,
}

impl ResultKind {
    pub const ALL: [ResultKind; 8] = [
        ResultKind::Pass,
        ResultKind::Fail,
        ResultKind::Exception,
        ResultKind::Blanket,
        ResultKind::NoQueryMethods,
        ResultKind::NoQueries,
        ResultKind::NoCheckMethods,
        ResultKind::NoChecks,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResultKind::Pass => "pass",
            ResultKind::Fail => "fail",
            ResultKind::Exception => "exception",
            ResultKind::Blanket => "blanket",
            ResultKind::NoQueryMethods => "no_query_methods",
            ResultKind::NoQueries => "no_queries",
            ResultKind::NoCheckMethods => "no_check_methods",
            ResultKind::NoChecks => "no_checks",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        ResultKind::ALL.into_iter().find(|kind| kind.as_str() == s)
    }

    pub fn is_error(&self) -> bool {
        !matches!(self, ResultKind::Pass)
    }
}

impl std::fmt::Display for ResultKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ResultKind {
    type Err = RecheckError;

    fn from_str(s: &str) -> Result<Self> {
        ResultKind::parse(s).ok_or_else(|| RecheckError::UnknownResultKind(s.to_string()))
    }
}

/// The closed set of kinds an error result may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Fail,
    Exception,
    Blanket,
    NoQueryMethods,
    NoQueries,
    NoCheckMethods,
    NoChecks,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        ResultKind::from(*self).as_str()
    }

    /// Whether this kind describes a checker that could not run at all.
    pub fn is_capability(&self) -> bool {
        matches!(
            self,
            ErrorKind::NoQueryMethods
                | ErrorKind::NoQueries
                | ErrorKind::NoCheckMethods
                | ErrorKind::NoChecks
        )
    }
}

impl From<ErrorKind> for ResultKind {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::Fail => ResultKind::Fail,
            ErrorKind::Exception => ResultKind::Exception,
            ErrorKind::Blanket => ResultKind::Blanket,
            ErrorKind::NoQueryMethods => ResultKind::NoQueryMethods,
            ErrorKind::NoQueries => ResultKind::NoQueries,
            ErrorKind::NoCheckMethods => ResultKind::NoCheckMethods,
            ErrorKind::NoChecks => ResultKind::NoChecks,
        }
    }
}

impl TryFrom<ResultKind> for ErrorKind {
    type Error = RecheckError;

    fn try_from(kind: ResultKind) -> Result<Self> {
        match kind {
            ResultKind::Pass => Err(RecheckError::InvalidResultKind(kind.to_string())),
            ResultKind::Fail => Ok(ErrorKind::Fail),
            ResultKind::Exception => Ok(ErrorKind::Exception),
            ResultKind::Blanket => Ok(ErrorKind::Blanket),
            ResultKind::NoQueryMethods => Ok(ErrorKind::NoQueryMethods),
            ResultKind::NoQueries => Ok(ErrorKind::NoQueries),
            ResultKind::NoCheckMethods => Ok(ErrorKind::NoCheckMethods),
            ResultKind::NoChecks => Ok(ErrorKind::NoChecks),
        }
    }
}

impl std::str::FromStr for ErrorKind {
    type Err = RecheckError;

    fn from_str(s: &str) -> Result<Self> {
        ResultKind::parse(s)
            .ok_or_else(|| RecheckError::InvalidResultKind(s.to_string()))
            .and_then(ErrorKind::try_from)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An error raised by a check or query, flattened for reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedException {
    pub message: String,
    /// Underlying causes, outermost first (excluding `message` itself).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub causes: Vec<String>,
}

impl CapturedException {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            causes: Vec::new(),
        }
    }
}

impl From<&anyhow::Error> for CapturedException {
    fn from(err: &anyhow::Error) -> Self {
        Self {
            message: err.to_string(),
            causes: err.chain().skip(1).map(|cause| cause.to_string()).collect(),
        }
    }
}

impl std::fmt::Display for CapturedException {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        for cause in &self.causes {
            write!(f, ": {}", cause)?;
        }
        Ok(())
    }
}

/// A non-passing result.
#[derive(Debug, Clone)]
pub struct CheckError {
    checker: String,
    query: Option<String>,
    check: Option<String>,
    record: Option<Record>,
    kind: ErrorKind,
    exception: Option<CapturedException>,
}

impl CheckError {
    /// A checker-level error carrying no query, check, or record.
    pub fn new(checker: impl Into<String>, kind: ErrorKind) -> Self {
        Self {
            checker: checker.into(),
            query: None,
            check: None,
            record: None,
            kind,
            exception: None,
        }
    }

    /// Build a checker-level error from a kind name, rejecting anything
    /// outside the error-kind set.
    pub fn from_kind_name(checker: impl Into<String>, kind: &str) -> Result<Self> {
        Ok(Self::new(checker, kind.parse()?))
    }

    /// A check that returned `false` for a record.
    pub fn failed(
        checker: impl Into<String>,
        query: impl Into<String>,
        check: impl Into<String>,
        record: Record,
    ) -> Self {
        Self {
            checker: checker.into(),
            query: Some(query.into()),
            check: Some(check.into()),
            record: Some(record),
            kind: ErrorKind::Fail,
            exception: None,
        }
    }

    /// A check or query that raised. `check` and `record` are absent when the
    /// query itself failed.
    pub fn raised(
        checker: impl Into<String>,
        query: Option<String>,
        check: Option<String>,
        record: Option<Record>,
        exception: CapturedException,
    ) -> Self {
        Self {
            checker: checker.into(),
            query,
            check,
            record,
            kind: ErrorKind::Exception,
            exception: Some(exception),
        }
    }

    pub fn checker(&self) -> &str {
        &self.checker
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn check(&self) -> Option<&str> {
        self.check.as_deref()
    }

    pub fn record(&self) -> Option<&Record> {
        self.record.as_ref()
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn exception(&self) -> Option<&CapturedException> {
        self.exception.as_ref()
    }

    /// Identifier of the failing record, if any.
    pub fn record_id(&self) -> Option<&str> {
        self.record.as_ref().map(Record::id)
    }
}

/// Outcome of one check invocation.
#[derive(Debug, Clone)]
pub enum CheckResult {
    Pass,
    Error(CheckError),
}

impl CheckResult {
    pub fn kind(&self) -> ResultKind {
        match self {
            CheckResult::Pass => ResultKind::Pass,
            CheckResult::Error(error) => error.kind().into(),
        }
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, CheckResult::Pass)
    }

    pub fn as_error(&self) -> Option<&CheckError> {
        match self {
            CheckResult::Pass => None,
            CheckResult::Error(error) => Some(error),
        }
    }
}

impl From<CheckError> for CheckResult {
    fn from(error: CheckError) -> Self {
        CheckResult::Error(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pass_kind() {
        assert_eq!(CheckResult::Pass.kind(), ResultKind::Pass);
        assert!(CheckResult::Pass.is_pass());
        assert!(CheckResult::Pass.as_error().is_none());
    }

    #[test]
    fn test_error_kind_names_round_trip() {
        for kind in ResultKind::ALL.into_iter().filter(ResultKind::is_error) {
            let parsed: ErrorKind = kind.as_str().parse().unwrap();
            assert_eq!(ResultKind::from(parsed), kind);
        }
    }

    #[test]
    fn test_error_rejects_kinds_outside_the_closed_set() {
        for name in ["pass", "queries", "warning", "", "FAIL", "no_query"] {
            let err = CheckError::from_kind_name("UserChecker", name).unwrap_err();
            assert!(
                matches!(err, RecheckError::InvalidResultKind(ref k) if k == name),
                "{:?} should be rejected",
                name
            );
        }
        assert!(ErrorKind::try_from(ResultKind::Pass).is_err());
    }

    #[test]
    fn test_checker_level_error_has_no_details() {
        let error = CheckError::from_kind_name("UserChecker", "no_checks").unwrap();
        assert_eq!(error.kind(), ErrorKind::NoChecks);
        assert!(error.kind().is_capability());
        assert_eq!(error.checker(), "UserChecker");
        assert!(error.query().is_none());
        assert!(error.check().is_none());
        assert!(error.record().is_none());
        assert!(error.exception().is_none());
    }

    #[test]
    fn test_failed_error() {
        let error = CheckError::failed("UserChecker", "query_all", "check_email", Record::new(3));
        let result = CheckResult::from(error);
        assert_eq!(result.kind(), ResultKind::Fail);
        let error = result.as_error().unwrap();
        assert_eq!(error.record_id(), Some("3"));
        assert_eq!(error.check(), Some("check_email"));
    }

    #[test]
    fn test_captured_exception_keeps_cause_chain() {
        let err = anyhow::anyhow!("socket closed").context("fetching MX record");
        let captured = CapturedException::from(&err);
        assert_eq!(captured.message, "fetching MX record");
        assert_eq!(captured.causes, vec!["socket closed".to_string()]);
        assert_eq!(captured.to_string(), "fetching MX record: socket closed");
    }
}
