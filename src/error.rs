//! Error types for the check runner.

use thiserror::Error;

use crate::runner::Hook;

/// Process-control conditions that must never be absorbed as a check result.
///
/// A check or query operation that returns one of these (directly or wrapped
/// in an `anyhow::Error`) aborts the whole run.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessSignal {
    #[error("interrupted")]
    Interrupt,
    #[error("terminated")]
    Terminate,
    #[error("exit requested with status {0}")]
    Exit(i32),
}

#[derive(Error, Debug)]
pub enum RecheckError {
    #[error("invalid result kind {0:?} for an error result")]
    InvalidResultKind(String),

    #[error("unknown result kind {0:?}")]
    UnknownResultKind(String),

    #[error("reporter(s) [{}] did not yield in their {hook} hook", reporters.join(", "))]
    HookDidNotYield { hook: Hook, reporters: Vec<String> },

    #[error("ran a hook {hook} twice for reporter {reporter}")]
    HookYieldedTwice { hook: Hook, reporter: String },

    #[error("ran an unexpected hook {hook} (for reporter {reporter})")]
    UnexpectedHookYield { hook: Hook, reporter: String },

    #[error("ran an expected hook {hook} for an unexpected reporter {reporter}")]
    UnexpectedReporterYield { hook: Hook, reporter: String },

    /// Handed to reporters in place of an inner failure; the chain re-raises
    /// the original error once every layer has returned.
    #[error("work inside {hook} failed")]
    Unwound { hook: Hook },

    #[error("unknown reporter {0:?}")]
    UnknownReporter(String),

    #[error("bad argument to reporter {reporter}: {message}")]
    ReporterArgument { reporter: String, message: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("run aborted: {0}")]
    Signal(#[from] ProcessSignal),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl RecheckError {
    /// Whether this error is a broken reporter contract.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(
            self,
            RecheckError::HookDidNotYield { .. }
                | RecheckError::HookYieldedTwice { .. }
                | RecheckError::UnexpectedHookYield { .. }
                | RecheckError::UnexpectedReporterYield { .. }
        )
    }

    /// Whether this error must terminate the run when raised from user code.
    pub fn is_fatal(&self) -> bool {
        self.is_protocol_violation() || matches!(self, RecheckError::Signal(_))
    }
}

pub type Result<T> = std::result::Result<T, RecheckError>;

/// Separate a fatal condition out of an error raised by a check or query.
///
/// Returns `Err` with the crate error when the failure must propagate, or
/// `Ok` with the (possibly re-wrapped) recoverable error otherwise.
pub(crate) fn escalate(err: anyhow::Error) -> Result<anyhow::Error> {
    let err = match err.downcast::<ProcessSignal>() {
        Ok(signal) => return Err(RecheckError::Signal(signal)),
        Err(err) => err,
    };
    match err.downcast::<RecheckError>() {
        Ok(inner) if inner.is_fatal() => Err(inner),
        Ok(inner) => Ok(anyhow::Error::new(inner)),
        Err(err) => Ok(err),
    }
}
