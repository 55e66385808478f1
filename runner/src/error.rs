//! Failure taxonomy for delegated runs.
//!
//! Every error carries an explicit [`FailureKind`]. The selector branches on
//! that discriminant rather than on error chains, so rewrapping an error can
//! never turn a quota failure into a fatal one by accident.

use std::time::Duration;

use thiserror::Error;

use crate::io::path::PathError;

/// Whether a failed attempt should fall through to the next candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Provider quota or rate limit exhausted; try the next candidate.
    Retryable,
    /// Anything else; abort the whole selection run.
    Fatal,
}

/// A runner reported exhausted usage quota.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{runner}: usage limit exceeded: {message}")]
pub struct UsageLimitExceeded {
    pub runner: String,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    UsageLimit(UsageLimitExceeded),

    /// Every eligible candidate hit its usage limit; carries the last one.
    #[error("all runners exhausted due to usage limits: {0}")]
    Exhausted(#[source] UsageLimitExceeded),

    #[error("no runner supports model {0:?}")]
    NoRunnerSupportsModel(String),

    #[error("no runner available")]
    NoRunnerAvailable,

    #[error("task is required")]
    EmptyTask,

    #[error("model {model:?} not supported by {runner} runner")]
    ModelNotSupported { runner: String, model: String },

    #[error("validate workdir: {0}")]
    InvalidWorkdir(#[from] PathError),

    #[error("{runner} process error: {source}")]
    Process {
        runner: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{runner} exec failed with status {status}; stderr: {stderr}")]
    ExecFailed {
        runner: String,
        status: String,
        stderr: String,
    },

    #[error("{runner} exec timed out after {timeout:?}")]
    TimedOut { runner: String, timeout: Duration },

    #[error("{runner} run cancelled")]
    Cancelled { runner: String },
}

impl RunError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::UsageLimit(_) => FailureKind::Retryable,
            _ => FailureKind::Fatal,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind() == FailureKind::Retryable
    }

    /// The quota failure behind this error, for a single attempt or after
    /// every candidate was exhausted.
    pub fn usage_limit(&self) -> Option<&UsageLimitExceeded> {
        match self {
            Self::UsageLimit(err) | Self::Exhausted(err) => Some(err),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

impl From<UsageLimitExceeded> for RunError {
    fn from(err: UsageLimitExceeded) -> Self {
        Self::UsageLimit(err)
    }
}
