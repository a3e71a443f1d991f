//! Error types for the mock core.
//!
//! Every error is reported at the point of the offending call. Only
//! `VerificationMismatch` is an expected test-failure signal; the other
//! variants indicate misuse of the core.

use crate::verify::Mismatch;
use mimic_proto::{CallKind, TargetId, TypeTag};
use std::path::PathBuf;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, MockError>;

/// An error raised by a `Throw` answer, standing in for the exception a
/// real implementation would have thrown.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct StubbedError {
    pub kind: String,
    pub message: String,
}

impl StubbedError {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }
}

/// Errors produced by mocks, stubs, matchers, verification and intercepts.
#[derive(Debug, thiserror::Error)]
pub enum MockError {
    /// Strict mock called without a matching stub.
    #[error("no stub matches {type_name}.{method} on {target} (strict mock)")]
    UnstubbedCall {
        target: TargetId,
        type_name: String,
        method: String,
    },

    /// The capability set does not declare this member.
    #[error("{type_name} declares no member '{method}'")]
    UnknownMethod { type_name: String, method: String },

    /// Matcher list or argument list length differs from the declared arity.
    #[error("{method} takes {expected} argument(s) but {actual} were given")]
    ArityMismatch {
        method: String,
        expected: usize,
        actual: usize,
    },

    /// A predicate matcher failed or panicked while being evaluated.
    #[error("matcher #{position} of {method} could not be evaluated: {message}")]
    MatcherEvaluation {
        method: String,
        position: usize,
        message: String,
    },

    /// Attempt to stub or verify a property of an inline value wrapper.
    #[error("'{member}' of {type_name} cannot be stubbed or verified: inline value wrappers have no mockable members")]
    UnsupportedTarget { type_name: String, member: String },

    /// Actual call count did not satisfy the expectation.
    #[error("{0}")]
    VerificationMismatch(Box<Mismatch>),

    /// A capture slot was read before anything was captured into it.
    #[error("capture slot '{slot}' is empty")]
    CaptureEmpty { slot: String },

    /// Effect of a `Throw` answer.
    #[error("{method} raised {error}")]
    Raised { method: String, error: StubbedError },

    /// A member was entered through the wrong entry point.
    #[error("{method} is declared {declared} but was invoked as {used}")]
    CallKindMismatch {
        method: String,
        declared: CallKind,
        used: CallKind,
    },

    /// A configured or computed answer does not fit the declared return type.
    #[error("{method} returns {expected}, answer provides {found}")]
    IncompatibleAnswer {
        method: String,
        expected: TypeTag,
        found: String,
    },

    /// No capability set is declared for a type a deep stub needs to mock.
    #[error("no capability set declared for type '{type_name}'")]
    UndeclaredType { type_name: String },

    /// The registry has no target with this identity.
    #[error("{0} is not tracked by this registry")]
    UnknownTarget(TargetId),

    /// A process-wide intercept is already installed for this key.
    #[error("{key} is already intercepted")]
    AlreadyIntercepted { key: String },

    #[error("failed to read config {path:?}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    #[error("invalid config value for {key}: {message}")]
    ConfigValue { key: String, message: String },
}

impl MockError {
    /// Returns true for the normal test-failure signal.
    pub fn is_verification_failure(&self) -> bool {
        matches!(self, MockError::VerificationMismatch(_))
    }

    /// Returns the mismatch report if this is a verification failure.
    pub fn mismatch(&self) -> Option<&Mismatch> {
        match self {
            MockError::VerificationMismatch(m) => Some(m),
            _ => None,
        }
    }
}
