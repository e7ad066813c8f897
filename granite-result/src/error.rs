use std::fmt;

use thiserror::Error;

/// Unified error type for all granite operations.
///
/// The engine distinguishes exactly two failure modes:
///
/// - [`Error::ContractViolation`]: the caller passed an invalid argument or
///   invoked an operation outside its legal lifecycle state (scheduling a task
///   twice, joining an unscheduled task, referencing a column id outside a
///   table's schema). These are always checked, always fatal to the operation
///   and never silently recovered.
/// - [`Error::Unsupported`]: a predicate/encoding/type combination has no
///   implemented evaluation path. The offending combination is named in the
///   message; the engine never guesses around it.
///
/// `Error` is `Send + Sync` so scan tasks can hand failures back across worker
/// threads.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Caller bug: illegal argument or lifecycle-state violation.
    ///
    /// Carries the name of the violated operation plus enough detail to
    /// diagnose the offending identifier or state.
    #[error("contract violation in `{operation}`: {message}")]
    ContractViolation {
        operation: &'static str,
        message: String,
    },

    /// No evaluation path exists for the requested combination.
    #[error("unsupported operation: {0}")]
    Unsupported(String),
}

impl Error {
    /// Create a contract violation for `operation` from any displayable detail.
    #[inline]
    pub fn contract_violation<M: fmt::Display>(operation: &'static str, message: M) -> Self {
        Error::ContractViolation {
            operation,
            message: message.to_string(),
        }
    }

    /// Create an unsupported-operation error from any displayable detail.
    #[inline]
    pub fn unsupported<M: fmt::Display>(message: M) -> Self {
        Error::Unsupported(message.to_string())
    }
}
