// abc-core/src/error.rs
//
// Crate-wide error type. Most failures originate in one of the two
// layers below and are carried through unchanged; the remaining
// variants cover concerns that cut across both.

use thiserror::Error;

use crate::domain::error::DomainError;
use crate::infrastructure::error::{DecodeError, InfrastructureError};

#[derive(Error, Debug)]
pub enum AbcError {
    /// Template semantics: validation, input resolution, rules,
    /// variable lookup.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Machinery: filesystem, YAML decoding, the template engine,
    /// external processes.
    #[error(transparent)]
    Infrastructure(#[from] InfrastructureError),

    /// A template- or flag-supplied path tried to escape its confining
    /// directory (absolute, or containing `..`).
    #[error("unsafe path traversal detected: {0}")]
    UnsafePath(String),

    /// Combined report of every failing golden test case; the command
    /// exits non-zero after all cases have run.
    #[error("golden test failures:\n{0}")]
    GoldenTestMismatch(String),

    /// A bug in this tool, not in the user's template.
    #[error("internal error: {0}")]
    InternalError(String),
}

// `?` shortcuts for error types two hops away.

impl From<std::io::Error> for AbcError {
    fn from(err: std::io::Error) -> Self {
        InfrastructureError::Io(err).into()
    }
}

impl From<DecodeError> for AbcError {
    fn from(err: DecodeError) -> Self {
        InfrastructureError::Decode(err).into()
    }
}
