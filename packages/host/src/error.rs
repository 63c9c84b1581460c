//! Error types for the host layer.

use rebind_core::{Error, Exception, LLError, Status, Target};

/// What a host sees when a call or a borrow fails.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// Wrong arity, argument type, self or result shape.
    #[error("{0}")]
    Type(String),

    /// The object is locked by an outstanding borrow.
    #[error("{0}")]
    Busy(LLError),

    /// The callee raised; displayed verbatim.
    #[error(transparent)]
    Exception(Exception),

    /// An allocation failed.
    #[error("out of memory")]
    OutOfMemory,

    /// Registration or configuration failed.
    #[error("registry error: {0}")]
    Registry(Error),

    /// A status combination that cannot happen.
    #[error("internal consistency violation: {0}")]
    Internal(String),
}

impl HostError {
    /// Turn a non-success call status into a host error.
    pub fn from_status(
        status: Status,
        target: &mut Target<'_>,
        name: &'static str,
        given: usize,
    ) -> Self {
        Error::from_status(status, target, name, given).into()
    }

    pub fn is_busy(&self) -> bool {
        matches!(self, HostError::Busy(_))
    }
}

impl From<LLError> for HostError {
    fn from(e: LLError) -> Self {
        match e {
            LLError::Mutating | LLError::Referenced | LLError::ResourceExhausted => {
                HostError::Busy(e)
            }
            LLError::Unbalanced => HostError::Internal(e.to_string()),
        }
    }
}

impl From<Error> for HostError {
    fn from(e: Error) -> Self {
        match e {
            Error::Impossible { .. }
            | Error::WrongNumber { .. }
            | Error::WrongType { .. }
            | Error::WrongReturn { .. } => HostError::Type(e.to_string()),
            Error::Exception(e) => HostError::Exception(e),
            Error::OutOfMemory => HostError::OutOfMemory,
            Error::Ll(e) => e.into(),
            Error::Internal(message) => HostError::Internal(message),
            e @ (Error::Unregistered { .. }
            | Error::InvalidOverload { .. }
            | Error::Config(_)
            | Error::Io(_)) => HostError::Registry(e),
        }
    }
}

impl From<Exception> for HostError {
    fn from(e: Exception) -> Self {
        if e.is_out_of_memory() {
            HostError::OutOfMemory
        } else {
            HostError::Exception(e)
        }
    }
}
