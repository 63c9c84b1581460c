//! Error types for the Core layer.

use rebind_ll::{LLError, Status};

use crate::exception::Exception;
use crate::target::Target;

/// Errors at the Core layer.
///
/// Shape mismatches are reported as `Status` values by the dispatch and
/// conversion entry points; they only become errors here, once a typed
/// helper decides they are fatal for its caller.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No overload accepts the supplied self.
    #[error("no overload of {name} accepts this self")]
    Impossible { name: &'static str },

    /// The argument count matches no overload.
    #[error("wrong number of arguments ({given}) for {name}")]
    WrongNumber { name: &'static str, given: usize },

    /// An argument did not bind to any overload.
    #[error("wrong argument type for {name}")]
    WrongType { name: &'static str },

    /// The result could not be written in the requested shape.
    #[error("cannot return result as {expected}")]
    WrongReturn { expected: &'static str },

    /// The callee raised a domain error; displayed verbatim.
    #[error(transparent)]
    Exception(#[from] Exception),

    /// An allocation failed.
    #[error("out of memory")]
    OutOfMemory,

    /// A registration references a type that was never registered.
    #[error("type {name} is not registered")]
    Unregistered { name: &'static str },

    /// An overload declaration is malformed.
    #[error("invalid overload for {name}: {message}")]
    InvalidOverload { name: &'static str, message: String },

    /// Configuration could not be read.
    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),

    /// An I/O error occurred.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from the LL layer.
    #[error("ll error: {0}")]
    Ll(#[from] LLError),

    /// A status combination that cannot happen.
    #[error("internal consistency violation: {0}")]
    Internal(String),
}

impl Error {
    /// Turn a non-success call status into an error.
    ///
    /// `name` identifies the self type, `given` the argument count. An
    /// `Exception` status pulls the stashed exception off the target.
    pub fn from_status(
        status: Status,
        target: &mut Target<'_>,
        name: &'static str,
        given: usize,
    ) -> Self {
        match status {
            Status::Impossible => Error::Impossible { name },
            Status::WrongNumber => Error::WrongNumber { name, given },
            Status::WrongType => Error::WrongType { name },
            Status::WrongReturn => Error::WrongReturn {
                expected: target.name(),
            },
            Status::Exception => match target.take_exception() {
                Some(e) => Error::Exception(e),
                None => Error::Internal("exception status without a stashed exception".into()),
            },
            Status::OutOfMemory => Error::OutOfMemory,
            Status::None | Status::Stack | Status::Read | Status::Write | Status::Heap => {
                Error::Internal(format!("status {} is not an error", status))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as StdError;

    #[test]
    fn mismatch_display() {
        let e = Error::WrongNumber {
            name: "i64",
            given: 3,
        };
        assert!(e.to_string().contains("wrong number of arguments (3)"));
        let e = Error::Unregistered { name: "Point" };
        assert_eq!(e.to_string(), "type Point is not registered");
    }

    #[test]
    fn exception_is_transparent() {
        let e: Error = Exception::msg("division by zero").into();
        assert_eq!(e.to_string(), "division by zero");
    }

    #[test]
    fn from_status_takes_stashed_exception() {
        let mut t = Target::of::<i64>();
        t.set_exception(Exception::msg("nope"));
        let e = Error::from_status(Status::Exception, &mut t, "f", 0);
        assert_eq!(e.to_string(), "nope");
        assert!(t.exception().is_none());

        let e = Error::from_status(Status::Exception, &mut t, "f", 0);
        assert!(matches!(e, Error::Internal(_)));
    }

    #[test]
    fn from_status_maps_shapes() {
        let mut t = Target::of::<f64>();
        assert!(matches!(
            Error::from_status(Status::WrongType, &mut t, "f", 1),
            Error::WrongType { .. }
        ));
        let e = Error::from_status(Status::WrongReturn, &mut t, "f", 1);
        assert!(e.to_string().contains("f64"));
        assert!(matches!(
            Error::from_status(Status::Stack, &mut t, "f", 1),
            Error::Internal(_)
        ));
    }

    #[test]
    fn ll_error_source() {
        let e: Error = LLError::Mutating.into();
        assert!(StdError::source(&e).is_some());
        assert!(e.to_string().starts_with("ll error"));
    }
}
