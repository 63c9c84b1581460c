//! Domain errors raised by callees.

use std::fmt;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

enum Repr {
    Error(BoxError),
    OutOfMemory,
}

/// An error raised by a callee or a conversion, carried across the erasure
/// boundary unchanged.
///
/// The message of the wrapped error is displayed verbatim, so whoever finally
/// re-raises it shows exactly what the callee said.
pub struct Exception {
    repr: Repr,
}

impl Exception {
    /// Wrap any error.
    pub fn new<E>(error: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self {
            repr: Repr::Error(error.into()),
        }
    }

    /// An exception carrying just a message.
    pub fn msg(message: impl Into<String>) -> Self {
        Self::new(message.into())
    }

    /// The allocation-failure marker.
    pub fn out_of_memory() -> Self {
        Self {
            repr: Repr::OutOfMemory,
        }
    }

    /// Check if this reports an allocation failure.
    pub fn is_out_of_memory(&self) -> bool {
        matches!(self.repr, Repr::OutOfMemory)
    }

    /// Try to view the wrapped error as a concrete type.
    pub fn downcast_ref<E: std::error::Error + 'static>(&self) -> Option<&E> {
        match &self.repr {
            Repr::Error(e) => e.downcast_ref::<E>(),
            Repr::OutOfMemory => None,
        }
    }

    /// The wrapped error, if this is not an allocation failure.
    pub fn into_inner(self) -> Option<BoxError> {
        match self.repr {
            Repr::Error(e) => Some(e),
            Repr::OutOfMemory => None,
        }
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.repr {
            Repr::Error(e) => write!(f, "{}", e),
            Repr::OutOfMemory => write!(f, "out of memory"),
        }
    }
}

impl fmt::Debug for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.repr {
            Repr::Error(e) => f.debug_tuple("Exception").field(e).finish(),
            Repr::OutOfMemory => f.write_str("Exception(OutOfMemory)"),
        }
    }
}

impl std::error::Error for Exception {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.repr {
            Repr::Error(e) => e.source(),
            Repr::OutOfMemory => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Overdrawn(u32);

    impl fmt::Display for Overdrawn {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "account overdrawn by {}", self.0)
        }
    }

    impl std::error::Error for Overdrawn {}

    #[test]
    fn message_is_verbatim() {
        let e = Exception::msg("bad input: 7");
        assert_eq!(e.to_string(), "bad input: 7");
        assert!(!e.is_out_of_memory());
    }

    #[test]
    fn wraps_concrete_errors() {
        let e = Exception::new(Overdrawn(12));
        assert_eq!(e.to_string(), "account overdrawn by 12");
        assert_eq!(e.downcast_ref::<Overdrawn>().map(|o| o.0), Some(12));
        let inner = e.into_inner().unwrap();
        assert_eq!(inner.to_string(), "account overdrawn by 12");
    }

    #[test]
    fn out_of_memory_marker() {
        let e = Exception::out_of_memory();
        assert!(e.is_out_of_memory());
        assert_eq!(e.to_string(), "out of memory");
        assert!(e.downcast_ref::<Overdrawn>().is_none());
        assert!(e.into_inner().is_none());
    }
}
