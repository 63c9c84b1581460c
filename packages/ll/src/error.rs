//! Error types for the LL layer.
//!
//! Errors at this level are lock-discipline violations only. Shape
//! mismatches are statuses, and domain errors belong in higher layers.

/// Errors at the LL (low-level) layer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LLError {
    /// A borrow was requested while a mutable borrow is outstanding.
    #[error("cannot reference object which is being mutated")]
    Mutating,

    /// A mutable borrow was requested while shared borrows are outstanding.
    #[error("cannot mutate object which is already referenced")]
    Referenced,

    /// A release happened without a matching acquisition.
    #[error("lock released without a matching acquisition")]
    Unbalanced,

    /// The shared borrow count overflowed.
    #[error("too many outstanding references")]
    ResourceExhausted,
}
