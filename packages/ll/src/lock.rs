//! The single-writer/multi-reader borrow counter.

use std::num::NonZeroUsize;

use crate::LLError;

/// Kind of borrow requested from a lock.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LockKind {
    /// A shared borrow.
    Read,
    /// An exclusive borrow.
    Write,
}

impl LockKind {
    /// Parse a mode character: `'w'` is a write, anything else a read.
    pub fn from_mode(c: char) -> Self {
        if c == 'w' {
            LockKind::Write
        } else {
            LockKind::Read
        }
    }
}

/// Borrow state of an erased object.
///
/// Three zones only: no outstanding borrows, `n >= 1` shared borrows, or
/// exactly one exclusive borrow. Transitions never block; a conflicting
/// request is reported immediately.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum LockState {
    /// No outstanding borrows.
    #[default]
    Free,
    /// That many shared borrows.
    Reading(NonZeroUsize),
    /// One exclusive borrow.
    Writing,
}

impl LockState {
    /// The state after granting a borrow of `kind`.
    pub fn begin(self, kind: LockKind) -> Result<LockState, LLError> {
        match (self, kind) {
            (LockState::Writing, _) => Err(LLError::Mutating),
            (LockState::Free, LockKind::Write) => Ok(LockState::Writing),
            (LockState::Free, LockKind::Read) => Ok(LockState::Reading(NonZeroUsize::MIN)),
            (LockState::Reading(n), LockKind::Read) => n
                .checked_add(1)
                .map(LockState::Reading)
                .ok_or(LLError::ResourceExhausted),
            (LockState::Reading(_), LockKind::Write) => Err(LLError::Referenced),
        }
    }

    /// The state after releasing one borrow.
    pub fn end(self) -> Result<LockState, LLError> {
        match self {
            LockState::Free => Err(LLError::Unbalanced),
            LockState::Writing => Ok(LockState::Free),
            LockState::Reading(n) => Ok(NonZeroUsize::new(n.get() - 1)
                .map(LockState::Reading)
                .unwrap_or(LockState::Free)),
        }
    }

    /// Number of outstanding borrows, with `-1` meaning one exclusive borrow.
    pub fn count(self) -> isize {
        match self {
            LockState::Free => 0,
            LockState::Reading(n) => isize::try_from(n.get()).unwrap_or(isize::MAX),
            LockState::Writing => -1,
        }
    }

    /// Check if there are no outstanding borrows.
    pub fn is_free(self) -> bool {
        self == LockState::Free
    }
}
