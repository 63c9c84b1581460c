//! Storage strategies a write destination accepts.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use crate::{Index, Qualifier};

/// Default inline capacity of a destination, in bytes.
pub const DEFAULT_INLINE_CAPACITY: usize = 3 * std::mem::size_of::<usize>();

/// Largest alignment inline placement supports.
pub const INLINE_ALIGN: usize = std::mem::align_of::<usize>();

/// A bitset of accepted placement strategies.
///
/// Like `Format` in a store, the named strategies are associated constants;
/// combine them with `|`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Strategies(u8);

impl Strategies {
    /// Accept nothing.
    pub const NONE: Strategies = Strategies(0);
    /// Accept inline placement of any type that fits.
    pub const STACK: Strategies = Strategies(1);
    /// Accept heap placement.
    pub const HEAP: Strategies = Strategies(2);
    /// Accept a live shared reference.
    pub const READ: Strategies = Strategies(4);
    /// Accept a live mutable reference.
    pub const WRITE: Strategies = Strategies(8);
    /// Accept inline placement only for types without drop glue.
    pub const TRIVIAL: Strategies = Strategies(16);

    /// Every strategy.
    pub const ALL: Strategies = Strategies(31);

    /// Raw bits.
    pub fn bits(self) -> u8 {
        self.0
    }

    /// Check whether every bit of `other` is set.
    pub fn contains(self, other: Strategies) -> bool {
        self.0 & other.0 == other.0
    }

    /// Check whether any bit of `other` is set.
    pub fn intersects(self, other: Strategies) -> bool {
        self.0 & other.0 != 0
    }

    /// Check whether no bit is set.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Where an owned value of type `index` would land, if anywhere.
    ///
    /// Inline placement needs the value to fit in `capacity` with an
    /// alignment of at most `INLINE_ALIGN`, and either `STACK` or (for types
    /// without drop glue) `TRIVIAL`. Otherwise `HEAP` is the fallback.
    pub fn placement(self, index: Index, capacity: usize) -> Option<Qualifier> {
        let fits = index.size() <= capacity && index.align() <= INLINE_ALIGN;
        let inline = self.contains(Self::STACK)
            || (self.contains(Self::TRIVIAL) && !index.needs_drop());
        if fits && inline {
            Some(Qualifier::Stack)
        } else if self.contains(Self::HEAP) {
            Some(Qualifier::Heap)
        } else {
            None
        }
    }

    /// The qualifier a live reference of mutability `q` would land as.
    ///
    /// A mutable reference satisfies a shared request, so a `Write` offered
    /// to a destination that accepts only `READ` lands as `Read`.
    pub fn reference(self, q: Qualifier) -> Option<Qualifier> {
        match q {
            Qualifier::Write if self.contains(Self::WRITE) => Some(Qualifier::Write),
            Qualifier::Write | Qualifier::Read if self.contains(Self::READ) => {
                Some(Qualifier::Read)
            }
            _ => None,
        }
    }

    /// Check whether any kind of reference is accepted.
    pub fn accepts_references(self) -> bool {
        self.intersects(Self::READ | Self::WRITE)
    }
}

impl BitOr for Strategies {
    type Output = Strategies;

    fn bitor(self, rhs: Strategies) -> Strategies {
        Strategies(self.0 | rhs.0)
    }
}

impl BitOrAssign for Strategies {
    fn bitor_assign(&mut self, rhs: Strategies) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for Strategies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = [
            (Self::STACK, "STACK"),
            (Self::HEAP, "HEAP"),
            (Self::READ, "READ"),
            (Self::WRITE, "WRITE"),
            (Self::TRIVIAL, "TRIVIAL"),
        ];
        let set: Vec<&str> = names
            .iter()
            .filter(|(bit, _)| self.contains(*bit))
            .map(|(_, name)| *name)
            .collect();
        if set.is_empty() {
            write!(f, "Strategies(NONE)")
        } else {
            write!(f, "Strategies({})", set.join(" | "))
        }
    }
}
