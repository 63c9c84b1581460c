//! Ownership qualifiers, binding categories and tagged descriptors.

use std::fmt;

use crate::Index;

/// How an erased slot relates to its storage.
///
/// `Stack` and `Heap` own the value and must drop it on release. `Read` and
/// `Write` borrow someone else's storage and must never drop it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Qualifier {
    /// Owns the value, placed inline.
    Stack,
    /// Owns the value, placed on the heap.
    Heap,
    /// Borrows the value read-only.
    Read,
    /// Borrows the value mutably.
    Write,
}

impl Qualifier {
    /// Check if the slot owns its value.
    pub fn is_owned(self) -> bool {
        matches!(self, Qualifier::Stack | Qualifier::Heap)
    }

    /// Check if the slot borrows its value.
    pub fn is_borrowed(self) -> bool {
        !self.is_owned()
    }

    /// Check if the value may be mutated through the slot.
    pub fn is_mutable(self) -> bool {
        !matches!(self, Qualifier::Read)
    }

    /// Short lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Qualifier::Stack => "stack",
            Qualifier::Heap => "heap",
            Qualifier::Read => "read",
            Qualifier::Write => "write",
        }
    }
}

impl fmt::Display for Qualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The reference category a parameter asks for.
///
/// Used only while matching a supplied argument against a declared
/// parameter; orthogonal to ownership.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Binding {
    /// An owned value, moved out of an owned slot or copied from a borrow.
    Value,
    /// A shared reference.
    Const,
    /// A mutable reference.
    Lvalue,
    /// An owned value that is consumed; never copied.
    Rvalue,
}

impl Binding {
    /// Check whether a slot with qualifier `q` can satisfy this category.
    ///
    /// `copyable` says whether the slot's type can be copied, which lets a
    /// borrow satisfy a `Value` request.
    pub fn accepts(self, q: Qualifier, copyable: bool) -> bool {
        match self {
            Binding::Const => true,
            Binding::Lvalue => q == Qualifier::Write,
            Binding::Rvalue => q.is_owned(),
            Binding::Value => q.is_owned() || copyable,
        }
    }
}

/// An `Index` packed together with a small tag.
///
/// This is the descriptor stored next to every erased payload: what the
/// payload is, and how it is held.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Tagged<T> {
    index: Index,
    tag: T,
}

impl<T: Copy> Tagged<T> {
    /// Create a descriptor.
    pub fn new(index: Index, tag: T) -> Self {
        Self { index, tag }
    }

    /// The type tag.
    pub fn index(&self) -> Index {
        self.index
    }

    /// The small tag.
    pub fn tag(&self) -> T {
        self.tag
    }

    /// Same index, different tag.
    pub fn with_tag<U: Copy>(self, tag: U) -> Tagged<U> {
        Tagged {
            index: self.index,
            tag,
        }
    }
}

impl<T: fmt::Display> fmt::Display for Tagged<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.index, self.tag)
    }
}
