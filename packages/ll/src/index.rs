//! The type tag.

use std::any::TypeId;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Process-wide identity of a concrete type.
///
/// An `Index` stamps what an erased slot actually holds. Two indices are
/// equal exactly when they were made from the same type; the name and
/// layout are carried along for diagnostics and placement decisions.
///
/// Indices are small `Copy` handles around the type's identity. They are
/// never registered or deregistered; any `'static` type has one for the
/// lifetime of the process.
#[derive(Clone, Copy)]
pub struct Index {
    id: TypeId,
    name: &'static str,
    size: usize,
    align: usize,
    needs_drop: bool,
}

impl Index {
    /// The index of `T`.
    pub fn of<T: 'static>() -> Self {
        Index {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
            size: std::mem::size_of::<T>(),
            align: std::mem::align_of::<T>(),
            needs_drop: std::mem::needs_drop::<T>(),
        }
    }

    /// The index of `()`, used for calls that produce nothing.
    pub fn void() -> Self {
        Self::of::<()>()
    }

    /// Check identity against a compile-time type.
    pub fn equals<T: 'static>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }

    /// Check whether this is the index of `()`.
    pub fn is_void(&self) -> bool {
        self.equals::<()>()
    }

    /// The underlying type identity.
    pub fn type_id(&self) -> TypeId {
        self.id
    }

    /// Diagnostic name of the type.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Size of the type in bytes.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Alignment of the type in bytes.
    pub fn align(&self) -> usize {
        self.align
    }

    /// Whether dropping a value of the type runs any code.
    pub fn needs_drop(&self) -> bool {
        self.needs_drop
    }
}

impl PartialEq for Index {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Index {}

impl Hash for Index {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

// Names first so that sorted listings read well; identity breaks ties.
impl Ord for Index {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name
            .cmp(other.name)
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl PartialOrd for Index {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Debug for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Index").field(&self.name).finish()
    }
}

impl fmt::Display for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}
