//! The erased value-or-borrow handle.

use std::any::Any;
use std::fmt;

use rebind_ll::{Binding, Index, Qualifier, Strategies, DEFAULT_INLINE_CAPACITY};

/// Storage behind a `Ref`.
pub(crate) enum Slot<'a> {
    Empty,
    Stack(Box<dyn Any>),
    Heap(Box<dyn Any>),
    Read(&'a dyn Any),
    Write(&'a mut dyn Any),
}

/// A single erased value or borrow, tagged with its type and qualifier.
///
/// An owned `Ref` (`Stack`/`Heap`) is the unique owner of its payload and
/// drops it exactly once. A borrowed `Ref` (`Read`/`Write`) never drops and
/// cannot outlive `'a`. `Ref` is move-only.
///
/// # Example
///
/// ```rust
/// use rebind_core::Ref;
/// use rebind_ll::{Binding, Qualifier};
///
/// let mut x = 5_i64;
/// let r = Ref::write(&mut x);
/// assert_eq!(r.qualifier(), Some(Qualifier::Write));
/// assert!(r.binds_to::<i64>(Binding::Lvalue, true));
/// ```
pub struct Ref<'a> {
    index: Index,
    slot: Slot<'a>,
}

impl Ref<'static> {
    /// Take ownership of `value`.
    ///
    /// The placement is `Stack` when the value fits the default inline
    /// capacity, otherwise `Heap`.
    pub fn owned<T: 'static>(value: T) -> Self {
        let index = Index::of::<T>();
        let placement = (Strategies::STACK | Strategies::HEAP)
            .placement(index, DEFAULT_INLINE_CAPACITY)
            .unwrap_or(Qualifier::Heap);
        Self::from_box(index, Box::new(value), placement)
    }

    /// Take ownership of `value`, placed on the heap.
    pub fn heap<T: 'static>(value: T) -> Self {
        Self::from_box(Index::of::<T>(), Box::new(value), Qualifier::Heap)
    }

    /// Take ownership of an erased payload.
    ///
    /// `index` must describe the boxed value. A borrowed `placement` is
    /// treated as `Heap`.
    pub fn from_box(index: Index, value: Box<dyn Any>, placement: Qualifier) -> Self {
        debug_assert_eq!(Any::type_id(&*value), index.type_id());
        let slot = match placement {
            Qualifier::Stack => Slot::Stack(value),
            _ => Slot::Heap(value),
        };
        Ref { index, slot }
    }
}

impl<'a> Ref<'a> {
    /// A ref holding nothing.
    pub fn empty() -> Self {
        Ref {
            index: Index::void(),
            slot: Slot::Empty,
        }
    }

    /// Borrow `value` read-only.
    pub fn read<T: 'static>(value: &'a T) -> Self {
        Ref {
            index: Index::of::<T>(),
            slot: Slot::Read(value),
        }
    }

    /// Borrow `value` mutably.
    pub fn write<T: 'static>(value: &'a mut T) -> Self {
        Ref {
            index: Index::of::<T>(),
            slot: Slot::Write(value),
        }
    }

    /// Borrow an erased value read-only.
    pub fn from_any(index: Index, value: &'a dyn Any) -> Self {
        debug_assert_eq!(Any::type_id(value), index.type_id());
        Ref {
            index,
            slot: Slot::Read(value),
        }
    }

    /// Borrow an erased value mutably.
    pub fn from_any_mut(index: Index, value: &'a mut dyn Any) -> Self {
        debug_assert_eq!(Any::type_id(&*value), index.type_id());
        Ref {
            index,
            slot: Slot::Write(value),
        }
    }

    pub(crate) fn from_slot(index: Index, slot: Slot<'a>) -> Self {
        match slot {
            Slot::Empty => Self::empty(),
            slot => Ref { index, slot },
        }
    }

    pub(crate) fn into_slot(self) -> (Index, Slot<'a>) {
        (self.index, self.slot)
    }

    /// The type tag; `()` for an empty ref.
    pub fn index(&self) -> Index {
        self.index
    }

    /// Diagnostic name of the held type.
    pub fn name(&self) -> &'static str {
        self.index.name()
    }

    /// How the payload is held, or `None` for an empty ref.
    pub fn qualifier(&self) -> Option<Qualifier> {
        match self.slot {
            Slot::Empty => None,
            Slot::Stack(_) => Some(Qualifier::Stack),
            Slot::Heap(_) => Some(Qualifier::Heap),
            Slot::Read(_) => Some(Qualifier::Read),
            Slot::Write(_) => Some(Qualifier::Write),
        }
    }

    /// Check if the ref holds a value or a borrow.
    pub fn has_value(&self) -> bool {
        !matches!(self.slot, Slot::Empty)
    }

    /// Check if the ref owns its payload.
    pub fn is_owned(&self) -> bool {
        matches!(self.slot, Slot::Stack(_) | Slot::Heap(_))
    }

    /// Drop an owned payload and empty the ref.
    ///
    /// Borrowed refs are left untouched. Calling this twice is harmless.
    pub fn destroy_if_owned(&mut self) {
        if self.is_owned() {
            tracing::trace!(index = %self.index, "destroying owned payload");
            *self = Self::empty();
        }
    }

    /// Check whether this ref can be bound as a `T` parameter of category
    /// `binding`. `copyable` says whether `T` can be copied.
    pub fn binds_to<T: 'static>(&self, binding: Binding, copyable: bool) -> bool {
        self.binds_to_index(Index::of::<T>(), binding, copyable)
    }

    /// Erased form of `binds_to`.
    pub fn binds_to_index(&self, index: Index, binding: Binding, copyable: bool) -> bool {
        match self.qualifier() {
            Some(q) => self.index == index && binding.accepts(q, copyable),
            None => false,
        }
    }

    /// The payload as `&dyn Any`.
    pub fn as_any(&self) -> Option<&dyn Any> {
        match &self.slot {
            Slot::Empty => None,
            Slot::Stack(b) | Slot::Heap(b) => Some(&**b),
            Slot::Read(r) => Some(*r),
            Slot::Write(w) => Some(&**w),
        }
    }

    /// The payload as `&mut dyn Any`, if it may be mutated.
    pub fn as_any_mut(&mut self) -> Option<&mut dyn Any> {
        match &mut self.slot {
            Slot::Stack(b) | Slot::Heap(b) => Some(&mut **b),
            Slot::Write(w) => Some(&mut **w),
            Slot::Read(_) | Slot::Empty => None,
        }
    }

    /// Typed shared access.
    pub fn get<T: 'static>(&self) -> Option<&T> {
        self.as_any().and_then(|a| a.downcast_ref::<T>())
    }

    /// Typed mutable access, through an owned slot or a `Write` borrow.
    pub fn get_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.as_any_mut().and_then(|a| a.downcast_mut::<T>())
    }

    /// Move an owned `T` out, leaving the ref empty.
    ///
    /// Returns `None` (and leaves the ref alone) for borrows and for other
    /// types.
    pub fn take<T: 'static>(&mut self) -> Option<T> {
        if !self.index.equals::<T>() {
            return None;
        }
        match std::mem::replace(&mut self.slot, Slot::Empty) {
            Slot::Stack(b) => self.unbox(b, Qualifier::Stack),
            Slot::Heap(b) => self.unbox(b, Qualifier::Heap),
            other => {
                self.slot = other;
                None
            }
        }
    }

    fn unbox<T: 'static>(&mut self, b: Box<dyn Any>, placement: Qualifier) -> Option<T> {
        match b.downcast::<T>() {
            Ok(v) => {
                self.index = Index::void();
                Some(*v)
            }
            Err(b) => {
                self.slot = match placement {
                    Qualifier::Stack => Slot::Stack(b),
                    _ => Slot::Heap(b),
                };
                None
            }
        }
    }

    /// A `Read` view of this ref's payload.
    pub fn reborrow(&self) -> Ref<'_> {
        match self.as_any() {
            Some(a) => Ref {
                index: self.index,
                slot: Slot::Read(a),
            },
            None => Ref::empty(),
        }
    }

    /// A `Write` view when the payload may be mutated, otherwise a `Read`
    /// view.
    pub fn reborrow_mut(&mut self) -> Ref<'_> {
        let index = self.index;
        let slot = match &mut self.slot {
            Slot::Empty => Slot::Empty,
            Slot::Stack(b) | Slot::Heap(b) => Slot::Write(&mut **b),
            Slot::Write(w) => Slot::Write(&mut **w),
            Slot::Read(r) => Slot::Read(*r),
        };
        Ref::from_slot(index, slot)
    }

    /// The borrowed payload with the full borrow lifetime.
    ///
    /// A `Write` ref is downgraded to `Read` in place. Owned refs yield
    /// `None`.
    pub(crate) fn leak(&mut self) -> Option<&'a dyn Any> {
        match std::mem::replace(&mut self.slot, Slot::Empty) {
            Slot::Read(r) => {
                self.slot = Slot::Read(r);
                Some(r)
            }
            Slot::Write(w) => {
                let r: &'a dyn Any = w;
                self.slot = Slot::Read(r);
                Some(r)
            }
            other => {
                self.slot = other;
                None
            }
        }
    }

    /// The mutably borrowed payload with the full borrow lifetime.
    ///
    /// Only `Write` refs qualify; the ref is left empty.
    pub(crate) fn leak_mut(&mut self) -> Option<&'a mut dyn Any> {
        match std::mem::replace(&mut self.slot, Slot::Empty) {
            Slot::Write(w) => {
                self.index = Index::void();
                Some(w)
            }
            other => {
                self.slot = other;
                None
            }
        }
    }

    /// Split an owned ref into its parts. Borrows yield `None`.
    pub fn into_parts(self) -> Option<(Index, Qualifier, Box<dyn Any>)> {
        match self.slot {
            Slot::Stack(b) => Some((self.index, Qualifier::Stack, b)),
            Slot::Heap(b) => Some((self.index, Qualifier::Heap, b)),
            _ => None,
        }
    }

    /// Detach an owned (or empty) ref from the borrow lifetime.
    pub fn into_static(self) -> Result<Ref<'static>, Ref<'a>> {
        match self.slot {
            Slot::Empty => Ok(Ref::empty()),
            Slot::Stack(b) => Ok(Ref::from_box(self.index, b, Qualifier::Stack)),
            Slot::Heap(b) => Ok(Ref::from_box(self.index, b, Qualifier::Heap)),
            slot => Err(Ref {
                index: self.index,
                slot,
            }),
        }
    }
}

impl Default for Ref<'_> {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Ref<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ref")
            .field("index", &self.index)
            .field("qualifier", &self.qualifier())
            .finish()
    }
}
