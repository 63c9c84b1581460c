//! Out-parameter descriptors for erased results.

use std::any::Any;

use rebind_ll::{Index, Qualifier, Strategies, DEFAULT_INLINE_CAPACITY};

use crate::exception::Exception;
use crate::reference::{Ref, Slot};

/// Where an erased result should be written, and in which shapes.
///
/// A `Target` names the type it wants (or any type), an inline capacity and
/// the placement strategies it accepts. It owns nothing until a write
/// succeeds; afterwards `landed()` says how the written value is held.
///
/// # Example
///
/// ```rust
/// use rebind_core::Target;
/// use rebind_ll::{Qualifier, Strategies};
///
/// let mut t = Target::of::<f64>();
/// assert!(t.set_if(4.0_f64));
/// assert_eq!(t.landed(), Some(Qualifier::Stack));
/// assert_eq!(t.take_value::<f64>(), Some(4.0));
///
/// let mut refs_only = Target::any(Strategies::READ);
/// assert!(!refs_only.set_if(1_u8));
/// ```
#[derive(Debug)]
pub struct Target<'a> {
    index: Option<Index>,
    capacity: usize,
    strategies: Strategies,
    output: Ref<'a>,
    exception: Option<Exception>,
}

impl<'a> Target<'a> {
    /// A target for `index` (or any type when `None`).
    pub fn new(index: Option<Index>, capacity: usize, strategies: Strategies) -> Self {
        Self {
            index,
            capacity,
            strategies,
            output: Ref::empty(),
            exception: None,
        }
    }

    /// A target requesting an owned `T`.
    pub fn of<T: 'static>() -> Self {
        Self::new(
            Some(Index::of::<T>()),
            DEFAULT_INLINE_CAPACITY,
            Strategies::STACK | Strategies::HEAP,
        )
    }

    /// A target accepting any type in the given shapes.
    pub fn any(strategies: Strategies) -> Self {
        Self::new(None, DEFAULT_INLINE_CAPACITY, strategies)
    }

    /// A target for calls whose result is discarded.
    pub fn none() -> Self {
        Self::new(Some(Index::void()), 0, Strategies::NONE)
    }

    /// The requested type, `None` meaning any.
    pub fn index(&self) -> Option<Index> {
        self.index
    }

    /// Inline capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Accepted strategies.
    pub fn strategies(&self) -> Strategies {
        self.strategies
    }

    /// Check if the result is to be discarded.
    pub fn is_void(&self) -> bool {
        self.index.is_some_and(|i| i.is_void())
    }

    /// Diagnostic name of the requested type.
    pub fn name(&self) -> &'static str {
        self.index.map_or("<any>", |i| i.name())
    }

    /// Check if a value of type `index` is what this target asks for.
    pub fn wants(&self, index: Index) -> bool {
        self.index.map_or(true, |i| i == index)
    }

    /// Where an owned value of type `index` would land.
    pub fn placement_for(&self, index: Index) -> Option<Qualifier> {
        if !self.wants(index) {
            return None;
        }
        self.strategies.placement(index, self.capacity)
    }

    /// Check if an owned `T` can be written.
    pub fn accepts<T: 'static>(&self) -> bool {
        self.accepts_index(Index::of::<T>())
    }

    /// Erased form of `accepts`.
    pub fn accepts_index(&self, index: Index) -> bool {
        self.placement_for(index).is_some()
    }

    /// Where a live reference of type `index` and mutability `q` would land.
    pub fn reference_for(&self, index: Index, q: Qualifier) -> Option<Qualifier> {
        if !self.wants(index) {
            return None;
        }
        self.strategies.reference(q)
    }

    /// Construct and write a `T` if the target accepts one.
    ///
    /// `make` runs only when the write will succeed.
    pub fn emplace_if<T: 'static, F: FnOnce() -> T>(&mut self, make: F) -> bool {
        let index = Index::of::<T>();
        match self.placement_for(index) {
            Some(placement) => {
                tracing::trace!(%index, %placement, "emplacing into target");
                self.output = Ref::from_box(index, Box::new(make()), placement);
                true
            }
            None => false,
        }
    }

    /// Write `value` if the target accepts it.
    pub fn set_if<T: 'static>(&mut self, value: T) -> bool {
        self.emplace_if(move || value)
    }

    /// Write an erased owned value, handing it back if refused.
    pub fn set_boxed(
        &mut self,
        index: Index,
        value: Box<dyn Any>,
    ) -> Result<Qualifier, Box<dyn Any>> {
        match self.placement_for(index) {
            Some(placement) => {
                tracing::trace!(%index, %placement, "moving into target");
                self.output = Ref::from_box(index, value, placement);
                Ok(placement)
            }
            None => Err(value),
        }
    }

    /// Record a live shared reference.
    pub fn set_read<T: 'static>(&mut self, value: &'a T) -> bool {
        self.set_ref(Ref::read(value)).is_ok()
    }

    /// Record a live mutable reference.
    ///
    /// A target that accepts only shared references records it as `Read`.
    pub fn set_write<T: 'static>(&mut self, value: &'a mut T) -> bool {
        self.set_ref(Ref::write(value)).is_ok()
    }

    /// Write an erased ref as-is: owned refs are moved, borrows forwarded.
    ///
    /// The ref is handed back untouched when the target refuses its shape.
    pub fn set_ref(&mut self, r: Ref<'a>) -> Result<Qualifier, Ref<'a>> {
        let (index, slot) = r.into_slot();
        match slot {
            Slot::Empty => Err(Ref::empty()),
            Slot::Stack(b) | Slot::Heap(b) => self
                .set_boxed(index, b)
                .map_err(|b| Ref::from_box(index, b, Qualifier::Heap)),
            Slot::Read(r) => match self.reference_for(index, Qualifier::Read) {
                Some(q) => {
                    tracing::trace!(%index, "forwarding shared reference");
                    self.output = Ref::from_slot(index, Slot::Read(r));
                    Ok(q)
                }
                None => Err(Ref::from_slot(index, Slot::Read(r))),
            },
            Slot::Write(w) => match self.reference_for(index, Qualifier::Write) {
                Some(Qualifier::Write) => {
                    tracing::trace!(%index, "forwarding mutable reference");
                    self.output = Ref::from_slot(index, Slot::Write(w));
                    Ok(Qualifier::Write)
                }
                Some(q) => {
                    tracing::trace!(%index, "forwarding mutable reference as shared");
                    self.output = Ref::from_slot(index, Slot::Read(w));
                    Ok(q)
                }
                None => Err(Ref::from_slot(index, Slot::Write(w))),
            },
        }
    }

    /// How the written value is held, if anything was written.
    pub fn landed(&self) -> Option<Qualifier> {
        self.output.qualifier()
    }

    /// Check if a value or reference was written.
    pub fn has_value(&self) -> bool {
        self.output.has_value()
    }

    /// The written value, typed.
    pub fn get<T: 'static>(&self) -> Option<&T> {
        self.output.get::<T>()
    }

    /// The written value or reference, leaving the target empty.
    pub fn take(&mut self) -> Ref<'a> {
        std::mem::take(&mut self.output)
    }

    /// Move the written value out as a `T`.
    pub fn take_value<T: 'static>(&mut self) -> Option<T> {
        self.output.take::<T>()
    }

    /// The written value or reference.
    pub fn into_ref(self) -> Ref<'a> {
        self.output
    }

    /// Drop whatever was written.
    pub fn clear(&mut self) {
        self.output = Ref::empty();
    }

    /// Stash an exception raised while producing the value.
    pub fn set_exception(&mut self, exception: Exception) {
        self.exception = Some(exception);
    }

    /// The stashed exception, if any.
    pub fn exception(&self) -> Option<&Exception> {
        self.exception.as_ref()
    }

    /// Retrieve and clear the stashed exception.
    pub fn take_exception(&mut self) -> Option<Exception> {
        self.exception.take()
    }
}
