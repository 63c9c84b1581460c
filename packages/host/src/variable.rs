//! Host-visible containers for one erased value, with a borrow lock.

use std::any::Any;
use std::cell::{self, Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use rebind_core::{Index, LockKind, LockState, Qualifier, Ref, Registry, Tagged};

use crate::error::HostError;
use crate::projection::Projection;

/// Ownership state of a `Variable`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VariableState {
    Empty,
    Stack,
    StackAlias,
    Heap,
    HeapAlias,
}

impl VariableState {
    fn of(placement: Qualifier, alias: bool) -> Self {
        match (placement, alias) {
            (Qualifier::Stack, false) => VariableState::Stack,
            (Qualifier::Stack, true) => VariableState::StackAlias,
            (_, false) => VariableState::Heap,
            (_, true) => VariableState::HeapAlias,
        }
    }
}

enum Shape {
    Empty,
    Owned {
        index: Index,
        placement: Qualifier,
    },
    View {
        index: Index,
        placement: Qualifier,
        projection: Projection,
    },
}

/// One erased value, owned or viewed through a root.
///
/// A `Variable` either owns its payload or is a view of part of another
/// variable's payload. Views are created with `Variable::view` and share
/// the root's lock, so a root and all of its views are governed together.
/// Borrows are checked when they are taken and never wait.
///
/// # Example
///
/// ```rust
/// use rebind_host::Variable;
/// use rebind_ll::LockKind;
///
/// let v = Variable::owned(5_i64);
/// let a = v.acquire(LockKind::Read).unwrap();
/// let b = v.acquire(LockKind::Read).unwrap();
/// assert_eq!(v.use_count(), 2);
/// assert!(v.acquire(LockKind::Write).is_err());
/// drop((a, b));
/// assert!(v.acquire(LockKind::Write).is_ok());
/// ```
pub struct Variable {
    root: Option<Rc<Variable>>,
    lock: Cell<LockState>,
    shape: RefCell<Shape>,
    // Only `Acquired` guards hold a borrow of this, and only once the lock
    // has granted them; `shape` is never borrowed across calls.
    payload: RefCell<Payload>,
}

type Payload = Option<Box<dyn Any>>;

fn project<'s>(payload: &'s Payload, projection: Option<&Projection>) -> Option<&'s dyn Any> {
    let value = payload.as_deref()?;
    match projection {
        Some(p) => p.get(value),
        None => Some(value),
    }
}

fn project_mut<'s>(
    payload: &'s mut Payload,
    projection: Option<&Projection>,
) -> Option<&'s mut dyn Any> {
    let value = payload.as_deref_mut()?;
    match projection {
        Some(p) => p.get_mut(value),
        None => Some(value),
    }
}

impl Variable {
    /// An empty variable.
    pub fn new() -> Self {
        Self {
            root: None,
            lock: Cell::new(LockState::Free),
            shape: RefCell::new(Shape::Empty),
            payload: RefCell::new(None),
        }
    }

    /// A variable owning `value`.
    pub fn owned<T: 'static>(value: T) -> Self {
        let (index, placement, value) = match Ref::owned(value).into_parts() {
            Some(parts) => parts,
            None => return Self::new(),
        };
        Self {
            root: None,
            lock: Cell::new(LockState::Free),
            shape: RefCell::new(Shape::Owned { index, placement }),
            payload: RefCell::new(Some(value)),
        }
    }

    /// A variable taking over an owned ref.
    pub fn from_ref(r: Ref<'static>) -> Result<Self, HostError> {
        let v = Self::new();
        v.populate(r)?;
        Ok(v)
    }

    /// A view of part of `root`'s payload.
    ///
    /// A view of a view is attached to the ultimate root, with the two
    /// projections composed.
    pub fn view(root: &Rc<Variable>, projection: Projection) -> Result<Self, HostError> {
        let (owner, projection) = match &root.root {
            Some(ultimate) => {
                let outer = match &*root.shape.borrow() {
                    Shape::View { projection, .. } => projection.clone(),
                    Shape::Empty | Shape::Owned { .. } => {
                        return Err(HostError::Type("cannot view an empty variable".into()))
                    }
                };
                (Rc::clone(ultimate), outer.then(projection)?)
            }
            None => (Rc::clone(root), projection),
        };
        let placement = match &*owner.shape.borrow() {
            Shape::Owned { index, placement } if *index == projection.source() => *placement,
            Shape::Owned { index, .. } => {
                return Err(HostError::Type(format!(
                    "cannot view a {} as a {}",
                    index,
                    projection.source()
                )))
            }
            Shape::Empty | Shape::View { .. } => {
                return Err(HostError::Type("cannot view an empty variable".into()))
            }
        };
        tracing::debug!(root = %projection.source(), view = %projection.target(), "created view");
        Ok(Self {
            root: Some(owner),
            lock: Cell::new(LockState::Free),
            shape: RefCell::new(Shape::View {
                index: projection.target(),
                placement,
                projection,
            }),
            payload: RefCell::new(None),
        })
    }

    /// The variable whose lock governs this one.
    fn lock_owner(&self) -> &Variable {
        self.root.as_deref().unwrap_or(self)
    }

    /// Take ownership of `r`, dropping any previous value.
    ///
    /// Borrowed refs are rejected; an empty ref resets.
    pub fn populate(&self, r: Ref<'static>) -> Result<(), HostError> {
        if self.root.is_some() {
            return Err(HostError::Type("cannot populate a view".into()));
        }
        if !r.has_value() {
            return self.reset();
        }
        let name = r.name();
        let (index, placement, value) = r.into_parts().ok_or_else(|| {
            HostError::Type(format!("cannot store a borrowed {} in a variable", name))
        })?;
        self.ensure_unlocked()?;
        tracing::trace!(%index, %placement, "populating variable");
        self.shape.replace(Shape::Owned { index, placement });
        let old = self.payload.replace(Some(value));
        drop(old);
        Ok(())
    }

    /// Drop the value (or detach the view), leaving the variable empty.
    pub fn reset(&self) -> Result<(), HostError> {
        self.ensure_unlocked()?;
        self.shape.replace(Shape::Empty);
        let old = self.payload.take();
        drop(old);
        Ok(())
    }

    fn ensure_unlocked(&self) -> Result<(), HostError> {
        match self.lock_owner().lock.get() {
            LockState::Free => Ok(()),
            LockState::Writing => Err(rebind_core::LLError::Mutating.into()),
            LockState::Reading(_) => Err(rebind_core::LLError::Referenced.into()),
        }
    }

    /// Register one borrow of `kind` on the lock owner.
    pub fn begin_acquisition(&self, kind: LockKind) -> Result<(), HostError> {
        let owner = self.lock_owner();
        let next = owner.lock.get().begin(kind)?;
        owner.lock.set(next);
        tracing::debug!(?kind, count = next.count(), "borrow acquired");
        Ok(())
    }

    /// Release one borrow on the lock owner.
    pub fn end_acquisition(&self) -> Result<(), HostError> {
        let owner = self.lock_owner();
        let next = owner.lock.get().end()?;
        owner.lock.set(next);
        tracing::debug!(count = next.count(), "borrow released");
        Ok(())
    }

    fn release(&self) {
        if let Err(e) = self.end_acquisition() {
            tracing::warn!(error = %e, "unbalanced borrow release");
        }
    }

    /// Borrow the payload; released when the `Acquired` drops.
    ///
    /// An empty variable yields an empty borrow without locking. A
    /// conflicting borrow is reported as busy.
    pub fn acquire(&self, kind: LockKind) -> Result<Acquired<'_>, HostError> {
        let (index, projection) = match &*self.shape.borrow() {
            Shape::Empty => {
                return Ok(Acquired {
                    owner: None,
                    index: Index::void(),
                    guard: Guard::Empty,
                })
            }
            Shape::Owned { index, .. } => (*index, None),
            Shape::View {
                index, projection, ..
            } => (*index, Some(projection.clone())),
        };
        self.begin_acquisition(kind)?;
        let owner = self.lock_owner();
        match Self::guard(owner, kind, projection.as_ref()) {
            Some(guard) => Ok(Acquired {
                owner: Some(owner),
                index,
                guard,
            }),
            None => {
                owner.release();
                Err(HostError::Type("view target no longer exists".into()))
            }
        }
    }

    fn guard<'v>(
        owner: &'v Variable,
        kind: LockKind,
        projection: Option<&Projection>,
    ) -> Option<Guard<'v>> {
        match kind {
            LockKind::Read => {
                let payload = owner.payload.try_borrow().ok()?;
                cell::Ref::filter_map(payload, |payload| project(payload, projection))
                    .ok()
                    .map(Guard::Read)
            }
            LockKind::Write => {
                let payload = owner.payload.try_borrow_mut().ok()?;
                cell::RefMut::filter_map(payload, |payload| project_mut(payload, projection))
                    .ok()
                    .map(Guard::Write)
            }
        }
    }

    /// Check if there is a value to borrow.
    pub fn has_value(&self) -> bool {
        match &*self.shape.borrow() {
            Shape::Empty => false,
            Shape::Owned { .. } => true,
            Shape::View { projection, .. } => self.root.as_deref().is_some_and(|root| {
                match root.payload.try_borrow() {
                    Ok(payload) => project(&payload, Some(projection)).is_some(),
                    // The root is being written; judge by its type alone.
                    Err(_) => root.index() == projection.source(),
                }
            }),
        }
    }

    /// Type of the held (or viewed) value; `()` when empty.
    pub fn index(&self) -> Index {
        match &*self.shape.borrow() {
            Shape::Empty => Index::void(),
            Shape::Owned { index, .. } | Shape::View { index, .. } => *index,
        }
    }

    pub fn name(&self) -> &'static str {
        self.index().name()
    }

    pub fn state(&self) -> VariableState {
        match &*self.shape.borrow() {
            Shape::Empty => VariableState::Empty,
            Shape::Owned { placement, .. } => VariableState::of(*placement, false),
            Shape::View { placement, .. } => VariableState::of(*placement, true),
        }
    }

    /// The type and state as one descriptor.
    pub fn descriptor(&self) -> Tagged<VariableState> {
        Tagged::new(self.index(), self.state())
    }

    /// Outstanding borrows on the lock owner: `0`, the number of shared
    /// borrows, or `-1` for an exclusive one.
    pub fn use_count(&self) -> isize {
        self.lock_owner().lock.get().count()
    }

    pub fn is_alias(&self) -> bool {
        self.root.is_some()
    }

    /// The root this variable views, if it is a view.
    pub fn root(&self) -> Option<&Rc<Variable>> {
        self.root.as_ref()
    }

    /// Convert the value into an owned `T`.
    pub fn load<T: 'static>(&self, registry: &Registry) -> Result<Option<T>, HostError> {
        let mut acquired = self.acquire(LockKind::Read)?;
        Ok(registry.load::<T>(acquired.to_ref())?)
    }
}

impl Default for Variable {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Variable")
            .field("index", &self.index())
            .field("state", &self.state())
            .field("use_count", &self.use_count())
            .finish()
    }
}

impl Drop for Variable {
    fn drop(&mut self) {
        if !self.lock.get().is_free() {
            tracing::warn!(count = self.lock.get().count(), "variable dropped while borrowed");
        }
    }
}

enum Guard<'v> {
    Empty,
    Read(cell::Ref<'v, dyn Any>),
    Write(cell::RefMut<'v, dyn Any>),
}

/// A live borrow of a variable's payload.
///
/// Dropping it releases the borrow on the lock owner.
pub struct Acquired<'v> {
    owner: Option<&'v Variable>,
    index: Index,
    guard: Guard<'v>,
}

impl Acquired<'_> {
    /// Type of the borrowed value.
    pub fn index(&self) -> Index {
        self.index
    }

    /// How the value is borrowed; `None` for an empty variable.
    pub fn qualifier(&self) -> Option<Qualifier> {
        match self.guard {
            Guard::Empty => None,
            Guard::Read(_) => Some(Qualifier::Read),
            Guard::Write(_) => Some(Qualifier::Write),
        }
    }

    /// The borrow as a ref to pass across the boundary.
    pub fn to_ref(&mut self) -> Ref<'_> {
        match &mut self.guard {
            Guard::Empty => Ref::empty(),
            Guard::Read(g) => Ref::from_any(self.index, &**g),
            Guard::Write(g) => Ref::from_any_mut(self.index, &mut **g),
        }
    }

    pub fn get<T: 'static>(&self) -> Option<&T> {
        match &self.guard {
            Guard::Empty => None,
            Guard::Read(g) => g.downcast_ref::<T>(),
            Guard::Write(g) => g.downcast_ref::<T>(),
        }
    }

    pub fn get_mut<T: 'static>(&mut self) -> Option<&mut T> {
        match &mut self.guard {
            Guard::Write(g) => g.downcast_mut::<T>(),
            Guard::Empty | Guard::Read(_) => None,
        }
    }
}

impl Drop for Acquired<'_> {
    fn drop(&mut self) {
        if let Some(owner) = self.owner {
            owner.release();
        }
    }
}

impl fmt::Debug for Acquired<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Acquired")
            .field("index", &self.index)
            .field("qualifier", &self.qualifier())
            .finish()
    }
}
