//! Accessors views use to reach their part of a root payload.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use rebind_core::Index;

use crate::error::HostError;

type Get = Rc<dyn Fn(&dyn Any) -> Option<&dyn Any>>;
type GetMut = Rc<dyn Fn(&mut dyn Any) -> Option<&mut dyn Any>>;

fn get_fn<F>(f: F) -> Get
where
    F: for<'s> Fn(&'s dyn Any) -> Option<&'s dyn Any> + 'static,
{
    Rc::new(f)
}

fn get_mut_fn<F>(f: F) -> GetMut
where
    F: for<'s> Fn(&'s mut dyn Any) -> Option<&'s mut dyn Any> + 'static,
{
    Rc::new(f)
}

/// A typed path from a value of one type to a part of it.
///
/// # Example
///
/// ```rust
/// use rebind_host::Projection;
///
/// let second = Projection::new(
///     |v: &Vec<i64>| v.get(1),
///     |v: &mut Vec<i64>| v.get_mut(1),
/// );
/// let v = vec![1_i64, 2];
/// assert_eq!(second.get(&v).and_then(|x| x.downcast_ref::<i64>()), Some(&2));
/// ```
#[derive(Clone)]
pub struct Projection {
    source: Index,
    target: Index,
    get: Get,
    get_mut: GetMut,
}

impl Projection {
    pub fn new<R, T, G, M>(get: G, get_mut: M) -> Self
    where
        R: 'static,
        T: 'static,
        G: Fn(&R) -> Option<&T> + 'static,
        M: Fn(&mut R) -> Option<&mut T> + 'static,
    {
        Self {
            source: Index::of::<R>(),
            target: Index::of::<T>(),
            get: get_fn(move |any| {
                let part: &dyn Any = get(any.downcast_ref::<R>()?)?;
                Some(part)
            }),
            get_mut: get_mut_fn(move |any| {
                let part: &mut dyn Any = get_mut(any.downcast_mut::<R>()?)?;
                Some(part)
            }),
        }
    }

    /// The whole value, unchanged.
    pub fn identity(index: Index) -> Self {
        Self {
            source: index,
            target: index,
            get: get_fn(|any| Some(any)),
            get_mut: get_mut_fn(|any| Some(any)),
        }
    }

    /// Type the projection reads from.
    pub fn source(&self) -> Index {
        self.source
    }

    /// Type the projection yields.
    pub fn target(&self) -> Index {
        self.target
    }

    pub fn get<'s>(&self, any: &'s dyn Any) -> Option<&'s dyn Any> {
        (self.get)(any)
    }

    pub fn get_mut<'s>(&self, any: &'s mut dyn Any) -> Option<&'s mut dyn Any> {
        (self.get_mut)(any)
    }

    /// Follow `self`, then `next`.
    pub fn then(self, next: Projection) -> Result<Projection, HostError> {
        if self.target != next.source {
            return Err(HostError::Type(format!(
                "cannot project a {} through a view of {}",
                self.target, next.source
            )));
        }
        let (first, second) = (self.get, next.get);
        let (first_mut, second_mut) = (self.get_mut, next.get_mut);
        Ok(Self {
            source: self.source,
            target: next.target,
            get: get_fn(move |any| second(first(any)?)),
            get_mut: get_mut_fn(move |any| second_mut(first_mut(any)?)),
        })
    }
}

impl fmt::Debug for Projection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Projection")
            .field("source", &self.source)
            .field("target", &self.target)
            .finish()
    }
}
