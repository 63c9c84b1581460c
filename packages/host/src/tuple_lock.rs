//! Locking a whole argument array for the duration of one call.

use rebind_core::{LockKind, Ref};
use serde_json::Value;

use crate::error::HostError;
use crate::object::Object;
use crate::variable::Acquired;

enum Entry<'v> {
    Variable(Acquired<'v>),
    Json(&'v mut Value),
}

/// Borrows held on each argument of a call.
///
/// Every borrow taken is released when the lock drops, including the ones
/// taken before a later argument failed to lock.
///
/// # Example
///
/// ```rust
/// use rebind_host::{Object, TupleLock, Variable};
///
/// let mut args = vec![Object::from(Variable::owned(1_i64)), Object::from(serde_json::json!(2))];
/// let mut lock = TupleLock::new(&mut args, "wr").unwrap();
/// assert_eq!(lock.refs().len(), 2);
/// ```
pub struct TupleLock<'v> {
    entries: Vec<Entry<'v>>,
}

impl<'v> TupleLock<'v> {
    /// Lock `objects` with one mode character each (`'w'` write, anything
    /// else read). An empty mode reads everything.
    pub fn new(objects: &'v mut [Object], mode: &str) -> Result<Self, HostError> {
        let kinds: Vec<LockKind> = if mode.is_empty() {
            vec![LockKind::Read; objects.len()]
        } else {
            mode.chars().map(LockKind::from_mode).collect()
        };
        if kinds.len() != objects.len() {
            return Err(HostError::Type("wrong number of modes".into()));
        }
        Self::with_kinds(objects, &kinds)
    }

    pub fn with_kinds(objects: &'v mut [Object], kinds: &[LockKind]) -> Result<Self, HostError> {
        if kinds.len() != objects.len() {
            return Err(HostError::Type("wrong number of modes".into()));
        }
        let mut entries = Vec::with_capacity(objects.len());
        for (object, kind) in objects.iter_mut().zip(kinds) {
            let entry = match object {
                Object::Variable(v) => {
                    let v: &'v _ = &**v;
                    Entry::Variable(v.acquire(*kind)?)
                }
                Object::Json(value) => Entry::Json(value),
            };
            entries.push(entry);
        }
        tracing::trace!(count = entries.len(), "locked arguments");
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The argument array to pass to dispatch.
    pub fn refs(&mut self) -> Vec<Ref<'_>> {
        self.entries
            .iter_mut()
            .map(|entry| match entry {
                Entry::Variable(acquired) => acquired.to_ref(),
                Entry::Json(value) => Ref::write(&mut **value),
            })
            .collect()
    }
}

/// Split `"<self><sep><args>"` into the self kind and the argument modes.
///
/// The self mode defaults to a read when `mode` is empty.
pub fn split_self_mode(mode: &str) -> (LockKind, &str) {
    let mut chars = mode.chars();
    let kind = chars.next().map_or(LockKind::Read, LockKind::from_mode);
    chars.next();
    (kind, chars.as_str())
}
