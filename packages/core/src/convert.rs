//! Dump/Load bridges and the conversion resolution.
//!
//! A conversion from a source `Ref` into a `Target` asking for another type
//! is resolved in a fixed order:
//!
//! 1. identity, when the target wants the source's own type (or any type);
//! 2. the Dump bridge for `(source, destination)`, where the source type
//!    expresses itself as the destination;
//! 3. the Load bridge for the same pair, where the destination constructs
//!    itself from the source;
//! 4. the destination's *via* loaders, which first convert the source into
//!    an intermediate type and construct the destination from that.
//!
//! If nothing bridges the gap the outcome is `LoadStatus::None` and the
//! target is left untouched.

use std::sync::Arc;

use rebind_ll::{DumpStatus, Index, LoadStatus, Qualifier, Strategies};

use crate::error::Error;
use crate::exception::Exception;
use crate::reference::Ref;
use crate::registry::Registry;
use crate::target::Target;

/// An erased Dump: the source expresses itself as what the target wants.
pub type DumpFn = Arc<
    dyn for<'a> Fn(&Registry, &mut Ref<'a>, &mut Target<'a>) -> DumpStatus + Send + Sync,
>;

/// An erased Load: the target's type constructs itself from the source.
pub type LoadFn = Arc<
    dyn for<'a> Fn(&Registry, &mut Ref<'a>, &mut Target<'a>) -> LoadStatus + Send + Sync,
>;

/// An erased via loader: constructs the destination from an owned
/// intermediate value.
pub type ViaFn =
    Arc<dyn for<'a> Fn(&Registry, Ref<'static>, &mut Target<'a>) -> LoadStatus + Send + Sync>;

/// The bridges registered for one `(source, destination)` pair, tried in
/// registration order.
#[derive(Clone, Default)]
pub(crate) struct Bridge {
    pub(crate) dumps: Vec<DumpFn>,
    pub(crate) loads: Vec<LoadFn>,
}

/// A loader through an intermediate type.
#[derive(Clone)]
pub(crate) struct Via {
    pub(crate) index: Index,
    pub(crate) load: ViaFn,
}

pub(crate) fn dump_fn<F>(f: F) -> DumpFn
where
    F: for<'a> Fn(&Registry, &mut Ref<'a>, &mut Target<'a>) -> DumpStatus + Send + Sync + 'static,
{
    Arc::new(f)
}

pub(crate) fn load_fn<F>(f: F) -> LoadFn
where
    F: for<'a> Fn(&Registry, &mut Ref<'a>, &mut Target<'a>) -> LoadStatus + Send + Sync + 'static,
{
    Arc::new(f)
}

pub(crate) fn via_fn<F>(f: F) -> ViaFn
where
    F: for<'a> Fn(&Registry, Ref<'static>, &mut Target<'a>) -> LoadStatus + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Write `value` and report where it landed.
fn place<D: 'static>(target: &mut Target<'_>, value: D) -> LoadStatus {
    if target.set_if(value) {
        target
            .landed()
            .map_or(LoadStatus::None, LoadStatus::from_landed)
    } else {
        LoadStatus::None
    }
}

fn as_dump(status: LoadStatus) -> DumpStatus {
    match status {
        LoadStatus::Mutable => DumpStatus::Mutable,
        LoadStatus::Const => DumpStatus::Const,
        LoadStatus::Heap => DumpStatus::Heap,
        LoadStatus::Stack => DumpStatus::Stack,
        LoadStatus::None => DumpStatus::None,
        LoadStatus::Exception => DumpStatus::Exception,
        LoadStatus::OutOfMemory => DumpStatus::OutOfMemory,
    }
}

/// A typed value conversion, shared by Dump and Load bridges.
fn by_value<S, D, F>(f: F) -> LoadFn
where
    S: 'static,
    D: 'static,
    F: Fn(&S) -> Option<D> + Send + Sync + 'static,
{
    load_fn(move |_, source, target| {
        if !target.accepts::<D>() {
            return LoadStatus::None;
        }
        match source.get::<S>().and_then(|s| f(s)) {
            Some(d) => place(target, d),
            None => LoadStatus::None,
        }
    })
}

pub(crate) fn dump_value<S, D, F>(f: F) -> DumpFn
where
    S: 'static,
    D: 'static,
    F: Fn(&S) -> Option<D> + Send + Sync + 'static,
{
    let load = by_value::<S, D, F>(f);
    dump_fn(move |registry, source, target| as_dump(load(registry, source, target)))
}

pub(crate) fn load_value<D, S, F>(f: F) -> LoadFn
where
    S: 'static,
    D: 'static,
    F: Fn(&S) -> Option<D> + Send + Sync + 'static,
{
    by_value::<S, D, F>(f)
}

pub(crate) fn try_load_value<D, S, F>(f: F) -> LoadFn
where
    S: 'static,
    D: 'static,
    F: Fn(&S) -> Result<Option<D>, Exception> + Send + Sync + 'static,
{
    load_fn(move |_, source, target| {
        if !target.accepts::<D>() {
            return LoadStatus::None;
        }
        let Some(s) = source.get::<S>() else {
            return LoadStatus::None;
        };
        match f(s) {
            Ok(Some(d)) => place(target, d),
            Ok(None) => LoadStatus::None,
            Err(e) if e.is_out_of_memory() => LoadStatus::OutOfMemory,
            Err(e) => {
                target.set_exception(e);
                LoadStatus::Exception
            }
        }
    })
}

pub(crate) fn dump_reference<S, D, F>(f: F) -> DumpFn
where
    S: 'static,
    D: 'static,
    F: Fn(&S) -> Option<&D> + Send + Sync + 'static,
{
    dump_fn(move |_, source, target| {
        if target
            .reference_for(Index::of::<D>(), Qualifier::Read)
            .is_none()
        {
            return DumpStatus::None;
        }
        // Probe first so that a declining projection leaves the source alone.
        if source.get::<S>().and_then(|s| f(s)).is_none() {
            return DumpStatus::None;
        }
        let projected = source
            .leak()
            .and_then(|any| any.downcast_ref::<S>())
            .and_then(|s| f(s));
        match projected {
            Some(d) => {
                if target.set_read(d) {
                    DumpStatus::Const
                } else {
                    DumpStatus::None
                }
            }
            None => DumpStatus::None,
        }
    })
}

pub(crate) fn dump_mutable<S, D, F>(f: F) -> DumpFn
where
    S: 'static,
    D: 'static,
    F: Fn(&mut S) -> &mut D + Send + Sync + 'static,
{
    dump_fn(move |_, source, target| {
        let wanted = target.reference_for(Index::of::<D>(), Qualifier::Write);
        if wanted != Some(Qualifier::Write)
            || source.qualifier() != Some(Qualifier::Write)
            || !source.index().equals::<S>()
        {
            return DumpStatus::None;
        }
        let Some(s) = source.leak_mut().and_then(|any| any.downcast_mut::<S>()) else {
            return DumpStatus::None;
        };
        if target.set_write(f(s)) {
            DumpStatus::Mutable
        } else {
            DumpStatus::None
        }
    })
}

pub(crate) fn via_value<D, V, F>(f: F) -> ViaFn
where
    D: 'static,
    V: 'static,
    F: Fn(V) -> Option<D> + Send + Sync + 'static,
{
    via_fn(move |_, mut value, target| {
        if !target.accepts::<D>() {
            return LoadStatus::None;
        }
        match value.take::<V>().and_then(|v| f(v)) {
            Some(d) => place(target, d),
            None => LoadStatus::None,
        }
    })
}

impl Registry {
    /// Convert `source` into whatever `target` asks for.
    ///
    /// Owned sources are consumed; on `LoadStatus::None` nothing has been
    /// written to the target.
    pub fn convert<'a>(&self, source: Ref<'a>, target: &mut Target<'a>) -> LoadStatus {
        self.convert_at(source, target, 0)
    }

    pub(crate) fn convert_at<'a>(
        &self,
        mut source: Ref<'a>,
        target: &mut Target<'a>,
        depth: usize,
    ) -> LoadStatus {
        if !source.has_value() {
            return LoadStatus::None;
        }
        let src = source.index();
        let dst = match target.index() {
            Some(dst) if dst != src => dst,
            _ => return self.identity(source, target),
        };

        if let Some(bridge) = self.bridge(src, dst) {
            for dump in &bridge.dumps {
                let status = dump(self, &mut source, target);
                if status != DumpStatus::None {
                    tracing::trace!(%src, %dst, ?status, "converted by dump");
                    return status.into();
                }
            }
            for load in &bridge.loads {
                let status = load(self, &mut source, target);
                if status != LoadStatus::None {
                    tracing::trace!(%src, %dst, ?status, "converted by load");
                    return status;
                }
            }
        }

        if depth >= self.config().max_conversion_depth {
            tracing::trace!(%src, %dst, depth, "conversion depth exhausted");
            return LoadStatus::None;
        }

        for via in self.vias(dst) {
            if via.index == dst {
                continue;
            }
            let mut intermediate = self.owned_target(via.index);
            match self.convert_at(source.reborrow(), &mut intermediate, depth + 1) {
                LoadStatus::Stack | LoadStatus::Heap => {}
                LoadStatus::Exception => {
                    if let Some(e) = intermediate.take_exception() {
                        target.set_exception(e);
                    }
                    return LoadStatus::Exception;
                }
                LoadStatus::OutOfMemory => return LoadStatus::OutOfMemory,
                LoadStatus::None | LoadStatus::Mutable | LoadStatus::Const => continue,
            }
            let Ok(value) = intermediate.take().into_static() else {
                continue;
            };
            let status = (via.load)(self, value, target);
            if status != LoadStatus::None {
                tracing::trace!(%src, %dst, via = %via.index, ?status, "converted via");
                return status;
            }
        }

        tracing::trace!(%src, %dst, "no conversion");
        LoadStatus::None
    }

    /// Identity: move, forward or copy the source as-is.
    fn identity<'a>(&self, source: Ref<'a>, target: &mut Target<'a>) -> LoadStatus {
        let owned = source.is_owned();
        match target.set_ref(source) {
            Ok(q) => LoadStatus::from_landed(q),
            Err(_) if owned => LoadStatus::None,
            Err(source) => match self.copy(&source) {
                Some(copy) => match target.set_ref(copy) {
                    Ok(q) => LoadStatus::from_landed(q),
                    Err(_) => LoadStatus::None,
                },
                None => LoadStatus::None,
            },
        }
    }

    /// A target for an owned value of type `index` with this registry's
    /// inline capacity.
    pub fn owned_target<'a>(&self, index: Index) -> Target<'a> {
        Target::new(
            Some(index),
            self.config().inline_capacity,
            Strategies::STACK | Strategies::HEAP,
        )
    }

    /// Convert `source` into an owned `T`.
    ///
    /// Exact matches are moved (owned) or copied (borrowed). `Ok(None)`
    /// means no conversion applies; a raised exception is returned as an
    /// error.
    pub fn load<T: 'static>(&self, source: Ref<'_>) -> Result<Option<T>, Error> {
        let mut target = self.owned_target(Index::of::<T>());
        match self.convert(source, &mut target) {
            LoadStatus::Stack | LoadStatus::Heap => match target.take_value::<T>() {
                Some(value) => Ok(Some(value)),
                None => Err(Error::Internal(format!(
                    "converted value is not a {}",
                    std::any::type_name::<T>()
                ))),
            },
            LoadStatus::None => Ok(None),
            LoadStatus::Exception => match target.take_exception() {
                Some(e) => Err(Error::Exception(e)),
                None => Err(Error::Internal(
                    "exception status without a stashed exception".into(),
                )),
            },
            LoadStatus::OutOfMemory => Err(Error::OutOfMemory),
            status @ (LoadStatus::Mutable | LoadStatus::Const) => Err(Error::Internal(format!(
                "owned target received a reference ({:?})",
                status
            ))),
        }
    }
}
