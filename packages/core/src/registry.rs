//! The explicit registry of types, conversion bridges and overload tables.

use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use rebind_ll::{Index, Integer, Qualifier, Strategies};

use crate::call::{Function, Overload};
use crate::config::RegistryConfig;
use crate::convert::{self, Bridge, DumpFn, LoadFn, Via, ViaFn};
use crate::error::Error;
use crate::exception::Exception;
use crate::reference::Ref;

type CopyFn = Arc<dyn Fn(&dyn Any) -> Option<Box<dyn Any>> + Send + Sync>;

/// What the registry knows about one type.
#[derive(Clone)]
struct TypeEntry {
    index: Index,
    copy: Option<CopyFn>,
}

/// Overloads attached to one self type.
#[derive(Clone, Default)]
pub(crate) struct Table {
    pub(crate) call: Vec<Overload>,
    pub(crate) methods: BTreeMap<String, Vec<Overload>>,
}

/// Immutable tables built once from a `RegistryBuilder`.
///
/// The registry is `Send + Sync` and is passed explicitly to everything that
/// converts or dispatches; there is no global registration.
///
/// # Example
///
/// ```rust
/// use rebind_core::{Ref, Registry, RegistryConfig};
///
/// let registry = Registry::init(RegistryConfig::default()).unwrap();
/// let x = registry.load::<f64>(Ref::owned(42_i64)).unwrap();
/// assert_eq!(x, Some(42.0));
/// registry.shutdown();
/// ```
pub struct Registry {
    config: RegistryConfig,
    types: HashMap<Index, TypeEntry>,
    bridges: HashMap<(Index, Index), Bridge>,
    vias: HashMap<Index, Vec<Via>>,
    tables: HashMap<Index, Table>,
}

impl Registry {
    /// Start collecting registrations with the default configuration.
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new(RegistryConfig::default())
    }

    /// Build the default registry for `config`.
    ///
    /// The numeric and string defaults are included unless
    /// `config.builtins` is off.
    pub fn init(config: RegistryConfig) -> Result<Registry, Error> {
        let builtins = config.builtins;
        let builder = RegistryBuilder::new(config);
        if builtins {
            builder.with_builtins().build()
        } else {
            builder.build()
        }
    }

    /// Drop every table.
    pub fn shutdown(self) {
        tracing::debug!(
            types = self.types.len(),
            bridges = self.bridges.len(),
            tables = self.tables.len(),
            "registry shutdown"
        );
    }

    /// The configuration this registry was built with.
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Check if a type was registered.
    pub fn is_registered(&self, index: Index) -> bool {
        self.types.contains_key(&index)
    }

    /// Check if values of a type can be copied.
    pub fn is_copyable(&self, index: Index) -> bool {
        self.types
            .get(&index)
            .is_some_and(|entry| entry.copy.is_some())
    }

    /// Every registered type, sorted by name.
    pub fn types(&self) -> Vec<Index> {
        let mut types: Vec<Index> = self.types.values().map(|entry| entry.index).collect();
        types.sort();
        types
    }

    /// Names of the methods registered for a type, sorted.
    pub fn methods(&self, index: Index) -> Vec<&str> {
        self.tables
            .get(&index)
            .map(|table| table.methods.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Copy the payload of `source` into a new owned ref.
    ///
    /// Returns `None` for empty refs and for types without a copy function.
    pub fn copy(&self, source: &Ref<'_>) -> Option<Ref<'static>> {
        let entry = self.types.get(&source.index())?;
        let copy = entry.copy.as_ref()?;
        let value = copy(source.as_any()?)?;
        let placement = (Strategies::STACK | Strategies::HEAP)
            .placement(entry.index, self.config.inline_capacity)
            .unwrap_or(Qualifier::Heap);
        tracing::trace!(index = %entry.index, %placement, "copied value");
        Some(Ref::from_box(entry.index, value, placement))
    }

    pub(crate) fn bridge(&self, src: Index, dst: Index) -> Option<&Bridge> {
        self.bridges.get(&(src, dst))
    }

    pub(crate) fn vias(&self, dst: Index) -> &[Via] {
        self.vias.get(&dst).map(Vec::as_slice).unwrap_or(&[])
    }

    pub(crate) fn table(&self, index: Index) -> Option<&Table> {
        self.tables.get(&index)
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("config", &self.config)
            .field("types", &self.types().len())
            .field("bridges", &self.bridges.len())
            .field("tables", &self.tables.len())
            .finish()
    }
}

/// Collects registrations for a `Registry`.
///
/// Registrations may arrive in any order; `build()` validates them types
/// first, then conversion bridges, then overload tables, so a bridge or a
/// table naming a type that was never registered is rejected.
pub struct RegistryBuilder {
    config: RegistryConfig,
    types: Vec<TypeEntry>,
    dumps: Vec<(Index, Index, DumpFn)>,
    loads: Vec<(Index, Index, LoadFn)>,
    vias: Vec<(Index, Via)>,
    overloads: Vec<(Index, Option<String>, Overload)>,
}

impl RegistryBuilder {
    /// An empty builder; `()` and `Function` are always registered.
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            config,
            types: Vec::new(),
            dumps: Vec::new(),
            loads: Vec::new(),
            vias: Vec::new(),
            overloads: Vec::new(),
        }
        .register::<()>()
        .register::<Function>()
    }

    /// Register a copyable type.
    pub fn register<T: Clone + 'static>(mut self) -> Self {
        let copy: CopyFn = Arc::new(|any: &dyn Any| {
            any.downcast_ref::<T>()
                .map(|value| Box::new(value.clone()) as Box<dyn Any>)
        });
        self.types.push(TypeEntry {
            index: Index::of::<T>(),
            copy: Some(copy),
        });
        self
    }

    /// Register a type that can only be moved or borrowed.
    pub fn register_opaque<T: 'static>(mut self) -> Self {
        self.types.push(TypeEntry {
            index: Index::of::<T>(),
            copy: None,
        });
        self
    }

    /// Register an enumeration with its underlying integer type.
    ///
    /// The enumeration dumps to `U` and then to `Integer`, and loads from
    /// `U` and then through `Integer`.
    pub fn register_enum<E, U, IntoU, FromU>(self, to: IntoU, from: FromU) -> Self
    where
        E: Clone + 'static,
        U: Copy + TryFrom<Integer> + TryInto<Integer> + 'static,
        IntoU: Fn(&E) -> U + Send + Sync + 'static,
        FromU: Fn(U) -> Option<E> + Send + Sync + 'static,
    {
        let to = Arc::new(to);
        let from = Arc::new(from);
        let to_integer = to.clone();
        let from_integer = from.clone();
        self.register::<E>()
            .dump(move |e: &E| Some(to(e)))
            .dump(move |e: &E| -> Option<Integer> { to_integer(e).try_into().ok() })
            .load(move |u: &U| from(*u))
            .load_via(move |i: Integer| U::try_from(i).ok().and_then(|u| from_integer(u)))
    }

    /// Let `S` express itself as an owned `D`.
    pub fn dump<S, D, F>(self, f: F) -> Self
    where
        S: 'static,
        D: 'static,
        F: Fn(&S) -> Option<D> + Send + Sync + 'static,
    {
        self.dump_erased(Index::of::<S>(), Index::of::<D>(), convert::dump_value(f))
    }

    /// Let a borrowed `S` express itself as a shared reference to a `D`
    /// inside it.
    pub fn dump_ref<S, D, F>(self, f: F) -> Self
    where
        S: 'static,
        D: 'static,
        F: Fn(&S) -> Option<&D> + Send + Sync + 'static,
    {
        self.dump_erased(
            Index::of::<S>(),
            Index::of::<D>(),
            convert::dump_reference(f),
        )
    }

    /// Let a mutably borrowed `S` express itself as a mutable reference to a
    /// `D` inside it.
    pub fn dump_mut<S, D, F>(self, f: F) -> Self
    where
        S: 'static,
        D: 'static,
        F: Fn(&mut S) -> &mut D + Send + Sync + 'static,
    {
        self.dump_erased(Index::of::<S>(), Index::of::<D>(), convert::dump_mutable(f))
    }

    /// Register an erased Dump bridge for `(src, dst)`.
    pub fn dump_erased(mut self, src: Index, dst: Index, dump: DumpFn) -> Self {
        self.dumps.push((src, dst, dump));
        self
    }

    /// Let `D` construct itself from an `S`.
    pub fn load<D, S, F>(self, f: F) -> Self
    where
        D: 'static,
        S: 'static,
        F: Fn(&S) -> Option<D> + Send + Sync + 'static,
    {
        self.load_erased(Index::of::<S>(), Index::of::<D>(), convert::load_value(f))
    }

    /// Like `load`, but the constructor may raise.
    pub fn try_load<D, S, F>(self, f: F) -> Self
    where
        D: 'static,
        S: 'static,
        F: Fn(&S) -> Result<Option<D>, Exception> + Send + Sync + 'static,
    {
        self.load_erased(
            Index::of::<S>(),
            Index::of::<D>(),
            convert::try_load_value(f),
        )
    }

    /// Let `D` construct itself from anything convertible to `V`.
    pub fn load_via<D, V, F>(self, f: F) -> Self
    where
        D: 'static,
        V: 'static,
        F: Fn(V) -> Option<D> + Send + Sync + 'static,
    {
        self.via_erased(Index::of::<D>(), Index::of::<V>(), convert::via_value(f))
    }

    /// Register an erased Load bridge for `(src, dst)`.
    pub fn load_erased(mut self, src: Index, dst: Index, load: LoadFn) -> Self {
        self.loads.push((src, dst, load));
        self
    }

    /// Register an erased via loader building `dst` from `via`.
    pub fn via_erased(mut self, dst: Index, via: Index, load: ViaFn) -> Self {
        self.vias.push((dst, Via { index: via, load }));
        self
    }

    /// Add an overload to the call table of `T`.
    pub fn call<T: 'static>(mut self, overload: Overload) -> Self {
        self.overloads.push((Index::of::<T>(), None, overload));
        self
    }

    /// Add an overload to the method `name` of `T`.
    pub fn method<T: 'static>(mut self, name: impl Into<String>, overload: Overload) -> Self {
        self.overloads
            .push((Index::of::<T>(), Some(name.into()), overload));
        self
    }

    /// Install the numeric, boolean and string defaults.
    pub fn with_builtins(self) -> Self {
        crate::builtins::install(self)
    }

    /// Validate every registration and freeze the tables.
    pub fn build(self) -> Result<Registry, Error> {
        let mut types: HashMap<Index, TypeEntry> = HashMap::new();
        for entry in self.types {
            if types.contains_key(&entry.index) {
                tracing::warn!(index = %entry.index, "type registered twice, keeping the first");
                continue;
            }
            types.insert(entry.index, entry);
        }

        let require = |index: Index| -> Result<(), Error> {
            if types.contains_key(&index) {
                Ok(())
            } else {
                tracing::warn!(%index, "registration references an unregistered type");
                Err(Error::Unregistered { name: index.name() })
            }
        };

        let mut bridges: HashMap<(Index, Index), Bridge> = HashMap::new();
        for (src, dst, dump) in self.dumps {
            require(src)?;
            require(dst)?;
            bridges.entry((src, dst)).or_default().dumps.push(dump);
        }
        for (src, dst, load) in self.loads {
            require(src)?;
            require(dst)?;
            bridges.entry((src, dst)).or_default().loads.push(load);
        }

        let mut vias: HashMap<Index, Vec<Via>> = HashMap::new();
        for (dst, via) in self.vias {
            require(dst)?;
            require(via.index)?;
            vias.entry(dst).or_default().push(via);
        }

        let mut tables: HashMap<Index, Table> = HashMap::new();
        for (owner, name, overload) in self.overloads {
            require(owner)?;
            for param in overload.params() {
                require(param.index())?;
            }
            if overload.defaults() > overload.arity() {
                return Err(Error::InvalidOverload {
                    name: owner.name(),
                    message: format!(
                        "{} defaults for {} parameters",
                        overload.defaults(),
                        overload.arity()
                    ),
                });
            }
            let table = tables.entry(owner).or_default();
            match name {
                Some(name) => table.methods.entry(name).or_default().push(overload),
                None => table.call.push(overload),
            }
        }

        tracing::debug!(
            types = types.len(),
            bridges = bridges.len(),
            vias = vias.len(),
            tables = tables.len(),
            "registry built"
        );

        Ok(Registry {
            config: self.config,
            types,
            bridges,
            vias,
            tables,
        })
    }
}
