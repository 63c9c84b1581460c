//! Core rebind: Erased Values, Conversions and Dispatch
//!
//! This layer gives the plain descriptors of `rebind-ll` something to
//! describe:
//! - `Ref`: one erased value or borrow, tagged with its type and qualifier
//! - `Target`: where an erased result should be written, and in which shapes
//! - `Registry`: types, Dump/Load bridges and overload tables, built once
//! - `Overload`, `Frame`, `Function`: the callable side of the boundary
//! - `Exception`: a callee's domain error, carried back verbatim
//!
//! Use this layer for:
//! - Converting between unrelated types through registered bridges
//! - Calling functions and methods whose signatures are only known at run time
//!
//! # Example
//!
//! ```rust
//! use rebind_core::{Overload, Ref, Registry};
//!
//! #[derive(Clone)]
//! struct Greeter;
//!
//! let registry = Registry::builder()
//!     .with_builtins()
//!     .register::<Greeter>()
//!     .method::<Greeter>("greet", Overload::function1(|name: String| format!("hi {name}")))
//!     .build()
//!     .unwrap();
//!
//! let g = Greeter;
//! let out: String = registry
//!     .call(Ref::read(&g), Some("greet"), &mut [Ref::owned(String::from("ann"))])
//!     .unwrap();
//! assert_eq!(out, "hi ann");
//! ```

mod builtins;
mod call;
mod config;
mod convert;
mod dispatch;
mod error;
mod exception;
mod reference;
mod registry;
mod target;

pub use call::{Body, Frame, Function, Overload, Param, Returned};
pub use config::RegistryConfig;
pub use convert::{DumpFn, LoadFn, ViaFn};
pub use error::Error;
pub use exception::Exception;
pub use reference::Ref;
pub use registry::{Registry, RegistryBuilder};
pub use target::Target;

// Re-export LL types for convenience
pub use rebind_ll::{
    Binding, DumpStatus, Float, Index, Integer, LLError, LoadStatus, LockKind, LockState,
    Qualifier, Status, Strategies, Tagged, DEFAULT_INLINE_CAPACITY,
};
