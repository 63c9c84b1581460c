//! rebind: exchanging values and references across a type-erased boundary.
//!
//! Every value crosses the boundary as a `Ref` tagged with its type and how
//! it is held; every call is resolved at run time against registered
//! overloads, and results are written into a caller-described `Target`.
//!
//! The layers, bottom up:
//! - [`ll`]: plain descriptors (type indices, qualifiers, statuses, locks)
//! - [`core`]: refs, targets, the registry, conversions and dispatch
//! - [`host`]: variables with borrow locks, argument locking and a JSON host
//!
//! # Example
//!
//! ```rust
//! use rebind::core::{Ref, Registry};
//!
//! let registry = Registry::builder().with_builtins().build().unwrap();
//! assert_eq!(registry.load::<f64>(Ref::owned(42_i64)).unwrap(), Some(42.0));
//! ```

pub use rebind_core as core;
pub use rebind_host as host;
pub use rebind_ll as ll;

pub use rebind_core::{Error, Exception, Overload, Ref, Registry, RegistryConfig, Target};
pub use rebind_host::{HostError, Object, Variable};
