//! Host rebind: Variables, Borrow Locks and Invocation
//!
//! This layer lets a dynamically-typed host hold and call erased values:
//! - `Variable`: one owned value (or a view into another), with a
//!   single-writer/multi-reader borrow lock
//! - `TupleLock`: borrows on a whole argument array for one call
//! - `call_to_variable`, `call_object`: dispatch on behalf of the host
//! - `HostError`: every failure as the host sees it
//! - `json`: JSON values as the reference host
//!
//! # Example
//!
//! ```rust
//! use rebind_core::{Overload, Ref, Registry};
//! use rebind_host::{call_to_variable, json, Variable};
//!
//! let registry = json::install(Registry::builder().with_builtins())
//!     .call::<i64>(Overload::function2(|a: i64, b: i64| a + b))
//!     .build()
//!     .unwrap();
//!
//! let out = Variable::new();
//! let mut args = [json::import(serde_json::json!(2)), json::import(serde_json::json!(3))];
//! call_to_variable(&registry, &out, Ref::owned(0_i64), None, &mut args).unwrap();
//! assert_eq!(out.load::<i64>(&registry).unwrap(), Some(5));
//! ```

mod error;
mod invoke;
pub mod json;
mod object;
mod projection;
mod tuple_lock;
mod variable;

pub use error::HostError;
pub use invoke::{call_object, call_to_variable, variable_target};
pub use object::Object;
pub use projection::Projection;
pub use tuple_lock::{split_self_mode, TupleLock};
pub use variable::{Acquired, Variable, VariableState};
