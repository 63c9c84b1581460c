//! LLRebind: Low-Level Erasure Primitives
//!
//! This is the narrow waist of the rebind stack. Everything at this level is
//! plain data - no erased payloads, no registries, no conversions.
//!
//! - `Index`: process-wide identity of a concrete type (the "type tag")
//! - `Qualifier`: how an erased slot relates to its storage
//! - `Binding`: the reference category a parameter asks for
//! - `Tagged`: an `Index` packed together with a small tag
//! - `Status`, `DumpStatus`, `LoadStatus`: closed outcome sets
//! - `LockState`: the single-writer/multi-reader borrow counter
//! - `Strategies`: storage strategies a write destination accepts
//!
//! # Example
//!
//! ```rust
//! use rebind_ll::{Index, LockKind, LockState};
//!
//! let tag = Index::of::<i64>();
//! assert!(tag.equals::<i64>());
//!
//! let state = LockState::Free.begin(LockKind::Read).unwrap();
//! assert!(state.begin(LockKind::Write).is_err());
//! ```

mod error;
mod index;
mod lock;
mod qualifier;
mod status;
mod strategies;

pub use error::LLError;
pub use index::Index;
pub use lock::{LockKind, LockState};
pub use qualifier::{Binding, Qualifier, Tagged};
pub use status::{DumpStatus, LoadStatus, Status};
pub use strategies::{Strategies, DEFAULT_INLINE_CAPACITY, INLINE_ALIGN};

/// Canonical integer type every integral type converts through.
pub type Integer = i64;

/// Canonical floating type every floating type converts through.
pub type Float = f64;
