//! # id-trie
//!
//! A sparse radix-32 trie keyed by 64-bit object ids, with a set-algebra
//! engine over shared, reference-counted values.
//!
//! ## Overview
//!
//! [`IdMap`] indexes large collections of objects by their unique id. Nodes
//! stay compact while the id space is sparse: a node with one child stores it
//! inline and only grows a 32-slot array once a second child appears.
//!
//! - **Point operations**: `set`, `add`, `get`, `pop` in at most 13 steps
//! - **Traversal**: `walk`, budget-bounded `walkn`, iterators and snapshots
//! - **Set algebra**: union, intersection, difference and symmetric
//!   difference, as consuming (`move`), building (`make`) and in-place
//!   variants
//! - **Id allocation**: `unused_id` finds a free id below a bound
//!
//! Values used with the set algebra implement [`Shared`]: a handle that can
//! be acquired, released while another reference is alive, and compared by
//! identity. `Rc<T>` and `Arc<T>` implement it.
//!
//! ## Feature Flags
//!
//! - `algebra`: Set-algebra operations on `IdMap` (enabled by default)
//! - `serde`: `Serialize` and `Deserialize` for `IdMap`
//! - `full`: Enable all features
//!
//! ## Example
//!
//! ```rust
//! use std::rc::Rc;
//! use id_trie::prelude::*;
//!
//! let thing = Rc::new("thing");
//! let mut things = IdMap::new();
//! things.set(1000, Rc::clone(&thing)).unwrap();
//!
//! assert_eq!(things.get(1000).map(|value| **value), Some("thing"));
//! assert!(matches!(
//!     things.add(1000, Rc::clone(&thing)).map_err(|error| error.error()),
//!     Err(IdMapError::KeyExists)
//! ));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Prelude module for convenient imports.
///
/// # Usage
///
/// ```rust
/// use id_trie::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{AllocationError, IdMapError, InsertError};
    pub use crate::idmap::IdMap;
    pub use crate::shared::{ReleaseStrategy, Shared};
}

pub mod error;
pub mod idmap;
pub mod shared;

#[cfg(feature = "algebra")]
mod algebra;

pub use error::{AllocationError, IdMapError, InsertError};
pub use idmap::IdMap;
pub use shared::{ReleaseStrategy, Shared, release, release_pair};
