//! Shared ownership of the values stored in an [`IdMap`](crate::IdMap).
//!
//! A value held by an id map is a handle to an object that other maps and
//! collections may hold as well. The set-algebra engine needs three things
//! from such a handle: a way to take an additional reference, a way to drop a
//! reference that is provably not the last one, and an identity test. The
//! [`Shared`] trait names exactly those.
//!
//! Dropping a reference that *might* be the last one is not a trait method.
//! It is delegated to a caller-supplied destroy callback, because only the
//! owner of the object model knows what destroying an object entails.
//!
//! # Examples
//!
//! ```rust
//! use std::rc::Rc;
//! use id_trie::{ReleaseStrategy, Shared, release};
//!
//! let object = Rc::new("thing");
//! let extra = object.acquire();
//! assert_eq!(Rc::strong_count(&object), 2);
//!
//! let mut destroyed = 0;
//! release(extra, ReleaseStrategy::Fast, &mut |_| destroyed += 1);
//! assert_eq!(Rc::strong_count(&object), 1);
//! assert_eq!(destroyed, 0);
//!
//! release(object, ReleaseStrategy::MaybeLast, &mut |_| destroyed += 1);
//! assert_eq!(destroyed, 1);
//! ```

use std::rc::Rc;
use std::sync::Arc;

/// A reference-counted handle to an object addressed by a unique id.
pub trait Shared: Sized {
    /// Takes one additional reference to the same object.
    #[must_use]
    fn acquire(&self) -> Self;

    /// Drops this reference while another reference is known to stay alive.
    ///
    /// Implementations must not run any object destructor here.
    fn release_fast(self);

    /// Returns `true` if both handles refer to the same object.
    fn same(&self, other: &Self) -> bool;
}

impl<T: ?Sized> Shared for Rc<T> {
    #[inline]
    fn acquire(&self) -> Self {
        Self::clone(self)
    }

    #[inline]
    fn release_fast(self) {
        debug_assert!(Self::strong_count(&self) > 1, "fast release of a last reference");
        drop(self);
    }

    #[inline]
    fn same(&self, other: &Self) -> bool {
        Self::ptr_eq(self, other)
    }
}

impl<T: ?Sized> Shared for Arc<T> {
    #[inline]
    fn acquire(&self) -> Self {
        Self::clone(self)
    }

    #[inline]
    fn release_fast(self) {
        debug_assert!(Self::strong_count(&self) > 1, "fast release of a last reference");
        drop(self);
    }

    #[inline]
    fn same(&self, other: &Self) -> bool {
        Self::ptr_eq(self, other)
    }
}

/// How a reference that leaves a map is given up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReleaseStrategy {
    /// Another live reference to the object is held elsewhere; a plain
    /// decrement is enough.
    Fast,
    /// This may be the last reference; the destroy callback must run.
    MaybeLast,
}

/// Gives up `value` according to `strategy`.
#[inline]
pub fn release<V, F>(value: V, strategy: ReleaseStrategy, destroy: &mut F)
where
    V: Shared,
    F: FnMut(V) + ?Sized,
{
    match strategy {
        ReleaseStrategy::Fast => value.release_fast(),
        ReleaseStrategy::MaybeLast => destroy(value),
    }
}

/// Resolves a key present on both sides of a merge where neither side keeps
/// it: the destination's reference goes first with a fast decrement (the
/// incoming one still holds the object), then the incoming reference is
/// released through `destroy` since it may now be the last one.
#[inline]
pub fn release_pair<V, F>(kept_elsewhere: V, incoming: V, destroy: &mut F)
where
    V: Shared,
    F: FnMut(V) + ?Sized,
{
    release(kept_elsewhere, ReleaseStrategy::Fast, destroy);
    release(incoming, ReleaseStrategy::MaybeLast, destroy);
}
