//! Set algebra over id maps holding shared handles.
//!
//! Every operation combines the key sets of two maps. A key present on both
//! sides refers to the same object through two references, and exactly one
//! reference survives in the result. Which reference goes, and whether it
//! goes through the destroy callback, depends on the operation:
//!
//! | Operation              | Key on both sides                                  | Key on one side            |
//! |------------------------|----------------------------------------------------|----------------------------|
//! | union                  | incoming reference released fast                   | kept                       |
//! | intersection           | incoming reference released fast                   | destroyed                  |
//! | difference             | destination released fast, then incoming destroyed | destination kept           |
//! | symmetric difference   | destination released fast, then incoming destroyed | kept                       |
//!
//! # Variants
//!
//! - **move** (`*_move`) consumes the second operand and rewrites `self`.
//!   Allocation failure while a destination node is being promoted cannot be
//!   rolled back and panics.
//! - **make** (`*_make`) borrows both operands and builds a new map, acquiring
//!   one reference per selected value. Allocation failure is returned and
//!   leaves both operands untouched.
//! - **in-place** (`intersection_inplace`, `difference_inplace`) rewrites
//!   `self` against a borrowed second operand.
//!
//! # Examples
//!
//! ```rust
//! use std::rc::Rc;
//! use id_trie::IdMap;
//!
//! let objects: Vec<Rc<u64>> = (0..4).map(Rc::new).collect();
//!
//! let mut left = IdMap::new();
//! let mut right = IdMap::new();
//! for id in [0, 1, 2] {
//!     left.set(id, Rc::clone(&objects[id as usize])).unwrap();
//! }
//! for id in [2, 3] {
//!     right.set(id, Rc::clone(&objects[id as usize])).unwrap();
//! }
//!
//! let both = left.intersection_make(&right).unwrap();
//! assert_eq!(both.keys().collect::<Vec<_>>(), vec![2]);
//!
//! left.union_move(right);
//! assert_eq!(left.len(), 4);
//! assert_eq!(Rc::strong_count(&objects[2]), 3);
//! ```

mod merge;

use std::mem;

use crate::error::AllocationError;
use crate::idmap::IdMap;
use crate::idmap::node::Node;
use crate::shared::Shared;

impl<V: Shared> IdMap<V> {
    /// Moves every id of `other` into `self`.
    ///
    /// Branches of `other` are transplanted wherever `self` has none, so a
    /// union into a sparse destination reuses the consumed operand's nodes.
    ///
    /// # Panics
    ///
    /// Panics if a destination branch cannot be promoted to dense half way
    /// through the merge. `self` is then partially merged and must not be
    /// used.
    pub fn union_move(&mut self, other: Self) {
        self.absorb("union_move", other, |mine, theirs| {
            mine.union_move(theirs, "union_move");
        });
    }

    /// Returns a new map holding the ids of both maps.
    ///
    /// # Errors
    ///
    /// Returns [`AllocationError`] if the result cannot be allocated. Both
    /// operands are left untouched and every reference acquired for the
    /// partial result is released.
    pub fn union_make(&self, other: &Self) -> Result<Self, AllocationError> {
        self.make("union_make", other, Node::union_make)
    }

    /// Keeps only the ids also present in `other`.
    ///
    /// Removed values are handed to `destroy`.
    pub fn intersection_inplace<F>(&mut self, other: &Self, mut destroy: F)
    where
        F: FnMut(V),
    {
        let before = self.n;
        for (mine, theirs) in self.nodes.iter_mut().zip(other.nodes.iter()) {
            mine.intersection_inplace(theirs, &mut destroy);
        }
        self.recount("intersection_inplace", before, other.n);
    }

    /// Keeps only the ids also present in `other`, consuming it.
    ///
    /// For ids on both sides the reference from `other` is released fast.
    /// Every other value of either map is handed to `destroy`.
    pub fn intersection_move<F>(&mut self, other: Self, mut destroy: F)
    where
        F: FnMut(V),
    {
        self.absorb("intersection_move", other, |mine, theirs| {
            mine.intersection_move(theirs, &mut destroy);
        });
    }

    /// Returns a new map holding the ids present in both maps.
    ///
    /// # Errors
    ///
    /// Returns [`AllocationError`] if the result cannot be allocated; both
    /// operands are left untouched.
    pub fn intersection_make(&self, other: &Self) -> Result<Self, AllocationError> {
        self.make("intersection_make", other, Node::intersection_make)
    }

    /// Removes every id present in `other`.
    ///
    /// Removed references are released fast, since `other` keeps its own.
    pub fn difference_inplace(&mut self, other: &Self) {
        let before = self.n;
        for (mine, theirs) in self.nodes.iter_mut().zip(other.nodes.iter()) {
            mine.difference_inplace(theirs);
        }
        self.recount("difference_inplace", before, other.n);
    }

    /// Removes every id present in `other`, consuming it.
    ///
    /// For ids on both sides the destination reference is released fast and
    /// the incoming one is handed to `destroy`. Values only in `other` go to
    /// `destroy` as well.
    pub fn difference_move<F>(&mut self, other: Self, mut destroy: F)
    where
        F: FnMut(V),
    {
        self.absorb("difference_move", other, |mine, theirs| {
            mine.difference_move(theirs, &mut destroy);
        });
    }

    /// Returns a new map holding the ids of `self` absent from `other`.
    ///
    /// Subtrees that hold the same objects on both sides are skipped without
    /// visiting them.
    ///
    /// # Errors
    ///
    /// Returns [`AllocationError`] if the result cannot be allocated; both
    /// operands are left untouched.
    pub fn difference_make(&self, other: &Self) -> Result<Self, AllocationError> {
        self.make("difference_make", other, Node::difference_make)
    }

    /// Keeps the ids present in exactly one of the two maps, consuming
    /// `other`.
    ///
    /// For ids on both sides the destination reference is released fast and
    /// the incoming one is handed to `destroy`.
    ///
    /// # Panics
    ///
    /// Panics if a destination branch cannot be promoted to dense half way
    /// through the merge.
    pub fn symmetric_difference_move<F>(&mut self, other: Self, mut destroy: F)
    where
        F: FnMut(V),
    {
        self.absorb("symmetric_difference_move", other, |mine, theirs| {
            mine.symmetric_difference_move(theirs, &mut destroy, "symmetric_difference_move");
        });
    }

    /// Returns a new map holding the ids present in exactly one of the two
    /// maps.
    ///
    /// # Errors
    ///
    /// Returns [`AllocationError`] if the result cannot be allocated; both
    /// operands are left untouched.
    pub fn symmetric_difference_make(&self, other: &Self) -> Result<Self, AllocationError> {
        self.make("symmetric_difference_make", other, Node::symmetric_difference_make)
    }

    /// Merges each top-level slot of `other` into the matching slot of
    /// `self`.
    fn absorb<M>(&mut self, operation: &'static str, mut other: Self, mut merge: M)
    where
        M: FnMut(&mut Node<V>, Node<V>),
    {
        let (before, incoming) = (self.n, other.n);
        for (mine, theirs) in self.nodes.iter_mut().zip(other.nodes.iter_mut()) {
            merge(mine, mem::take(theirs));
        }
        other.n = 0;
        self.recount(operation, before, incoming);
    }

    fn make<B>(&self, operation: &'static str, other: &Self, build: B) -> Result<Self, AllocationError>
    where
        B: Fn(&Node<V>, &Node<V>) -> Result<Node<V>, AllocationError>,
    {
        let build_all = || -> Result<Self, AllocationError> {
            let mut out = Self::try_new()?;
            for (slot, (mine, theirs)) in out
                .nodes
                .iter_mut()
                .zip(self.nodes.iter().zip(other.nodes.iter()))
            {
                *slot = build(mine, theirs)?;
            }
            Ok(out)
        };

        let mut out = build_all().inspect_err(|error| {
            tracing::debug!(operation, error = %error, "Set operation failed to allocate its result");
        })?;
        out.recount(operation, self.n, other.n);
        Ok(out)
    }

    fn recount(&mut self, operation: &'static str, left: usize, right: usize) {
        self.n = self.nodes.iter().map(Node::population).sum();
        tracing::trace!(operation, left, right, len = self.n, "Set operation finished");
    }
}
