//! Trie nodes and adaptive branch sizing.
//!
//! A 64-bit id is consumed five bits at a time, least significant digit
//! first. The root slot is `id % 32`. If `id / 32` is zero the value lives in
//! that slot's node; otherwise the path continues into child digit
//! `(rest - 1) % 32` with `rest = (rest - 1) / 32`, and so on. Every node thus
//! carries the payload of exactly one id, and no path is longer than
//! [`MAX_DEPTH`] nodes.
//!
//! A node's children live in a [`Branch`]: either a single inline child
//! (`Single`) or a direct-indexed array of 32 slots (`Dense`). The first child
//! is stored as `Single`; a second distinct digit promotes the node to `Dense`.
//! Nodes never demote back to `Single`.
//!
//! `sz` counts the populated ids strictly beneath a node. A node has a branch
//! if and only if `sz > 0`; a branch emptied by removal is freed at once.

use std::mem;

use crate::error::{AllocationError, IdMapError, InsertError};
use crate::shared::Shared;

use super::alloc::{try_boxed_array, try_boxed_one};

/// Branching factor (2^5 = 32).
pub(crate) const FANOUT: usize = 32;

/// Bits of the id consumed per level.
pub(crate) const DIGIT_BITS: u32 = 5;

/// Maximum number of nodes on a root-to-leaf path (⌈64 / 5⌉).
pub(crate) const MAX_DEPTH: usize = 13;

/// A full array of child slots.
pub(crate) type Slots<V> = Box<[Node<V>; FANOUT]>;

/// Splits a path remainder into the next digit and the rest of the path.
#[inline]
pub(crate) const fn split(rest: u64) -> (usize, u64) {
    ((rest % FANOUT as u64) as usize, rest / FANOUT as u64)
}

/// Children of a node.
pub(crate) enum Branch<V> {
    /// Exactly one populated child, stored without a slot array.
    Single { digit: u8, child: Box<[Node<V>; 1]> },
    /// Direct-indexed slots; unpopulated slots hold empty nodes.
    Dense(Slots<V>),
}

/// One digit level of the trie.
pub(crate) struct Node<V> {
    /// Value stored at the id this node addresses.
    pub(crate) value: Option<V>,
    /// Number of populated ids beneath this node.
    pub(crate) sz: usize,
    pub(crate) branch: Option<Branch<V>>,
}

impl<V> Default for Node<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Node<V> {
    #[inline]
    pub(crate) const fn new() -> Self {
        Self {
            value: None,
            sz: 0,
            branch: None,
        }
    }

    /// Number of populated ids at and beneath this node.
    #[inline]
    pub(crate) const fn population(&self) -> usize {
        self.sz + self.value.is_some() as usize
    }

    #[inline]
    pub(crate) const fn is_empty(&self) -> bool {
        self.value.is_none() && self.branch.is_none()
    }

    /// Number of child slots: 32 when dense, 1 when single, 0 without a branch.
    #[inline]
    pub(crate) const fn width(&self) -> usize {
        match &self.branch {
            None => 0,
            Some(Branch::Single { .. }) => 1,
            Some(Branch::Dense(_)) => FANOUT,
        }
    }

    /// Returns the child at `digit`, or `None` when no slot holds it.
    #[inline]
    pub(crate) fn child(&self, digit: usize) -> Option<&Self> {
        match &self.branch {
            Some(Branch::Dense(slots)) => Some(&slots[digit]),
            Some(Branch::Single { digit: single, child }) if usize::from(*single) == digit => {
                Some(&child[0])
            }
            _ => None,
        }
    }

    #[inline]
    pub(crate) fn child_mut(&mut self, digit: usize) -> Option<&mut Self> {
        match &mut self.branch {
            Some(Branch::Dense(slots)) => Some(&mut slots[digit]),
            Some(Branch::Single { digit: single, child }) if usize::from(*single) == digit => {
                Some(&mut child[0])
            }
            _ => None,
        }
    }

    /// Like [`child`](Self::child), but an absent child reads as `empty`.
    ///
    /// Merges use this to treat a missing branch as a subtree with zero
    /// population instead of special-casing it.
    #[inline]
    pub(crate) fn child_or<'a>(&'a self, digit: usize, empty: &'a Self) -> &'a Self {
        self.child(digit).unwrap_or(empty)
    }

    /// Promotes a `Single` branch to `Dense`, moving its child into place.
    ///
    /// Does nothing for a node that is already dense or has no branch. On
    /// failure the node keeps its single branch.
    pub(crate) fn grow_to_dense(&mut self) -> Result<(), AllocationError> {
        if self.width() != 1 {
            return Ok(());
        }
        let Some(Branch::Single { digit, child }) = self.branch.take() else {
            return Ok(());
        };

        match try_boxed_array(|_| Self::new()) {
            Ok(mut slots) => {
                let [child] = *child;
                slots[usize::from(digit)] = child;
                self.branch = Some(Branch::Dense(slots));
                Ok(())
            }
            Err(error) => {
                self.branch = Some(Branch::Single { digit, child });
                Err(error)
            }
        }
    }

    /// Returns the slot for `digit`, allocating or promoting the branch as
    /// needed. A new slot holds an empty node.
    ///
    /// The caller must populate the slot or call [`prune`](Self::prune): a
    /// branch created here for a node with `sz == 0` only becomes valid once
    /// the returned node gains a value.
    #[allow(clippy::cast_possible_truncation)]
    pub(crate) fn slot(&mut self, digit: usize) -> Result<&mut Self, AllocationError> {
        debug_assert!(digit < FANOUT);

        if self.width() == 1 && self.child(digit).is_none() {
            self.grow_to_dense()?;
        }

        let branch = match self.branch.take() {
            Some(branch) => branch,
            None => Branch::Single {
                digit: digit as u8,
                child: try_boxed_one(Self::new())?,
            },
        };

        Ok(match self.branch.insert(branch) {
            Branch::Dense(slots) => &mut slots[digit],
            Branch::Single { child, .. } => &mut child[0],
        })
    }

    /// Stores `child` at `digit` and accounts for its population.
    ///
    /// Empty children are not stored.
    pub(crate) fn attach(&mut self, digit: usize, child: Self) -> Result<(), AllocationError> {
        let population = child.population();
        if population == 0 {
            return Ok(());
        }

        match self.slot(digit) {
            Ok(slot) => {
                debug_assert!(slot.is_empty());
                *slot = child;
                self.sz += population;
                Ok(())
            }
            Err(error) => {
                self.prune();
                Err(error)
            }
        }
    }

    /// Removes and returns the child at `digit`, leaving an empty slot.
    ///
    /// Population counts are not adjusted; the caller either recounts or is
    /// discarding this node.
    pub(crate) fn take_child(&mut self, digit: usize) -> Option<Self> {
        if self.width() == 1 {
            self.child(digit)?;
            let Some(Branch::Single { child, .. }) = self.branch.take() else {
                return None;
            };
            let [child] = *child;
            return Some(child);
        }

        let taken = mem::take(self.child_mut(digit)?);
        (!taken.is_empty()).then_some(taken)
    }

    /// Frees the branch of a node whose subtree has become empty.
    #[inline]
    pub(crate) fn prune(&mut self) {
        if self.sz == 0 {
            self.branch = None;
        }
    }

    /// Recomputes `sz` from the children, then prunes.
    pub(crate) fn recount(&mut self) {
        self.sz = self.children().map(|(_, child)| child.population()).sum();
        self.prune();
    }

    /// Iterates the non-empty children in ascending digit order.
    #[inline]
    pub(crate) fn children(&self) -> Children<'_, V> {
        match &self.branch {
            None => Children::Done,
            Some(Branch::Single { digit, child }) => {
                Children::Single(Some((usize::from(*digit), &child[0])))
            }
            Some(Branch::Dense(slots)) => Children::Dense(slots.iter().enumerate()),
        }
    }

    /// Applies `visit` to every non-empty child, then recounts and prunes.
    pub(crate) fn update_children(&mut self, mut visit: impl FnMut(usize, &mut Self)) {
        match &mut self.branch {
            None => return,
            Some(Branch::Single { digit, child }) => visit(usize::from(*digit), &mut child[0]),
            Some(Branch::Dense(slots)) => {
                for (digit, child) in slots.iter_mut().enumerate() {
                    if !child.is_empty() {
                        visit(digit, child);
                    }
                }
            }
        }
        self.recount();
    }

    /// Splits the node into its value and its non-empty children.
    pub(crate) fn into_parts(self) -> (Option<V>, usize, IntoChildren<V>) {
        let children = match self.branch {
            None => IntoChildren::Done,
            Some(Branch::Single { digit, child }) => {
                let [child] = *child;
                IntoChildren::Single(Some((usize::from(digit), child)))
            }
            Some(Branch::Dense(slots)) => IntoChildren::Dense((*slots).into_iter().enumerate()),
        };
        (self.value, self.sz, children)
    }

    /// Hands every value at and beneath this node to `destroy`.
    pub(crate) fn destroy_into<F>(self, destroy: &mut F)
    where
        F: FnMut(V) + ?Sized,
    {
        let (value, _, children) = self.into_parts();
        if let Some(value) = value {
            destroy(value);
        }
        for (_, child) in children {
            child.destroy_into(destroy);
        }
    }

    /// Stores `value` at the path `rest` below this node.
    ///
    /// With `overwrite` unset an occupied id is rejected. On any error the
    /// node holds the same ids as before the call; at most a branch has been
    /// promoted to dense along the way.
    pub(crate) fn insert(
        &mut self,
        rest: u64,
        value: V,
        overwrite: bool,
    ) -> Result<Option<V>, InsertError<V>> {
        if rest == 0 {
            if self.value.is_some() && !overwrite {
                return Err(InsertError::new(IdMapError::KeyExists, value));
            }
            return Ok(self.value.replace(value));
        }

        let (digit, rest) = split(rest - 1);
        let result = match self.slot(digit) {
            Ok(child) => child.insert(rest, value, overwrite),
            Err(error) => Err(InsertError::new(error.into(), value)),
        };

        match &result {
            Ok(None) => self.sz += 1,
            Ok(Some(_)) => {}
            Err(_) => self.prune(),
        }
        result
    }

    /// Returns the value at the path `rest` below this node.
    pub(crate) fn get(&self, mut rest: u64) -> Option<&V> {
        let mut node = self;
        while rest != 0 {
            let (digit, next) = split(rest - 1);
            node = node.child(digit)?;
            rest = next;
        }
        node.value.as_ref()
    }

    pub(crate) fn get_mut(&mut self, mut rest: u64) -> Option<&mut V> {
        let mut node = self;
        while rest != 0 {
            let (digit, next) = split(rest - 1);
            node = node.child_mut(digit)?;
            rest = next;
        }
        node.value.as_mut()
    }

    /// Removes the value at the path `rest`, freeing branches that empty out
    /// on the way back up.
    pub(crate) fn pop(&mut self, rest: u64) -> Option<V> {
        if rest == 0 {
            return self.value.take();
        }

        let (digit, rest) = split(rest - 1);
        let value = self.child_mut(digit)?.pop(rest)?;
        self.sz -= 1;
        self.prune();
        Some(value)
    }
}

impl<V: Shared> Node<V> {
    /// Deep copy that acquires one reference per value.
    pub(crate) fn try_duplicate(&self) -> Result<Self, AllocationError> {
        let mut copy = Self {
            value: self.value.as_ref().map(Shared::acquire),
            sz: 0,
            branch: None,
        };

        match &self.branch {
            None => {}
            Some(Branch::Single { digit, child }) => {
                copy.branch = Some(Branch::Single {
                    digit: *digit,
                    child: try_boxed_one(child[0].try_duplicate()?)?,
                });
                copy.sz = self.sz;
            }
            Some(Branch::Dense(slots)) => {
                let mut copies: Slots<V> = try_boxed_array(|_| Self::new())?;
                for (digit, child) in slots.iter().enumerate() {
                    if !child.is_empty() {
                        copies[digit] = child.try_duplicate()?;
                    }
                }
                copy.branch = Some(Branch::Dense(copies));
                copy.sz = self.sz;
            }
        }
        Ok(copy)
    }

    /// Identity-based equality of two subtrees.
    ///
    /// Equal subtrees hold the same object at every id, with matching
    /// populations at every level. Single and dense branches with the same
    /// populated children compare equal.
    pub(crate) fn structural_eq(&self, other: &Self) -> bool {
        if self.sz != other.sz {
            return false;
        }

        let same_value = match (&self.value, &other.value) {
            (Some(left), Some(right)) => left.same(right),
            (None, None) => true,
            _ => false,
        };
        if !same_value {
            return false;
        }

        // With equal `sz`, matching every child of `self` leaves nothing
        // populated on the other side.
        let empty = Self::new();
        self.children()
            .all(|(digit, child)| child.structural_eq(other.child_or(digit, &empty)))
    }
}

/// Borrowing iterator over the non-empty children of a node.
pub(crate) enum Children<'a, V> {
    Done,
    Single(Option<(usize, &'a Node<V>)>),
    Dense(std::iter::Enumerate<std::slice::Iter<'a, Node<V>>>),
}

impl<'a, V> Iterator for Children<'a, V> {
    type Item = (usize, &'a Node<V>);

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Self::Done => None,
            Self::Single(child) => child.take(),
            Self::Dense(slots) => slots.find(|(_, child)| !child.is_empty()),
        }
    }
}

/// Consuming iterator over the non-empty children of a node.
pub(crate) enum IntoChildren<V> {
    Done,
    Single(Option<(usize, Node<V>)>),
    Dense(std::iter::Enumerate<std::array::IntoIter<Node<V>, FANOUT>>),
}

impl<V> Iterator for IntoChildren<V> {
    type Item = (usize, Node<V>);

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Self::Done => None,
            Self::Single(child) => child.take(),
            Self::Dense(slots) => slots.find(|(_, child)| !child.is_empty()),
        }
    }
}
