//! Per-node merge recursion for the set-algebra engine.
//!
//! Make merges read both subtrees and build a third one out of duplicated
//! references; an allocation error drops the partial output, which releases
//! everything acquired so far. Move and in-place merges rewrite the
//! destination node directly.

use std::mem;

use crate::error::AllocationError;
use crate::idmap::node::{FANOUT, Node};
use crate::shared::{Shared, release_pair};

/// Reports a promotion failure in the middle of a move merge.
///
/// The destination has already absorbed part of the consumed operand at this
/// point and cannot be restored.
#[cold]
#[inline(never)]
pub(super) fn merge_allocation_failed(operation: &'static str, error: AllocationError) -> ! {
    tracing::error!(
        operation,
        error = %error,
        "Allocation failed mid-merge, destination map is partially merged"
    );
    panic!("{operation}: {error} while merging into the destination map");
}

impl<V: Shared> Node<V> {
    /// Pairs up the children of two nodes digit by digit, skipping digits
    /// where both sides are empty.
    fn child_pairs<'a>(
        &'a self,
        other: &'a Self,
        empty: &'a Self,
    ) -> impl Iterator<Item = (usize, &'a Self, &'a Self)> {
        let digits = if self.branch.is_none() && other.branch.is_none() {
            0
        } else {
            FANOUT
        };
        (0..digits)
            .map(move |digit| (digit, self.child_or(digit, empty), other.child_or(digit, empty)))
            .filter(|(_, mine, theirs)| !(mine.is_empty() && theirs.is_empty()))
    }

    pub(super) fn union_make(&self, other: &Self) -> Result<Self, AllocationError> {
        let mut out = Self {
            value: self.value.as_ref().or(other.value.as_ref()).map(Shared::acquire),
            ..Self::new()
        };

        let empty = Self::new();
        for (digit, mine, theirs) in self.child_pairs(other, &empty) {
            let child = if theirs.is_empty() {
                mine.try_duplicate()?
            } else if mine.is_empty() {
                theirs.try_duplicate()?
            } else {
                mine.union_make(theirs)?
            };
            out.attach(digit, child)?;
        }
        Ok(out)
    }

    pub(super) fn intersection_make(&self, other: &Self) -> Result<Self, AllocationError> {
        let mut out = Self {
            value: self
                .value
                .as_ref()
                .filter(|_| other.value.is_some())
                .map(Shared::acquire),
            ..Self::new()
        };

        let empty = Self::new();
        for (digit, mine, theirs) in self.child_pairs(other, &empty) {
            if mine.is_empty() || theirs.is_empty() {
                continue;
            }
            out.attach(digit, mine.intersection_make(theirs)?)?;
        }
        Ok(out)
    }

    pub(super) fn difference_make(&self, other: &Self) -> Result<Self, AllocationError> {
        let mut out = Self {
            value: self
                .value
                .as_ref()
                .filter(|_| other.value.is_none())
                .map(Shared::acquire),
            ..Self::new()
        };

        let empty = Self::new();
        for (digit, mine, theirs) in self.child_pairs(other, &empty) {
            if mine.is_empty() || mine.structural_eq(theirs) {
                continue;
            }
            let child = if theirs.is_empty() {
                mine.try_duplicate()?
            } else {
                mine.difference_make(theirs)?
            };
            out.attach(digit, child)?;
        }
        Ok(out)
    }

    pub(super) fn symmetric_difference_make(&self, other: &Self) -> Result<Self, AllocationError> {
        let value = match (&self.value, &other.value) {
            (Some(only), None) | (None, Some(only)) => Some(only.acquire()),
            _ => None,
        };
        let mut out = Self {
            value,
            ..Self::new()
        };

        let empty = Self::new();
        for (digit, mine, theirs) in self.child_pairs(other, &empty) {
            let child = if theirs.is_empty() {
                mine.try_duplicate()?
            } else if mine.is_empty() {
                theirs.try_duplicate()?
            } else if mine.structural_eq(theirs) {
                continue;
            } else {
                mine.symmetric_difference_make(theirs)?
            };
            out.attach(digit, child)?;
        }
        Ok(out)
    }

    /// Moves every id of `other` into `self`.
    ///
    /// A value present on both sides keeps the destination's reference and
    /// fast-releases the incoming one.
    ///
    /// # Panics
    ///
    /// Panics if a destination branch cannot be promoted to dense.
    pub(super) fn union_move(&mut self, mut other: Self, operation: &'static str) {
        if let Some(incoming) = other.value.take() {
            if self.value.is_some() {
                incoming.release_fast();
            } else {
                self.value = Some(incoming);
            }
        }

        if self.branch.is_none() {
            self.branch = other.branch.take();
            self.sz = other.sz;
            return;
        }

        let (_, _, children) = other.into_parts();
        for (digit, child) in children {
            let slot = self
                .slot(digit)
                .unwrap_or_else(|error| merge_allocation_failed(operation, error));
            let before = slot.population();
            slot.union_move(child, operation);
            let after = slot.population();
            self.sz = self.sz + after - before;
        }
    }

    /// Keeps the ids present on exactly one side, consuming `other`.
    ///
    /// # Panics
    ///
    /// Panics if a destination branch cannot be promoted to dense.
    pub(super) fn symmetric_difference_move<F>(
        &mut self,
        mut other: Self,
        destroy: &mut F,
        operation: &'static str,
    ) where
        F: FnMut(V) + ?Sized,
    {
        if let Some(incoming) = other.value.take() {
            match self.value.take() {
                Some(kept) => release_pair(kept, incoming, destroy),
                None => self.value = Some(incoming),
            }
        }

        if self.branch.is_none() {
            self.branch = other.branch.take();
            self.sz = other.sz;
            return;
        }

        let (_, _, children) = other.into_parts();
        for (digit, child) in children {
            let slot = self
                .slot(digit)
                .unwrap_or_else(|error| merge_allocation_failed(operation, error));
            let before = slot.population();
            slot.symmetric_difference_move(child, &mut *destroy, operation);
            let after = slot.population();
            self.sz = self.sz - before + after;
        }
        self.prune();
    }

    /// Keeps the ids present on both sides, consuming `other`.
    pub(super) fn intersection_move<F>(&mut self, mut other: Self, destroy: &mut F)
    where
        F: FnMut(V) + ?Sized,
    {
        match (self.value.take(), other.value.take()) {
            (Some(kept), Some(incoming)) => {
                incoming.release_fast();
                self.value = Some(kept);
            }
            (Some(only), None) | (None, Some(only)) => destroy(only),
            (None, None) => {}
        }

        self.update_children(|digit, child| match other.take_child(digit) {
            Some(incoming) => child.intersection_move(incoming, &mut *destroy),
            None => mem::take(child).destroy_into(&mut *destroy),
        });
        other.destroy_into(destroy);
    }

    /// Removes the ids present in `other`, consuming it.
    pub(super) fn difference_move<F>(&mut self, mut other: Self, destroy: &mut F)
    where
        F: FnMut(V) + ?Sized,
    {
        match (self.value.take(), other.value.take()) {
            (Some(kept), Some(incoming)) => release_pair(kept, incoming, destroy),
            (kept, incoming) => {
                self.value = kept;
                if let Some(incoming) = incoming {
                    destroy(incoming);
                }
            }
        }

        if other.sz > 0 {
            self.update_children(|digit, child| {
                if let Some(incoming) = other.take_child(digit) {
                    child.difference_move(incoming, &mut *destroy);
                }
            });
        }
        other.destroy_into(destroy);
    }

    /// Keeps the ids also present in `other`, destroying the rest.
    pub(super) fn intersection_inplace<F>(&mut self, other: &Self, destroy: &mut F)
    where
        F: FnMut(V) + ?Sized,
    {
        if other.value.is_none()
            && let Some(only) = self.value.take()
        {
            destroy(only);
        }

        self.update_children(|digit, child| match other.child(digit) {
            Some(theirs) if !theirs.is_empty() => child.intersection_inplace(theirs, &mut *destroy),
            _ => mem::take(child).destroy_into(&mut *destroy),
        });
    }

    /// Removes the ids present in `other`.
    ///
    /// Every removed reference is fast-released: `other` still holds the
    /// same object.
    pub(super) fn difference_inplace(&mut self, other: &Self) {
        if other.value.is_some()
            && let Some(kept) = self.value.take()
        {
            kept.release_fast();
        }

        if other.sz == 0 {
            return;
        }
        self.update_children(|digit, child| {
            if let Some(theirs) = other.child(digit)
                && !theirs.is_empty()
            {
                child.difference_inplace(theirs);
            }
        });
    }
}
