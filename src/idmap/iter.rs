//! Iterators over an [`IdMap`](super::IdMap).
//!
//! Iteration follows walk order: for every digit in ascending order, a
//! node's value comes before the values beneath it. Walk order is *not*
//! ascending id order.

use std::iter::{Enumerate, FusedIterator};
use std::slice;

use arrayvec::ArrayVec;

use super::node::{Children, DIGIT_BITS, MAX_DEPTH, Node};

struct Frame<'a, V> {
    children: Children<'a, V>,
    /// Id addressed by the node whose children are being visited.
    id: u64,
    /// Weight of the next digit.
    shift: u32,
}

/// Iterator over `(id, &value)` pairs, created by
/// [`IdMap::iter`](super::IdMap::iter).
pub struct Iter<'a, V> {
    roots: Enumerate<slice::Iter<'a, Node<V>>>,
    stack: ArrayVec<Frame<'a, V>, MAX_DEPTH>,
    remaining: usize,
}

impl<'a, V> Iter<'a, V> {
    pub(super) fn new(roots: &'a [Node<V>], len: usize) -> Self {
        Self {
            roots: roots.iter().enumerate(),
            stack: ArrayVec::new(),
            remaining: len,
        }
    }

    fn enter(&mut self, node: &'a Node<V>, id: u64, shift: u32) -> Option<(u64, &'a V)> {
        if node.branch.is_some() {
            self.stack.push(Frame {
                children: node.children(),
                id,
                shift,
            });
        }

        let value = node.value.as_ref()?;
        self.remaining -= 1;
        Some((id, value))
    }
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = (u64, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let Some(frame) = self.stack.last_mut() else {
                let (slot, node) = self.roots.next()?;
                if let Some(entry) = self.enter(node, slot as u64, DIGIT_BITS) {
                    return Some(entry);
                }
                continue;
            };

            match frame.children.next() {
                Some((digit, child)) => {
                    let id = frame.id + ((digit as u64 + 1) << frame.shift);
                    let shift = frame.shift + DIGIT_BITS;
                    if let Some(entry) = self.enter(child, id, shift) {
                        return Some(entry);
                    }
                }
                None => {
                    self.stack.pop();
                }
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<V> ExactSizeIterator for Iter<'_, V> {
    fn len(&self) -> usize {
        self.remaining
    }
}

impl<V> FusedIterator for Iter<'_, V> {}

/// Iterator over the ids of an [`IdMap`](super::IdMap), in walk order.
pub struct Keys<'a, V> {
    pub(super) inner: Iter<'a, V>,
}

impl<V> Iterator for Keys<'_, V> {
    type Item = u64;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(id, _)| id)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<V> ExactSizeIterator for Keys<'_, V> {}

impl<V> FusedIterator for Keys<'_, V> {}

/// Iterator over the values of an [`IdMap`](super::IdMap), in walk order.
pub struct Values<'a, V> {
    pub(super) inner: Iter<'a, V>,
}

impl<'a, V> Iterator for Values<'a, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, value)| value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<V> ExactSizeIterator for Values<'_, V> {}

impl<V> FusedIterator for Values<'_, V> {}
