//! Sparse radix trie keyed by 64-bit object ids.
//!
//! This module provides [`IdMap`], a map from `u64` ids to values that is
//! built for collections of objects addressed by their unique id.
//!
//! # Overview
//!
//! The map is a radix-32 trie over the id's digits, least significant digit
//! first. The top level is always a full array of 32 slots, since the low
//! digit of real-world ids is well distributed. Below it, every node starts
//! with a single inline child and is promoted to a 32-slot array when a
//! second child appears. Branches that empty out are freed immediately.
//!
//! - O(13) `set`, `add`, `get` and `pop`
//! - O(1) `len` and `is_empty`
//! - O(n) `walk`, `iter` and `to_vec`
//!
//! Iteration order depends on the digits of each id, least significant
//! first, and is **not** ascending id order.
//!
//! # Examples
//!
//! ```rust
//! use id_trie::IdMap;
//!
//! let mut things = IdMap::new();
//! things.set(1, "one").unwrap();
//! things.set(33, "thirty-three").unwrap();
//! things.add(1000, "thousand").unwrap();
//!
//! assert_eq!(things.len(), 3);
//! assert_eq!(things.get(33), Some(&"thirty-three"));
//! assert_eq!(things.pop(1), Some("one"));
//! assert_eq!(things.get(1), None);
//! ```
//!
//! # Concurrency
//!
//! There is no internal synchronisation. `&mut self` receivers make every
//! mutation exclusive; callers sharing a map across threads wrap it in their
//! own lock.

mod iter;
pub(crate) mod node;

pub(crate) mod alloc;

use std::fmt;
use std::ops::ControlFlow;

use crate::error::{AllocationError, IdMapError, InsertError};
use crate::shared::Shared;

use self::alloc::try_boxed_array;
use self::node::{DIGIT_BITS, FANOUT, Node, Slots, split};

pub use self::iter::{Iter, Keys, Values};

/// A map from 64-bit ids to values, stored as a sparse radix-32 trie.
///
/// # Time Complexity
///
/// | Operation           | Complexity            |
/// |---------------------|-----------------------|
/// | `new`               | O(1)                  |
/// | `set` / `add`       | O(13)                 |
/// | `get` / `pop`       | O(13)                 |
/// | `len` / `is_empty`  | O(1)                  |
/// | `walk` / `iter`     | O(n)                  |
/// | `unused_id`         | O(1) typical, O(n) worst |
///
/// # Examples
///
/// ```rust
/// use std::rc::Rc;
/// use id_trie::IdMap;
///
/// let thing = Rc::new("thing");
/// let mut map = IdMap::new();
/// map.set(42, Rc::clone(&thing)).unwrap();
///
/// assert!(map.contains_key(42));
/// assert_eq!(Rc::strong_count(&thing), 2);
/// ```
pub struct IdMap<V> {
    pub(crate) nodes: Slots<V>,
    pub(crate) n: usize,
}

static_assertions::assert_impl_all!(IdMap<std::sync::Arc<u64>>: Send, Sync);
static_assertions::assert_not_impl_any!(IdMap<std::rc::Rc<u64>>: Send, Sync);

impl<V> IdMap<V> {
    /// Creates an empty map.
    ///
    /// Allocation failure of the top-level slot array aborts, like any other
    /// infallible allocation. Use [`try_new`](Self::try_new) to observe it.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: Box::new(std::array::from_fn(|_| Node::new())),
            n: 0,
        }
    }

    /// Creates an empty map, reporting allocation failure.
    ///
    /// # Errors
    ///
    /// Returns [`AllocationError`] if the top-level slots cannot be allocated.
    pub fn try_new() -> Result<Self, AllocationError> {
        Ok(Self {
            nodes: try_boxed_array(|_| Node::new())?,
            n: 0,
        })
    }

    /// Returns the number of ids stored in the map.
    #[inline]
    pub const fn len(&self) -> usize {
        self.n
    }

    /// Returns `true` if the map stores no ids.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Removes every value, keeping the top-level slots for reuse.
    pub fn clear(&mut self) {
        self.clear_with(drop);
    }

    /// Removes every value, handing each one to `destroy`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use id_trie::IdMap;
    ///
    /// let mut map = IdMap::new();
    /// map.set(1, 10).unwrap();
    /// map.set(2, 20).unwrap();
    ///
    /// let mut released = Vec::new();
    /// map.clear_with(|value| released.push(value));
    /// released.sort_unstable();
    ///
    /// assert!(map.is_empty());
    /// assert_eq!(released, vec![10, 20]);
    /// ```
    pub fn clear_with<F>(&mut self, mut destroy: F)
    where
        F: FnMut(V),
    {
        if self.n == 0 {
            return;
        }
        for node in self.nodes.iter_mut() {
            std::mem::take(node).destroy_into(&mut destroy);
        }
        self.n = 0;
    }

    /// Destroys the map, handing every value to `destroy`.
    ///
    /// Dropping the map instead drops each value in place.
    pub fn destroy_with<F>(mut self, destroy: F)
    where
        F: FnMut(V),
    {
        self.clear_with(destroy);
    }

    /// Stores `value` at `id`, returning the value it replaced.
    ///
    /// # Errors
    ///
    /// Returns an [`InsertError`] carrying `value` back if a branch array
    /// cannot be allocated. The map is unchanged in that case.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use id_trie::IdMap;
    ///
    /// let mut map = IdMap::new();
    /// assert_eq!(map.set(5, "a").unwrap(), None);
    /// assert_eq!(map.set(5, "b").unwrap(), Some("a"));
    /// assert_eq!(map.len(), 1);
    /// ```
    pub fn set(&mut self, id: u64, value: V) -> Result<Option<V>, InsertError<V>> {
        let (slot, rest) = split(id);
        let previous = self.nodes[slot]
            .insert(rest, value, true)
            .inspect_err(|_| tracing::debug!(id, "Set failed to allocate a branch"))?;
        if previous.is_none() {
            self.n += 1;
        }
        Ok(previous)
    }

    /// Stores `value` at `id` unless a value is already present.
    ///
    /// # Errors
    ///
    /// Returns an [`InsertError`] carrying `value` back with
    /// [`IdMapError::KeyExists`] if `id` is occupied, or
    /// [`IdMapError::Allocation`] if a branch array cannot be allocated. The
    /// map is unchanged in both cases.
    pub fn add(&mut self, id: u64, value: V) -> Result<(), InsertError<V>> {
        let (slot, rest) = split(id);
        self.nodes[slot]
            .insert(rest, value, false)
            .inspect_err(|error| {
                if error.error() == IdMapError::Allocation {
                    tracing::debug!(id, "Add failed to allocate a branch");
                }
            })?;
        self.n += 1;
        Ok(())
    }

    /// Returns the value stored at `id`.
    #[inline]
    pub fn get(&self, id: u64) -> Option<&V> {
        let (slot, rest) = split(id);
        self.nodes[slot].get(rest)
    }

    /// Returns a mutable reference to the value stored at `id`.
    #[inline]
    pub fn get_mut(&mut self, id: u64) -> Option<&mut V> {
        let (slot, rest) = split(id);
        self.nodes[slot].get_mut(rest)
    }

    /// Returns `true` if a value is stored at `id`.
    #[inline]
    pub fn contains_key(&self, id: u64) -> bool {
        self.get(id).is_some()
    }

    /// Removes and returns the value stored at `id`.
    ///
    /// Branches left empty by the removal are freed.
    pub fn pop(&mut self, id: u64) -> Option<V> {
        let (slot, rest) = split(id);
        let value = self.nodes[slot].pop(rest)?;
        self.n -= 1;
        Some(value)
    }

    /// Calls `visit` on every value, stopping at the first `Break`.
    ///
    /// Returns the `Break` that stopped the walk, or `Continue(())` once every
    /// value has been visited.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::ops::ControlFlow;
    /// use id_trie::IdMap;
    ///
    /// let mut map = IdMap::new();
    /// for id in 0..10 {
    ///     map.set(id, id * 10).unwrap();
    /// }
    ///
    /// let found = map.walk(|value| {
    ///     if *value == 70 { ControlFlow::Break(*value) } else { ControlFlow::Continue(()) }
    /// });
    /// assert_eq!(found, ControlFlow::Break(70));
    /// ```
    pub fn walk<'a, B, F>(&'a self, mut visit: F) -> ControlFlow<B>
    where
        F: FnMut(&'a V) -> ControlFlow<B>,
    {
        if self.n == 0 {
            return ControlFlow::Continue(());
        }
        self.nodes.iter().try_for_each(|node| walk_node(node, &mut visit))
    }

    /// Like [`walk`](Self::walk), with mutable access to every value.
    pub fn walk_mut<B, F>(&mut self, mut visit: F) -> ControlFlow<B>
    where
        F: FnMut(&mut V) -> ControlFlow<B>,
    {
        if self.n == 0 {
            return ControlFlow::Continue(());
        }
        self.nodes
            .iter_mut()
            .try_for_each(|node| walk_node_mut(node, &mut visit))
    }

    /// Walks values while `budget` lasts.
    ///
    /// Each call of `visit` returns how much of the budget it consumed; the
    /// walk stops once `budget` reaches zero or every value was visited. This
    /// pages through a map by cost ("until N bytes were written") rather than
    /// by count.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use id_trie::IdMap;
    ///
    /// let mut map = IdMap::new();
    /// for id in 0..10 {
    ///     map.set(id, "xx").unwrap();
    /// }
    ///
    /// let mut budget = 7;
    /// let mut visited = 0;
    /// map.walkn(&mut budget, |value| {
    ///     visited += 1;
    ///     value.len()
    /// });
    /// assert_eq!(budget, 0);
    /// assert_eq!(visited, 4);
    /// ```
    pub fn walkn<F>(&self, budget: &mut usize, mut visit: F)
    where
        F: FnMut(&V) -> usize,
    {
        if self.n == 0 {
            return;
        }
        for node in self.nodes.iter() {
            if *budget == 0 {
                return;
            }
            walkn_node(node, budget, &mut visit);
        }
    }

    /// Returns an iterator over `(id, &value)` pairs in walk order.
    #[inline]
    pub fn iter(&self) -> Iter<'_, V> {
        Iter::new(&self.nodes[..], self.n)
    }

    /// Returns an iterator over the ids in walk order.
    #[inline]
    pub fn keys(&self) -> Keys<'_, V> {
        Keys { inner: self.iter() }
    }

    /// Returns an iterator over the values in walk order.
    #[inline]
    pub fn values(&self) -> Values<'_, V> {
        Values { inner: self.iter() }
    }

    /// Collects references to every value, in walk order.
    ///
    /// Reference counts are not touched.
    ///
    /// # Errors
    ///
    /// Returns [`AllocationError`] if the vector cannot be allocated.
    pub fn to_vec(&self) -> Result<Vec<&V>, AllocationError> {
        let mut values = Vec::new();
        alloc::try_reserve(&mut values, self.n)?;
        values.extend(self.values());
        Ok(values)
    }

    /// Returns some id below `max` that holds no value.
    ///
    /// The top-level slots are tried first, then deeper levels. The result
    /// is **not** guaranteed to be the smallest free id. Returns `max` when
    /// every id below `max` is taken, which requires `len() >= max`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use id_trie::IdMap;
    ///
    /// let mut map = IdMap::new();
    /// for id in 0..40 {
    ///     map.set(id, ()).unwrap();
    /// }
    /// map.pop(35);
    ///
    /// let id = map.unused_id(100);
    /// assert!(id < 100);
    /// assert!(!map.contains_key(id));
    /// ```
    pub fn unused_id(&self, max: u64) -> u64 {
        if self.n == 0 {
            return 0;
        }

        let top = max.min(FANOUT as u64);
        if let Some(id) = (0..top).find(|&id| self.nodes[id as usize].value.is_none()) {
            return id;
        }

        self.nodes
            .iter()
            .enumerate()
            .find_map(|(slot, node)| unused_below(node, slot as u64, DIGIT_BITS, max))
            .unwrap_or(max)
    }
}

impl<V: Shared> IdMap<V> {
    /// Collects every value in walk order, acquiring one reference each.
    ///
    /// The snapshot stays valid while the map is mutated, which makes it
    /// safe to process values whose handling removes other values from this
    /// same map. Every returned handle is an extra reference the caller must
    /// release.
    ///
    /// # Errors
    ///
    /// Returns [`AllocationError`] if the vector cannot be allocated; no
    /// reference has been acquired in that case.
    pub fn to_vec_with_refs(&self) -> Result<Vec<V>, AllocationError> {
        let mut values = Vec::new();
        alloc::try_reserve(&mut values, self.n)?;
        values.extend(self.values().map(Shared::acquire));
        Ok(values)
    }

    /// Identity-based equality.
    ///
    /// Two maps are equal when every id holds the *same object* in both,
    /// judged by [`Shared::same`]; values are never compared by content.
    pub fn structural_eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other)
            || (self.n == other.n
                && (self.n == 0
                    || self
                        .nodes
                        .iter()
                        .zip(other.nodes.iter())
                        .all(|(left, right)| left.structural_eq(right))))
    }
}

fn walk_node<'a, V, B, F>(node: &'a Node<V>, visit: &mut F) -> ControlFlow<B>
where
    F: FnMut(&'a V) -> ControlFlow<B>,
{
    if let Some(value) = &node.value
        && let ControlFlow::Break(found) = visit(value)
    {
        return ControlFlow::Break(found);
    }
    node.children()
        .try_for_each(|(_, child)| walk_node(child, &mut *visit))
}

fn walk_node_mut<V, B, F>(node: &mut Node<V>, visit: &mut F) -> ControlFlow<B>
where
    F: FnMut(&mut V) -> ControlFlow<B>,
{
    if let Some(value) = &mut node.value
        && let ControlFlow::Break(found) = visit(value)
    {
        return ControlFlow::Break(found);
    }
    match &mut node.branch {
        None => ControlFlow::Continue(()),
        Some(node::Branch::Single { child, .. }) => walk_node_mut(&mut child[0], visit),
        Some(node::Branch::Dense(slots)) => slots
            .iter_mut()
            .filter(|child| !child.is_empty())
            .try_for_each(|child| walk_node_mut(child, &mut *visit)),
    }
}

fn walkn_node<V, F>(node: &Node<V>, budget: &mut usize, visit: &mut F)
where
    F: FnMut(&V) -> usize,
{
    if let Some(value) = &node.value {
        *budget = budget.saturating_sub(visit(value));
    }
    for (_, child) in node.children() {
        if *budget == 0 {
            return;
        }
        walkn_node(child, budget, visit);
    }
}

/// Searches the subtree of `node`, which addresses `id`, for a free id below
/// `max`. Children one level down are tried before descending further.
fn unused_below<V>(node: &Node<V>, id: u64, shift: u32, max: u64) -> Option<u64> {
    let child_ids = (0..FANOUT)
        .map(|digit| (digit, u128::from(id) + ((digit as u128 + 1) << shift)))
        .take_while(|&(_, child_id)| child_id < u128::from(max))
        .map(|(digit, child_id)| (digit, child_id as u64));

    for (digit, child_id) in child_ids.clone() {
        if node.child(digit).is_none_or(|child| child.value.is_none()) {
            return Some(child_id);
        }
    }

    child_ids
        .filter_map(|(digit, child_id)| node.child(digit).map(|child| (child, child_id)))
        .find_map(|(child, child_id)| unused_below(child, child_id, shift + DIGIT_BITS, max))
}

impl<V> Default for IdMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Shared> PartialEq for IdMap<V> {
    fn eq(&self, other: &Self) -> bool {
        self.structural_eq(other)
    }
}

impl<V: Shared> Eq for IdMap<V> {}

impl<V: fmt::Debug> fmt::Debug for IdMap<V> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_map().entries(self.iter()).finish()
    }
}

impl<'a, V> IntoIterator for &'a IdMap<V> {
    type Item = (u64, &'a V);
    type IntoIter = Iter<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Inserts every pair with [`IdMap::set`]; later pairs replace earlier ones.
///
/// Like `Vec`'s `Extend`, this path treats allocation failure as fatal and
/// calls [`std::alloc::handle_alloc_error`].
impl<V> Extend<(u64, V)> for IdMap<V> {
    fn extend<I: IntoIterator<Item = (u64, V)>>(&mut self, iter: I) {
        for (id, value) in iter {
            if self.set(id, value).is_err() {
                std::alloc::handle_alloc_error(std::alloc::Layout::new::<[Node<V>; FANOUT]>());
            }
        }
    }
}

impl<V> FromIterator<(u64, V)> for IdMap<V> {
    fn from_iter<I: IntoIterator<Item = (u64, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        map.extend(iter);
        map
    }
}

#[cfg(feature = "serde")]
impl<V: serde::Serialize> serde::Serialize for IdMap<V> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (id, value) in self {
            map.serialize_entry(&id, value)?;
        }
        map.end()
    }
}

#[cfg(feature = "serde")]
struct IdMapVisitor<V> {
    marker: std::marker::PhantomData<V>,
}

#[cfg(feature = "serde")]
impl<'de, V> serde::de::Visitor<'de> for IdMapVisitor<V>
where
    V: serde::Deserialize<'de>,
{
    type Value = IdMap<V>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a map from integer ids to values")
    }

    fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
    where
        A: serde::de::MapAccess<'de>,
    {
        let mut map = IdMap::try_new().map_err(serde::de::Error::custom)?;
        while let Some((id, value)) = access.next_entry::<u64, V>()? {
            map.set(id, value)
                .map_err(|error| serde::de::Error::custom(error.error()))?;
        }
        Ok(map)
    }
}

#[cfg(feature = "serde")]
impl<'de, V> serde::Deserialize<'de> for IdMap<V>
where
    V: serde::Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_map(IdMapVisitor {
            marker: std::marker::PhantomData,
        })
    }
}
