//! An always-sorted, duplicate-free skiplist with rank access.

use std::{borrow::Borrow, cmp::Ordering, fmt, hash, hash::Hash, iter, ops};

use tracing::{debug, trace};

use crate::{
    level_generator::{
        Geometric, GeometricError, LevelGenerator,
        geometric::DEFAULT_P,
        height_for,
    },
    skipnode::{HEAD, Link, NodeArena, NodeId, SkipNode},
};

// ////////////////////////////////////////////////////////////////////////////
// RankedSkipList
// ////////////////////////////////////////////////////////////////////////////

/// The ranked skiplist stores a set of elements in ascending order and, on top
/// of the usual `$O(\log n)$` expected search, insertion and removal, provides
/// `$O(\log n)$` expected access by index.
///
/// Every forward link records its *width*: the number of level-0 steps it
/// jumps over. Summing widths along a search path gives the rank of the node
/// reached, which is what makes [`get`][RankedSkipList::get] and
/// [`index_of`][RankedSkipList::index_of] logarithmic.
///
/// Elements are ordered by their [`Ord`] implementation and an element equal
/// to one already present is never stored twice. Custom orderings can be had
/// through a wrapper type such as [`std::cmp::Reverse`].
///
/// Nodes are kept in an arena and refer to each other by index, so the list
/// contains no `unsafe` code and no node can outlive the list.
#[derive(Clone)]
pub struct RankedSkipList<T, G = Geometric> {
    /// Every node, with the head sentinel in the first slot.
    nodes: NodeArena<T>,
    /// The number of levels currently in use; always in `[1, max_height]`.
    height: usize,
    len: usize,
    level_generator: G,
}

/// Per-level record of a descent: the last node visited before the target
/// position on each level, together with that node's rank (the head has rank
/// 0). Levels above the active height keep the head at rank 0.
struct Trail {
    update: Vec<NodeId>,
    rank: Vec<usize>,
}

impl Trail {
    fn new(levels: usize) -> Self {
        Trail {
            update: vec![HEAD; levels],
            rank: vec![0; levels],
        }
    }
}

// ///////////////////////////////////////////////
// Inherent methods
// ///////////////////////////////////////////////

impl<T> RankedSkipList<T>
where
    T: Ord,
{
    /// Create a new skiplist with the default number of 16 levels and a
    /// probability of `$1/2$` that a node reaches the next level.
    ///
    /// # Examples
    ///
    /// ```
    /// use ranked_skiplist::RankedSkipList;
    ///
    /// let mut skiplist: RankedSkipList<i64> = RankedSkipList::new();
    /// assert!(skiplist.is_empty());
    /// ```
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::with_level_generator(Geometric::default())
    }

    /// Constructs a new, empty skiplist with a number of levels suited to the
    /// intended capacity, as given by
    /// [`recommended_height`][crate::recommended_height] with `$p = 1/2$`.
    ///
    /// # Examples
    ///
    /// ```
    /// use ranked_skiplist::RankedSkipList;
    ///
    /// let mut skiplist = RankedSkipList::with_capacity(1000);
    /// skiplist.extend(0..1000);
    /// assert_eq!(skiplist.max_height(), 9);
    /// ```
    #[inline]
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let levels = height_for(capacity.max(1), DEFAULT_P);
        match Geometric::new(levels, DEFAULT_P) {
            Ok(generator) => Self::with_level_generator(generator),
            Err(_) => unreachable!("{levels} levels with p = {DEFAULT_P} is valid"),
        }
    }

    /// Create a new skiplist with at most `max_height` levels, where `p` is
    /// the probability that a node reaches the next level.
    ///
    /// # Errors
    ///
    /// Fails if `max_height` is 0 or if `p` is not within `[0, 1]`.
    ///
    /// # Examples
    ///
    /// ```
    /// use ranked_skiplist::{GeometricError, RankedSkipList};
    ///
    /// let skiplist: RankedSkipList<u8> = RankedSkipList::with_config(8, 0.25)?;
    /// assert_eq!(skiplist.max_height(), 8);
    ///
    /// let invalid = RankedSkipList::<u8>::with_config(8, 1.5);
    /// assert_eq!(invalid.err(), Some(GeometricError::InvalidProbability));
    /// # Ok::<(), GeometricError>(())
    /// ```
    #[inline]
    pub fn with_config(max_height: usize, p: f64) -> Result<Self, GeometricError> {
        Ok(Self::with_level_generator(Geometric::new(max_height, p)?))
    }
}

impl<T, G> RankedSkipList<T, G>
where
    T: Ord,
    G: LevelGenerator,
{
    /// Create a new skiplist drawing node heights from the given level
    /// generator. The head spans [`LevelGenerator::total`] levels (at least
    /// one).
    ///
    /// # Examples
    ///
    /// ```
    /// use ranked_skiplist::{Geometric, RankedSkipList};
    ///
    /// let generator = Geometric::with_seed(12, 0.5, 0x1234_abcd)?;
    /// let mut skiplist = RankedSkipList::with_level_generator(generator);
    /// skiplist.extend([5, 3, 4]);
    /// assert_eq!(skiplist.get(0), Some(&3));
    /// # Ok::<(), ranked_skiplist::GeometricError>(())
    /// ```
    #[inline]
    pub fn with_level_generator(level_generator: G) -> Self {
        let total = level_generator.total().max(1);
        debug!(max_height = total, "configured skiplist");
        RankedSkipList {
            nodes: NodeArena::new(total),
            height: 1,
            len: 0,
            level_generator,
        }
    }

    /// Insert the element into the skiplist and return a reference to the
    /// stored element.
    ///
    /// If an equal element is already present, the list is left untouched,
    /// `value` is dropped and the existing element is returned.
    ///
    /// # Examples
    ///
    /// ```
    /// use ranked_skiplist::RankedSkipList;
    ///
    /// let mut skiplist = RankedSkipList::new();
    ///
    /// assert_eq!(*skiplist.insert(5), 5);
    /// skiplist.insert(0);
    /// skiplist.insert(5);
    /// assert_eq!(skiplist.len(), 2);
    /// ```
    pub fn insert(&mut self, value: T) -> &T {
        let mut trail = Trail::new(self.max_height());
        let (current, _) = self.descend(|_, v| v < &value, Some(&mut trail));

        let existing = self.nodes.link(current, 0).next;
        if let Some(next) = existing.filter(|&next| *self.nodes.value(next) == value) {
            return self.nodes.value(next);
        }

        let height = (self.level_generator.level() + 1).min(self.max_height());
        if height > self.height {
            // The trail already points at the head for the new levels, and
            // the head's links there are all end-of-level.
            trace!(from = self.height, to = height, "growing active height");
            self.height = height;
        }

        let node = self.nodes.alloc(SkipNode::new(value, height));
        let rank = trail.rank[0] + 1;
        for level in 0..self.height {
            let origin = trail.update[level];
            let old = self.nodes.link(origin, level);
            if level < height {
                let distance = rank - trail.rank[level];
                *self.nodes.link_mut(node, level) = match old.next {
                    Some(next) => Link::new(next, old.width + 1 - distance),
                    None => Link::END,
                };
                *self.nodes.link_mut(origin, level) = Link::new(node, distance);
            } else if !old.is_end() {
                // The link now jumps over the new node as well.
                self.nodes.link_mut(origin, level).width += 1;
            }
        }

        self.len += 1;
        self.nodes.value(node)
    }

    /// Returns a reference to the element equal to `value`, or `None` if
    /// there is no such element.
    ///
    /// # Examples
    ///
    /// ```
    /// use ranked_skiplist::RankedSkipList;
    ///
    /// let skiplist: RankedSkipList<String> =
    ///     ["a", "c"].into_iter().map(String::from).collect();
    /// assert_eq!(skiplist.find("c").map(String::as_str), Some("c"));
    /// assert!(skiplist.find("b").is_none());
    /// ```
    #[inline]
    pub fn find<Q>(&self, value: &Q) -> Option<&T>
    where
        T: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.find_node(value).map(|(node, _)| self.nodes.value(node))
    }

    /// Returns `true` if the skiplist contains an element equal to `value`.
    ///
    /// # Examples
    ///
    /// ```
    /// use ranked_skiplist::RankedSkipList;
    ///
    /// let skiplist: RankedSkipList<_> = (25..75).collect();
    /// assert!(skiplist.contains(&25));
    /// assert!(!skiplist.contains(&75));
    /// ```
    #[inline]
    pub fn contains<Q>(&self, value: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.find_node(value).is_some()
    }

    /// Returns the index of the element equal to `value`, or `None` if there
    /// is no such element.
    ///
    /// # Examples
    ///
    /// ```
    /// use ranked_skiplist::RankedSkipList;
    ///
    /// let skiplist: RankedSkipList<_> = [30, 10, 20].into_iter().collect();
    /// assert_eq!(skiplist.index_of(&30), Some(2));
    /// assert_eq!(skiplist.index_of(&15), None);
    /// ```
    #[inline]
    pub fn index_of<Q>(&self, value: &Q) -> Option<usize>
    where
        T: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        // The predecessor's 1-based rank is the target's 0-based index.
        self.find_node(value).map(|(_, rank)| rank)
    }

    /// Removes the element equal to `value` and returns it, or returns `None`
    /// if there is no such element.
    ///
    /// # Examples
    ///
    /// ```
    /// use ranked_skiplist::RankedSkipList;
    ///
    /// let mut skiplist: RankedSkipList<_> = (0..10).collect();
    /// assert_eq!(skiplist.remove(&4), Some(4));
    /// assert_eq!(skiplist.remove(&4), None);
    /// assert_eq!(skiplist.len(), 9);
    /// ```
    pub fn remove<Q>(&mut self, value: &Q) -> Option<T>
    where
        T: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut trail = Trail::new(self.height);
        let (current, _) = self.descend(
            |_, v| Borrow::<Q>::borrow(v) < value,
            Some(&mut trail),
        );

        let target = self.nodes.link(current, 0).next?;
        if Borrow::<Q>::borrow(self.nodes.value(target)) != value {
            return None;
        }
        Some(self.unlink(&trail, target))
    }
}

impl<T, G> RankedSkipList<T, G> {
    /// Clears the skiplist, removing all values.
    ///
    /// # Examples
    ///
    /// ```
    /// use ranked_skiplist::RankedSkipList;
    ///
    /// let mut skiplist = RankedSkipList::new();
    /// skiplist.extend(0..10);
    /// skiplist.clear();
    /// assert!(skiplist.is_empty());
    /// ```
    #[inline]
    pub fn clear(&mut self) {
        trace!(len = self.len, "clearing skiplist");
        let total = self.max_height();
        self.nodes.reset(total);
        self.height = 1;
        self.len = 0;
    }

    /// Returns the number of elements in the skiplist.
    ///
    /// # Examples
    ///
    /// ```
    /// use ranked_skiplist::RankedSkipList;
    ///
    /// let mut skiplist = RankedSkipList::new();
    /// skiplist.extend(0..10);
    /// assert_eq!(skiplist.len(), 10);
    /// ```
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the skiplist contains no elements.
    ///
    /// # Examples
    ///
    /// ```
    /// use ranked_skiplist::RankedSkipList;
    ///
    /// let mut skiplist = RankedSkipList::new();
    /// assert!(skiplist.is_empty());
    ///
    /// skiplist.insert(1);
    /// assert!(!skiplist.is_empty());
    /// ```
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The number of levels currently in use.
    ///
    /// This is the height of the tallest node, or 1 for an empty list.
    #[inline]
    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    /// The maximum number of levels a node may occupy.
    #[inline]
    #[must_use]
    pub fn max_height(&self) -> usize {
        self.nodes.get(HEAD).height()
    }

    /// Provides a reference to the element at the given index, or `None` if the
    /// skiplist is empty or the index is out of bounds.
    ///
    /// # Examples
    ///
    /// ```
    /// use ranked_skiplist::RankedSkipList;
    ///
    /// let mut skiplist = RankedSkipList::new();
    /// assert!(skiplist.get(0).is_none());
    /// skiplist.extend(0..10);
    /// assert_eq!(skiplist.get(0), Some(&0));
    /// assert!(skiplist.get(10).is_none());
    /// ```
    #[inline]
    pub fn get(&self, index: usize) -> Option<&T> {
        self.get_node(index).map(|node| self.nodes.value(node))
    }

    /// Provides a reference to the front element, or `None` if the skiplist is
    /// empty.
    ///
    /// # Examples
    ///
    /// ```
    /// use ranked_skiplist::RankedSkipList;
    ///
    /// let mut skiplist = RankedSkipList::new();
    /// assert!(skiplist.front().is_none());
    ///
    /// skiplist.insert(2);
    /// skiplist.insert(1);
    /// assert_eq!(skiplist.front(), Some(&1));
    /// ```
    #[inline]
    pub fn front(&self) -> Option<&T> {
        self.nodes
            .link(HEAD, 0)
            .next
            .map(|node| self.nodes.value(node))
    }

    /// Provides a reference to the back element, or `None` if the skiplist is
    /// empty.
    ///
    /// # Examples
    ///
    /// ```
    /// use ranked_skiplist::RankedSkipList;
    ///
    /// let mut skiplist = RankedSkipList::new();
    /// assert!(skiplist.back().is_none());
    ///
    /// skiplist.insert(2);
    /// skiplist.insert(1);
    /// assert_eq!(skiplist.back(), Some(&2));
    /// ```
    #[inline]
    pub fn back(&self) -> Option<&T> {
        self.len.checked_sub(1).and_then(|index| self.get(index))
    }

    /// Removes the element at the given index and returns it, or `None` if the
    /// index is out of bounds.
    ///
    /// # Examples
    ///
    /// ```
    /// use ranked_skiplist::RankedSkipList;
    ///
    /// let mut skiplist: RankedSkipList<_> = (0..10).collect();
    /// assert_eq!(skiplist.remove_index(4), Some(4));
    /// assert_eq!(skiplist.remove_index(4), Some(5));
    /// assert_eq!(skiplist.remove_index(8), None);
    /// ```
    pub fn remove_index(&mut self, index: usize) -> Option<T> {
        if index >= self.len {
            return None;
        }
        // Stop in front of rank `index + 1` on every level.
        let mut trail = Trail::new(self.height);
        let (current, _) = self.descend(|rank, _| rank <= index, Some(&mut trail));

        let target = self.nodes.link(current, 0).next?;
        Some(self.unlink(&trail, target))
    }

    /// Removes the first element and returns it, or `None` if the skiplist is
    /// empty.
    ///
    /// # Examples
    ///
    /// ```
    /// use ranked_skiplist::RankedSkipList;
    ///
    /// let mut skiplist = RankedSkipList::new();
    /// skiplist.insert(1);
    /// skiplist.insert(2);
    ///
    /// assert_eq!(skiplist.pop_front(), Some(1));
    /// assert_eq!(skiplist.pop_front(), Some(2));
    /// assert!(skiplist.pop_front().is_none());
    /// ```
    #[inline]
    pub fn pop_front(&mut self) -> Option<T> {
        self.remove_index(0)
    }

    /// Removes the last element and returns it, or `None` if the skiplist is
    /// empty.
    ///
    /// # Examples
    ///
    /// ```
    /// use ranked_skiplist::RankedSkipList;
    ///
    /// let mut skiplist = RankedSkipList::new();
    /// skiplist.insert(1);
    /// skiplist.insert(2);
    ///
    /// assert_eq!(skiplist.pop_back(), Some(2));
    /// assert_eq!(skiplist.pop_back(), Some(1));
    /// assert!(skiplist.pop_back().is_none());
    /// ```
    #[inline]
    pub fn pop_back(&mut self) -> Option<T> {
        let index = self.len.checked_sub(1)?;
        self.remove_index(index)
    }

    /// Creates an iterator over the entries of the skiplist, in ascending
    /// order.
    ///
    /// # Examples
    ///
    /// ```
    /// use ranked_skiplist::RankedSkipList;
    ///
    /// let skiplist: RankedSkipList<_> = [3, 1, 2].into_iter().collect();
    /// let values: Vec<_> = skiplist.iter().collect();
    /// assert_eq!(values, [&1, &2, &3]);
    /// ```
    #[inline]
    pub fn iter(&self) -> Iter<'_, T, G> {
        Iter {
            list: self,
            next: self.nodes.link(HEAD, 0).next,
            front: 0,
            back: self.len,
        }
    }

    /// Renders the link structure of the skiplist, one line per active level
    /// from the top down, for debugging purposes.
    ///
    /// Each line lists the head `H`, then every link as `-width->` followed by
    /// the node it lands on, and ends with `-x` for the end of the level.
    ///
    /// # Examples
    ///
    /// ```
    /// use ranked_skiplist::RankedSkipList;
    ///
    /// let mut skiplist = RankedSkipList::with_config(1, 0.5)?;
    /// skiplist.extend([2, 1]);
    /// assert_eq!(skiplist.levels().to_string(), "L0: H -1-> 1 -1-> 2 -x");
    /// # Ok::<(), ranked_skiplist::GeometricError>(())
    /// ```
    #[inline]
    pub fn levels(&self) -> Levels<'_, T, G> {
        Levels { list: self }
    }
}

// ///////////////////////////////////////////////
// Internal methods
// ///////////////////////////////////////////////

impl<T, G> RankedSkipList<T, G> {
    /// Walks down from the head, moving right on each level for as long as
    /// `go_right` accepts the next node. `go_right` is given the rank that
    /// the step would land on and the value stored there.
    ///
    /// Returns the node where the walk stopped on level 0, with its rank. If
    /// a trail is given, the stopping point on every active level is recorded
    /// in it.
    fn descend(
        &self,
        mut go_right: impl FnMut(usize, &T) -> bool,
        mut trail: Option<&mut Trail>,
    ) -> (NodeId, usize) {
        let mut current = HEAD;
        let mut rank = 0;
        for level in (0..self.height).rev() {
            loop {
                let link = self.nodes.link(current, level);
                match link.next {
                    Some(next) if go_right(rank + link.width, self.nodes.value(next)) => {
                        rank += link.width;
                        current = next;
                    }
                    _ => break,
                }
            }
            if let Some(trail) = trail.as_deref_mut() {
                trail.update[level] = current;
                trail.rank[level] = rank;
            }
        }
        (current, rank)
    }

    /// Finds the node holding `value`, along with the rank of its predecessor.
    fn find_node<Q>(&self, value: &Q) -> Option<(NodeId, usize)>
    where
        T: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let (current, rank) = self.descend(|_, v| Borrow::<Q>::borrow(v) < value, None);
        let candidate = self.nodes.link(current, 0).next?;
        (Borrow::<Q>::borrow(self.nodes.value(candidate)) == value).then_some((candidate, rank))
    }

    /// Gets the node with the given index.
    fn get_node(&self, index: usize) -> Option<NodeId> {
        if index >= self.len {
            return None;
        }
        let mut remaining = index + 1;
        let mut current = HEAD;
        for level in (0..self.height).rev() {
            loop {
                let link = self.nodes.link(current, level);
                match link.next {
                    Some(next) if link.width <= remaining => {
                        remaining -= link.width;
                        current = next;
                        if remaining == 0 {
                            return Some(current);
                        }
                    }
                    _ => break,
                }
            }
        }
        // Level 0 advances one rank per link, so a valid index always lands.
        None
    }

    /// Unlinks `target` using the trail recorded in front of it, then frees it
    /// and returns its value.
    fn unlink(&mut self, trail: &Trail, target: NodeId) -> T {
        for level in 0..self.height {
            let origin = trail.update[level];
            let old = self.nodes.link(origin, level);
            if old.next == Some(target) {
                let skipped = self.nodes.link(target, level);
                *self.nodes.link_mut(origin, level) = match skipped.next {
                    Some(next) => Link::new(next, old.width + skipped.width - 1),
                    None => Link::END,
                };
            } else if !old.is_end() {
                // The link jumped over the target.
                self.nodes.link_mut(origin, level).width -= 1;
            }
        }
        self.len -= 1;

        let height = self.height;
        while self.height > 1 && self.nodes.link(HEAD, self.height - 1).is_end() {
            self.height -= 1;
        }
        if self.height < height {
            trace!(from = height, to = self.height, "shrinking active height");
        }

        match self.nodes.free(target).into_inner() {
            Some(value) => value,
            None => unreachable!("the head node is never unlinked"),
        }
    }
}

// ///////////////////////////////////////////////
// Trait implementation
// ///////////////////////////////////////////////

impl<T: Ord> Default for RankedSkipList<T> {
    #[inline]
    fn default() -> RankedSkipList<T> {
        RankedSkipList::new()
    }
}

/// This implementation of `PartialEq` only checks that the *values* are equal;
/// it does not check for equivalence of other features (such as the level
/// generator and the node heights).
impl<A, B, G, H> PartialEq<RankedSkipList<B, H>> for RankedSkipList<A, G>
where
    A: PartialEq<B>,
{
    #[inline]
    fn eq(&self, other: &RankedSkipList<B, H>) -> bool {
        self.len() == other.len() && self.iter().eq(other)
    }
}

impl<T: Eq, G> Eq for RankedSkipList<T, G> {}

impl<A, B, G, H> PartialOrd<RankedSkipList<B, H>> for RankedSkipList<A, G>
where
    A: PartialOrd<B>,
{
    #[inline]
    fn partial_cmp(&self, other: &RankedSkipList<B, H>) -> Option<Ordering> {
        self.iter().partial_cmp(other)
    }
}

impl<T: Ord, G> Ord for RankedSkipList<T, G> {
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        self.iter().cmp(other)
    }
}

impl<T, G> Extend<T> for RankedSkipList<T, G>
where
    T: Ord,
    G: LevelGenerator,
{
    #[inline]
    fn extend<I: IntoIterator<Item = T>>(&mut self, iterable: I) {
        for element in iterable {
            self.insert(element);
        }
    }
}

impl<T, G> ops::Index<usize> for RankedSkipList<T, G> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        match self.get(index) {
            Some(value) => value,
            None => panic!(
                "index out of bounds: the len is {} but the index is {index}",
                self.len
            ),
        }
    }
}

impl<T, G> fmt::Debug for RankedSkipList<T, G>
where
    T: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;

        for (i, entry) in self.iter().enumerate() {
            if i != 0 {
                write!(f, ", ")?;
            }
            write!(f, "{entry:?}")?;
        }
        write!(f, "]")
    }
}

impl<T, G> fmt::Display for RankedSkipList<T, G>
where
    T: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;

        for (i, entry) in self.iter().enumerate() {
            if i != 0 {
                write!(f, ", ")?;
            }
            write!(f, "{entry}")?;
        }
        write!(f, "]")
    }
}

impl<T, G> IntoIterator for RankedSkipList<T, G> {
    type Item = T;
    type IntoIter = IntoIter<T>;

    #[inline]
    fn into_iter(self) -> IntoIter<T> {
        IntoIter {
            next: self.nodes.link(HEAD, 0).next,
            remaining: self.len,
            nodes: self.nodes,
        }
    }
}

impl<'a, T, G> IntoIterator for &'a RankedSkipList<T, G> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T, G>;

    #[inline]
    fn into_iter(self) -> Iter<'a, T, G> {
        self.iter()
    }
}

impl<T> iter::FromIterator<T> for RankedSkipList<T>
where
    T: Ord,
{
    #[inline]
    fn from_iter<I>(iter: I) -> RankedSkipList<T>
    where
        I: IntoIterator<Item = T>,
    {
        let mut skiplist = RankedSkipList::new();
        skiplist.extend(iter);
        skiplist
    }
}

impl<T: Hash, G> Hash for RankedSkipList<T, G> {
    #[inline]
    fn hash<H: hash::Hasher>(&self, state: &mut H) {
        self.len.hash(state);
        for elt in self {
            elt.hash(state);
        }
    }
}

// ////////////////////////////////////////////////////////////////////////////
// Iterators
// ////////////////////////////////////////////////////////////////////////////

/// Borrowing iterator over a [`RankedSkipList`], in ascending order.
///
/// Forward steps follow level-0 links; backward steps use rank access.
pub struct Iter<'a, T, G = Geometric> {
    list: &'a RankedSkipList<T, G>,
    /// The node at index `front`.
    next: Option<NodeId>,
    front: usize,
    /// One past the last index still to be yielded.
    back: usize,
}

impl<'a, T, G> Iterator for Iter<'a, T, G> {
    type Item = &'a T;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        if self.front >= self.back {
            return None;
        }
        let node = self.next?;
        self.next = self.list.nodes.link(node, 0).next;
        self.front += 1;
        Some(self.list.nodes.value(node))
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.back - self.front;
        (len, Some(len))
    }
}

impl<T, G> DoubleEndedIterator for Iter<'_, T, G> {
    #[inline]
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.front >= self.back {
            return None;
        }
        self.back -= 1;
        self.list.get(self.back)
    }
}

impl<T, G> ExactSizeIterator for Iter<'_, T, G> {}

impl<T, G> Clone for Iter<'_, T, G> {
    #[inline]
    fn clone(&self) -> Self {
        Iter {
            list: self.list,
            next: self.next,
            front: self.front,
            back: self.back,
        }
    }
}

/// Consuming iterator over a [`RankedSkipList`], in ascending order.
pub struct IntoIter<T> {
    nodes: NodeArena<T>,
    next: Option<NodeId>,
    remaining: usize,
}

impl<T> Iterator for IntoIter<T> {
    type Item = T;

    #[inline]
    fn next(&mut self) -> Option<T> {
        let node = self.nodes.free(self.next?);
        self.next = node.links.first().and_then(|link| link.next);
        self.remaining -= 1;
        node.into_inner()
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> ExactSizeIterator for IntoIter<T> {}

// ////////////////////////////////////////////////////////////////////////////
// Levels
// ////////////////////////////////////////////////////////////////////////////

/// Level-by-level rendering of a [`RankedSkipList`], created by
/// [`RankedSkipList::levels`].
pub struct Levels<'a, T, G = Geometric> {
    list: &'a RankedSkipList<T, G>,
}

impl<T, G> fmt::Display for Levels<'_, T, G>
where
    T: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let nodes = &self.list.nodes;
        for level in (0..self.list.height).rev() {
            write!(f, "L{level}: {}", nodes.get(HEAD))?;
            let mut current = HEAD;
            while let Some(next) = nodes.link(current, level).next {
                write!(f, " -{}-> {}", nodes.link(current, level).width, nodes.get(next))?;
                current = next;
            }
            f.write_str(" -x")?;
            if level > 0 {
                f.write_str("\n")?;
            }
        }
        Ok(())
    }
}

// ////////////////////////////////////////////////////////////////////////////
// Tests
// ////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
impl<T, G> RankedSkipList<T, G>
where
    T: Ord + fmt::Debug,
{
    /// Checks the integrity of the skiplist: ordering, level membership, link
    /// widths, heights and the element count.
    fn check(&self) {
        use std::collections::HashMap;

        let max_height = self.max_height();
        assert!(
            (1..=max_height).contains(&self.height),
            "active height {} outside [1, {max_height}]",
            self.height
        );

        // Level 0 fixes the rank of every node.
        let mut order = vec![];
        let mut ranks = HashMap::from([(HEAD, 0)]);
        let mut current = HEAD;
        while let Some(next) = self.nodes.link(current, 0).next {
            assert_eq!(self.nodes.link(current, 0).width, 1);
            if current != HEAD {
                assert!(
                    self.nodes.value(current) < self.nodes.value(next),
                    "{:?} is not below {:?}",
                    self.nodes.value(current),
                    self.nodes.value(next)
                );
            }
            let height = self.nodes.get(next).height();
            assert!((1..=self.height).contains(&height));
            order.push(next);
            ranks.insert(next, order.len());
            current = next;
        }
        assert_eq!(order.len(), self.len);
        assert_eq!(self.nodes.occupied(), self.len + 1);

        for level in 0..max_height {
            let expected: Vec<NodeId> = order
                .iter()
                .copied()
                .filter(|&node| self.nodes.get(node).height() > level)
                .collect();
            let mut walked = vec![];
            let mut current = HEAD;
            loop {
                let link = self.nodes.link(current, level);
                match link.next {
                    Some(next) => {
                        assert_eq!(
                            link.width,
                            ranks[&next] - ranks[&current],
                            "width of level {level} link into {:?}",
                            self.nodes.value(next)
                        );
                        walked.push(next);
                        current = next;
                    }
                    None => {
                        assert_eq!(link.width, 0, "width of level {level} end link");
                        break;
                    }
                }
            }
            assert_eq!(walked, expected, "members of level {level}");
        }

        if self.height > 1 {
            assert!(!self.nodes.link(HEAD, self.height - 1).is_end());
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{cmp::Reverse, collections::BTreeSet};

    use anyhow::Result;
    use pretty_assertions::assert_eq;
    use rand::{Rng, SeedableRng, rngs::StdRng};
    use rstest::rstest;

    use super::RankedSkipList;
    use crate::level_generator::{Geometric, LevelGenerator};

    /// Replays a fixed sequence of levels, then stays on level 0.
    struct Scripted {
        total: usize,
        levels: std::vec::IntoIter<usize>,
    }

    impl Scripted {
        fn new(total: usize, levels: Vec<usize>) -> Self {
            Scripted {
                total,
                levels: levels.into_iter(),
            }
        }
    }

    impl LevelGenerator for Scripted {
        fn total(&self) -> usize {
            self.total
        }

        fn level(&mut self) -> usize {
            self.levels.next().unwrap_or(0)
        }
    }

    fn seeded(max_height: usize, p: f64, seed: u64) -> Result<RankedSkipList<u32>> {
        Ok(RankedSkipList::with_level_generator(Geometric::with_seed(
            max_height, p, seed,
        )?))
    }

    #[test]
    fn basic_small() -> Result<()> {
        let mut sl = seeded(16, 0.5, 1)?;
        sl.check();
        assert!(sl.remove(&1).is_none());
        sl.check();
        sl.insert(1);
        sl.check();
        assert_eq!(sl.remove(&1), Some(1));
        sl.check();
        sl.insert(1);
        sl.check();
        sl.insert(2);
        sl.check();
        assert_eq!(sl.remove(&1), Some(1));
        sl.check();
        assert_eq!(sl.remove(&2), Some(2));
        sl.check();
        assert!(sl.remove(&1).is_none());
        sl.check();
        assert_eq!(sl.height(), 1);
        Ok(())
    }

    #[test]
    fn basic_large() {
        let size = 10_000;
        let mut sl = RankedSkipList::with_capacity(size);
        assert!(sl.is_empty());

        for i in 0..size {
            sl.insert(i);
            assert_eq!(sl.len(), i + 1);
        }
        sl.check();

        for i in 0..size {
            assert_eq!(sl.remove(&i), Some(i));
            assert_eq!(sl.len(), size - i - 1);
        }
        sl.check();
        assert_eq!(sl.height(), 1);
    }

    #[test]
    fn example_scenario() -> Result<()> {
        let mut sl = seeded(16, 0.5, 0x1234_abcd)?;
        for value in [3, 6, 7, 9, 12] {
            sl.insert(value);
        }
        sl.check();
        assert_eq!(sl.len(), 5);
        for (i, value) in [3, 6, 7, 9, 12].into_iter().enumerate() {
            assert_eq!(sl.get(i), Some(&value));
        }
        assert_eq!(sl.get(5), None);
        assert_eq!(sl.find(&7), Some(&7));
        assert_eq!(sl.find(&1), None);

        assert_eq!(sl.remove(&7), Some(7));
        sl.check();
        assert_eq!(sl.len(), 4);
        for (i, value) in [3, 6, 9, 12].into_iter().enumerate() {
            assert_eq!(sl.get(i), Some(&value));
        }
        assert_eq!(sl.find(&7), None);
        Ok(())
    }

    #[test]
    fn levels() {
        let mut sl = RankedSkipList::with_level_generator(Scripted::new(4, vec![0, 1, 0, 0, 2]));
        sl.extend([3, 6, 7, 9, 12]);
        sl.check();
        assert_eq!(sl.height(), 3);
        assert_eq!(
            sl.levels().to_string(),
            "L2: H -5-> 12 -x\n\
             L1: H -2-> 6 -3-> 12 -x\n\
             L0: H -1-> 3 -1-> 6 -1-> 7 -1-> 9 -1-> 12 -x"
        );

        assert_eq!(sl.remove(&7), Some(7));
        sl.check();
        assert_eq!(
            sl.levels().to_string(),
            "L2: H -4-> 12 -x\n\
             L1: H -2-> 6 -2-> 12 -x\n\
             L0: H -1-> 3 -1-> 6 -1-> 9 -1-> 12 -x"
        );

        // Removing the only tall node lowers the active height.
        assert_eq!(sl.remove(&12), Some(12));
        sl.check();
        assert_eq!(sl.height(), 2);
        assert_eq!(
            sl.levels().to_string(),
            "L1: H -2-> 6 -x\n\
             L0: H -1-> 3 -1-> 6 -1-> 9 -x"
        );
    }

    #[test]
    fn insert_below_tall_links() {
        // A short node inserted under a tall link widens that link.
        let mut sl = RankedSkipList::with_level_generator(Scripted::new(3, vec![2, 2, 0]));
        sl.extend([10, 30, 20]);
        sl.check();
        assert_eq!(
            sl.levels().to_string(),
            "L2: H -1-> 10 -2-> 30 -x\n\
             L1: H -1-> 10 -2-> 30 -x\n\
             L0: H -1-> 10 -1-> 20 -1-> 30 -x"
        );
        assert_eq!(sl.get(2), Some(&30));
    }

    #[test]
    fn insert_is_idempotent() -> Result<()> {
        let mut sl = seeded(8, 0.5, 3)?;
        sl.extend(0..100);
        let before = sl.levels().to_string();
        for i in 0..100 {
            assert_eq!(*sl.insert(i), i);
        }
        sl.check();
        assert_eq!(sl.len(), 100);
        assert_eq!(sl.levels().to_string(), before);
        Ok(())
    }

    #[test]
    fn insert_returns_stored() {
        let mut sl: RankedSkipList<Reverse<i32>> = RankedSkipList::new();
        assert_eq!(*sl.insert(Reverse(1)), Reverse(1));
        assert_eq!(*sl.insert(Reverse(5)), Reverse(5));
        assert_eq!(sl.front(), Some(&Reverse(5)));
        assert_eq!(sl.back(), Some(&Reverse(1)));
    }

    #[rstest]
    fn random_ops(
        #[values(1, 2, 4, 16)] max_height: usize,
        #[values(0.0, 0.25, 0.5, 1.0)] p: f64,
    ) -> Result<()> {
        let mut rng = StdRng::seed_from_u64(0x1234_abcd);
        let mut sl = seeded(max_height, p, rng.random())?;
        let mut model = BTreeSet::new();

        for round in 0..2_000 {
            let value = rng.random_range(0..200);
            if rng.random_bool(0.6) {
                sl.insert(value);
                model.insert(value);
            } else {
                assert_eq!(sl.remove(&value), model.take(&value));
            }
            assert_eq!(sl.len(), model.len());
            if round % 100 == 0 {
                sl.check();
            }
        }
        sl.check();
        for (i, value) in model.iter().enumerate() {
            assert_eq!(sl.get(i), Some(value));
            assert_eq!(sl.index_of(value), Some(i));
        }
        Ok(())
    }

    #[test]
    fn contains() {
        let (min, max) = (25, 75);
        let sl: RankedSkipList<_> = (min..max).collect();

        for i in 0..100 {
            if i < min || i >= max {
                assert!(!sl.contains(&i));
                assert_eq!(sl.index_of(&i), None);
            } else {
                assert!(sl.contains(&i));
                assert_eq!(sl.index_of(&i), Some(i - min));
            }
        }
    }

    #[test]
    fn find_borrowed() {
        let sl: RankedSkipList<String> = ["b", "a", "c"].into_iter().map(String::from).collect();
        assert_eq!(sl.find("a").map(String::as_str), Some("a"));
        assert_eq!(sl.find("d"), None);
        assert_eq!(sl.index_of("c"), Some(2));
    }

    #[test]
    fn index_pop() {
        let size = 1000;
        let sl: RankedSkipList<_> = (0..size).collect();
        for i in 0..size {
            assert_eq!(sl[i], i);
            assert_eq!(sl.get(i), Some(&i));
        }
        assert_eq!(sl.get(size), None);

        let mut sl: RankedSkipList<_> = (0..size).collect();
        for i in 0..size {
            assert_eq!(sl.pop_front(), Some(i));
            assert_eq!(sl.len(), size - i - 1);
        }
        assert!(sl.pop_front().is_none());
        assert!(sl.front().is_none());
        sl.check();

        let mut sl: RankedSkipList<_> = (0..size).collect();
        for i in 0..size {
            assert_eq!(sl.pop_back(), Some(size - i - 1));
            assert_eq!(sl.len(), size - i - 1);
        }
        assert!(sl.pop_back().is_none());
        assert!(sl.back().is_none());
        sl.check();
    }

    #[test]
    #[should_panic(expected = "index out of bounds")]
    fn index_out_of_bounds() {
        let sl: RankedSkipList<_> = (0..3).collect();
        let _ = sl[3];
    }

    #[test]
    fn remove_index() {
        let size = 100;

        for i in 0..size {
            let mut sl: RankedSkipList<_> = (0..size).collect();
            assert_eq!(sl.remove_index(i), Some(i));
            assert_eq!(sl.len(), size - 1);
            sl.check();
        }

        let mut sl: RankedSkipList<_> = (0..size).collect();
        assert_eq!(sl.remove_index(size), None);
        for i in 0..size {
            assert_eq!(sl.remove_index(0), Some(i));
            assert_eq!(sl.len(), size - i - 1);
            sl.check();
        }
        assert!(sl.is_empty());
    }

    #[test]
    fn remove_then_reinsert() -> Result<()> {
        let mut sl = seeded(6, 0.5, 11)?;
        sl.extend((0..50).map(|i| i * 2));
        let values: Vec<u32> = sl.iter().copied().collect();

        sl.insert(31);
        sl.check();
        assert_eq!(sl.remove(&31), Some(31));
        sl.check();

        assert_eq!(sl.iter().copied().collect::<Vec<_>>(), values);
        for (i, value) in values.iter().enumerate() {
            assert_eq!(sl.index_of(value), Some(i));
        }
        Ok(())
    }

    #[test]
    fn clear() {
        let mut sl: RankedSkipList<_> = (0..100).collect();
        sl.clear();
        sl.check();
        assert!(sl.is_empty());
        assert_eq!(sl.height(), 1);
        assert_eq!(sl.max_height(), 16);

        sl.extend(0..10);
        sl.check();
        assert_eq!(sl.len(), 10);
    }

    #[test]
    fn iter() {
        let size = 10_000;

        let sl: RankedSkipList<_> = (0..size).collect();

        fn test<T>(size: usize, mut iter: T)
        where
            T: Iterator<Item = usize>,
        {
            for i in 0..size {
                assert_eq!(iter.size_hint(), (size - i, Some(size - i)));
                assert_eq!(iter.next(), Some(i));
            }
            assert_eq!(iter.size_hint(), (0, Some(0)));
            assert!(iter.next().is_none());
        }
        test(size, sl.iter().copied());
        test(size, sl.into_iter());
    }

    #[test]
    fn iter_rev_mixed() {
        let size = 1000;
        let sl: RankedSkipList<_> = (0..size).collect();

        let rev: Vec<usize> = sl.iter().rev().copied().collect();
        assert_eq!(rev, (0..size).rev().collect::<Vec<_>>());

        let mut iter = sl.iter();
        for i in 0..size / 2 {
            assert_eq!(iter.next(), Some(&i));
            assert_eq!(iter.next_back(), Some(&(size - i - 1)));
        }
        assert!(iter.next().is_none());
        assert!(iter.next_back().is_none());
    }

    #[test]
    fn into_iter_partial() {
        // Dropping a half-consumed iterator releases the remaining values.
        let sl: RankedSkipList<String> = (0..10).map(|i| i.to_string()).collect();
        let mut iter = sl.into_iter();
        assert_eq!(iter.next().as_deref(), Some("0"));
        assert_eq!(iter.len(), 9);
    }

    #[test]
    fn single_level() -> Result<()> {
        let mut sl = RankedSkipList::with_config(1, 0.5)?;
        sl.extend([5, 1, 3, 2, 4]);
        sl.check();
        assert_eq!(sl.height(), 1);
        assert_eq!(sl.get(3), Some(&4));
        assert_eq!(sl.remove(&3), Some(3));
        sl.check();
        Ok(())
    }

    #[test]
    fn debug_display() {
        let sl: RankedSkipList<_> = (0..5).collect();
        insta::assert_snapshot!(format!("{sl:?}"), @"[0, 1, 2, 3, 4]");
        insta::assert_snapshot!(sl.to_string(), @"[0, 1, 2, 3, 4]");

        let empty: RankedSkipList<u8> = RankedSkipList::new();
        insta::assert_snapshot!(empty.levels().to_string(), @"L0: H -x");
    }

    #[test]
    fn equality() {
        let a: RankedSkipList<i64> = (0..100).collect();
        let b: RankedSkipList<i64> = (0..100).rev().collect();
        let c: RankedSkipList<i64> = (0..10).collect();
        let d: RankedSkipList<i64> = (100..200).collect();
        let e: RankedSkipList<i64> = (0..100).chain(0..1).collect();

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
        assert_eq!(a, e);
        assert!(c < a);
        assert!(a < d);
    }
}
