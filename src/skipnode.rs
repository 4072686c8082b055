//! Nodes, links, and the arena that owns them.

use std::{fmt, iter};

// ////////////////////////////////////////////////////////////////////////////
// NodeId
// ////////////////////////////////////////////////////////////////////////////

/// Stable handle to a node inside a [`NodeArena`].
///
/// Handles are plain slot indices. A handle stays valid until the node it
/// names is freed, after which the slot may be reused by a new node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct NodeId(usize);

/// The head sentinel always occupies the first slot.
pub(crate) const HEAD: NodeId = NodeId(0);

// ////////////////////////////////////////////////////////////////////////////
// Link
// ////////////////////////////////////////////////////////////////////////////

/// A forward link at one level of a node's tower.
///
/// `width` is the number of level-0 steps the link spans, i.e. the rank of
/// `next` minus the rank of the link's origin.
///
/// A link with no successor marks the end of its level and stores a width of
/// 0. That width carries no distance information: always check `next` before
/// using `width` in rank arithmetic.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Link {
    pub next: Option<NodeId>,
    pub width: usize,
}

impl Link {
    /// The terminating link of a level.
    pub const END: Link = Link {
        next: None,
        width: 0,
    };

    #[inline]
    pub fn new(next: NodeId, width: usize) -> Self {
        Link {
            next: Some(next),
            width,
        }
    }

    /// Returns `true` if this link terminates its level.
    #[inline]
    pub fn is_end(self) -> bool {
        self.next.is_none()
    }
}

// ////////////////////////////////////////////////////////////////////////////
// SkipNode
// ////////////////////////////////////////////////////////////////////////////

/// A node of the list: an optional value and its tower of forward links.
///
/// The value is only ever `None` for the head node. The tower height
/// (`links.len()`) is fixed when the node is created.
#[derive(Clone, Debug)]
pub(crate) struct SkipNode<T> {
    pub value: Option<T>,
    pub links: Vec<Link>,
}

impl<T> SkipNode<T> {
    /// Create a new head node spanning `total_levels` levels.
    pub fn head(total_levels: usize) -> Self {
        SkipNode {
            value: None,
            links: iter::repeat_n(Link::END, total_levels).collect(),
        }
    }

    /// Create a new node holding `value` with a tower of the given height.
    /// All links start out as [`Link::END`].
    pub fn new(value: T, height: usize) -> Self {
        SkipNode {
            value: Some(value),
            links: iter::repeat_n(Link::END, height).collect(),
        }
    }

    /// The number of levels this node is linked into.
    #[inline]
    pub fn height(&self) -> usize {
        self.links.len()
    }

    /// Consumes the node returning the value it contains.
    #[inline]
    pub fn into_inner(self) -> Option<T> {
        self.value
    }
}

impl<T> fmt::Display for SkipNode<T>
where
    T: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value {
            Some(ref v) => write!(f, "{v}"),
            None => write!(f, "H"),
        }
    }
}

// ////////////////////////////////////////////////////////////////////////////
// NodeArena
// ////////////////////////////////////////////////////////////////////////////

/// Slot storage for every node of a list, head included.
///
/// Freed slots are recycled before the storage grows.
#[derive(Clone, Debug)]
pub(crate) struct NodeArena<T> {
    slots: Vec<Option<SkipNode<T>>>,
    free: Vec<NodeId>,
}

impl<T> NodeArena<T> {
    /// Create an arena containing only a head node of the given height.
    pub fn new(total_levels: usize) -> Self {
        NodeArena {
            slots: vec![Some(SkipNode::head(total_levels))],
            free: Vec::new(),
        }
    }

    #[inline]
    pub fn get(&self, id: NodeId) -> &SkipNode<T> {
        match self.slots.get(id.0) {
            Some(Some(node)) => node,
            _ => unreachable!("node {id:?} is not allocated"),
        }
    }

    #[inline]
    pub fn get_mut(&mut self, id: NodeId) -> &mut SkipNode<T> {
        match self.slots.get_mut(id.0) {
            Some(Some(node)) => node,
            _ => unreachable!("node {id:?} is not allocated"),
        }
    }

    /// The link leaving `id` at `level`.
    #[inline]
    pub fn link(&self, id: NodeId, level: usize) -> Link {
        self.get(id).links[level]
    }

    #[inline]
    pub fn link_mut(&mut self, id: NodeId, level: usize) -> &mut Link {
        &mut self.get_mut(id).links[level]
    }

    /// The value stored in a data node.
    #[inline]
    pub fn value(&self, id: NodeId) -> &T {
        match self.get(id).value {
            Some(ref value) => value,
            None => unreachable!("the head node holds no value"),
        }
    }

    /// Store a node, reusing a freed slot if there is one.
    pub fn alloc(&mut self, node: SkipNode<T>) -> NodeId {
        match self.free.pop() {
            Some(id) => {
                self.slots[id.0] = Some(node);
                id
            }
            None => {
                self.slots.push(Some(node));
                NodeId(self.slots.len() - 1)
            }
        }
    }

    /// Remove a node from the arena and hand it back.
    pub fn free(&mut self, id: NodeId) -> SkipNode<T> {
        debug_assert_ne!(id, HEAD, "the head node is never freed");
        match self.slots.get_mut(id.0).and_then(Option::take) {
            Some(node) => {
                self.free.push(id);
                node
            }
            None => unreachable!("node {id:?} freed twice"),
        }
    }

    /// Drop every node and start over with a fresh head of the given height.
    pub fn reset(&mut self, total_levels: usize) {
        *self = NodeArena::new(total_levels);
    }

    /// The number of nodes currently stored, head included.
    #[cfg(test)]
    pub fn occupied(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }
}

// ////////////////////////////////////////////////////////////////////////////
// Tests
// ////////////////////////////////////////////////////////////////////////////
