//! Point quadtree engine.
//!
//! Every node's key is itself the pivot that splits the plane into four
//! quadrants, one per child slot. The shape depends only on insertion order:
//! there is no rebalancing, and a monotonic insertion sequence degenerates
//! into a path of depth `N`. All walks are iterative for that reason.
//!
//! Removal picks one of three cases for the matching node:
//!
//! 1. no occupied child slots: the node is freed and its parent slot cleared;
//! 2. one occupied slot: the sole child is spliced into the parent slot;
//! 3. two or more: the node is tombstoned. Its payload is dropped but the key
//!    and children stay in place, since four disjoint quadrant subtrees have
//!    no single successor to promote.
//!
//! A tombstone still counts as an occupied slot when its parent is later
//! removed. It disappears when the same key is inserted again (which revives
//! it) or when [`QuadTree::compact`] rebuilds the tree.

use std::fmt;

use tracing::{debug, trace};

use crate::error::MapError;
use crate::geometry::Point;
use crate::Config;

// =============================================================================
// Quadrants
// =============================================================================

/// Number of child slots per node.
pub const CHILDREN: usize = 4;

/// One of the four child slots of a node, named by compass direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quadrant {
    NW = 0,
    NE = 1,
    SW = 2,
    SE = 3,
}

impl Quadrant {
    /// All quadrants in slot order.
    pub const ALL: [Quadrant; CHILDREN] = [Quadrant::NW, Quadrant::NE, Quadrant::SW, Quadrant::SE];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Quadrant of `pivot` that `target` falls into.
///
/// West is strictly less than `pivot.x`, south strictly less than `pivot.y`;
/// ties go east and north. The comparison is exact so that a key always
/// routes down the same path.
#[inline]
pub fn locate(pivot: &Point, target: &Point) -> Quadrant {
    match (target.x < pivot.x, target.y < pivot.y) {
        (true, true) => Quadrant::SW,
        (true, false) => Quadrant::NW,
        (false, true) => Quadrant::SE,
        (false, false) => Quadrant::NE,
    }
}

// =============================================================================
// Node Arena
// =============================================================================

/// Index of a node in its tree's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct NodeId(u32);

impl NodeId {
    const MAX: usize = u32::MAX as usize;

    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone)]
pub(crate) struct Node<V> {
    pub(crate) key: Point,
    /// `None` once the node has been tombstoned.
    pub(crate) value: Option<V>,
    pub(crate) children: [Option<NodeId>; CHILDREN],
}

impl<V> Node<V> {
    #[inline]
    fn new(key: Point, value: V) -> Self {
        Self {
            key,
            value: Some(value),
            children: [None; CHILDREN],
        }
    }

    #[inline]
    pub(crate) fn is_tombstone(&self) -> bool {
        self.value.is_none()
    }
}

#[derive(Clone)]
enum Slot<V> {
    Occupied(Node<V>),
    /// Link to the next vacant slot.
    Vacant(Option<NodeId>),
}

/// Node storage with an intrusive free list of vacated slots.
///
/// A `NodeId` held by the tree always names an occupied slot, and the free
/// list only ever links vacant ones. Breaking either is a bug in this module,
/// so the accessors treat it as unreachable rather than returning an error.
#[derive(Clone)]
pub(crate) struct NodeArena<V> {
    slots: Vec<Slot<V>>,
    free_head: Option<NodeId>,
    occupied: usize,
}

impl<V> NodeArena<V> {
    fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_head: None,
            occupied: 0,
        }
    }

    fn with_capacity(capacity: usize) -> Result<Self, MapError> {
        let mut arena = Self::new();
        arena.reserve(capacity)?;
        Ok(arena)
    }

    fn reserve(&mut self, additional: usize) -> Result<(), MapError> {
        if self.slots.len().saturating_add(additional) > NodeId::MAX {
            return Err(MapError::AllocationFailure);
        }
        self.slots
            .try_reserve(additional)
            .map_err(|_| MapError::AllocationFailure)
    }

    /// Store a fully built node. On failure nothing is stored.
    fn alloc(&mut self, node: Node<V>) -> Result<NodeId, MapError> {
        let id = match self.free_head {
            Some(id) => {
                let slot = &mut self.slots[id.index()];
                let Slot::Vacant(next) = *slot else {
                    unreachable!("free list points at occupied slot {id:?}");
                };
                self.free_head = next;
                *slot = Slot::Occupied(node);
                id
            }
            None => {
                self.reserve(1)?;
                let id = NodeId(self.slots.len() as u32);
                self.slots.push(Slot::Occupied(node));
                id
            }
        };
        self.occupied += 1;
        Ok(id)
    }

    /// Vacate a slot, handing back the node it held.
    fn free(&mut self, id: NodeId) -> Node<V> {
        let slot = std::mem::replace(&mut self.slots[id.index()], Slot::Vacant(self.free_head));
        let Slot::Occupied(node) = slot else {
            unreachable!("double free of node {id:?}");
        };
        self.free_head = Some(id);
        self.occupied -= 1;
        node
    }

    #[inline]
    pub(crate) fn get(&self, id: NodeId) -> &Node<V> {
        match &self.slots[id.index()] {
            Slot::Occupied(node) => node,
            Slot::Vacant(_) => unreachable!("dangling node id {id:?}"),
        }
    }

    #[inline]
    fn get_mut(&mut self, id: NodeId) -> &mut Node<V> {
        match &mut self.slots[id.index()] {
            Slot::Occupied(node) => node,
            Slot::Vacant(_) => unreachable!("dangling node id {id:?}"),
        }
    }

    #[inline]
    fn len(&self) -> usize {
        self.occupied
    }

    fn clear(&mut self) {
        self.slots.clear();
        self.free_head = None;
        self.occupied = 0;
    }
}

// =============================================================================
// QuadTree
// =============================================================================

/// A map from [`Point`] keys to values, stored as a point quadtree.
///
/// Keys match under [`Point::approx_eq`]. Lookups, insertions and removals
/// cost O(depth), and depth is bounded only by the number of entries.
#[derive(Clone)]
pub struct QuadTree<V> {
    pub(crate) nodes: NodeArena<V>,
    pub(crate) root: Option<NodeId>,
    pub(crate) tombstones: usize,
    config: Config,
}

impl<V> QuadTree<V> {
    pub fn new() -> Self {
        Self {
            nodes: NodeArena::new(),
            root: None,
            tombstones: 0,
            config: Config::default(),
        }
    }

    /// Create a tree with the given configuration, reserving
    /// `config.initial_capacity` nodes up front.
    pub fn with_config(config: Config) -> Result<Self, MapError> {
        Ok(Self {
            nodes: NodeArena::with_capacity(config.initial_capacity)?,
            root: None,
            tombstones: 0,
            config,
        })
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Number of live entries.
    ///
    /// Not cached: every call walks the whole tree. Tombstones are skipped
    /// but their subtrees are still counted.
    pub fn len(&self) -> usize {
        let mut count = 0usize;
        let mut stack: Vec<NodeId> = self.root.into_iter().collect();
        while let Some(id) = stack.pop() {
            let node = self.nodes.get(id);
            if !node.is_tombstone() {
                count += 1;
            }
            stack.extend(node.children.iter().flatten());
        }
        count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of nodes on the longest root-to-leaf path, tombstones included.
    /// Zero for an empty tree.
    pub fn height(&self) -> usize {
        let mut max = 0usize;
        let mut stack: Vec<(NodeId, usize)> = self.root.map(|id| (id, 1)).into_iter().collect();
        while let Some((id, depth)) = stack.pop() {
            max = max.max(depth);
            let node = self.nodes.get(id);
            stack.extend(node.children.iter().flatten().map(|&child| (child, depth + 1)));
        }
        max
    }

    /// Nodes physically present, live or tombstoned.
    #[inline]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn tombstone_count(&self) -> usize {
        self.tombstones
    }

    /// Drop every node.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.root = None;
        self.tombstones = 0;
    }

    /// Walk the routed path for `key`, returning the matching node even if
    /// it is a tombstone.
    pub(crate) fn find(&self, key: &Point) -> Option<NodeId> {
        let mut current = self.root?;
        loop {
            let node = self.nodes.get(current);
            if node.key.approx_eq(key) {
                return Some(current);
            }
            current = node.children[locate(&node.key, key).index()]?;
        }
    }

    pub fn get(&self, key: &Point) -> Option<&V> {
        let id = self.find(key)?;
        self.nodes.get(id).value.as_ref()
    }

    pub fn get_mut(&mut self, key: &Point) -> Option<&mut V> {
        let id = self.find(key)?;
        self.nodes.get_mut(id).value.as_mut()
    }

    pub fn contains_key(&self, key: &Point) -> bool {
        self.get(key).is_some()
    }

    /// Insert `value` under `key`.
    ///
    /// Returns the live value that was replaced, if any. Inserting over a
    /// tombstone revives the node and returns `Ok(None)`. On error the tree
    /// is left unchanged.
    pub fn insert(&mut self, key: Point, value: V) -> Result<Option<V>, MapError> {
        let Some(mut current) = self.root else {
            let id = self.nodes.alloc(Node::new(key, value))?;
            self.root = Some(id);
            trace!(?key, "created root node");
            return Ok(None);
        };

        loop {
            let node = self.nodes.get_mut(current);
            if node.key.approx_eq(&key) {
                let old = node.value.replace(value);
                if old.is_none() {
                    self.tombstones -= 1;
                    trace!(?key, "revived tombstone");
                }
                return Ok(old);
            }

            let quadrant = locate(&node.key, &key);
            let next = node.children[quadrant.index()];
            match next {
                Some(child) => current = child,
                None => {
                    let id = self.nodes.alloc(Node::new(key, value))?;
                    self.nodes.get_mut(current).children[quadrant.index()] = Some(id);
                    trace!(?key, ?quadrant, "created node");
                    return Ok(None);
                }
            }
        }
    }

    /// Remove the live entry under `key`, returning its value.
    ///
    /// Returns `None` if the key is absent or already tombstoned.
    pub fn remove(&mut self, key: &Point) -> Option<V> {
        // Parent node and the slot index that leads to `current`.
        let mut parent: Option<(NodeId, usize)> = None;
        let mut current = self.root?;
        loop {
            let node = self.nodes.get(current);
            if node.key.approx_eq(key) {
                break;
            }
            let slot = locate(&node.key, key).index();
            let child = node.children[slot]?;
            parent = Some((current, slot));
            current = child;
        }

        let node = self.nodes.get(current);
        if node.is_tombstone() {
            return None;
        }

        let occupied = {
            let mut slots = node.children.iter().flatten().copied();
            (slots.next(), slots.next())
        };
        let removed = match occupied {
            (None, _) => {
                self.relink(parent, None);
                trace!(?key, "removed leaf");
                self.nodes.free(current).value
            }
            (Some(child), None) => {
                self.relink(parent, Some(child));
                trace!(?key, "spliced out single-child node");
                self.nodes.free(current).value
            }
            (Some(_), Some(_)) => {
                self.tombstones += 1;
                trace!(?key, "tombstoned node with multiple children");
                self.nodes.get_mut(current).value.take()
            }
        };

        if let Some(threshold) = self.config.compaction_threshold {
            if self.tombstones >= threshold {
                if let Err(err) = self.compact() {
                    debug!(%err, tombstones = self.tombstones, "compaction skipped");
                }
            }
        }

        removed
    }

    /// Point the slot that held a removed node at `child` instead.
    fn relink(&mut self, parent: Option<(NodeId, usize)>, child: Option<NodeId>) {
        match parent {
            Some((id, slot)) => self.nodes.get_mut(id).children[slot] = child,
            None => self.root = child,
        }
    }

    /// Rebuild the tree without tombstones.
    ///
    /// Live entries are reinserted in pre-order, so each one still lands
    /// below its surviving ancestors. Returns the number of tombstones
    /// purged. Fails only if the new arena cannot be reserved, in which case
    /// the tree is untouched.
    ///
    /// Two live keys within epsilon of each other can sit in different
    /// subtrees of a tombstone's pivot. Without that pivot, the rebuild would
    /// route one onto the other and lose an entry. When that happens the tree
    /// is left as it is and `Ok(0)` is returned.
    pub fn compact(&mut self) -> Result<usize, MapError> {
        if self.tombstones == 0 {
            return Ok(0);
        }

        let live = self.len();
        if self.rebuild_would_merge(live)? {
            debug!(tombstones = self.tombstones, live, "compaction would merge keys, skipped");
            return Ok(0);
        }

        let fresh = NodeArena::with_capacity(live.max(self.config.initial_capacity))?;
        let mut old = std::mem::replace(&mut self.nodes, fresh);
        let mut stack: Vec<NodeId> = self.root.take().into_iter().collect();
        let purged = std::mem::take(&mut self.tombstones);

        while let Some(id) = stack.pop() {
            let node = old.free(id);
            stack.extend(node.children.iter().rev().flatten());
            if let Some(value) = node.value {
                // Capacity for every live node was reserved above.
                let replaced = self.insert(node.key, value)?;
                debug_assert!(replaced.is_none(), "rebuild merged {:?}", node.key);
            }
        }

        debug!(purged, live, "compacted tree");
        Ok(purged)
    }

    /// Replay the rebuild on keys alone and report whether any key would
    /// match one inserted before it.
    fn rebuild_would_merge(&self, live: usize) -> Result<bool, MapError> {
        let mut keys: QuadTree<()> = QuadTree::with_config(Config {
            initial_capacity: live,
            ..Config::default()
        })?;
        for (key, _) in self.iter() {
            if keys.insert(key, ())?.is_some() {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Iterate over live entries in pre-order, children visited NW, NE, SW, SE.
    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            tree: self,
            stack: self.root.into_iter().collect(),
        }
    }
}

impl<V> Default for QuadTree<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: fmt::Debug> fmt::Debug for QuadTree<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

pub struct Iter<'a, V> {
    tree: &'a QuadTree<V>,
    stack: Vec<NodeId>,
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = (Point, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(id) = self.stack.pop() {
            let node = self.tree.nodes.get(id);
            self.stack.extend(node.children.iter().rev().flatten());
            if let Some(value) = node.value.as_ref() {
                return Some((node.key, value));
            }
        }
        None
    }
}

impl<'a, V> IntoIterator for &'a QuadTree<V> {
    type Item = (Point, &'a V);
    type IntoIter = Iter<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
