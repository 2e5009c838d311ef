//! # quadmap
//!
//! A spatial key/value map backed by a point quadtree.
//!
//! Values are addressed by 2-D [`Point`] keys. Each stored key is also the
//! pivot that splits the plane into four quadrants for the entries inserted
//! after it, so the tree's shape is fixed by insertion order. Removing a node
//! with two or more children leaves a tombstone behind; see [`tree`] for the
//! deletion rules and [`QuadTree::compact`] for purging tombstones.
//!
//! ## Example
//!
//! ```rust
//! use quadmap::{Point, QuadTree};
//!
//! let mut tree: QuadTree<&str> = QuadTree::new();
//! tree.insert(Point::new(0.0, 0.0), "root").unwrap();
//! tree.insert(Point::new(1.0, 1.0), "ne").unwrap();
//! tree.insert(Point::new(-1.0, 1.0), "nw").unwrap();
//!
//! assert_eq!(tree.remove(&Point::new(0.0, 0.0)), Some("root"));
//! assert_eq!(tree.len(), 2);
//! assert_eq!(tree.tombstone_count(), 1);
//! assert_eq!(tree.get(&Point::new(1.0, 1.0)), Some(&"ne"));
//! ```
//!
//! The [`map`] module offers the same operations with tri-state
//! [`Status`] codes:
//!
//! ```rust
//! use quadmap::{map, Point, Status};
//!
//! let mut handle = map::init::<u32>();
//! assert_eq!(map::add(handle.as_mut(), Point::new(2.0, 3.0), Some(1)), Status::Success);
//! assert_eq!(map::add(handle.as_mut(), Point::new(2.0, 3.0), Some(2)), Status::SuccessReplaced);
//! assert_eq!(map::get(handle.as_ref(), Point::new(2.0, 3.0)), Some(&2));
//! map::free(&mut handle);
//! ```

pub mod epsilon;
mod error;
pub mod geometry;
pub mod map;
pub mod tree;

pub use error::MapError;
pub use geometry::{Point, Rect};
pub use map::Status;
pub use tree::{locate, Iter, QuadTree, Quadrant};

/// Configuration for a [`QuadTree`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Nodes reserved when the tree is created.
    pub initial_capacity: usize,
    /// Compact automatically once a removal brings the tombstone count to
    /// this value. `None` keeps tombstones until they are revived or
    /// [`QuadTree::compact`] is called.
    pub compaction_threshold: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            initial_capacity: 0,
            compaction_threshold: None,
        }
    }
}

#[cfg(test)]
mod proptests;
