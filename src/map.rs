//! Status-code facade over [`QuadTree`].
//!
//! These functions take the tree handle as an `Option` so that a missing
//! handle is reported like any other failure instead of being ruled out by
//! the type system. Each status function has a `try_` twin returning
//! [`MapError`] for callers that want the reason.

use tracing::debug;

use crate::error::MapError;
use crate::geometry::Point;
use crate::tree::QuadTree;
use crate::Config;

/// Outcome of a map operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Status {
    Failure = 0,
    Success = 1,
    /// An existing live entry was overwritten.
    SuccessReplaced = 2,
}

impl Status {
    #[inline]
    pub const fn code(self) -> u8 {
        self as u8
    }

    #[inline]
    pub const fn is_success(self) -> bool {
        !matches!(self, Status::Failure)
    }
}

impl From<Status> for u8 {
    #[inline]
    fn from(status: Status) -> Self {
        status.code()
    }
}

/// Create an empty map. `None` only if the initial allocation fails.
pub fn init<V>() -> Option<QuadTree<V>> {
    QuadTree::with_config(Config::default()).ok()
}

/// Release every node and invalidate the handle.
pub fn free<V>(tree: &mut Option<QuadTree<V>>) {
    drop(tree.take());
}

pub fn try_add<V>(tree: Option<&mut QuadTree<V>>, key: Point, data: Option<V>) -> Result<Status, MapError> {
    let tree = tree.ok_or(MapError::NullArgument)?;
    let data = data.ok_or(MapError::NullArgument)?;
    Ok(match tree.insert(key, data)? {
        Some(_) => Status::SuccessReplaced,
        None => Status::Success,
    })
}

/// Insert or replace the entry under `key`.
///
/// `Success` for a new key or a revived tombstone, `SuccessReplaced` when a
/// live value was overwritten.
pub fn add<V>(tree: Option<&mut QuadTree<V>>, key: Point, data: Option<V>) -> Status {
    try_add(tree, key, data).unwrap_or_else(|err| {
        debug!(%err, ?key, "add failed");
        Status::Failure
    })
}

pub fn try_get<V>(tree: Option<&QuadTree<V>>, key: Point) -> Result<&V, MapError> {
    tree.ok_or(MapError::NullArgument)?
        .get(&key)
        .ok_or(MapError::NotFound)
}

pub fn get<V>(tree: Option<&QuadTree<V>>, key: Point) -> Option<&V> {
    try_get(tree, key).ok()
}

pub fn has<V>(tree: Option<&QuadTree<V>>, key: Point) -> bool {
    tree.is_some_and(|tree| tree.contains_key(&key))
}

pub fn try_remove<V>(tree: Option<&mut QuadTree<V>>, key: Point) -> Result<V, MapError> {
    tree.ok_or(MapError::NullArgument)?
        .remove(&key)
        .ok_or(MapError::NotFound)
}

/// Remove the live entry under `key`. Tombstoned or missing keys fail.
pub fn remove<V>(tree: Option<&mut QuadTree<V>>, key: Point) -> Status {
    match try_remove(tree, key) {
        Ok(_) => Status::Success,
        Err(err) => {
            debug!(%err, ?key, "remove failed");
            Status::Failure
        }
    }
}

/// Live entry count; zero for a missing handle.
pub fn size<V>(tree: Option<&QuadTree<V>>) -> usize {
    tree.map_or(0, QuadTree::len)
}
