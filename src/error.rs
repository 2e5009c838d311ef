//! Map error types.

use thiserror::Error;

/// Errors reported by map operations.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum MapError {
    #[error("Missing tree handle or data")]
    NullArgument,

    #[error("Failed to allocate a tree node")]
    AllocationFailure,

    #[error("Key not found")]
    NotFound,
}
