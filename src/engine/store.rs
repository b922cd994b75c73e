//! Index store gateway: the transactional contract the crawler writes path records through.
//!
//! The engine relies on the uniqueness constraint of `insert` as its "have I seen this path"
//! signal, so [`IndexError::Constraint`] is a distinguished kind rather than a failure.

use std::time::SystemTime;

use crate::backend::FileInfo;

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// The path already has a record.
    #[error("path already indexed")]
    Constraint,
    #[error("path not in index: {0}")]
    NotFound(String),
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// An open index transaction. Shared by reference across bulk workers, so implementations
/// serialize their own writes.
pub trait IndexTx: Send + Sync {
    /// Insert a record for child `entry` of the directory `parent`.
    fn insert(&self, parent: &str, entry: &FileInfo) -> Result<(), IndexError>;

    /// When `path` was last (re)indexed.
    fn indexed_at(&self, path: &str) -> Result<SystemTime, IndexError>;

    fn set_indexed_at(&self, path: &str, at: SystemTime) -> Result<(), IndexError>;

    fn commit(self: Box<Self>) -> Result<(), IndexError>;
}

pub trait IndexStore: Send + Sync {
    /// Open a transaction. Dropping it without [`IndexTx::commit`] discards its writes.
    fn begin(&self) -> Result<Box<dyn IndexTx + '_>, IndexError>;
}
