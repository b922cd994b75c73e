//! Storage backends: the listing contract the crawler explores through.
//!
//! The engine never touches a filesystem directly. It asks a [`Backend`] for the immediate
//! children of a logical path (`/`-separated, directories ending in `/`). Errors are opaque:
//! "cannot explore further" is all the crawler needs to know.

mod local;
mod memory;

pub use local::LocalBackend;
pub use memory::MemoryBackend;

use anyhow::Result;

/// One child returned by [`Backend::ls`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileInfo {
    pub name: String,
    pub is_dir: bool,
    /// Size in bytes (0 for directories).
    pub size: u64,
    /// Modification time in nanoseconds since epoch.
    pub mtime_ns: i64,
}

impl FileInfo {
    pub fn file(name: impl Into<String>, size: u64, mtime_ns: i64) -> Self {
        Self {
            name: name.into(),
            is_dir: false,
            size,
            mtime_ns,
        }
    }

    pub fn directory(name: impl Into<String>, mtime_ns: i64) -> Self {
        Self {
            name: name.into(),
            is_dir: true,
            size: 0,
            mtime_ns,
        }
    }
}

/// Listing side of a storage backend. Shared by every worker of a bulk run.
pub trait Backend: Send + Sync {
    /// Immediate children of the directory at `path`.
    fn ls(&self, path: &str) -> Result<Vec<FileInfo>>;
}
