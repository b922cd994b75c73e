//! In-memory backend: a synthetic tree for tests and for embedding callers that already hold a
//! listing in memory.

use anyhow::{Result, anyhow, bail};
use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, PoisonError, RwLock};

use crate::engine::tools::{enforce_directory, join_child};

use super::{Backend, FileInfo};

/// Directory path → children by name.
type Tree = BTreeMap<String, BTreeMap<String, FileInfo>>;

pub struct MemoryBackend {
    tree: RwLock<Tree>,
    failing: RwLock<HashSet<String>>,
    listed: Mutex<Vec<String>>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    /// Empty tree holding only the root `/`.
    pub fn new() -> Self {
        let mut tree = Tree::new();
        tree.insert("/".to_string(), BTreeMap::new());
        Self {
            tree: RwLock::new(tree),
            failing: RwLock::new(HashSet::new()),
            listed: Mutex::new(Vec::new()),
        }
    }

    /// Add a file, creating missing parent directories.
    pub fn add_file(&self, path: &str, size: u64, mtime_ns: i64) {
        self.insert(path, false, size, mtime_ns);
    }

    /// Add a directory, creating missing parent directories.
    pub fn add_dir(&self, path: &str, mtime_ns: i64) {
        self.insert(path, true, 0, mtime_ns);
    }

    /// Make every later `ls(path)` fail.
    pub fn fail_on(&self, path: &str) {
        self.failing
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(enforce_directory(path));
    }

    /// Paths listed since the last call, in call order.
    pub fn take_listed(&self) -> Vec<String> {
        std::mem::take(&mut *self.listed.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn insert(&self, path: &str, is_dir: bool, size: u64, mtime_ns: i64) {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let mut tree = self.tree.write().unwrap_or_else(PoisonError::into_inner);
        let mut parent = "/".to_string();
        for (i, segment) in segments.iter().enumerate() {
            let last = i + 1 == segments.len();
            let segment_is_dir = !last || is_dir;
            let info = if segment_is_dir {
                FileInfo::directory(*segment, if last { mtime_ns } else { 0 })
            } else {
                FileInfo::file(*segment, size, mtime_ns)
            };
            let children = tree.entry(parent.clone()).or_default();
            if last {
                children.insert(segment.to_string(), info);
            } else {
                children.entry(segment.to_string()).or_insert(info);
            }
            let child_path = join_child(&parent, segment, segment_is_dir);
            if segment_is_dir {
                tree.entry(child_path.clone()).or_default();
            }
            parent = child_path;
        }
    }
}

impl Backend for MemoryBackend {
    fn ls(&self, path: &str) -> Result<Vec<FileInfo>> {
        let path = enforce_directory(path);
        self.listed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(path.clone());
        if self
            .failing
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&path)
        {
            bail!("listing refused: {}", path);
        }
        let tree = self.tree.read().unwrap_or_else(PoisonError::into_inner);
        let children = tree
            .get(&path)
            .ok_or_else(|| anyhow!("no such directory: {}", path))?;
        Ok(children.values().cloned().collect())
    }
}
