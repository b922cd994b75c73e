//! Frontier: directories discovered but not yet explored.
//!
//! A min-heap under a total order: oldest modification time first, ties broken by path. Stale
//! content is refreshed first and the order never depends on insertion history. Only
//! directories are accepted, and a path already queued is not queued twice.

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashSet};

use crate::Document;

/// Heap slot ordered by `(mtime_ns, path)`.
#[derive(Debug)]
struct Queued(Document);

impl Queued {
    fn key(&self) -> (i64, &str) {
        (self.0.mtime_ns, self.0.path.as_str())
    }
}

impl PartialEq for Queued {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Queued {}

impl PartialOrd for Queued {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Queued {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

#[derive(Debug, Default)]
pub struct Frontier {
    heap: BinaryHeap<Reverse<Queued>>,
    queued: HashSet<String>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a directory. Returns false for files and for paths already queued.
    pub fn push(&mut self, doc: Document) -> bool {
        if !doc.is_dir() || !self.queued.insert(doc.path.clone()) {
            return false;
        }
        self.heap.push(Reverse(Queued(doc)));
        true
    }

    /// Remove and return the minimal directory.
    pub fn pop(&mut self) -> Option<Document> {
        let Reverse(Queued(doc)) = self.heap.pop()?;
        self.queued.remove(&doc.path);
        Some(doc)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.queued.contains(path)
    }
}
