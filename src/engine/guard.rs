//! Run de-duplication: at most one bulk run in flight per run key.

use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::Session;
use crate::utils::config::SHARED_RUN_KEY;

/// Identifier of "one actor running one bulk crawl". Never persisted.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RunKey(String);

impl RunKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Key used by every session when the index is shared.
    pub fn shared() -> Self {
        Self::new(SHARED_RUN_KEY)
    }

    /// Deterministic key for a session: blake3 over its sorted pairs, so overlapping triggers
    /// from the same actor collapse onto one key. Every key and value is length-prefixed; no
    /// value can spell out extra pairs.
    pub fn from_session(session: &Session) -> Self {
        let mut hasher = blake3::Hasher::new();
        for (k, v) in session {
            hash_field(&mut hasher, k);
            hash_field(&mut hasher, v);
        }
        Self(hasher.finalize().to_hex().to_string())
    }

    pub fn for_session(session: &Session, shared_index: bool) -> Self {
        if shared_index {
            Self::shared()
        } else {
            Self::from_session(session)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn hash_field(hasher: &mut blake3::Hasher, field: &str) {
    hasher.update(&(field.len() as u64).to_le_bytes());
    hasher.update(field.as_bytes());
}

impl fmt::Display for RunKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Registry of run keys currently in flight.
#[derive(Debug, Default)]
pub struct RunGuard {
    running: Mutex<HashSet<RunKey>>,
}

impl RunGuard {
    pub fn new() -> Self {
        Self::default()
    }

    fn running(&self) -> MutexGuard<'_, HashSet<RunKey>> {
        self.running.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Atomically claim `key`. False if a run with that key is already in flight.
    pub fn try_acquire(&self, key: &RunKey) -> bool {
        self.running().insert(key.clone())
    }

    pub fn release(&self, key: &RunKey) {
        self.running().remove(key);
    }

    pub fn is_running(&self, key: &RunKey) -> bool {
        self.running().contains(key)
    }

    /// Claim `key` for the lifetime of the returned permit.
    pub fn acquire(&self, key: RunKey) -> Option<RunPermit<'_>> {
        self.try_acquire(&key).then(|| RunPermit { guard: self, key })
    }
}

/// Releases its key on drop.
#[derive(Debug)]
pub struct RunPermit<'a> {
    guard: &'a RunGuard,
    key: RunKey,
}

impl RunPermit<'_> {
    pub fn key(&self) -> &RunKey {
        &self.key
    }
}

impl Drop for RunPermit<'_> {
    fn drop(&mut self) {
        self.guard.release(&self.key);
    }
}
