//! Crawlers kept alive across ticks, one per run key, least recently used evicted first.

use log::debug;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::core::Crawler;
use super::guard::RunKey;

pub type SharedCrawler = Arc<Mutex<Crawler>>;

pub struct CrawlerRegistry {
    capacity: usize,
    /// Front is least recently used.
    entries: Mutex<VecDeque<(RunKey, SharedCrawler)>>,
}

impl CrawlerRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: Mutex::new(VecDeque::new()),
        }
    }

    fn entries(&self) -> MutexGuard<'_, VecDeque<(RunKey, SharedCrawler)>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Crawler for `key`, created with `make` if absent. Marks it most recently used.
    pub fn get_or_create<F>(&self, key: &RunKey, make: F) -> SharedCrawler
    where
        F: FnOnce() -> Crawler,
    {
        let mut entries = self.entries();
        if let Some(pos) = entries.iter().position(|(k, _)| k == key)
            && let Some(entry) = entries.remove(pos)
        {
            let crawler = Arc::clone(&entry.1);
            entries.push_back(entry);
            return crawler;
        }
        let crawler = Arc::new(Mutex::new(make()));
        entries.push_back((key.clone(), Arc::clone(&crawler)));
        while entries.len() > self.capacity {
            if let Some((evicted, _)) = entries.pop_front() {
                debug!("Evicting crawler {}", evicted);
            }
        }
        crawler
    }

    pub fn get(&self, key: &RunKey) -> Option<SharedCrawler> {
        self.entries()
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, c)| Arc::clone(c))
    }

    pub fn remove(&self, key: &RunKey) -> Option<SharedCrawler> {
        let mut entries = self.entries();
        let pos = entries.iter().position(|(k, _)| k == key)?;
        entries.remove(pos).map(|(_, c)| c)
    }

    /// Snapshot of all crawlers, least recently used first.
    pub fn crawlers(&self) -> Vec<(RunKey, SharedCrawler)> {
        self.entries().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
