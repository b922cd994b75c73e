//! Crawler state machine: frontier, phase and the discovery step.

use anyhow::{Context, Result};
use log::{debug, error, trace, warn};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use crate::backend::{Backend, FileInfo};
use crate::{CrawlOpts, CycleReport, Document, KnownFilePolicy, Phase};

use super::frontier::Frontier;
use super::store::{IndexError, IndexStore, IndexTx};
use super::tools::{enforce_directory, is_excluded, name_of, needs_reindex, parent_of};

/// Work for the `Index` and `Maintain` phases (content extraction, cleanup). Returns whether a
/// unit of work was done; returning false hands over to the next phase.
pub trait PhaseWorker: Send {
    fn run(&mut self, tx: &dyn IndexTx) -> bool;
}

/// Counts from merging one listing into the frontier.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct MergeStats {
    pub inserted: usize,
    pub pushed: usize,
    /// False when the listing was cut short (known file or failed file insert).
    pub completed: bool,
}

/// Merge the listing `files` of `doc` into `frontier`: exclusion filter, index insert, staleness
/// check. Shared by the single-step path and the bulk workers (which call it under their lock).
pub(crate) fn merge_listing(
    frontier: &mut Frontier,
    opts: &CrawlOpts,
    tx: &dyn IndexTx,
    doc: &Document,
    files: &[FileInfo],
) -> MergeStats {
    let now = SystemTime::now();
    let mut stats = MergeStats::default();
    for file in files {
        if is_excluded(&doc.path, &file.name, &opts.exclusion) {
            trace!("excluded {}{}", doc.path, file.name);
            continue;
        }
        let child = Document::child_of(&doc.path, file);
        if file.is_dir {
            let push = match tx.insert(&doc.path, file) {
                Ok(()) => {
                    stats.inserted += 1;
                    true
                }
                Err(IndexError::Constraint) => {
                    refresh_if_stale(tx, &child.path, now, opts.reindex_hours)
                }
                Err(err) => {
                    error!("Cannot insert {} into index: {}", child.path, err);
                    false
                }
            };
            if push && frontier.push(child) {
                stats.pushed += 1;
            }
        } else {
            match tx.insert(&doc.path, file) {
                Ok(()) => stats.inserted += 1,
                Err(IndexError::Constraint) => match opts.known_file {
                    KnownFilePolicy::StopDirectory => {
                        debug!("{} already indexed, leaving {}", child.path, doc.path);
                        return stats;
                    }
                    KnownFilePolicy::SkipFile => continue,
                },
                Err(err) => {
                    warn!("Cannot insert {} into index: {}", child.path, err);
                    return stats;
                }
            }
        }
    }
    stats.completed = true;
    stats
}

/// For a directory already in the index: refresh its timestamp and return true if it is stale.
fn refresh_if_stale(tx: &dyn IndexTx, path: &str, now: SystemTime, window_hours: u64) -> bool {
    let indexed_at = match tx.indexed_at(path) {
        Ok(t) => t,
        Err(err) => {
            warn!("Cannot read index time of {}: {}", path, err);
            return false;
        }
    };
    if !needs_reindex(indexed_at, now, window_hours) {
        return false;
    }
    if let Err(err) = tx.set_indexed_at(path, now) {
        warn!("Cannot refresh index time of {}: {}", path, err);
        return false;
    }
    debug!("{} is stale, exploring again", path);
    true
}

/// Owner of the frontier, the current phase and the backend handle for one actor.
///
/// Single-step methods take `&mut self`, and so does [`bulk_drain`](super::bulk::bulk_drain):
/// the two modes cannot run against the same crawler at once.
pub struct Crawler {
    backend: Arc<dyn Backend>,
    frontier: Frontier,
    phase: Phase,
    opts: CrawlOpts,
    index_worker: Option<Box<dyn PhaseWorker>>,
    maintain_worker: Option<Box<dyn PhaseWorker>>,
}

impl Crawler {
    pub fn new(backend: Arc<dyn Backend>, opts: CrawlOpts) -> Self {
        Self {
            backend,
            frontier: Frontier::new(),
            phase: Phase::Discover,
            opts,
            index_worker: None,
            maintain_worker: None,
        }
    }

    pub fn with_index_worker(mut self, worker: Box<dyn PhaseWorker>) -> Self {
        self.index_worker = Some(worker);
        self
    }

    pub fn with_maintain_worker(mut self, worker: Box<dyn PhaseWorker>) -> Self {
        self.maintain_worker = Some(worker);
        self
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn opts(&self) -> &CrawlOpts {
        &self.opts
    }

    pub fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }

    /// Directories waiting in the frontier.
    pub fn queued(&self) -> usize {
        self.frontier.len()
    }

    pub fn is_queued(&self, path: &str) -> bool {
        self.frontier.contains(&enforce_directory(path))
    }

    /// True when nothing is left to explore.
    pub fn is_idle(&self) -> bool {
        self.frontier.is_empty()
    }

    /// Queue `path` for exploration. Returns false if it was already queued.
    pub fn hint(&mut self, path: &str) -> bool {
        self.frontier.push(Document::directory(path))
    }

    /// Insert the index record of `root` itself, then queue it. Returns true if the record is new.
    pub fn seed_root(&mut self, tx: &dyn IndexTx, root: &str) -> bool {
        let root = enforce_directory(root);
        let info = FileInfo::directory(name_of(&root), 0);
        let inserted = match tx.insert(&parent_of(&root), &info) {
            Ok(()) => true,
            Err(IndexError::Constraint) => false,
            Err(err) => {
                warn!("Cannot insert root {} into index: {}", root, err);
                false
            }
        };
        self.hint(&root);
        inserted
    }

    /// Leave `Pause` and go back to discovery. Returns false if the crawler was not paused.
    pub fn resume(&mut self) -> bool {
        if self.phase != Phase::Pause {
            return false;
        }
        debug!("Resuming discovery ({} queued)", self.frontier.len());
        self.phase = Phase::Discover;
        true
    }

    /// Advance to the next phase of the cycle.
    pub fn next(&mut self) {
        self.phase = self.phase.next();
    }

    pub fn discover_pop(&mut self) -> Option<Document> {
        self.frontier.pop()
    }

    /// Merge the listing of `doc`. Returns false if the listing was cut short.
    pub fn discover_push(&mut self, doc: &Document, files: &[FileInfo], tx: &dyn IndexTx) -> bool {
        merge_listing(&mut self.frontier, &self.opts, tx, doc, files).completed
    }

    /// One unit of discovery: pop, list, merge. Returns whether work was done.
    ///
    /// An empty frontier advances the phase and reports no work. A listing failure pauses the
    /// crawler and reports work so the caller stops spinning.
    pub fn discover(&mut self, tx: &dyn IndexTx) -> bool {
        let Some(doc) = self.discover_pop() else {
            self.next();
            return false;
        };
        debug!("Discovering {}", doc.path);
        let files = match self.backend.ls(&doc.path) {
            Ok(files) => files,
            Err(err) => {
                warn!("Cannot list {}, pausing: {:#}", doc.path, err);
                self.phase = Phase::Pause;
                return true;
            }
        };
        self.discover_push(&doc, &files, tx)
    }

    /// One unit of work for the current phase.
    pub fn step(&mut self, tx: &dyn IndexTx) -> bool {
        match self.phase {
            Phase::Discover => self.discover(tx),
            Phase::Index | Phase::Maintain => {
                let worker = match self.phase {
                    Phase::Index => self.index_worker.as_mut(),
                    _ => self.maintain_worker.as_mut(),
                };
                let worked = worker.is_some_and(|w| w.run(tx));
                if !worked {
                    self.next();
                }
                worked
            }
            Phase::Pause => false,
        }
    }

    /// Run steps inside one transaction until a step reports no work or `budget` is spent.
    /// Commit failure is logged, not returned.
    ///
    /// A listing cut short by a known file reports no work but leaves the crawler in `Discover`;
    /// the cycle keeps popping until the frontier is exhausted and the phase advances.
    pub fn run_cycle(&mut self, store: &dyn IndexStore, budget: Duration) -> Result<CycleReport> {
        let started = Instant::now();
        let phase_before = self.phase;
        let tx = store.begin().context("begin index transaction")?;
        let mut steps = 0_usize;
        while started.elapsed() < budget {
            let discovering = self.phase == Phase::Discover;
            let worked = self.step(tx.as_ref());
            if !worked && !(discovering && self.phase == Phase::Discover) {
                break;
            }
            steps += 1;
        }
        let committed = match tx.commit() {
            Ok(()) => true,
            Err(err) => {
                warn!("Cannot commit cycle: {}", err);
                false
            }
        };
        debug!(
            "Cycle {:?} -> {:?}: {} steps, {} queued",
            phase_before,
            self.phase,
            steps,
            self.frontier.len()
        );
        Ok(CycleReport {
            steps,
            phase_before,
            phase_after: self.phase,
            committed,
            elapsed_ms: started.elapsed().as_millis(),
        })
    }

    pub(crate) fn take_frontier(&mut self) -> Frontier {
        std::mem::take(&mut self.frontier)
    }

    pub(crate) fn restore_frontier(&mut self, frontier: Frontier) {
        self.frontier = frontier;
    }
}
