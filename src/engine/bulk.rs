//! Bulk run: drain the whole frontier with a pool of workers, one transaction per run.
//!
//! Workers share the frontier and an `inflight` counter under one mutex. A worker that finds
//! the frontier empty while another listing is in flight waits on the condvar instead of
//! exiting, because that listing may push new directories. The pool stops once the frontier is
//! empty and nothing is in flight. Listings always run outside the lock. A listing that panics
//! still gives back its in-flight slot, so the other workers finish and the panic resumes out
//! of [`bulk_drain`].

use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Instant;

use crate::backend::Backend;
use crate::utils::fd_limit::cap_workers;
use crate::{BulkReport, CrawlOpts};

use super::core::{Crawler, merge_listing};
use super::frontier::Frontier;
use super::progress::{ProgressBar, update_progress_bar};
use super::store::{IndexStore, IndexTx};

/// State guarded by the drain lock.
struct DrainState {
    frontier: Frontier,
    inflight: usize,
    report: BulkReport,
}

struct Drain {
    state: Mutex<DrainState>,
    wake: Condvar,
}

impl Drain {
    fn lock(&self) -> MutexGuard<'_, DrainState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// One listing in flight. Dropped without [`InflightSlot::release`] (the listing unwound), it
/// decrements `inflight` and wakes the waiting workers.
struct InflightSlot<'a> {
    drain: &'a Drain,
    armed: bool,
}

impl<'a> InflightSlot<'a> {
    fn claim(drain: &'a Drain, state: &mut DrainState) -> Self {
        state.inflight += 1;
        Self { drain, armed: true }
    }

    /// Hand the slot back under the relocked drain. Waiting workers only see it once the lock
    /// is dropped, after the listing is merged.
    fn release(mut self, state: &mut DrainState) {
        self.armed = false;
        state.inflight -= 1;
        self.drain.wake.notify_all();
    }
}

impl Drop for InflightSlot<'_> {
    fn drop(&mut self) {
        if self.armed {
            let mut state = self.drain.lock();
            state.inflight -= 1;
            state.report.list_failures += 1;
            drop(state);
            self.drain.wake.notify_all();
        }
    }
}

/// Drain `crawler`'s frontier to exhaustion with `workers` threads writing through `tx`.
///
/// Does not commit and never touches the crawler's phase. The frontier is handed back to the
/// crawler (empty) when every worker has joined.
pub fn bulk_drain(
    crawler: &mut Crawler,
    tx: &dyn IndexTx,
    workers: usize,
    progress: Option<&ProgressBar>,
) -> BulkReport {
    let started = Instant::now();
    let workers = cap_workers(workers);
    let drain = Drain {
        state: Mutex::new(DrainState {
            frontier: crawler.take_frontier(),
            inflight: 0,
            report: BulkReport {
                workers,
                ..BulkReport::default()
            },
        }),
        wake: Condvar::new(),
    };
    debug!(
        "Bulk drain: {} workers, {} queued",
        workers,
        drain.lock().frontier.len()
    );

    let backend = crawler.backend();
    let opts = crawler.opts();
    thread::scope(|s| {
        for _ in 0..workers {
            let drain = &drain;
            s.spawn(move || drain_worker(drain, backend, opts, tx, progress));
        }
    });

    let DrainState {
        frontier,
        mut report,
        ..
    } = drain
        .state
        .into_inner()
        .unwrap_or_else(PoisonError::into_inner);
    crawler.restore_frontier(frontier);
    report.elapsed_ms = started.elapsed().as_millis();
    report
}

fn drain_worker(
    drain: &Drain,
    backend: &dyn Backend,
    opts: &CrawlOpts,
    tx: &dyn IndexTx,
    progress: Option<&ProgressBar>,
) {
    let mut state = drain.lock();
    loop {
        while state.frontier.is_empty() && state.inflight > 0 {
            state = drain
                .wake
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        let Some(doc) = state.frontier.pop() else {
            break;
        };
        let slot = InflightSlot::claim(drain, &mut state);
        drop(state);

        let listing = backend.ls(&doc.path);

        state = drain.lock();
        slot.release(&mut state);
        match listing {
            Ok(files) => {
                let stats = merge_listing(&mut state.frontier, opts, tx, &doc, &files);
                state.report.listed += 1;
                state.report.inserted += stats.inserted;
                state.report.pushed += stats.pushed;
            }
            Err(err) => {
                warn!("Cannot list {}, skipping subtree: {:#}", doc.path, err);
                state.report.list_failures += 1;
            }
        }
        if let Some(bar) = progress {
            update_progress_bar(bar, 1);
        }
    }
}

/// Complete bulk run of `root`: open one transaction, insert the root record, drain, commit once.
/// A commit failure is logged and reported through [`BulkReport::committed`].
pub fn bulk_run(
    crawler: &mut Crawler,
    store: &dyn IndexStore,
    root: &str,
    workers: usize,
    progress: Option<&ProgressBar>,
) -> Result<BulkReport> {
    let tx = store.begin().context("begin index transaction")?;
    let seeded = crawler.seed_root(tx.as_ref(), root);
    let mut report = bulk_drain(crawler, tx.as_ref(), workers, progress);
    if seeded {
        report.inserted += 1;
    }
    report.committed = match tx.commit() {
        Ok(()) => true,
        Err(err) => {
            warn!("Cannot commit bulk run of {}: {}", root, err);
            false
        }
    };
    info!(
        "Crawled {}: {} directories listed, {} new records, {} failures in {} ms",
        root, report.listed, report.inserted, report.list_failures, report.elapsed_ms
    );
    Ok(report)
}
