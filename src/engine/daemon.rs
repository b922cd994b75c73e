//! Maintenance loop: single-step cycles on a timer, so the index keeps converging after the
//! initial bulk run.

use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, select, tick};
use log::{debug, info, warn};

use crate::{CycleReport, Phase};

use super::core::Crawler;
use super::store::IndexStore;

/// One maintenance tick on `crawler`.
///
/// A paused crawler is resumed. A crawler back in `Discover` with nothing queued gets `root`
/// queued again, so stale directories are revisited. Then one cycle runs within the crawler's
/// cycle budget.
pub fn maintenance_tick(
    crawler: &mut Crawler,
    store: &dyn IndexStore,
    root: &str,
) -> Result<CycleReport> {
    crawler.resume();
    if crawler.phase() == Phase::Discover && crawler.is_idle() {
        let tx = store.begin().context("begin index transaction")?;
        if crawler.seed_root(tx.as_ref(), root) {
            debug!("Root {} was missing from the index", root);
        }
        tx.commit().context("commit root record")?;
    }
    let budget = crawler.opts().cycle_time;
    crawler.run_cycle(store, budget)
}

/// Run maintenance ticks every `opts.tick` of the crawler until `shutdown` fires or disconnects.
/// Returns the number of ticks run. A failed tick is logged and the loop goes on.
pub fn run_maintenance(
    crawler: &mut Crawler,
    store: &dyn IndexStore,
    root: &str,
    shutdown: &Receiver<()>,
) -> Result<usize> {
    let every = crawler.opts().tick;
    let ticker = tick(every);
    let mut ticks = 0_usize;
    info!("Watching {} every {:?}", root, every);
    loop {
        match maintenance_tick(crawler, store, root) {
            Ok(report) => {
                ticks += 1;
                debug!(
                    "Tick {}: {} steps, {:?} -> {:?}",
                    ticks, report.steps, report.phase_before, report.phase_after
                );
            }
            Err(err) => warn!("Maintenance tick failed: {:#}", err),
        }
        select! {
            recv(ticker) -> _ => {}
            recv(shutdown) -> _ => break,
        }
    }
    info!("Stopped after {} ticks", ticks);
    Ok(ticks)
}
