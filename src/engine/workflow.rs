//! Index workflow: the entry point a trigger (CLI, scheduler) calls to run one bulk crawl for a
//! session.

use anyhow::Result;
use log::{debug, info};
use std::sync::{Arc, PoisonError};

use crate::backend::Backend;
use crate::utils::config::Defaults;
use crate::{CrawlOpts, Session, WorkflowOutcome};

use super::bulk::bulk_run;
use super::core::Crawler;
use super::guard::{RunGuard, RunKey};
use super::progress::{create_counter, finish_bar, refresh_bar};
use super::registry::CrawlerRegistry;
use super::store::IndexStore;

pub struct IndexWorkflow {
    opts: CrawlOpts,
    store: Arc<dyn IndexStore>,
    guard: RunGuard,
    registry: CrawlerRegistry,
}

impl IndexWorkflow {
    pub fn new(opts: CrawlOpts, store: Arc<dyn IndexStore>) -> Self {
        let registry = CrawlerRegistry::new(opts.max_crawlers);
        Self {
            opts,
            store,
            guard: RunGuard::new(),
            registry,
        }
    }

    pub fn opts(&self) -> &CrawlOpts {
        &self.opts
    }

    pub fn guard(&self) -> &RunGuard {
        &self.guard
    }

    pub fn registry(&self) -> &CrawlerRegistry {
        &self.registry
    }

    pub fn store(&self) -> &dyn IndexStore {
        self.store.as_ref()
    }

    /// Run key `session` maps to under the current options.
    pub fn run_key(&self, session: &Session) -> RunKey {
        RunKey::for_session(session, self.opts.shared_index)
    }

    /// Bulk-crawl `path` (default `/`) of `backend` for `session`.
    ///
    /// Returns [`WorkflowOutcome::Skipped`] without touching anything when a run with the same
    /// key is already in flight.
    pub fn execute(
        &self,
        session: &Session,
        backend: Arc<dyn Backend>,
        path: Option<&str>,
    ) -> Result<WorkflowOutcome> {
        let key = self.run_key(session);
        let Some(permit) = self.guard.acquire(key) else {
            info!("A crawl for this session is already running, skipping");
            return Ok(WorkflowOutcome::Skipped);
        };
        let root = path.unwrap_or(Defaults::ROOT_PATH);
        debug!("Run {} on {}", permit.key(), root);

        let crawler = self.registry.get_or_create(permit.key(), || {
            Crawler::new(backend, self.opts.clone())
        });
        let mut crawler = crawler.lock().unwrap_or_else(PoisonError::into_inner);

        let bar = self.opts.verbose.then(|| create_counter("Crawling"));
        if let Some(ref b) = bar {
            refresh_bar(b);
        }
        let report = bulk_run(
            &mut crawler,
            self.store.as_ref(),
            root,
            self.opts.workers,
            bar.as_ref(),
        )?;
        if let Some(ref b) = bar {
            finish_bar(b);
        }
        Ok(WorkflowOutcome::Completed(report))
    }
}
