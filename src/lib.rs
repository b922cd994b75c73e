//! Crawldex: incremental crawler that keeps a SQLite path index of a storage backend fresh

pub mod backend;
pub mod engine;
pub mod types;
pub mod utils;

/// Re-export types for API
pub use types::*;

use log::debug;

use crate::backend::Backend;
use crate::engine::{Crawler, IndexStore, bulk_run};

/// Result alias used by public crawldex API
pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// Single entry point for a one-off crawl: bulk-crawl `root` of `backend` into `store` with a
/// fresh crawler and return the run report.
///
/// No run de-duplication and no crawler reuse; use [`engine::IndexWorkflow`] for those.
///
/// ```ignore
/// let backend = Arc::new(crawldex::backend::LocalBackend::new(dir)?);
/// let store = crawldex::engine::SqliteIndex::open(&dir.join(".crawldex"))?;
/// let report = crawldex::crawl_once(backend, &store, "/", &CrawlOpts::default())?;
/// ```
pub fn crawl_once(
    backend: std::sync::Arc<dyn Backend>,
    store: &dyn IndexStore,
    root: &str,
    opts: &CrawlOpts,
) -> Result<BulkReport> {
    let config_str = format!(
        "{} CONFIG:{:#?}",
        env!("CARGO_PKG_NAME").to_string().to_uppercase(),
        opts
    );
    debug!("{}", config_str);

    let mut crawler = Crawler::new(backend, opts.clone());
    bulk_run(&mut crawler, store, root, opts.workers, None)
}
