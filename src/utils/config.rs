//! Application configuration constants.
//! Defaults and package-derived names in one place.

use std::sync::OnceLock;

// ---- Package / paths (from CARGO_PKG_NAME, cached) ----

/// Package-derived names: built once from `CARGO_PKG_NAME`, then cached.
pub struct PackagePaths {
    pkg_name: &'static str,
    db_filename: String,
    config_filename: String,
    env_prefix: String,
}

static PACKAGE_PATHS: OnceLock<PackagePaths> = OnceLock::new();

impl PackagePaths {
    /// Build and cache names from `CARGO_PKG_NAME`. Called once on first use.
    pub fn get() -> &'static PackagePaths {
        PACKAGE_PATHS.get_or_init(|| {
            let pkg = env!("CARGO_PKG_NAME");
            PackagePaths {
                pkg_name: pkg,
                db_filename: format!(".{pkg}"),
                config_filename: format!(".{pkg}.toml"),
                env_prefix: format!("{}_", pkg.to_uppercase()),
            }
        })
    }

    pub fn pkg_name(&self) -> &str {
        self.pkg_name
    }

    /// Default index database filename, created in the crawled directory.
    pub fn db_filename(&self) -> &str {
        &self.db_filename
    }

    pub fn config_filename(&self) -> &str {
        &self.config_filename
    }

    /// Full environment variable name for a setting, e.g. `CRAWLDEX_WORKERS`.
    pub fn env_var(&self, key: &str) -> String {
        format!("{}{}", self.env_prefix, key)
    }

    /// Names always skipped when crawling a local directory: the index database and the files
    /// SQLite keeps next to it.
    pub fn default_exclude_patterns(&self) -> Vec<String> {
        let db = self.db_filename();
        vec![
            db.to_string(),
            format!("{db}-wal"),
            format!("{db}-shm"),
            format!("{db}-journal"),
        ]
    }
}

// ---- Crawl defaults ----

/// Defaults for [`crate::CrawlOpts`].
pub struct Defaults;

impl Defaults {
    /// Folder names skipped unless the exclusion list is configured.
    pub const EXCLUSION: &'static str = "node_modules,bower_components,.cache,.npm,.git";
    /// Hours after which an indexed directory is considered stale.
    pub const REINDEX_HOURS: u64 = 24;
    /// Time budget for one single-step cycle (seconds).
    pub const CYCLE_SECS: u64 = 10;
    /// Worker pool size for bulk runs.
    pub const WORKERS: usize = 2;
    /// Crawlers kept alive in the registry.
    pub const MAX_CRAWLERS: usize = 5;
    /// Interval between maintenance ticks (seconds).
    pub const TICK_SECS: u64 = 60;
    /// Logical path a run starts from when none is given.
    pub const ROOT_PATH: &'static str = "/";
}

// ---- Run keys ----

/// Run key used for every session when the index is shared.
pub const SHARED_RUN_KEY: &str = "shared";
