//! Load `.crawldex.toml` and `CRAWLDEX_*` environment overrides (CLI only). The lib takes a
//! ready [`CrawlOpts`](crate::CrawlOpts) and never reads either.

use log::{debug, warn};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::engine::tools::parse_exclusion_list;
use crate::utils::config::PackagePaths;
use crate::{CrawlOpts, KnownFilePolicy};

#[derive(Debug, Default, Deserialize)]
pub struct CrawldexToml {
    #[serde(default)]
    pub settings: SettingsSection,
}

#[derive(Debug, Default, Deserialize)]
pub struct SettingsSection {
    pub db_path: Option<String>,
    /// Comma-separated, same format as `CRAWLDEX_EXCLUSION`.
    pub exclusion: Option<String>,
    pub reindex_hours: Option<u64>,
    pub cycle_secs: Option<u64>,
    pub workers: Option<usize>,
    pub max_crawlers: Option<usize>,
    pub shared_index: Option<bool>,
    pub known_file: Option<KnownFilePolicy>,
    pub tick_secs: Option<u64>,
    pub verbose: Option<bool>,
}

impl CrawldexToml {
    pub fn db_path(&self) -> Option<PathBuf> {
        self.settings.db_path.as_ref().map(PathBuf::from)
    }
}

/// Load `.crawldex.toml` from `dir` if present. Returns None if the file is missing or invalid.
pub fn load_config_file(dir: &Path) -> Option<CrawldexToml> {
    let path = dir.join(PackagePaths::get().config_filename());
    let s = std::fs::read_to_string(&path).ok()?;
    toml::from_str(&s)
        .map_err(|e| warn!("{}: {}", path.display(), e))
        .ok()
}

/// Overwrite opts field from file when present.
macro_rules! apply_file_opt {
    ($sec:expr, $opts:expr, $sec_field:ident => $opts_field:ident) => {
        if let Some(v) = $sec.$sec_field {
            $opts.$opts_field = v;
        }
    };
}

/// Apply file config to opts (only fields present in the file). Call before env and CLI.
pub fn apply_file_to_opts(file: &CrawldexToml, opts: &mut CrawlOpts) {
    let sec = &file.settings;
    if let Some(ref raw) = sec.exclusion {
        opts.exclusion = parse_exclusion_list(raw);
    }
    apply_file_opt!(sec, opts, reindex_hours => reindex_hours);
    if let Some(secs) = sec.cycle_secs {
        opts.cycle_time = Duration::from_secs(secs);
    }
    apply_file_opt!(sec, opts, workers => workers);
    apply_file_opt!(sec, opts, max_crawlers => max_crawlers);
    apply_file_opt!(sec, opts, shared_index => shared_index);
    apply_file_opt!(sec, opts, known_file => known_file);
    if let Some(secs) = sec.tick_secs {
        opts.tick = Duration::from_secs(secs);
    }
    apply_file_opt!(sec, opts, verbose => verbose);
}

/// Parse `key` through `lookup`, warning and ignoring values that do not parse.
fn env_value<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    let name = PackagePaths::get().env_var(key);
    let raw = lookup(&name)?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!("Ignoring {}={:?}: not a valid value", name, raw);
            None
        }
    }
}

/// Apply `CRAWLDEX_*` variables found through `lookup` (pass `|k| std::env::var(k).ok()` for the
/// process environment). Call after the file and before CLI flags.
pub fn apply_env_to_opts<F>(opts: &mut CrawlOpts, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(raw) = lookup(&PackagePaths::get().env_var("EXCLUSION")) {
        opts.exclusion = parse_exclusion_list(&raw);
    }
    if let Some(v) = env_value(&lookup, "REINDEX_HOURS") {
        opts.reindex_hours = v;
    }
    if let Some(v) = env_value(&lookup, "CYCLE_SECS") {
        opts.cycle_time = Duration::from_secs(v);
    }
    if let Some(v) = env_value(&lookup, "WORKERS") {
        opts.workers = v;
    }
    if let Some(v) = env_value(&lookup, "MAX_CRAWLERS") {
        opts.max_crawlers = v;
    }
    if let Some(v) = env_value(&lookup, "SHARED_INDEX") {
        opts.shared_index = v;
    }
    if let Some(raw) = lookup(&PackagePaths::get().env_var("KNOWN_FILE")) {
        match <KnownFilePolicy as clap::ValueEnum>::from_str(raw.trim(), true) {
            Ok(v) => opts.known_file = v,
            Err(e) => warn!("Ignoring known-file policy {:?}: {}", raw, e),
        }
    }
    if let Some(v) = env_value(&lookup, "TICK_SECS") {
        opts.tick = Duration::from_secs(v);
    }
}

/// Load `.env` from `dir` into the process environment if present. Existing variables win.
pub fn load_dotenv(dir: &Path) {
    let path = dir.join(".env");
    if path.is_file() {
        match dotenvy::from_path(&path) {
            Ok(()) => debug!("Loaded {}", path.display()),
            Err(e) => warn!("{}: {}", path.display(), e),
        }
    }
}
