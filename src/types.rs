//! Public and internal types for the crawldex API and engine.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::backend::FileInfo;
use crate::engine::tools::{enforce_directory, join_child, name_of, parse_exclusion_list};
use crate::utils::config::Defaults;

/// Whether a [`Document`] is a plain file or a directory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    File,
    Directory,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::File => "file",
            DocumentKind::Directory => "directory",
        }
    }

    /// Parse the stored kind column; anything but `directory` is a file.
    pub fn from_db_str(s: &str) -> Self {
        if s == "directory" {
            DocumentKind::Directory
        } else {
            DocumentKind::File
        }
    }
}

/// An entry discovered by a listing and queued for processing. Replace, don't update.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Document {
    pub kind: DocumentKind,
    pub name: String,
    /// Full logical path with `/` separators. Directory paths end with `/`.
    pub path: String,
    pub size: u64,
    /// Modification time in nanoseconds since epoch.
    pub mtime_ns: i64,
}

impl Document {
    /// Document for a child of `parent` as returned by a backend listing.
    pub fn child_of(parent: &str, info: &FileInfo) -> Self {
        Document {
            kind: if info.is_dir {
                DocumentKind::Directory
            } else {
                DocumentKind::File
            },
            name: info.name.clone(),
            path: join_child(parent, &info.name, info.is_dir),
            size: info.size,
            mtime_ns: info.mtime_ns,
        }
    }

    /// Directory document for an explicitly requested path (root seed or hint). Mtime 0 sorts it
    /// ahead of everything already queued.
    pub fn directory(path: &str) -> Self {
        let path = enforce_directory(path);
        Document {
            kind: DocumentKind::Directory,
            name: name_of(&path).to_string(),
            path,
            size: 0,
            mtime_ns: 0,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind == DocumentKind::Directory
    }
}

/// Phase of the single-step state machine.
///
/// `Discover → Index → Maintain → Discover`. `Pause` is entered on a listing failure and only
/// left through [`Crawler::resume`](crate::engine::Crawler::resume).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Discover,
    Index,
    Maintain,
    Pause,
}

impl Phase {
    /// Phase that follows `self` in the regular cycle. `Pause` stays paused.
    pub fn next(self) -> Phase {
        match self {
            Phase::Discover => Phase::Index,
            Phase::Index => Phase::Maintain,
            Phase::Maintain => Phase::Discover,
            Phase::Pause => Phase::Pause,
        }
    }
}

/// What discovery does when a file of a listing is already in the index.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum KnownFilePolicy {
    /// Stop processing the rest of that directory's listing: its files are assumed indexed as a batch.
    #[default]
    StopDirectory,
    /// Skip only that file and continue with the next entry.
    SkipFile,
}

/// Identity of the actor that triggered a run (session parameters). Sorted so that the derived
/// [`RunKey`](crate::engine::RunKey) is deterministic.
pub type Session = BTreeMap<String, String>;

/// Crawl options. Defaults come from [`Defaults`]; the CLI layers `.crawldex.toml`, environment
/// and flags on top.
#[derive(Clone, Debug)]
pub struct CrawlOpts {
    /// Folder names / path substrings never crawled.
    pub exclusion: Vec<String>,
    /// Hours after which an indexed directory is explored again.
    pub reindex_hours: u64,
    /// Time budget of one single-step cycle.
    pub cycle_time: Duration,
    /// Worker pool size for bulk runs.
    pub workers: usize,
    /// Crawlers kept alive in the registry (one per run key).
    pub max_crawlers: usize,
    /// One index and one run key shared by every session.
    pub shared_index: bool,
    /// Policy for files already present in the index.
    pub known_file: KnownFilePolicy,
    /// Interval between maintenance ticks.
    pub tick: Duration,
    /// Show a progress counter during bulk runs.
    pub verbose: bool,
}

impl Default for CrawlOpts {
    fn default() -> Self {
        Self {
            exclusion: parse_exclusion_list(Defaults::EXCLUSION),
            reindex_hours: Defaults::REINDEX_HOURS,
            cycle_time: Duration::from_secs(Defaults::CYCLE_SECS),
            workers: Defaults::WORKERS,
            max_crawlers: Defaults::MAX_CRAWLERS,
            shared_index: false,
            known_file: KnownFilePolicy::default(),
            tick: Duration::from_secs(Defaults::TICK_SECS),
            verbose: false,
        }
    }
}

/// One row of the index, as stored by [`SqliteIndex`](crate::engine::SqliteIndex).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct IndexRecord {
    pub parent: String,
    pub name: String,
    pub kind: DocumentKind,
    pub size: u64,
    pub mtime_ns: i64,
    pub indexed_at_ns: i64,
}

/// Summary of the index for `status`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct IndexStatus {
    pub records: usize,
    pub directories: usize,
    pub files: usize,
    /// Directories whose `indexed_at` is outside the staleness window.
    pub stale_directories: usize,
}

/// Outcome of one bulk run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BulkReport {
    /// Workers actually spawned (after the FD cap).
    pub workers: usize,
    /// Directories whose listing succeeded and was merged.
    pub listed: usize,
    /// Directories whose listing failed; their subtrees were not expanded.
    pub list_failures: usize,
    /// New index records (root included).
    pub inserted: usize,
    /// Directories pushed onto the frontier during the run.
    pub pushed: usize,
    /// Whether the run's transaction committed. Set by the owner of the transaction.
    pub committed: bool,
    pub elapsed_ms: u128,
}

/// Outcome of one time-budgeted single-step cycle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    /// Steps that performed work.
    pub steps: usize,
    pub phase_before: Phase,
    pub phase_after: Phase,
    pub committed: bool,
    pub elapsed_ms: u128,
}

/// Result of triggering the index workflow.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum WorkflowOutcome {
    /// A run with the same key was already in flight; nothing was done.
    Skipped,
    Completed(BulkReport),
}
