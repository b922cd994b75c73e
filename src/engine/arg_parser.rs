use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::KnownFilePolicy;
use crate::utils::config::{Defaults, PackagePaths};

struct DefaultArgs;

impl DefaultArgs {
    pub const DIR: &'static str = ".";
}

/// Incremental crawler and path indexer.
#[derive(Clone, Parser)]
#[command(name = "crawldex")]
#[command(about = "Crawl a directory tree into a SQLite path index and keep it fresh.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Clone, Subcommand)]
pub enum Commands {
    /// One bulk run: crawl everything reachable from PATH and commit once.
    Crawl {
        /// Directory backing the crawl. Default: current directory.
        #[arg(value_name = "DIR", default_value = DefaultArgs::DIR)]
        dir: PathBuf,

        /// Logical path inside DIR to start from.
        #[arg(long, short = 'p', default_value = Defaults::ROOT_PATH)]
        path: String,

        /// Bulk worker pool size.
        #[arg(long, short = 'w')]
        workers: Option<usize>,

        /// Print the run report as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Bulk run, then single-step maintenance cycles every tick until Ctrl-C.
    Watch {
        #[arg(value_name = "DIR", default_value = DefaultArgs::DIR)]
        dir: PathBuf,

        #[arg(long, short = 'p', default_value = Defaults::ROOT_PATH)]
        path: String,

        /// Seconds between maintenance ticks.
        #[arg(long, short = 't')]
        tick: Option<u64>,

        /// Time budget of one cycle, in seconds.
        #[arg(long)]
        cycle: Option<u64>,
    },
    /// Summarize the index of DIR.
    Status {
        #[arg(value_name = "DIR", default_value = DefaultArgs::DIR)]
        dir: PathBuf,

        /// Print the summary as JSON.
        #[arg(long)]
        json: bool,
    },
}

impl Commands {
    pub fn dir(&self) -> &Path {
        match self {
            Commands::Crawl { dir, .. }
            | Commands::Watch { dir, .. }
            | Commands::Status { dir, .. } => dir,
        }
    }
}

/// Flags shared by every subcommand. Each one overrides `.crawldex.toml` and `CRAWLDEX_*`.
#[derive(Clone, Args)]
pub struct CommonArgs {
    /// Path to the index file. Default: `.crawldex` in DIR.
    #[arg(long, short, global = true)]
    pub db: Option<PathBuf>,

    /// Verbose output and a progress counter.
    #[arg(long, short = 'v', global = true, num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub verbose: Option<bool>,

    /// Names never crawled. Can specify multiple: -e node_modules .git
    #[arg(long, short = 'e', global = true, num_args = 1..)]
    pub exclude: Vec<String>,

    /// Hours after which an indexed directory is crawled again.
    #[arg(long, global = true)]
    pub reindex_hours: Option<u64>,

    /// What to do when a file is already indexed.
    #[arg(long, global = true, value_enum)]
    pub known_file: Option<KnownFilePolicy>,
}

impl Cli {
    /// Get the database path: `--db`, else the file config, else the package db filename in DIR.
    pub fn db_path(&self, from_file: Option<PathBuf>) -> PathBuf {
        self.common
            .db
            .clone()
            .or(from_file)
            .unwrap_or_else(|| self.command.dir().join(PackagePaths::get().db_filename()))
    }
}
