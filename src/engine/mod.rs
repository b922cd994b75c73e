//! Engine module: crawler state machine, bulk runs, index store and run orchestration

pub mod arg_parser;
pub mod bulk;
pub mod cli;
pub mod core;
pub mod daemon;
pub mod db_ops;
pub mod frontier;
pub mod guard;
pub mod progress;
pub mod registry;
pub mod store;
pub mod tools;
pub mod workflow;

// Re-export commonly used items
pub use arg_parser::{Cli, Commands, CommonArgs};
pub use bulk::{bulk_drain, bulk_run};
pub use cli::handle_run;
pub use self::core::{Crawler, PhaseWorker};
pub use daemon::{maintenance_tick, run_maintenance};
pub use db_ops::{SqliteIndex, SqliteTx, load_index, open_db, open_db_in_memory};
pub use frontier::Frontier;
pub use guard::{RunGuard, RunKey, RunPermit};
pub use registry::{CrawlerRegistry, SharedCrawler};
pub use store::{IndexError, IndexStore, IndexTx};
pub use tools::{exclusion_from_args, is_excluded, needs_reindex, parse_exclusion_list};
pub use workflow::IndexWorkflow;
