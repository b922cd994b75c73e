//! CLI command handlers: crawl, watch, status.

use anyhow::{Context, Result};
use crossbeam_channel::bounded;
use log::{debug, info};
use std::path::Path;
use std::sync::{Arc, PoisonError};
use std::time::{Duration, SystemTime};

use crate::backend::{Backend, LocalBackend};
use crate::engine::arg_parser::{Cli, Commands};
use crate::engine::daemon::run_maintenance;
use crate::engine::db_ops::SqliteIndex;
use crate::engine::tools::{exclusion_from_args, path_to_db_string};
use crate::engine::workflow::IndexWorkflow;
use crate::utils::config::PackagePaths;
use crate::utils::settings::{
    CrawldexToml, apply_env_to_opts, apply_file_to_opts, load_config_file, load_dotenv,
};
use crate::utils::setup_logging;
use crate::{CrawlOpts, Session, WorkflowOutcome};

/// Defaults, then `.crawldex.toml`, then `CRAWLDEX_*`, then flags.
fn setup_opts(cli: &Cli, file: Option<&CrawldexToml>) -> CrawlOpts {
    let mut opts = CrawlOpts::default();
    if let Some(file) = file {
        apply_file_to_opts(file, &mut opts);
    }
    apply_env_to_opts(&mut opts, |key| std::env::var(key).ok());

    let common = &cli.common;
    if let Some(v) = common.verbose {
        opts.verbose = v;
    }
    let exclude = exclusion_from_args(&common.exclude);
    if !exclude.is_empty() {
        opts.exclusion = exclude;
    }
    if let Some(h) = common.reindex_hours {
        opts.reindex_hours = h;
    }
    if let Some(k) = common.known_file {
        opts.known_file = k;
    }
    match &cli.command {
        Commands::Crawl {
            workers: Some(w), ..
        } => opts.workers = *w,
        Commands::Watch { tick, cycle, .. } => {
            if let Some(secs) = tick {
                opts.tick = Duration::from_secs(*secs);
            }
            if let Some(secs) = cycle {
                opts.cycle_time = Duration::from_secs(*secs);
            }
        }
        _ => {}
    }
    opts
}

/// Never index the index: add the database file and its SQLite companions to the exclusion list.
fn exclude_db_files(opts: &mut CrawlOpts, db_path: &Path) {
    opts.exclusion
        .extend(PackagePaths::get().default_exclude_patterns());
    if let Some(name) = db_path.file_name().and_then(|n| n.to_str())
        && name != PackagePaths::get().db_filename()
    {
        for suffix in ["", "-wal", "-shm", "-journal"] {
            opts.exclusion.push(format!("{name}{suffix}"));
        }
    }
}

/// Session identity of a local crawl: the canonical directory it is backed by.
fn local_session(backend: &LocalBackend) -> Session {
    Session::from([
        ("backend".to_string(), "local".to_string()),
        ("root".to_string(), path_to_db_string(backend.root())),
    ])
}

pub fn handle_run(cli: &Cli) -> Result<()> {
    let dir = cli.command.dir();
    setup_logging(cli.common.verbose.unwrap_or(false));
    load_dotenv(dir);
    let file = load_config_file(dir);
    let mut opts = setup_opts(cli, file.as_ref());
    let db_path = cli.db_path(file.as_ref().and_then(CrawldexToml::db_path));
    exclude_db_files(&mut opts, &db_path);
    debug!(
        "{} CONFIG:{:#?}",
        PackagePaths::get().pkg_name().to_uppercase(),
        opts
    );

    match &cli.command {
        Commands::Crawl { path, json, .. } => handle_crawl(dir, &db_path, path, *json, opts),
        Commands::Watch { path, .. } => handle_watch(dir, &db_path, path, opts),
        Commands::Status { json, .. } => handle_status(&db_path, *json, &opts),
    }
}

fn open_workflow(
    dir: &Path,
    db_path: &Path,
    opts: CrawlOpts,
) -> Result<(IndexWorkflow, Arc<LocalBackend>, Session)> {
    let backend = Arc::new(LocalBackend::new(dir)?);
    let store = Arc::new(SqliteIndex::open(db_path)?);
    let session = local_session(&backend);
    Ok((IndexWorkflow::new(opts, store), backend, session))
}

fn handle_crawl(dir: &Path, db_path: &Path, path: &str, json: bool, opts: CrawlOpts) -> Result<()> {
    let (workflow, backend, session) = open_workflow(dir, db_path, opts)?;
    let outcome = workflow.execute(&session, backend as Arc<dyn Backend>, Some(path))?;
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&outcome).context("serialize report")?
        );
    } else if let WorkflowOutcome::Completed(report) = &outcome
        && !report.committed
    {
        anyhow::bail!("crawl of {} was not committed", path);
    }
    Ok(())
}

fn handle_watch(dir: &Path, db_path: &Path, path: &str, opts: CrawlOpts) -> Result<()> {
    let (shutdown_tx, shutdown_rx) = bounded::<()>(1);
    ctrlc::set_handler(move || {
        let _ = shutdown_tx.try_send(());
    })
    .context("set Ctrl+C handler")?;

    let (workflow, backend, session) = open_workflow(dir, db_path, opts)?;
    workflow.execute(&session, backend as Arc<dyn Backend>, Some(path))?;
    let key = workflow.run_key(&session);
    let crawler = workflow
        .registry()
        .get(&key)
        .context("crawler missing after initial run")?;
    let mut crawler = crawler.lock().unwrap_or_else(PoisonError::into_inner);
    run_maintenance(&mut crawler, workflow.store(), path, &shutdown_rx)?;
    Ok(())
}

fn handle_status(db_path: &Path, json: bool, opts: &CrawlOpts) -> Result<()> {
    let store = SqliteIndex::open(db_path)?;
    let status = store.status(opts.reindex_hours, SystemTime::now())?;
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&status).context("serialize status")?
        );
    } else {
        info!(
            "{}: {} records ({} directories, {} files), {} stale directories",
            db_path.display(),
            status.records,
            status.directories,
            status.files,
            status.stale_directories
        );
    }
    Ok(())
}
