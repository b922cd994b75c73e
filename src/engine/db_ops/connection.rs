//! Open and load the index database.

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use crate::{DocumentKind, IndexRecord};

use super::{SCHEMA, WAL_PRAGMAS};

/// How long a connection waits on a lock held by another process before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Enable WAL and apply schema to an open connection (idempotent).
fn apply_wal_and_schema(conn: &Connection) -> Result<()> {
    conn.query_row("PRAGMA journal_mode = WAL", [], |_| Ok(()))
        .context("enable WAL")?;
    conn.execute_batch(WAL_PRAGMAS).context("set WAL pragmas")?;
    conn.execute_batch(SCHEMA).context("create schema")?;
    Ok(())
}

/// Open or create the index DB and ensure schema + WAL with optimizations.
pub fn open_db(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)
        .with_context(|| format!("open database {}", path.display()))?;
    conn.busy_timeout(BUSY_TIMEOUT)
        .context("set busy timeout")?;
    apply_wal_and_schema(&conn)?;
    Ok(conn)
}

/// Open an in-memory DB with the same schema (tests and throwaway runs; no WAL).
pub fn open_db_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory().context("open in-memory database")?;
    conn.execute_batch(SCHEMA).context("create schema")?;
    Ok(conn)
}

/// Load the whole index into a map: path -> record.
pub fn load_index(conn: &Connection) -> Result<BTreeMap<String, IndexRecord>> {
    let mut stmt = conn.prepare(
        "SELECT path, parent, name, kind, size, mtime_ns, indexed_at_ns FROM file_index",
    )?;
    let rows = stmt.query_map([], |row| {
        let path: String = row.get(0)?;
        let kind: String = row.get(3)?;
        let size: i64 = row.get(4)?;
        Ok((
            path,
            IndexRecord {
                parent: row.get(1)?,
                name: row.get(2)?,
                kind: DocumentKind::from_db_str(&kind),
                size: size.max(0) as u64,
                mtime_ns: row.get(5)?,
                indexed_at_ns: row.get(6)?,
            },
        ))
    })?;
    let mut map = BTreeMap::new();
    for row in rows {
        let (path, record) = row?;
        map.insert(path, record);
    }
    Ok(map)
}
