//! SQLite implementation of the index store gateway.
//!
//! One connection behind a mutex. Bulk workers share a single open transaction, so every
//! statement locks the connection for its own duration only. A second `begin` blocks until the
//! open transaction is committed or dropped.

use anyhow::{Context, Result};
use log::{debug, warn};
use rusqlite::{Connection, OptionalExtension, ffi};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;

use crate::backend::FileInfo;
use crate::engine::store::{IndexError, IndexStore, IndexTx};
use crate::engine::tools::{join_child, ns_to_system_time, stale_cutoff, system_time_to_ns};
use crate::{DocumentKind, IndexRecord, IndexStatus};

use super::connection::{load_index, open_db, open_db_in_memory};
use super::{INSERT_RECORD_SQL, SELECT_INDEXED_AT_SQL, UPDATE_INDEXED_AT_SQL};

impl From<rusqlite::Error> for IndexError {
    fn from(err: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(e, _) = &err
            && matches!(
                e.extended_code,
                ffi::SQLITE_CONSTRAINT_PRIMARYKEY | ffi::SQLITE_CONSTRAINT_UNIQUE
            )
        {
            return IndexError::Constraint;
        }
        IndexError::Store(err.into())
    }
}

pub struct SqliteIndex {
    conn: Mutex<Connection>,
    /// True while a transaction is open.
    writer: Mutex<bool>,
    writer_free: Condvar,
}

impl SqliteIndex {
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
            writer: Mutex::new(false),
            writer_free: Condvar::new(),
        }
    }

    /// Open or create the index database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self::from_connection(open_db(path)?))
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::from_connection(open_db_in_memory()?))
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn claim_writer(&self) {
        let mut busy = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        while *busy {
            busy = self
                .writer_free
                .wait(busy)
                .unwrap_or_else(PoisonError::into_inner);
        }
        *busy = true;
    }

    fn release_writer(&self) {
        let mut busy = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        *busy = false;
        self.writer_free.notify_one();
    }

    /// Every record, keyed by path.
    pub fn load_index(&self) -> Result<BTreeMap<String, IndexRecord>> {
        load_index(&self.conn())
    }

    /// Record counts, with directories outside the `window_hours` staleness window as of `now`.
    pub fn status(&self, window_hours: u64, now: SystemTime) -> Result<IndexStatus> {
        let conn = self.conn();
        let count = |sql: &str, params: &[&dyn rusqlite::ToSql]| -> Result<usize> {
            let n: i64 = conn
                .query_row(sql, params, |row| row.get(0))
                .with_context(|| format!("query {sql}"))?;
            Ok(n.max(0) as usize)
        };
        let directory = DocumentKind::Directory.as_str();
        let records = count("SELECT COUNT(*) FROM file_index", &[])?;
        let directories = count(
            "SELECT COUNT(*) FROM file_index WHERE kind = ?1",
            &[&directory],
        )?;
        let stale_directories = match stale_cutoff(now, window_hours) {
            Some(cutoff) => count(
                "SELECT COUNT(*) FROM file_index WHERE kind = ?1 AND indexed_at_ns <= ?2",
                &[&directory, &system_time_to_ns(cutoff)],
            )?,
            None => 0,
        };
        Ok(IndexStatus {
            records,
            directories,
            files: records - directories,
            stale_directories,
        })
    }
}

impl IndexStore for SqliteIndex {
    fn begin(&self) -> Result<Box<dyn IndexTx + '_>, IndexError> {
        self.claim_writer();
        if let Err(err) = self.conn().execute_batch("BEGIN IMMEDIATE") {
            self.release_writer();
            return Err(err.into());
        }
        debug!("Index transaction opened");
        Ok(Box::new(SqliteTx {
            index: self,
            finished: false,
        }))
    }
}

/// Open transaction on a [`SqliteIndex`]. Rolled back on drop unless committed.
pub struct SqliteTx<'a> {
    index: &'a SqliteIndex,
    finished: bool,
}

impl IndexTx for SqliteTx<'_> {
    fn insert(&self, parent: &str, entry: &FileInfo) -> Result<(), IndexError> {
        let kind = if entry.is_dir {
            DocumentKind::Directory
        } else {
            DocumentKind::File
        };
        let path = join_child(parent, &entry.name, entry.is_dir);
        let conn = self.index.conn();
        let mut stmt = conn.prepare_cached(INSERT_RECORD_SQL)?;
        stmt.execute((
            path.as_str(),
            parent,
            entry.name.as_str(),
            kind.as_str(),
            entry.size as i64,
            entry.mtime_ns,
            system_time_to_ns(SystemTime::now()),
        ))?;
        Ok(())
    }

    fn indexed_at(&self, path: &str) -> Result<SystemTime, IndexError> {
        let conn = self.index.conn();
        let ns: Option<i64> = conn
            .query_row(SELECT_INDEXED_AT_SQL, [path], |row| row.get(0))
            .optional()?;
        ns.map(ns_to_system_time)
            .ok_or_else(|| IndexError::NotFound(path.to_string()))
    }

    fn set_indexed_at(&self, path: &str, at: SystemTime) -> Result<(), IndexError> {
        let conn = self.index.conn();
        let changed = conn.execute(UPDATE_INDEXED_AT_SQL, (path, system_time_to_ns(at)))?;
        if changed == 0 {
            return Err(IndexError::NotFound(path.to_string()));
        }
        Ok(())
    }

    fn commit(mut self: Box<Self>) -> Result<(), IndexError> {
        self.index.conn().execute_batch("COMMIT")?;
        self.finished = true;
        debug!("Index transaction committed");
        Ok(())
    }
}

impl Drop for SqliteTx<'_> {
    fn drop(&mut self) {
        if !self.finished {
            let conn = self.index.conn();
            if !conn.is_autocommit() {
                match conn.execute_batch("ROLLBACK") {
                    Ok(()) => debug!("Index transaction rolled back"),
                    Err(err) => warn!("Cannot roll back index transaction: {}", err),
                }
            }
        }
        self.index.release_writer();
    }
}
