//! SQLite index store: schema, open/load, transactional gateway.

mod connection;
mod indexer;

pub use connection::{load_index, open_db, open_db_in_memory};
pub use indexer::{SqliteIndex, SqliteTx};

/// WAL tuning pragmas (synchronous, autocheckpoint, size limit). Use after PRAGMA journal_mode = WAL.
pub(crate) const WAL_PRAGMAS: &str = r#"
        PRAGMA synchronous = NORMAL;
        PRAGMA wal_autocheckpoint = 10000;
        PRAGMA journal_size_limit = 67108864;
        "#;

/// Insert statement for one path record. No `OR REPLACE`: a duplicate path must fail.
pub(crate) const INSERT_RECORD_SQL: &str = "INSERT INTO file_index \
     (path, parent, name, kind, size, mtime_ns, indexed_at_ns) \
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)";

pub(crate) const SELECT_INDEXED_AT_SQL: &str =
    "SELECT indexed_at_ns FROM file_index WHERE path = ?1";

pub(crate) const UPDATE_INDEXED_AT_SQL: &str =
    "UPDATE file_index SET indexed_at_ns = ?2 WHERE path = ?1";

/// Schema for the path index. `path` is the uniqueness key the crawler relies on.
pub(crate) const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS file_index (
    path TEXT PRIMARY KEY,
    parent TEXT NOT NULL,
    name TEXT NOT NULL,
    kind TEXT NOT NULL,
    size INTEGER NOT NULL,
    mtime_ns INTEGER NOT NULL,
    indexed_at_ns INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_file_index_parent ON file_index(parent);
"#;
