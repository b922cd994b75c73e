//! DB tests: SQLite index store gateway, transactions, status, file-DB fixture.

use crawldex::backend::FileInfo;
use crawldex::engine::{IndexError, IndexStore, SqliteIndex, load_index, open_db_in_memory};
use crawldex::DocumentKind;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

#[test]
fn test_insert_duplicate_is_constraint() {
    let store = SqliteIndex::open_in_memory().unwrap();
    let tx = store.begin().unwrap();
    tx.insert("/a/", &FileInfo::file("x.txt", 3, 7)).unwrap();
    let err = tx.insert("/a/", &FileInfo::file("x.txt", 9, 9)).unwrap_err();
    assert!(matches!(err, IndexError::Constraint));
    tx.commit().unwrap();

    let index = store.load_index().unwrap();
    let record = &index["/a/x.txt"];
    assert_eq!(record.parent, "/a/");
    assert_eq!(record.name, "x.txt");
    assert_eq!(record.kind, DocumentKind::File);
    assert_eq!(record.size, 3);
    assert_eq!(record.mtime_ns, 7);
}

#[test]
fn test_directory_record_path_has_trailing_slash() {
    let store = SqliteIndex::open_in_memory().unwrap();
    let tx = store.begin().unwrap();
    tx.insert("/a/", &FileInfo::directory("b", 1)).unwrap();
    assert!(tx.indexed_at("/a/b/").is_ok());
    assert!(matches!(
        tx.indexed_at("/a/b"),
        Err(IndexError::NotFound(_))
    ));
    tx.commit().unwrap();
    assert_eq!(
        store.load_index().unwrap()["/a/b/"].kind,
        DocumentKind::Directory
    );
}

#[test]
fn test_indexed_at_update_and_missing() {
    let store = SqliteIndex::open_in_memory().unwrap();
    let tx = store.begin().unwrap();
    let before = SystemTime::now() - Duration::from_secs(1);
    tx.insert("/", &FileInfo::directory("a", 1)).unwrap();
    assert!(tx.indexed_at("/a/").unwrap() >= before);

    let at = UNIX_EPOCH + Duration::from_secs(42);
    tx.set_indexed_at("/a/", at).unwrap();
    assert_eq!(tx.indexed_at("/a/").unwrap(), at);

    assert!(matches!(
        tx.set_indexed_at("/missing/", at),
        Err(IndexError::NotFound(_))
    ));
    assert!(matches!(
        tx.indexed_at("/missing/"),
        Err(IndexError::NotFound(p)) if p == "/missing/"
    ));
    tx.commit().unwrap();
}

#[test]
fn test_drop_without_commit_rolls_back() {
    let store = SqliteIndex::open_in_memory().unwrap();
    {
        let tx = store.begin().unwrap();
        tx.insert("/", &FileInfo::file("x", 1, 1)).unwrap();
    }
    assert!(store.load_index().unwrap().is_empty());

    // the store is usable again after the rollback
    let tx = store.begin().unwrap();
    tx.insert("/", &FileInfo::file("x", 1, 1)).unwrap();
    tx.commit().unwrap();
    assert_eq!(store.load_index().unwrap().len(), 1);
}

#[test]
fn test_second_begin_waits_for_first() {
    let store = SqliteIndex::open_in_memory().unwrap();
    let first = store.begin().unwrap();
    let (done_tx, done_rx) = mpsc::channel();
    thread::scope(|s| {
        s.spawn(|| {
            let tx = store.begin().unwrap();
            done_tx.send(()).unwrap();
            tx.commit().unwrap();
        });
        assert!(done_rx.recv_timeout(Duration::from_millis(200)).is_err());
        first.commit().unwrap();
        assert!(done_rx.recv_timeout(Duration::from_secs(5)).is_ok());
    });
}

#[test]
fn test_status_counts_and_staleness() {
    let store = SqliteIndex::open_in_memory().unwrap();
    let tx = store.begin().unwrap();
    tx.insert("/", &FileInfo::directory("old", 1)).unwrap();
    tx.insert("/", &FileInfo::directory("new", 1)).unwrap();
    tx.insert("/new/", &FileInfo::file("x.txt", 1, 1)).unwrap();
    tx.set_indexed_at("/old/", UNIX_EPOCH + Duration::from_secs(1))
        .unwrap();
    tx.commit().unwrap();

    let status = store.status(24, SystemTime::now()).unwrap();
    assert_eq!(status.records, 3);
    assert_eq!(status.directories, 2);
    assert_eq!(status.files, 1);
    assert_eq!(status.stale_directories, 1);
}

#[test]
fn test_file_db_persists_across_opens() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".crawldex");
    {
        let store = SqliteIndex::open(&path).unwrap();
        let tx = store.begin().unwrap();
        tx.insert("/", &FileInfo::file("kept.txt", 10, 5)).unwrap();
        tx.commit().unwrap();
    }
    let store = SqliteIndex::open(&path).unwrap();
    let index = store.load_index().unwrap();
    assert_eq!(index.len(), 1);
    assert_eq!(index["/kept.txt"].size, 10);
}

#[test]
fn test_load_index_from_raw_connection() {
    let conn = open_db_in_memory().unwrap();
    conn.execute(
        "INSERT INTO file_index (path, parent, name, kind, size, mtime_ns, indexed_at_ns) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        rusqlite::params!["/a/", "/", "a", "directory", 0_i64, 1_i64, 2_i64],
    )
    .unwrap();
    let index = load_index(&conn).unwrap();
    assert_eq!(index["/a/"].indexed_at_ns, 2);
    assert_eq!(index["/a/"].kind, DocumentKind::Directory);
}
