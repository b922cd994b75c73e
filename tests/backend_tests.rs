//! Backends: local filesystem listing and the in-memory tree.

use crawldex::backend::{Backend, FileInfo, LocalBackend, MemoryBackend};
use crawldex::engine::SqliteIndex;
use crawldex::{CrawlOpts, crawl_once};
use std::fs;
use std::sync::Arc;

fn fixture() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("a/b")).unwrap();
    fs::write(dir.path().join("a/x.txt"), b"abc").unwrap();
    fs::write(dir.path().join("a/b/y.txt"), b"hello").unwrap();
    fs::write(dir.path().join("a/.DS_Store"), b"").unwrap();
    dir
}

fn names(files: &[FileInfo]) -> Vec<&str> {
    files.iter().map(|f| f.name.as_str()).collect()
}

#[test]
fn test_local_ls_children_sorted() {
    let dir = fixture();
    let backend = LocalBackend::new(dir.path()).unwrap();

    let root = backend.ls("/").unwrap();
    assert_eq!(names(&root), vec!["a"]);
    assert!(root[0].is_dir);

    let a = backend.ls("/a/").unwrap();
    assert_eq!(names(&a), vec!["b", "x.txt"]);
    assert!(a[0].is_dir);
    assert!(!a[1].is_dir);
    assert_eq!(a[1].size, 3);
    assert!(a[1].mtime_ns > 0);
}

#[test]
fn test_local_ls_skips_os_litter_only() {
    let dir = tempfile::tempdir().unwrap();
    for name in [".DS_Store", "._x.txt", ".directory", "Thumbs.db", ".env", "notes.txt"] {
        fs::write(dir.path().join(name), b"").unwrap();
    }
    fs::create_dir(dir.path().join(".Trash-1000")).unwrap();
    fs::create_dir(dir.path().join(".config")).unwrap();
    let backend = LocalBackend::new(dir.path()).unwrap();

    let root = backend.ls("/").unwrap();
    assert_eq!(names(&root), vec![".config", ".env", "notes.txt"]);
}

#[test]
fn test_local_ls_errors() {
    let dir = fixture();
    let backend = LocalBackend::new(dir.path()).unwrap();
    assert!(backend.ls("/missing/").is_err());
    assert!(backend.ls("/a/x.txt").is_err());
    assert!(backend.ls("/a/../../").is_err());
}

#[test]
fn test_local_backend_requires_directory() {
    let dir = fixture();
    assert!(LocalBackend::new(&dir.path().join("a/x.txt")).is_err());
    assert!(LocalBackend::new(&dir.path().join("nope")).is_err());
}

#[test]
fn test_local_crawl_end_to_end() {
    let dir = fixture();
    let backend = Arc::new(LocalBackend::new(dir.path()).unwrap());
    let store = SqliteIndex::open_in_memory().unwrap();
    let opts = CrawlOpts {
        workers: 3,
        ..CrawlOpts::default()
    };

    let report = crawl_once(backend, &store, "/", &opts).unwrap();
    assert!(report.committed);
    let paths: Vec<String> = store.load_index().unwrap().into_keys().collect();
    assert_eq!(paths, vec!["/", "/a/", "/a/b/", "/a/b/y.txt", "/a/x.txt"]);
    assert_eq!(store.load_index().unwrap()["/a/b/y.txt"].size, 5);
}

#[test]
fn test_memory_tree_creates_parents() {
    let backend = MemoryBackend::new();
    backend.add_file("/a/b/c.txt", 1, 10);
    backend.add_dir("/a/empty", 20);

    assert_eq!(names(&backend.ls("/").unwrap()), vec!["a"]);
    let a = backend.ls("/a").unwrap();
    assert_eq!(names(&a), vec!["b", "empty"]);
    assert_eq!(a[1].mtime_ns, 20);
    assert!(backend.ls("/a/empty/").unwrap().is_empty());
    assert!(backend.ls("/a/b/c.txt").is_err());
}

#[test]
fn test_memory_fail_and_listed() {
    let backend = MemoryBackend::new();
    backend.add_dir("/a", 1);
    backend.fail_on("/a/");
    assert!(backend.ls("/").is_ok());
    assert!(backend.ls("/a").is_err());
    assert_eq!(backend.take_listed(), vec!["/", "/a/"]);
    assert!(backend.take_listed().is_empty());
}
