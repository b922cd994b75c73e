//! Bulk runs: worker pool drain, single commit, convergence across pool sizes.

use crawldex::backend::{Backend, FileInfo, MemoryBackend};
use crawldex::engine::{Crawler, IndexStore, SqliteIndex, bulk_drain, bulk_run};
use crawldex::{CrawlOpts, Phase, crawl_once};
use std::collections::BTreeSet;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::Duration;

/// `/a/{x.txt, b/{y.txt}}`
fn scenario_tree() -> Arc<MemoryBackend> {
    let backend = MemoryBackend::new();
    backend.add_file("/a/x.txt", 3, 100);
    backend.add_file("/a/b/y.txt", 5, 200);
    Arc::new(backend)
}

/// Four levels, a few hundred entries, with an excluded folder in the middle.
fn wide_tree() -> Arc<MemoryBackend> {
    let backend = MemoryBackend::new();
    for i in 0..4 {
        for j in 0..5 {
            for k in 0..3 {
                backend.add_file(&format!("/t/d{i}/e{j}/f{k}/leaf.txt"), 1, (i * j + k) as i64);
            }
            backend.add_file(&format!("/t/d{i}/e{j}/file{j}.txt"), 2, j as i64);
        }
        backend.add_file(&format!("/t/d{i}/node_modules/pkg/index.js"), 3, 0);
    }
    Arc::new(backend)
}

fn opts() -> CrawlOpts {
    CrawlOpts {
        exclusion: Vec::new(),
        ..CrawlOpts::default()
    }
}

fn indexed_paths(store: &SqliteIndex) -> BTreeSet<String> {
    store.load_index().unwrap().into_keys().collect()
}

fn listed_sorted(backend: &MemoryBackend) -> Vec<String> {
    let mut listed = backend.take_listed();
    listed.sort();
    listed
}

#[test]
fn test_scenario_two_workers() {
    let backend = scenario_tree();
    let store = SqliteIndex::open_in_memory().unwrap();
    let mut crawler = Crawler::new(backend.clone(), opts());

    let report = bulk_run(&mut crawler, &store, "/a", 2, None).unwrap();
    assert!(report.committed);
    assert_eq!(report.workers, 2);
    assert_eq!(report.inserted, 4);
    assert_eq!(report.listed, 2);
    assert_eq!(report.pushed, 1);
    assert_eq!(report.list_failures, 0);
    assert!(crawler.is_idle());
    assert_eq!(crawler.phase(), Phase::Discover);

    let expected: BTreeSet<String> = ["/a/", "/a/b/", "/a/b/y.txt", "/a/x.txt"]
        .into_iter()
        .map(String::from)
        .collect();
    assert_eq!(indexed_paths(&store), expected);
    assert_eq!(listed_sorted(&backend), vec!["/a/", "/a/b/"]);
}

#[test]
fn test_second_run_inside_window_prunes() {
    let backend = scenario_tree();
    let store = SqliteIndex::open_in_memory().unwrap();
    let mut crawler = Crawler::new(backend.clone(), opts());
    bulk_run(&mut crawler, &store, "/a", 2, None).unwrap();
    backend.take_listed();

    let report = bulk_run(&mut crawler, &store, "/a", 2, None).unwrap();
    assert!(report.committed);
    assert_eq!(report.inserted, 0);
    assert_eq!(report.pushed, 0);
    assert_eq!(listed_sorted(&backend), vec!["/a/"]);
    assert_eq!(indexed_paths(&store).len(), 4);
}

#[test]
fn test_second_run_outside_window_revisits() {
    let backend = scenario_tree();
    let store = SqliteIndex::open_in_memory().unwrap();
    let opts = CrawlOpts {
        reindex_hours: 0,
        ..opts()
    };
    let mut crawler = Crawler::new(backend.clone(), opts);
    bulk_run(&mut crawler, &store, "/a", 2, None).unwrap();
    backend.take_listed();

    let report = bulk_run(&mut crawler, &store, "/a", 2, None).unwrap();
    assert_eq!(report.inserted, 0);
    assert_eq!(report.pushed, 1);
    assert_eq!(listed_sorted(&backend), vec!["/a/", "/a/b/"]);
}

#[test]
fn test_worker_counts_converge() {
    let mut results = Vec::new();
    for workers in [1, 2, 8] {
        let store = SqliteIndex::open_in_memory().unwrap();
        let mut crawler = Crawler::new(wide_tree(), CrawlOpts::default());
        let report = bulk_run(&mut crawler, &store, "/t", workers, None).unwrap();
        assert!(report.committed);
        assert!(crawler.is_idle());
        let paths = indexed_paths(&store);
        assert_eq!(report.inserted, paths.len());
        assert!(!paths.iter().any(|p| p.contains("node_modules")));
        results.push(paths);
    }
    assert!(results[0].contains("/t/d3/e4/f2/leaf.txt"));
    assert_eq!(results[0], results[1]);
    assert_eq!(results[1], results[2]);
}

#[test]
fn test_list_failure_skips_subtree() {
    let backend = scenario_tree();
    backend.fail_on("/a/b");
    let store = SqliteIndex::open_in_memory().unwrap();
    let mut crawler = Crawler::new(backend, opts());

    let report = bulk_run(&mut crawler, &store, "/a", 2, None).unwrap();
    assert!(report.committed);
    assert_eq!(report.list_failures, 1);
    assert_eq!(report.listed, 1);
    assert_eq!(crawler.phase(), Phase::Discover);

    let paths = indexed_paths(&store);
    assert!(paths.contains("/a/b/"));
    assert!(!paths.contains("/a/b/y.txt"));
}

/// Lists through `inner`, slowly on `slow`, and panics on `bad`.
struct PanickingBackend {
    inner: Arc<MemoryBackend>,
    slow: &'static str,
    bad: &'static str,
}

impl Backend for PanickingBackend {
    fn ls(&self, path: &str) -> anyhow::Result<Vec<FileInfo>> {
        if path == self.bad {
            panic!("backend blew up listing {path}");
        }
        if path == self.slow {
            thread::sleep(Duration::from_millis(50));
        }
        self.inner.ls(path)
    }
}

#[test]
fn test_panicking_listing_does_not_strand_other_workers() {
    let (done_tx, done_rx) = mpsc::channel();
    thread::spawn(move || {
        let backend = PanickingBackend {
            inner: scenario_tree(),
            slow: "/a/",
            bad: "/a/b/",
        };
        let store = SqliteIndex::open_in_memory().unwrap();
        let mut crawler = Crawler::new(Arc::new(backend), opts());
        crawler.hint("/a");
        let tx = store.begin().unwrap();
        let drained = panic::catch_unwind(AssertUnwindSafe(|| {
            bulk_drain(&mut crawler, tx.as_ref(), 2, None)
        }));
        let _ = done_tx.send(drained.is_err());
    });

    let panicked = done_rx
        .recv_timeout(Duration::from_secs(5))
        .expect("bulk drain hung after a listing panicked");
    assert!(panicked);
}

#[test]
fn test_drain_without_commit_is_rolled_back() {
    let store = SqliteIndex::open_in_memory().unwrap();
    let mut crawler = Crawler::new(scenario_tree(), opts());
    {
        let tx = store.begin().unwrap();
        crawler.hint("/a");
        let report = bulk_drain(&mut crawler, tx.as_ref(), 4, None);
        assert_eq!(report.inserted, 3);
        assert!(!report.committed);
    }
    assert!(indexed_paths(&store).is_empty());
}

#[test]
fn test_drain_empty_frontier_returns() {
    let store = SqliteIndex::open_in_memory().unwrap();
    let mut crawler = Crawler::new(scenario_tree(), opts());
    let tx = store.begin().unwrap();
    let report = bulk_drain(&mut crawler, tx.as_ref(), 3, None);
    assert_eq!(report.listed, 0);
    assert_eq!(report.inserted, 0);
    tx.commit().unwrap();
}

#[test]
fn test_crawl_once_from_root() {
    let store = SqliteIndex::open_in_memory().unwrap();
    let report = crawl_once(scenario_tree(), &store, "/", &opts()).unwrap();
    assert!(report.committed);
    // root record, a, b, x.txt, y.txt
    assert_eq!(report.inserted, 5);
    assert!(indexed_paths(&store).contains("/"));
}
