use crawldex::engine::tools::{
    enforce_directory, is_os_hidden_file, join_child, name_of, parent_of, path_to_db_string,
    stale_cutoff,
};
use crawldex::engine::{exclusion_from_args, is_excluded, needs_reindex, parse_exclusion_list};
use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const HOUR: Duration = Duration::from_secs(3600);

fn tokens(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

// --- parse_exclusion_list ---

#[test]
fn test_parse_exclusion_list_default_format() {
    assert_eq!(
        parse_exclusion_list("node_modules,bower_components,.cache,.npm,.git"),
        tokens(&["node_modules", "bower_components", ".cache", ".npm", ".git"])
    );
}

#[test]
fn test_parse_exclusion_list_trims_and_drops_empty_tokens() {
    assert_eq!(parse_exclusion_list(" a , ,b,"), tokens(&["a", "b"]));
    assert!(parse_exclusion_list("").is_empty());
    assert!(parse_exclusion_list(" , ").is_empty());
}

#[test]
fn test_exclusion_from_args_cleans_each_argument() {
    assert_eq!(
        exclusion_from_args(&["", " target ", "node_modules,.git", " , "]),
        tokens(&["target", "node_modules", ".git"])
    );
    assert!(exclusion_from_args(&[""]).is_empty());
    // an empty argument must not exclude everything
    let excluded = exclusion_from_args(&["", "skip"]);
    assert!(!is_excluded("/a/", "x.txt", &excluded));
    assert!(is_excluded("/a/", "skip", &excluded));
}

// --- is_excluded ---

#[test]
fn test_is_excluded_exact_name() {
    let excluded = tokens(&["node_modules"]);
    assert!(is_excluded("/a/", "node_modules", &excluded));
    assert!(!is_excluded("/a/", "node_modules2", &excluded));
    assert!(!is_excluded("/a/", "src", &excluded));
}

#[test]
fn test_is_excluded_parent_substring() {
    let excluded = tokens(&[".git"]);
    assert!(is_excluded("/repo/.git/objects/", "pack", &excluded));
    // substring, not segment: `.github` contains `.git`
    assert!(is_excluded("/repo/.github/", "workflows", &excluded));
    assert!(!is_excluded("/repo/src/", "main.rs", &excluded));
}

#[test]
fn test_is_excluded_empty_list_keeps_everything() {
    assert!(!is_excluded("/a/", "node_modules", &[]));
}

// --- staleness ---

#[test]
fn test_needs_reindex_outside_window() {
    let now = UNIX_EPOCH + HOUR * 1000;
    assert!(needs_reindex(now - HOUR * 25, now, 24));
}

#[test]
fn test_needs_reindex_inside_window() {
    let now = UNIX_EPOCH + HOUR * 1000;
    assert!(!needs_reindex(now - HOUR * 23, now, 24));
    assert!(!needs_reindex(now, now, 24));
}

#[test]
fn test_needs_reindex_boundary_is_stale() {
    let now = UNIX_EPOCH + HOUR * 1000;
    assert!(needs_reindex(now - HOUR * 24, now, 24));
}

#[test]
fn test_needs_reindex_zero_window() {
    let now = SystemTime::now();
    assert!(needs_reindex(now, now, 0));
}

#[test]
fn test_needs_reindex_window_before_epoch() {
    let now = UNIX_EPOCH + HOUR * 10;
    assert_eq!(stale_cutoff(now, 24), None);
    assert!(!needs_reindex(UNIX_EPOCH, now, 24));
    assert!(!needs_reindex(UNIX_EPOCH, now, u64::MAX));
}

// --- logical paths ---

#[test]
fn test_enforce_directory() {
    assert_eq!(enforce_directory(""), "/");
    assert_eq!(enforce_directory("/"), "/");
    assert_eq!(enforce_directory("a"), "/a/");
    assert_eq!(enforce_directory("/a/b"), "/a/b/");
    assert_eq!(enforce_directory("\\a\\b\\"), "/a/b/");
}

#[test]
fn test_join_child() {
    assert_eq!(join_child("/a/", "b", true), "/a/b/");
    assert_eq!(join_child("/a/", "x.txt", false), "/a/x.txt");
    assert_eq!(join_child("/a", "x.txt", false), "/a/x.txt");
    assert_eq!(join_child("", "", true), "/");
}

#[test]
fn test_name_and_parent_of() {
    assert_eq!(name_of("/a/b/"), "b");
    assert_eq!(name_of("/a/x.txt"), "x.txt");
    assert_eq!(name_of("/"), "");
    assert_eq!(parent_of("/a/b/"), "/a/");
    assert_eq!(parent_of("/a/x.txt"), "/a/");
    assert_eq!(parent_of("/a/"), "/");
    assert_eq!(parent_of("/"), "");
}

#[test]
fn test_path_to_db_string_normalizes_backslashes() {
    assert_eq!(
        path_to_db_string(&PathBuf::from("src\\main.rs")),
        "src/main.rs"
    );
}

#[test]
fn test_is_os_hidden_file() {
    assert!(is_os_hidden_file(".DS_Store"));
    assert!(is_os_hidden_file("Thumbs.db"));
    assert!(is_os_hidden_file("._resource"));
    assert!(is_os_hidden_file(".Trash-1000"));
    assert!(!is_os_hidden_file(".gitignore"));
    assert!(!is_os_hidden_file("notes.txt"));
}
