//! Path, filter and time utilities

use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

// ---- Exclusion filter ----

/// Split a comma-separated exclusion setting into trimmed tokens. Empty tokens are dropped: an
/// empty token is a substring of every path and would exclude the whole tree.
pub fn parse_exclusion_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(String::from)
        .collect()
}

/// Exclusion tokens given one per argument (`-e a b,c`). Each argument may itself be a
/// comma-separated list; tokens are cleaned like [`parse_exclusion_list`].
pub fn exclusion_from_args<S: AsRef<str>>(args: &[S]) -> Vec<String> {
    args.iter()
        .flat_map(|arg| parse_exclusion_list(arg.as_ref()))
        .collect()
}

/// True if a child called `name` of the directory at `parent_path` must be skipped: the name
/// equals a token, or the parent path contains a token anywhere.
pub fn is_excluded(parent_path: &str, name: &str, excluded: &[String]) -> bool {
    excluded
        .iter()
        .any(|token| name == token || parent_path.contains(token.as_str()))
}

/// Check if a file should be excluded based on OS-specific hidden files
pub fn is_os_hidden_file(name: &str) -> bool {
    match name {
        // macOS
        ".DS_Store" | ".AppleDouble" | ".LSOverride" => true,
        // Windows
        "Thumbs.db" | "ehthumbs.db" | "Desktop.ini" | "$RECYCLE.BIN" => true,
        // Linux
        ".directory" => true,
        // macOS resource forks, Linux trash dirs
        _ => name.starts_with("._") || name.starts_with(".Trash-"),
    }
}

// ---- Staleness policy ----

/// `now - window_hours`, or `None` if that is before the epoch.
pub fn stale_cutoff(now: SystemTime, window_hours: u64) -> Option<SystemTime> {
    let window = Duration::from_secs(window_hours.saturating_mul(3600));
    now.checked_sub(window)
        .filter(|cutoff| *cutoff >= UNIX_EPOCH)
}

/// True if a directory indexed at `last_indexed_at` must be explored again: it was indexed at or
/// before `now - window_hours`.
pub fn needs_reindex(last_indexed_at: SystemTime, now: SystemTime, window_hours: u64) -> bool {
    match stale_cutoff(now, window_hours) {
        Some(cutoff) => last_indexed_at <= cutoff,
        None => false,
    }
}

// ---- Logical paths ----

/// Normalize a logical path to directory form: leading and trailing `/`, backslashes folded.
/// Empty input is the root `/`.
pub fn enforce_directory(path: &str) -> String {
    let mut out = path.replace('\\', "/");
    if !out.starts_with('/') {
        out.insert(0, '/');
    }
    if !out.ends_with('/') {
        out.push('/');
    }
    out
}

/// Logical path of child `name` under `parent`. Directories get a trailing `/`.
pub fn join_child(parent: &str, name: &str, is_dir: bool) -> String {
    let mut path = String::with_capacity(parent.len() + name.len() + 2);
    path.push_str(parent);
    if !path.ends_with('/') {
        path.push('/');
    }
    path.push_str(name);
    if is_dir && !path.ends_with('/') {
        path.push('/');
    }
    path
}

/// Last segment of a logical path (`/a/b/` → `b`, `/a/x.txt` → `x.txt`, `/` → ``).
pub fn name_of(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(i) => &trimmed[i + 1..],
        None => trimmed,
    }
}

/// Parent directory of a logical path in directory form (`/a/b/` → `/a/`, `/a/` → `/`).
/// The root has no parent and yields ``.
pub fn parent_of(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(i) => trimmed[..=i].to_string(),
        None => String::new(),
    }
}

/// Convert path to a string with forward slashes (index portability)
pub fn path_to_db_string(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

// ---- Time ----

/// Nanoseconds since epoch; times before the epoch clamp to 0.
pub fn system_time_to_ns(t: SystemTime) -> i64 {
    t.duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos().min(i64::MAX as u128) as i64)
        .unwrap_or(0)
}

pub fn ns_to_system_time(ns: i64) -> SystemTime {
    UNIX_EPOCH + Duration::from_nanos(ns.max(0) as u64)
}

/// Modification time of `meta` in nanoseconds since epoch (0 when unavailable).
pub fn mtime_ns_of(meta: &std::fs::Metadata) -> i64 {
    meta.modified().map(system_time_to_ns).unwrap_or(0)
}
