//! Local filesystem backend: logical paths are resolved under a canonical root directory.

use anyhow::{Context, Result, bail};
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

use crate::engine::tools::{is_os_hidden_file, mtime_ns_of};

use super::{Backend, FileInfo};

pub struct LocalBackend {
    root: PathBuf,
}

impl LocalBackend {
    /// Backend rooted at `root`; logical `/` is `root` itself.
    pub fn new(root: &Path) -> Result<Self> {
        let root = root
            .canonicalize()
            .with_context(|| format!("canonicalize {}", root.display()))?;
        if !root.is_dir() {
            bail!("not a directory: {}", root.display());
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a logical path onto the filesystem. Parent components are refused so a path can never
    /// leave the root.
    pub fn resolve(&self, logical: &str) -> Result<PathBuf> {
        let rel = Path::new(logical.trim_start_matches('/'));
        for component in rel.components() {
            match component {
                Component::Normal(_) | Component::CurDir => {}
                _ => bail!("invalid logical path: {}", logical),
            }
        }
        Ok(self.root.join(rel))
    }
}

impl Backend for LocalBackend {
    /// Children of `path` sorted by name. OS litter ([`is_os_hidden_file`]) is never listed.
    fn ls(&self, path: &str) -> Result<Vec<FileInfo>> {
        let dir = self.resolve(path)?;
        if !dir.is_dir() {
            bail!("not a directory: {}", dir.display());
        }
        let mut files = Vec::new();
        for entry in WalkDir::new(&dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.with_context(|| format!("list {}", dir.display()))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if is_os_hidden_file(&name) {
                continue;
            }
            let meta = entry
                .metadata()
                .with_context(|| format!("read metadata of {}", entry.path().display()))?;
            let mtime_ns = mtime_ns_of(&meta);
            files.push(if meta.is_dir() {
                FileInfo::directory(name, mtime_ns)
            } else {
                FileInfo::file(name, meta.len(), mtime_ns)
            });
        }
        Ok(files)
    }
}
