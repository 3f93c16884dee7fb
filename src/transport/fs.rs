use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::warn;
use walkdir::WalkDir;

use crate::constants::discovery::DEFAULT_MAXDEPTH;
use crate::errors::ScheduleError;

/// Depth-bounded filesystem walk with a fixed (name-sorted) enumeration order.
///
/// Sequential and parallel walks yield the same sequence: entries of every
/// directory are visited in file-name order, depth first.
pub struct FileWalker {
    root: PathBuf,
    follow_links: bool,
    max_depth: usize,
    parallel: bool,
}

impl FileWalker {
    /// Create a walker rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            follow_links: false,
            max_depth: DEFAULT_MAXDEPTH,
            parallel: false,
        }
    }

    /// Configure symlink traversal.
    pub fn with_follow_symlinks(mut self, follow_links: bool) -> Self {
        self.follow_links = follow_links;
        self
    }

    /// Deepest level visited; files directly under the root are level 1.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth.max(1);
        self
    }

    /// Walk each top-level entry on the rayon pool.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Collect regular files accepted by `keep`, in enumeration order.
    pub fn collect_files<F>(&self, keep: F) -> Result<Vec<PathBuf>, ScheduleError>
    where
        F: Fn(&Path) -> bool + Sync,
    {
        if !self.root.is_dir() {
            return Err(ScheduleError::Configuration(format!(
                "root '{}' is not a directory",
                self.root.display()
            )));
        }
        if !self.parallel {
            let walker = WalkDir::new(&self.root)
                .min_depth(1)
                .max_depth(self.max_depth)
                .follow_links(self.follow_links)
                .sort_by_file_name();
            return Ok(collect_walk(walker, &keep));
        }

        let mut children: Vec<PathBuf> = fs::read_dir(&self.root)?
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry.path()),
                Err(err) => {
                    warn!(root = %self.root.display(), error = %err, "skipping unreadable entry");
                    None
                }
            })
            .collect();
        children.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

        let per_child: Vec<Vec<PathBuf>> = children
            .par_iter()
            .map(|child| {
                let walker = WalkDir::new(child)
                    .max_depth(self.max_depth - 1)
                    .follow_links(self.follow_links)
                    .follow_root_links(self.follow_links)
                    .sort_by_file_name();
                collect_walk(walker, &keep)
            })
            .collect();
        Ok(per_child.into_iter().flatten().collect())
    }
}

fn collect_walk<F>(walker: WalkDir, keep: &F) -> Vec<PathBuf>
where
    F: Fn(&Path) -> bool,
{
    let mut files = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!(error = %err, "skipping unreadable entry");
                continue;
            }
        };
        if entry.file_type().is_file() && keep(entry.path()) {
            files.push(entry.into_path());
        }
    }
    files
}

/// True if the file name ends with `.{suffix}` and has something before it.
pub fn has_suffix(path: &Path, suffix: &str) -> bool {
    let suffix = suffix.trim_start_matches('.');
    path.file_name()
        .and_then(|name| name.to_str())
        .and_then(|name| name.strip_suffix(suffix))
        .and_then(|head| head.strip_suffix('.'))
        .map(|stem| !stem.is_empty())
        .unwrap_or(false)
}
