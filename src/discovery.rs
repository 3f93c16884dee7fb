use std::fs;
use std::path::PathBuf;

use rand::Rng;
use rand::seq::SliceRandom;
use tracing::{debug, info};

use crate::config::SchedulerConfig;
use crate::constants::discovery::{DEFAULT_MAXDEPTH, DEFAULT_SUFFIX, DEFAULT_TOTAL_BUCKETS};
use crate::constraints::ConstraintSet;
use crate::data::FileEntry;
use crate::errors::ScheduleError;
use crate::transport::fs::{FileWalker, has_suffix};

/// Finds files under a root that match an extension and the active constraints.
///
/// The returned order is the walker's name-sorted enumeration order unless
/// shuffling is enabled, in which case the filtered sequence is permuted once
/// with the caller's RNG.
pub struct FileDiscoverer {
    root: PathBuf,
    suffix: String,
    maxdepth: usize,
    total_buckets: usize,
    shuffle: bool,
    constraints: ConstraintSet,
    follow_links: bool,
    parallel: bool,
}

impl FileDiscoverer {
    /// Create a discoverer for `root` matching `.{suffix}` files.
    pub fn new(root: impl Into<PathBuf>, suffix: impl Into<String>) -> Self {
        let suffix = suffix.into();
        Self {
            root: root.into(),
            suffix: suffix.trim_start_matches('.').to_string(),
            maxdepth: DEFAULT_MAXDEPTH,
            total_buckets: DEFAULT_TOTAL_BUCKETS,
            shuffle: false,
            constraints: ConstraintSet::new(),
            follow_links: false,
            parallel: false,
        }
    }

    /// Build a discoverer from scheduler settings.
    pub fn from_config(config: &SchedulerConfig) -> Self {
        Self::new(&config.root, config.normalized_suffix())
            .with_max_depth(config.maxdepth)
            .with_total_buckets(config.total_buckets)
            .with_shuffle(config.shuffle)
            .with_constraints(ConstraintSet::from_config(&config.constraints))
            .with_follow_links(config.follow_links)
            .with_parallel(config.parallel_discovery)
    }

    /// Directory depth bound (files directly under the root are depth 1).
    pub fn with_max_depth(mut self, maxdepth: usize) -> Self {
        self.maxdepth = maxdepth;
        self
    }

    /// Minimum number of files required after filtering.
    pub fn with_total_buckets(mut self, total_buckets: usize) -> Self {
        self.total_buckets = total_buckets;
        self
    }

    /// Permute the filtered files before returning them.
    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    /// Replace the constraint set.
    pub fn with_constraints(mut self, constraints: ConstraintSet) -> Self {
        self.constraints = constraints;
        self
    }

    /// Follow symlinks while walking.
    pub fn with_follow_links(mut self, follow_links: bool) -> Self {
        self.follow_links = follow_links;
        self
    }

    /// Walk top-level subdirectories in parallel.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Active constraints.
    pub fn constraints(&self) -> &ConstraintSet {
        &self.constraints
    }

    /// Walk, filter, check the bucket bound, then optionally shuffle.
    ///
    /// Fails with [`ScheduleError::InsufficientItems`] before shuffling when
    /// fewer files survive filtering than buckets were requested.
    pub fn discover<R>(&self, rng: &mut R) -> Result<Vec<FileEntry>, ScheduleError>
    where
        R: Rng + ?Sized,
    {
        if self.suffix.is_empty() {
            return Err(ScheduleError::Configuration(format!(
                "suffix must not be empty (for example '{DEFAULT_SUFFIX}')"
            )));
        }
        if !self.root.is_dir() {
            return Err(ScheduleError::Configuration(format!(
                "root '{}' is not a directory",
                self.root.display()
            )));
        }
        let root = fs::canonicalize(&self.root)?;
        info!(
            root = %root.display(),
            suffix = %self.suffix,
            maxdepth = self.maxdepth,
            "detecting files"
        );

        let paths = FileWalker::new(&root)
            .with_max_depth(self.maxdepth)
            .with_follow_symlinks(self.follow_links)
            .with_parallel(self.parallel)
            .collect_files(|path| has_suffix(path, &self.suffix))?;
        let walked = paths.len();
        let files: Vec<FileEntry> = paths
            .into_iter()
            .map(|path| FileEntry::new(path, &self.suffix))
            .collect();

        debug!(constraints = ?self.constraints.constraints(), "applying constraints");
        let mut files = self.constraints.apply(files);
        if files.len() < self.total_buckets {
            return Err(ScheduleError::InsufficientItems {
                found: files.len(),
                buckets: self.total_buckets,
            });
        }
        info!(walked, detected = files.len(), "files detected");

        if self.shuffle {
            files.shuffle(rng);
            debug!("shuffled detected files");
        }
        Ok(files)
    }
}
