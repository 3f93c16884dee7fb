use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

pub use crate::types::{BucketIndex, GroupKey, PathString, ScheduleId};

/// A discovered file with the derived name fields used by constraints.
///
/// Immutable once built; every field is computed from the path and the
/// extension that matched during discovery.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FileEntry {
    path: PathBuf,
    name: String,
    stem: String,
    parent: String,
}

impl FileEntry {
    /// Build an entry for `path`, deriving the stem by removing `.{suffix}`.
    ///
    /// When the name does not end with the suffix the stem falls back to the
    /// name up to its last dot.
    pub fn new(path: impl Into<PathBuf>, suffix: &str) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let dotted = format!(".{}", suffix.trim_start_matches('.'));
        let stem = match name.strip_suffix(&dotted) {
            Some(stem) if !suffix.is_empty() => stem.to_string(),
            _ => path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default(),
        };
        let parent = path
            .parent()
            .and_then(Path::file_name)
            .map(|parent| parent.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            path,
            name,
            stem,
            parent,
        }
    }

    /// Full path of the file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name including the extension.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// File name without the matched extension.
    pub fn stem(&self) -> &str {
        &self.stem
    }

    /// Name of the directory directly containing the file.
    pub fn parent_name(&self) -> &str {
        &self.parent
    }

    /// Path rendered the way schedules store it.
    pub fn path_string(&self) -> PathString {
        self.path.to_string_lossy().into_owned()
    }
}

/// Contents of one schedule bucket.
///
/// Serialized untagged: flat buckets are JSON arrays of paths, grouped
/// buckets are JSON objects mapping group key to paths.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BucketContents {
    /// Ordered file paths (flat mode).
    Flat(Vec<PathString>),
    /// Group key to ordered file paths (grouped mode).
    Grouped(IndexMap<GroupKey, Vec<PathString>>),
}

impl BucketContents {
    /// Build a flat bucket from discovered entries.
    pub fn flat(files: &[FileEntry]) -> Self {
        Self::Flat(files.iter().map(FileEntry::path_string).collect())
    }

    /// Build a grouped bucket from `(key, files)` pairs, keeping their order.
    pub fn grouped<'a, I>(groups: I) -> Self
    where
        I: IntoIterator<Item = (&'a GroupKey, &'a Vec<FileEntry>)>,
    {
        Self::Grouped(
            groups
                .into_iter()
                .map(|(key, files)| {
                    (
                        key.clone(),
                        files.iter().map(FileEntry::path_string).collect(),
                    )
                })
                .collect(),
        )
    }

    /// Number of files held by the bucket.
    pub fn file_count(&self) -> usize {
        match self {
            Self::Flat(paths) => paths.len(),
            Self::Grouped(groups) => groups.values().map(Vec::len).sum(),
        }
    }

    /// Number of partitioned items (files when flat, groups when grouped).
    pub fn item_count(&self) -> usize {
        match self {
            Self::Flat(paths) => paths.len(),
            Self::Grouped(groups) => groups.len(),
        }
    }

    /// All file paths in bucket order.
    pub fn paths(&self) -> Vec<&PathString> {
        match self {
            Self::Flat(paths) => paths.iter().collect(),
            Self::Grouped(groups) => groups.values().flatten().collect(),
        }
    }
}

/// A persisted bucket assignment tagged with its run identifier.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Schedule {
    /// Unique per-run identifier.
    pub id: ScheduleId,
    /// Bucket index to contents, in index order.
    pub buckets: IndexMap<BucketIndex, BucketContents>,
    /// Where the schedule was written, if it was persisted.
    pub location: Option<PathBuf>,
}

impl Schedule {
    /// Number of buckets.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// True when the schedule holds no buckets.
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Total files across all buckets.
    pub fn file_count(&self) -> usize {
        self.buckets.values().map(BucketContents::file_count).sum()
    }
}
