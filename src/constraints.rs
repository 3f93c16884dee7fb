//! Name-based file constraints.
//!
//! Each constraint reads one derived field of a [`FileEntry`]: prefixes and
//! substrings are checked against the full file name, suffixes against the
//! stem (so `_R1` matches `a_R1.fna`), and parent allow-lists against the name
//! of the containing directory. Active constraints combine with logical AND.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::config::ConstraintConfig;
use crate::data::FileEntry;

/// Caller-supplied predicate evaluated alongside the built-in constraints.
pub type FilePredicate = Arc<dyn Fn(&FileEntry) -> bool + Send + Sync>;

/// A single filtering predicate over a discovered file.
#[derive(Clone)]
pub enum Constraint {
    /// File name starts with the prefix.
    StartsWith(String),
    /// File stem ends with the suffix.
    EndsWith(String),
    /// File name contains the substring.
    Contains(String),
    /// Parent directory name is one of the allowed names.
    ParentIn(BTreeSet<String>),
    /// Named custom predicate.
    Custom {
        /// Label used in logs.
        name: String,
        /// Predicate returning `true` for files to keep.
        predicate: FilePredicate,
    },
}

impl Constraint {
    /// True if `entry` satisfies this constraint.
    pub fn matches(&self, entry: &FileEntry) -> bool {
        match self {
            Self::StartsWith(prefix) => entry.name().starts_with(prefix.as_str()),
            Self::EndsWith(suffix) => entry.stem().ends_with(suffix.as_str()),
            Self::Contains(needle) => entry.name().contains(needle.as_str()),
            Self::ParentIn(parents) => parents.contains(entry.parent_name()),
            Self::Custom { predicate, .. } => predicate(entry),
        }
    }
}

impl fmt::Debug for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StartsWith(prefix) => f.debug_tuple("StartsWith").field(prefix).finish(),
            Self::EndsWith(suffix) => f.debug_tuple("EndsWith").field(suffix).finish(),
            Self::Contains(needle) => f.debug_tuple("Contains").field(needle).finish(),
            Self::ParentIn(parents) => f.debug_tuple("ParentIn").field(parents).finish(),
            Self::Custom { name, .. } => f.debug_struct("Custom").field("name", name).finish(),
        }
    }
}

/// Conjunction of constraints; empty means every file passes.
#[derive(Clone, Debug, Default)]
pub struct ConstraintSet {
    constraints: Vec<Constraint>,
}

impl ConstraintSet {
    /// Create an empty (pass-through) set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the set described by command-line style settings.
    ///
    /// Empty strings are treated as absent constraints.
    pub fn from_config(config: &ConstraintConfig) -> Self {
        let mut set = Self::new();
        if let Some(suffix) = non_empty(&config.ending) {
            set = set.with(Constraint::EndsWith(suffix.to_string()));
        }
        if let Some(prefix) = non_empty(&config.starting) {
            set = set.with(Constraint::StartsWith(prefix.to_string()));
        }
        if let Some(needle) = non_empty(&config.existence) {
            set = set.with(Constraint::Contains(needle.to_string()));
        }
        if let Some(parents) = &config.parent
            && !parents.is_empty()
        {
            set = set.with(Constraint::ParentIn(parents.iter().cloned().collect()));
        }
        set
    }

    /// Add a constraint.
    pub fn with(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Add a custom predicate under `name`.
    pub fn with_predicate<F>(self, name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&FileEntry) -> bool + Send + Sync + 'static,
    {
        self.with(Constraint::Custom {
            name: name.into(),
            predicate: Arc::new(predicate),
        })
    }

    /// Active constraints in insertion order.
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// True when no constraint is active.
    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    /// True if `entry` satisfies every active constraint.
    pub fn matches(&self, entry: &FileEntry) -> bool {
        self.constraints
            .iter()
            .all(|constraint| constraint.matches(entry))
    }

    /// Keep the entries satisfying every constraint, preserving relative order.
    pub fn apply(&self, files: Vec<FileEntry>) -> Vec<FileEntry> {
        if self.is_empty() {
            return files;
        }
        files.into_iter().filter(|entry| self.matches(entry)).collect()
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|value| !value.is_empty())
}
