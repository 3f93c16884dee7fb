use std::path::PathBuf;

use crate::constants::accession::{
    DEFAULT_ACCESSION_COLUMN, DEFAULT_ACCESSION_TABLE_PATH, DEFAULT_GROUP_COLUMN,
};
use crate::constants::discovery::{DEFAULT_MAXDEPTH, DEFAULT_SUFFIX, DEFAULT_TOTAL_BUCKETS};
use crate::errors::ScheduleError;

/// What to do with files whose accession cannot be resolved to a group.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum JoinMissPolicy {
    /// Leave unresolved files out of the grouped schedule.
    #[default]
    Drop,
    /// Collect unresolved files under the `unassigned` group key.
    Unassigned,
}

/// File name constraints applied after discovery.
#[derive(Clone, Debug, Default)]
pub struct ConstraintConfig {
    /// Required file name prefix.
    pub starting: Option<String>,
    /// Required stem suffix (the file name without the matched extension).
    pub ending: Option<String>,
    /// Required substring of the file name.
    pub existence: Option<String>,
    /// Allow-list of parent directory names.
    pub parent: Option<Vec<String>>,
}

/// Accession table settings for grouped mode.
#[derive(Clone, Debug)]
pub struct AccessionConfig {
    /// Enable grouping when the table is present.
    pub enabled: bool,
    /// Table location (plain or `.gz` delimited text).
    pub table_path: PathBuf,
    /// Header name of the accession column.
    pub accession_column: String,
    /// Header name of the group identifier column.
    pub group_column: String,
    /// Handling for files that fail the join.
    pub miss_policy: JoinMissPolicy,
}

impl Default for AccessionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            table_path: PathBuf::from(DEFAULT_ACCESSION_TABLE_PATH),
            accession_column: DEFAULT_ACCESSION_COLUMN.to_string(),
            group_column: DEFAULT_GROUP_COLUMN.to_string(),
            miss_policy: JoinMissPolicy::default(),
        }
    }
}

/// Top-level scheduler configuration.
#[derive(Clone, Debug)]
pub struct SchedulerConfig {
    /// Root directory to scan.
    pub root: PathBuf,
    /// Extension to match; a leading dot is ignored.
    pub suffix: String,
    /// Directory depth bound; files directly under `root` are depth 1.
    pub maxdepth: usize,
    /// Number of output buckets.
    pub total_buckets: usize,
    /// Randomize file order once before grouping/partitioning.
    pub shuffle: bool,
    /// RNG seed for the shuffle; drawn from OS entropy when absent.
    pub seed: Option<u64>,
    /// Name constraints.
    pub constraints: ConstraintConfig,
    /// Accession grouping settings.
    pub accession: AccessionConfig,
    /// Follow symlinks while walking `root`.
    pub follow_links: bool,
    /// Walk top-level subdirectories on the rayon pool.
    pub parallel_discovery: bool,
    /// Directory receiving `schedule_<id>.json`.
    pub output_dir: PathBuf,
    /// Persist the schedule; `false` builds it without writing.
    pub save: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            suffix: DEFAULT_SUFFIX.to_string(),
            maxdepth: DEFAULT_MAXDEPTH,
            total_buckets: DEFAULT_TOTAL_BUCKETS,
            shuffle: false,
            seed: None,
            constraints: ConstraintConfig::default(),
            accession: AccessionConfig::default(),
            follow_links: false,
            parallel_discovery: false,
            output_dir: PathBuf::from("."),
            save: true,
        }
    }
}

impl SchedulerConfig {
    /// Suffix with any leading dots removed (`.fna` => `fna`).
    pub fn normalized_suffix(&self) -> &str {
        self.suffix.trim_start_matches('.')
    }

    /// Reject settings that would make discovery or partitioning meaningless.
    ///
    /// Runs before any filesystem access.
    pub fn validate(&self) -> Result<(), ScheduleError> {
        if self.total_buckets == 0 {
            return Err(ScheduleError::Configuration(
                "total buckets must be greater than zero".to_string(),
            ));
        }
        if self.maxdepth == 0 {
            return Err(ScheduleError::Configuration(
                "maxdepth must be at least 1".to_string(),
            ));
        }
        if self.normalized_suffix().is_empty() {
            return Err(ScheduleError::Configuration(
                "suffix must not be empty".to_string(),
            ));
        }
        if let Some(parents) = &self.constraints.parent
            && parents.is_empty()
        {
            return Err(ScheduleError::Configuration(
                "parent constraint requires at least one directory name".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_command_line_defaults() {
        let config = SchedulerConfig::default();
        assert_eq!(config.suffix, "fna");
        assert_eq!(config.maxdepth, 1);
        assert_eq!(config.total_buckets, 10);
        assert!(!config.shuffle);
        assert!(config.accession.enabled);
        assert_eq!(config.accession.miss_policy, JoinMissPolicy::Drop);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn leading_dot_is_stripped_from_suffix() {
        let config = SchedulerConfig {
            suffix: ".fna".to_string(),
            ..SchedulerConfig::default()
        };
        assert_eq!(config.normalized_suffix(), "fna");
    }

    #[test]
    fn validate_rejects_degenerate_values() {
        let zero_buckets = SchedulerConfig {
            total_buckets: 0,
            ..SchedulerConfig::default()
        };
        assert!(matches!(
            zero_buckets.validate(),
            Err(ScheduleError::Configuration(_))
        ));

        let zero_depth = SchedulerConfig {
            maxdepth: 0,
            ..SchedulerConfig::default()
        };
        assert!(matches!(
            zero_depth.validate(),
            Err(ScheduleError::Configuration(_))
        ));

        let dot_suffix = SchedulerConfig {
            suffix: ".".to_string(),
            ..SchedulerConfig::default()
        };
        assert!(matches!(
            dot_suffix.validate(),
            Err(ScheduleError::Configuration(_))
        ));

        let empty_parents = SchedulerConfig {
            constraints: ConstraintConfig {
                parent: Some(Vec::new()),
                ..ConstraintConfig::default()
            },
            ..SchedulerConfig::default()
        };
        assert!(matches!(
            empty_parents.validate(),
            Err(ScheduleError::Configuration(_))
        ));
    }
}
