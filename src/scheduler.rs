use std::time::Instant;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use crate::accession::{AccessionTable, JoinMiss, join, load_configured_table};
use crate::config::SchedulerConfig;
use crate::constraints::{Constraint, ConstraintSet};
use crate::data::{FileEntry, Schedule};
use crate::discovery::FileDiscoverer;
use crate::errors::ScheduleError;
use crate::metrics::{BucketStats, bucket_stats};
use crate::partition::{partition_files, partition_groups};
use crate::schedule::ScheduleWriter;

/// Layout of the produced buckets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScheduleMode {
    /// Buckets are lists of files.
    Flat,
    /// Buckets map group keys to files.
    Grouped,
}

/// Result of one scheduling run.
#[derive(Clone, Debug)]
pub struct ScheduleOutcome {
    /// The schedule (persisted unless the run was a dry run).
    pub schedule: Schedule,
    /// Bucket layout used.
    pub mode: ScheduleMode,
    /// Shuffle seed, when shuffling was enabled.
    pub seed: Option<u64>,
    /// Files detected after constraints.
    pub detected_files: usize,
    /// Files that failed the accession join (grouped mode only).
    pub join_misses: Vec<JoinMiss>,
    /// Bucket size spread.
    pub stats: Option<BucketStats>,
}

/// Discover -> (join) -> partition -> write pipeline.
pub struct Scheduler {
    config: SchedulerConfig,
    constraints: ConstraintSet,
    table: Option<AccessionTable>,
}

impl Scheduler {
    /// Validate `config` and load the accession table when grouping applies.
    pub fn new(config: SchedulerConfig) -> Result<Self, ScheduleError> {
        config.validate()?;
        let table = load_configured_table(&config.accession)?;
        let constraints = ConstraintSet::from_config(&config.constraints);
        log_constraints(&constraints);
        Ok(Self {
            config,
            constraints,
            table,
        })
    }

    /// Replace the accession table (`None` forces a flat schedule).
    pub fn with_accession_table(mut self, table: Option<AccessionTable>) -> Self {
        self.table = table;
        self
    }

    /// Add a caller-supplied file predicate.
    pub fn with_predicate<F>(mut self, name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&FileEntry) -> bool + Send + Sync + 'static,
    {
        self.constraints = self.constraints.with_predicate(name, predicate);
        self
    }

    /// Active configuration.
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Run with an RNG seeded from the configured seed, or a fresh one.
    pub fn run(&self) -> Result<ScheduleOutcome, ScheduleError> {
        let seed = self
            .config
            .shuffle
            .then(|| self.config.seed.unwrap_or_else(|| rand::rng().random()));
        if let Some(seed) = seed {
            info!(seed, "shuffling detected files");
        }
        let mut rng = StdRng::seed_from_u64(seed.unwrap_or_default());
        let mut outcome = self.run_with_rng(&mut rng)?;
        outcome.seed = seed;
        Ok(outcome)
    }

    /// Run the pipeline with a caller-owned RNG.
    pub fn run_with_rng<R>(&self, rng: &mut R) -> Result<ScheduleOutcome, ScheduleError>
    where
        R: Rng + ?Sized,
    {
        let files = FileDiscoverer::from_config(&self.config)
            .with_constraints(self.constraints.clone())
            .discover(rng)?;
        let detected_files = files.len();

        let started = Instant::now();
        let (mode, buckets, join_misses) = match &self.table {
            Some(table) => {
                let report = join(&files, table, self.config.accession.miss_policy);
                let buckets = partition_groups(&report.groups, self.config.total_buckets)?;
                (ScheduleMode::Grouped, buckets, report.misses)
            }
            None => {
                let buckets = partition_files(&files, self.config.total_buckets)?;
                (ScheduleMode::Flat, buckets, Vec::new())
            }
        };
        let stats = bucket_stats(&buckets);
        let elapsed_ms = started.elapsed().as_millis() as u64;
        debug!(elapsed_ms, "task assignment completed");
        if let Some(stats) = &stats {
            info!(
                mode = ?mode,
                buckets = stats.buckets,
                files = stats.total_files,
                min_items = stats.min_items,
                max_items = stats.max_items,
                "buckets assigned"
            );
        }

        let writer = ScheduleWriter::new(&self.config.output_dir);
        let schedule = if self.config.save {
            writer.write(buckets)?
        } else {
            writer.build(buckets)
        };
        info!(schedule_id = %schedule.id, "schedule layout completed");

        Ok(ScheduleOutcome {
            schedule,
            mode,
            seed: None,
            detected_files,
            join_misses,
            stats,
        })
    }
}

fn log_constraints(constraints: &ConstraintSet) {
    if constraints.is_empty() {
        info!("no constraints detected");
        return;
    }
    for constraint in constraints.constraints() {
        match constraint {
            Constraint::StartsWith(prefix) => info!(%prefix, "starting constraint"),
            Constraint::EndsWith(suffix) => info!(%suffix, "ending constraint"),
            Constraint::Contains(needle) => info!(%needle, "existence constraint"),
            Constraint::ParentIn(parents) => info!(?parents, "parent constraint"),
            Constraint::Custom { name, .. } => info!(%name, "custom constraint"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AccessionConfig, ConstraintConfig};
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b">x\nA\n").unwrap();
    }

    fn flat_config(root: &Path, out: &Path, buckets: usize) -> SchedulerConfig {
        SchedulerConfig {
            root: root.to_path_buf(),
            total_buckets: buckets,
            output_dir: out.to_path_buf(),
            accession: AccessionConfig {
                enabled: false,
                ..AccessionConfig::default()
            },
            ..SchedulerConfig::default()
        }
    }

    #[test]
    fn invalid_config_fails_before_discovery() {
        let config = SchedulerConfig {
            root: "/definitely/not/here".into(),
            total_buckets: 0,
            ..SchedulerConfig::default()
        };
        assert!(matches!(
            Scheduler::new(config),
            Err(ScheduleError::Configuration(_))
        ));
    }

    #[test]
    fn flat_run_writes_balanced_schedule() {
        let data = tempdir().unwrap();
        let out = tempdir().unwrap();
        for idx in 1..=10 {
            touch(data.path(), &format!("f{idx:02}.fna"));
        }
        let outcome = Scheduler::new(flat_config(data.path(), out.path(), 3))
            .unwrap()
            .run()
            .unwrap();
        assert_eq!(outcome.mode, ScheduleMode::Flat);
        assert_eq!(outcome.seed, None);
        assert_eq!(outcome.detected_files, 10);
        let sizes: Vec<usize> = outcome
            .schedule
            .buckets
            .values()
            .map(|bucket| bucket.file_count())
            .collect();
        assert_eq!(sizes, vec![4, 3, 3]);
        assert!(outcome.schedule.location.unwrap().is_file());
    }

    #[test]
    fn custom_predicate_filters_files() {
        let data = tempdir().unwrap();
        let out = tempdir().unwrap();
        for name in ["keep_1.fna", "keep_2.fna", "skip_3.fna"] {
            touch(data.path(), name);
        }
        let config = SchedulerConfig {
            save: false,
            ..flat_config(data.path(), out.path(), 1)
        };
        let outcome = Scheduler::new(config)
            .unwrap()
            .with_predicate("keep-only", |entry| entry.name().starts_with("keep"))
            .run()
            .unwrap();
        assert_eq!(outcome.detected_files, 2);
        assert!(outcome.schedule.location.is_none());
    }

    #[test]
    fn seeded_shuffle_is_reproducible() {
        let data = tempdir().unwrap();
        let out = tempdir().unwrap();
        for idx in 0..30 {
            touch(data.path(), &format!("f{idx:02}.fna"));
        }
        let config = SchedulerConfig {
            shuffle: true,
            seed: Some(42),
            save: false,
            constraints: ConstraintConfig::default(),
            ..flat_config(data.path(), out.path(), 4)
        };
        let scheduler = Scheduler::new(config).unwrap();
        let first = scheduler.run().unwrap();
        let second = scheduler.run().unwrap();
        assert_eq!(first.seed, Some(42));
        assert_eq!(first.schedule.buckets, second.schedule.buckets);
        assert_ne!(first.schedule.id, second.schedule.id);
    }

    #[test]
    fn grouped_run_fails_when_groups_are_fewer_than_buckets() {
        let data = tempdir().unwrap();
        let out = tempdir().unwrap();
        touch(data.path(), "GCF_000000001.1_a.fna");
        touch(data.path(), "GCF_000000002.1_b.fna");
        let table = AccessionTable::from_pairs([
            ("GCF_000000001.1", "X"),
            ("GCF_000000002.1", "X"),
        ]);
        let err = Scheduler::new(flat_config(data.path(), out.path(), 2))
            .unwrap()
            .with_accession_table(Some(table))
            .run()
            .unwrap_err();
        assert!(matches!(
            err,
            ScheduleError::InsufficientItems {
                found: 1,
                buckets: 2
            }
        ));
        assert_eq!(fs::read_dir(out.path()).unwrap().count(), 0);
    }
}
