#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Accession table loading and the metadata join for grouped schedules.
pub mod accession;
/// Command-line entry point and logging setup.
pub mod cli;
/// Scheduler configuration types.
pub mod config;
/// Centralized defaults and naming constants.
pub mod constants;
/// File name constraints.
pub mod constraints;
/// File entry, bucket, and schedule records.
pub mod data;
/// Constraint-filtered file discovery.
pub mod discovery;
/// Bucket balance statistics.
pub mod metrics;
/// Balanced contiguous partitioning.
pub mod partition;
/// Schedule identifiers and persistence.
pub mod schedule;
/// End-to-end scheduling pipeline.
pub mod scheduler;
/// Input transports used by discovery (filesystem today).
pub mod transport;
/// Shared type aliases.
pub mod types;

mod errors;

pub use accession::{AccessionTable, JoinMiss, JoinMissReason, JoinReport, extract_accession, join};
pub use config::{AccessionConfig, ConstraintConfig, JoinMissPolicy, SchedulerConfig};
pub use constraints::{Constraint, ConstraintSet, FilePredicate};
pub use data::{BucketContents, FileEntry, Schedule};
pub use discovery::FileDiscoverer;
pub use errors::ScheduleError;
pub use metrics::{BucketStats, bucket_stats};
pub use partition::{bucket_sizes, partition, partition_files, partition_groups};
pub use schedule::{ScheduleWriter, new_schedule_id, schedule_file_name};
pub use scheduler::{ScheduleMode, ScheduleOutcome, Scheduler};
pub use types::{AccessionToken, BucketIndex, GroupKey, PathString, ScheduleId};
