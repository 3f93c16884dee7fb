use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::constants::schedule::{
    SCHEDULE_FILE_EXTENSION, SCHEDULE_FILE_PREFIX, SCHEDULE_TMP_EXTENSION,
};
use crate::data::{BucketContents, Schedule};
use crate::errors::ScheduleError;
use crate::types::{BucketIndex, ScheduleId};

/// Fresh hyphen-less UUID v4 identifier.
pub fn new_schedule_id() -> ScheduleId {
    Uuid::new_v4().simple().to_string()
}

/// File name used to persist schedule `id`.
pub fn schedule_file_name(id: &str) -> String {
    format!("{SCHEDULE_FILE_PREFIX}{id}.{SCHEDULE_FILE_EXTENSION}")
}

/// Assigns run identifiers and persists bucket layouts as JSON.
///
/// The file body is the bucket mapping only
/// (`{"0": [...], "1": {...}}`); the identifier lives in the file name.
pub struct ScheduleWriter {
    output_dir: PathBuf,
}

impl ScheduleWriter {
    /// Writer that places schedules in `output_dir`.
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Directory receiving schedule files.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Tag `buckets` with a fresh identifier without touching the filesystem.
    pub fn build(&self, buckets: Vec<BucketContents>) -> Schedule {
        let id = new_schedule_id();
        info!(schedule_id = %id, "generated schedule id");
        Schedule {
            id,
            buckets: index_buckets(buckets),
            location: None,
        }
    }

    /// Tag `buckets` with a fresh identifier and write `schedule_<id>.json`.
    pub fn write(&self, buckets: Vec<BucketContents>) -> Result<Schedule, ScheduleError> {
        let mut schedule = self.build(buckets);
        let path = self.persist(&schedule)?;
        schedule.location = Some(path);
        Ok(schedule)
    }

    /// Persist an already-built schedule; existing files are never replaced.
    pub fn persist(&self, schedule: &Schedule) -> Result<PathBuf, ScheduleError> {
        fs::create_dir_all(&self.output_dir)?;
        let path = self.output_dir.join(schedule_file_name(&schedule.id));
        if path.exists() {
            return Err(ScheduleError::Configuration(format!(
                "schedule '{}' already exists",
                path.display()
            )));
        }
        let raw = serde_json::to_vec_pretty(&schedule.buckets)?;
        let tmp_path = path.with_extension(SCHEDULE_TMP_EXTENSION);
        fs::write(&tmp_path, raw)?;
        if let Err(err) = fs::rename(&tmp_path, &path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(err.into());
        }
        info!(
            schedule_id = %schedule.id,
            path = %path.display(),
            buckets = schedule.len(),
            "schedule written"
        );
        Ok(path)
    }
}

impl Schedule {
    /// Read a persisted schedule body back as raw JSON for inspection.
    pub fn read_buckets(path: impl AsRef<Path>) -> Result<IndexMap<String, Value>, ScheduleError> {
        let raw = fs::read(path.as_ref())?;
        Ok(serde_json::from_slice(&raw)?)
    }
}

fn index_buckets(buckets: Vec<BucketContents>) -> IndexMap<BucketIndex, BucketContents> {
    buckets.into_iter().enumerate().collect()
}
