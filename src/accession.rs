//! Accession table lookup and the metadata join used for grouped schedules.
//!
//! A file joins when its name carries an assembly accession
//! (`GCF_000005845.2_...`) that appears in the table with a non-empty group
//! identifier. Everything else is a join miss: misses are reported and
//! logged, never raised as errors.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use csv::{StringRecord, Trim};
use flate2::read::MultiGzDecoder;
use indexmap::IndexMap;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::config::{AccessionConfig, JoinMissPolicy};
use crate::constants::accession::{
    ACCESSION_PATTERN, DEFAULT_ACCESSION_COLUMN, DEFAULT_GROUP_COLUMN, GZIP_EXTENSION,
    UNASSIGNED_GROUP,
};
use crate::data::FileEntry;
use crate::errors::ScheduleError;
use crate::types::{AccessionToken, GroupKey};

fn accession_regex() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(ACCESSION_PATTERN).expect("accession pattern is valid"))
}

/// Extract the assembly accession embedded in a file name.
///
/// Returns `None` unless the token is immediately followed by `_`.
pub fn extract_accession(name: &str) -> Option<AccessionToken> {
    accession_regex()
        .captures(name)
        .and_then(|captures| captures.get(1))
        .map(|token| token.as_str().to_string())
}

/// Flat accession -> group lookup loaded from a delimited text table.
#[derive(Clone, Debug, Default)]
pub struct AccessionTable {
    groups: HashMap<AccessionToken, GroupKey>,
}

impl AccessionTable {
    /// Build a table from in-memory pairs; the first value for a token wins.
    pub fn from_pairs<I, A, G>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (A, G)>,
        A: Into<AccessionToken>,
        G: Into<GroupKey>,
    {
        let mut groups = HashMap::new();
        for (accession, group) in pairs {
            groups.entry(accession.into()).or_insert_with(|| group.into());
        }
        Self { groups }
    }

    /// Load the table at `path` using the default column names.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScheduleError> {
        Self::load_with_columns(path, DEFAULT_ACCESSION_COLUMN, DEFAULT_GROUP_COLUMN)
    }

    /// Load the table at `path`, reading `accession_column` and `group_column`.
    ///
    /// Files ending in `.gz` are decompressed on the fly. The delimiter is a
    /// tab when the header contains one, a comma otherwise.
    pub fn load_with_columns(
        path: impl AsRef<Path>,
        accession_column: &str,
        group_column: &str,
    ) -> Result<Self, ScheduleError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|err| table_error(path, err))?;
        let is_gzip = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case(GZIP_EXTENSION))
            .unwrap_or(false);
        let reader: Box<dyn Read> = if is_gzip {
            Box::new(MultiGzDecoder::new(file))
        } else {
            Box::new(file)
        };
        let table = Self::from_reader(BufReader::new(reader), accession_column, group_column)
            .map_err(|err| match err {
                ScheduleError::Io(err) => table_error(path, err),
                ScheduleError::AccessionTable { reason, .. } => ScheduleError::AccessionTable {
                    path: path.to_path_buf(),
                    reason,
                },
                other => other,
            })?;
        info!(path = %path.display(), rows = table.len(), "loaded accession table");
        Ok(table)
    }

    /// Parse a delimited table from any buffered reader.
    ///
    /// Leading blank lines and `#` preamble lines whose first field is not
    /// the accession column are skipped before the header. Comma-separated
    /// fields may be double-quoted, so free-text columns can carry commas;
    /// tab-separated rows are read verbatim.
    pub fn from_reader<R: BufRead>(
        mut reader: R,
        accession_column: &str,
        group_column: &str,
    ) -> Result<Self, ScheduleError> {
        let header = read_header(&mut reader, accession_column)?;
        let delimiter = if header.contains('\t') { b'\t' } else { b',' };
        let mut columns = StringRecord::new();
        delimited_reader(header.as_bytes(), delimiter, None)
            .read_record(&mut columns)
            .map_err(row_error)?;
        let columns: Vec<&str> = columns.iter().collect();
        let accession_idx = column_index(&columns, accession_column)?;
        let group_idx = column_index(&columns, group_column)?;

        let mut groups: HashMap<AccessionToken, GroupKey> = HashMap::new();
        let mut conflicts = 0usize;
        for record in delimited_reader(reader, delimiter, Some(b'#')).records() {
            let record = record.map_err(row_error)?;
            let Some(accession) = record.get(accession_idx).filter(|v| !v.is_empty()) else {
                continue;
            };
            let group = record.get(group_idx).unwrap_or_default();
            match groups.get(accession) {
                Some(existing) if existing != group => conflicts += 1,
                Some(_) => {}
                None => {
                    groups.insert(accession.to_string(), group.to_string());
                }
            }
        }
        if conflicts > 0 {
            warn!(
                conflicts,
                "accession table lists conflicting groups for repeated accessions; keeping first"
            );
        }
        Ok(Self { groups })
    }

    /// Group identifier for `accession`, if present.
    ///
    /// An empty identifier in the table is returned as-is; the joiner treats
    /// it as a miss.
    pub fn group_for(&self, accession: &str) -> Option<&str> {
        self.groups.get(accession).map(String::as_str)
    }

    /// Number of distinct accessions.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// True when the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Load the configured accession table, or `None` when grouping is disabled
/// or the table file does not exist.
pub fn load_configured_table(
    config: &AccessionConfig,
) -> Result<Option<AccessionTable>, ScheduleError> {
    if !config.enabled {
        debug!("accession grouping disabled");
        return Ok(None);
    }
    if !config.table_path.is_file() {
        info!(
            path = %config.table_path.display(),
            "accession table not found; using flat schedule"
        );
        return Ok(None);
    }
    AccessionTable::load_with_columns(
        &config.table_path,
        &config.accession_column,
        &config.group_column,
    )
    .map(Some)
}

/// Why a file did not join.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JoinMissReason {
    /// No accession token in the file name.
    NoAccession,
    /// Token parsed but absent from the table.
    UnknownAccession(AccessionToken),
    /// Token found but its group identifier is empty.
    EmptyGroup(AccessionToken),
}

/// A file that could not be mapped to a group.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JoinMiss {
    /// The unresolved file.
    pub file: FileEntry,
    /// Reason for the miss.
    pub reason: JoinMissReason,
}

/// Files grouped by key, plus the misses encountered while joining.
#[derive(Clone, Debug, Default)]
pub struct JoinReport {
    /// Group key to files, keys in first-appearance order.
    pub groups: IndexMap<GroupKey, Vec<FileEntry>>,
    /// Files that failed the join.
    pub misses: Vec<JoinMiss>,
}

impl JoinReport {
    /// Number of files placed into a group.
    pub fn joined_files(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }
}

/// Left-join `files` against `table` and group the joined files by key.
///
/// Group keys appear in the order their first file appears in `files`; files
/// inside a group keep their relative order. Misses are dropped or collected
/// under [`UNASSIGNED_GROUP`] according to `policy`.
pub fn join(files: &[FileEntry], table: &AccessionTable, policy: JoinMissPolicy) -> JoinReport {
    let mut report = JoinReport::default();
    for file in files {
        let resolved = match extract_accession(file.name()) {
            None => Err(JoinMissReason::NoAccession),
            Some(token) => match table.group_for(&token) {
                None => Err(JoinMissReason::UnknownAccession(token)),
                Some("") => Err(JoinMissReason::EmptyGroup(token)),
                Some(group) => Ok(group.to_string()),
            },
        };
        match resolved {
            Ok(group) => report.groups.entry(group).or_default().push(file.clone()),
            Err(reason) => {
                debug!(path = %file.path().display(), reason = ?reason, "join miss");
                if policy == JoinMissPolicy::Unassigned {
                    report
                        .groups
                        .entry(UNASSIGNED_GROUP.to_string())
                        .or_default()
                        .push(file.clone());
                }
                report.misses.push(JoinMiss {
                    file: file.clone(),
                    reason,
                });
            }
        }
    }
    if !report.misses.is_empty() {
        warn!(
            misses = report.misses.len(),
            files = files.len(),
            policy = ?policy,
            "missing values detected during accession join"
        );
    }
    info!(
        groups = report.groups.len(),
        joined = report.joined_files(),
        "grouped files by accession"
    );
    report
}

/// Skip the preamble and return the header line without its terminator.
fn read_header<R: BufRead>(
    reader: &mut R,
    accession_column: &str,
) -> Result<String, ScheduleError> {
    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            return Err(invalid_table("table is empty"));
        }
        let trimmed = line.trim_end_matches(['\r', '\n']);
        if trimmed.trim().is_empty() {
            continue;
        }
        if trimmed.starts_with('#') && !names_column(trimmed, accession_column) {
            continue;
        }
        return Ok(trimmed.to_string());
    }
}

/// True when the first field of `line` is `column`, with or without the
/// leading `#` some tables put on their header.
fn names_column(line: &str, column: &str) -> bool {
    let delimiter = if line.contains('\t') { '\t' } else { ',' };
    let first = line.split(delimiter).next().unwrap_or_default();
    same_column(first, column)
}

fn same_column(field: &str, column: &str) -> bool {
    let field = field.trim();
    field == column || field.trim_start_matches('#').trim() == column
}

fn delimited_reader<R: Read>(reader: R, delimiter: u8, comment: Option<u8>) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .quoting(delimiter == b',')
        .trim(Trim::All)
        .comment(comment)
        .from_reader(reader)
}

fn row_error(err: csv::Error) -> ScheduleError {
    let reason = err.to_string();
    match err.into_kind() {
        csv::ErrorKind::Io(err) => ScheduleError::Io(err),
        _ => invalid_table(&reason),
    }
}

fn column_index(columns: &[&str], name: &str) -> Result<usize, ScheduleError> {
    columns
        .iter()
        .position(|column| same_column(column, name))
        .ok_or_else(|| invalid_table(&format!("missing column '{name}'")))
}

fn invalid_table(reason: &str) -> ScheduleError {
    ScheduleError::AccessionTable {
        path: PathBuf::new(),
        reason: reason.to_string(),
    }
}

fn table_error(path: &Path, err: std::io::Error) -> ScheduleError {
    ScheduleError::AccessionTable {
        path: path.to_path_buf(),
        reason: err.to_string(),
    }
}
