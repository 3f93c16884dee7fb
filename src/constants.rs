/// Constants used by file discovery defaults.
pub mod discovery {
    /// File extension matched when no suffix is configured.
    pub const DEFAULT_SUFFIX: &str = "fna";
    /// Directory depth searched when no bound is configured (files directly under the root).
    pub const DEFAULT_MAXDEPTH: usize = 1;
    /// Number of buckets produced when no count is configured.
    pub const DEFAULT_TOTAL_BUCKETS: usize = 10;
}

/// Constants used by accession-table loading and the metadata join.
pub mod accession {
    /// Default location of the accession table, relative to the working directory.
    pub const DEFAULT_ACCESSION_TABLE_PATH: &str = "data/assembly.txt.gz";
    /// Column holding the assembly accession token.
    pub const DEFAULT_ACCESSION_COLUMN: &str = "#assembly_accession";
    /// Column holding the group identifier (species taxonomy id).
    pub const DEFAULT_GROUP_COLUMN: &str = "species_taxid";
    /// Pattern used to extract an accession from a file name.
    ///
    /// The token is `GCA_`/`GCF_` + digits + `.` + version digits and must be
    /// immediately followed by an underscore.
    pub const ACCESSION_PATTERN: &str = r"(GC[AF]_\d+\.\d+)_";
    /// Group key used for join misses under the `Unassigned` policy.
    pub const UNASSIGNED_GROUP: &str = "unassigned";
    /// Extension that marks a gzip-compressed accession table.
    pub const GZIP_EXTENSION: &str = "gz";
}

/// Constants used by schedule naming and persistence.
pub mod schedule {
    /// File name prefix for persisted schedules (`schedule_<id>.json`).
    pub const SCHEDULE_FILE_PREFIX: &str = "schedule_";
    /// File extension for persisted schedules.
    pub const SCHEDULE_FILE_EXTENSION: &str = "json";
    /// Extension used for the temporary file written before the atomic rename.
    pub const SCHEDULE_TMP_EXTENSION: &str = "json.tmp";
    /// Default warning log written next to the schedules.
    pub const DEFAULT_LOG_FILE: &str = "schedule.log";
}
