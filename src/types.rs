/// External grouping identifier resolved through the accession table.
/// Examples: `562`, `1280`, `unassigned`
pub type GroupKey = String;
/// Assembly accession token parsed out of a file name.
/// Examples: `GCF_000005845.2`, `GCA_000001405.29`
pub type AccessionToken = String;
/// Opaque per-run schedule identifier (hyphen-less UUID v4).
/// Example: `3f2b8c1e9d4a4f6b8e7c5d2a1b0f9e8d`
pub type ScheduleId = String;
/// File path strings as they appear in a persisted schedule.
/// Example: `/data/genomes/bacteria/GCF_000005845.2_ASM584v2_genomic.fna`
pub type PathString = String;
/// Zero-based bucket position inside a schedule.
pub type BucketIndex = usize;
