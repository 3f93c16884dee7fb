use std::error::Error;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use clap::{ArgAction, Parser, ValueEnum, error::ErrorKind};
use tracing::Subscriber;
use tracing_subscriber::filter::{Filtered, LevelFilter};
use tracing_subscriber::fmt::format::{DefaultFields, Format};
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::{AccessionConfig, ConstraintConfig, JoinMissPolicy, SchedulerConfig};
use crate::constants::accession::{
    DEFAULT_ACCESSION_COLUMN, DEFAULT_ACCESSION_TABLE_PATH, DEFAULT_GROUP_COLUMN,
};
use crate::constants::discovery::{DEFAULT_MAXDEPTH, DEFAULT_SUFFIX, DEFAULT_TOTAL_BUCKETS};
use crate::constants::schedule::DEFAULT_LOG_FILE;
use crate::scheduler::{ScheduleMode, Scheduler};

type WarnFileLayer<S> = Filtered<fmt::Layer<S, DefaultFields, Format, Mutex<File>>, LevelFilter, S>;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum JoinMissArg {
    Drop,
    Unassigned,
}

impl From<JoinMissArg> for JoinMissPolicy {
    fn from(value: JoinMissArg) -> Self {
        match value {
            JoinMissArg::Drop => JoinMissPolicy::Drop,
            JoinMissArg::Unassigned => JoinMissPolicy::Unassigned,
        }
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "sassign",
    disable_help_subcommand = true,
    about = "Assign discovered files to balanced work buckets",
    long_about = "Walk a directory for files with a given extension, filter them by name constraints, optionally group them by species through an assembly accession table, and write a schedule_<id>.json mapping bucket indices to files.",
    after_help = "The accession table is optional; when it is missing or --use-assembly 0 is given, buckets hold plain file lists."
)]
struct SassignCli {
    #[arg(value_name = "PATH", help = "Root directory to scan")]
    path: PathBuf,
    #[arg(
        short = 's',
        long,
        default_value = DEFAULT_SUFFIX,
        help = "File extension to match (leading dot optional)"
    )]
    suffix: String,
    #[arg(
        short = 'd',
        long,
        visible_alias = "md",
        default_value_t = DEFAULT_MAXDEPTH,
        value_parser = parse_positive_usize,
        help = "Directory depth searched; 1 means files directly under PATH"
    )]
    maxdepth: usize,
    #[arg(
        short = 'b',
        long = "total-buckets",
        visible_alias = "tb",
        default_value_t = DEFAULT_TOTAL_BUCKETS,
        value_parser = parse_positive_usize,
        help = "Number of buckets; must not exceed the number of detected items"
    )]
    total_buckets: usize,
    #[arg(long, help = "Shuffle detected files before assignment")]
    shuffle: bool,
    #[arg(long, requires = "shuffle", help = "Seed for --shuffle (random when omitted)")]
    seed: Option<u64>,
    #[arg(
        long = "starting-constraint",
        visible_alias = "sc",
        value_name = "PREFIX",
        help = "Keep files whose name starts with PREFIX"
    )]
    starting_constraint: Option<String>,
    #[arg(
        long = "ending-constraint",
        visible_alias = "ec",
        value_name = "SUFFIX",
        help = "Keep files whose name, without the extension, ends with SUFFIX"
    )]
    ending_constraint: Option<String>,
    #[arg(
        long = "existence-constraint",
        visible_alias = "ex",
        value_name = "TEXT",
        help = "Keep files whose name contains TEXT"
    )]
    existence_constraint: Option<String>,
    #[arg(
        long = "parent-constraint",
        visible_alias = "pc",
        value_name = "DIR",
        num_args = 1..,
        help = "Keep files whose parent directory is one of DIR"
    )]
    parent_constraint: Option<Vec<String>>,
    #[arg(
        long = "use-assembly",
        visible_alias = "ua",
        value_name = "0|1",
        default_value_t = true,
        action = ArgAction::Set,
        value_parser = parse_flag,
        help = "Group files by species when the accession table is present"
    )]
    use_assembly: bool,
    #[arg(
        long = "accession-table",
        env = "SASSIGN_ACCESSION_TABLE",
        value_name = "PATH",
        default_value = DEFAULT_ACCESSION_TABLE_PATH,
        help = "Accession table (plain or .gz delimited text)"
    )]
    accession_table: PathBuf,
    #[arg(long = "accession-column", default_value = DEFAULT_ACCESSION_COLUMN)]
    accession_column: String,
    #[arg(long = "group-column", default_value = DEFAULT_GROUP_COLUMN)]
    group_column: String,
    #[arg(
        long = "join-miss",
        value_enum,
        default_value = "drop",
        help = "Handling of files without a matching accession row"
    )]
    join_miss: JoinMissArg,
    #[arg(long = "follow-links", help = "Follow symlinks while scanning")]
    follow_links: bool,
    #[arg(long, help = "Scan top-level subdirectories in parallel")]
    parallel: bool,
    #[arg(
        long = "output-dir",
        value_name = "DIR",
        default_value = ".",
        help = "Directory receiving schedule_<id>.json"
    )]
    output_dir: PathBuf,
    #[arg(long = "dry-run", help = "Build and report the schedule without writing it")]
    dry_run: bool,
    #[arg(
        long = "log-file",
        value_name = "PATH",
        default_value = DEFAULT_LOG_FILE,
        conflicts_with = "no_log_file",
        help = "File receiving warnings"
    )]
    log_file: PathBuf,
    #[arg(long = "no-log-file", help = "Do not write warnings to a log file")]
    no_log_file: bool,
}

impl SassignCli {
    fn into_config(self) -> SchedulerConfig {
        SchedulerConfig {
            root: self.path,
            suffix: self.suffix,
            maxdepth: self.maxdepth,
            total_buckets: self.total_buckets,
            shuffle: self.shuffle,
            seed: self.seed,
            constraints: ConstraintConfig {
                starting: self.starting_constraint,
                ending: self.ending_constraint,
                existence: self.existence_constraint,
                parent: self.parent_constraint,
            },
            accession: AccessionConfig {
                enabled: self.use_assembly,
                table_path: self.accession_table,
                accession_column: self.accession_column,
                group_column: self.group_column,
                miss_policy: self.join_miss.into(),
            },
            follow_links: self.follow_links,
            parallel_discovery: self.parallel,
            output_dir: self.output_dir,
            save: !self.dry_run,
        }
    }
}

/// Parse `args_iter` (without the program name), run one scheduling pass, and
/// print the schedule location.
pub fn run_sassign<I>(args_iter: I) -> Result<(), Box<dyn Error>>
where
    I: Iterator<Item = String>,
{
    let Some(cli) =
        parse_cli::<SassignCli, _>(std::iter::once("sassign".to_string()).chain(args_iter))?
    else {
        return Ok(());
    };
    let log_file = (!cli.no_log_file).then(|| cli.log_file.clone());
    init_logging(log_file.as_deref())?;

    let outcome = Scheduler::new(cli.into_config())?.run()?;
    let schedule = &outcome.schedule;
    let layout = match outcome.mode {
        ScheduleMode::Flat => "flat",
        ScheduleMode::Grouped => "grouped",
    };
    println!("schedule id: {}", schedule.id);
    println!(
        "assigned {} file(s) to {} {layout} bucket(s)",
        schedule.file_count(),
        schedule.len()
    );
    if let Some(seed) = outcome.seed {
        println!("shuffle seed: {seed}");
    }
    if !outcome.join_misses.is_empty() {
        println!(
            "{} file(s) could not be matched to the accession table",
            outcome.join_misses.len()
        );
    }
    match &schedule.location {
        Some(path) => println!("written to {}", path.display()),
        None => println!("dry run: schedule not written"),
    }
    Ok(())
}

/// Install stderr logging filtered by `RUST_LOG` (default `info`), plus an
/// optional append-only warning log.
///
/// A subscriber installed earlier in the process is left in place.
pub fn init_logging(log_file: Option<&Path>) -> Result<(), Box<dyn Error>> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(env_filter);
    let file_layer = match log_file {
        Some(path) => Some(warn_file_layer(path)?),
        None => None,
    };
    let _ = tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .try_init();
    Ok(())
}

/// Plain-text layer appending WARN and above to `path`.
fn warn_file_layer<S>(path: &Path) -> io::Result<WarnFileLayer<S>>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    Ok(fmt::layer()
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .with_filter(LevelFilter::WARN))
}

fn parse_positive_usize(raw: &str) -> Result<usize, String> {
    let parsed = raw
        .parse::<usize>()
        .map_err(|_| format!("Could not parse '{}' as a positive integer", raw))?;
    if parsed == 0 {
        return Err("value must be greater than zero".to_string());
    }
    Ok(parsed)
}

fn parse_flag(raw: &str) -> Result<bool, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => Err(format!("expected 0 or 1, got '{raw}'")),
    }
}

fn parse_cli<T, I>(args: I) -> Result<Option<T>, Box<dyn Error>>
where
    T: Parser,
    I: IntoIterator,
    I::Item: Into<std::ffi::OsString> + Clone,
{
    match T::try_parse_from(args) {
        Ok(cli) => Ok(Some(cli)),
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                err.print()?;
                Ok(None)
            }
            _ => Err(err.into()),
        },
    }
}
