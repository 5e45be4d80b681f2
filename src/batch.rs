//! Batch driver: single files or whole directory trees.
//!
//! ### Design
//! - Files are processed one at a time, in walk order (entries sorted by
//!   name so runs are reproducible).
//! - Data goes to `out`; progress goes to `diag`. The two never mix.
//! - The "header still to be written" flag is owned here and passed by
//!   reference into each render call, which clears it only once a header
//!   really went out. A skipped file leaves it as it was, so the header
//!   appears once, before the first data row of the run.
//! - Per-file failures ([`Fast5Error::is_skippable`]) are reported and the
//!   walk continues; output errors abort.

use std::io::Write;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{Fast5Error, Result};
use crate::fast5::Fast5File;
use crate::render::render_events;
use crate::seq::{render_sequences, SeqFormat};

/// Suffix of files picked up in directory mode.
pub const DEFAULT_SUFFIX: &str = ".fast5";

/// What to extract from each file.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum DataKind {
    Fastq,
    Fasta,
    Event,
    /// Accepted on the command line; nothing is extracted.
    Raw,
}

impl DataKind {
    /// Every kind, in the order the usage text lists them.
    pub const ALL: [DataKind; 4] = [DataKind::Fastq, DataKind::Fasta, DataKind::Event, DataKind::Raw];

    /// Name used on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            DataKind::Fastq => "fastq",
            DataKind::Fasta => "fasta",
            DataKind::Event => "event",
            DataKind::Raw => "raw",
        }
    }
}

impl std::str::FromStr for DataKind {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        DataKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("Unknown data type: {s}"))
    }
}

impl std::fmt::Display for DataKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options shared by every file of a run.
#[derive(Clone, Debug)]
pub struct ExtractOptions {
    pub kind: DataKind,
    /// Write the CSV header (event mode only).
    pub header: bool,
    /// Directory mode picks up files whose name ends with this.
    pub suffix: String,
}

impl ExtractOptions {
    /// Header on, default suffix.
    pub fn new(kind: DataKind) -> Self {
        Self { kind, header: true, suffix: DEFAULT_SUFFIX.to_string() }
    }
}

/// Result of extracting one file.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Extracted {
    /// Event rows or sequence records written.
    pub records: usize,
}

/// What became of one file.
#[derive(Debug)]
pub enum FileOutcome {
    Extracted(Extracted),
    Skipped(Fast5Error),
}

/// Totals over a whole run.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct BatchSummary {
    pub processed: usize,
    pub skipped: usize,
    pub records: usize,
}

/// Open `path` and extract `kind` into `out`. The file is closed before
/// this returns. `header_pending` is only consulted for event extraction.
pub fn extract_file<W: Write>(path: &Path, kind: DataKind, header_pending: &mut bool, out: &mut W) -> Result<Extracted> {
    let file = Fast5File::open(path)?;
    let extracted = match kind {
        DataKind::Event => {
            let s = render_events(&file, header_pending, out)?;
            Extracted { records: s.rows }
        }
        DataKind::Fastq | DataKind::Fasta => {
            let format = if kind == DataKind::Fastq { SeqFormat::Fastq } else { SeqFormat::Fasta };
            let s = render_sequences(&file, format, out)?;
            Extracted { records: s.records }
        }
        DataKind::Raw => {
            debug!("{}: raw extraction has no handler", path.display());
            Extracted::default()
        }
    };
    Ok(extracted)
}

/// [`extract_file`], with per-file failures turned into [`FileOutcome::Skipped`].
pub fn process_file<W: Write>(path: &Path, kind: DataKind, header_pending: &mut bool, out: &mut W) -> Result<FileOutcome> {
    match extract_file(path, kind, header_pending, out) {
        Ok(e) => Ok(FileOutcome::Extracted(e)),
        Err(e) if e.is_skippable() => {
            warn!("skipping {}: {e}", path.display());
            Ok(FileOutcome::Skipped(e))
        }
        Err(e) => Err(e),
    }
}

/// Files below `dir` whose name ends with `suffix`, in walk order.
pub fn discover(dir: &Path, suffix: &str) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| match e {
            Ok(e) => Some(e),
            Err(err) => {
                warn!("walking {}: {err}", dir.display());
                None
            }
        })
        .filter(|e| e.file_type().is_file() && e.file_name().to_string_lossy().ends_with(suffix))
        .map(|e| e.into_path())
        .collect()
}

/// Tail of a progress line, e.g. `done (1 more file to process)`.
pub fn progress_message(status: &str, remaining: usize) -> String {
    let noun = if remaining == 1 { "file" } else { "files" };
    format!("{status} ({remaining} more {noun} to process)")
}

/// Extract from a file or every matching file below a directory.
///
/// A path that is neither is a [`Fast5Error::Usage`] error.
pub fn run<W: Write, D: Write>(path: &Path, opts: &ExtractOptions, out: &mut W, diag: &mut D) -> Result<BatchSummary> {
    if path.is_dir() {
        run_directory(path, opts, out, diag)
    } else if path.is_file() {
        let mut summary = BatchSummary::default();
        let mut header_pending = opts.header;
        tally(&mut summary, &process_file(path, opts.kind, &mut header_pending, out)?);
        Ok(summary)
    } else {
        Err(Fast5Error::Usage(format!("No file or directory at '{}'", path.display())))
    }
}

fn tally(summary: &mut BatchSummary, outcome: &FileOutcome) {
    match outcome {
        FileOutcome::Extracted(e) => {
            summary.processed += 1;
            summary.records += e.records;
        }
        FileOutcome::Skipped(_) => summary.skipped += 1,
    }
}

fn run_directory<W: Write, D: Write>(dir: &Path, opts: &ExtractOptions, out: &mut W, diag: &mut D) -> Result<BatchSummary> {
    writeln!(diag, "Processing directory '{}':", dir.display())?;
    let files = discover(dir, &opts.suffix);
    info!("{} matching files below {}", files.len(), dir.display());

    let mut summary = BatchSummary::default();
    let mut header_pending = opts.header;
    let mut remaining = files.len();
    for path in files {
        let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        write!(diag, "  Processing file '{name}'...")?;
        diag.flush()?;

        let outcome = process_file(&path, opts.kind, &mut header_pending, out)?;
        remaining -= 1;
        let status = match &outcome {
            FileOutcome::Extracted(_) => "done",
            FileOutcome::Skipped(_) => "skipped",
        };
        tally(&mut summary, &outcome);
        writeln!(diag, " {}", progress_message(status, remaining))?;
    }
    Ok(summary)
}
