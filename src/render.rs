//! CSV rendering of event tables.
//!
//! Every event record becomes one line prefixed with the columns that
//! identify where it came from:
//!
//! ```text
//! runID,channel,mux,read,<event fields...>
//! MN12345_a1b2c3d4e5f6a7b8,117,2,Read_1042,18113,7,86.65,1.04,...
//! ```
//!
//! The event columns come from the table's own schema, so the header is
//! rebuilt for every file.

use std::io::Write;

use log::debug;

use crate::error::Result;
use crate::fast5::Fast5File;
use crate::table::Value;

/// Characters of `run_id` kept in the run label.
pub const RUN_ID_PREFIX_LEN: usize = 16;

/// Leading columns of every header line.
pub const PREFIX_COLUMNS: [&str; 4] = ["runID", "channel", "mux", "read"];

/// Run label used in the first CSV column: `device_id`, `_`, then the first
/// 16 characters of `run_id` (all of it when shorter).
///
/// # Examples
/// ```
/// assert_eq!(fast5dump::render::run_id("ABC123", "0123456789abcdefXYZ"), "ABC123_0123456789abcdef");
/// assert_eq!(fast5dump::render::run_id("ABC123", "short"), "ABC123_short");
/// ```
pub fn run_id(device_id: &str, run_id: &str) -> String {
    let prefix: String = run_id.chars().take(RUN_ID_PREFIX_LEN).collect();
    format!("{device_id}_{prefix}")
}

/// What one [`render_events`] call wrote.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct RenderSummary {
    pub reads: usize,
    pub rows: usize,
    /// This call wrote the header line.
    pub header_written: bool,
}

/// Write every event record of `file` as CSV to `sink`.
///
/// While `*header_pending` is set, one header line is written before the
/// first read's rows and the flag is cleared; the caller owns the flag so it
/// carries over from file to file. Every read group is checked for
/// `start_mux` and a supported `Events` layout before anything is written,
/// so a file that fails those checks leaves `sink` and the flag untouched.
/// Each row is assembled in full before it is handed to the sink; the sink
/// is flushed after every read.
pub fn render_events<W: Write>(file: &Fast5File, header_pending: &mut bool, sink: &mut W) -> Result<RenderSummary> {
    let run = file.run_metadata()?;
    let channel = file.channel_metadata()?;
    let run_label = run_id(&run.device_id, &run.run_id);

    let mut reads = Vec::new();
    for name in file.read_names()? {
        let read = file.read_group(&name)?;
        let mux = read.start_mux()?.to_string();
        read.events_schema()?;
        reads.push((read, mux));
    }

    let mut out = csv::WriterBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_writer(sink);
    let mut summary = RenderSummary::default();
    let mut row: Vec<String> = Vec::new();

    for (read, mux) in reads {
        let table = read.events()?;
        if table.is_empty() {
            debug!("{}: {} has no events", file.path().display(), read.name);
        } else {
            debug!("{}: {} has {} events", file.path().display(), read.name, table.len());
        }

        if *header_pending {
            let header = PREFIX_COLUMNS.iter().copied().chain(table.schema().names());
            out.write_record(header)?;
            *header_pending = false;
            summary.header_written = true;
        }

        for record in table.records() {
            row.clear();
            row.extend([run_label.clone(), channel.channel_number.clone(), mux.clone(), read.name.clone()]);
            row.extend(record.iter().map(Value::to_string));
            out.write_record(&row)?;
        }
        out.flush()?;

        summary.reads += 1;
        summary.rows += table.len();
    }
    Ok(summary)
}
