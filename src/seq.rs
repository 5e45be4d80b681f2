//! Base-call extraction as **FASTQ** or **FASTA**.
//!
//! Basecallers store each called strand as a complete FASTQ record in a
//! `Fastq` text dataset (see [`crate::fast5::BASECALL_GROUPS`]). The payload
//! is parsed with `needletail` and written back out in the requested format.
//! Files without base calls write nothing.

use std::io::{Cursor, Write};

use log::debug;
use needletail::parse_fastx_reader;

use crate::error::{Fast5Error, Result};
use crate::fast5::Fast5File;

/// Output format for sequence extraction.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SeqFormat {
    Fastq,
    Fasta,
}

/// What one [`render_sequences`] call wrote.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct SequenceSummary {
    /// `Fastq` datasets found in the file.
    pub payloads: usize,
    pub records: usize,
}

/// One four-line FASTQ record.
pub fn write_fastq_record<W: Write>(w: &mut W, id: &[u8], seq: &[u8], qual: &[u8]) -> std::io::Result<()> {
    w.write_all(b"@")?;
    w.write_all(id)?;
    w.write_all(b"\n")?;
    w.write_all(seq)?;
    w.write_all(b"\n+\n")?;
    w.write_all(qual)?;
    w.write_all(b"\n")?;
    Ok(())
}

/// One FASTA record, sequence on a single line.
pub fn write_fasta_record<W: Write>(w: &mut W, id: &[u8], seq: &[u8]) -> std::io::Result<()> {
    w.write_all(b">")?;
    w.write_all(id)?;
    w.write_all(b"\n")?;
    w.write_all(seq)?;
    w.write_all(b"\n")?;
    Ok(())
}

fn sequence_error(location: &str, e: impl std::fmt::Display) -> Fast5Error {
    Fast5Error::Sequence(format!("{location}: {e}"))
}

/// Write every base-called read of `file` to `sink`.
pub fn render_sequences<W: Write>(file: &Fast5File, format: SeqFormat, sink: &mut W) -> Result<SequenceSummary> {
    let mut summary = SequenceSummary::default();
    for (location, payload) in file.basecall_fastq()? {
        summary.payloads += 1;
        if payload.trim().is_empty() {
            debug!("{}: empty {location}", file.path().display());
            continue;
        }
        let mut reader =
            parse_fastx_reader(Cursor::new(payload.into_bytes())).map_err(|e| sequence_error(&location, e))?;
        while let Some(record) = reader.next() {
            let rec = record.map_err(|e| sequence_error(&location, e))?;
            match format {
                SeqFormat::Fastq => {
                    let qual = rec.qual().ok_or_else(|| sequence_error(&location, "record has no quality line"))?;
                    write_fastq_record(sink, rec.id(), &rec.seq(), qual)?;
                }
                SeqFormat::Fasta => write_fasta_record(sink, rec.id(), &rec.seq())?,
            }
            summary.records += 1;
        }
    }
    sink.flush()?;
    Ok(summary)
}
