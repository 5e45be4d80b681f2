#![deny(unsafe_code)]
//! # fast5dump
//!
//! Extract **event tables** and **base calls** from Oxford Nanopore *fast5*
//! files (HDF5 containers) as delimited text for downstream analysis.
//!
//! ## Highlights
//! - 🧬 **Schema-driven**: event columns are discovered from each table's
//!   compound type at run time; nothing is tied to one MinKNOW version.
//! - 🎯 **Lossless text**: every value is written in its shortest
//!   round-trip form, so no digits are lost on the way to CSV.
//! - 📂 **Batch friendly**: walk a directory tree, skip files that are not
//!   fast5 or lack metadata, report progress on stderr.
//!
//! ## Layout
//! - [`fast5`]: container reader (fixed metadata groups, per-read groups).
//! - [`table`]: schema reflection and value decoding.
//! - [`render`]: event tables as CSV.
//! - [`seq`]: base calls as FASTQ/FASTA.
//! - [`batch`]: files, directories, header state and progress.
//!
//! ## Examples
//! ```no_run
//! use fast5dump::{Fast5File, render};
//! let f = Fast5File::open("read_1042.fast5").unwrap();
//! let mut header_pending = true;
//! let s = render::render_events(&f, &mut header_pending, &mut std::io::stdout().lock()).unwrap();
//! eprintln!("{} rows from {} reads", s.rows, s.reads);
//! ```

pub mod error;
pub mod table;
pub mod fast5;
pub mod render;
pub mod seq;
pub mod batch;

pub use batch::{DataKind, ExtractOptions, DEFAULT_SUFFIX};
pub use error::{Fast5Error, Result};
pub use fast5::Fast5File;

/// Crate version string (from `CARGO_PKG_VERSION`).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
