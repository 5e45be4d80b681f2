//! Error type shared by the container reader, the renderers and the batch driver.

use std::path::PathBuf;

/// Errors raised while extracting data from a fast5 file.
#[derive(Debug, thiserror::Error)]
pub enum Fast5Error {
    /// The file could not be opened as an HDF5 container.
    #[error("{}: not a fast5 container ({reason})", path.display())]
    NotAContainer { path: PathBuf, reason: String },

    /// A fixed group or attribute every instrument file should carry is absent.
    #[error("missing metadata: {0}")]
    MissingMetadata(String),

    /// A table field or attribute whose HDF5 type has no scalar text form.
    #[error("unsupported type for '{field}': {type_name}")]
    UnsupportedType { field: String, type_name: String },

    /// Bad invocation, e.g. a path that is neither a file nor a directory.
    #[error("{0}")]
    Usage(String),

    /// Base-call payload that does not parse as FASTQ.
    #[error("sequence error: {0}")]
    Sequence(String),

    #[error("HDF5 error: {0}")]
    Hdf5(#[from] hdf5::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl Fast5Error {
    /// `true` for failures that only concern the current file; the batch
    /// driver reports them and moves on to the next one.
    pub fn is_skippable(&self) -> bool {
        matches!(
            self,
            Fast5Error::NotAContainer { .. }
                | Fast5Error::MissingMetadata(_)
                | Fast5Error::UnsupportedType { .. }
                | Fast5Error::Sequence(_)
                | Fast5Error::Hdf5(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Fast5Error>;
