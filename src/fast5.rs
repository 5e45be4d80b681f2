//! Container reader for ONT **fast5** files (HDF5).
//!
//! A fast5 file keeps run and channel metadata as attributes of two fixed
//! groups and one sub-group per read under the event-detection analysis:
//!
//! ```text
//! /UniqueGlobalKey/tracking_id              attrs: device_id, run_id, ...
//! /UniqueGlobalKey/channel_id               attrs: channel_number, offset, range, digitisation
//! /Analyses/EventDetection_000/Reads/<read> attrs: start_mux, ...
//! /Analyses/EventDetection_000/Reads/<read>/Events   compound table
//! /Analyses/Basecall_{1D,2D}_000/BaseCalled_*/Fastq  base calls (FASTQ text)
//! ```
//!
//! [`Fast5File::open`] fails with [`Fast5Error::NotAContainer`] for anything
//! that is not HDF5; callers treat that as "skip this file". The underlying
//! handle is closed when the [`Fast5File`] is dropped.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use hdf5::{Dataset, Group};
use log::debug;

use crate::error::{Fast5Error, Result};
use crate::table::{self, EventTable, Schema, Value};

pub const TRACKING_ID: &str = "UniqueGlobalKey/tracking_id";
pub const CHANNEL_ID: &str = "UniqueGlobalKey/channel_id";
pub const EVENT_READS: &str = "Analyses/EventDetection_000/Reads";
pub const EVENTS: &str = "Events";
pub const START_MUX: &str = "start_mux";

/// Groups that may hold a base-called `Fastq` dataset, in output order.
pub const BASECALL_GROUPS: &[&str] = &[
    "Analyses/Basecall_1D_000/BaseCalled_template",
    "Analyses/Basecall_1D_000/BaseCalled_complement",
    "Analyses/Basecall_2D_000/BaseCalled_template",
    "Analyses/Basecall_2D_000/BaseCalled_complement",
    "Analyses/Basecall_2D_000/BaseCalled_2D",
];
pub const FASTQ: &str = "Fastq";

/// Attribute name -> decoded value.
pub type Attributes = BTreeMap<String, Value>;

/// `tracking_id` attributes.
#[derive(Clone, Debug)]
pub struct RunMetadata {
    pub device_id: String,
    pub run_id: String,
    pub attributes: Attributes,
}

/// `channel_id` attributes.
///
/// The calibration constants are not applied to any output; event means in
/// current files are already in pA. Should raw samples ever be exported:
/// `pA = (raw + offset) * range / digitisation`.
#[derive(Clone, Debug)]
pub struct ChannelMetadata {
    pub channel_number: String,
    pub offset: Option<f64>,
    pub range: Option<f64>,
    pub digitisation: Option<f64>,
    pub attributes: Attributes,
}

/// One read under the event-detection analysis.
pub struct ReadGroup {
    pub name: String,
    pub attributes: Attributes,
    group: Group,
}

impl ReadGroup {
    /// Mux the read started on; [`Fast5Error::MissingMetadata`] when absent.
    pub fn start_mux(&self) -> Result<&Value> {
        self.attributes
            .get(START_MUX)
            .ok_or_else(|| Fast5Error::MissingMetadata(format!("{EVENT_READS}/{}: {START_MUX}", self.name)))
    }

    fn events_dataset(&self) -> Result<Dataset> {
        self.group
            .dataset(EVENTS)
            .map_err(|_| Fast5Error::MissingMetadata(format!("{EVENT_READS}/{}/{EVENTS}", self.name)))
    }

    /// Column layout of the `Events` table, without loading its records.
    pub fn events_schema(&self) -> Result<Schema> {
        Schema::of(&self.events_dataset()?)
    }

    /// Load the whole `Events` table of this read.
    pub fn events(&self) -> Result<EventTable> {
        EventTable::read(&self.events_dataset()?)
    }
}

/// An open fast5 file, read-only.
pub struct Fast5File {
    path: PathBuf,
    file: hdf5::File,
}

impl Fast5File {
    /// Open `path` read-only as HDF5.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        match hdf5::File::open(&path) {
            Ok(file) => Ok(Self { path, file }),
            Err(e) => Err(Fast5Error::NotAContainer { path, reason: e.to_string() }),
        }
    }

    /// Path the file was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn metadata_group(&self, location: &str) -> Result<Group> {
        self.file
            .group(location)
            .map_err(|_| Fast5Error::MissingMetadata(location.to_string()))
    }

    /// `device_id`, `run_id` and the other `tracking_id` attributes.
    pub fn run_metadata(&self) -> Result<RunMetadata> {
        let attributes = read_attributes(&self.metadata_group(TRACKING_ID)?)?;
        let device_id = required_text(&attributes, TRACKING_ID, "device_id")?;
        let run_id = required_text(&attributes, TRACKING_ID, "run_id")?;
        Ok(RunMetadata { device_id, run_id, attributes })
    }

    /// `channel_number` and calibration constants from `channel_id`.
    pub fn channel_metadata(&self) -> Result<ChannelMetadata> {
        let attributes = read_attributes(&self.metadata_group(CHANNEL_ID)?)?;
        let channel_number = required_text(&attributes, CHANNEL_ID, "channel_number")?;
        let number = |key: &str| attributes.get(key).and_then(Value::as_f64);
        Ok(ChannelMetadata {
            channel_number,
            offset: number("offset"),
            range: number("range"),
            digitisation: number("digitisation"),
            attributes,
        })
    }

    /// Read names under the event-detection analysis, in the library's
    /// iteration order. Files without event detection have none.
    pub fn read_names(&self) -> Result<Vec<String>> {
        match self.file.group(EVENT_READS) {
            Ok(reads) => Ok(reads.member_names()?),
            Err(_) => {
                debug!("{}: no {EVENT_READS} group", self.path.display());
                Ok(Vec::new())
            }
        }
    }

    /// Open the read group `name` and load its attributes.
    pub fn read_group(&self, name: &str) -> Result<ReadGroup> {
        let location = format!("{EVENT_READS}/{name}");
        let group = self
            .file
            .group(&location)
            .map_err(|_| Fast5Error::MissingMetadata(location))?;
        let attributes = read_attributes(&group)?;
        Ok(ReadGroup { name: name.to_string(), attributes, group })
    }

    /// `(group, payload)` for every base-call `Fastq` dataset present.
    pub fn basecall_fastq(&self) -> Result<Vec<(String, String)>> {
        let mut out = Vec::new();
        for location in BASECALL_GROUPS {
            let Ok(group) = self.file.group(location) else { continue };
            let Ok(dataset) = group.dataset(FASTQ) else { continue };
            let payload = table::dataset_value(&dataset, FASTQ)?.to_string();
            out.push((location.to_string(), payload));
        }
        Ok(out)
    }
}

/// Every attribute of `group` that decodes to a scalar. Array or
/// variable-length sequence attributes are left out.
fn read_attributes(group: &Group) -> Result<Attributes> {
    let mut out = Attributes::new();
    for name in group.attr_names()? {
        let attr = group.attr(&name)?;
        match table::attribute_value(&attr, &name) {
            Ok(v) => {
                out.insert(name, v);
            }
            Err(e @ Fast5Error::UnsupportedType { .. }) => debug!("{}: {e}", group.name()),
            Err(e) => return Err(e),
        }
    }
    Ok(out)
}

/// Text form of a mandatory attribute.
fn required_text(attributes: &Attributes, location: &str, key: &str) -> Result<String> {
    attributes
        .get(key)
        .map(Value::to_string)
        .ok_or_else(|| Fast5Error::MissingMetadata(format!("{location}: {key}")))
}
