//! Synthetic fast5 fixtures shared by the integration tests.
#![allow(dead_code)]

use std::path::Path;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};

use hdf5::types::{FixedAscii, VarLenUnicode};
use hdf5::{Group, H5Type};

static HDF5_LOCK: Mutex<()> = Mutex::new(());

/// Serialise HDF5 access across test threads.
pub fn hdf5_lock() -> MutexGuard<'static, ()> {
    HDF5_LOCK.lock().unwrap_or_else(|e| e.into_inner())
}

/// Event record in the layout MinKNOW event detection writes.
#[derive(H5Type, Clone, Copy, Debug, PartialEq)]
#[repr(C)]
pub struct Event {
    pub start: u64,
    pub length: u32,
    pub mean: f64,
    pub stdv: f32,
}

/// An older, narrower event layout with a signed field.
#[derive(H5Type, Clone, Copy, Debug, PartialEq)]
#[repr(C)]
pub struct LegacyEvent {
    pub mean: f32,
    pub start: f64,
    pub variance: f32,
    pub mv: i8,
}

pub struct ReadSpec<T> {
    pub name: &'static str,
    /// `None` leaves the attribute out.
    pub start_mux: Option<u8>,
    pub events: Vec<T>,
}

pub struct Fast5Spec<T> {
    pub device_id: &'static str,
    pub run_id: &'static str,
    pub channel_number: &'static str,
    pub reads: Vec<ReadSpec<T>>,
    /// `(group below Analyses, FASTQ text)`.
    pub fastq: Vec<(&'static str, &'static str)>,
}

pub fn events(n: usize) -> Vec<Event> {
    (0..n)
        .map(|i| Event {
            start: 18_113 + 7 * i as u64,
            length: 7 + i as u32,
            mean: 86.65937302941176 + i as f64 * 0.1,
            stdv: 1.0437 + i as f32,
        })
        .collect()
}

pub fn simple_spec(reads: Vec<ReadSpec<Event>>) -> Fast5Spec<Event> {
    Fast5Spec {
        device_id: "MN12345",
        run_id: "a1b2c3d4e5f6a7b8c9d0e1f2a3b4c5d6e7f8a9b0",
        channel_number: "117",
        reads,
        fastq: Vec::new(),
    }
}

fn text_attr(group: &Group, name: &str, value: &str) -> hdf5::Result<()> {
    let v = VarLenUnicode::from_str(value).expect("no NULs in fixture text");
    group.new_attr::<VarLenUnicode>().create(name)?.write_scalar(&v)
}

fn fixed_attr(group: &Group, name: &str, value: &str) -> hdf5::Result<()> {
    let v = FixedAscii::<16>::from_ascii(value.as_bytes()).expect("short ascii fixture text");
    group.new_attr::<FixedAscii<16>>().create(name)?.write_scalar(&v)
}

/// Write a fast5 file laid out like MinKNOW output.
pub fn write_fast5<T: H5Type>(path: &Path, spec: &Fast5Spec<T>) -> hdf5::Result<()> {
    let file = hdf5::File::create(path)?;
    let ugk = file.create_group("UniqueGlobalKey")?;

    let tracking = ugk.create_group("tracking_id")?;
    text_attr(&tracking, "device_id", spec.device_id)?;
    text_attr(&tracking, "run_id", spec.run_id)?;
    text_attr(&tracking, "exp_script_purpose", "sequencing_run")?;

    let channel = ugk.create_group("channel_id")?;
    fixed_attr(&channel, "channel_number", spec.channel_number)?;
    channel.new_attr::<f64>().create("digitisation")?.write_scalar(&8192.0f64)?;
    channel.new_attr::<f64>().create("offset")?.write_scalar(&4.0f64)?;
    channel.new_attr::<f64>().create("range")?.write_scalar(&1467.61f64)?;
    channel.new_attr::<f64>().create("sampling_rate")?.write_scalar(&4000.0f64)?;

    let analyses = file.create_group("Analyses")?;
    if !spec.reads.is_empty() {
        let reads = analyses.create_group("EventDetection_000")?.create_group("Reads")?;
        for r in &spec.reads {
            let g = reads.create_group(r.name)?;
            if let Some(mux) = r.start_mux {
                g.new_attr::<u8>().create("start_mux")?.write_scalar(&mux)?;
            }
            g.new_attr::<u32>().create("read_number")?.write_scalar(&1042u32)?;
            let ds = g.new_dataset::<T>().shape(r.events.len()).create("Events")?;
            if !r.events.is_empty() {
                ds.write_raw(r.events.as_slice())?;
            }
        }
    }
    for (location, text) in &spec.fastq {
        let mut prefix = String::from("Analyses");
        for part in location.split('/') {
            prefix.push('/');
            prefix.push_str(part);
            if file.group(&prefix).is_err() {
                file.create_group(&prefix)?;
            }
        }
        let group = file.group(&prefix)?;
        let v = VarLenUnicode::from_str(text).expect("no NULs in fixture text");
        group.new_dataset::<VarLenUnicode>().shape(()).create("Fastq")?.write_scalar(&v)?;
    }
    Ok(())
}

/// Split CSV output into lines.
pub fn lines(out: &[u8]) -> Vec<String> {
    String::from_utf8(out.to_vec()).expect("utf-8 output").lines().map(str::to_string).collect()
}
