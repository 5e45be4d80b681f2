//! Run-time schema reflection and decoding for fast5 tables and attributes.
//!
//! Event tables are HDF5 compound datasets whose field list differs between
//! basecaller/MinKNOW versions, so nothing here is tied to a fixed struct:
//! the compound type is turned into an ordered [`Schema`] of
//! `(name, ScalarKind)` pairs, the dataset is read as bytes in that layout,
//! and each record is decoded into [`Value`]s.
//!
//! ### Text form
//! [`Value`]'s `Display` is the canonical CSV text: integers in decimal,
//! floats as the shortest string that round-trips to the same bit pattern
//! (`0.1f32` prints `0.1`, not `0.10000000149011612`), booleans as
//! `true`/`false`, text verbatim.
//!
//! # Examples
//! ```
//! use fast5dump::table::{ScalarKind, Value};
//! let v = ScalarKind::Float(4).decode(&0.25f32.to_ne_bytes()).unwrap();
//! assert_eq!(v, Value::F32(0.25));
//! assert_eq!(v.to_string(), "0.25");
//! ```

use core::fmt;

use hdf5::types::{FloatSize, IntSize, TypeDescriptor, VarLenAscii, VarLenUnicode};
use hdf5::{Attribute, Container, Dataset, Datatype};
use hdf5_sys::h5a::H5Aread;
use hdf5_sys::h5d::H5Dread;
use hdf5_sys::h5p::H5P_DEFAULT;
use hdf5_sys::h5s::H5S_ALL;

use log::debug;

use crate::error::{Fast5Error, Result};

/// A decoded scalar taken from a table cell or an attribute.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Int(i64),
    UInt(u64),
    F32(f32),
    F64(f64),
    Bool(bool),
    Text(String),
}

impl Value {
    /// Numeric view, used for calibration constants.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::Int(v) => Some(v as f64),
            Value::UInt(v) => Some(v as f64),
            Value::F32(v) => Some(v as f64),
            Value::F64(v) => Some(v),
            Value::Bool(_) => None,
            Value::Text(ref s) => s.trim().parse().ok(),
        }
    }
}

fn write_float<T>(f: &mut fmt::Formatter<'_>, v: T) -> fmt::Result
where
    T: fmt::Debug + Into<f64> + Copy,
{
    let wide: f64 = v.into();
    if wide.is_nan() {
        f.write_str("nan")
    } else if wide.is_infinite() {
        f.write_str(if wide > 0.0 { "inf" } else { "-inf" })
    } else {
        // Debug is the shortest round-trip form and keeps a trailing `.0`.
        write!(f, "{v:?}")
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::UInt(v) => write!(f, "{v}"),
            Value::F32(v) => write_float(f, *v),
            Value::F64(v) => write_float(f, *v),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Text(s) => f.write_str(s),
        }
    }
}

/// Storage class of one fixed-size scalar; the number is its width in bytes
/// (for `Text`, the fixed string length).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ScalarKind {
    Int(usize),
    UInt(usize),
    Float(usize),
    Bool,
    Text(usize),
}

fn int_width(size: IntSize) -> usize {
    match size {
        IntSize::U1 => 1,
        IntSize::U2 => 2,
        IntSize::U4 => 4,
        IntSize::U8 => 8,
    }
}

fn unsupported(field: &str, ty: &TypeDescriptor) -> Fast5Error {
    Fast5Error::UnsupportedType { field: field.to_string(), type_name: format!("{ty:?}") }
}

fn array<const N: usize>(bytes: &[u8]) -> Option<[u8; N]> {
    bytes.get(..N)?.try_into().ok()
}

impl ScalarKind {
    /// Map an HDF5 type onto a scalar kind. Enums decode as their underlying
    /// integer; variable-length and nested types are rejected.
    pub fn from_descriptor(field: &str, ty: &TypeDescriptor) -> Result<Self> {
        let kind = match ty {
            TypeDescriptor::Integer(s) => ScalarKind::Int(int_width(*s)),
            TypeDescriptor::Unsigned(s) => ScalarKind::UInt(int_width(*s)),
            TypeDescriptor::Float(FloatSize::U4) => ScalarKind::Float(4),
            TypeDescriptor::Float(FloatSize::U8) => ScalarKind::Float(8),
            TypeDescriptor::Boolean => ScalarKind::Bool,
            TypeDescriptor::Enum(e) if e.signed => ScalarKind::Int(int_width(e.size)),
            TypeDescriptor::Enum(e) => ScalarKind::UInt(int_width(e.size)),
            TypeDescriptor::FixedAscii(n) | TypeDescriptor::FixedUnicode(n) => ScalarKind::Text(*n),
            other => return Err(unsupported(field, other)),
        };
        Ok(kind)
    }

    /// Decode one native-endian value from the start of `bytes`.
    ///
    /// Returns `None` when `bytes` is shorter than the kind's width or the
    /// width is not one HDF5 produces for that class.
    pub fn decode(&self, bytes: &[u8]) -> Option<Value> {
        let v = match *self {
            ScalarKind::Int(1) => Value::Int(i8::from_ne_bytes(array(bytes)?) as i64),
            ScalarKind::Int(2) => Value::Int(i16::from_ne_bytes(array(bytes)?) as i64),
            ScalarKind::Int(4) => Value::Int(i32::from_ne_bytes(array(bytes)?) as i64),
            ScalarKind::Int(8) => Value::Int(i64::from_ne_bytes(array(bytes)?)),
            ScalarKind::UInt(1) => Value::UInt(u8::from_ne_bytes(array(bytes)?) as u64),
            ScalarKind::UInt(2) => Value::UInt(u16::from_ne_bytes(array(bytes)?) as u64),
            ScalarKind::UInt(4) => Value::UInt(u32::from_ne_bytes(array(bytes)?) as u64),
            ScalarKind::UInt(8) => Value::UInt(u64::from_ne_bytes(array(bytes)?)),
            ScalarKind::Float(4) => Value::F32(f32::from_ne_bytes(array(bytes)?)),
            ScalarKind::Float(8) => Value::F64(f64::from_ne_bytes(array(bytes)?)),
            ScalarKind::Bool => Value::Bool(*bytes.first()? != 0),
            ScalarKind::Text(n) => {
                let raw = bytes.get(..n)?;
                let end = raw.iter().position(|&b| b == 0).unwrap_or(n);
                Value::Text(String::from_utf8_lossy(&raw[..end]).into_owned())
            }
            _ => return None,
        };
        Some(v)
    }
}

/// One named column of a compound table.
#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    pub name: String,
    pub kind: ScalarKind,
    /// Byte offset of the field inside one record.
    pub offset: usize,
}

/// Ordered field list of a compound table, in declaration order.
#[derive(Clone, Debug, PartialEq)]
pub struct Schema {
    fields: Vec<Field>,
    record_size: usize,
}

impl Schema {
    /// Build from explicit fields; `record_size` is the byte stride between records.
    pub fn new(fields: Vec<Field>, record_size: usize) -> Self {
        Self { fields, record_size }
    }

    /// Reflect a compound type. Fields keep the member index order of the
    /// type, which is the order HDF5 tools list them in.
    pub fn from_descriptor(table: &str, desc: &TypeDescriptor) -> Result<Self> {
        let TypeDescriptor::Compound(compound) = desc else {
            return Err(unsupported(table, desc));
        };
        let mut members: Vec<_> = compound.fields.iter().collect();
        members.sort_by_key(|f| f.index);
        let fields = members
            .into_iter()
            .map(|f| {
                Ok(Field {
                    name: f.name.clone(),
                    kind: ScalarKind::from_descriptor(&f.name, &f.ty)?,
                    offset: f.offset,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { fields, record_size: compound.size })
    }

    /// Reflect the element type of `dataset` without reading any records.
    pub fn of(dataset: &Dataset) -> Result<Self> {
        let desc = dataset.dtype()?.to_descriptor()?;
        Self::from_descriptor(&dataset.name(), &desc)
    }

    /// Column names in order; these follow the prefix columns of the CSV header.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Split `bytes` into records and decode every field.
    pub fn decode_records(&self, bytes: &[u8]) -> Result<Vec<Vec<Value>>> {
        if self.record_size == 0 {
            return Ok(Vec::new());
        }
        bytes
            .chunks_exact(self.record_size)
            .map(|record| {
                self.fields
                    .iter()
                    .map(|f| {
                        record
                            .get(f.offset..)
                            .and_then(|b| f.kind.decode(b))
                            .ok_or_else(|| Fast5Error::UnsupportedType {
                                field: f.name.clone(),
                                type_name: format!("{:?} at offset {}", f.kind, f.offset),
                            })
                    })
                    .collect()
            })
            .collect()
    }
}

/// A structured table read fully into memory.
#[derive(Clone, Debug)]
pub struct EventTable {
    schema: Schema,
    records: Vec<Vec<Value>>,
}

impl EventTable {
    /// Read schema and every record of a compound dataset.
    pub fn read(dataset: &Dataset) -> Result<Self> {
        let desc = dataset.dtype()?.to_descriptor()?;
        let schema = Schema::from_descriptor(&dataset.name(), &desc)?;
        debug!("{}: {} fields, {} bytes per record", dataset.name(), schema.fields.len(), schema.record_size);
        let bytes = read_bytes(Source::Dataset(dataset), &desc)?;
        let records = schema.decode_records(&bytes)?;
        Ok(Self { schema, records })
    }

    /// Schema the records were decoded with.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Decoded rows, one value per schema field.
    pub fn records(&self) -> &[Vec<Value>] {
        &self.records
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// `true` for a table with no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[derive(Clone, Copy)]
enum Source<'a> {
    Dataset(&'a Dataset),
    Attribute(&'a Attribute),
}

impl Source<'_> {
    fn container(&self) -> &Container {
        match *self {
            Source::Dataset(d) => d,
            Source::Attribute(a) => a,
        }
    }
}

/// Read every element of `source` into a byte buffer laid out as `desc`
/// (native byte order, offsets as in `desc`).
#[allow(unsafe_code)]
fn read_bytes(source: Source<'_>, desc: &TypeDescriptor) -> Result<Vec<u8>> {
    let mem_type = Datatype::from_descriptor(desc)?;
    let mut buf = vec![0u8; source.container().size() * mem_type.size()];
    if buf.is_empty() {
        return Ok(buf);
    }
    let ptr = buf.as_mut_ptr().cast();
    // SAFETY: `buf` holds exactly `size()` elements of `mem_type`. Callers only
    // pass descriptors accepted by `ScalarKind`/`Schema`, which have no
    // variable-length members, so the library neither writes past the buffer
    // nor stores heap pointers in it.
    let status = unsafe {
        match source {
            Source::Dataset(d) => H5Dread(d.id(), mem_type.id(), H5S_ALL, H5S_ALL, H5P_DEFAULT, ptr),
            Source::Attribute(a) => H5Aread(a.id(), mem_type.id(), ptr),
        }
    };
    if status < 0 {
        return Err(Fast5Error::Hdf5(hdf5::Error::Internal(format!(
            "raw read of {} failed",
            source.container().name()
        ))));
    }
    Ok(buf)
}

fn scalar_value(source: Source<'_>, name: &str) -> Result<Value> {
    let desc = source.container().dtype()?.to_descriptor()?;
    let missing = || Fast5Error::MissingMetadata(format!("'{name}' holds no value"));
    match desc {
        TypeDescriptor::VarLenUnicode => {
            let v = source.container().read_raw::<VarLenUnicode>()?;
            v.first().map(|s| Value::Text(s.as_str().to_string())).ok_or_else(missing)
        }
        TypeDescriptor::VarLenAscii => {
            let v = source.container().read_raw::<VarLenAscii>()?;
            v.first().map(|s| Value::Text(s.as_str().to_string())).ok_or_else(missing)
        }
        other => {
            let kind = ScalarKind::from_descriptor(name, &other)?;
            let bytes = read_bytes(source, &other)?;
            if bytes.is_empty() {
                return Err(missing());
            }
            kind.decode(&bytes).ok_or_else(|| unsupported(name, &other))
        }
    }
}

/// First element of an attribute, whatever its storage type.
pub fn attribute_value(attr: &Attribute, name: &str) -> Result<Value> {
    scalar_value(Source::Attribute(attr), name)
}

/// First element of a scalar dataset, whatever its storage type.
pub fn dataset_value(dataset: &Dataset, name: &str) -> Result<Value> {
    scalar_value(Source::Dataset(dataset), name)
}
