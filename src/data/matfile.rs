//! MATLAB level-5 MAT-file codec.
//!
//! Layout of a level-5 file:
//! ```text
//!  ┌────────────────────────────┐
//!  │ 128-byte header            │  116 text | 8 subsys | u16 version | "IM"/"MI"
//!  ├────────────────────────────┤
//!  │ data element               │  tag (type, nbytes) + payload
//!  │   miMATRIX                 │  flags | dims | name | real part
//!  │   miCOMPRESSED             │  zlib stream holding one miMATRIX
//!  ├────────────────────────────┤
//!  │ ...                        │
//!  └────────────────────────────┘
//! ```
//! Only numeric (non-complex, non-sparse) matrices are decoded; every other
//! class is skipped.

use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use log::debug;

use super::model::{element_count, ElementType, NamedArray};
use crate::error::{AnalysisError, Result};

const HEADER_LEN: usize = 128;
const HEADER_TEXT_LEN: usize = 116;

// Data element types.
const MI_INT8: u32 = 1;
const MI_UINT8: u32 = 2;
const MI_INT16: u32 = 3;
const MI_UINT16: u32 = 4;
const MI_INT32: u32 = 5;
const MI_UINT32: u32 = 6;
const MI_SINGLE: u32 = 7;
const MI_DOUBLE: u32 = 9;
const MI_INT64: u32 = 12;
const MI_UINT64: u32 = 13;
const MI_MATRIX: u32 = 14;
const MI_COMPRESSED: u32 = 15;

// Array classes.
const MX_DOUBLE: u8 = 6;
const MX_SINGLE: u8 = 7;
const MX_INT8: u8 = 8;
const MX_UINT8: u8 = 9;
const MX_INT16: u8 = 10;
const MX_UINT16: u8 = 11;
const MX_INT32: u8 = 12;
const MX_UINT32: u8 = 13;
const MX_INT64: u8 = 14;
const MX_UINT64: u8 = 15;

const FLAG_COMPLEX: u8 = 0x08;
const FLAG_LOGICAL: u8 = 0x02;

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Endian {
    Little,
    Big,
}

/// Bounds-checked cursor over an in-memory buffer.
struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
    endian: Endian,
}

impl<'a> Cursor<'a> {
    fn new(buf: &'a [u8], endian: Endian) -> Self {
        Cursor { buf, pos: 0, endian }
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.remaining() {
            return Err(AnalysisError::MalformedContainer(format!(
                "element of {n} bytes at offset {} runs past end of data",
                self.pos
            )));
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    fn skip_padding(&mut self) {
        let aligned = (self.pos + 7) & !7;
        self.pos = aligned.min(self.buf.len());
    }

    fn u32(&mut self) -> Result<u32> {
        let b: [u8; 4] = self.take(4)?.try_into().map_err(|_| truncated())?;
        Ok(match self.endian {
            Endian::Little => u32::from_le_bytes(b),
            Endian::Big => u32::from_be_bytes(b),
        })
    }

    /// Read a tag, returning `(type, nbytes, small)`. Small elements pack the
    /// size into the upper half of the first word and the payload into the
    /// second.
    fn tag(&mut self) -> Result<(u32, usize, bool)> {
        let first = self.u32()?;
        let upper = first >> 16;
        if upper != 0 {
            Ok((first & 0xFFFF, upper as usize, true))
        } else {
            let nbytes = self.u32()? as usize;
            Ok((first, nbytes, false))
        }
    }

    /// Read one sub-element of a matrix, consuming its padding.
    fn sub_element(&mut self) -> Result<(u32, &'a [u8])> {
        let (ty, nbytes, small) = self.tag()?;
        if small {
            if nbytes > 4 {
                return Err(AnalysisError::MalformedContainer(format!(
                    "small data element claims {nbytes} bytes"
                )));
            }
            let word = self.take(4)?;
            Ok((ty, &word[..nbytes]))
        } else {
            let data = self.take(nbytes)?;
            self.skip_padding();
            Ok((ty, data))
        }
    }
}

fn truncated() -> AnalysisError {
    AnalysisError::MalformedContainer("truncated data".into())
}

/// Check the 128-byte header and return the file's byte order.
fn read_header(buf: &[u8]) -> Result<Endian> {
    if buf.len() >= 512 && &buf[512..516.min(buf.len())] == b"\x89HDF" {
        return Err(AnalysisError::UnsupportedFormat(
            "MAT-file v7.3 (HDF5) containers are not supported".into(),
        ));
    }
    if buf.len() < HEADER_LEN {
        return Err(AnalysisError::MalformedContainer(format!(
            "file is {} bytes, shorter than the {HEADER_LEN}-byte header",
            buf.len()
        )));
    }
    if buf[..4].iter().all(|&b| b == 0) {
        return Err(AnalysisError::UnsupportedFormat(
            "level-4 MAT-files are not supported".into(),
        ));
    }
    match &buf[126..128] {
        b"IM" => Ok(Endian::Little),
        b"MI" => Ok(Endian::Big),
        other => Err(AnalysisError::MalformedContainer(format!(
            "bad endian indicator {other:?}"
        ))),
    }
}

/// Header text with trailing padding removed.
pub fn header_text(buf: &[u8]) -> String {
    let end = buf.len().min(HEADER_TEXT_LEN);
    String::from_utf8_lossy(&buf[..end])
        .trim_end_matches(&['\0', ' '][..])
        .to_string()
}

/// Decode every supported numeric variable of a level-5 MAT-file, in file
/// order. Unsupported classes are skipped.
pub fn parse(buf: &[u8]) -> Result<Vec<NamedArray>> {
    let endian = read_header(buf)?;
    let mut cursor = Cursor::new(buf, endian);
    cursor.pos = HEADER_LEN;

    let mut arrays = Vec::new();
    while cursor.remaining() >= 8 {
        let (ty, nbytes, small) = cursor.tag()?;
        if small {
            // Small elements at top level carry no variables.
            cursor.take(4)?;
            continue;
        }
        let payload = cursor.take(nbytes)?;
        let parsed = match ty {
            MI_MATRIX => parse_matrix(payload, endian)?,
            MI_COMPRESSED => {
                let inflated = inflate(payload)?;
                let mut inner = Cursor::new(&inflated, endian);
                let (inner_ty, inner_len, _) = inner.tag()?;
                if inner_ty != MI_MATRIX {
                    debug!("skipping compressed element of type {inner_ty}");
                    None
                } else {
                    let body = inner.take(inner_len)?;
                    parse_matrix(body, endian)?
                }
            }
            other => {
                debug!("skipping top-level element of type {other}");
                None
            }
        };
        if let Some(array) = parsed {
            arrays.push(array);
        }
        // Uncompressed matrices are padded to 8 bytes, compressed ones are not.
        if ty == MI_MATRIX {
            cursor.skip_padding();
        }
    }
    Ok(arrays)
}

fn inflate(payload: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    ZlibDecoder::new(payload)
        .read_to_end(&mut out)
        .map_err(|e| AnalysisError::MalformedContainer(format!("zlib stream: {e}")))?;
    Ok(out)
}

/// Decode the body of one `miMATRIX` element. Returns `None` for classes
/// this reader does not handle.
fn parse_matrix(body: &[u8], endian: Endian) -> Result<Option<NamedArray>> {
    if body.is_empty() {
        // Empty placeholder matrices are legal and carry nothing.
        return Ok(None);
    }
    let mut cur = Cursor::new(body, endian);

    let (flags_ty, flags) = cur.sub_element()?;
    if flags_ty != MI_UINT32 || flags.len() < 4 {
        return Err(AnalysisError::MalformedContainer(
            "matrix is missing its array-flags sub-element".into(),
        ));
    }
    let flag_word = read_u32(&flags[..4], endian);
    let class = (flag_word & 0xFF) as u8;
    let flag_bits = ((flag_word >> 8) & 0xFF) as u8;

    let (dims_ty, dims_raw) = cur.sub_element()?;
    if dims_ty != MI_INT32 {
        return Err(AnalysisError::MalformedContainer(
            "matrix is missing its dimensions sub-element".into(),
        ));
    }
    let dims: Vec<usize> = dims_raw
        .chunks_exact(4)
        .map(|c| read_u32(c, endian) as usize)
        .collect();
    if element_count(&dims).is_none() {
        return Err(AnalysisError::MalformedContainer(format!(
            "dimensions {dims:?} overflow the addressable element count"
        )));
    }

    let (_, name_raw) = cur.sub_element()?;
    let name = String::from_utf8_lossy(name_raw)
        .trim_end_matches('\0')
        .to_string();

    let Some(element_type) = class_to_element_type(class, flag_bits) else {
        debug!("skipping '{name}': unsupported array class {class}");
        return Ok(None);
    };
    if flag_bits & FLAG_COMPLEX != 0 {
        debug!("skipping '{name}': complex arrays are not supported");
        return Ok(None);
    }

    let (data_ty, data_raw) = cur.sub_element()?;
    if !widens_exactly(data_ty, data_raw, endian) {
        return Err(AnalysisError::SchemaMismatch(format!(
            "'{name}' holds 64-bit integers beyond 2^53 that cannot be compared exactly"
        )));
    }
    let values = decode_numeric(data_ty, data_raw, endian).ok_or_else(|| {
        AnalysisError::MalformedContainer(format!(
            "'{name}': unsupported numeric storage type {data_ty}"
        ))
    })?;

    NamedArray::new(name, dims, element_type, values).map(Some)
}

fn class_to_element_type(class: u8, flag_bits: u8) -> Option<ElementType> {
    let ty = match class {
        MX_DOUBLE => ElementType::Float64,
        MX_SINGLE => ElementType::Float32,
        MX_INT8 => ElementType::Int8,
        MX_UINT8 => ElementType::UInt8,
        MX_INT16 => ElementType::Int16,
        MX_UINT16 => ElementType::UInt16,
        MX_INT32 => ElementType::Int32,
        MX_UINT32 => ElementType::UInt32,
        MX_INT64 => ElementType::Int64,
        MX_UINT64 => ElementType::UInt64,
        _ => return None,
    };
    if flag_bits & FLAG_LOGICAL != 0 {
        Some(ElementType::Bool)
    } else {
        Some(ty)
    }
}

fn read_u32(b: &[u8], endian: Endian) -> u32 {
    let v = [b[0], b[1], b[2], b[3]];
    match endian {
        Endian::Little => u32::from_le_bytes(v),
        Endian::Big => u32::from_be_bytes(v),
    }
}

/// Integers of larger magnitude lose precision when widened to `f64`.
const MAX_EXACT_INT: u64 = 1 << 53;

/// Whether every 64-bit integer of the payload survives widening to `f64`.
fn widens_exactly(ty: u32, raw: &[u8], endian: Endian) -> bool {
    let read = |c: &[u8]| {
        let b = [c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]];
        match endian {
            Endian::Little => u64::from_le_bytes(b),
            Endian::Big => u64::from_be_bytes(b),
        }
    };
    match ty {
        MI_INT64 => raw
            .chunks_exact(8)
            .all(|c| (read(c) as i64).unsigned_abs() <= MAX_EXACT_INT),
        MI_UINT64 => raw.chunks_exact(8).all(|c| read(c) <= MAX_EXACT_INT),
        _ => true,
    }
}

/// Widen a numeric payload of any storage type to `f64`.
fn decode_numeric(ty: u32, raw: &[u8], endian: Endian) -> Option<Vec<f64>> {
    macro_rules! widen {
        ($t:ty, $n:expr) => {
            raw.chunks_exact($n)
                .map(|c| {
                    let b: [u8; $n] = c.try_into().unwrap_or([0; $n]);
                    let v = match endian {
                        Endian::Little => <$t>::from_le_bytes(b),
                        Endian::Big => <$t>::from_be_bytes(b),
                    };
                    v as f64
                })
                .collect()
        };
    }
    let values = match ty {
        MI_INT8 => widen!(i8, 1),
        MI_UINT8 => widen!(u8, 1),
        MI_INT16 => widen!(i16, 2),
        MI_UINT16 => widen!(u16, 2),
        MI_INT32 => widen!(i32, 4),
        MI_UINT32 => widen!(u32, 4),
        MI_SINGLE => widen!(f32, 4),
        MI_DOUBLE => widen!(f64, 8),
        MI_INT64 => widen!(i64, 8),
        MI_UINT64 => widen!(u64, 8),
        _ => return None,
    };
    Some(values)
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

/// Encode arrays as a little-endian level-5 MAT-file. With `compress` every
/// variable is wrapped in an `miCOMPRESSED` element, as MATLAB's default
/// `save` does.
pub fn encode<'a, I>(arrays: I, compress: bool) -> Result<Vec<u8>>
where
    I: IntoIterator<Item = &'a NamedArray>,
{
    let mut out = Vec::new();
    let mut text = format!(
        "MATLAB 5.0 MAT-file, Platform: {}, Created by: emg-inspector",
        std::env::consts::OS
    )
    .into_bytes();
    text.resize(HEADER_TEXT_LEN, b' ');
    out.extend_from_slice(&text);
    out.extend_from_slice(&[0u8; 8]);
    out.extend_from_slice(&0x0100u16.to_le_bytes());
    out.extend_from_slice(b"IM");

    for array in arrays {
        let matrix = encode_matrix(array)?;
        if compress {
            let compressed = deflate(&matrix)?;
            out.extend_from_slice(&MI_COMPRESSED.to_le_bytes());
            out.extend_from_slice(&(compressed.len() as u32).to_le_bytes());
            out.extend_from_slice(&compressed);
        } else {
            out.extend_from_slice(&matrix);
        }
    }
    Ok(out)
}

fn deflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| AnalysisError::MalformedContainer(format!("zlib: {e}")))?;
    encoder
        .finish()
        .map_err(|e| AnalysisError::MalformedContainer(format!("zlib: {e}")))
}

/// A complete `miMATRIX` element (tag included).
fn encode_matrix(array: &NamedArray) -> Result<Vec<u8>> {
    let (class, flag_bits) = element_type_to_class(array.element_type);
    let mut body = Vec::new();

    let mut flags = Vec::with_capacity(8);
    flags.extend_from_slice(&(u32::from(class) | (u32::from(flag_bits) << 8)).to_le_bytes());
    flags.extend_from_slice(&0u32.to_le_bytes());
    write_element(&mut body, MI_UINT32, &flags);

    let mut dims = Vec::with_capacity(array.dims.len() * 4);
    for &d in &array.dims {
        let d = i32::try_from(d).map_err(|_| {
            AnalysisError::SchemaMismatch(format!("dimension {d} of '{}' is too large", array.name))
        })?;
        dims.extend_from_slice(&d.to_le_bytes());
    }
    write_element(&mut body, MI_INT32, &dims);

    write_element(&mut body, MI_INT8, array.name.as_bytes());

    let (data_ty, data) = encode_values(array.element_type, array.values());
    write_element(&mut body, data_ty, &data);

    let mut element = Vec::with_capacity(body.len() + 8);
    element.extend_from_slice(&MI_MATRIX.to_le_bytes());
    element.extend_from_slice(&(body.len() as u32).to_le_bytes());
    element.extend_from_slice(&body);
    Ok(element)
}

fn write_element(out: &mut Vec<u8>, ty: u32, data: &[u8]) {
    out.extend_from_slice(&ty.to_le_bytes());
    out.extend_from_slice(&(data.len() as u32).to_le_bytes());
    out.extend_from_slice(data);
    let padded = (out.len() + 7) & !7;
    out.resize(padded, 0);
}

fn element_type_to_class(ty: ElementType) -> (u8, u8) {
    match ty {
        ElementType::Float64 => (MX_DOUBLE, 0),
        ElementType::Float32 => (MX_SINGLE, 0),
        ElementType::Int8 => (MX_INT8, 0),
        ElementType::UInt8 => (MX_UINT8, 0),
        ElementType::Int16 => (MX_INT16, 0),
        ElementType::UInt16 => (MX_UINT16, 0),
        ElementType::Int32 => (MX_INT32, 0),
        ElementType::UInt32 => (MX_UINT32, 0),
        ElementType::Int64 => (MX_INT64, 0),
        ElementType::UInt64 => (MX_UINT64, 0),
        ElementType::Bool => (MX_UINT8, FLAG_LOGICAL),
    }
}

/// Narrow `f64` values back to the storage type of the array class.
fn encode_values(ty: ElementType, values: &[f64]) -> (u32, Vec<u8>) {
    macro_rules! narrow {
        ($t:ty) => {
            values
                .iter()
                .flat_map(|&v| (v as $t).to_le_bytes())
                .collect()
        };
    }
    match ty {
        ElementType::Float64 => (MI_DOUBLE, narrow!(f64)),
        ElementType::Float32 => (MI_SINGLE, narrow!(f32)),
        ElementType::Int8 => (MI_INT8, narrow!(i8)),
        ElementType::UInt8 | ElementType::Bool => (MI_UINT8, narrow!(u8)),
        ElementType::Int16 => (MI_INT16, narrow!(i16)),
        ElementType::UInt16 => (MI_UINT16, narrow!(u16)),
        ElementType::Int32 => (MI_INT32, narrow!(i32)),
        ElementType::UInt32 => (MI_UINT32, narrow!(u32)),
        ElementType::Int64 => (MI_INT64, narrow!(i64)),
        ElementType::UInt64 => (MI_UINT64, narrow!(u64)),
    }
}
