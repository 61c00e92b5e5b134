//! Binary serialization of arrays in any encoding.
//!
//! ## Stream layout
//!
//! Every array is one section, written recursively, all integers little-endian:
//!
//! ```text
//! [dtype descriptor][encoding tag: u8][buffer count: u32]
//! [per buffer: length: u64, bytes]...
//! [child sections]...
//! ```
//!
//! Buffer 0 holds the encoding metadata, starting with the element count (u64):
//!
//! | Encoding | Metadata after the length | Buffers after metadata | Children |
//! |----------|---------------------------|------------------------|----------|
//! | Null | - | - | - |
//! | Primitive | has validity (u8) | values, validity? | - |
//! | VarBin | offset width (u8), has validity (u8) | offsets, bytes, validity? | - |
//! | Bool | has validity (u8) | bits, validity? | - |
//! | Struct | has validity (u8) | validity? | one per field |
//! | Chunked | chunk count (u32) | - | one per chunk |
//! | RunEnd | offset (u64) | - | ends, values |
//! | RoaringBool | offset (u64) | portable bitmap | - |
//! | RoaringInt | offset (u64) | portable bitmap | - |
//! | ZigZag | - | - | encoded |
//!
//! The dtype descriptor is a tag (0 null, 1 bool, 2 int, 3 float, 4 utf8,
//! 5 binary, 6 struct), a nullability byte, then for int the bit width and a
//! signed byte, for float the bit width, and for struct a u32 field count followed
//! by each field's u32 name length, UTF-8 name and descriptor.
//!
//! Sliced bitmaps and offsets are re-based to zero on write. Sections and dtypes
//! nest at most [`MAX_NESTING_DEPTH`] levels, on both sides. Arrays are never
//! decompressed by the writer, so a round trip preserves the encoding.
//!
//! # Example
//! ```
//! use stratum::{serialize, Array, PrimitiveArray};
//!
//! let array = Array::from(PrimitiveArray::from_vec(vec![1u32, 2, 3]));
//! let bytes = serialize::to_bytes(&array).unwrap();
//! let read = serialize::from_bytes(array.dtype(), &bytes).unwrap();
//! assert_eq!(read, array);
//! ```

use std::io::{ErrorKind, Read, Write};

use bytes::Bytes;
use croaring::{Bitmap, Portable};
use tracing::trace;

use crate::array::{
    Array, BoolArray, ChunkedArray, EncodingId, NullArray, OffsetWidth, PrimitiveArray,
    StructArray, VarBinArray,
};
use crate::bitpack::BitBuffer;
use crate::dtype::{DType, Field, FloatWidth, IntWidth, Nullability, Signedness};
use crate::encodings::{RoaringBoolArray, RoaringIntArray, RunEndArray, ZigZagArray};
use crate::error::StratumError;
use crate::Result;

/// Sections nested deeper than this are rejected as corrupt.
pub const MAX_NESTING_DEPTH: usize = 64;

const DTYPE_NULL: u8 = 0;
const DTYPE_BOOL: u8 = 1;
const DTYPE_INT: u8 = 2;
const DTYPE_FLOAT: u8 = 3;
const DTYPE_UTF8: u8 = 4;
const DTYPE_BINARY: u8 = 5;
const DTYPE_STRUCT: u8 = 6;

/// Write `array` as one self-describing section.
///
/// Arrays or dtypes nested deeper than [`MAX_NESTING_DEPTH`] fail with
/// [`StratumError::InvalidArgument`] before anything reaches `sink`.
pub fn write<W: Write>(array: &Array, sink: &mut W) -> Result<()> {
    let mut out = Vec::new();
    write_section(array, &mut out, 0)?;
    sink.write_all(&out)?;
    Ok(())
}

/// Read one section, failing with [`StratumError::DTypeMismatch`] if its dtype is
/// not `expected` and [`StratumError::CorruptEncoding`] if it is malformed.
pub fn read<R: Read>(expected: &DType, source: &mut R) -> Result<Array> {
    let actual = read_dtype(source, 0).map_err(StratumError::into_corrupt)?;
    if &actual != expected {
        return Err(StratumError::DTypeMismatch {
            expected: expected.clone(),
            actual,
        });
    }
    read_body(actual, source, 0).map_err(StratumError::into_corrupt)
}

/// Serialize into a new byte vector.
pub fn to_bytes(array: &Array) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    write_section(array, &mut out, 0)?;
    Ok(out)
}

/// Deserialize from a byte slice that must hold exactly one section.
pub fn from_bytes(expected: &DType, bytes: &[u8]) -> Result<Array> {
    let mut cursor = bytes;
    let array = read(expected, &mut cursor)?;
    if !cursor.is_empty() {
        return Err(StratumError::CorruptEncoding(format!(
            "{} trailing bytes after the array",
            cursor.len()
        )));
    }
    Ok(array)
}

fn write_dtype<W: Write>(dtype: &DType, w: &mut W, depth: usize) -> Result<()> {
    check_write_depth(depth)?;
    let nullable = u8::from(dtype.is_nullable());
    match dtype {
        DType::Null => w.write_all(&[DTYPE_NULL, nullable])?,
        DType::Bool(_) => w.write_all(&[DTYPE_BOOL, nullable])?,
        DType::Int(width, signedness, _) => w.write_all(&[
            DTYPE_INT,
            nullable,
            width.bits(),
            u8::from(*signedness == Signedness::Signed),
        ])?,
        DType::Float(width, _) => w.write_all(&[DTYPE_FLOAT, nullable, width.bits()])?,
        DType::Utf8(_) => w.write_all(&[DTYPE_UTF8, nullable])?,
        DType::Binary(_) => w.write_all(&[DTYPE_BINARY, nullable])?,
        DType::Struct(fields, _) => {
            w.write_all(&[DTYPE_STRUCT, nullable])?;
            w.write_all(&(fields.len() as u32).to_le_bytes())?;
            for field in fields.iter() {
                w.write_all(&(field.name.len() as u32).to_le_bytes())?;
                w.write_all(field.name.as_bytes())?;
                write_dtype(&field.dtype, w, depth + 1)?;
            }
        }
    }
    Ok(())
}

fn read_dtype<R: Read>(r: &mut R, depth: usize) -> Result<DType> {
    if depth > MAX_NESTING_DEPTH {
        return Err(StratumError::CorruptEncoding(format!(
            "dtype nested deeper than {MAX_NESTING_DEPTH}"
        )));
    }
    let tag = read_u8(r)?;
    let nullability = match read_u8(r)? {
        0 => Nullability::NonNullable,
        1 => Nullability::Nullable,
        other => {
            return Err(StratumError::CorruptEncoding(format!(
                "nullability byte {other}"
            )))
        }
    };
    Ok(match tag {
        DTYPE_NULL => DType::Null,
        DTYPE_BOOL => DType::Bool(nullability),
        DTYPE_INT => {
            let width = IntWidth::try_from_bits(read_u8(r)?)?;
            let signedness = match read_u8(r)? {
                0 => Signedness::Unsigned,
                _ => Signedness::Signed,
            };
            DType::Int(width, signedness, nullability)
        }
        DTYPE_FLOAT => DType::Float(FloatWidth::try_from_bits(read_u8(r)?)?, nullability),
        DTYPE_UTF8 => DType::Utf8(nullability),
        DTYPE_BINARY => DType::Binary(nullability),
        DTYPE_STRUCT => {
            let count = read_u32(r)?;
            let mut fields = Vec::new();
            for _ in 0..count {
                let name_len = read_u32(r)? as u64;
                let name = read_exact_vec(r, name_len)?;
                let name = String::from_utf8(name).map_err(|e| {
                    StratumError::CorruptEncoding(format!("field name is not UTF-8: {e}"))
                })?;
                fields.push(Field::new(name, read_dtype(r, depth + 1)?));
            }
            DType::Struct(fields.into(), nullability)
        }
        other => {
            return Err(StratumError::CorruptEncoding(format!(
                "unknown dtype tag {other}"
            )))
        }
    })
}

/// Little-endian metadata buffer builder.
struct MetaWriter(Vec<u8>);

impl MetaWriter {
    fn new(len: usize) -> Self {
        MetaWriter((len as u64).to_le_bytes().to_vec())
    }

    fn u8(mut self, value: u8) -> Self {
        self.0.push(value);
        self
    }

    fn u32(mut self, value: u32) -> Self {
        self.0.extend_from_slice(&value.to_le_bytes());
        self
    }

    fn u64(mut self, value: u64) -> Self {
        self.0.extend_from_slice(&value.to_le_bytes());
        self
    }

    fn finish(self) -> Bytes {
        Bytes::from(self.0)
    }
}

fn check_write_depth(depth: usize) -> Result<()> {
    if depth > MAX_NESTING_DEPTH {
        return Err(StratumError::InvalidArgument(format!(
            "array nested deeper than {MAX_NESTING_DEPTH} levels cannot be serialized"
        )));
    }
    Ok(())
}

fn write_section<W: Write>(array: &Array, w: &mut W, depth: usize) -> Result<()> {
    check_write_depth(depth)?;
    let validity_flag = |v: Option<&BitBuffer>| u8::from(v.is_some());
    let validity_buffer = |v: Option<&BitBuffer>| v.map(BitBuffer::to_packed).transpose();

    let mut buffers: Vec<Bytes> = Vec::new();
    let mut children: Vec<&Array> = Vec::new();
    match array {
        Array::Null(a) => buffers.push(MetaWriter::new(a.len()).finish()),
        Array::Primitive(a) => {
            buffers.push(MetaWriter::new(a.len()).u8(validity_flag(a.validity())).finish());
            buffers.push(a.values().clone());
            buffers.extend(validity_buffer(a.validity())?);
        }
        Array::VarBin(a) => {
            buffers.push(
                MetaWriter::new(a.len())
                    .u8(a.offset_width().tag())
                    .u8(validity_flag(a.validity()))
                    .finish(),
            );
            let (offsets, data) = a.rebased_buffers();
            buffers.push(offsets);
            buffers.push(data);
            buffers.extend(validity_buffer(a.validity())?);
        }
        Array::Bool(a) => {
            buffers.push(MetaWriter::new(a.len()).u8(validity_flag(a.validity())).finish());
            buffers.push(a.bits().to_packed()?);
            buffers.extend(validity_buffer(a.validity())?);
        }
        Array::Struct(a) => {
            buffers.push(MetaWriter::new(a.len()).u8(validity_flag(a.validity())).finish());
            buffers.extend(validity_buffer(a.validity())?);
            children.extend(a.fields());
        }
        Array::Chunked(a) => {
            buffers.push(MetaWriter::new(a.len()).u32(a.nchunks() as u32).finish());
            children.extend(a.chunks());
        }
        Array::RunEnd(a) => {
            buffers.push(MetaWriter::new(a.len()).u64(a.offset() as u64).finish());
            children.push(a.ends());
            children.push(a.values());
        }
        Array::RoaringBool(a) => {
            buffers.push(MetaWriter::new(a.len()).u64(a.offset() as u64).finish());
            buffers.push(Bytes::from(a.bitmap().serialize::<Portable>()));
        }
        Array::RoaringInt(a) => {
            buffers.push(MetaWriter::new(a.len()).u64(a.offset() as u64).finish());
            buffers.push(Bytes::from(a.bitmap().serialize::<Portable>()));
        }
        Array::ZigZag(a) => {
            buffers.push(MetaWriter::new(a.len()).finish());
            children.push(a.encoded());
        }
    }

    trace!(
        encoding = %array.encoding(),
        len = array.len(),
        buffers = buffers.len(),
        children = children.len(),
        depth,
        "writing section"
    );
    write_dtype(array.dtype(), w, depth)?;
    w.write_all(&[array.encoding().tag()])?;
    w.write_all(&(buffers.len() as u32).to_le_bytes())?;
    for buffer in &buffers {
        w.write_all(&(buffer.len() as u64).to_le_bytes())?;
        w.write_all(buffer)?;
    }
    for child in children {
        write_section(child, w, depth + 1)?;
    }
    Ok(())
}

/// Cursor over a metadata buffer.
struct MetaReader {
    bytes: Bytes,
    pos: usize,
}

impl MetaReader {
    fn take(&mut self, n: usize) -> Result<&[u8]> {
        let end = self.pos + n;
        if end > self.bytes.len() {
            return Err(StratumError::CorruptEncoding(
                "metadata buffer too short".into(),
            ));
        }
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn u32(&mut self) -> Result<u32> {
        let mut out = [0u8; 4];
        out.copy_from_slice(self.take(4)?);
        Ok(u32::from_le_bytes(out))
    }

    fn u64(&mut self) -> Result<u64> {
        let mut out = [0u8; 8];
        out.copy_from_slice(self.take(8)?);
        Ok(u64::from_le_bytes(out))
    }

    fn usize(&mut self) -> Result<usize> {
        let value = self.u64()?;
        usize::try_from(value)
            .map_err(|_| StratumError::CorruptEncoding(format!("length {value} overflows usize")))
    }

    fn flag(&mut self) -> Result<bool> {
        match self.u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(StratumError::CorruptEncoding(format!("flag byte {other}"))),
        }
    }

    fn finish(self) -> Result<()> {
        if self.pos != self.bytes.len() {
            return Err(StratumError::CorruptEncoding(format!(
                "{} unread metadata bytes",
                self.bytes.len() - self.pos
            )));
        }
        Ok(())
    }
}

/// Buffers of one section, consumed in order.
struct Buffers(std::vec::IntoIter<Bytes>);

impl Buffers {
    fn next_buffer(&mut self) -> Result<Bytes> {
        self.0
            .next()
            .ok_or_else(|| StratumError::CorruptEncoding("missing buffer".into()))
    }

    fn validity(&mut self, present: bool, len: usize) -> Result<Option<BitBuffer>> {
        if !present {
            return Ok(None);
        }
        Ok(Some(BitBuffer::try_new(self.next_buffer()?, 0, len)?))
    }

    fn bitmap(&mut self) -> Result<Bitmap> {
        let bytes = self.next_buffer()?;
        Bitmap::try_deserialize::<Portable>(&bytes)
            .ok_or_else(|| StratumError::CorruptEncoding("malformed roaring bitmap".into()))
    }

    fn finish(mut self) -> Result<()> {
        match self.0.next() {
            None => Ok(()),
            Some(_) => Err(StratumError::CorruptEncoding("unexpected extra buffer".into())),
        }
    }
}

fn read_child<R: Read>(r: &mut R, expected: &DType, depth: usize) -> Result<Array> {
    let actual = read_dtype(r, depth)?;
    if &actual != expected {
        return Err(StratumError::CorruptEncoding(format!(
            "child section is {actual}, expected {expected}"
        )));
    }
    read_body(actual, r, depth)
}

fn read_body<R: Read>(dtype: DType, r: &mut R, depth: usize) -> Result<Array> {
    if depth > MAX_NESTING_DEPTH {
        return Err(StratumError::CorruptEncoding(format!(
            "sections nested deeper than {MAX_NESTING_DEPTH}"
        )));
    }
    let encoding = EncodingId::from_tag(read_u8(r)?)?;
    let count = read_u32(r)?;
    let mut buffers = Vec::new();
    for _ in 0..count {
        let len = read_u64(r)?;
        buffers.push(Bytes::from(read_exact_vec(r, len)?));
    }
    let mut buffers = Buffers(buffers.into_iter());
    let mut meta = MetaReader {
        bytes: buffers.next_buffer()?,
        pos: 0,
    };
    let len = meta.usize()?;
    trace!(%encoding, len, depth, "reading section");

    let array = match encoding {
        EncodingId::Null => {
            if dtype != DType::Null {
                return Err(StratumError::CorruptEncoding(format!(
                    "null encoding for {dtype}"
                )));
            }
            Array::from(NullArray::new(len))
        }
        EncodingId::Primitive => {
            let has_validity = meta.flag()?;
            let values = buffers.next_buffer()?;
            let validity = buffers.validity(has_validity, len)?;
            let array = PrimitiveArray::try_new(dtype, values, validity)?;
            check_len(array.len(), len)?;
            Array::from(array)
        }
        EncodingId::VarBin => {
            let offset_width = OffsetWidth::from_tag(meta.u8()?)?;
            let has_validity = meta.flag()?;
            let offsets = buffers.next_buffer()?;
            let data = buffers.next_buffer()?;
            let validity = buffers.validity(has_validity, len)?;
            let array = VarBinArray::try_new(dtype, offsets, offset_width, data, validity)?;
            check_len(array.len(), len)?;
            Array::from(array)
        }
        EncodingId::Bool => {
            let has_validity = meta.flag()?;
            let bits = BitBuffer::try_new(buffers.next_buffer()?, 0, len)?;
            let validity = buffers.validity(has_validity, len)?;
            Array::from(BoolArray::try_new(dtype, bits, validity)?)
        }
        EncodingId::Struct => {
            let has_validity = meta.flag()?;
            let validity = buffers.validity(has_validity, len)?;
            let declared = dtype.fields().map(<[Field]>::to_vec).unwrap_or_default();
            let fields = declared
                .iter()
                .map(|field| read_child(r, &field.dtype, depth + 1))
                .collect::<Result<Vec<_>>>()?;
            Array::from(StructArray::try_new(dtype, fields, len, validity)?)
        }
        EncodingId::Chunked => {
            let nchunks = meta.u32()?;
            let chunks = (0..nchunks)
                .map(|_| read_child(r, &dtype, depth + 1))
                .collect::<Result<Vec<_>>>()?;
            let array = ChunkedArray::try_new(dtype, chunks)?;
            check_len(array.len(), len)?;
            Array::from(array)
        }
        EncodingId::RunEnd => {
            let offset = meta.usize()?;
            let ends_dtype = read_dtype(r, depth + 1)?;
            let ends = read_body(ends_dtype, r, depth + 1)?;
            let values = read_child(r, &dtype, depth + 1)?;
            Array::from(RunEndArray::try_new(ends, values, offset, len)?)
        }
        EncodingId::RoaringBool => {
            let offset = meta.usize()?;
            Array::from(RoaringBoolArray::try_new(dtype, buffers.bitmap()?, offset, len)?)
        }
        EncodingId::RoaringInt => {
            let offset = meta.usize()?;
            Array::from(RoaringIntArray::try_new(dtype, buffers.bitmap()?, offset, len)?)
        }
        EncodingId::ZigZag => {
            let encoded_dtype = read_dtype(r, depth + 1)?;
            let encoded = read_body(encoded_dtype, r, depth + 1)?;
            check_len(encoded.len(), len)?;
            Array::from(ZigZagArray::try_new(dtype, encoded)?)
        }
    };
    meta.finish()?;
    buffers.finish()?;
    Ok(array)
}

fn check_len(actual: usize, declared: usize) -> Result<()> {
    if actual != declared {
        return Err(StratumError::CorruptEncoding(format!(
            "buffers hold {actual} values, header declares {declared}"
        )));
    }
    Ok(())
}

fn read_exact_vec<R: Read>(r: &mut R, len: u64) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    r.by_ref().take(len).read_to_end(&mut out)?;
    if out.len() as u64 != len {
        return Err(StratumError::CorruptEncoding(format!(
            "stream ended after {} of {len} bytes",
            out.len()
        )));
    }
    Ok(out)
}

fn read_array<R: Read, const N: usize>(r: &mut R) -> Result<[u8; N]> {
    let mut out = [0u8; N];
    r.read_exact(&mut out).map_err(|e| match e.kind() {
        ErrorKind::UnexpectedEof => StratumError::CorruptEncoding("unexpected end of stream".into()),
        _ => StratumError::Io(e),
    })?;
    Ok(out)
}

fn read_u8<R: Read>(r: &mut R) -> Result<u8> {
    Ok(read_array::<R, 1>(r)?[0])
}

fn read_u32<R: Read>(r: &mut R) -> Result<u32> {
    Ok(u32::from_le_bytes(read_array(r)?))
}

fn read_u64<R: Read>(r: &mut R) -> Result<u64> {
    Ok(u64::from_le_bytes(read_array(r)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compress::Compressor;
    use crate::scalar::Scalar;

    fn roundtrip(array: &Array) -> Array {
        let bytes = to_bytes(array).unwrap();
        from_bytes(array.dtype(), &bytes).unwrap()
    }

    #[test]
    fn test_primitive_layout() {
        let array = Array::from(PrimitiveArray::from_vec(vec![1u16, 2]));
        let bytes = to_bytes(&array).unwrap();
        let mut expected = vec![DTYPE_INT, 0, 16, 0, EncodingId::Primitive.tag()];
        expected.extend_from_slice(&2u32.to_le_bytes());
        expected.extend_from_slice(&9u64.to_le_bytes());
        expected.extend_from_slice(&2u64.to_le_bytes());
        expected.push(0);
        expected.extend_from_slice(&4u64.to_le_bytes());
        expected.extend_from_slice(&[1, 0, 2, 0]);
        assert_eq!(bytes, expected);
    }

    #[test]
    fn test_compressed_roundtrip_keeps_encoding() {
        let array = Array::from(PrimitiveArray::from_vec(vec![4i32, 4, 4, -1, -1, -1, 8, 8]));
        let compressed = Compressor::default().compress(&array).unwrap();
        let read = roundtrip(&compressed);
        assert_eq!(read.encoding(), compressed.encoding());
        assert_eq!(read, compressed);
    }

    #[test]
    fn test_sliced_views_roundtrip() {
        let strings = Array::from(VarBinArray::from_nullable_strs([
            Some("alpha"),
            None,
            Some("gamma"),
            Some("delta"),
        ]));
        let sliced = strings.slice(1, 3).unwrap();
        assert_eq!(roundtrip(&sliced), sliced);

        let bools = Array::from(BoolArray::from_bools((0..40).map(|i| i % 3 == 0)));
        let roaring = Array::from(RoaringBoolArray::encode(&bools).unwrap());
        let sliced = roaring.slice(5, 20).unwrap();
        assert_eq!(roundtrip(&sliced), sliced);
    }

    #[test]
    fn test_struct_and_chunked_roundtrip() {
        let table = Array::from(
            StructArray::from_fields([
                ("id", Array::from(PrimitiveArray::from_vec(vec![1u64, 2, 3]))),
                (
                    "tag",
                    Array::from(VarBinArray::from_nullable_binary([
                        Some(b"x".as_slice()),
                        None,
                        Some(b"".as_slice()),
                    ])),
                ),
            ])
            .unwrap(),
        );
        assert_eq!(roundtrip(&table), table);

        let chunked = Array::from(
            ChunkedArray::try_new(table.dtype().clone(), vec![table.clone(), table.slice(1, 1).unwrap()])
                .unwrap(),
        );
        let read = roundtrip(&chunked);
        assert_eq!(read.len(), 4);
        assert_eq!(read, chunked);
    }

    #[test]
    fn test_dtype_mismatch() {
        let array = Array::from(PrimitiveArray::from_vec(vec![1i32]));
        let bytes = to_bytes(&array).unwrap();
        let result = from_bytes(&DType::int(32, true, true).unwrap(), &bytes);
        assert!(matches!(result, Err(StratumError::DTypeMismatch { .. })));
    }

    #[test]
    fn test_truncated_and_trailing() {
        let array = Array::from(VarBinArray::from_strs(["hello", "world"]));
        let bytes = to_bytes(&array).unwrap();
        for cut in [1, 5, bytes.len() / 2, bytes.len() - 1] {
            let result = from_bytes(array.dtype(), &bytes[..cut]);
            assert!(
                matches!(result, Err(StratumError::CorruptEncoding(_))),
                "cut at {cut}: {result:?}"
            );
        }
        let mut padded = bytes.clone();
        padded.push(0);
        assert!(matches!(
            from_bytes(array.dtype(), &padded),
            Err(StratumError::CorruptEncoding(_))
        ));
    }

    #[test]
    fn test_inconsistent_length_is_corrupt() {
        let array = Array::from(PrimitiveArray::from_vec(vec![1u8, 2, 3]));
        let mut bytes = to_bytes(&array).unwrap();
        // The declared length sits right after the dtype (4), tag (1), count (4) and
        // metadata length (8).
        bytes[17] = 7;
        assert!(matches!(
            from_bytes(array.dtype(), &bytes),
            Err(StratumError::CorruptEncoding(_))
        ));
    }

    #[test]
    fn test_empty_and_null() {
        let empty = Array::from(VarBinArray::from_strs(Vec::<&str>::new()));
        assert_eq!(roundtrip(&empty), empty);
        let nulls = Array::from(NullArray::new(4));
        let read = roundtrip(&nulls);
        assert_eq!(read.len(), 4);
        assert_eq!(read.scalar_at(3).unwrap(), Scalar::Null);
    }

    #[test]
    fn test_zigzag_child_wider_than_dtype_is_corrupt() {
        let array = Array::from(PrimitiveArray::from_vec(vec![1000i16]));
        let zigzag = Array::from(ZigZagArray::encode(&array).unwrap());
        let mut bytes = to_bytes(&zigzag).unwrap();
        // Root descriptor: tag, nullability, bit width, signed.
        assert_eq!(bytes[2], 16);
        bytes[2] = 8;
        assert!(matches!(
            from_bytes(&DType::int(8, true, false).unwrap(), &bytes),
            Err(StratumError::CorruptEncoding(_))
        ));
    }

    #[test]
    fn test_nesting_limit_applies_to_write() {
        let nested = |levels: usize| {
            let mut array = Array::from(PrimitiveArray::from_vec(vec![1u8, 2]));
            for _ in 0..levels {
                array = Array::from(
                    ChunkedArray::try_new(array.dtype().clone(), vec![array]).unwrap(),
                );
            }
            array
        };

        let deepest = nested(MAX_NESTING_DEPTH);
        assert_eq!(roundtrip(&deepest), deepest);

        let mut sink = Vec::new();
        assert!(matches!(
            write(&nested(MAX_NESTING_DEPTH + 1), &mut sink),
            Err(StratumError::InvalidArgument(_))
        ));
        assert!(sink.is_empty());
    }
}
