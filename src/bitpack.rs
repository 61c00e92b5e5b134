//! Bit packing utilities for boolean values and validity bitmaps.
//!
//! [`BitPack`] reads and writes variable-width integers LSB-first into a byte
//! buffer. [`BitBuffer`] is an immutable, reference-counted packed bitmap with a
//! bit offset, so slicing it never copies.

use bytes::Bytes;

use crate::error::StratumError;
use crate::Result;

/// Maximum number of bits that can be written in a single operation.
pub const MAX_BITS: usize = 32;

/// Number of bits in a byte.
const BYTE_BITS: usize = 8;

/// A bit packer for reading and writing variable-width integers.
///
/// This supports both reading from a byte slice and writing to a growable Vec.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BitPack<B> {
    buff: B,
    cursor: usize,
    bits: usize,
}

impl<B> BitPack<B> {
    /// Create a new BitPack over the given buffer.
    #[inline]
    pub fn new(buff: B) -> Self {
        BitPack {
            buff,
            cursor: 0,
            bits: 0,
        }
    }

    /// Get the total number of bits processed so far.
    #[inline]
    pub fn sum_bits(&self) -> usize {
        self.cursor * BYTE_BITS + self.bits
    }
}

// Reading operations for byte slices
impl BitPack<&[u8]> {
    /// Read `bits` bits from the buffer and return them as u32.
    pub fn read(&mut self, mut bits: usize) -> Result<u32> {
        if bits > MAX_BITS {
            return Err(StratumError::InvalidArgument(format!(
                "cannot read {bits} bits at once (max {MAX_BITS})"
            )));
        }
        if self.buff.len() * BYTE_BITS < self.sum_bits() + bits {
            return Err(StratumError::CorruptEncoding(format!(
                "bit buffer exhausted: wanted {bits} bits, {} left",
                (self.buff.len() * BYTE_BITS).saturating_sub(self.sum_bits())
            )));
        }

        let mut bits_read = 0u32;
        let mut output = 0u32;

        loop {
            let byte_left = BYTE_BITS - self.bits;
            let bb = (self.buff[self.cursor] as u32) >> self.bits as u32;

            if bits < byte_left {
                output |= (bb & ((1u32 << bits) - 1)) << bits_read;
                self.bits += bits;
                break;
            }

            output |= (bb & ((1u32 << byte_left) - 1)) << bits_read;
            bits_read += byte_left as u32;
            bits -= byte_left;
            self.cursor += 1;
            self.bits = 0;

            if bits == 0 {
                break;
            }
        }

        Ok(output)
    }

    /// Skip `bits` bits.
    #[inline]
    pub fn skip(&mut self, bits: usize) -> Result<()> {
        if self.buff.len() * BYTE_BITS < self.sum_bits() + bits {
            return Err(StratumError::CorruptEncoding(format!(
                "cannot skip {bits} bits past the end of the buffer"
            )));
        }

        let total = self.bits + bits;
        self.cursor += total / BYTE_BITS;
        self.bits = total % BYTE_BITS;
        Ok(())
    }
}

impl Default for BitPack<Vec<u8>> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

// Writing operations for growable Vec
impl BitPack<Vec<u8>> {
    /// Create a new BitPack with room for `bits` bits.
    pub fn with_capacity_bits(bits: usize) -> Self {
        Self::new(Vec::with_capacity(bits.div_ceil(BYTE_BITS)))
    }

    /// Write the low `bits` bits of `value`, growing the buffer as needed.
    pub fn write(&mut self, mut value: u32, mut bits: usize) -> Result<()> {
        if bits > MAX_BITS {
            return Err(StratumError::InvalidArgument(format!(
                "cannot write {bits} bits at once (max {MAX_BITS})"
            )));
        }
        if bits < MAX_BITS {
            value &= (1u32 << bits) - 1;
        }

        let needed = (self.sum_bits() + bits).div_ceil(BYTE_BITS);
        if needed > self.buff.len() {
            self.buff.resize(needed, 0x0);
        }

        while bits > 0 {
            let bits_left = BYTE_BITS - self.bits;
            let take = bits.min(bits_left);
            let chunk = value & ((1u32 << take) - 1);
            self.buff[self.cursor] |= (chunk as u8) << self.bits;
            self.bits += take;
            if self.bits == BYTE_BITS {
                self.cursor += 1;
                self.bits = 0;
            }
            value = value.checked_shr(take as u32).unwrap_or(0);
            bits -= take;
        }

        Ok(())
    }

    /// Append one bit.
    #[inline]
    pub fn push(&mut self, bit: bool) {
        if self.bits == 0 {
            self.buff.push(0);
        }
        if bit {
            self.buff[self.cursor] |= 1u8 << self.bits;
        }
        self.bits += 1;
        if self.bits == BYTE_BITS {
            self.cursor += 1;
            self.bits = 0;
        }
    }

    /// Consume the BitPack and return the underlying buffer.
    #[inline]
    pub fn into_vec(self) -> Vec<u8> {
        self.buff
    }
}

/// An immutable packed bitmap over shared bytes.
///
/// Bit `i` of the buffer lives at bit `(offset + i) % 8` of byte `(offset + i) / 8`.
#[derive(Clone, Debug)]
pub struct BitBuffer {
    bytes: Bytes,
    offset: usize,
    len: usize,
}

impl BitBuffer {
    /// Wrap packed bytes. Fails if the bytes hold fewer than `offset + len` bits.
    pub fn try_new(bytes: Bytes, offset: usize, len: usize) -> Result<Self> {
        if bytes.len() * BYTE_BITS < offset + len {
            return Err(StratumError::CorruptEncoding(format!(
                "bitmap of {} bytes cannot hold {} bits at offset {offset}",
                bytes.len(),
                len
            )));
        }
        Ok(BitBuffer { bytes, offset, len })
    }

    /// Pack an iterator of booleans.
    pub fn from_bools<I: IntoIterator<Item = bool>>(bits: I) -> Self {
        let iter = bits.into_iter();
        let mut pack = BitPack::with_capacity_bits(iter.size_hint().0);
        let mut len = 0;
        for bit in iter {
            pack.push(bit);
            len += 1;
        }
        BitBuffer {
            bytes: Bytes::from(pack.into_vec()),
            offset: 0,
            len,
        }
    }

    /// A bitmap of `len` set bits.
    pub fn new_set(len: usize) -> Self {
        Self::from_bools(std::iter::repeat(true).take(len))
    }

    /// Number of bits.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the bitmap holds no bits.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The bit at `index`. Callers check bounds.
    #[inline]
    pub fn value(&self, index: usize) -> bool {
        debug_assert!(index < self.len, "BitBuffer index out of bounds");
        let bit = self.offset + index;
        (self.bytes[bit / BYTE_BITS] >> (bit % BYTE_BITS)) & 1 == 1
    }

    /// A zero-copy view of `len` bits starting at `start`. Callers check bounds.
    pub fn slice(&self, start: usize, len: usize) -> Self {
        debug_assert!(start + len <= self.len, "BitBuffer slice out of bounds");
        BitBuffer {
            bytes: self.bytes.clone(),
            offset: self.offset + start,
            len,
        }
    }

    /// Iterate over every bit in order.
    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        let mut reader = BitPack::<&[u8]>::new(&self.bytes);
        let skipped = reader.skip(self.offset).is_ok();
        (0..self.len).map(move |_| skipped && reader.read(1).map(|b| b == 1).unwrap_or(false))
    }

    /// Number of set bits.
    pub fn count_set_bits(&self) -> usize {
        self.iter().filter(|b| *b).count()
    }

    /// Positions of the set bits.
    pub fn set_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.iter()
            .enumerate()
            .filter_map(|(i, bit)| bit.then_some(i))
    }

    /// Bytes spanned by this view.
    pub fn nbytes(&self) -> usize {
        if self.len == 0 {
            return 0;
        }
        (self.offset % BYTE_BITS + self.len).div_ceil(BYTE_BITS)
    }

    /// Packed bytes starting at bit 0. Byte-aligned views are sliced without
    /// copying; others are re-packed up to 32 bits at a time.
    pub fn to_packed(&self) -> Result<Bytes> {
        let nbytes = self.len.div_ceil(BYTE_BITS);
        if self.offset % BYTE_BITS == 0 {
            let start = self.offset / BYTE_BITS;
            return Ok(self.bytes.slice(start..start + nbytes));
        }
        let mut reader = BitPack::<&[u8]>::new(&self.bytes);
        reader.skip(self.offset)?;
        let mut writer = BitPack::<Vec<u8>>::with_capacity_bits(self.len);
        let mut remaining = self.len;
        while remaining > 0 {
            let bits = remaining.min(MAX_BITS);
            writer.write(reader.read(bits)?, bits)?;
            remaining -= bits;
        }
        Ok(Bytes::from(writer.into_vec()))
    }
}

impl PartialEq for BitBuffer {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.iter().eq(other.iter())
    }
}

impl Eq for BitBuffer {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_read_roundtrip() {
        let mut bitpack_vec = BitPack::<Vec<u8>>::with_capacity_bits(16);
        bitpack_vec.write(10, 4).unwrap();
        bitpack_vec.write(1021, 10).unwrap();
        bitpack_vec.write(3, 2).unwrap();

        let buf = bitpack_vec.into_vec();
        let mut bitpack = BitPack::<&[u8]>::new(&buf);
        assert_eq!(bitpack.read(4).unwrap(), 10);
        assert_eq!(bitpack.read(10).unwrap(), 1021);
        assert_eq!(bitpack.read(2).unwrap(), 3);
    }

    #[test]
    fn test_single_bits() {
        let mut bitpack_vec = BitPack::<Vec<u8>>::default();
        bitpack_vec.push(true);
        bitpack_vec.push(false);
        bitpack_vec.write(0, 1).unwrap();
        bitpack_vec.write(1, 1).unwrap();

        let buf = bitpack_vec.into_vec();
        let mut bitpack = BitPack::<&[u8]>::new(&buf);
        assert_eq!(bitpack.read(1).unwrap(), 1);
        assert_eq!(bitpack.read(1).unwrap(), 0);
        assert_eq!(bitpack.read(1).unwrap(), 0);
        assert_eq!(bitpack.read(1).unwrap(), 1);
    }

    #[test]
    fn test_full_bytes() {
        let mut bitpack_vec = BitPack::<Vec<u8>>::default();
        bitpack_vec.write(255, 8).unwrap();
        bitpack_vec.write(65535, 16).unwrap();
        bitpack_vec.write(u32::MAX, 32).unwrap();

        let buf = bitpack_vec.into_vec();
        let mut bitpack = BitPack::<&[u8]>::new(&buf);
        assert_eq!(bitpack.read(8).unwrap(), 255);
        assert_eq!(bitpack.read(16).unwrap(), 65535);
        assert_eq!(bitpack.read(32).unwrap(), u32::MAX);
        assert!(matches!(
            bitpack.read(1),
            Err(StratumError::CorruptEncoding(_))
        ));
    }

    #[test]
    fn test_bit_width_exceeded() {
        let mut bitpack_vec = BitPack::<Vec<u8>>::default();
        let result = bitpack_vec.write(0, 33);
        assert!(matches!(result, Err(StratumError::InvalidArgument(_))));
    }

    #[test]
    fn test_bitbuffer_slice_is_view() {
        let bits = BitBuffer::from_bools([true, false, true, true, false, false, true, false, true]);
        assert_eq!(bits.len(), 9);
        assert_eq!(bits.count_set_bits(), 5);

        let sliced = bits.slice(2, 5);
        assert_eq!(sliced.iter().collect::<Vec<_>>(), vec![true, true, false, false, true]);
        assert_eq!(sliced.set_indices().collect::<Vec<_>>(), vec![0, 1, 4]);
        assert_eq!(
            sliced.to_packed().unwrap(),
            BitBuffer::from_bools([true, true, false, false, true])
                .to_packed()
                .unwrap()
        );

        let long: Vec<bool> = (0..70).map(|i| i % 3 != 1).collect();
        let view = BitBuffer::from_bools(long.iter().copied()).slice(5, 60);
        let packed = BitBuffer::try_new(view.to_packed().unwrap(), 0, 60).unwrap();
        assert_eq!(packed, view);
        assert_eq!(packed.iter().collect::<Vec<_>>(), long[5..65]);
    }

    #[test]
    fn test_bitbuffer_too_short() {
        let result = BitBuffer::try_new(Bytes::from_static(&[0xFF]), 4, 5);
        assert!(matches!(result, Err(StratumError::CorruptEncoding(_))));
    }
}
