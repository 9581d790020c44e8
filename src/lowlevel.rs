use super::types::*;
use byteorder::{BigEndian, ByteOrder, LittleEndian};

/// Borrow `length` bytes of `raw` starting at `offset`
#[inline]
pub(crate) fn read_bytes(raw: &[u8], offset: usize, length: usize) -> Result<&[u8], ExifError> {
    offset
        .checked_add(length)
        .and_then(|end| raw.get(offset..end))
        .ok_or(ExifError::TruncatedBuffer {
            offset,
            length,
            available: raw.len().saturating_sub(offset),
        })
}

/// Read an unsigned integer of `byte_count` bytes (1, 2, 4 or 8)
#[inline]
pub(crate) fn read_uint(
    raw: &[u8],
    offset: usize,
    byte_count: usize,
    align: ByteAlign,
) -> Result<u64, ExifError> {
    debug_assert!(matches!(byte_count, 1 | 2 | 4 | 8));
    let bytes = read_bytes(raw, offset, byte_count)?;
    Ok(match align {
        ByteAlign::Motorola => BigEndian::read_uint(bytes, byte_count),
        ByteAlign::Intel => LittleEndian::read_uint(bytes, byte_count),
    })
}

/// Read a signed integer of `byte_count` bytes
#[inline]
pub(crate) fn read_int(
    raw: &[u8],
    offset: usize,
    byte_count: usize,
    align: ByteAlign,
) -> Result<i64, ExifError> {
    read_uint(raw, offset, byte_count, align).map(|v| sign_extend(v, byte_count))
}

/// Widen the two's complement value held in the low `byte_count` bytes of `value`
#[inline]
pub(crate) fn sign_extend(value: u64, byte_count: usize) -> i64 {
    let shift = 64 - 8 * byte_count as u32;
    ((value << shift) as i64) >> shift
}

/// Read value from a stream of bytes
#[inline]
pub(crate) fn read_u16(raw: &[u8], offset: usize, align: ByteAlign) -> Result<u16, ExifError> {
    read_uint(raw, offset, 2, align).map(|v| v as u16)
}

/// Read value from a stream of bytes
#[inline]
pub(crate) fn read_u32(raw: &[u8], offset: usize, align: ByteAlign) -> Result<u32, ExifError> {
    read_uint(raw, offset, 4, align).map(|v| v as u32)
}

/// Serialize the low `byte_count` bytes of `value`. Higher bytes are dropped.
pub(crate) fn write_int(value: u64, byte_count: usize, align: ByteAlign) -> Vec<u8> {
    debug_assert!(matches!(byte_count, 1 | 2 | 4 | 8));
    let value = if byte_count == 8 {
        value
    } else {
        value & ((1u64 << (8 * byte_count)) - 1)
    };
    let mut out = vec![0; byte_count];
    BigEndian::write_uint(&mut out, value, byte_count);
    reverse_if_little_endian(&mut out, align);
    out
}

#[inline]
pub(crate) fn write_u16(value: u16, align: ByteAlign) -> Vec<u8> {
    write_int(u64::from(value), 2, align)
}

#[inline]
pub(crate) fn write_u32(value: u32, align: ByteAlign) -> Vec<u8> {
    write_int(u64::from(value), 4, align)
}

/// Turn big-endian-in-memory bytes into the given byte order, or back
pub(crate) fn reverse_if_little_endian(bytes: &mut [u8], align: ByteAlign) {
    if align.is_little_endian() {
        bytes.reverse();
    }
}

/// Read array from a stream of bytes. Caller must be sure of count and buffer size
pub(crate) fn read_uint_array(
    count: u32,
    width: usize,
    raw: &[u8],
    align: ByteAlign,
) -> Result<Vec<u64>, ExifError> {
    (0..count as usize)
        .map(|i| read_uint(raw, i * width, width, align))
        .collect()
}

/// Read array from a stream of bytes, sign-extending every item
pub(crate) fn read_int_array(
    count: u32,
    width: usize,
    raw: &[u8],
    align: ByteAlign,
) -> Result<Vec<i64>, ExifError> {
    (0..count as usize)
        .map(|i| read_int(raw, i * width, width, align))
        .collect()
}
