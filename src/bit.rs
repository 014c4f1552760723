//! Bit-level helpers for validity bitmaps and bit-packed boolean buffers.
//!
//! Bits are addressed LSB-first: bit `i` lives in byte `i >> 3` at position
//! `i % 8`. A set bit means "valid" in a validity bitmap and `true` in a
//! boolean buffer.

use bytes::{
    Buf,
    Bytes,
};

/// Bytes of padding needed to bring `value` up to a multiple of `alignment`.
pub fn padding(value: usize, alignment: usize) -> usize {
    if alignment == 0 {
        return 0;
    }
    (alignment - value % alignment) % alignment
}

/// Round `value` up to the next multiple of `alignment`.
pub fn align(value: usize, alignment: usize) -> usize {
    value + padding(value, alignment)
}

/// Number of bytes needed to hold `bits` bits.
pub fn bytes_for_bits(bits: usize) -> usize {
    (bits + 7) >> 3
}

/// Read bit `index` as `0` or `1`.
#[inline]
pub fn get_bit(bytes: &[u8], index: usize) -> u8 {
    (bytes[index >> 3] >> (index % 8)) & 1
}

/// Read bit `index` as a bool.
#[inline]
pub fn get_bool(bytes: &[u8], index: usize) -> bool {
    get_bit(bytes, index) != 0
}

/// Write bit `index`.
#[inline]
pub fn set_bool(bytes: &mut [u8], index: usize, value: bool) {
    let mask = 1u8 << (index % 8);
    if value {
        bytes[index >> 3] |= mask;
    } else {
        bytes[index >> 3] &= !mask;
    }
}

/// Pack a sequence of bools into an LSB-first bitmap.
///
/// The final byte is zero-filled past the last value and the buffer is padded
/// with zero bytes to a multiple of 8 bytes, so population counts over the
/// padded tail never see stray bits. An empty input still yields one (padded)
/// byte group.
pub fn pack_bools<I>(values: I) -> Bytes
where
    I: IntoIterator<Item = bool>,
{
    let mut out: Vec<u8> = Vec::new();
    let mut byte = 0u8;
    let mut bit = 0u32;

    for value in values {
        if value {
            byte |= 1 << bit;
        }
        bit += 1;
        if bit == 8 {
            out.push(byte);
            byte = 0;
            bit = 0;
        }
    }

    if out.is_empty() || bit > 0 {
        out.push(byte);
    }
    out.resize(align(out.len(), 8), 0);

    Bytes::from(out)
}

/// Iterate `length` bits starting at absolute bit `offset`.
pub fn iterate_bits(
    bytes: &[u8],
    offset: usize,
    length: usize,
) -> impl Iterator<Item = bool> + '_ {
    (offset..offset + length).map(move |index| get_bool(bytes, index))
}

/// Count the set bits in `[lhs, rhs)`.
///
/// Ranges shorter than a byte are counted bit by bit. Longer ranges are split
/// into the unaligned head up to the next byte boundary, the unaligned tail
/// after the last byte boundary, and the byte-aligned middle, which is counted
/// a word at a time. At most 14 bits are ever visited individually.
pub fn popcnt_bit_range(data: &[u8], lhs: usize, rhs: usize) -> usize {
    if rhs <= lhs {
        return 0;
    }

    if rhs - lhs < 8 {
        return iterate_bits(data, lhs, rhs - lhs).filter(|bit| *bit).count();
    }

    let rhs_inside = rhs >> 3 << 3;
    let lhs_inside = lhs + padding(lhs, 8);

    popcnt_bit_range(data, lhs, lhs_inside)
        + popcnt_bit_range(data, rhs_inside, rhs)
        + popcnt_array(data, lhs_inside >> 3, (rhs_inside - lhs_inside) >> 3)
}

/// Count the set bits in `byte_length` bytes starting at `byte_offset`.
///
/// Consumes 4-byte words first, then a 2-byte and a 1-byte tail.
pub fn popcnt_array(data: &[u8], byte_offset: usize, byte_length: usize) -> usize {
    let mut buf = &data[byte_offset..byte_offset + byte_length];
    let mut count = 0usize;

    while buf.remaining() >= 4 {
        count += popcnt_u32(buf.get_u32()) as usize;
    }
    while buf.remaining() >= 2 {
        count += popcnt_u32(buf.get_u16() as u32) as usize;
    }
    while buf.remaining() >= 1 {
        count += popcnt_u32(buf.get_u8() as u32) as usize;
    }

    count
}

/// SWAR population count of a 32-bit word.
#[inline]
pub fn popcnt_u32(value: u32) -> u32 {
    let mut i = value;
    i = i - ((i >> 1) & 0x5555_5555);
    i = (i & 0x3333_3333) + ((i >> 2) & 0x3333_3333);
    (((i + (i >> 4)) & 0x0F0F_0F0F).wrapping_mul(0x0101_0101)) >> 24
}
