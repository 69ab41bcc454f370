use crate::TraceParseError;

/// Byte order of a multi-byte signal.
///
/// Big-endian (Motorola) signals name their most significant bit as the start
/// bit and continue into higher-addressed bytes. Little-endian (Intel)
/// signals name their least significant bit as the start bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ByteOrder {
    BigEndian,
    LittleEndian,
}

/* Bit fields */

const fn mask(length: u8) -> u64 {
    if length >= 64 {
        u64::MAX
    } else {
        (1u64 << length) - 1
    }
}

/// Returns the number of bytes a signal touches and the position of its
/// least significant bit inside those bytes once they are composed into a
/// single integer.
const fn window(start_bit: u8, length: u8, order: ByteOrder) -> (usize, u32) {
    let bit = (start_bit % 8) as u32;
    let length = length as u32;

    match order {
        ByteOrder::BigEndian => {
            let span = if length <= bit + 1 {
                1
            } else {
                1 + (length - (bit + 1)).div_ceil(8)
            };
            let msb = (span - 1) * 8 + bit;

            (span as usize, msb + 1 - length)
        }
        ByteOrder::LittleEndian => ((bit + length).div_ceil(8) as usize, bit),
    }
}

fn compose(bytes: &[u8], order: ByteOrder) -> u64 {
    match order {
        ByteOrder::BigEndian => bytes.iter().fold(0, |acc, b| (acc << 8) | *b as u64),
        ByteOrder::LittleEndian => bytes.iter().rev().fold(0, |acc, b| (acc << 8) | *b as u64),
    }
}

/// Byte range of `payload` that a signal occupies.
pub const fn byte_span(start_bit: u8, length: u8, order: ByteOrder) -> (usize, usize) {
    let (span, _) = window(start_bit, length, order);
    let start = (start_bit / 8) as usize;

    (start, start + span)
}

/// Reads an unsigned `length`-bit value whose start bit is `start_bit` in the
/// global numbering (byte `start_bit / 8`, bit `start_bit % 8`).
///
/// The signal must lie within `payload`; the catalog guarantees this for
/// every payload whose length has been validated.
pub fn extract(payload: &[u8], start_bit: u8, length: u8, order: ByteOrder) -> u64 {
    let (start, end) = byte_span(start_bit, length, order);
    let (_, shift) = window(start_bit, length, order);

    (compose(&payload[start..end], order) >> shift) & mask(length)
}

/// Writes the low `length` bits of `value` into `buffer` at the position
/// described by `start_bit`. Bits belonging to other signals are preserved,
/// so several signals sharing one byte can be packed one after another.
pub fn pack(value: u64, start_bit: u8, length: u8, order: ByteOrder, buffer: &mut [u8]) {
    let (start, end) = byte_span(start_bit, length, order);
    let (span, shift) = window(start_bit, length, order);
    let bytes = &mut buffer[start..end];

    let field_mask = mask(length) << shift;
    let composed = (compose(bytes, order) & !field_mask) | ((value << shift) & field_mask);

    for (i, byte) in bytes.iter_mut().enumerate() {
        let position = match order {
            ByteOrder::BigEndian => span - 1 - i,
            ByteOrder::LittleEndian => i,
        };

        *byte = (composed >> (8 * position)) as u8;
    }
}

/* Hex text */

pub fn to_hex_digit(value: u32) -> u8 {
    const HEX_LUT: &[u8] = "0123456789ABCDEF".as_bytes();

    HEX_LUT[(value & 0xF) as usize]
}

pub fn hex_digit_to_u8(byte: u8) -> Result<u8, TraceParseError> {
    Ok(match byte {
        b'0'..=b'9' => byte - b'0',
        b'a'..=b'f' => byte - b'a' + 10,
        b'A'..=b'F' => byte - b'A' + 10,
        _ => return Err(TraceParseError::IllegalHexDigit(byte)),
    })
}

pub fn u8_from_hex_nibbles(hex_nibbles: &[u8; 2]) -> Result<u8, TraceParseError> {
    let msn = hex_digit_to_u8(hex_nibbles[0])?;
    let lsn = hex_digit_to_u8(hex_nibbles[1])?;

    Ok((msn << 4) | lsn)
}
