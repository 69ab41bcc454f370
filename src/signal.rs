use core::str::Utf8Error;

use crate::codec::{self, ByteOrder};

/// Linear conversion between a raw unsigned value and a physical quantity:
/// `physical = raw * scale + offset`.
///
/// `min` and `max` are the documented physical range. They only apply when
/// encoding, where out-of-range inputs are clamped instead of rejected.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Linear {
    pub scale: f32,
    pub offset: f32,
    pub min: f32,
    pub max: f32,
}

impl Linear {
    pub const fn new(scale: f32, offset: f32, min: f32, max: f32) -> Self {
        Self {
            scale,
            offset,
            min,
            max,
        }
    }

    pub fn to_physical(&self, raw: u64) -> f32 {
        raw as f32 * self.scale + self.offset
    }

    pub fn clamp(&self, physical: f32) -> f32 {
        physical.clamp(self.min, self.max)
    }

    /// Clamps `physical` to the documented range and converts it to the
    /// nearest raw step. The result saturates at the largest value `length`
    /// bits can hold, and NaN maps to zero.
    ///
    /// Rounds to nearest rather than toward zero as the charger's own
    /// firmware does, so that decoding the result lands within half a step
    /// of `physical`.
    pub fn to_raw(&self, physical: f32, length: u8) -> u64 {
        let steps = (self.clamp(physical) - self.offset) / self.scale;

        ((steps + 0.5) as u64).min(max_raw(length))
    }
}

pub(crate) const fn max_raw(length: u8) -> u64 {
    if length >= 64 {
        u64::MAX
    } else {
        (1u64 << length) - 1
    }
}

/// How the raw bits of a signal are turned into a value.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Encoding {
    /// Single bit truth value
    Flag,
    /// Scaled physical quantity
    Linear(Linear),
    /// Unscaled unsigned integer (counters, codes, passwords)
    Raw,
    /// Code mapped through an enumeration with an `Unknown(raw)` fallback
    Enumerated,
    /// Eight bytes copied verbatim
    Ascii,
}

/// Position and encoding of one field inside a message payload.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Signal {
    pub name: &'static str,
    /// Global start bit: byte `start_bit / 8`, bit `start_bit % 8`
    pub start_bit: u8,
    pub length: u8,
    pub byte_order: ByteOrder,
    pub encoding: Encoding,
}

impl Signal {
    pub const fn flag(name: &'static str, start_bit: u8) -> Self {
        Self {
            name,
            start_bit,
            length: 1,
            byte_order: ByteOrder::BigEndian,
            encoding: Encoding::Flag,
        }
    }

    pub const fn linear(name: &'static str, start_bit: u8, length: u8, linear: Linear) -> Self {
        Self {
            name,
            start_bit,
            length,
            byte_order: ByteOrder::BigEndian,
            encoding: Encoding::Linear(linear),
        }
    }

    pub const fn raw(name: &'static str, start_bit: u8, length: u8) -> Self {
        Self {
            name,
            start_bit,
            length,
            byte_order: ByteOrder::BigEndian,
            encoding: Encoding::Raw,
        }
    }

    pub const fn enumerated(name: &'static str, start_bit: u8, length: u8) -> Self {
        Self {
            name,
            start_bit,
            length,
            byte_order: ByteOrder::BigEndian,
            encoding: Encoding::Enumerated,
        }
    }

    pub const fn ascii(name: &'static str, start_bit: u8) -> Self {
        Self {
            name,
            start_bit,
            length: 64,
            byte_order: ByteOrder::BigEndian,
            encoding: Encoding::Ascii,
        }
    }

    /// Consumes self and returns the same signal laid out in Intel order
    pub const fn little_endian(self) -> Self {
        Self {
            byte_order: ByteOrder::LittleEndian,
            ..self
        }
    }

    pub const fn start_byte(&self) -> usize {
        (self.start_bit / 8) as usize
    }

    /// Half-open range of payload bytes the signal touches
    pub const fn byte_span(&self) -> (usize, usize) {
        codec::byte_span(self.start_bit, self.length, self.byte_order)
    }

    fn extract(&self, payload: &[u8]) -> u64 {
        codec::extract(payload, self.start_bit, self.length, self.byte_order)
    }

    fn pack(&self, raw: u64, buffer: &mut [u8]) {
        codec::pack(raw, self.start_bit, self.length, self.byte_order, buffer)
    }

    /// Decodes the signal according to its encoding.
    pub fn decode(&self, payload: &[u8]) -> SignalValue {
        match self.encoding {
            Encoding::Flag => SignalValue::Flag(self.extract(payload) != 0),
            Encoding::Linear(linear) => {
                SignalValue::Physical(linear.to_physical(self.extract(payload)))
            }
            Encoding::Raw => SignalValue::Raw(self.extract(payload)),
            Encoding::Enumerated => SignalValue::Enumerated(self.extract(payload)),
            Encoding::Ascii => SignalValue::Ascii(self.read_ascii(payload)),
        }
    }

    /// Whether `value` is the kind [`Signal::decode`] produces for this
    /// signal.
    pub fn accepts(&self, value: &SignalValue) -> bool {
        matches!(
            (self.encoding, value),
            (Encoding::Flag, SignalValue::Flag(_))
                | (Encoding::Linear(_), SignalValue::Physical(_))
                | (Encoding::Raw, SignalValue::Raw(_))
                | (Encoding::Enumerated, SignalValue::Enumerated(_))
                | (Encoding::Ascii, SignalValue::Ascii(_))
        )
    }

    /// Encodes `value` into `buffer`, clamping physical values to the
    /// signal's documented range. Integers wider than the signal saturate at
    /// its maximum.
    ///
    /// Returns `false` and leaves `buffer` untouched when `value` is not the
    /// kind this signal carries.
    #[must_use]
    pub fn encode(&self, value: SignalValue, buffer: &mut [u8]) -> bool {
        if !self.accepts(&value) {
            return false;
        }

        match value {
            SignalValue::Flag(flag) => self.write_flag(buffer, flag),
            SignalValue::Physical(physical) => self.write_physical(buffer, physical),
            SignalValue::Raw(raw) | SignalValue::Enumerated(raw) => self.write_raw(buffer, raw),
            SignalValue::Ascii(block) => {
                let (start, end) = self.byte_span();
                buffer[start..end].copy_from_slice(&block.as_bytes()[..end - start]);
            }
        }

        true
    }

    pub fn read_flag(&self, payload: &[u8]) -> bool {
        self.extract(payload) != 0
    }

    pub fn read_raw(&self, payload: &[u8]) -> u64 {
        self.extract(payload)
    }

    pub fn read_physical(&self, payload: &[u8]) -> f32 {
        let raw = self.extract(payload);

        match self.encoding {
            Encoding::Linear(linear) => linear.to_physical(raw),
            _ => raw as f32,
        }
    }

    pub fn read_ascii(&self, payload: &[u8]) -> AsciiBlock {
        let (start, end) = self.byte_span();
        let mut bytes = [0u8; 8];
        bytes[..end - start].copy_from_slice(&payload[start..end]);

        AsciiBlock(bytes)
    }

    pub fn write_flag(&self, buffer: &mut [u8], flag: bool) {
        self.pack(flag as u64, buffer)
    }

    pub fn write_raw(&self, buffer: &mut [u8], raw: u64) {
        self.pack(raw.min(max_raw(self.length)), buffer)
    }

    pub fn write_physical(&self, buffer: &mut [u8], physical: f32) {
        let raw = match self.encoding {
            Encoding::Linear(linear) => linear.to_raw(physical, self.length),
            _ => ((physical + 0.5) as u64).min(max_raw(self.length)),
        };

        self.pack(raw, buffer)
    }
}

/// A decoded signal.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SignalValue {
    Flag(bool),
    Physical(f32),
    Raw(u64),
    Enumerated(u64),
    Ascii(AsciiBlock),
}

/// Eight bytes of text sent verbatim by the charger (software version,
/// serial number). Any byte value is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AsciiBlock([u8; 8]);

impl AsciiBlock {
    pub const fn new(bytes: [u8; 8]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }

    /// The text up to the first NUL byte.
    pub fn as_str(&self) -> Result<&str, Utf8Error> {
        let end = self.0.iter().position(|b| *b == 0).unwrap_or(self.0.len());

        core::str::from_utf8(&self.0[..end])
    }
}

impl From<[u8; 8]> for AsciiBlock {
    fn from(bytes: [u8; 8]) -> Self {
        Self(bytes)
    }
}
