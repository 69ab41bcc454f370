use embedded_can::{Frame, Id, StandardId};
use heapless::Vec;
use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::{
    catalog::MessageId,
    codec::{hex_digit_to_u8, to_hex_digit, u8_from_hex_nibbles},
    DecodeError,
};

/// Longest line [`TraceLine::as_bytes`] can produce
pub const MAX_TRACE_LINE_SIZE: usize = 48;

const TRACE_KEYWORD: &[u8] = b"CanBus";

/// A classic CAN data frame with an 11-bit identifier, the only kind of
/// frame the charger uses.
///
/// Remote and extended frames cannot be constructed, so `RawFrame::new`
/// through the [`Frame`] trait returns `None` for them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RawFrame {
    #[cfg_attr(feature = "defmt", defmt(Debug2Format))]
    id: StandardId,
    dlc: usize,
    data: [u8; 8],
}

impl RawFrame {
    /// Creates a new data frame. `data` must have a length in the range
    /// 0..=8 or else `None` will be returned instead.
    pub fn new(id: StandardId, data: &[u8]) -> Option<Self> {
        if data.len() > 8 {
            return None;
        }

        let mut copy = [0u8; 8];
        copy[..data.len()].copy_from_slice(data);

        Some(Self {
            id,
            dlc: data.len(),
            data: copy,
        })
    }

    /// Creates a frame for a catalog message. The payload length is not
    /// checked against the catalog here; decoding does that.
    pub fn for_message(id: MessageId, data: &[u8]) -> Option<Self> {
        Self::new(StandardId::new(id.raw())?, data)
    }

    pub fn standard_id(&self) -> StandardId {
        self.id
    }

    pub fn raw_id(&self) -> u16 {
        self.id.as_raw()
    }

    /// The catalog entry this frame belongs to, if any
    pub fn message_id(&self) -> Result<MessageId, DecodeError> {
        MessageId::try_from(self.raw_id())
    }
}

impl Frame for RawFrame {
    fn new(id: impl Into<Id>, data: &[u8]) -> Option<Self> {
        match id.into() {
            Id::Standard(id) => Self::new(id, data),
            Id::Extended(_) => None,
        }
    }

    fn new_remote(_id: impl Into<Id>, _dlc: usize) -> Option<Self> {
        None
    }

    fn is_extended(&self) -> bool {
        false
    }

    fn is_remote_frame(&self) -> bool {
        false
    }

    fn id(&self) -> Id {
        Id::Standard(self.id)
    }

    fn dlc(&self) -> usize {
        self.dlc
    }

    fn data(&self) -> &[u8] {
        &self.data[..self.dlc]
    }
}

/// Whether the bridge received the frame from the bus or transmitted it
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[num_enum(error_type(name = TraceParseError, constructor = TraceParseError::InvalidDirection))]
#[repr(u8)]
pub enum TraceDirection {
    Rx = b'R',
    Tx = b'T',
}

/// One line of the serial trace printed by the charger bridge, for example
/// `CanBus Rx 0x618 80 00 A0 0E 10 00 AA 00`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TraceLine {
    pub direction: TraceDirection,
    pub frame: RawFrame,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TraceParseError {
    #[error("Tried to parse a trace line that does not start with `CanBus`")]
    MissingKeyword,
    #[error("Tried to decode the direction but it was invalid ({0:?})")]
    InvalidDirection(u8),
    #[error("Tried to parse a trace line without an identifier")]
    MissingId,
    #[error("Tried to decode a hex digit but it was out of range ({0:?})")]
    IllegalHexDigit(u8),
    #[error("Received a CAN Standard ID ({0:?}) that was out of the valid range (0..=0x7FF)")]
    StandardIdOutOfRange(u32),
    #[error("Tried to parse a trace line without any data bytes")]
    MissingData,
    #[error("Received encoded data with a length ({0:?}) that was not a multiple of 2")]
    InvalidEncodedDataLength(usize),
    #[error("Received ({0:?}) bytes of data but a frame holds at most 8")]
    TooManyDataBytes(usize),
}

fn tokens(line: &[u8]) -> impl Iterator<Item = &[u8]> {
    line.split(|b| b.is_ascii_whitespace())
        .filter(|token| !token.is_empty())
}

fn parse_direction(token: &[u8]) -> Result<TraceDirection, TraceParseError> {
    match token {
        [first, second] if second.eq_ignore_ascii_case(&b'x') => {
            TraceDirection::try_from(first.to_ascii_uppercase())
        }
        _ => Err(TraceParseError::InvalidDirection(
            token.first().copied().unwrap_or_default(),
        )),
    }
}

fn parse_id(token: &[u8]) -> Result<StandardId, TraceParseError> {
    let digits = match token {
        [b'0', b'x' | b'X', rest @ ..] if !rest.is_empty() => rest,
        _ => token,
    };

    let mut id = 0u32;
    for digit in digits {
        let value = hex_digit_to_u8(*digit)?;
        id = id.saturating_mul(16).saturating_add(value as u32);
    }

    u16::try_from(id)
        .ok()
        .and_then(StandardId::new)
        .ok_or(TraceParseError::StandardIdOutOfRange(id))
}

impl TraceLine {
    pub fn from_bytes(line: &[u8]) -> Result<Self, TraceParseError> {
        let mut tokens = tokens(line);

        match tokens.next() {
            Some(keyword) if keyword.eq_ignore_ascii_case(TRACE_KEYWORD) => {}
            _ => return Err(TraceParseError::MissingKeyword),
        }

        let direction = parse_direction(tokens.next().ok_or(TraceParseError::MissingId)?)?;
        let id = parse_id(tokens.next().ok_or(TraceParseError::MissingId)?)?;

        let mut data: Vec<u8, 8> = Vec::new();
        let mut count = 0;

        for token in tokens {
            if token.len() % 2 != 0 {
                return Err(TraceParseError::InvalidEncodedDataLength(token.len()));
            }

            for pair in token.chunks_exact(2) {
                let byte = u8_from_hex_nibbles(&[pair[0], pair[1]])?;
                count += 1;

                // Keep counting so the error reports the full length
                let _ = data.push(byte);
            }
        }

        if count == 0 {
            return Err(TraceParseError::MissingData);
        }

        if count > 8 {
            return Err(TraceParseError::TooManyDataBytes(count));
        }

        let frame = RawFrame::new(id, &data).ok_or(TraceParseError::TooManyDataBytes(count))?;

        Ok(Self { direction, frame })
    }

    /// Renders the line as `CanBus RX 0x618 80 00 A0 ...` without a line
    /// terminator.
    pub fn as_bytes(&self) -> Vec<u8, MAX_TRACE_LINE_SIZE> {
        let mut result = Vec::new();

        result.extend_from_slice(TRACE_KEYWORD).expect("Failed to push to Vec");
        result.push(b' ').expect("Failed to push to Vec");
        result.push(self.direction.into()).expect("Failed to push to Vec");
        result.push(b'X').expect("Failed to push to Vec");

        let id = self.frame.raw_id() as u32;
        result
            .extend_from_slice(&[
                b' ',
                b'0',
                b'x',
                to_hex_digit(id >> 8),
                to_hex_digit(id >> 4),
                to_hex_digit(id),
            ])
            .expect("Failed to push to Vec");

        for byte in self.frame.data() {
            result
                .extend_from_slice(&[
                    b' ',
                    to_hex_digit((*byte >> 4) as u32),
                    to_hex_digit(*byte as u32),
                ])
                .expect("Failed to push to Vec");
        }

        result
    }
}
