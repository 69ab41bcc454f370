use heapless::Vec;
use num_enum::{FromPrimitive, IntoPrimitive};

use crate::{
    catalog::{self, control, request, Direction, MessageDefinition, MessageId},
    frame::RawFrame,
    signal::SignalValue,
};

/// Encoded payload of at most one classic CAN frame
pub type Payload = Vec<u8, 8>;

/// Commands the BMS sends to the charger
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    Control(Control),
    Request(Request),
}

impl From<Control> for Command {
    fn from(control: Control) -> Self {
        Self::Control(control)
    }
}

impl From<Request> for Command {
    fn from(request: Request) -> Self {
        Self::Request(request)
    }
}

/// CTL, the periodic command that enables the charger and sets its limits.
///
/// Must be sent at least every 600 ms or the charger reports an Rx618 failure
/// and stops.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Control {
    pub can_enable: bool,
    /// Drives the charger's LED3 output
    pub led3: bool,
    /// AC input current limit, 0 to 500 A
    pub iac_max_a: f32,
    /// Output voltage limit, 0 to 10000 V
    pub vout_max_v: f32,
    /// Output current limit, 0 to 1500 A
    pub iout_max_a: f32,
}

impl Control {
    /// A control frame that keeps the charger off
    pub const fn disabled() -> Self {
        Self {
            can_enable: false,
            led3: false,
            iac_max_a: 0.0,
            vout_max_v: 0.0,
            iout_max_a: 0.0,
        }
    }

    pub(crate) fn from_payload(payload: &[u8]) -> Self {
        Self {
            can_enable: control::CAN_ENABLE.read_flag(payload),
            led3: control::LED3.read_flag(payload),
            iac_max_a: control::IAC_MAX.read_physical(payload),
            vout_max_v: control::VOUT_MAX.read_physical(payload),
            iout_max_a: control::IOUT_MAX.read_physical(payload),
        }
    }

    fn write(&self, buffer: &mut [u8]) {
        control::CAN_ENABLE.write_flag(buffer, self.can_enable);
        control::LED3.write_flag(buffer, self.led3);
        control::IAC_MAX.write_physical(buffer, self.iac_max_a);
        control::VOUT_MAX.write_physical(buffer, self.vout_max_v);
        control::IOUT_MAX.write_physical(buffer, self.iout_max_a);
    }
}

impl Default for Control {
    fn default() -> Self {
        Self::disabled()
    }
}

/// Message the charger should answer a [`Request`] with
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, FromPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u16)]
pub enum RequestKind {
    FaultPassive = 0x61C,
    FaultActive = 0x61D,
    SoftwareVersion = 0x61E,
    SerialNumber = 0x61F,
    #[num_enum(catch_all)]
    Unknown(u16),
}

impl RequestKind {
    pub fn message_id(&self) -> Option<MessageId> {
        match self {
            Self::FaultPassive => Some(MessageId::FaultPassive),
            Self::FaultActive => Some(MessageId::FaultActive),
            Self::SoftwareVersion => Some(MessageId::SoftwareVersion),
            Self::SerialNumber => Some(MessageId::SerialNumber),
            Self::Unknown(_) => None,
        }
    }
}

/// REQ, asks the charger for fault memory or identification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Request {
    pub enable: bool,
    pub kind: RequestKind,
}

impl Request {
    pub const fn new(kind: RequestKind) -> Self {
        Self { enable: true, kind }
    }

    pub const fn fault_active() -> Self {
        Self::new(RequestKind::FaultActive)
    }

    pub const fn fault_passive() -> Self {
        Self::new(RequestKind::FaultPassive)
    }

    pub const fn software_version() -> Self {
        Self::new(RequestKind::SoftwareVersion)
    }

    pub const fn serial_number() -> Self {
        Self::new(RequestKind::SerialNumber)
    }

    pub(crate) fn from_payload(payload: &[u8]) -> Self {
        Self {
            enable: request::ENABLE.read_flag(payload),
            kind: RequestKind::from(request::REQUESTED_ID.read_raw(payload) as u16),
        }
    }

    fn write(&self, buffer: &mut [u8]) {
        request::ENABLE.write_flag(buffer, self.enable);
        request::REQUESTED_ID.write_raw(buffer, u16::from(self.kind) as u64);
    }
}

/// Reasons a payload could not be encoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EncodeError {
    #[error("Tried to encode a message with an identifier ({0:#05X}) that is not in the catalog")]
    UnknownMessageId(u16),
    #[error("Tried to encode {0:?} but only the BMS to charger commands can be encoded")]
    NotACommand(MessageId),
    #[error("Tried to encode a signal that message {id:#05X} does not carry")]
    UnknownSignal { id: u16 },
    #[error("Tried to encode a value of the wrong kind into signal `{signal}` of message {id:#05X}")]
    SignalTypeMismatch { id: u16, signal: &'static str },
}

impl Command {
    pub fn id(&self) -> MessageId {
        match self {
            Self::Control(_) => MessageId::Control,
            Self::Request(_) => MessageId::Request,
        }
    }

    /// Packs the command into a zeroed buffer of the catalog length. Physical
    /// values outside their documented range are clamped, never rejected.
    pub fn encode(&self) -> Result<Payload, EncodeError> {
        encode_with(self.id().definition(), |buffer| match self {
            Self::Control(control) => control.write(buffer),
            Self::Request(request) => request.write(buffer),
        })
    }

    /// Encodes the command into a frame ready for any `embedded-can` driver.
    pub fn to_frame(&self) -> Result<RawFrame, EncodeError> {
        let payload = self.encode()?;

        RawFrame::for_message(self.id(), &payload).ok_or(EncodeError::UnknownMessageId(self.id().raw()))
    }
}

/// Encodes a command from `(signal name, value)` pairs, leaving every signal
/// not named at zero.
pub fn encode_signals(
    id: u16,
    values: &[(&str, SignalValue)],
) -> Result<Payload, EncodeError> {
    let definition = catalog::lookup(id).map_err(|_| EncodeError::UnknownMessageId(id))?;

    if definition.direction != Direction::BmsToCharger {
        return Err(EncodeError::NotACommand(definition.id));
    }

    for (name, value) in values {
        let signal = definition
            .signal(name)
            .ok_or(EncodeError::UnknownSignal { id })?;

        if !signal.accepts(value) {
            return Err(EncodeError::SignalTypeMismatch {
                id,
                signal: signal.name,
            });
        }
    }

    encode_with(definition, |buffer| {
        for (name, value) in values {
            if let Some(signal) = definition.signal(name) {
                let _ = signal.encode(*value, buffer);
            }
        }
    })
}

fn encode_with(
    definition: &MessageDefinition,
    write: impl FnOnce(&mut [u8]),
) -> Result<Payload, EncodeError> {
    if definition.direction != Direction::BmsToCharger {
        return Err(EncodeError::NotACommand(definition.id));
    }

    let mut buffer = [0u8; 8];
    write(&mut buffer[..definition.length]);

    Ok(buffer[..definition.length].iter().copied().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AsciiBlock, DecodedMessage, Id, StandardId};
    use embedded_can::Frame;

    fn close(a: f32, b: f32, tolerance: f32) -> bool {
        (a - b).abs() <= tolerance
    }

    fn control(iac_max_a: f32, vout_max_v: f32, iout_max_a: f32) -> Control {
        Control {
            can_enable: true,
            led3: false,
            iac_max_a,
            vout_max_v,
            iout_max_a,
        }
    }

    fn decode_control(payload: &[u8]) -> Control {
        match DecodedMessage::decode(0x618, payload) {
            Ok(DecodedMessage::Control(control)) => control,
            other => panic!("expected CTL, got {other:?}"),
        }
    }

    #[test]
    fn encode_documented_control() {
        let payload = Command::from(control(16.0, 360.0, 17.0)).encode().unwrap();

        assert_eq!(payload, [0x80, 0x00, 0xA0, 0x0E, 0x10, 0x00, 0xAA, 0x00]);
    }

    #[test]
    fn encode_led_flag_shares_first_byte() {
        let payload = Command::Control(Control {
            led3: true,
            ..control(16.0, 360.0, 17.0)
        })
        .encode()
        .unwrap();

        assert_eq!(payload[0], 0x88);
        assert_eq!(Command::from(Control::disabled()).encode().unwrap(), [0; 8]);
    }

    #[test]
    fn encode_requests() {
        assert_eq!(
            Command::from(Request::fault_active()).encode().unwrap(),
            [0x80, 0x00, 0x06, 0x1D]
        );
        assert_eq!(
            Command::from(Request::fault_passive()).encode().unwrap(),
            [0x80, 0x00, 0x06, 0x1C]
        );
        assert_eq!(
            Command::from(Request::software_version()).encode().unwrap(),
            [0x80, 0x00, 0x06, 0x1E]
        );
        assert_eq!(
            Command::from(Request::serial_number()).encode().unwrap(),
            [0x80, 0x00, 0x06, 0x1F]
        );

        let disabled = Request {
            enable: false,
            kind: RequestKind::Unknown(0x0123),
        };
        assert_eq!(
            Command::from(disabled).encode().unwrap(),
            [0x00, 0x00, 0x01, 0x23]
        );
    }

    #[test]
    fn out_of_range_inputs_are_clamped() {
        let payload = Command::from(control(-5.0, -1.0, 99_999.0)).encode().unwrap();
        let decoded = decode_control(&payload);

        assert_eq!(decoded.iac_max_a, 0.0);
        assert_eq!(decoded.vout_max_v, 0.0);
        assert!(close(decoded.iout_max_a, 1500.0, 1e-3));

        let payload = Command::from(control(f32::INFINITY, f32::NAN, f32::NEG_INFINITY))
            .encode()
            .unwrap();
        let decoded = decode_control(&payload);

        assert!(close(decoded.iac_max_a, 500.0, 1e-3));
        assert_eq!(decoded.vout_max_v, 0.0);
        assert_eq!(decoded.iout_max_a, 0.0);

        // Above what 16 bits can carry at 0.1 V resolution
        let payload = Command::from(control(0.0, 10_000.0, 0.0)).encode().unwrap();
        assert_eq!(payload[2..5], [0x00, 0xFF, 0xFF]);
    }

    #[test]
    fn control_round_trips_within_half_a_step() {
        let mut step = 0u32;

        while step <= 65_535 {
            let value = step as f32 * 0.1;

            let payload = Command::from(control(value.min(500.0), value, value.min(1500.0)))
                .encode()
                .unwrap();
            let decoded = decode_control(&payload);

            assert!(close(decoded.iac_max_a, value.min(500.0), 0.05));
            assert!(close(decoded.vout_max_v, value, 0.05));
            assert!(close(decoded.iout_max_a, value.min(1500.0), 0.05));

            step += 7;
        }

        // Values between steps
        for value in [0.04f32, 0.06, 12.34, 359.96, 499.99] {
            let decoded = decode_control(&Command::from(control(value, value, value)).encode().unwrap());

            assert!(close(decoded.iac_max_a, value, 0.05), "{value}");
            assert!(close(decoded.vout_max_v, value, 0.05), "{value}");
            assert!(close(decoded.iout_max_a, value, 0.05), "{value}");
        }
    }

    #[test]
    fn request_round_trips() {
        for request in [
            Request::fault_active(),
            Request::fault_passive(),
            Request::software_version(),
            Request::serial_number(),
        ] {
            let payload = Command::from(request).encode().unwrap();

            assert_eq!(
                DecodedMessage::decode(0x61B, &payload),
                Ok(DecodedMessage::Request(request))
            );
            assert!(request.kind.message_id().is_some());
        }
    }

    #[test]
    fn encode_frames() {
        let frame = Command::from(Request::software_version()).to_frame().unwrap();

        assert_eq!(frame.id(), Id::Standard(StandardId::new(0x61B).unwrap()));
        assert_eq!(frame.dlc(), 4);
        assert_eq!(frame.data(), [0x80, 0x00, 0x06, 0x1E]);

        let frame = Command::from(control(16.0, 360.0, 17.0)).to_frame().unwrap();
        assert_eq!(frame.raw_id(), 0x618);
        assert_eq!(frame.dlc(), 8);
    }

    #[test]
    fn encode_by_signal_name() {
        let payload = encode_signals(
            0x618,
            &[
                ("can_enable", SignalValue::Flag(true)),
                ("iac_max", SignalValue::Physical(16.0)),
                ("vout_max", SignalValue::Physical(360.0)),
                ("iout_max", SignalValue::Physical(17.0)),
            ],
        );

        assert_eq!(
            payload.as_deref(),
            Ok(&[0x80, 0x00, 0xA0, 0x0E, 0x10, 0x00, 0xAA, 0x00][..])
        );

        assert_eq!(
            encode_signals(0x611, &[]),
            Err(EncodeError::NotACommand(MessageId::ActualValues1))
        );
        assert_eq!(
            encode_signals(0x700, &[]),
            Err(EncodeError::UnknownMessageId(0x700))
        );
        assert_eq!(
            encode_signals(0x618, &[("vout", SignalValue::Physical(1.0))]),
            Err(EncodeError::UnknownSignal { id: 0x618 })
        );
    }

    #[test]
    fn encode_by_signal_name_checks_value_kinds() {
        assert_eq!(
            encode_signals(0x618, &[("iac_max", SignalValue::Raw(0xFFFF))]),
            Err(EncodeError::SignalTypeMismatch {
                id: 0x618,
                signal: "iac_max",
            })
        );
        assert_eq!(
            encode_signals(
                0x618,
                &[
                    ("can_enable", SignalValue::Flag(true)),
                    ("led3", SignalValue::Ascii(AsciiBlock::new([0; 8]))),
                ],
            ),
            Err(EncodeError::SignalTypeMismatch {
                id: 0x618,
                signal: "led3",
            })
        );

        // Physical values past the documented range still clamp to 500 A
        let payload = encode_signals(0x618, &[("iac_max", SignalValue::Physical(1e9))]).unwrap();
        assert_eq!(payload[..3], [0x00, 0x13, 0x88]);

        let payload = encode_signals(
            0x618,
            &[
                ("can_enable", SignalValue::Flag(true)),
                ("led3", SignalValue::Flag(true)),
            ],
        )
        .unwrap();
        assert_eq!(payload[0], 0x88);
    }
}
