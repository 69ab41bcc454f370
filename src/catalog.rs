//! Signal layout of every message exchanged between the charger and the BMS.
//!
//! Start bits use the protocol numbering: global bit `b` is bit `b % 8` of
//! byte `b / 8`. Multi-byte quantities are big-endian on the wire.

use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::{
    sentinel::SentinelRule,
    signal::{Linear, Signal, SignalValue},
    DecodeError,
};

/// Every 11-bit identifier in the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[num_enum(error_type(name = DecodeError, constructor = DecodeError::UnknownMessageId))]
#[repr(u16)]
pub enum MessageId {
    Status = 0x610,
    ActualValues1 = 0x611,
    ActualValues2 = 0x614,
    TestDiagnostic1 = 0x615,
    ChargerConfig = 0x616,
    Control = 0x618,
    Request = 0x61B,
    FaultPassive = 0x61C,
    FaultActive = 0x61D,
    SoftwareVersion = 0x61E,
    SerialNumber = 0x61F,
    AcCurrents = 0x712,
    Temperatures = 0x713,
    FanTempOutputCurrents = 0x714,
    ServiceDiagnostic = 0x715,
}

impl MessageId {
    pub const ALL: [MessageId; 15] = [
        Self::Status,
        Self::ActualValues1,
        Self::ActualValues2,
        Self::TestDiagnostic1,
        Self::ChargerConfig,
        Self::Control,
        Self::Request,
        Self::FaultPassive,
        Self::FaultActive,
        Self::SoftwareVersion,
        Self::SerialNumber,
        Self::AcCurrents,
        Self::Temperatures,
        Self::FanTempOutputCurrents,
        Self::ServiceDiagnostic,
    ];

    pub fn definition(self) -> &'static MessageDefinition {
        match self {
            Self::Status => &STATUS,
            Self::ActualValues1 => &ACTUAL_VALUES_1,
            Self::ActualValues2 => &ACTUAL_VALUES_2,
            Self::TestDiagnostic1 => &TEST_DIAGNOSTIC_1,
            Self::ChargerConfig => &CHARGER_CONFIG,
            Self::Control => &CONTROL,
            Self::Request => &REQUEST,
            Self::FaultPassive => &FAULT_PASSIVE,
            Self::FaultActive => &FAULT_ACTIVE,
            Self::SoftwareVersion => &SOFTWARE_VERSION,
            Self::SerialNumber => &SERIAL_NUMBER,
            Self::AcCurrents => &AC_CURRENTS,
            Self::Temperatures => &TEMPERATURES,
            Self::FanTempOutputCurrents => &FAN_TEMP_OUTPUT_CURRENTS,
            Self::ServiceDiagnostic => &SERVICE_DIAGNOSTIC,
        }
    }

    pub fn raw(self) -> u16 {
        self.into()
    }
}

/// Which side of the link transmits a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    ChargerToBms,
    BmsToCharger,
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MessageDefinition {
    pub id: MessageId,
    pub name: &'static str,
    pub direction: Direction,
    /// Exact payload length (DLC) in bytes
    pub length: usize,
    pub signals: &'static [Signal],
    pub sentinel: Option<SentinelRule>,
}

impl MessageDefinition {
    pub fn signal(&self, name: &str) -> Option<&'static Signal> {
        self.signals.iter().find(|signal| signal.name == name)
    }

    pub fn validate_length(&self, payload: &[u8]) -> Result<(), DecodeError> {
        if payload.len() != self.length {
            return Err(DecodeError::MalformedPayload {
                id: self.id.raw(),
                expected: self.length,
                actual: payload.len(),
            });
        }

        Ok(())
    }

    /// Decodes every signal of the message in declaration order, without
    /// applying the sentinel rule.
    pub fn decode_signals<'a>(
        &'static self,
        payload: &'a [u8],
    ) -> Result<impl Iterator<Item = (&'static str, SignalValue)> + 'a, DecodeError> {
        self.validate_length(payload)?;

        Ok(self
            .signals
            .iter()
            .map(move |signal| (signal.name, signal.decode(payload))))
    }
}

/// Looks up the definition of a raw identifier.
pub fn lookup(id: u16) -> Result<&'static MessageDefinition, DecodeError> {
    Ok(MessageId::try_from(id)?.definition())
}

pub fn definitions() -> impl Iterator<Item = &'static MessageDefinition> {
    MessageId::ALL.into_iter().map(MessageId::definition)
}

/* Shared scalings */

const fn tenths(max: f32) -> Linear {
    Linear::new(0.1, 0.0, 0.0, max)
}

const TEMPERATURE: Linear = Linear::new(0.005188, -40.0, -40.0, 300.0);

/* Signal tables */

pub mod control {
    use super::*;

    pub const CAN_ENABLE: Signal = Signal::flag("can_enable", 7);
    pub const LED3: Signal = Signal::flag("led3", 3);
    pub const IAC_MAX: Signal = Signal::linear("iac_max", 15, 16, tenths(500.0));
    pub const VOUT_MAX: Signal = Signal::linear("vout_max", 31, 16, tenths(10_000.0));
    pub const IOUT_MAX: Signal = Signal::linear("iout_max", 47, 16, tenths(1_500.0));

    pub const SIGNALS: &[Signal] = &[CAN_ENABLE, LED3, IAC_MAX, VOUT_MAX, IOUT_MAX];
}

pub mod status {
    use super::*;

    pub const POWER_ENABLE: Signal = Signal::flag("power_enable", 7);
    pub const ERROR_LATCH: Signal = Signal::flag("error_latch", 6);
    pub const WARN_LIMIT: Signal = Signal::flag("warn_limit", 5);
    pub const LIM_TEMP: Signal = Signal::flag("lim_temp", 3);
    pub const WARNING_HV: Signal = Signal::flag("warning_hv", 1);
    pub const BULKS: Signal = Signal::flag("bulks", 0);

    pub const SIGNALS: &[Signal] = &[
        POWER_ENABLE,
        ERROR_LATCH,
        WARN_LIMIT,
        LIM_TEMP,
        WARNING_HV,
        BULKS,
    ];
}

pub mod actual_values_1 {
    use super::*;

    pub const IAC: Signal = Signal::linear("iac", 7, 16, tenths(6553.5));
    pub const TEMP: Signal = Signal::linear("temp", 23, 16, TEMPERATURE);
    pub const VOUT: Signal = Signal::linear("vout", 39, 16, tenths(6553.5));
    pub const IOUT: Signal = Signal::linear("iout", 55, 16, tenths(6553.5));

    pub const SIGNALS: &[Signal] = &[IAC, TEMP, VOUT, IOUT];
}

pub mod actual_values_2 {
    use super::*;

    pub const TEMP_LOGIC_LV: Signal = Signal::linear("temp_logic_lv", 7, 16, TEMPERATURE);
    pub const AC_POWER: Signal =
        Signal::linear("ac_power", 23, 16, Linear::new(0.01, 0.0, 0.0, 655.35));
    pub const PROX_LIMIT: Signal = Signal::linear("prox_limit", 39, 16, tenths(6553.5));
    pub const PILOT_LIMIT: Signal = Signal::linear("pilot_limit", 55, 16, tenths(6553.5));

    pub const SIGNALS: &[Signal] = &[TEMP_LOGIC_LV, AC_POWER, PROX_LIMIT, PILOT_LIMIT];
}

pub mod test_diagnostic_1 {
    use super::*;

    pub const AC_OK: Signal = Signal::flag("ac_ok", 7);
    pub const PRECHARGE_COMPLETE: Signal = Signal::flag("precharge_complete", 6);
    pub const POWER_OK: Signal = Signal::flag("power_ok", 5);
    pub const VOUT_OK: Signal = Signal::flag("vout_ok", 4);
    pub const NEUTRAL: Signal = Signal::flag("neutral", 3);
    pub const LED3: Signal = Signal::flag("led3", 2);
    pub const LED618: Signal = Signal::flag("led618", 1);

    pub const OVER_VOLTAGE: Signal = Signal::flag("over_voltage", 15);
    pub const CONNECTOR_OPEN: Signal = Signal::flag("connector_open", 14);
    pub const THERMAL_FAIL: Signal = Signal::flag("thermal_fail", 10);
    pub const RX618_FAIL: Signal = Signal::flag("rx618_fail", 8);

    pub const BULK1_FAIL: Signal = Signal::flag("bulk1_fail", 23);
    pub const BULK2_FAIL: Signal = Signal::flag("bulk2_fail", 22);
    pub const BULK3_FAIL: Signal = Signal::flag("bulk3_fail", 21);
    pub const PUMP_ON: Signal = Signal::flag("pump_on", 20);
    pub const FAN_ON: Signal = Signal::flag("fan_on", 19);
    pub const HV_RX_FAIL: Signal = Signal::flag("hv_rx_fail", 18);
    pub const COOLING_FAIL: Signal = Signal::flag("cooling_fail", 17);
    pub const RX619_FAIL: Signal = Signal::flag("rx619_fail", 16);

    pub const NEUTRO1: Signal = Signal::flag("neutro1", 31);
    pub const NEUTRO2: Signal = Signal::flag("neutro2", 30);
    pub const THREE_PHASE: Signal = Signal::flag("three_phase", 29);
    pub const IAC_FAIL: Signal = Signal::flag("iac_fail", 26);
    pub const IGNITION: Signal = Signal::flag("ignition", 25);
    pub const LV_BATTERY_MISSING: Signal = Signal::flag("lv_battery_missing", 24);

    pub const PROX_OK: Signal = Signal::flag("prox_ok", 39);
    pub const PILOT_OK: Signal = Signal::flag("pilot_ok", 37);
    pub const S2_OK: Signal = Signal::flag("s2_ok", 35);

    pub const HOURS: Signal = Signal::raw("hours", 55, 16);

    pub const SIGNALS: &[Signal] = &[
        AC_OK,
        PRECHARGE_COMPLETE,
        POWER_OK,
        VOUT_OK,
        NEUTRAL,
        LED3,
        LED618,
        OVER_VOLTAGE,
        CONNECTOR_OPEN,
        THERMAL_FAIL,
        RX618_FAIL,
        BULK1_FAIL,
        BULK2_FAIL,
        BULK3_FAIL,
        PUMP_ON,
        FAN_ON,
        HV_RX_FAIL,
        COOLING_FAIL,
        RX619_FAIL,
        NEUTRO1,
        NEUTRO2,
        THREE_PHASE,
        IAC_FAIL,
        IGNITION,
        LV_BATTERY_MISSING,
        PROX_OK,
        PILOT_OK,
        S2_OK,
        HOURS,
    ];
}

pub mod request {
    use super::*;

    pub const ENABLE: Signal = Signal::flag("enable", 7);
    /// Identifier of the requested message: D2 is always 0x06, D3 the low byte
    pub const REQUESTED_ID: Signal = Signal::enumerated("requested_id", 23, 16);

    pub const SIGNALS: &[Signal] = &[ENABLE, REQUESTED_ID];
}

pub mod fault {
    use super::*;

    pub const FRAME_TYPE: Signal = Signal::enumerated("frame_type", 7, 2);
    pub const TOTAL_ERRORS: Signal = Signal::raw("total_errors", 5, 6);
    pub const FRAME_NUMBER: Signal = Signal::raw("frame_number", 15, 6);
    pub const FAULT_CODE: Signal = Signal::enumerated("fault_code", 23, 8);
    pub const OCCURRENCE: Signal = Signal::raw("occurrence", 31, 6);
    pub const FAILURE_LEVEL: Signal = Signal::enumerated("failure_level", 25, 2);
    pub const FIRST_TIME: Signal = Signal::raw("first_time", 39, 16);
    pub const LAST_TIME: Signal = Signal::raw("last_time", 55, 16);

    pub const SIGNALS: &[Signal] = &[
        FRAME_TYPE,
        TOTAL_ERRORS,
        FRAME_NUMBER,
        FAULT_CODE,
        OCCURRENCE,
        FAILURE_LEVEL,
        FIRST_TIME,
        LAST_TIME,
    ];
}

pub mod identity {
    use super::*;

    pub const TEXT: Signal = Signal::ascii("text", 7);

    pub const SIGNALS: &[Signal] = &[TEXT];
}

pub mod charger_config {
    use super::*;

    pub const BAUDRATE: Signal = Signal::enumerated("baudrate", 7, 2);
    pub const ID_TYPE: Signal = Signal::enumerated("id_type", 5, 1);
    pub const IAC_CONTROL: Signal = Signal::enumerated("iac_control", 4, 2);
    pub const RANGE: Signal = Signal::enumerated("range", 2, 2);
    pub const THREE_PHASE: Signal = Signal::flag("three_phase", 0);

    pub const SLAVE: Signal = Signal::flag("slave", 15);
    pub const EVC_MODEL: Signal = Signal::enumerated("evc_model", 14, 1);
    pub const ID_SETTING: Signal = Signal::raw("id_setting", 13, 4);
    pub const PARALLEL_CTRL: Signal = Signal::flag("parallel_ctrl", 9);
    pub const AIR_COOLER: Signal = Signal::flag("air_cooler", 8);

    pub const IACM_MAX: Signal = Signal::linear("iacm_max", 23, 8, Linear::new(0.2, 0.0, 0.0, 51.0));
    pub const VOUT_MAX: Signal = Signal::linear("vout_max", 31, 16, tenths(1_000.0));
    pub const IOUT_MAX: Signal = Signal::linear("iout_max", 47, 16, tenths(150.0));
    pub const PASSWORD: Signal = Signal::raw("password", 63, 8);

    pub const SIGNALS: &[Signal] = &[
        BAUDRATE,
        ID_TYPE,
        IAC_CONTROL,
        RANGE,
        THREE_PHASE,
        SLAVE,
        EVC_MODEL,
        ID_SETTING,
        PARALLEL_CTRL,
        AIR_COOLER,
        IACM_MAX,
        VOUT_MAX,
        IOUT_MAX,
        PASSWORD,
    ];
}

pub mod ac_currents {
    use super::*;

    pub const FAN_VOLTAGE: Signal = Signal::linear("fan_voltage", 7, 16, tenths(30.0));
    pub const IACM1: Signal = Signal::linear("iacm1", 23, 16, tenths(50.0));
    pub const IACM2: Signal = Signal::linear("iacm2", 39, 16, tenths(50.0));
    pub const IACM3: Signal = Signal::linear("iacm3", 55, 16, tenths(50.0));

    pub const SIGNALS: &[Signal] = &[FAN_VOLTAGE, IACM1, IACM2, IACM3];
}

pub mod temperatures {
    use super::*;

    pub const LOGIC_HV: Signal = Signal::linear("logic_hv", 7, 16, TEMPERATURE);
    pub const POWER1: Signal = Signal::linear("power1", 23, 16, TEMPERATURE);
    pub const POWER2: Signal = Signal::linear("power2", 39, 16, TEMPERATURE);
    pub const POWER3: Signal = Signal::linear("power3", 55, 16, TEMPERATURE);

    pub const SIGNALS: &[Signal] = &[LOGIC_HV, POWER1, POWER2, POWER3];
}

pub mod fan_temp_output_currents {
    use super::*;

    pub const TEMP_FAN: Signal = Signal::linear("temp_fan", 7, 16, TEMPERATURE);
    pub const IOUT1: Signal = Signal::raw("iout1", 23, 16);
    pub const IOUT2: Signal = Signal::raw("iout2", 39, 16);
    pub const IOUT3: Signal = Signal::raw("iout3", 55, 16);

    pub const SIGNALS: &[Signal] = &[TEMP_FAN, IOUT1, IOUT2, IOUT3];
}

pub mod service_diagnostic {
    use super::*;

    pub const PFC_ENABLE: Signal = Signal::flag("pfc_enable", 2);

    pub const LOGIC_TEMP_HIGH: Signal = Signal::flag("logic_temp_high", 13);
    pub const LOGIC_TEMP_LOW: Signal = Signal::flag("logic_temp_low", 12);
    pub const UVLO_LOGIC: Signal = Signal::flag("uvlo_logic", 11);
    pub const THERMAL_LOW_FAIL: Signal = Signal::flag("thermal_low_fail", 10);
    pub const RX618_FAIL: Signal = Signal::flag("rx618_fail", 8);

    pub const BULK1_FAIL: Signal = Signal::flag("bulk1_fail", 23);
    pub const BULK2_FAIL: Signal = Signal::flag("bulk2_fail", 22);
    pub const BULK3_FAIL: Signal = Signal::flag("bulk3_fail", 21);
    pub const COOLING1_FAIL: Signal = Signal::flag("cooling1_fail", 20);
    pub const COOLING2_FAIL: Signal = Signal::flag("cooling2_fail", 19);
    pub const COOLING3_FAIL: Signal = Signal::flag("cooling3_fail", 18);

    pub const UVLO_LOGIC_LV: Signal = Signal::flag("uvlo_logic_lv", 27);
    pub const BATTERY_OVER: Signal = Signal::flag("battery_over", 25);
    pub const BATTERY_UNDER: Signal = Signal::flag("battery_under", 24);

    pub const SIGNALS: &[Signal] = &[
        PFC_ENABLE,
        LOGIC_TEMP_HIGH,
        LOGIC_TEMP_LOW,
        UVLO_LOGIC,
        THERMAL_LOW_FAIL,
        RX618_FAIL,
        BULK1_FAIL,
        BULK2_FAIL,
        BULK3_FAIL,
        COOLING1_FAIL,
        COOLING2_FAIL,
        COOLING3_FAIL,
        UVLO_LOGIC_LV,
        BATTERY_OVER,
        BATTERY_UNDER,
    ];
}

/* Message definitions */

const fn charger_message(
    id: MessageId,
    name: &'static str,
    length: usize,
    signals: &'static [Signal],
) -> MessageDefinition {
    MessageDefinition {
        id,
        name,
        direction: Direction::ChargerToBms,
        length,
        signals,
        sentinel: None,
    }
}

const fn fault_message(id: MessageId, name: &'static str) -> MessageDefinition {
    MessageDefinition {
        sentinel: Some(SentinelRule::NO_FAULT_STORED),
        ..charger_message(id, name, 8, fault::SIGNALS)
    }
}

static CONTROL: MessageDefinition = MessageDefinition {
    id: MessageId::Control,
    name: "CTL",
    direction: Direction::BmsToCharger,
    length: 8,
    signals: control::SIGNALS,
    sentinel: None,
};

static REQUEST: MessageDefinition = MessageDefinition {
    id: MessageId::Request,
    name: "REQ",
    direction: Direction::BmsToCharger,
    length: 4,
    signals: request::SIGNALS,
    sentinel: None,
};

static STATUS: MessageDefinition = charger_message(MessageId::Status, "STAT", 4, status::SIGNALS);
static ACTUAL_VALUES_1: MessageDefinition =
    charger_message(MessageId::ActualValues1, "ACT1", 8, actual_values_1::SIGNALS);
static ACTUAL_VALUES_2: MessageDefinition =
    charger_message(MessageId::ActualValues2, "ACT2", 8, actual_values_2::SIGNALS);
static TEST_DIAGNOSTIC_1: MessageDefinition =
    charger_message(MessageId::TestDiagnostic1, "TST1", 8, test_diagnostic_1::SIGNALS);
static CHARGER_CONFIG: MessageDefinition =
    charger_message(MessageId::ChargerConfig, "TST2", 8, charger_config::SIGNALS);
static FAULT_PASSIVE: MessageDefinition = fault_message(MessageId::FaultPassive, "FLTP");
static FAULT_ACTIVE: MessageDefinition = fault_message(MessageId::FaultActive, "FLTA");
static SOFTWARE_VERSION: MessageDefinition =
    charger_message(MessageId::SoftwareVersion, "SW", 8, identity::SIGNALS);
static SERIAL_NUMBER: MessageDefinition =
    charger_message(MessageId::SerialNumber, "SN", 8, identity::SIGNALS);
static AC_CURRENTS: MessageDefinition =
    charger_message(MessageId::AcCurrents, "ACT3", 8, ac_currents::SIGNALS);
static TEMPERATURES: MessageDefinition =
    charger_message(MessageId::Temperatures, "TEMP", 8, temperatures::SIGNALS);
static FAN_TEMP_OUTPUT_CURRENTS: MessageDefinition = charger_message(
    MessageId::FanTempOutputCurrents,
    "ACT4",
    8,
    fan_temp_output_currents::SIGNALS,
);
static SERVICE_DIAGNOSTIC: MessageDefinition =
    charger_message(MessageId::ServiceDiagnostic, "STST1", 8, service_diagnostic::SIGNALS);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::{max_raw, AsciiBlock, Encoding};

    fn footprint(signal: &Signal) -> [u8; 8] {
        let mut buffer = [0u8; 8];

        match signal.encoding {
            Encoding::Ascii => {
                assert!(signal.encode(SignalValue::Ascii(AsciiBlock::new([0xFF; 8])), &mut buffer))
            }
            _ => signal.write_raw(&mut buffer, max_raw(signal.length)),
        }

        buffer
    }

    #[test]
    fn signals_never_overlap_or_exceed_length() {
        for definition in definitions() {
            let mut occupied = [0u8; 8];

            for signal in definition.signals {
                let (_, end) = signal.byte_span();
                assert!(
                    end <= definition.length,
                    "{} overruns {}",
                    signal.name,
                    definition.name
                );

                let bits = footprint(signal);
                for (taken, new) in occupied.iter_mut().zip(bits) {
                    assert_eq!(
                        *taken & new,
                        0,
                        "{} overlaps in {}",
                        signal.name,
                        definition.name
                    );
                    *taken |= new;
                }
            }
        }
    }

    #[test]
    fn lookup_every_identifier() {
        for id in MessageId::ALL {
            let definition = lookup(id.raw()).unwrap();
            assert_eq!(definition.id, id);
            assert!(id.raw() <= 0x7FF);
        }

        assert_eq!(lookup(0x617), Err(DecodeError::UnknownMessageId(0x617)));
        assert_eq!(lookup(0x000), Err(DecodeError::UnknownMessageId(0x000)));
        assert_eq!(definitions().count(), 15);
    }

    #[test]
    fn directions_and_lengths() {
        let commands: heapless::Vec<MessageId, 15> = definitions()
            .filter(|definition| definition.direction == Direction::BmsToCharger)
            .map(|definition| definition.id)
            .collect();

        assert_eq!(commands, [MessageId::Control, MessageId::Request]);
        assert_eq!(MessageId::Status.definition().length, 4);
        assert_eq!(MessageId::Request.definition().length, 4);
        assert_eq!(MessageId::Temperatures.definition().length, 8);
    }

    #[test]
    fn only_fault_messages_have_a_sentinel() {
        for definition in definitions() {
            let is_fault = matches!(definition.id, MessageId::FaultActive | MessageId::FaultPassive);
            assert_eq!(definition.sentinel.is_some(), is_fault, "{}", definition.name);
        }
    }

    #[test]
    fn signal_count_per_message() {
        assert_eq!(MessageId::TestDiagnostic1.definition().signals.len(), 29);
        assert_eq!(MessageId::ServiceDiagnostic.definition().signals.len(), 15);
        assert_eq!(MessageId::ChargerConfig.definition().signals.len(), 14);
        assert!(MessageId::Control.definition().signal("vout_max").is_some());
        assert!(MessageId::Control.definition().signal("vout").is_none());
    }

    #[test]
    fn decode_signals_generically() {
        let payload = [0x30, 0xF7, 0x30, 0xF7, 0x30, 0xF7, 0x30, 0xF7];
        let definition = MessageId::Temperatures.definition();

        let mut count = 0;
        for (name, value) in definition.decode_signals(&payload).unwrap() {
            match value {
                SignalValue::Physical(celsius) => assert!((celsius - 25.03).abs() < 0.01, "{name}"),
                other => panic!("{name} decoded as {other:?}"),
            }
            count += 1;
        }
        assert_eq!(count, 4);

        assert!(matches!(
            definition.decode_signals(&payload[..4]),
            Err(DecodeError::MalformedPayload {
                id: 0x713,
                expected: 8,
                actual: 4
            })
        ));
    }
}
