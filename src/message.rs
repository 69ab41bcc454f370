use embedded_can::{Frame, Id};

use crate::{
    catalog::{
        self, ac_currents, actual_values_1, actual_values_2, fan_temp_output_currents, identity,
        service_diagnostic, status, temperatures, test_diagnostic_1, MessageDefinition, MessageId,
    },
    command::{Control, Request},
    fault::{FaultRecord, FaultReport},
    setup::ChargerConfig,
    signal::AsciiBlock,
};

/// A frame decoded into engineering units, one variant per catalog message
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DecodedMessage {
    Control(Control),
    Status(Status),
    ActualValues1(ActualValues1),
    ActualValues2(ActualValues2),
    TestDiagnostic1(TestDiagnostic1),
    Request(Request),
    FaultPassive(FaultReport),
    FaultActive(FaultReport),
    SoftwareVersion(AsciiBlock),
    SerialNumber(AsciiBlock),
    ChargerConfig(ChargerConfig),
    AcCurrents(AcCurrents),
    Temperatures(Temperatures),
    ServiceDiagnostic(ServiceDiagnostic),
    FanTempOutputCurrents(FanTempOutputCurrents),
}

/// Reasons a frame could not be decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DecodeError {
    #[error("Received a frame with an identifier ({0:#05X}) that is not in the catalog")]
    UnknownMessageId(u16),
    #[error("Received a frame with an extended identifier ({0:#010X}), the charger only uses 11-bit identifiers")]
    ExtendedId(u32),
    #[error("Received message {id:#05X} with {actual} bytes of data but it carries exactly {expected}")]
    MalformedPayload {
        id: u16,
        expected: usize,
        actual: usize,
    },
}

impl DecodedMessage {
    /// Decodes `payload` as the message identified by `id`.
    ///
    /// The payload length must match the catalog length exactly. Fault frames
    /// whose bytes D1..=D7 are all 0xFF decode as
    /// [`FaultReport::NoFaultDetected`] whatever D0 holds.
    pub fn decode(id: u16, payload: &[u8]) -> Result<Self, DecodeError> {
        let definition = catalog::lookup(id).inspect_err(|_| {
            warn!("dropping frame with unknown identifier {:#x}", id);
        })?;

        definition.validate_length(payload).inspect_err(|_| {
            warn!(
                "dropping frame {:#x}: expected {} bytes, got {}",
                id,
                definition.length,
                payload.len()
            );
        })?;

        Ok(match definition.id {
            MessageId::Control => Self::Control(Control::from_payload(payload)),
            MessageId::Status => Self::Status(Status::from_payload(payload)),
            MessageId::ActualValues1 => Self::ActualValues1(ActualValues1::from_payload(payload)),
            MessageId::ActualValues2 => Self::ActualValues2(ActualValues2::from_payload(payload)),
            MessageId::TestDiagnostic1 => {
                Self::TestDiagnostic1(TestDiagnostic1::from_payload(payload))
            }
            MessageId::Request => Self::Request(Request::from_payload(payload)),
            MessageId::FaultPassive => Self::FaultPassive(fault_report(definition, payload)),
            MessageId::FaultActive => Self::FaultActive(fault_report(definition, payload)),
            MessageId::SoftwareVersion => {
                Self::SoftwareVersion(identity::TEXT.read_ascii(payload))
            }
            MessageId::SerialNumber => Self::SerialNumber(identity::TEXT.read_ascii(payload)),
            MessageId::ChargerConfig => Self::ChargerConfig(ChargerConfig::from_payload(payload)),
            MessageId::AcCurrents => Self::AcCurrents(AcCurrents::from_payload(payload)),
            MessageId::Temperatures => Self::Temperatures(Temperatures::from_payload(payload)),
            MessageId::ServiceDiagnostic => {
                Self::ServiceDiagnostic(ServiceDiagnostic::from_payload(payload))
            }
            MessageId::FanTempOutputCurrents => {
                Self::FanTempOutputCurrents(FanTempOutputCurrents::from_payload(payload))
            }
        })
    }

    /// Decodes a frame received through any `embedded-can` driver.
    pub fn from_frame(frame: &impl Frame) -> Result<Self, DecodeError> {
        match frame.id() {
            Id::Standard(id) => Self::decode(id.as_raw(), frame.data()),
            Id::Extended(id) => Err(DecodeError::ExtendedId(id.as_raw())),
        }
    }

    pub fn id(&self) -> MessageId {
        match self {
            Self::Control(_) => MessageId::Control,
            Self::Status(_) => MessageId::Status,
            Self::ActualValues1(_) => MessageId::ActualValues1,
            Self::ActualValues2(_) => MessageId::ActualValues2,
            Self::TestDiagnostic1(_) => MessageId::TestDiagnostic1,
            Self::Request(_) => MessageId::Request,
            Self::FaultPassive(_) => MessageId::FaultPassive,
            Self::FaultActive(_) => MessageId::FaultActive,
            Self::SoftwareVersion(_) => MessageId::SoftwareVersion,
            Self::SerialNumber(_) => MessageId::SerialNumber,
            Self::ChargerConfig(_) => MessageId::ChargerConfig,
            Self::AcCurrents(_) => MessageId::AcCurrents,
            Self::Temperatures(_) => MessageId::Temperatures,
            Self::ServiceDiagnostic(_) => MessageId::ServiceDiagnostic,
            Self::FanTempOutputCurrents(_) => MessageId::FanTempOutputCurrents,
        }
    }
}

fn fault_report(definition: &MessageDefinition, payload: &[u8]) -> FaultReport {
    if definition.sentinel.is_some_and(|rule| rule.matches(payload)) {
        trace!("{=str}: no fault stored", definition.name);
        return FaultReport::NoFaultDetected;
    }

    FaultReport::Fault(FaultRecord::from_payload(payload))
}

/// STAT, sent by the charger every 1000 ms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Status {
    /// Hardware enable pin active
    pub power_enable: bool,
    /// A failure occurred and is latched
    pub error_latch: bool,
    pub warn_limit: bool,
    /// De-rating active
    pub lim_temp: bool,
    pub warning_hv: bool,
    /// Bulk capacitor error
    pub bulks: bool,
}

impl Status {
    pub(crate) fn from_payload(payload: &[u8]) -> Self {
        Self {
            power_enable: status::POWER_ENABLE.read_flag(payload),
            error_latch: status::ERROR_LATCH.read_flag(payload),
            warn_limit: status::WARN_LIMIT.read_flag(payload),
            lim_temp: status::LIM_TEMP.read_flag(payload),
            warning_hv: status::WARNING_HV.read_flag(payload),
            bulks: status::BULKS.read_flag(payload),
        }
    }
}

/// ACT1, sent by the charger every 100 ms
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ActualValues1 {
    pub iac_a: f32,
    /// Power stage temperature
    pub temp_c: f32,
    pub vout_v: f32,
    pub iout_a: f32,
}

impl ActualValues1 {
    pub(crate) fn from_payload(payload: &[u8]) -> Self {
        Self {
            iac_a: actual_values_1::IAC.read_physical(payload),
            temp_c: actual_values_1::TEMP.read_physical(payload),
            vout_v: actual_values_1::VOUT.read_physical(payload),
            iout_a: actual_values_1::IOUT.read_physical(payload),
        }
    }

    pub fn output_power_w(&self) -> f32 {
        self.vout_v * self.iout_a
    }
}

/// ACT2, sent by the charger every 1000 ms
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ActualValues2 {
    pub temp_logic_lv_c: f32,
    pub ac_power_kw: f32,
    /// AC current limit derived from the proximity resistor
    pub prox_limit_a: f32,
    /// AC current limit derived from the pilot duty cycle
    pub pilot_limit_a: f32,
}

impl ActualValues2 {
    pub(crate) fn from_payload(payload: &[u8]) -> Self {
        Self {
            temp_logic_lv_c: actual_values_2::TEMP_LOGIC_LV.read_physical(payload),
            ac_power_kw: actual_values_2::AC_POWER.read_physical(payload),
            prox_limit_a: actual_values_2::PROX_LIMIT.read_physical(payload),
            pilot_limit_a: actual_values_2::PILOT_LIMIT.read_physical(payload),
        }
    }
}

/// TST1 status and error flags plus the operating hours counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TestDiagnostic1 {
    pub ac_ok: bool,
    pub precharge_complete: bool,
    pub power_ok: bool,
    pub vout_ok: bool,
    pub neutral: bool,
    pub led3: bool,
    pub led618: bool,
    pub over_voltage: bool,
    pub connector_open: bool,
    pub thermal_fail: bool,
    /// No control message for more than 600 ms
    pub rx618_fail: bool,
    pub bulk1_fail: bool,
    pub bulk2_fail: bool,
    pub bulk3_fail: bool,
    pub pump_on: bool,
    pub fan_on: bool,
    pub hv_rx_fail: bool,
    pub cooling_fail: bool,
    pub rx619_fail: bool,
    pub neutro1: bool,
    pub neutro2: bool,
    pub three_phase: bool,
    pub iac_fail: bool,
    pub ignition: bool,
    pub lv_battery_missing: bool,
    pub prox_ok: bool,
    pub pilot_ok: bool,
    pub s2_ok: bool,
    pub hours: u16,
}

impl TestDiagnostic1 {
    pub(crate) fn from_payload(payload: &[u8]) -> Self {
        use test_diagnostic_1::*;

        Self {
            ac_ok: AC_OK.read_flag(payload),
            precharge_complete: PRECHARGE_COMPLETE.read_flag(payload),
            power_ok: POWER_OK.read_flag(payload),
            vout_ok: VOUT_OK.read_flag(payload),
            neutral: NEUTRAL.read_flag(payload),
            led3: LED3.read_flag(payload),
            led618: LED618.read_flag(payload),
            over_voltage: OVER_VOLTAGE.read_flag(payload),
            connector_open: CONNECTOR_OPEN.read_flag(payload),
            thermal_fail: THERMAL_FAIL.read_flag(payload),
            rx618_fail: RX618_FAIL.read_flag(payload),
            bulk1_fail: BULK1_FAIL.read_flag(payload),
            bulk2_fail: BULK2_FAIL.read_flag(payload),
            bulk3_fail: BULK3_FAIL.read_flag(payload),
            pump_on: PUMP_ON.read_flag(payload),
            fan_on: FAN_ON.read_flag(payload),
            hv_rx_fail: HV_RX_FAIL.read_flag(payload),
            cooling_fail: COOLING_FAIL.read_flag(payload),
            rx619_fail: RX619_FAIL.read_flag(payload),
            neutro1: NEUTRO1.read_flag(payload),
            neutro2: NEUTRO2.read_flag(payload),
            three_phase: THREE_PHASE.read_flag(payload),
            iac_fail: IAC_FAIL.read_flag(payload),
            ignition: IGNITION.read_flag(payload),
            lv_battery_missing: LV_BATTERY_MISSING.read_flag(payload),
            prox_ok: PROX_OK.read_flag(payload),
            pilot_ok: PILOT_OK.read_flag(payload),
            s2_ok: S2_OK.read_flag(payload),
            hours: HOURS.read_raw(payload) as u16,
        }
    }
}

/// ACT3, AC input current of each power module
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AcCurrents {
    pub fan_voltage_v: f32,
    pub iacm1_a: f32,
    pub iacm2_a: f32,
    pub iacm3_a: f32,
}

impl AcCurrents {
    pub(crate) fn from_payload(payload: &[u8]) -> Self {
        Self {
            fan_voltage_v: ac_currents::FAN_VOLTAGE.read_physical(payload),
            iacm1_a: ac_currents::IACM1.read_physical(payload),
            iacm2_a: ac_currents::IACM2.read_physical(payload),
            iacm3_a: ac_currents::IACM3.read_physical(payload),
        }
    }

    pub fn total_a(&self) -> f32 {
        self.iacm1_a + self.iacm2_a + self.iacm3_a
    }
}

/// Thermal sensors of the logic board and the three power stages
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Temperatures {
    pub logic_hv_c: f32,
    pub power1_c: f32,
    pub power2_c: f32,
    pub power3_c: f32,
}

impl Temperatures {
    pub(crate) fn from_payload(payload: &[u8]) -> Self {
        Self {
            logic_hv_c: temperatures::LOGIC_HV.read_physical(payload),
            power1_c: temperatures::POWER1.read_physical(payload),
            power2_c: temperatures::POWER2.read_physical(payload),
            power3_c: temperatures::POWER3.read_physical(payload),
        }
    }

    pub fn hottest_power_stage_c(&self) -> f32 {
        self.power1_c.max(self.power2_c).max(self.power3_c)
    }
}

/// STST1, extra real time diagnostic flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ServiceDiagnostic {
    pub pfc_enable: bool,
    pub logic_temp_high: bool,
    pub logic_temp_low: bool,
    /// Under voltage lockout on the logic supply
    pub uvlo_logic: bool,
    /// Sensor reads -40 °C
    pub thermal_low_fail: bool,
    pub rx618_fail: bool,
    pub bulk1_fail: bool,
    pub bulk2_fail: bool,
    pub bulk3_fail: bool,
    pub cooling1_fail: bool,
    pub cooling2_fail: bool,
    pub cooling3_fail: bool,
    pub uvlo_logic_lv: bool,
    /// Always-hot battery above 32 V
    pub battery_over: bool,
    /// Always-hot battery below 8 V
    pub battery_under: bool,
}

impl ServiceDiagnostic {
    pub(crate) fn from_payload(payload: &[u8]) -> Self {
        use service_diagnostic::*;

        Self {
            pfc_enable: PFC_ENABLE.read_flag(payload),
            logic_temp_high: LOGIC_TEMP_HIGH.read_flag(payload),
            logic_temp_low: LOGIC_TEMP_LOW.read_flag(payload),
            uvlo_logic: UVLO_LOGIC.read_flag(payload),
            thermal_low_fail: THERMAL_LOW_FAIL.read_flag(payload),
            rx618_fail: RX618_FAIL.read_flag(payload),
            bulk1_fail: BULK1_FAIL.read_flag(payload),
            bulk2_fail: BULK2_FAIL.read_flag(payload),
            bulk3_fail: BULK3_FAIL.read_flag(payload),
            cooling1_fail: COOLING1_FAIL.read_flag(payload),
            cooling2_fail: COOLING2_FAIL.read_flag(payload),
            cooling3_fail: COOLING3_FAIL.read_flag(payload),
            uvlo_logic_lv: UVLO_LOGIC_LV.read_flag(payload),
            battery_over: BATTERY_OVER.read_flag(payload),
            battery_under: BATTERY_UNDER.read_flag(payload),
        }
    }
}

/// ACT4, fan side temperature and the raw output current channels
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FanTempOutputCurrents {
    pub temp_fan_c: f32,
    pub iout1_raw: u16,
    pub iout2_raw: u16,
    pub iout3_raw: u16,
}

impl FanTempOutputCurrents {
    pub(crate) fn from_payload(payload: &[u8]) -> Self {
        Self {
            temp_fan_c: fan_temp_output_currents::TEMP_FAN.read_physical(payload),
            iout1_raw: fan_temp_output_currents::IOUT1.read_raw(payload) as u16,
            iout2_raw: fan_temp_output_currents::IOUT2.read_raw(payload) as u16,
            iout3_raw: fan_temp_output_currents::IOUT3.read_raw(payload) as u16,
        }
    }
}

#[cfg(test)]
mod tests {
    use embedded_can::{ExtendedId, StandardId};

    use super::*;
    use crate::{
        fault::{FailureLevel, FaultCode, FrameType},
        generator::tests::XorShift,
        decode_as_each_message, FrameGenerator, RawFrame, RequestKind,
    };

    fn close(a: f32, b: f32, tolerance: f32) -> bool {
        (a - b).abs() <= tolerance
    }

    #[test]
    fn decode_errors() {
        assert_eq!(
            DecodedMessage::decode(0x600, &[0; 8]),
            Err(DecodeError::UnknownMessageId(0x600))
        );

        assert_eq!(
            DecodedMessage::decode(0x611, &[0; 4]),
            Err(DecodeError::MalformedPayload {
                id: 0x611,
                expected: 8,
                actual: 4
            })
        );

        assert_eq!(
            DecodedMessage::decode(0x610, &[0; 8]),
            Err(DecodeError::MalformedPayload {
                id: 0x610,
                expected: 4,
                actual: 8
            })
        );

        assert_eq!(
            DecodedMessage::decode(0x61D, &[]),
            Err(DecodeError::MalformedPayload {
                id: 0x61D,
                expected: 8,
                actual: 0
            })
        );
    }

    #[test]
    fn decode_status() {
        let message = DecodedMessage::decode(0x610, &[0b1100_1001, 0, 0, 0]).unwrap();

        assert_eq!(
            message,
            DecodedMessage::Status(Status {
                power_enable: true,
                error_latch: true,
                warn_limit: false,
                lim_temp: true,
                warning_hv: false,
                bulks: true,
            })
        );

        // Unused bits 4 and 2 are ignored
        assert_eq!(
            DecodedMessage::decode(0x610, &[0b0001_0100, 0xFF, 0xFF, 0xFF]),
            Ok(DecodedMessage::Status(Status::default()))
        );
    }

    #[test]
    fn decode_actual_values() {
        let Ok(DecodedMessage::ActualValues1(act1)) = DecodedMessage::decode(
            0x611,
            &[0x00, 0xA0, 0x30, 0xF7, 0x0E, 0x10, 0x00, 0xAA],
        ) else {
            panic!("expected ACT1");
        };

        assert!(close(act1.iac_a, 16.0, 1e-3));
        assert!(close(act1.temp_c, 25.03, 0.01));
        assert!(close(act1.vout_v, 360.0, 1e-3));
        assert!(close(act1.iout_a, 17.0, 1e-3));
        assert!(close(act1.output_power_w(), 6120.0, 0.5));

        let Ok(DecodedMessage::ActualValues2(act2)) = DecodedMessage::decode(
            0x614,
            &[0x1E, 0x1B, 0x02, 0xBC, 0x01, 0x40, 0x00, 0xA0],
        ) else {
            panic!("expected ACT2");
        };

        // 7707 * 0.005188 - 40
        assert!(close(act2.temp_logic_lv_c, -0.0161, 0.01));
        assert!(close(act2.ac_power_kw, 7.0, 1e-3));
        assert!(close(act2.prox_limit_a, 32.0, 1e-3));
        assert!(close(act2.pilot_limit_a, 16.0, 1e-3));
    }

    #[test]
    fn decode_test_diagnostic() {
        let Ok(DecodedMessage::TestDiagnostic1(tst)) = DecodedMessage::decode(
            0x615,
            &[0b1000_0010, 0b0100_0001, 0b1000_1000, 0b0010_0001, 0b1010_1000, 0xFF, 0x01, 0x2C],
        ) else {
            panic!("expected TST1");
        };

        assert_eq!(
            tst,
            TestDiagnostic1 {
                ac_ok: true,
                led618: true,
                connector_open: true,
                rx618_fail: true,
                bulk1_fail: true,
                fan_on: true,
                three_phase: true,
                lv_battery_missing: true,
                prox_ok: true,
                pilot_ok: true,
                s2_ok: true,
                hours: 300,
                ..Default::default()
            }
        );
    }

    #[test]
    fn decode_documented_fault() {
        assert_eq!(
            DecodedMessage::decode(0x61D, &[0x41, 0x01, 0xA8, 0x17, 0x00, 0x1E, 0x00, 0x78]),
            Ok(DecodedMessage::FaultActive(FaultReport::Fault(FaultRecord {
                frame_type: FrameType::Single,
                total_errors: 1,
                frame_number: 0,
                fault_code: FaultCode::ColdPlateTempHigh,
                occurrence: 5,
                failure_level: FailureLevel::Hard,
                first_time_h: 30,
                last_time_h: 120,
            })))
        );
    }

    #[test]
    fn sentinel_short_circuits_fault_decoding() {
        let no_fault = [0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF];

        assert_eq!(
            DecodedMessage::decode(0x61D, &no_fault),
            Ok(DecodedMessage::FaultActive(FaultReport::NoFaultDetected))
        );
        assert_eq!(
            DecodedMessage::decode(0x61C, &no_fault),
            Ok(DecodedMessage::FaultPassive(FaultReport::NoFaultDetected))
        );
        assert_eq!(
            DecodedMessage::decode(0x61C, &[0x7E, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]),
            Ok(DecodedMessage::FaultPassive(FaultReport::NoFaultDetected))
        );

        // The same bytes mean nothing special to other messages
        let Ok(DecodedMessage::FanTempOutputCurrents(act4)) = DecodedMessage::decode(0x714, &no_fault)
        else {
            panic!("expected ACT4");
        };
        assert_eq!(act4.iout1_raw, 0xFFFF);
    }

    #[test]
    fn undocumented_failure_level_is_explicit() {
        let Ok(DecodedMessage::FaultPassive(FaultReport::Fault(record))) =
            DecodedMessage::decode(0x61C, &[0x81, 0x04, 0x42, 0x05, 0x00, 0x01, 0x00, 0x02])
        else {
            panic!("expected a passive fault record");
        };

        assert_eq!(record.failure_level, FailureLevel::Unknown(0b01));
        assert_eq!(record.fault_code, FaultCode::Unknown(0x42));
        assert_eq!(record.frame_type, FrameType::Multi);
        assert_eq!(record.frame_number, 1);
    }

    #[test]
    fn decode_identity_strings() {
        let Ok(DecodedMessage::SoftwareVersion(version)) = DecodedMessage::decode(0x61E, b"SW3225A5")
        else {
            panic!("expected SW");
        };
        assert_eq!(version.as_str(), Ok("SW3225A5"));

        let serial = [0x00, 0x80, 0xFF, 0x41, 0x42, 0x43, 0x44, 0x45];
        assert_eq!(
            DecodedMessage::decode(0x61F, &serial),
            Ok(DecodedMessage::SerialNumber(AsciiBlock::new(serial)))
        );
    }

    #[test]
    fn decode_service_messages() {
        let Ok(DecodedMessage::AcCurrents(act3)) = DecodedMessage::decode(
            0x712,
            &[0x00, 0x78, 0x00, 0x64, 0x00, 0x64, 0x00, 0x64],
        ) else {
            panic!("expected ACT3");
        };
        assert!(close(act3.fan_voltage_v, 12.0, 1e-3));
        assert!(close(act3.iacm1_a, 10.0, 1e-3));
        assert!(close(act3.total_a(), 30.0, 1e-3));

        let Ok(DecodedMessage::Temperatures(temps)) = DecodedMessage::decode(
            0x713,
            &[0x30, 0xF7, 0x30, 0xF7, 0x30, 0xF7, 0x30, 0xF7],
        ) else {
            panic!("expected TEMP");
        };
        for celsius in [temps.logic_hv_c, temps.power1_c, temps.power2_c, temps.power3_c] {
            assert!(close(celsius, 25.0, 0.05));
        }

        let Ok(DecodedMessage::Temperatures(temps)) = DecodedMessage::decode(
            0x713,
            &[0x00, 0x00, 0x30, 0xF7, 0x40, 0x00, 0x30, 0xF7],
        ) else {
            panic!("expected TEMP");
        };
        assert!(close(temps.logic_hv_c, -40.0, 1e-4));
        assert_eq!(temps.hottest_power_stage_c(), temps.power2_c);

        let Ok(DecodedMessage::FanTempOutputCurrents(act4)) = DecodedMessage::decode(
            0x714,
            &[0x30, 0xF7, 0x00, 0x01, 0x12, 0x34, 0xFF, 0xFE],
        ) else {
            panic!("expected ACT4");
        };
        assert!(close(act4.temp_fan_c, 25.0, 0.05));
        assert_eq!((act4.iout1_raw, act4.iout2_raw, act4.iout3_raw), (1, 0x1234, 0xFFFE));
    }

    #[test]
    fn decode_service_diagnostic_flags() {
        assert_eq!(
            DecodedMessage::decode(0x715, &[0x04, 0, 0, 0, 0, 0, 0, 0]),
            Ok(DecodedMessage::ServiceDiagnostic(ServiceDiagnostic {
                pfc_enable: true,
                ..Default::default()
            }))
        );

        // Every documented bit set, undocumented bits clear
        let Ok(DecodedMessage::ServiceDiagnostic(flags)) = DecodedMessage::decode(
            0x715,
            &[0b0000_0100, 0b0011_1101, 0b1111_1100, 0b0000_1011, 0, 0, 0, 0],
        ) else {
            panic!("expected STST1");
        };
        assert!(
            flags.pfc_enable
                && flags.logic_temp_high
                && flags.logic_temp_low
                && flags.uvlo_logic
                && flags.thermal_low_fail
                && flags.rx618_fail
                && flags.bulk1_fail
                && flags.bulk2_fail
                && flags.bulk3_fail
                && flags.cooling1_fail
                && flags.cooling2_fail
                && flags.cooling3_fail
                && flags.uvlo_logic_lv
                && flags.battery_over
                && flags.battery_under
        );

        // Undocumented bits alone decode to nothing
        assert_eq!(
            DecodedMessage::decode(0x715, &[0b1111_1011, 0b1100_0010, 0b0000_0011, 0b1111_0100, 0xFF, 0xFF, 0xFF, 0xFF]),
            Ok(DecodedMessage::ServiceDiagnostic(ServiceDiagnostic::default()))
        );
    }

    #[test]
    fn decode_host_messages() {
        let message = DecodedMessage::decode(0x618, &[0x80, 0x00, 0xA0, 0x0E, 0x10, 0x00, 0xAA, 0x00]).unwrap();
        let DecodedMessage::Control(control) = message else {
            panic!("expected CTL");
        };
        assert!(control.can_enable);
        assert!(!control.led3);
        assert!(close(control.iac_max_a, 16.0, 1e-3));
        assert!(close(control.vout_max_v, 360.0, 1e-3));
        assert!(close(control.iout_max_a, 17.0, 1e-3));

        assert_eq!(
            DecodedMessage::decode(0x61B, &[0x80, 0x00, 0x06, 0x1E]),
            Ok(DecodedMessage::Request(Request {
                enable: true,
                kind: RequestKind::SoftwareVersion,
            }))
        );
        assert_eq!(
            DecodedMessage::decode(0x61B, &[0x00, 0x00, 0x07, 0x1E]),
            Ok(DecodedMessage::Request(Request {
                enable: false,
                kind: RequestKind::Unknown(0x071E),
            }))
        );
    }

    #[test]
    fn decode_from_embedded_can_frames() {
        let frame = RawFrame::new(StandardId::new(0x610).unwrap(), &[0x80, 0, 0, 0]).unwrap();
        let message = DecodedMessage::from_frame(&frame).unwrap();

        assert_eq!(message.id(), MessageId::Status);

        let frame = RawFrame::new(StandardId::new(0x6FF).unwrap(), &[0; 8]).unwrap();
        assert_eq!(
            DecodedMessage::from_frame(&frame),
            Err(DecodeError::UnknownMessageId(0x6FF))
        );

        assert_eq!(
            DecodedMessage::from_frame(&ExtendedFrame),
            Err(DecodeError::ExtendedId(0x18FF50E5))
        );
    }

    #[test]
    fn decoded_id_matches_catalog() {
        for id in MessageId::ALL {
            let payload = [0u8; 8];
            let length = id.definition().length;
            let message = DecodedMessage::decode(id.raw(), &payload[..length]).unwrap();

            assert_eq!(message.id(), id);
        }
    }

    #[test]
    fn decoding_never_fails_on_random_payloads() {
        let mut generator = FrameGenerator::new(XorShift(0x2545_F491_4F6C_DD1D));

        for _ in 0..2_000 {
            for id in MessageId::ALL {
                let frame = generator.next_frame(id);
                assert!(DecodedMessage::from_frame(&frame).is_ok());
            }

            let payload = generator.next_payload();
            assert!(decode_as_each_message(&payload).all(|(_, decoded)| decoded.is_ok()));
        }
    }

    struct ExtendedFrame;

    impl Frame for ExtendedFrame {
        fn new(_id: impl Into<Id>, _data: &[u8]) -> Option<Self> {
            None
        }

        fn new_remote(_id: impl Into<Id>, _dlc: usize) -> Option<Self> {
            None
        }

        fn is_extended(&self) -> bool {
            true
        }

        fn is_remote_frame(&self) -> bool {
            false
        }

        fn id(&self) -> Id {
            Id::Extended(ExtendedId::new(0x18FF50E5).unwrap())
        }

        fn dlc(&self) -> usize {
            8
        }

        fn data(&self) -> &[u8] {
            &[0; 8]
        }
    }
}
