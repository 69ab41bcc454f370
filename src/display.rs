//! Human readable rendering of decoded messages. Nothing here performs I/O;
//! callers decide where the text goes.

use core::fmt::{self, Display, Formatter};

use crate::{
    catalog::{Direction, MessageId},
    command::{Command, Control, Request, RequestKind},
    fault::{FailureLevel, FaultCode, FaultRecord, FaultReport, FrameType},
    frame::{RawFrame, TraceDirection, TraceLine},
    message::{
        AcCurrents, ActualValues1, ActualValues2, DecodedMessage, FanTempOutputCurrents,
        ServiceDiagnostic, Status, Temperatures, TestDiagnostic1,
    },
    setup::{Baudrate, ChargerConfig, EvcModel, IacControl, IdType, VoltageRange},
    signal::{AsciiBlock, SignalValue},
};

/// Renders a byte slice as `[80, 00, A0]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HexBytes<'a>(pub &'a [u8]);

impl Display for HexBytes<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, byte) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{byte:02X}")?;
        }
        f.write_str("]")
    }
}

/// Writes the names of the flags that are set, or `none`.
fn write_flags(f: &mut Formatter<'_>, flags: &[(&str, bool)]) -> fmt::Result {
    let mut any = false;

    for (name, _) in flags.iter().filter(|(_, set)| *set) {
        if any {
            f.write_str(" ")?;
        }
        f.write_str(name)?;
        any = true;
    }

    if !any {
        f.write_str("none")?;
    }

    Ok(())
}

/* Enumerations */

impl Display for MessageId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:#05X})", self.definition().name, self.raw())
    }
}

impl Display for Direction {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ChargerToBms => "charger -> BMS",
            Self::BmsToCharger => "BMS -> charger",
        })
    }
}

impl Display for FrameType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single => f.write_str("single frame"),
            Self::Multi => f.write_str("multi frame"),
            Self::Unknown(raw) => write!(f, "unknown frame type ({raw:#04b})"),
        }
    }
}

impl Display for FailureLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => f.write_str("Warning"),
            Self::Soft => f.write_str("Soft failure"),
            Self::Hard => f.write_str("Hard failure"),
            Self::Unknown(raw) => write!(f, "Unknown level ({raw:#04b})"),
        }
    }
}

impl Display for FaultCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:#04X})", self.name(), u8::from(*self))
    }
}

impl Display for Baudrate {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Rate500Kbit => "500 Kbit/s",
            Self::Rate250Kbit => "250 Kbit/s",
            Self::Rate125Kbit => "125 Kbit/s",
            Self::Rate1Mbit => "1 Mbit/s",
            Self::Unknown(_) => "Unknown",
        })
    }
}

impl Display for IdType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Standard => "Standard 11bit",
            Self::Extended => "Extended 29bit",
            Self::Unknown(_) => "Unknown",
        })
    }
}

impl Display for IacControl {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NotControlled => "Not controlled (HW set)",
            Self::SaeJ1772 => "SAE J1772 Enabled",
            Self::En61851 => "EN61851 Enabled",
            Self::Id618 => "AC current controlled by ID618",
            Self::Unknown(_) => "Unknown",
        })
    }
}

impl Display for VoltageRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::R4 => "R4 (EVO Users Manual)",
            Self::R3 => "R3",
            Self::R2 => "R2",
            Self::R1 => "R1",
            Self::Unknown(_) => "Unknown",
        })
    }
}

impl Display for EvcModel {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Evo11k => "EVO11K (liquid)",
            Self::Evo22k => "EVO22K (air)",
            Self::Unknown(_) => "Unknown",
        })
    }
}

impl Display for RequestKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.message_id() {
            Some(id) => id.fmt(f),
            None => write!(f, "unknown ({:#06X})", u16::from(*self)),
        }
    }
}

impl Display for TraceDirection {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Rx => "Rx",
            Self::Tx => "Tx",
        })
    }
}

/* Values */

impl Display for AsciiBlock {
    /// Printable ASCII up to the first NUL, anything else shown as `.`
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for byte in self.as_bytes().iter().take_while(|b| **b != 0) {
            let c = if byte.is_ascii_graphic() || *byte == b' ' {
                *byte as char
            } else {
                '.'
            };
            write!(f, "{c}")?;
        }

        Ok(())
    }
}

impl Display for SignalValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flag(flag) => flag.fmt(f),
            Self::Physical(value) => write!(f, "{value:.2}"),
            Self::Raw(raw) => raw.fmt(f),
            Self::Enumerated(raw) => write!(f, "{raw:#X}"),
            Self::Ascii(block) => write!(f, "\"{block}\""),
        }
    }
}

impl Display for RawFrame {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        use embedded_can::Frame;

        write!(f, "{:03X} {}", self.raw_id(), HexBytes(self.data()))
    }
}

impl Display for TraceLine {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for byte in self.as_bytes() {
            write!(f, "{}", byte as char)?;
        }

        Ok(())
    }
}

/* Messages */

impl Display for Control {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CTL enable={} led3={} iac_max={:.1} A vout_max={:.1} V iout_max={:.1} A",
            self.can_enable, self.led3, self.iac_max_a, self.vout_max_v, self.iout_max_a
        )
    }
}

impl Display for Request {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "REQ enable={} requested={}", self.enable, self.kind)
    }
}

impl Display for Command {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Control(control) => control.fmt(f),
            Self::Request(request) => request.fmt(f),
        }
    }
}

impl Display for Status {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("STAT ")?;
        write_flags(
            f,
            &[
                ("power_enable", self.power_enable),
                ("error_latch", self.error_latch),
                ("warn_limit", self.warn_limit),
                ("lim_temp", self.lim_temp),
                ("warning_hv", self.warning_hv),
                ("bulks", self.bulks),
            ],
        )
    }
}

impl Display for ActualValues1 {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ACT1 iac={:.1} A temp={:.1} °C vout={:.1} V iout={:.1} A power={:.1} W",
            self.iac_a,
            self.temp_c,
            self.vout_v,
            self.iout_a,
            self.output_power_w()
        )
    }
}

impl Display for ActualValues2 {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ACT2 temp_logic_lv={:.1} °C ac_power={:.2} kW prox_limit={:.1} A pilot_limit={:.1} A",
            self.temp_logic_lv_c, self.ac_power_kw, self.prox_limit_a, self.pilot_limit_a
        )
    }
}

impl Display for TestDiagnostic1 {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "TST1 hours={} flags=", self.hours)?;
        write_flags(
            f,
            &[
                ("ac_ok", self.ac_ok),
                ("precharge_complete", self.precharge_complete),
                ("power_ok", self.power_ok),
                ("vout_ok", self.vout_ok),
                ("neutral", self.neutral),
                ("led3", self.led3),
                ("led618", self.led618),
                ("over_voltage", self.over_voltage),
                ("connector_open", self.connector_open),
                ("thermal_fail", self.thermal_fail),
                ("rx618_fail", self.rx618_fail),
                ("bulk1_fail", self.bulk1_fail),
                ("bulk2_fail", self.bulk2_fail),
                ("bulk3_fail", self.bulk3_fail),
                ("pump_on", self.pump_on),
                ("fan_on", self.fan_on),
                ("hv_rx_fail", self.hv_rx_fail),
                ("cooling_fail", self.cooling_fail),
                ("rx619_fail", self.rx619_fail),
                ("neutro1", self.neutro1),
                ("neutro2", self.neutro2),
                ("three_phase", self.three_phase),
                ("iac_fail", self.iac_fail),
                ("ignition", self.ignition),
                ("lv_battery_missing", self.lv_battery_missing),
                ("prox_ok", self.prox_ok),
                ("pilot_ok", self.pilot_ok),
                ("s2_ok", self.s2_ok),
            ],
        )
    }
}

impl Display for ChargerConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TST2 {}, {}, {}, {}, {}, iacm_max={:.1} A vout_max={:.1} V iout_max={:.1} A",
            self.baudrate,
            self.id_type,
            self.iac_control,
            self.range,
            self.evc_model,
            self.iacm_max_a,
            self.vout_max_v,
            self.iout_max_a
        )?;

        f.write_str(if self.three_phase { ", three phase" } else { ", single phase" })?;

        if self.is_single_charger() {
            f.write_str(", single charger")?;
        } else {
            write!(f, ", id {}", self.id_setting)?;
        }

        if self.slave {
            f.write_str(", slave")?;
        }
        if self.parallel_ctrl {
            f.write_str(", parallel control")?;
        }
        if self.air_cooler {
            f.write_str(", air cooled")?;
        }

        write!(f, ", password={:#04X}", self.password)?;
        if self.has_factory_password() {
            f.write_str(" (factory default)")?;
        }

        Ok(())
    }
}

impl Display for FaultRecord {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}, {} occurrence(s), first at {} h, last at {} h, {} {} of {}",
            self.fault_code,
            self.failure_level,
            self.occurrence,
            self.first_time_h,
            self.last_time_h,
            self.frame_type,
            self.frame_number,
            self.total_errors
        )
    }
}

impl Display for FaultReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoFaultDetected => f.write_str("No fault detected"),
            Self::Fault(record) => record.fmt(f),
        }
    }
}

impl Display for AcCurrents {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ACT3 fan={:.1} V iacm1={:.1} A iacm2={:.1} A iacm3={:.1} A",
            self.fan_voltage_v, self.iacm1_a, self.iacm2_a, self.iacm3_a
        )
    }
}

impl Display for Temperatures {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TEMP logic_hv={:.1} °C power1={:.1} °C power2={:.1} °C power3={:.1} °C",
            self.logic_hv_c, self.power1_c, self.power2_c, self.power3_c
        )
    }
}

impl Display for FanTempOutputCurrents {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ACT4 temp_fan={:.1} °C iout1={} iout2={} iout3={}",
            self.temp_fan_c, self.iout1_raw, self.iout2_raw, self.iout3_raw
        )
    }
}

impl Display for ServiceDiagnostic {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("STST1 ")?;
        write_flags(
            f,
            &[
                ("pfc_enable", self.pfc_enable),
                ("logic_temp_high", self.logic_temp_high),
                ("logic_temp_low", self.logic_temp_low),
                ("uvlo_logic", self.uvlo_logic),
                ("thermal_low_fail", self.thermal_low_fail),
                ("rx618_fail", self.rx618_fail),
                ("bulk1_fail", self.bulk1_fail),
                ("bulk2_fail", self.bulk2_fail),
                ("bulk3_fail", self.bulk3_fail),
                ("cooling1_fail", self.cooling1_fail),
                ("cooling2_fail", self.cooling2_fail),
                ("cooling3_fail", self.cooling3_fail),
                ("uvlo_logic_lv", self.uvlo_logic_lv),
                ("battery_over", self.battery_over),
                ("battery_under", self.battery_under),
            ],
        )
    }
}

impl Display for DecodedMessage {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Control(message) => message.fmt(f),
            Self::Status(message) => message.fmt(f),
            Self::ActualValues1(message) => message.fmt(f),
            Self::ActualValues2(message) => message.fmt(f),
            Self::TestDiagnostic1(message) => message.fmt(f),
            Self::Request(message) => message.fmt(f),
            Self::FaultPassive(report) => write!(f, "FLTP {report}"),
            Self::FaultActive(report) => write!(f, "FLTA {report}"),
            Self::SoftwareVersion(text) => write!(f, "SW {text}"),
            Self::SerialNumber(text) => write!(f, "SN {text}"),
            Self::ChargerConfig(message) => message.fmt(f),
            Self::AcCurrents(message) => message.fmt(f),
            Self::Temperatures(message) => message.fmt(f),
            Self::ServiceDiagnostic(message) => message.fmt(f),
            Self::FanTempOutputCurrents(message) => message.fmt(f),
        }
    }
}
