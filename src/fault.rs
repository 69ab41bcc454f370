use num_enum::{FromPrimitive, IntoPrimitive};

use crate::catalog::fault::{
    FAILURE_LEVEL, FAULT_CODE, FIRST_TIME, FRAME_NUMBER, FRAME_TYPE, LAST_TIME, OCCURRENCE,
    TOTAL_ERRORS,
};

/// Whether the fault memory fits in one frame or is split across several
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, FromPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum FrameType {
    Single = 0b01,
    Multi = 0b10,
    #[num_enum(catch_all)]
    Unknown(u8),
}

/// Severity of a stored fault.
///
/// The code `0b01` has no documented meaning and decodes as `Unknown(1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, FromPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum FailureLevel {
    /// Charger keeps working, de-rated
    Warning = 0b00,
    /// Charger stops and restarts once the fault clears
    Soft = 0b10,
    /// Charger stops until AC is disconnected and reconnected
    Hard = 0b11,
    #[num_enum(catch_all)]
    Unknown(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, FromPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum FaultCode {
    Bulk1Voltage = 0xA0,
    Bulk2Voltage = 0xA1,
    Bulk3Voltage = 0xA2,
    BulkError = 0xA3,
    CanRegisters = 0xA4,
    CanCommand = 0xA5,
    ColdPlateTempLow = 0xA6,
    ColdPlateTempDerating = 0xA7,
    ColdPlateTempHigh = 0xA8,
    ColdPlateTempFailed = 0xA9,
    InputCurrentMax = 0xAA,
    HvilInterlock = 0xAB,
    LogicTemperature = 0xAC,
    OutputOvervoltage = 0xAD,
    #[num_enum(catch_all)]
    Unknown(u8),
}

impl FaultCode {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Bulk1Voltage => "Bulk 1 Voltage",
            Self::Bulk2Voltage => "Bulk 2 Voltage",
            Self::Bulk3Voltage => "Bulk 3 Voltage",
            Self::BulkError => "Bulk Error",
            Self::CanRegisters => "CAN Registers",
            Self::CanCommand => "CAN Command",
            Self::ColdPlateTempLow => "Cold Plate Temp LOW",
            Self::ColdPlateTempDerating => "Cold Plate Temp DERATING",
            Self::ColdPlateTempHigh => "Cold Plate Temp HIGH",
            Self::ColdPlateTempFailed => "Cold Plate Temp FAILED",
            Self::InputCurrentMax => "Input Current MAX",
            Self::HvilInterlock => "HVIL Interlock Loop",
            Self::LogicTemperature => "Logic Temperature",
            Self::OutputOvervoltage => "Output Overvoltage",
            Self::Unknown(_) => "Unknown Fault",
        }
    }
}

/// One entry of the charger's fault memory (active or passive)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FaultRecord {
    pub frame_type: FrameType,
    pub total_errors: u8,
    pub frame_number: u8,
    pub fault_code: FaultCode,
    pub occurrence: u8,
    pub failure_level: FailureLevel,
    /// Operating hours when the fault was first seen
    pub first_time_h: u16,
    /// Operating hours when the fault was last seen
    pub last_time_h: u16,
}

impl FaultRecord {
    pub(crate) fn from_payload(payload: &[u8]) -> Self {
        Self {
            frame_type: FrameType::from(FRAME_TYPE.read_raw(payload) as u8),
            total_errors: TOTAL_ERRORS.read_raw(payload) as u8,
            frame_number: FRAME_NUMBER.read_raw(payload) as u8,
            fault_code: FaultCode::from(FAULT_CODE.read_raw(payload) as u8),
            occurrence: OCCURRENCE.read_raw(payload) as u8,
            failure_level: FailureLevel::from(FAILURE_LEVEL.read_raw(payload) as u8),
            first_time_h: FIRST_TIME.read_raw(payload) as u16,
            last_time_h: LAST_TIME.read_raw(payload) as u16,
        }
    }

    pub fn is_multi_frame(&self) -> bool {
        self.frame_type == FrameType::Multi
    }
}

/// Answer to a fault request: either an empty fault memory or one record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FaultReport {
    NoFaultDetected,
    Fault(FaultRecord),
}

impl FaultReport {
    pub fn record(&self) -> Option<&FaultRecord> {
        match self {
            Self::NoFaultDetected => None,
            Self::Fault(record) => Some(record),
        }
    }
}
