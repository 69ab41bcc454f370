use num_enum::{FromPrimitive, IntoPrimitive};

use crate::catalog::charger_config::{
    AIR_COOLER, BAUDRATE, EVC_MODEL, IACM_MAX, IAC_CONTROL, ID_SETTING, ID_TYPE, IOUT_MAX,
    PARALLEL_CTRL, PASSWORD, RANGE, SLAVE, THREE_PHASE, VOUT_MAX,
};

/// Password the charger ships with
pub const FACTORY_PASSWORD: u8 = 0xA5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, FromPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Baudrate {
    Rate500Kbit = 0,
    Rate250Kbit = 1,
    Rate125Kbit = 2,
    Rate1Mbit = 3,
    #[num_enum(catch_all)]
    Unknown(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, FromPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum IdType {
    /// 11-bit identifiers
    Standard = 0,
    /// 29-bit identifiers
    Extended = 1,
    #[num_enum(catch_all)]
    Unknown(u8),
}

/// How the AC input current limit is decided
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, FromPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum IacControl {
    /// Fixed by hardware
    NotControlled = 0,
    SaeJ1772 = 1,
    En61851 = 2,
    /// Taken from the IacMax field of the control message
    Id618 = 3,
    #[num_enum(catch_all)]
    Unknown(u8),
}

/// Output voltage range the charger was built for
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, FromPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum VoltageRange {
    R4 = 0,
    R3 = 1,
    R2 = 2,
    R1 = 3,
    #[num_enum(catch_all)]
    Unknown(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, FromPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum EvcModel {
    /// Liquid cooled
    Evo11k = 0,
    /// Air cooled
    Evo22k = 1,
    #[num_enum(catch_all)]
    Unknown(u8),
}

/// Setup parameters the charger reports once after power-up (TST2)
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChargerConfig {
    pub baudrate: Baudrate,
    pub id_type: IdType,
    pub iac_control: IacControl,
    pub range: VoltageRange,
    pub three_phase: bool,
    pub slave: bool,
    pub evc_model: EvcModel,
    /// 0 for a single charger, otherwise the charger's address in a parallel group
    pub id_setting: u8,
    pub parallel_ctrl: bool,
    pub air_cooler: bool,
    pub iacm_max_a: f32,
    pub vout_max_v: f32,
    pub iout_max_a: f32,
    pub password: u8,
}

impl ChargerConfig {
    pub(crate) fn from_payload(payload: &[u8]) -> Self {
        Self {
            baudrate: Baudrate::from(BAUDRATE.read_raw(payload) as u8),
            id_type: IdType::from(ID_TYPE.read_raw(payload) as u8),
            iac_control: IacControl::from(IAC_CONTROL.read_raw(payload) as u8),
            range: VoltageRange::from(RANGE.read_raw(payload) as u8),
            three_phase: THREE_PHASE.read_flag(payload),
            slave: SLAVE.read_flag(payload),
            evc_model: EvcModel::from(EVC_MODEL.read_raw(payload) as u8),
            id_setting: ID_SETTING.read_raw(payload) as u8,
            parallel_ctrl: PARALLEL_CTRL.read_flag(payload),
            air_cooler: AIR_COOLER.read_flag(payload),
            iacm_max_a: IACM_MAX.read_physical(payload),
            vout_max_v: VOUT_MAX.read_physical(payload),
            iout_max_a: IOUT_MAX.read_physical(payload),
            password: PASSWORD.read_raw(payload) as u8,
        }
    }

    pub fn is_single_charger(&self) -> bool {
        self.id_setting == 0
    }

    pub fn has_factory_password(&self) -> bool {
        self.password == FACTORY_PASSWORD
    }
}
