/// A payload pattern that carries meaning on its own and must not be decoded
/// signal by signal.
///
/// The rule matches when every byte from `first_byte` to the end of the
/// payload equals `value`; bytes before `first_byte` are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SentinelRule {
    pub first_byte: usize,
    pub value: u8,
}

impl SentinelRule {
    /// Fault frames with D1..=D7 all set to 0xFF report an empty fault memory
    pub const NO_FAULT_STORED: Self = Self {
        first_byte: 1,
        value: 0xFF,
    };

    pub fn matches(&self, payload: &[u8]) -> bool {
        payload.len() > self.first_byte && payload[self.first_byte..].iter().all(|b| *b == self.value)
    }
}
