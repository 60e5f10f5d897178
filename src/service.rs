//! The tradeable services a unit can offer: energy and the ten FCAS
//! services.
use serde_string_enum::{DeserializeLabeledStringEnum, SerializeLabeledStringEnum};

/// One of the eleven services a bid band can be denominated in.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, SerializeLabeledStringEnum, DeserializeLabeledStringEnum,
)]
pub enum Service {
    #[string = "energy"]
    Energy,
    #[string = "raise_reg"]
    RaiseReg,
    #[string = "lower_reg"]
    LowerReg,
    #[string = "raise_6s"]
    Raise6Sec,
    #[string = "raise_60s"]
    Raise60Sec,
    #[string = "raise_5min"]
    Raise5Min,
    #[string = "lower_6s"]
    Lower6Sec,
    #[string = "lower_60s"]
    Lower60Sec,
    #[string = "lower_5min"]
    Lower5Min,
    #[string = "raise_1s"]
    Raise1Sec,
    #[string = "lower_1s"]
    Lower1Sec,
}

impl Service {
    /// Default service for bid rows that omit the `service` column.
    pub fn default_service() -> Self {
        Self::Energy
    }

    /// Whether this is one of the two regulation services.
    pub fn is_regulation(self) -> bool {
        matches!(self, Self::RaiseReg | Self::LowerReg)
    }

    /// "Contingency" services: FCAS minus the two regulation services.
    pub fn is_contingency(self) -> bool {
        self.is_fcas() && !self.is_regulation()
    }

    /// "FCAS" services: every service except energy.
    pub fn is_fcas(self) -> bool {
        self != Self::Energy
    }

    /// Whether this is a raise-direction service (energy excluded).
    pub fn is_raise(self) -> bool {
        matches!(
            self,
            Self::RaiseReg | Self::Raise6Sec | Self::Raise60Sec | Self::Raise5Min | Self::Raise1Sec
        )
    }

    /// Whether this is a lower-direction service (energy excluded).
    pub fn is_lower(self) -> bool {
        self.is_fcas() && !self.is_raise()
    }
}
