//! Unit identity: dispatch type, region and loss factor.
use serde::Deserialize;
use serde_string_enum::{DeserializeLabeledStringEnum, SerializeLabeledStringEnum};

/// Which side of the market a unit row represents.
///
/// A "bidirectional" unit appears twice in `unit_info`, once as a generator
/// and once as a load, sharing SCADA ramp rates and forming a composite ramp
/// envelope (§4.3).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, SerializeLabeledStringEnum, DeserializeLabeledStringEnum,
)]
pub enum DispatchType {
    #[string = "generator"]
    Generator,
    #[string = "load"]
    Load,
}

impl DispatchType {
    /// Default dispatch type for rows that omit the column.
    pub fn default_dispatch_type() -> Self {
        Self::Generator
    }
}

fn default_dispatch_type() -> DispatchType {
    DispatchType::default_dispatch_type()
}

fn default_loss_factor() -> f64 {
    1.0
}

/// A single (unit, dispatch_type) row from the unit info table.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UnitInfo {
    /// Unit identifier. Shared between the generator and load rows of a
    /// bidirectional unit.
    pub unit: String,
    /// The region this (unit, dispatch_type) row belongs to.
    pub region: String,
    /// Which side of the unit this row represents.
    #[serde(default = "default_dispatch_type")]
    pub dispatch_type: DispatchType,
    /// Scales bid cost toward the regional reference node.
    #[serde(default = "default_loss_factor")]
    pub loss_factor: f64,
}

impl UnitInfo {
    /// Whether this row is the generator side of its unit.
    pub fn is_generator(&self) -> bool {
        self.dispatch_type == DispatchType::Generator
    }
}
