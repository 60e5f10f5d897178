//! FCAS trapezium geometry (§3, §4.3).
use crate::service::Service;
use crate::unit::DispatchType;
use serde::Deserialize;

fn default_dispatch_type() -> DispatchType {
    DispatchType::default_dispatch_type()
}

/// An FCAS trapezium for one (unit, dispatch_type, service): the feasible
/// region for joint energy/FCAS dispatch.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FcasTrapezium {
    pub unit: String,
    #[serde(default = "default_dispatch_type")]
    pub dispatch_type: DispatchType,
    pub service: Service,
    pub max_availability: f64,
    pub enablement_min: f64,
    pub low_break_point: f64,
    pub high_break_point: f64,
    pub enablement_max: f64,
}

impl FcasTrapezium {
    /// `(enablement_max - high_break_point) / max_availability`.
    pub fn upper_slope_coefficient(&self) -> f64 {
        (self.enablement_max - self.high_break_point) / self.max_availability
    }

    /// `(low_break_point - enablement_min) / max_availability`.
    pub fn lower_slope_coefficient(&self) -> f64 {
        (self.low_break_point - self.enablement_min) / self.max_availability
    }
}
