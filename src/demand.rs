//! Regional demand input (§6).
use serde::Deserialize;

/// Demand for one region in this dispatch interval.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RegionDemand {
    pub region: String,
    pub demand: f64,
}
