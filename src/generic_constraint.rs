//! Generic constraint sets and their per-scope coefficient tables (§3, §4.3,
//! §4.7 — component G's inputs).
use crate::constraint::ConstraintType;
use crate::service::Service;
use crate::unit::DispatchType;
use serde::Deserialize;

/// One user-defined generic constraint: a set-id, its relational type and
/// rhs.
#[derive(Debug, Clone, Deserialize)]
pub struct GenericConstraintSet {
    pub set: String,
    #[serde(rename = "type")]
    pub constraint_type: ConstraintType,
    pub rhs: f64,
}

/// Lhs coefficient on a (unit, service, dispatch_type) term of a generic
/// constraint set.
#[derive(Debug, Clone, Deserialize)]
pub struct GenericUnitCoefficient {
    pub set: String,
    pub unit: String,
    pub service: Service,
    #[serde(default)]
    pub dispatch_type: Option<DispatchType>,
    pub coefficient: f64,
}

/// Lhs coefficient on a (region, service) term of a generic constraint set
/// (expands, at solve time, to every unit in that region, §4.7).
#[derive(Debug, Clone, Deserialize)]
pub struct GenericRegionCoefficient {
    pub set: String,
    pub region: String,
    pub service: Service,
    pub coefficient: f64,
}

/// Lhs coefficient on an interconnector term of a generic constraint set.
#[derive(Debug, Clone, Deserialize)]
pub struct GenericInterconnectorCoefficient {
    pub set: String,
    pub interconnector: String,
    pub coefficient: f64,
}

fn default_requirement_type() -> ConstraintType {
    ConstraintType::default_type()
}

/// One row of a regional FCAS requirement set (§4.3 "FCAS requirement").
#[derive(Debug, Clone, Deserialize)]
pub struct FcasRequirementRow {
    pub set: String,
    pub service: Service,
    pub region: String,
    pub volume: f64,
    #[serde(default = "default_requirement_type", rename = "type")]
    pub constraint_type: ConstraintType,
}
