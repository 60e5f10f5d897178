//! The shared constraint row shape every builder in [`crate::constraints`]
//! emits (§3 "Constraint").
use crate::ids::{ConId, VarId};
use serde_string_enum::{DeserializeLabeledStringEnum, SerializeLabeledStringEnum};

/// The relational type of a linear constraint.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, SerializeLabeledStringEnum, DeserializeLabeledStringEnum,
)]
pub enum ConstraintType {
    #[string = "="]
    Equal,
    #[string = "<="]
    LessEqual,
    #[string = ">="]
    GreaterEqual,
}

impl ConstraintType {
    /// The default type for input rows that omit the column: equality.
    pub fn default_type() -> Self {
        Self::Equal
    }
}

/// One constraint row: id, type, rhs, and which builder created it.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintRow {
    pub id: ConId,
    pub constraint_type: ConstraintType,
    pub rhs: f64,
    pub owner: &'static str,
}

/// One (constraint, variable, coefficient) lhs edge. Multiple rows for the
/// same `(constraint_id, variable_id)` pair sum their coefficients (§4.7).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LhsTerm {
    pub constraint_id: ConId,
    pub variable_id: VarId,
    pub coefficient: f64,
}
