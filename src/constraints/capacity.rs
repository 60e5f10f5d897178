//! Capacity (bid availability, UIGF) constraints (§4.3 "Capacity").
use crate::constraint::{ConstraintRow, ConstraintType, LhsTerm};
use crate::ids::IdAllocator;
use crate::service::Service;
use crate::variables::UnitMapEntry;
use serde::Deserialize;
use std::collections::HashMap;

/// As-bid capacity for a unit (optionally split by dispatch_type).
#[derive(Debug, Clone, Deserialize)]
pub struct UnitCapacityRow {
    pub unit: String,
    #[serde(default)]
    pub dispatch_type: Option<crate::unit::DispatchType>,
    pub capacity: f64,
}

/// A UIGF (unconstrained intermittent generation forecast) capacity row,
/// typically tighter than the as-bid capacity for semi-scheduled plant.
#[derive(Debug, Clone, Deserialize)]
pub struct UigfRow {
    pub unit: String,
    pub capacity: f64,
}

/// Build one `≤` capacity constraint per unit, binding the sum of that
/// unit's energy bid variables (with the sign convention already present in
/// `unit_map`, §4.2) to the tighter of its as-bid and UIGF capacity.
pub fn build_capacity_constraints(
    capacities: &[UnitCapacityRow],
    uigf: &[UigfRow],
    unit_map: &[UnitMapEntry],
    alloc: &mut IdAllocator,
) -> (Vec<ConstraintRow>, Vec<LhsTerm>) {
    let mut effective: HashMap<&str, f64> = HashMap::new();
    for row in capacities {
        effective
            .entry(row.unit.as_str())
            .and_modify(|c| *c = c.min(row.capacity))
            .or_insert(row.capacity);
    }
    for row in uigf {
        effective
            .entry(row.unit.as_str())
            .and_modify(|c| *c = c.min(row.capacity))
            .or_insert(row.capacity);
    }

    let mut units: Vec<&str> = effective.keys().copied().collect();
    units.sort_unstable();

    let ids = alloc.alloc_cons(units.len());
    let mut rows = Vec::with_capacity(units.len());
    let mut terms = Vec::new();

    for (unit, id) in units.iter().zip(ids) {
        rows.push(ConstraintRow {
            id,
            constraint_type: ConstraintType::LessEqual,
            rhs: effective[unit],
            owner: "capacity",
        });
        for entry in unit_map.iter().filter(|e| e.unit == *unit && e.service == Service::Energy) {
            terms.push(LhsTerm {
                constraint_id: id,
                variable_id: entry.variable_id,
                coefficient: entry.coefficient,
            });
        }
    }

    (rows, terms)
}
