//! Generic constraint LHS joiner (component G, §4.7): resolves user-specified
//! set-level coefficients against the unit, region and interconnector
//! variable maps built by the other components.
use crate::constraint::{ConstraintRow, LhsTerm};
use crate::generic_constraint::{
    GenericConstraintSet, GenericInterconnectorCoefficient, GenericRegionCoefficient, GenericUnitCoefficient,
};
use crate::ids::{IdAllocator, VarId};
use crate::interconnector::InterconnectorDirection;
use crate::variables::{RegionMapEntry, UnitMapEntry};
use std::collections::HashMap;

/// Build one constraint row per generic constraint set, with lhs terms
/// joined from the three coefficient tables. A (constraint, variable) pair
/// referenced by more than one source row appears as more than one
/// [`LhsTerm`]; summing duplicates is the solver-row builder's job.
#[allow(clippy::too_many_arguments)]
pub fn build_generic_constraint_rows(
    sets: &[GenericConstraintSet],
    unit_coeffs: &[GenericUnitCoefficient],
    region_coeffs: &[GenericRegionCoefficient],
    interconnector_coeffs: &[GenericInterconnectorCoefficient],
    unit_map: &[UnitMapEntry],
    region_map: &[RegionMapEntry],
    flow_vars: &HashMap<String, VarId>,
    directions: &[InterconnectorDirection],
    alloc: &mut IdAllocator,
) -> (Vec<ConstraintRow>, Vec<LhsTerm>) {
    let ids = alloc.alloc_cons(sets.len());
    let mut rows = Vec::with_capacity(sets.len());
    let mut terms = Vec::new();
    let mut con_id_by_set: HashMap<&str, crate::ids::ConId> = HashMap::new();

    for (set, id) in sets.iter().zip(ids) {
        con_id_by_set.insert(set.set.as_str(), id);
        rows.push(ConstraintRow { id, constraint_type: set.constraint_type, rhs: set.rhs, owner: "generic_constraint" });
    }

    for coeff in unit_coeffs {
        let Some(&con_id) = con_id_by_set.get(coeff.set.as_str()) else { continue };
        for entry in unit_map.iter().filter(|e| {
            e.unit == coeff.unit
                && e.service == coeff.service
                && coeff.dispatch_type.is_none_or(|d| d == e.dispatch_type)
        }) {
            terms.push(LhsTerm { constraint_id: con_id, variable_id: entry.variable_id, coefficient: coeff.coefficient });
        }
    }

    for coeff in region_coeffs {
        let Some(&con_id) = con_id_by_set.get(coeff.set.as_str()) else { continue };
        for entry in
            region_map.iter().filter(|e| e.region == coeff.region && e.service == coeff.service)
        {
            terms.push(LhsTerm { constraint_id: con_id, variable_id: entry.variable_id, coefficient: coeff.coefficient });
        }
    }

    for coeff in interconnector_coeffs {
        let Some(&con_id) = con_id_by_set.get(coeff.set.as_str()) else { continue };
        for direction in directions.iter().filter(|d| d.interconnector == coeff.interconnector) {
            let Some(&var_id) = flow_vars.get(&direction.link_id()) else { continue };
            let sign = f64::from(direction.generic_constraint_factor);
            terms.push(LhsTerm { constraint_id: con_id, variable_id: var_id, coefficient: coeff.coefficient * sign });
        }
    }

    (rows, terms)
}
