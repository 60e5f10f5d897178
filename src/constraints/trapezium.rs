//! FCAS trapezium constraints (§4.3 "FCAS max availability", "Energy and
//! regulation capacity", "Joint capacity").
use crate::constraint::{ConstraintRow, ConstraintType, LhsTerm};
use crate::ids::IdAllocator;
use crate::service::Service;
use crate::trapezium::FcasTrapezium;
use crate::unit::DispatchType;
use crate::variables::UnitMapEntry;
use std::collections::HashSet;

fn terms_for<'a>(
    unit_map: &'a [UnitMapEntry],
    unit: &'a str,
    service: Service,
    dispatch_type: DispatchType,
) -> impl Iterator<Item = &'a UnitMapEntry> {
    unit_map
        .iter()
        .filter(move |e| e.unit == unit && e.service == service && e.dispatch_type == dispatch_type)
}

/// One `≤ max_availability` constraint per (unit, service, dispatch_type)
/// FCAS trapezium.
pub fn build_max_availability_constraints(
    trapeziums: &[FcasTrapezium],
    unit_map: &[UnitMapEntry],
    alloc: &mut IdAllocator,
) -> (Vec<ConstraintRow>, Vec<LhsTerm>) {
    let ids = alloc.alloc_cons(trapeziums.len());
    let mut rows = Vec::with_capacity(trapeziums.len());
    let mut terms = Vec::new();

    for (trap, id) in trapeziums.iter().zip(ids) {
        rows.push(ConstraintRow {
            id,
            constraint_type: ConstraintType::LessEqual,
            rhs: trap.max_availability,
            owner: "fcas_max_availability",
        });
        for entry in terms_for(unit_map, &trap.unit, trap.service, trap.dispatch_type) {
            terms.push(LhsTerm { constraint_id: id, variable_id: entry.variable_id, coefficient: 1.0 });
        }
    }

    (rows, terms)
}

/// The two "energy and regulation capacity" constraints (§4.3) for every
/// regulation trapezium (`raise_reg` or `lower_reg`).
pub fn build_regulation_capacity_constraints(
    trapeziums: &[FcasTrapezium],
    unit_map: &[UnitMapEntry],
    alloc: &mut IdAllocator,
) -> (Vec<ConstraintRow>, Vec<LhsTerm>) {
    let regulation: Vec<&FcasTrapezium> = trapeziums.iter().filter(|t| t.service.is_regulation()).collect();
    let ids = alloc.alloc_cons(regulation.len() * 2);
    let mut ids = ids.into_iter();

    let mut rows = Vec::with_capacity(regulation.len() * 2);
    let mut terms = Vec::new();

    for trap in regulation {
        let upper_slope = trap.upper_slope_coefficient();
        let lower_slope = trap.lower_slope_coefficient();

        let upper_id = ids.next().expect("allocated enough constraint ids");
        rows.push(ConstraintRow {
            id: upper_id,
            constraint_type: ConstraintType::LessEqual,
            rhs: trap.enablement_max,
            owner: "energy_regulation_capacity_upper",
        });
        for entry in terms_for(unit_map, &trap.unit, Service::Energy, trap.dispatch_type) {
            terms.push(LhsTerm { constraint_id: upper_id, variable_id: entry.variable_id, coefficient: 1.0 });
        }
        for entry in terms_for(unit_map, &trap.unit, trap.service, trap.dispatch_type) {
            terms.push(LhsTerm { constraint_id: upper_id, variable_id: entry.variable_id, coefficient: upper_slope });
        }

        let lower_id = ids.next().expect("allocated enough constraint ids");
        rows.push(ConstraintRow {
            id: lower_id,
            constraint_type: ConstraintType::GreaterEqual,
            rhs: trap.enablement_min,
            owner: "energy_regulation_capacity_lower",
        });
        for entry in terms_for(unit_map, &trap.unit, Service::Energy, trap.dispatch_type) {
            terms.push(LhsTerm { constraint_id: lower_id, variable_id: entry.variable_id, coefficient: 1.0 });
        }
        for entry in terms_for(unit_map, &trap.unit, trap.service, trap.dispatch_type) {
            terms.push(LhsTerm { constraint_id: lower_id, variable_id: entry.variable_id, coefficient: -lower_slope });
        }
    }

    (rows, terms)
}

/// The two "joint capacity" constraints (§4.3) for every contingency
/// trapezium, coupling energy, the contingency service, and the relevant
/// regulation service. Bidirectional units fold in the opposite-side energy
/// and regulation variables with the same coefficients.
pub fn build_joint_capacity_constraints(
    trapeziums: &[FcasTrapezium],
    unit_map: &[UnitMapEntry],
    bidirectional: &HashSet<&str>,
    alloc: &mut IdAllocator,
) -> (Vec<ConstraintRow>, Vec<LhsTerm>) {
    let contingency: Vec<&FcasTrapezium> = trapeziums.iter().filter(|t| t.service.is_contingency()).collect();
    let ids = alloc.alloc_cons(contingency.len() * 2);
    let mut ids = ids.into_iter();

    let mut rows = Vec::with_capacity(contingency.len() * 2);
    let mut terms = Vec::new();

    for trap in contingency {
        let upper_slope = trap.upper_slope_coefficient();
        let lower_slope = trap.lower_slope_coefficient();
        let (raise_direction, lower_direction) = match trap.dispatch_type {
            DispatchType::Generator => (Service::RaiseReg, Service::LowerReg),
            DispatchType::Load => (Service::LowerReg, Service::RaiseReg),
        };

        let upper_id = ids.next().expect("allocated enough constraint ids");
        rows.push(ConstraintRow {
            id: upper_id,
            constraint_type: ConstraintType::LessEqual,
            rhs: trap.enablement_max,
            owner: "joint_capacity_upper",
        });
        for entry in terms_for(unit_map, &trap.unit, Service::Energy, trap.dispatch_type) {
            terms.push(LhsTerm { constraint_id: upper_id, variable_id: entry.variable_id, coefficient: 1.0 });
        }
        for entry in terms_for(unit_map, &trap.unit, trap.service, trap.dispatch_type) {
            terms.push(LhsTerm { constraint_id: upper_id, variable_id: entry.variable_id, coefficient: upper_slope });
        }
        for entry in terms_for(unit_map, &trap.unit, raise_direction, trap.dispatch_type) {
            terms.push(LhsTerm { constraint_id: upper_id, variable_id: entry.variable_id, coefficient: 1.0 });
        }

        let lower_id = ids.next().expect("allocated enough constraint ids");
        rows.push(ConstraintRow {
            id: lower_id,
            constraint_type: ConstraintType::GreaterEqual,
            rhs: trap.enablement_min,
            owner: "joint_capacity_lower",
        });
        for entry in terms_for(unit_map, &trap.unit, Service::Energy, trap.dispatch_type) {
            terms.push(LhsTerm { constraint_id: lower_id, variable_id: entry.variable_id, coefficient: 1.0 });
        }
        for entry in terms_for(unit_map, &trap.unit, trap.service, trap.dispatch_type) {
            terms.push(LhsTerm { constraint_id: lower_id, variable_id: entry.variable_id, coefficient: -lower_slope });
        }
        for entry in terms_for(unit_map, &trap.unit, lower_direction, trap.dispatch_type) {
            terms.push(LhsTerm { constraint_id: lower_id, variable_id: entry.variable_id, coefficient: -1.0 });
        }

        if bidirectional.contains(trap.unit.as_str()) {
            let opposite = match trap.dispatch_type {
                DispatchType::Generator => DispatchType::Load,
                DispatchType::Load => DispatchType::Generator,
            };
            for entry in terms_for(unit_map, &trap.unit, Service::Energy, opposite) {
                terms.push(LhsTerm { constraint_id: upper_id, variable_id: entry.variable_id, coefficient: 1.0 });
                terms.push(LhsTerm { constraint_id: lower_id, variable_id: entry.variable_id, coefficient: 1.0 });
            }
            for entry in terms_for(unit_map, &trap.unit, raise_direction, opposite) {
                terms.push(LhsTerm { constraint_id: upper_id, variable_id: entry.variable_id, coefficient: 1.0 });
            }
            for entry in terms_for(unit_map, &trap.unit, lower_direction, opposite) {
                terms.push(LhsTerm { constraint_id: lower_id, variable_id: entry.variable_id, coefficient: -1.0 });
            }
        }
    }

    (rows, terms)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trap(unit: &str, service: Service, dispatch_type: DispatchType) -> FcasTrapezium {
        FcasTrapezium {
            unit: unit.to_string(),
            dispatch_type,
            service,
            max_availability: 10.0,
            enablement_min: 70.0,
            low_break_point: 80.0,
            high_break_point: 100.0,
            enablement_max: 110.0,
        }
    }

    #[test]
    fn test_max_availability_binds_service_only() {
        let traps = vec![trap("A", Service::Raise6Sec, DispatchType::Generator)];
        let unit_map = vec![UnitMapEntry {
            variable_id: 5,
            unit: "A".into(),
            service: Service::Raise6Sec,
            dispatch_type: DispatchType::Generator,
            coefficient: 1.0,
        }];
        let mut alloc = IdAllocator::new();
        let (rows, terms) = build_max_availability_constraints(&traps, &unit_map, &mut alloc);
        assert_eq!(rows[0].rhs, 10.0);
        assert_eq!(terms.len(), 1);
    }

    #[test]
    fn test_regulation_capacity_has_both_bounds() {
        let traps = vec![trap("A", Service::RaiseReg, DispatchType::Generator)];
        let unit_map = vec![
            UnitMapEntry { variable_id: 0, unit: "A".into(), service: Service::Energy, dispatch_type: DispatchType::Generator, coefficient: 1.0 },
            UnitMapEntry { variable_id: 1, unit: "A".into(), service: Service::RaiseReg, dispatch_type: DispatchType::Generator, coefficient: 1.0 },
        ];
        let mut alloc = IdAllocator::new();
        let (rows, terms) = build_regulation_capacity_constraints(&traps, &unit_map, &mut alloc);
        assert_eq!(rows.len(), 2);
        assert_eq!(terms.len(), 4);
    }
}
