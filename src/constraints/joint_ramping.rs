//! Joint ramping for regulation FCAS (§4.3 "Joint ramping for regulation").
use crate::constraint::{ConstraintRow, ConstraintType, LhsTerm};
use crate::ids::IdAllocator;
use crate::ramp::RampDetail;
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

/// Build one ramp-envelope constraint per unit offering `raise_reg` or
/// `lower_reg`, scaled by the unit's own ramp rate and initial output.
pub fn build_joint_ramping_constraints(
    trapeziums: &[FcasTrapezium],
    ramp_details: &[RampDetail],
    unit_map: &[UnitMapEntry],
    bidirectional: &HashSet<&str>,
    dispatch_interval: f64,
    alloc: &mut IdAllocator,
) -> (Vec<ConstraintRow>, Vec<LhsTerm>) {
    let hours = dispatch_interval / 60.0;
    let regulation: Vec<&FcasTrapezium> = trapeziums.iter().filter(|t| t.service.is_regulation()).collect();
    let ids = alloc.alloc_cons(regulation.len());

    let mut rows = Vec::with_capacity(regulation.len());
    let mut terms = Vec::new();

    for (trap, id) in regulation.iter().zip(ids) {
        let Some(ramp) = ramp_details.iter().find(|r| r.unit == trap.unit && r.dispatch_type == trap.dispatch_type)
        else {
            continue;
        };

        let (constraint_type, rhs, reg_coefficient) = match (trap.dispatch_type, trap.service) {
            (DispatchType::Generator, Service::RaiseReg) => {
                (ConstraintType::LessEqual, ramp.initial_output + ramp.ramp_up_rate * hours, 1.0)
            }
            (DispatchType::Generator, Service::LowerReg) => {
                (ConstraintType::GreaterEqual, ramp.initial_output - ramp.ramp_down_rate * hours, -1.0)
            }
            (DispatchType::Load, Service::RaiseReg) => {
                (ConstraintType::GreaterEqual, ramp.initial_output - ramp.ramp_down_rate * hours, -1.0)
            }
            (DispatchType::Load, Service::LowerReg) => {
                (ConstraintType::LessEqual, ramp.initial_output + ramp.ramp_up_rate * hours, 1.0)
            }
            _ => unreachable!("regulation filter only admits raise_reg/lower_reg"),
        };

        rows.push(ConstraintRow { id, constraint_type, rhs, owner: "joint_ramping_regulation" });

        for entry in terms_for(unit_map, &trap.unit, Service::Energy, trap.dispatch_type) {
            terms.push(LhsTerm { constraint_id: id, variable_id: entry.variable_id, coefficient: 1.0 });
        }
        for entry in terms_for(unit_map, &trap.unit, trap.service, trap.dispatch_type) {
            terms.push(LhsTerm { constraint_id: id, variable_id: entry.variable_id, coefficient: reg_coefficient });
        }

        if bidirectional.contains(trap.unit.as_str()) {
            let opposite = match trap.dispatch_type {
                DispatchType::Generator => DispatchType::Load,
                DispatchType::Load => DispatchType::Generator,
            };
            for entry in terms_for(unit_map, &trap.unit, Service::Energy, opposite) {
                terms.push(LhsTerm { constraint_id: id, variable_id: entry.variable_id, coefficient: 1.0 });
            }
        }
    }

    (rows, terms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generator_raise_reg_upper_bound() {
        let traps = vec![FcasTrapezium {
            unit: "A".into(),
            dispatch_type: DispatchType::Generator,
            service: Service::RaiseReg,
            max_availability: 10.0,
            enablement_min: 0.0,
            low_break_point: 0.0,
            high_break_point: 0.0,
            enablement_max: 100.0,
        }];
        let ramp = vec![RampDetail {
            unit: "A".into(),
            dispatch_type: DispatchType::Generator,
            initial_output: 50.0,
            ramp_up_rate: 60.0,
            ramp_down_rate: 60.0,
        }];
        let unit_map = vec![
            UnitMapEntry { variable_id: 0, unit: "A".into(), service: Service::Energy, dispatch_type: DispatchType::Generator, coefficient: 1.0 },
            UnitMapEntry { variable_id: 1, unit: "A".into(), service: Service::RaiseReg, dispatch_type: DispatchType::Generator, coefficient: 1.0 },
        ];
        let mut alloc = IdAllocator::new();
        let (rows, terms) =
            build_joint_ramping_constraints(&traps, &ramp, &unit_map, &HashSet::new(), 60.0, &mut alloc);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].rhs, 110.0);
        assert_eq!(terms.len(), 2);
    }
}
