//! Ramp-rate constraints (§4.3 "Ramp up", "Ramp down", "Composite
//! bidirectional ramp").
use crate::constraint::{ConstraintRow, ConstraintType, LhsTerm};
use crate::ids::IdAllocator;
use crate::ramp::{BidirectionalRampDetail, RampDetail};
use crate::service::Service;
use crate::variables::UnitMapEntry;

fn bid_terms<'a>(
    unit_map: &'a [UnitMapEntry],
    unit: &'a str,
) -> impl Iterator<Item = &'a UnitMapEntry> {
    unit_map.iter().filter(move |e| e.unit == unit && e.service == Service::Energy)
}

/// Build the per-(unit, dispatch_type) ramp up/down pair for every
/// non-bidirectional ramp detail row.
pub fn build_ramp_constraints(
    ramp_details: &[RampDetail],
    unit_map: &[UnitMapEntry],
    dispatch_interval: f64,
    alloc: &mut IdAllocator,
) -> (Vec<ConstraintRow>, Vec<LhsTerm>) {
    let hours = dispatch_interval / 60.0;
    let ids = alloc.alloc_cons(ramp_details.len() * 2);
    let mut ids = ids.into_iter();

    let mut rows = Vec::with_capacity(ramp_details.len() * 2);
    let mut terms = Vec::new();

    for detail in ramp_details {
        let up_id = ids.next().expect("allocated enough constraint ids");
        rows.push(ConstraintRow {
            id: up_id,
            constraint_type: ConstraintType::LessEqual,
            rhs: detail.initial_output + detail.ramp_up_rate * hours,
            owner: "ramp_up",
        });
        for entry in bid_terms(unit_map, &detail.unit) {
            terms.push(LhsTerm {
                constraint_id: up_id,
                variable_id: entry.variable_id,
                coefficient: entry.coefficient,
            });
        }

        let down_id = ids.next().expect("allocated enough constraint ids");
        rows.push(ConstraintRow {
            id: down_id,
            constraint_type: ConstraintType::GreaterEqual,
            rhs: detail.initial_output - detail.ramp_down_rate * hours,
            owner: "ramp_down",
        });
        for entry in bid_terms(unit_map, &detail.unit) {
            terms.push(LhsTerm {
                constraint_id: down_id,
                variable_id: entry.variable_id,
                coefficient: entry.coefficient,
            });
        }
    }

    (rows, terms)
}

/// Build the composite ramp up/down pair for every bidirectional unit,
/// binding the net of its generator and load bid variables (their
/// coefficients in `unit_map` already carry the +1/−1 net-dispatch
/// convention, §4.2).
pub fn build_composite_ramp_constraints(
    composite_details: &[BidirectionalRampDetail],
    unit_map: &[UnitMapEntry],
    dispatch_interval: f64,
    alloc: &mut IdAllocator,
) -> (Vec<ConstraintRow>, Vec<LhsTerm>) {
    let hours = dispatch_interval / 60.0;
    let ids = alloc.alloc_cons(composite_details.len() * 2);
    let mut ids = ids.into_iter();

    let mut rows = Vec::with_capacity(composite_details.len() * 2);
    let mut terms = Vec::new();

    for detail in composite_details {
        let up_id = ids.next().expect("allocated enough constraint ids");
        rows.push(ConstraintRow {
            id: up_id,
            constraint_type: ConstraintType::LessEqual,
            rhs: detail.initial_output + detail.composite_ramp_up_rate * hours,
            owner: "bidirectional_ramp_up",
        });
        for entry in bid_terms(unit_map, &detail.unit) {
            terms.push(LhsTerm {
                constraint_id: up_id,
                variable_id: entry.variable_id,
                coefficient: entry.coefficient,
            });
        }

        let down_id = ids.next().expect("allocated enough constraint ids");
        rows.push(ConstraintRow {
            id: down_id,
            constraint_type: ConstraintType::GreaterEqual,
            rhs: detail.initial_output - detail.composite_ramp_down_rate * hours,
            owner: "bidirectional_ramp_down",
        });
        for entry in bid_terms(unit_map, &detail.unit) {
            terms.push(LhsTerm {
                constraint_id: down_id,
                variable_id: entry.variable_id,
                coefficient: entry.coefficient,
            });
        }
    }

    (rows, terms)
}
