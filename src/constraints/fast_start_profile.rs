//! Fast-start profile (mode band) constraints (§4.3 "Fast-start profile").
use crate::constraint::{ConstraintRow, ConstraintType, LhsTerm};
use crate::fast_start::FastStartBand;
use crate::ids::IdAllocator;
use crate::service::Service;
use crate::variables::UnitMapEntry;

/// Build the lower (and, where the band has one, upper) dispatch bound for
/// each unit's current fast-start mode.
pub fn build_fast_start_profile_constraints(
    bands: &[(String, FastStartBand)],
    unit_map: &[UnitMapEntry],
    alloc: &mut IdAllocator,
) -> (Vec<ConstraintRow>, Vec<LhsTerm>) {
    let row_count = bands.iter().filter(|(_, b)| b.max.is_some()).count() + bands.len();
    let ids = alloc.alloc_cons(row_count);
    let mut ids = ids.into_iter();

    let mut rows = Vec::with_capacity(row_count);
    let mut terms = Vec::new();

    for (unit, band) in bands {
        let min_id = ids.next().expect("allocated enough constraint ids");
        rows.push(ConstraintRow {
            id: min_id,
            constraint_type: ConstraintType::GreaterEqual,
            rhs: band.min,
            owner: "fast_start_profile",
        });
        for entry in unit_map.iter().filter(|e| &e.unit == unit && e.service == Service::Energy) {
            terms.push(LhsTerm { constraint_id: min_id, variable_id: entry.variable_id, coefficient: entry.coefficient });
        }

        if let Some(max) = band.max {
            let max_id = ids.next().expect("allocated enough constraint ids");
            rows.push(ConstraintRow {
                id: max_id,
                constraint_type: ConstraintType::LessEqual,
                rhs: max,
                owner: "fast_start_profile",
            });
            for entry in unit_map.iter().filter(|e| &e.unit == unit && e.service == Service::Energy) {
                terms.push(LhsTerm { constraint_id: max_id, variable_id: entry.variable_id, coefficient: entry.coefficient });
            }
        }
    }

    (rows, terms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::DispatchType;

    #[test]
    fn test_mode_two_band_produces_equal_bounds() {
        let bands = vec![("A".to_string(), FastStartBand { min: 20.0, max: Some(20.0) })];
        let unit_map = vec![UnitMapEntry {
            variable_id: 0,
            unit: "A".into(),
            service: Service::Energy,
            dispatch_type: DispatchType::Generator,
            coefficient: 1.0,
        }];
        let mut alloc = IdAllocator::new();
        let (rows, terms) = build_fast_start_profile_constraints(&bands, &unit_map, &mut alloc);
        assert_eq!(rows.len(), 2);
        assert_eq!(terms.len(), 2);
    }

    #[test]
    fn test_mode_three_band_has_no_upper_row() {
        let bands = vec![("A".to_string(), FastStartBand { min: 40.0, max: None })];
        let unit_map = vec![UnitMapEntry {
            variable_id: 0,
            unit: "A".into(),
            service: Service::Energy,
            dispatch_type: DispatchType::Generator,
            coefficient: 1.0,
        }];
        let mut alloc = IdAllocator::new();
        let (rows, _) = build_fast_start_profile_constraints(&bands, &unit_map, &mut alloc);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].constraint_type, ConstraintType::GreaterEqual);
    }
}
