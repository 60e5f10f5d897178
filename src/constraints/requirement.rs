//! FCAS requirement constraints (§4.3 "FCAS requirement").
use crate::constraint::{ConstraintRow, LhsTerm};
use crate::generic_constraint::FcasRequirementRow;
use crate::ids::IdAllocator;
use crate::variables::RegionMapEntry;
use std::collections::HashMap;

/// Build one constraint per requirement set, with coefficient +1 on every
/// (region, service) bid variable its rows enumerate.
pub fn build_fcas_requirement_constraints(
    requirements: &[FcasRequirementRow],
    region_map: &[RegionMapEntry],
    alloc: &mut IdAllocator,
) -> (Vec<ConstraintRow>, Vec<LhsTerm>, HashMap<String, crate::ids::ConId>) {
    let mut by_set: HashMap<&str, Vec<&FcasRequirementRow>> = HashMap::new();
    for row in requirements {
        by_set.entry(row.set.as_str()).or_default().push(row);
    }
    let mut sets: Vec<&str> = by_set.keys().copied().collect();
    sets.sort_unstable();

    let ids = alloc.alloc_cons(sets.len());
    let mut rows = Vec::with_capacity(sets.len());
    let mut terms = Vec::new();
    let mut con_id_by_set = HashMap::with_capacity(sets.len());

    for (set, id) in sets.iter().zip(ids) {
        con_id_by_set.insert((*set).to_string(), id);
        let members = &by_set[set];
        let first = members[0];
        rows.push(ConstraintRow { id, constraint_type: first.constraint_type, rhs: first.volume, owner: "fcas_requirement" });

        for member in members {
            for entry in
                region_map.iter().filter(|e| e.region == member.region && e.service == member.service)
            {
                terms.push(LhsTerm { constraint_id: id, variable_id: entry.variable_id, coefficient: 1.0 });
            }
        }
    }

    (rows, terms, con_id_by_set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::ConstraintType;
    use crate::service::Service;
    use crate::unit::DispatchType;

    #[test]
    fn test_requirement_binds_every_matching_bid_variable() {
        let requirements = vec![FcasRequirementRow {
            set: "raise_6s_nsw".into(),
            service: Service::Raise6Sec,
            region: "NSW".into(),
            volume: 10.0,
            constraint_type: ConstraintType::GreaterEqual,
        }];
        let region_map = vec![
            RegionMapEntry { variable_id: 0, region: "NSW".into(), service: Service::Raise6Sec, dispatch_type: DispatchType::Generator, coefficient: 1.0 },
            RegionMapEntry { variable_id: 1, region: "NSW".into(), service: Service::Raise6Sec, dispatch_type: DispatchType::Generator, coefficient: 1.0 },
        ];
        let mut alloc = IdAllocator::new();
        let (rows, terms, con_id_by_set) = build_fcas_requirement_constraints(&requirements, &region_map, &mut alloc);
        assert_eq!(con_id_by_set["raise_6s_nsw"], rows[0].id);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].rhs, 10.0);
        assert_eq!(terms.len(), 2);
    }
}
