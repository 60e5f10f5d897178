//! Tie-break constraints (§4.3): pro-rata dispatch between equal-priced bids.
use crate::constraint::{ConstraintRow, ConstraintType, LhsTerm};
use crate::ids::IdAllocator;
use crate::service::Service;
use crate::unit::DispatchType;
use crate::variables::BidVariable;
use std::collections::HashMap;

/// Build one equality constraint per pair of same-price bids sharing a
/// (region, dispatch_type, service), binding `v_a / capacity_a = v_b /
/// capacity_b`. Callers run these through the elastic wrapper (§4.4) with a
/// small uniform cost.
pub fn build_tie_break_constraints(
    bids: &[BidVariable],
    region_by_unit: &HashMap<String, String>,
    capacities: &HashMap<String, f64>,
    alloc: &mut IdAllocator,
) -> (Vec<ConstraintRow>, Vec<LhsTerm>) {
    let mut groups: HashMap<(String, DispatchType, Service, u64), Vec<&BidVariable>> = HashMap::new();
    for bid in bids {
        let Some(region) = region_by_unit.get(&bid.unit) else { continue };
        let key = (region.clone(), bid.dispatch_type, bid.service, bid.price.to_bits());
        groups.entry(key).or_default().push(bid);
    }

    let mut rows = Vec::new();
    let mut terms = Vec::new();

    for group in groups.into_values() {
        let mut by_unit: HashMap<&str, Vec<&BidVariable>> = HashMap::new();
        for bid in &group {
            by_unit.entry(bid.unit.as_str()).or_default().push(bid);
        }
        let mut units: Vec<&str> = by_unit.keys().copied().collect();
        units.sort_unstable();
        if units.len() < 2 {
            continue;
        }

        for i in 0..units.len() {
            for j in (i + 1)..units.len() {
                let unit_a = units[i];
                let unit_b = units[j];
                let capacity_a = capacities.get(unit_a).copied().unwrap_or(1.0);
                let capacity_b = capacities.get(unit_b).copied().unwrap_or(1.0);
                if capacity_a == 0.0 || capacity_b == 0.0 {
                    continue;
                }

                let id = alloc.alloc_cons(1).start;
                rows.push(ConstraintRow {
                    id,
                    constraint_type: ConstraintType::Equal,
                    rhs: 0.0,
                    owner: "tie_break",
                });
                for bid in &by_unit[unit_a] {
                    terms.push(LhsTerm { constraint_id: id, variable_id: bid.id, coefficient: 1.0 / capacity_a });
                }
                for bid in &by_unit[unit_b] {
                    terms.push(LhsTerm { constraint_id: id, variable_id: bid.id, coefficient: -1.0 / capacity_b });
                }
            }
        }
    }

    (rows, terms)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bid(id: u32, unit: &str, price: f64) -> BidVariable {
        BidVariable {
            id,
            unit: unit.to_string(),
            dispatch_type: DispatchType::Generator,
            service: Service::Energy,
            band: 1,
            price,
        }
    }

    #[test]
    fn test_equal_price_bids_get_a_tie_break_row() {
        let bids = vec![bid(0, "A", 50.0), bid(1, "B", 50.0)];
        let region_by_unit =
            HashMap::from([("A".to_string(), "NSW".to_string()), ("B".to_string(), "NSW".to_string())]);
        let capacities = HashMap::from([("A".to_string(), 20.0), ("B".to_string(), 90.0)]);
        let mut alloc = IdAllocator::new();
        let (rows, terms) = build_tie_break_constraints(&bids, &region_by_unit, &capacities, &mut alloc);
        assert_eq!(rows.len(), 1);
        assert_eq!(terms.len(), 2);
        assert_eq!(terms[0].coefficient, 1.0 / 20.0);
        assert_eq!(terms[1].coefficient, -1.0 / 90.0);
    }

    #[test]
    fn test_different_prices_produce_no_row() {
        let bids = vec![bid(0, "A", 50.0), bid(1, "B", 55.0)];
        let region_by_unit =
            HashMap::from([("A".to_string(), "NSW".to_string()), ("B".to_string(), "NSW".to_string())]);
        let capacities = HashMap::from([("A".to_string(), 20.0), ("B".to_string(), 90.0)]);
        let mut alloc = IdAllocator::new();
        let (rows, _) = build_tie_break_constraints(&bids, &region_by_unit, &capacities, &mut alloc);
        assert!(rows.is_empty());
    }
}
