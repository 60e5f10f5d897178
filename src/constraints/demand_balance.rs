//! Regional demand balance (§4.3 "Demand balance").
use crate::constraint::{ConstraintRow, ConstraintType, LhsTerm};
use crate::demand::RegionDemand;
use crate::ids::{IdAllocator, VarId};
use crate::interconnector::InterconnectorDirection;
use crate::service::Service;
use crate::variables::RegionMapEntry;
use std::collections::HashMap;

/// Build one `=` constraint per region binding net bid energy, interconnector
/// flow, and interconnector loss contributions to regional demand.
///
/// `flow_vars` and `loss_vars` are keyed by link id ([`InterconnectorDirection::link_id`]);
/// `loss_shares` is the from-region loss share for that same link.
pub fn build_demand_balance_constraints(
    demand: &[RegionDemand],
    region_map: &[RegionMapEntry],
    directions: &[InterconnectorDirection],
    flow_vars: &HashMap<String, VarId>,
    loss_vars: &HashMap<String, VarId>,
    loss_shares: &HashMap<String, f64>,
    alloc: &mut IdAllocator,
) -> (Vec<ConstraintRow>, Vec<LhsTerm>, HashMap<String, crate::ids::ConId>) {
    let ids = alloc.alloc_cons(demand.len());
    let mut rows = Vec::with_capacity(demand.len());
    let mut terms = Vec::new();
    let mut con_id_by_region = HashMap::with_capacity(demand.len());

    for (region_demand, id) in demand.iter().zip(ids) {
        con_id_by_region.insert(region_demand.region.clone(), id);
        rows.push(ConstraintRow {
            id,
            constraint_type: ConstraintType::Equal,
            rhs: region_demand.demand,
            owner: "demand_balance",
        });

        for entry in region_map
            .iter()
            .filter(|e| e.region == region_demand.region && e.service == Service::Energy)
        {
            terms.push(LhsTerm { constraint_id: id, variable_id: entry.variable_id, coefficient: entry.coefficient });
        }

        for direction in directions {
            let link = direction.link_id();
            let loss_share = loss_shares.get(&link).copied().unwrap_or(0.5);

            if direction.to_region == region_demand.region {
                if let Some(&flow_var) = flow_vars.get(&link) {
                    terms.push(LhsTerm {
                        constraint_id: id,
                        variable_id: flow_var,
                        coefficient: direction.to_region_loss_factor,
                    });
                }
                if let Some(&loss_var) = loss_vars.get(&link) {
                    terms.push(LhsTerm {
                        constraint_id: id,
                        variable_id: loss_var,
                        coefficient: -(1.0 - loss_share),
                    });
                }
            }
            if direction.from_region == region_demand.region {
                if let Some(&flow_var) = flow_vars.get(&link) {
                    terms.push(LhsTerm {
                        constraint_id: id,
                        variable_id: flow_var,
                        coefficient: -direction.from_region_loss_factor,
                    });
                }
                if let Some(&loss_var) = loss_vars.get(&link) {
                    terms.push(LhsTerm { constraint_id: id, variable_id: loss_var, coefficient: -loss_share });
                }
            }
        }
    }

    (rows, terms, con_id_by_region)
}
