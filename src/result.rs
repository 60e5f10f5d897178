//! Result extraction (component J, §4.10): turns solver primal/dual vectors
//! back into the unit, interconnector and price tables external callers see.
use crate::constraint::{ConstraintRow, ConstraintType, LhsTerm};
use crate::demand::RegionDemand;
use crate::generic_constraint::FcasRequirementRow;
use crate::ids::{ConId, VarId};
use crate::interconnector::InterconnectorDirection;
use crate::service::Service;
use crate::unit::DispatchType;
use crate::variables::BidVariable;
use std::collections::HashMap;

/// Total dispatch for one (unit, dispatch_type, service).
#[derive(Debug, Clone, PartialEq)]
pub struct UnitDispatchRow {
    pub unit: String,
    pub dispatch_type: DispatchType,
    pub service: Service,
    pub dispatch: f64,
}

/// Flow and loss on one interconnector link.
#[derive(Debug, Clone, PartialEq)]
pub struct InterconnectorFlowRow {
    pub interconnector: String,
    pub link: String,
    pub flow: f64,
    pub loss: f64,
}

/// Availability headroom for one (unit, dispatch_type, fcas service).
#[derive(Debug, Clone, PartialEq)]
pub struct FcasAvailabilityRow {
    pub unit: String,
    pub dispatch_type: DispatchType,
    pub service: Service,
    pub availability: f64,
}

/// Regional net dispatch and interconnector/transmission loss attribution.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionDispatchSummaryRow {
    pub region: String,
    pub dispatch: f64,
    pub interconnector_inflow: f64,
    pub interconnector_losses: f64,
}

/// Sum every bid variable's primal value into one row per (unit,
/// dispatch_type, service).
pub fn unit_dispatch(bids: &[BidVariable], primal: &HashMap<VarId, f64>) -> Vec<UnitDispatchRow> {
    let mut totals: HashMap<(String, DispatchType, Service), f64> = HashMap::new();
    for bid in bids {
        let value = primal.get(&bid.id).copied().unwrap_or(0.0);
        *totals.entry((bid.unit.clone(), bid.dispatch_type, bid.service)).or_insert(0.0) += value;
    }
    let mut rows: Vec<UnitDispatchRow> = totals
        .into_iter()
        .map(|((unit, dispatch_type, service), dispatch)| UnitDispatchRow { unit, dispatch_type, service, dispatch })
        .collect();
    rows.sort_by(|a, b| (a.unit.as_str(), a.dispatch_type as u8, a.service as u8).cmp(&(
        b.unit.as_str(),
        b.dispatch_type as u8,
        b.service as u8,
    )));
    rows
}

/// Read flow and loss for every interconnector direction present in
/// `flow_vars`.
pub fn interconnector_flows(
    directions: &[InterconnectorDirection],
    flow_vars: &HashMap<String, VarId>,
    loss_vars: &HashMap<String, VarId>,
    primal: &HashMap<VarId, f64>,
) -> Vec<InterconnectorFlowRow> {
    let mut rows = Vec::with_capacity(directions.len());
    for direction in directions {
        let link = direction.link_id();
        let Some(&flow_var) = flow_vars.get(&link) else { continue };
        let flow = primal.get(&flow_var).copied().unwrap_or(0.0);
        let loss = loss_vars.get(&link).and_then(|v| primal.get(v)).copied().unwrap_or(0.0);
        rows.push(InterconnectorFlowRow { interconnector: direction.interconnector.clone(), link, flow, loss });
    }
    rows
}

/// Regional energy price: the dual of that region's demand balance
/// constraint.
pub fn energy_prices(
    demand: &[RegionDemand],
    demand_con_ids: &HashMap<String, ConId>,
    duals: &HashMap<ConId, f64>,
) -> HashMap<String, f64> {
    demand
        .iter()
        .filter_map(|d| {
            let con_id = demand_con_ids.get(&d.region)?;
            Some((d.region.clone(), duals.get(con_id).copied().unwrap_or(0.0)))
        })
        .collect()
}

/// FCAS price for every (region, service): the sum of duals of every
/// requirement set row that mentions that (region, service), since a single
/// service in a region may be constrained by more than one set (e.g. a
/// local and a co-optimised system-wide requirement).
pub fn fcas_prices(
    requirements: &[FcasRequirementRow],
    set_con_ids: &HashMap<String, ConId>,
    duals: &HashMap<ConId, f64>,
) -> HashMap<(String, Service), f64> {
    let mut out: HashMap<(String, Service), f64> = HashMap::new();
    for row in requirements {
        let Some(con_id) = set_con_ids.get(&row.set) else { continue };
        let dual = duals.get(con_id).copied().unwrap_or(0.0);
        *out.entry((row.region.clone(), row.service)).or_insert(0.0) += dual;
    }
    out
}

/// Headroom available on top of current dispatch for every non-energy bid
/// variable: its own dispatch plus the smallest slack among the hard rows
/// that reference it (§4.10). A row not referencing the variable imposes no
/// limit and is skipped; equality rows are always tight and also skipped,
/// since they bind the variable exactly rather than bounding its headroom.
pub fn fcas_availability(
    bids: &[BidVariable],
    rows: &[ConstraintRow],
    terms: &[LhsTerm],
    primal: &HashMap<VarId, f64>,
) -> Vec<FcasAvailabilityRow> {
    let rows_by_id: HashMap<ConId, &ConstraintRow> = rows.iter().map(|r| (r.id, r)).collect();

    let mut terms_by_var: HashMap<VarId, Vec<&LhsTerm>> = HashMap::new();
    for term in terms {
        terms_by_var.entry(term.variable_id).or_default().push(term);
    }

    let mut totals: HashMap<(String, DispatchType, Service), f64> = HashMap::new();
    let mut slacks: HashMap<(String, DispatchType, Service), f64> = HashMap::new();

    for bid in bids {
        if bid.service == Service::Energy {
            continue;
        }
        let key = (bid.unit.clone(), bid.dispatch_type, bid.service);
        let value = primal.get(&bid.id).copied().unwrap_or(0.0);
        *totals.entry(key.clone()).or_insert(0.0) += value;

        let mut min_slack = slacks.get(&key).copied().unwrap_or(f64::INFINITY);
        for term in terms_by_var.get(&bid.id).into_iter().flatten() {
            let Some(row) = rows_by_id.get(&term.constraint_id) else { continue };
            let row_lhs: f64 = terms
                .iter()
                .filter(|t| t.constraint_id == row.id)
                .map(|t| t.coefficient * primal.get(&t.variable_id).copied().unwrap_or(0.0))
                .sum();
            let slack = match row.constraint_type {
                ConstraintType::LessEqual => row.rhs - row_lhs,
                ConstraintType::GreaterEqual => row_lhs - row.rhs,
                ConstraintType::Equal => continue,
            };
            min_slack = min_slack.min(slack);
        }
        slacks.insert(key, min_slack);
    }

    let mut out: Vec<FcasAvailabilityRow> = totals
        .into_iter()
        .map(|(key, dispatch)| {
            let slack = slacks.get(&key).copied().unwrap_or(0.0);
            let availability = if slack.is_finite() { dispatch + slack.max(0.0) } else { dispatch };
            FcasAvailabilityRow { unit: key.0, dispatch_type: key.1, service: key.2, availability }
        })
        .collect();
    out.sort_by(|a, b| (a.unit.as_str(), a.dispatch_type as u8, a.service as u8).cmp(&(
        b.unit.as_str(),
        b.dispatch_type as u8,
        b.service as u8,
    )));
    out
}

/// Net regional dispatch (generation positive, load negative) plus
/// interconnector inflow and loss attribution (§4.10).
pub fn region_dispatch_summary(
    demand: &[RegionDemand],
    unit_dispatch_rows: &[UnitDispatchRow],
    region_by_unit: &HashMap<String, String>,
    directions: &[InterconnectorDirection],
    flows: &[InterconnectorFlowRow],
    loss_shares: &HashMap<String, f64>,
) -> Vec<RegionDispatchSummaryRow> {
    let mut dispatch: HashMap<&str, f64> = HashMap::new();
    for row in unit_dispatch_rows {
        if row.service != Service::Energy {
            continue;
        }
        let Some(region) = region_by_unit.get(&row.unit) else { continue };
        let sign = match row.dispatch_type {
            DispatchType::Generator => 1.0,
            DispatchType::Load => -1.0,
        };
        *dispatch.entry(region.as_str()).or_insert(0.0) += sign * row.dispatch;
    }

    let flow_by_link: HashMap<&str, f64> = flows.iter().map(|f| (f.link.as_str(), f.flow)).collect();
    let loss_by_link: HashMap<&str, f64> = flows.iter().map(|f| (f.link.as_str(), f.loss)).collect();

    let mut inflow: HashMap<&str, f64> = HashMap::new();
    let mut losses: HashMap<&str, f64> = HashMap::new();
    for direction in directions {
        let link = direction.link_id();
        let flow = flow_by_link.get(link.as_str()).copied().unwrap_or(0.0);
        let loss = loss_by_link.get(link.as_str()).copied().unwrap_or(0.0);
        let loss_share = loss_shares.get(&link).copied().unwrap_or(0.5);
        *inflow.entry(direction.to_region.as_str()).or_insert(0.0) += flow * direction.to_region_loss_factor;
        *inflow.entry(direction.from_region.as_str()).or_insert(0.0) -= flow * direction.from_region_loss_factor;
        *losses.entry(direction.to_region.as_str()).or_insert(0.0) += loss * (1.0 - loss_share);
        *losses.entry(direction.from_region.as_str()).or_insert(0.0) += loss * loss_share;
    }

    demand
        .iter()
        .map(|d| RegionDispatchSummaryRow {
            region: d.region.clone(),
            dispatch: dispatch.get(d.region.as_str()).copied().unwrap_or(0.0),
            interconnector_inflow: inflow.get(d.region.as_str()).copied().unwrap_or(0.0),
            interconnector_losses: losses.get(d.region.as_str()).copied().unwrap_or(0.0),
        })
        .collect()
}
