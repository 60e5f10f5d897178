//! Decision variables (component B, §4.2): one continuous variable per
//! non-zero bid band, plus the unit-level and regional-level maps other
//! builders join bid variables against.
use crate::bid::BidBand;
use crate::error::DispatchError;
use crate::ids::{IdAllocator, VarId};
use crate::service::Service;
use crate::unit::{DispatchType, UnitInfo};
use std::collections::HashSet;

/// The kind of decision variable a solver column represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableKind {
    Continuous,
    Binary,
}

/// A solver column: bounds, type, and which builder created it.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub id: VarId,
    pub lower: f64,
    pub upper: f64,
    pub kind: VariableKind,
    pub owner: &'static str,
}

/// One bid-band decision variable.
#[derive(Debug, Clone, PartialEq)]
pub struct BidVariable {
    pub id: VarId,
    pub unit: String,
    pub dispatch_type: DispatchType,
    pub service: Service,
    pub band: u8,
    pub price: f64,
}

/// A (variable, unit, service, dispatch_type, coefficient) row joined by
/// unit-scoped constraint builders (capacity, ramp, trapezium, …).
#[derive(Debug, Clone, PartialEq)]
pub struct UnitMapEntry {
    pub variable_id: VarId,
    pub unit: String,
    pub service: Service,
    pub dispatch_type: DispatchType,
    pub coefficient: f64,
}

/// A (variable, region, service, dispatch_type, coefficient) row joined by
/// region-scoped constraint builders (demand balance, FCAS requirement).
#[derive(Debug, Clone, PartialEq)]
pub struct RegionMapEntry {
    pub variable_id: VarId,
    pub region: String,
    pub service: Service,
    pub dispatch_type: DispatchType,
    pub coefficient: f64,
}

/// The output of [`build_bid_variables`].
pub struct BidVariables {
    pub variables: Vec<Variable>,
    pub bids: Vec<BidVariable>,
    pub unit_map: Vec<UnitMapEntry>,
    pub region_map: Vec<RegionMapEntry>,
}

/// Units that have both a generator and a load row in `unit_info`.
pub fn bidirectional_units(units: &[UnitInfo]) -> HashSet<&str> {
    let mut generators = HashSet::new();
    let mut loads = HashSet::new();
    for u in units {
        match u.dispatch_type {
            DispatchType::Generator => {
                generators.insert(u.unit.as_str());
            }
            DispatchType::Load => {
                loads.insert(u.unit.as_str());
            }
        }
    }
    generators.intersection(&loads).copied().collect()
}

/// Build one continuous variable per non-zero bid band, with its unit-level
/// and regional-level map entries (§4.2).
pub fn build_bid_variables(
    bands: &[BidBand],
    units: &[UnitInfo],
    alloc: &mut IdAllocator,
) -> Result<BidVariables, DispatchError> {
    let bidirectional = bidirectional_units(units);
    let ids = alloc.alloc_vars(bands.len());

    let mut variables = Vec::with_capacity(bands.len());
    let mut bids = Vec::with_capacity(bands.len());
    let mut unit_map = Vec::with_capacity(bands.len());
    let mut region_map = Vec::with_capacity(bands.len());

    for (band, id) in bands.iter().zip(ids) {
        let missing_side = match band.dispatch_type {
            DispatchType::Generator => "generator",
            DispatchType::Load => "load",
        };
        let info = units
            .iter()
            .find(|u| u.unit == band.unit && u.dispatch_type == band.dispatch_type)
            .ok_or_else(|| DispatchError::consistency(band.unit.clone(), "unit_info", missing_side))?;

        let is_load_energy = band.service == Service::Energy && band.dispatch_type == DispatchType::Load;
        let is_bidirectional = bidirectional.contains(band.unit.as_str());

        let unit_coefficient = if is_load_energy && is_bidirectional { -1.0 } else { 1.0 };
        let region_coefficient = if is_load_energy && !is_bidirectional { -1.0 } else { 1.0 };

        // Energy bid cost is referred to the regional reference node by
        // dividing by the unit's loss factor; FCAS bids are left unscaled.
        let price = if band.service == Service::Energy { band.price / info.loss_factor } else { band.price };

        variables.push(Variable {
            id,
            lower: 0.0,
            upper: band.volume,
            kind: VariableKind::Continuous,
            owner: "bid",
        });
        bids.push(BidVariable {
            id,
            unit: band.unit.clone(),
            dispatch_type: band.dispatch_type,
            service: band.service,
            band: band.band,
            price,
        });
        unit_map.push(UnitMapEntry {
            variable_id: id,
            unit: band.unit.clone(),
            service: band.service,
            dispatch_type: band.dispatch_type,
            coefficient: unit_coefficient,
        });
        region_map.push(RegionMapEntry {
            variable_id: id,
            region: info.region.clone(),
            service: band.service,
            dispatch_type: band.dispatch_type,
            coefficient: region_coefficient,
        });
    }

    Ok(BidVariables { variables, bids, unit_map, region_map })
}

/// Verify that every bidirectional unit has both a generator and a load row
/// in a table that carries a `dispatch_type` per unit (§7 Consistency
/// errors). `table_name` is used only to annotate the error.
pub fn validate_bidirectional_pairs(
    table_name: &'static str,
    units_with_type: &[(String, DispatchType)],
    bidirectional: &HashSet<&str>,
) -> Result<(), DispatchError> {
    for unit in bidirectional {
        let has_generator = units_with_type
            .iter()
            .any(|(u, t)| u == unit && *t == DispatchType::Generator);
        let has_load = units_with_type.iter().any(|(u, t)| u == unit && *t == DispatchType::Load);
        if !has_generator {
            return Err(DispatchError::consistency((*unit).to_string(), table_name, "generator"));
        }
        if !has_load {
            return Err(DispatchError::consistency((*unit).to_string(), table_name, "load"));
        }
    }
    Ok(())
}
