//! Dispatch orchestrator (component I, §4.9): assembles every component's
//! variables and constraints into one model, runs the two-phase MIP → LP
//! solve with SOS-driven re-linearization, the optional over-constrained
//! dispatch re-run, and the fast-start two-run flow.
use crate::bid::{merge_bids, PriceBidRow, VolumeBidRow};
use crate::constraints::capacity::{build_capacity_constraints, UigfRow, UnitCapacityRow};
use crate::constraints::demand_balance::build_demand_balance_constraints;
use crate::constraints::fast_start_profile::build_fast_start_profile_constraints;
use crate::constraints::generic::build_generic_constraint_rows;
use crate::constraints::joint_ramping::build_joint_ramping_constraints;
use crate::constraints::ramp::{build_composite_ramp_constraints, build_ramp_constraints};
use crate::constraints::requirement::build_fcas_requirement_constraints;
use crate::constraints::tie_break::build_tie_break_constraints;
use crate::constraints::trapezium::{
    build_joint_capacity_constraints, build_max_availability_constraints, build_regulation_capacity_constraints,
};
use crate::constraint::{ConstraintRow, LhsTerm};
use crate::demand::RegionDemand;
use crate::elastic::{elasticize, DeficitVariable};
use crate::error::DispatchError;
use crate::fast_start::FastStartStartState;
use crate::generic_constraint::{
    FcasRequirementRow, GenericConstraintSet, GenericInterconnectorCoefficient, GenericRegionCoefficient,
    GenericUnitCoefficient,
};
use crate::ids::{ConId, IdAllocator, VarId};
use crate::interconnector::{assemble_loss_models, InterconnectorDirection, LossBreakPointRow, LossShareRow};
use crate::loss_module::build_loss_module;
use crate::ramp::{adjust_for_fast_start, apply_scada_precedence, compose_bidirectional_ramp, FastStartRunType, RampBidRow, ScadaRampRow};
use crate::result;
use crate::settings::Configuration;
use crate::solver::Solver;

use crate::trapezium::FcasTrapezium;
use crate::unit::{DispatchType, UnitInfo};
use crate::variables::{bidirectional_units, build_bid_variables, BidVariable};
use std::collections::{HashMap, HashSet};

/// The violation cost ($/MW) for demand, FCAS and generic elastic deficits.
/// Large enough that any feasible hard solution is always cheaper.
const DEFAULT_ELASTIC_COST: f64 = 100_000.0;

/// The violation cost for tie-break rows: small enough that it never
/// changes the dispatch outcome, just resolves the tie deterministically.
const TIE_BREAK_ELASTIC_COST: f64 = 1e-6;

/// Tolerance below which a SOS1 flow variable is treated as zero for the
/// re-linearization step (§4.9 step 5).
const SOS1_ZERO_TOLERANCE: f64 = 1e-6;

/// Tolerance above which an elastic deficit is treated as "violated" for
/// the over-constrained dispatch trigger (§4.9 step 7).
const DEFICIT_TOLERANCE: f64 = 1e-9;

/// How many break-points either side of the MIP-solution flow the LP
/// re-solve keeps active for each link's SOS2 weight set (§4.9 step 5).
const SOS2_KEEP_CLOSEST: usize = 3;

/// All external input tables for one dispatch interval (§6).
#[derive(Default)]
pub struct MarketInputs {
    pub units: Vec<UnitInfo>,
    pub volume_bids: Vec<VolumeBidRow>,
    pub price_bids: Vec<PriceBidRow>,
    pub capacities: Vec<UnitCapacityRow>,
    pub uigf: Vec<UigfRow>,
    pub ramp_bids: Vec<RampBidRow>,
    pub scada_ramp: Vec<ScadaRampRow>,
    pub fast_start_states: Vec<FastStartStartState>,
    pub trapeziums: Vec<FcasTrapezium>,
    pub directions: Vec<InterconnectorDirection>,
    pub loss_shares: Vec<LossShareRow>,
    pub loss_break_points: Vec<LossBreakPointRow>,
    pub fcas_requirements: Vec<FcasRequirementRow>,
    pub generic_sets: Vec<GenericConstraintSet>,
    pub generic_unit_coefficients: Vec<GenericUnitCoefficient>,
    pub generic_region_coefficients: Vec<GenericRegionCoefficient>,
    pub generic_interconnector_coefficients: Vec<GenericInterconnectorCoefficient>,
    pub demand: Vec<RegionDemand>,
}

/// Everything a caller needs to extract results from a completed dispatch
/// (§4.10), plus the raw primal/dual vectors and objective value.
pub struct DispatchOutcome {
    pub bids: Vec<BidVariable>,
    pub rows: Vec<ConstraintRow>,
    pub terms: Vec<LhsTerm>,
    pub directions: Vec<InterconnectorDirection>,
    pub flow_vars: HashMap<String, VarId>,
    pub loss_vars: HashMap<String, VarId>,
    pub loss_shares: HashMap<String, f64>,
    pub demand_con_ids: HashMap<String, ConId>,
    pub fcas_set_con_ids: HashMap<String, ConId>,
    pub region_by_unit: HashMap<String, String>,
    pub primal: HashMap<VarId, f64>,
    pub duals: HashMap<ConId, f64>,
    pub objective_value: f64,
}

/// Run one dispatch interval end to end: merge bids, assemble every
/// component's constraints, solve, and (if fast-start units are present)
/// rerun with second-run ramp rates and profile bands (§4.9, §4.3).
pub fn dispatch(inputs: &MarketInputs, config: &Configuration) -> Result<DispatchOutcome, DispatchError> {
    let raw_ramp = apply_scada_precedence(&inputs.ramp_bids, &inputs.scada_ramp);

    if inputs.fast_start_states.is_empty() {
        return assemble_and_solve(inputs, config, raw_ramp, None);
    }

    let first_run_modes: HashMap<String, u8> =
        inputs.fast_start_states.iter().map(|s| (s.unit.clone(), s.current_mode)).collect();
    let first_run_ramp = adjust_for_fast_start(
        raw_ramp.clone(),
        FastStartRunType::FastStartFirstRun,
        &first_run_modes,
        &HashMap::new(),
        config.dispatch_interval,
    );
    let _first_run = assemble_and_solve(inputs, config, first_run_ramp, None)?;

    let end_states: HashMap<String, crate::fast_start::FastStartEndState> = inputs
        .fast_start_states
        .iter()
        .map(|s| (s.unit.clone(), s.advance(config.dispatch_interval)))
        .collect();
    let second_run_ramp = adjust_for_fast_start(
        raw_ramp,
        FastStartRunType::FastStartSecondRun,
        &HashMap::new(),
        &end_states,
        config.dispatch_interval,
    );
    let fast_start_bands: Vec<(String, crate::fast_start::FastStartBand)> =
        end_states.values().map(|e| (e.unit.clone(), e.dispatch_band())).collect();

    assemble_and_solve(inputs, config, second_run_ramp, Some(&fast_start_bands))
}

fn assemble_and_solve(
    inputs: &MarketInputs,
    config: &Configuration,
    ramp_details: Vec<crate::ramp::RampDetail>,
    fast_start_bands: Option<&[(String, crate::fast_start::FastStartBand)]>,
) -> Result<DispatchOutcome, DispatchError> {
    let mut alloc = IdAllocator::new();
    let mut solver = Solver::new();
    let mut all_rows: Vec<ConstraintRow> = Vec::new();
    let mut all_terms: Vec<LhsTerm> = Vec::new();
    let mut rhs_by_con: HashMap<ConId, f64> = HashMap::new();

    let bands = merge_bids(&inputs.volume_bids, &inputs.price_bids)?;
    let bid_vars = build_bid_variables(&bands, &inputs.units, &mut alloc)?;
    solver.add_variables(bid_vars.variables.iter().cloned());
    solver.add_objective_terms(bid_vars.bids.iter().map(|b| (b.id, b.price)));

    let bidirectional = bidirectional_units(&inputs.units);

    let (rows, terms) = build_capacity_constraints(&inputs.capacities, &inputs.uigf, &bid_vars.unit_map, &mut alloc);
    push_rows(rows, terms, &mut solver, &mut rhs_by_con, &mut all_rows, &mut all_terms);

    let non_bidirectional_ramp: Vec<_> =
        ramp_details.iter().filter(|r| !bidirectional.contains(r.unit.as_str())).cloned().collect();
    let (rows, terms) =
        build_ramp_constraints(&non_bidirectional_ramp, &bid_vars.unit_map, config.dispatch_interval, &mut alloc);
    push_rows(rows, terms, &mut solver, &mut rhs_by_con, &mut all_rows, &mut all_terms);

    let mut composite_details = Vec::new();
    for unit in &bidirectional {
        let gen = ramp_details.iter().find(|r| r.unit == *unit && r.dispatch_type == DispatchType::Generator);
        let load = ramp_details.iter().find(|r| r.unit == *unit && r.dispatch_type == DispatchType::Load);
        if let (Some(gen), Some(load)) = (gen, load) {
            composite_details.push(compose_bidirectional_ramp(gen, load, config.dispatch_interval));
        }
    }
    let (rows, terms) =
        build_composite_ramp_constraints(&composite_details, &bid_vars.unit_map, config.dispatch_interval, &mut alloc);
    push_rows(rows, terms, &mut solver, &mut rhs_by_con, &mut all_rows, &mut all_terms);

    if let Some(bands) = fast_start_bands {
        let (rows, terms) = build_fast_start_profile_constraints(bands, &bid_vars.unit_map, &mut alloc);
        push_rows(rows, terms, &mut solver, &mut rhs_by_con, &mut all_rows, &mut all_terms);
    }

    let (rows, terms) = build_max_availability_constraints(&inputs.trapeziums, &bid_vars.unit_map, &mut alloc);
    push_rows(rows, terms, &mut solver, &mut rhs_by_con, &mut all_rows, &mut all_terms);
    let (rows, terms) = build_regulation_capacity_constraints(&inputs.trapeziums, &bid_vars.unit_map, &mut alloc);
    push_rows(rows, terms, &mut solver, &mut rhs_by_con, &mut all_rows, &mut all_terms);
    let (rows, terms) =
        build_joint_capacity_constraints(&inputs.trapeziums, &bid_vars.unit_map, &bidirectional, &mut alloc);
    push_rows(rows, terms, &mut solver, &mut rhs_by_con, &mut all_rows, &mut all_terms);
    let (rows, terms) = build_joint_ramping_constraints(
        &inputs.trapeziums,
        &ramp_details,
        &bid_vars.unit_map,
        &bidirectional,
        config.dispatch_interval,
        &mut alloc,
    );
    push_rows(rows, terms, &mut solver, &mut rhs_by_con, &mut all_rows, &mut all_terms);

    let loss_models = assemble_loss_models(&inputs.loss_shares, &inputs.loss_break_points);
    let loss_output = build_loss_module(&inputs.directions, &loss_models, &mut alloc);
    solver.add_variables(loss_output.variables.iter().cloned());
    for row in &loss_output.rows {
        rhs_by_con.insert(row.id, row.rhs);
    }
    solver.add_rows(loss_output.rows.clone(), loss_output.terms.clone());
    all_rows.extend(loss_output.rows.clone());
    all_terms.extend(loss_output.terms.clone());
    for group in &loss_output.sos2_groups {
        solver.add_sos2(group.clone());
    }
    for group in &loss_output.sos1_groups {
        solver.add_sos1(group.clone());
    }

    let (demand_rows, demand_terms, demand_con_ids) = build_demand_balance_constraints(
        &inputs.demand,
        &bid_vars.region_map,
        &inputs.directions,
        &loss_output.flow_vars,
        &loss_output.loss_vars,
        &loss_output.loss_shares,
        &mut alloc,
    );
    let demand_elastic = elasticize(&demand_rows, &HashMap::new(), DEFAULT_ELASTIC_COST, &mut alloc);
    solver.add_variables(demand_elastic.variables.iter().cloned());
    solver.add_objective_terms(demand_elastic.objective_terms.iter().copied());
    push_rows(demand_rows, demand_terms, &mut solver, &mut rhs_by_con, &mut all_rows, &mut all_terms);
    solver.add_rows(Vec::new(), demand_elastic.terms.clone());
    all_terms.extend(demand_elastic.terms);

    let (fcas_rows, fcas_terms, fcas_set_con_ids) =
        build_fcas_requirement_constraints(&inputs.fcas_requirements, &bid_vars.region_map, &mut alloc);
    let fcas_elastic = elasticize(&fcas_rows, &HashMap::new(), DEFAULT_ELASTIC_COST, &mut alloc);
    solver.add_variables(fcas_elastic.variables.iter().cloned());
    solver.add_objective_terms(fcas_elastic.objective_terms.iter().copied());
    push_rows(fcas_rows, fcas_terms, &mut solver, &mut rhs_by_con, &mut all_rows, &mut all_terms);
    solver.add_rows(Vec::new(), fcas_elastic.terms.clone());
    all_terms.extend(fcas_elastic.terms.clone());

    let (generic_rows, generic_terms) = build_generic_constraint_rows(
        &inputs.generic_sets,
        &inputs.generic_unit_coefficients,
        &inputs.generic_region_coefficients,
        &inputs.generic_interconnector_coefficients,
        &bid_vars.unit_map,
        &bid_vars.region_map,
        &loss_output.flow_vars,
        &inputs.directions,
        &mut alloc,
    );
    let generic_elastic = elasticize(&generic_rows, &HashMap::new(), DEFAULT_ELASTIC_COST, &mut alloc);
    solver.add_variables(generic_elastic.variables.iter().cloned());
    solver.add_objective_terms(generic_elastic.objective_terms.iter().copied());
    push_rows(generic_rows, generic_terms, &mut solver, &mut rhs_by_con, &mut all_rows, &mut all_terms);
    solver.add_rows(Vec::new(), generic_elastic.terms.clone());
    all_terms.extend(generic_elastic.terms.clone());

    let region_by_unit: HashMap<String, String> =
        inputs.units.iter().map(|u| (u.unit.clone(), u.region.clone())).collect();
    let mut effective_capacity: HashMap<String, f64> = HashMap::new();
    for row in &inputs.capacities {
        effective_capacity
            .entry(row.unit.clone())
            .and_modify(|c| *c = c.min(row.capacity))
            .or_insert(row.capacity);
    }
    for row in &inputs.uigf {
        effective_capacity
            .entry(row.unit.clone())
            .and_modify(|c| *c = c.min(row.capacity))
            .or_insert(row.capacity);
    }
    let (tie_rows, tie_terms) =
        build_tie_break_constraints(&bid_vars.bids, &region_by_unit, &effective_capacity, &mut alloc);
    let tie_elastic = elasticize(&tie_rows, &HashMap::new(), TIE_BREAK_ELASTIC_COST, &mut alloc);
    solver.add_variables(tie_elastic.variables.iter().cloned());
    solver.add_objective_terms(tie_elastic.objective_terms.iter().copied());
    push_rows(tie_rows, tie_terms, &mut solver, &mut rhs_by_con, &mut all_rows, &mut all_terms);
    solver.add_rows(Vec::new(), tie_elastic.terms.clone());
    all_terms.extend(tie_elastic.terms);

    // Step 3: MIP solve with SOS1/SOS2 emulation active.
    let mip = solver.solve(true)?;

    // Step 5: re-linearize. Keep only the SOS2_KEEP_CLOSEST weight
    // variables nearest the MIP-solution flow per link; disable the rest.
    for ((group, link), break_points) in
        loss_output.sos2_groups.iter().zip(&loss_output.sos2_links).zip(&loss_output.sos2_break_points)
    {
        let Some(&flow_var) = loss_output.flow_vars.get(link) else { continue };
        let flow_value = mip.primal.get(&flow_var).copied().unwrap_or(0.0);
        let mut by_distance: Vec<(usize, f64)> =
            break_points.iter().enumerate().map(|(i, bp)| (i, (bp - flow_value).abs())).collect();
        by_distance.sort_by(|a, b| a.1.partial_cmp(&b.1).expect("break points are finite"));
        let keep: HashSet<usize> = by_distance.iter().take(SOS2_KEEP_CLOSEST).map(|(i, _)| *i).collect();
        for (i, &var_id) in group.iter().enumerate() {
            if !keep.contains(&i) {
                solver.disable_variable(var_id);
            }
        }
    }
    for group in &loss_output.sos1_groups {
        for &flow_var in group {
            if mip.primal.get(&flow_var).copied().unwrap_or(0.0).abs() < SOS1_ZERO_TOLERANCE {
                solver.disable_variable(flow_var);
            }
        }
    }

    // Step 6: LP re-solve for valid shadow prices.
    let lp = solver.solve(false)?;

    // Step 7: over-constrained dispatch re-run.
    let active_deficits: Vec<&DeficitVariable> =
        fcas_elastic.deficits.iter().chain(generic_elastic.deficits.iter()).collect();
    let price_at_cap = price_cap_hit(inputs, &demand_con_ids, &fcas_set_con_ids, &lp.duals, config);
    let any_violation = active_deficits
        .iter()
        .any(|d| lp.primal.get(&d.variable_id).copied().unwrap_or(0.0) > DEFICIT_TOLERANCE);

    let duals = if config.allow_over_constrained_dispatch_re_run && price_at_cap && any_violation {
        for deficit in &active_deficits {
            let value = lp.primal.get(&deficit.variable_id).copied().unwrap_or(0.0);
            if value <= DEFICIT_TOLERANCE {
                continue;
            }
            let old_rhs = rhs_by_con.get(&deficit.constraint_id).copied().unwrap_or(0.0);
            let new_rhs = old_rhs + (value + 0.01) * deficit.lhs_coefficient * -1.0;
            solver.update_rhs(deficit.constraint_id, new_rhs);
            rhs_by_con.insert(deficit.constraint_id, new_rhs);
        }
        let reran = solver.solve(false)?;
        reran.duals
    } else {
        lp.duals
    };

    Ok(DispatchOutcome {
        bids: bid_vars.bids,
        rows: all_rows,
        terms: all_terms,
        directions: inputs.directions.clone(),
        flow_vars: loss_output.flow_vars,
        loss_vars: loss_output.loss_vars,
        loss_shares: loss_output.loss_shares,
        demand_con_ids,
        fcas_set_con_ids,
        region_by_unit,
        primal: lp.primal,
        duals,
        objective_value: lp.objective_value,
    })
}

/// Register one builder's rows/terms with the solver and the running
/// bookkeeping (`rhs_by_con` for the OCD re-run, `all_rows`/`all_terms` for
/// result extraction).
fn push_rows(
    rows: Vec<ConstraintRow>,
    terms: Vec<LhsTerm>,
    solver: &mut Solver,
    rhs_by_con: &mut HashMap<ConId, f64>,
    all_rows: &mut Vec<ConstraintRow>,
    all_terms: &mut Vec<LhsTerm>,
) {
    for row in &rows {
        rhs_by_con.insert(row.id, row.rhs);
    }
    solver.add_rows(rows.clone(), terms.clone());
    all_rows.extend(rows);
    all_terms.extend(terms);
}

fn price_cap_hit(
    inputs: &MarketInputs,
    demand_con_ids: &HashMap<String, ConId>,
    fcas_set_con_ids: &HashMap<String, ConId>,
    duals: &HashMap<ConId, f64>,
    config: &Configuration,
) -> bool {
    let energy = result::energy_prices(&inputs.demand, demand_con_ids, duals);
    let energy_capped = match (config.energy_market_ceiling_price, config.energy_market_floor_price) {
        (Some(ceiling), Some(floor)) => energy.values().any(|&p| p >= ceiling || p <= floor),
        _ => false,
    };
    if energy_capped {
        return true;
    }

    let Some(fcas_ceiling) = config.fcas_market_ceiling_price else { return false };
    let fcas = result::fcas_prices(&inputs.fcas_requirements, fcas_set_con_ids, duals);
    fcas.values().any(|&p| p >= fcas_ceiling)
}
