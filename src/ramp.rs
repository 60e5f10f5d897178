//! Ramp & fast-start preprocessor (component E, spec §4.3, §4.5).
//!
//! Combines as-bid and SCADA ramp rate sources, composes bidirectional
//! composite ramp envelopes, and adjusts/removes rows per the fast-start
//! run type before the ramp constraint builders run.
use crate::fast_start::FastStartEndState;
use crate::unit::DispatchType;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};

/// As-bid ramp rates for one (unit, dispatch_type).
#[derive(Debug, Clone, Deserialize)]
pub struct RampBidRow {
    pub unit: String,
    #[serde(default)]
    pub dispatch_type: Option<DispatchType>,
    pub initial_output: f64,
    pub ramp_up_rate: f64,
    pub ramp_down_rate: f64,
}

/// SCADA-measured ramp rates for a unit (not split by dispatch_type).
#[derive(Debug, Clone, Deserialize)]
pub struct ScadaRampRow {
    pub unit: String,
    pub scada_ramp_up_rate: f64,
    pub scada_ramp_down_rate: f64,
}

/// A normalized ramp row after SCADA precedence and fast-start adjustment.
#[derive(Debug, Clone, PartialEq)]
pub struct RampDetail {
    pub unit: String,
    pub dispatch_type: DispatchType,
    pub initial_output: f64,
    pub ramp_up_rate: f64,
    pub ramp_down_rate: f64,
}

/// A composite ramp envelope for a bidirectional unit pair, keyed by unit.
#[derive(Debug, Clone, PartialEq)]
pub struct BidirectionalRampDetail {
    pub unit: String,
    pub initial_output: f64,
    pub composite_ramp_up_rate: f64,
    pub composite_ramp_down_rate: f64,
}

/// Which run of the two-phase fast-start flow the ramp rates are being
/// prepared for (§4.3 "Fast-start ramp adjustment").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FastStartRunType {
    NoFastStartUnits,
    FastStartFirstRun,
    FastStartSecondRun,
}

/// Merge as-bid rates with SCADA rates (`min(bid, scada)` when a SCADA row
/// exists for the unit; otherwise the as-bid rate unmodified — the
/// precedence rule from `ramp_rate_processing.py`, SPEC_FULL.md §3).
pub fn apply_scada_precedence(bid_rates: &[RampBidRow], scada_rates: &[ScadaRampRow]) -> Vec<RampDetail> {
    let scada_by_unit: HashMap<&str, &ScadaRampRow> =
        scada_rates.iter().map(|r| (r.unit.as_str(), r)).collect();

    bid_rates
        .iter()
        .map(|row| {
            let dispatch_type = row.dispatch_type.unwrap_or(DispatchType::default_dispatch_type());
            let (ramp_up_rate, ramp_down_rate) = match scada_by_unit.get(row.unit.as_str()) {
                Some(scada) => (
                    row.ramp_up_rate.min(scada.scada_ramp_up_rate),
                    row.ramp_down_rate.min(scada.scada_ramp_down_rate),
                ),
                None => (row.ramp_up_rate, row.ramp_down_rate),
            };
            RampDetail {
                unit: row.unit.clone(),
                dispatch_type,
                initial_output: row.initial_output,
                ramp_up_rate,
                ramp_down_rate,
            }
        })
        .collect()
}

/// Compose the bidirectional ramp envelope (§4.3 "Composite bidirectional
/// ramp") for a (generator, load) row pair sharing the same `unit` id.
pub fn compose_bidirectional_ramp(
    gen: &RampDetail,
    load: &RampDetail,
    dispatch_interval: f64,
) -> BidirectionalRampDetail {
    let hours = dispatch_interval / 60.0;
    // The pair's net output is the generator side's sign convention:
    // non-negative when generating, negative when consuming (load ramping).
    let initial_output = gen.initial_output - load.initial_output;

    let composite_ramp_up_rate = if initial_output >= 0.0 {
        gen.ramp_up_rate
    } else if load.ramp_down_rate == 0.0 {
        0.0
    } else if (initial_output / load.ramp_down_rate).abs() >= hours {
        load.ramp_down_rate
    } else {
        let time_to_ramp_after_zero = hours - (initial_output / load.ramp_down_rate).abs();
        let total_ramp_above_zero = time_to_ramp_after_zero * gen.ramp_up_rate;
        (total_ramp_above_zero - initial_output) / hours
    };

    let composite_ramp_down_rate = if initial_output <= 0.0 {
        load.ramp_up_rate
    } else if gen.ramp_down_rate == 0.0 {
        0.0
    } else if (initial_output / gen.ramp_down_rate).abs() >= hours {
        gen.ramp_down_rate
    } else {
        let time_to_ramp_after_zero = hours - (initial_output / gen.ramp_down_rate).abs();
        let total_ramp_below_zero = time_to_ramp_after_zero * load.ramp_up_rate;
        (total_ramp_below_zero + initial_output) / hours
    };

    BidirectionalRampDetail {
        unit: gen.unit.clone(),
        initial_output,
        composite_ramp_up_rate,
        composite_ramp_down_rate,
    }
}

/// Apply the fast-start run-type filtering/adjustment rules (§4.3) to a set
/// of normalized ramp rows, given the relevant end-of-interval fast-start
/// states (for the second run) or start-of-interval modes (for the first
/// run).
pub fn adjust_for_fast_start(
    ramp_details: Vec<RampDetail>,
    run_type: FastStartRunType,
    first_run_modes: &HashMap<String, u8>,
    second_run_states: &HashMap<String, FastStartEndState>,
    dispatch_interval: f64,
) -> Vec<RampDetail> {
    match run_type {
        FastStartRunType::NoFastStartUnits => ramp_details,
        FastStartRunType::FastStartFirstRun => {
            let excluded: HashSet<&str> = first_run_modes
                .iter()
                .filter(|(_, mode)| matches!(mode, 0 | 1 | 2))
                .map(|(unit, _)| unit.as_str())
                .collect();
            ramp_details
                .into_iter()
                .filter(|row| !excluded.contains(row.unit.as_str()))
                .collect()
        }
        FastStartRunType::FastStartSecondRun => ramp_details
            .into_iter()
            .filter_map(|mut row| {
                let Some(end_state) = second_run_states.get(&row.unit) else {
                    return Some(row);
                };
                if matches!(end_state.end_mode, 0 | 1 | 2) {
                    return None;
                }
                if let Some(time_since_mode_two) = end_state.time_since_end_of_mode_two {
                    let ramp_mw_per_min = row.ramp_up_rate / 60.0;
                    let ramp_max = time_since_mode_two * ramp_mw_per_min + end_state.min_loading;
                    row.ramp_up_rate = (ramp_max - row.initial_output) * (60.0 / dispatch_interval);
                }
                Some(row)
            })
            .collect(),
    }
}
