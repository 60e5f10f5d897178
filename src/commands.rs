//! Handlers for the CLI's subcommands: load a dispatch interval's input
//! tables from CSV, run the dispatch, and print the result tables.
use crate::input::read_csv;
use crate::log;
use crate::market::{self, MarketInputs};
use crate::result;
use crate::settings::Configuration;
use anyhow::{Context, Result};
use ::log::info;
use std::path::Path;

/// Read a CSV table if it is present, otherwise return an empty table.
///
/// Most input tables are optional at the CLI boundary (a dispatch interval
/// with no FCAS, no interconnectors, or no fast-start units simply omits the
/// corresponding file); `MarketInputs`'s builders already treat an empty
/// `Vec` as "nothing of this kind in this interval".
fn read_optional_table<T: serde::de::DeserializeOwned>(dir: &Path, file_name: &str) -> Result<Vec<T>> {
    let path = dir.join(file_name);
    if !path.is_file() {
        return Ok(Vec::new());
    }
    read_csv(&path)
        .with_context(|| format!("Failed to read {}", path.display()))
        .map(Iterator::collect)
}

/// Read a CSV table that every dispatch interval must supply.
fn read_required_table<T: serde::de::DeserializeOwned>(dir: &Path, file_name: &str) -> Result<Vec<T>> {
    let path = dir.join(file_name);
    let rows: Vec<T> = read_csv(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?
        .collect();
    Ok(rows)
}

/// Load every input table of §6 from `input_dir` into a [`MarketInputs`].
fn load_market_inputs(input_dir: &Path) -> Result<MarketInputs> {
    Ok(MarketInputs {
        units: read_required_table(input_dir, "unit_info.csv")?,
        volume_bids: read_required_table(input_dir, "volume_bids.csv")?,
        price_bids: read_required_table(input_dir, "price_bids.csv")?,
        capacities: read_optional_table(input_dir, "unit_capacity.csv")?,
        uigf: read_optional_table(input_dir, "uigf.csv")?,
        ramp_bids: read_optional_table(input_dir, "ramp_details.csv")?,
        scada_ramp: read_optional_table(input_dir, "scada_ramp_rates.csv")?,
        fast_start_states: read_optional_table(input_dir, "fast_start_profiles.csv")?,
        trapeziums: read_optional_table(input_dir, "fcas_trapeziums.csv")?,
        directions: read_optional_table(input_dir, "interconnector_directions.csv")?,
        loss_shares: read_optional_table(input_dir, "loss_shares.csv")?,
        loss_break_points: read_optional_table(input_dir, "loss_break_points.csv")?,
        fcas_requirements: read_optional_table(input_dir, "fcas_requirements.csv")?,
        generic_sets: read_optional_table(input_dir, "generic_constraint_sets.csv")?,
        generic_unit_coefficients: read_optional_table(input_dir, "generic_unit_coefficients.csv")?,
        generic_region_coefficients: read_optional_table(input_dir, "generic_region_coefficients.csv")?,
        generic_interconnector_coefficients: read_optional_table(
            input_dir,
            "generic_interconnector_coefficients.csv",
        )?,
        demand: read_required_table(input_dir, "demand.csv")?,
    })
}

/// Handle the `run` command: load inputs, dispatch, print the result tables.
pub fn handle_run_command(input_dir: &Path, config_path: Option<&Path>, log_dir: Option<&Path>) -> Result<()> {
    let default_config_path = input_dir.join("settings.toml");
    let config_path = config_path.unwrap_or(&default_config_path);
    let config = Configuration::load_from_path(config_path).context("Failed to load settings.")?;

    log::init(Some(&config.log_level), log_dir).context("Failed to initialise logging.")?;

    let inputs = load_market_inputs(input_dir).context("Failed to load input tables.")?;
    info!("Loaded input tables from {}", input_dir.display());

    let outcome = market::dispatch(&inputs, &config).context("Dispatch failed.")?;
    info!("Dispatch complete, objective value {:.2}", outcome.objective_value);

    print_results(&inputs, &outcome);
    Ok(())
}

/// Print every output table named in §6 to stdout.
fn print_results(inputs: &MarketInputs, outcome: &market::DispatchOutcome) {
    println!("objective_value,{:.6}", outcome.objective_value);

    let unit_dispatch = result::unit_dispatch(&outcome.bids, &outcome.primal);
    println!("\nunit,dispatch_type,service,dispatch");
    for row in &unit_dispatch {
        println!("{},{:?},{:?},{:.4}", row.unit, row.dispatch_type, row.service, row.dispatch);
    }

    let flows = result::interconnector_flows(&outcome.directions, &outcome.flow_vars, &outcome.loss_vars, &outcome.primal);
    println!("\ninterconnector,link,flow,loss");
    for row in &flows {
        println!("{},{},{:.4},{:.4}", row.interconnector, row.link, row.flow, row.loss);
    }

    let energy_prices = result::energy_prices(&inputs.demand, &outcome.demand_con_ids, &outcome.duals);
    println!("\nregion,energy_price");
    for (region, price) in &energy_prices {
        println!("{region},{price:.4}");
    }

    let fcas_prices = result::fcas_prices(&inputs.fcas_requirements, &outcome.fcas_set_con_ids, &outcome.duals);
    println!("\nregion,service,fcas_price");
    for ((region, service), price) in &fcas_prices {
        println!("{region},{service:?},{price:.4}");
    }

    let availability = result::fcas_availability(&outcome.bids, &outcome.rows, &outcome.terms, &outcome.primal);
    println!("\nunit,dispatch_type,service,availability");
    for row in &availability {
        println!("{},{:?},{:?},{:.4}", row.unit, row.dispatch_type, row.service, row.availability);
    }

    let summary = result::region_dispatch_summary(
        &inputs.demand,
        &unit_dispatch,
        &outcome.region_by_unit,
        &outcome.directions,
        &flows,
        &outcome.loss_shares,
    );
    println!("\nregion,dispatch,interconnector_inflow,interconnector_losses");
    for row in &summary {
        println!("{},{:.4},{:.4},{:.4}", row.region, row.dispatch, row.interconnector_inflow, row.interconnector_losses);
    }
}
