//! End-to-end dispatch scenarios run through the public `market::dispatch`
//! entry point, covering one merit-order, one interconnector-loss, one
//! joint-FCAS, one ramp-limited and one fast-start interval.
use market_engine::bid::{PriceBidRow, VolumeBidRow};
use market_engine::constraint::ConstraintType;
use market_engine::demand::RegionDemand;
use market_engine::fast_start::FastStartStartState;
use market_engine::generic_constraint::FcasRequirementRow;
use market_engine::interconnector::{InterconnectorDirection, LossBreakPointRow, LossShareRow};
use market_engine::market::{self, MarketInputs};
use market_engine::ramp::RampBidRow;
use market_engine::result;
use market_engine::service::Service;
use market_engine::settings::Configuration;
use market_engine::trapezium::FcasTrapezium;
use market_engine::unit::{DispatchType, UnitInfo};
use std::collections::HashMap;

fn volume_row(unit: &str, service: Service, dispatch_type: DispatchType, band_1: f64) -> VolumeBidRow {
    VolumeBidRow {
        unit: unit.to_string(),
        service,
        dispatch_type,
        band_1: Some(band_1),
        band_2: None,
        band_3: None,
        band_4: None,
        band_5: None,
        band_6: None,
        band_7: None,
        band_8: None,
        band_9: None,
        band_10: None,
    }
}

fn price_row(unit: &str, service: Service, dispatch_type: DispatchType, band_1: f64) -> PriceBidRow {
    PriceBidRow {
        unit: unit.to_string(),
        service,
        dispatch_type,
        band_1: Some(band_1),
        band_2: None,
        band_3: None,
        band_4: None,
        band_5: None,
        band_6: None,
        band_7: None,
        band_8: None,
        band_9: None,
        band_10: None,
    }
}

/// Two-band volume/price rows, used by the merit-order scenario.
fn two_band(unit: &str, bands: [(f64, f64); 2]) -> (VolumeBidRow, PriceBidRow) {
    let volumes = VolumeBidRow {
        unit: unit.to_string(),
        service: Service::Energy,
        dispatch_type: DispatchType::Generator,
        band_1: Some(bands[0].0),
        band_2: Some(bands[1].0),
        band_3: None,
        band_4: None,
        band_5: None,
        band_6: None,
        band_7: None,
        band_8: None,
        band_9: None,
        band_10: None,
    };
    let prices = PriceBidRow {
        unit: unit.to_string(),
        service: Service::Energy,
        dispatch_type: DispatchType::Generator,
        band_1: Some(bands[0].1),
        band_2: Some(bands[1].1),
        band_3: None,
        band_4: None,
        band_5: None,
        band_6: None,
        band_7: None,
        band_8: None,
        band_9: None,
        band_10: None,
    };
    (volumes, prices)
}

fn unit(unit: &str, region: &str, dispatch_type: DispatchType) -> UnitInfo {
    UnitInfo { unit: unit.to_string(), region: region.to_string(), dispatch_type, loss_factor: 1.0 }
}

/// Volume/price rows with three energy bands, used by the merit-order scenario.
fn three_band(unit: &str, bands: [(f64, f64); 3]) -> (VolumeBidRow, PriceBidRow) {
    let volumes = VolumeBidRow {
        unit: unit.to_string(),
        service: Service::Energy,
        dispatch_type: DispatchType::Generator,
        band_1: Some(bands[0].0),
        band_2: Some(bands[1].0),
        band_3: Some(bands[2].0),
        band_4: None,
        band_5: None,
        band_6: None,
        band_7: None,
        band_8: None,
        band_9: None,
        band_10: None,
    };
    let prices = PriceBidRow {
        unit: unit.to_string(),
        service: Service::Energy,
        dispatch_type: DispatchType::Generator,
        band_1: Some(bands[0].1),
        band_2: Some(bands[1].1),
        band_3: Some(bands[2].1),
        band_4: None,
        band_5: None,
        band_6: None,
        band_7: None,
        band_8: None,
        band_9: None,
        band_10: None,
    };
    (volumes, prices)
}

#[test]
fn test_merit_order_clears_at_marginal_band_price() {
    // A: 20 MW @ $50, 20 MW @ $100, 5 MW @ $100. B: 50 MW @ $100, 30 MW @ $130, 10 MW @ $150.
    let (a_volumes, a_prices) = three_band("A", [(20.0, 50.0), (20.0, 100.0), (5.0, 100.0)]);
    let (b_volumes, b_prices) = three_band("B", [(50.0, 100.0), (30.0, 130.0), (10.0, 150.0)]);

    let inputs = MarketInputs {
        units: vec![unit("A", "NSW", DispatchType::Generator), unit("B", "NSW", DispatchType::Generator)],
        volume_bids: vec![a_volumes, b_volumes],
        price_bids: vec![a_prices, b_prices],
        demand: vec![RegionDemand { region: "NSW".into(), demand: 100.0 }],
        ..MarketInputs::default()
    };
    let config = Configuration::default();
    let outcome = market::dispatch(&inputs, &config).unwrap();

    let rows = result::unit_dispatch(&outcome.bids, &outcome.primal);
    let a_total: f64 = rows.iter().filter(|r| r.unit == "A").map(|r| r.dispatch).sum();
    let b_total: f64 = rows.iter().filter(|r| r.unit == "B").map(|r| r.dispatch).sum();
    assert!((a_total - 45.0).abs() < 1e-6, "A dispatch was {a_total}");
    assert!((b_total - 55.0).abs() < 1e-6, "B dispatch was {b_total}");

    let prices = result::energy_prices(&inputs.demand, &outcome.demand_con_ids, &outcome.duals);
    assert!((prices["NSW"] - 130.0).abs() < 1e-6, "price was {}", prices["NSW"]);
}

#[test]
fn test_interconnector_loss_linearization_matches_loss_model() {
    let units = vec![unit("A", "NSW", DispatchType::Generator)];
    let (volumes, prices) = two_band("A", [(100.0, 80.0), (0.0, 0.0)]);
    let directions = vec![InterconnectorDirection {
        interconnector: "inter_one".into(),
        link: None,
        from_region: "NSW".into(),
        to_region: "VIC".into(),
        min: -120.0,
        max: 100.0,
        from_region_loss_factor: 1.0,
        to_region_loss_factor: 1.0,
        generic_constraint_factor: 1,
    }];
    let loss_shares = vec![LossShareRow { interconnector: "inter_one".into(), link: None, from_region_loss_share: 0.5 }];
    let loss_break_points = vec![
        LossBreakPointRow { interconnector: "inter_one".into(), link: None, loss_segment: 0, break_point: -120.0, loss_mw: -6.0 },
        LossBreakPointRow { interconnector: "inter_one".into(), link: None, loss_segment: 1, break_point: 0.0, loss_mw: 0.0 },
        LossBreakPointRow { interconnector: "inter_one".into(), link: None, loss_segment: 2, break_point: 100.0, loss_mw: 5.0 },
    ];
    let inputs = MarketInputs {
        units,
        volume_bids: vec![volumes],
        price_bids: vec![prices],
        demand: vec![RegionDemand { region: "NSW".into(), demand: 0.0 }, RegionDemand { region: "VIC".into(), demand: 90.0 }],
        directions,
        loss_shares,
        loss_break_points,
        ..MarketInputs::default()
    };
    let config = Configuration::default();
    let outcome = market::dispatch(&inputs, &config).unwrap();

    // 5% losses on the 0..100 breakpoint segment: loss = 0.05 * flow. The demand
    // balance splits that loss 50/50 between the two regions (loss_share = 0.5),
    // so flow - 0.5 * loss(flow) = 90 solves to flow = 90 / 0.975 ≈ 92.307692,
    // loss ≈ 4.615385, and NSW generation = 90 + loss ≈ 94.615385 (total
    // generation = total demand plus total loss, independent of how the loss
    // is shared between regions).
    let rows = result::unit_dispatch(&outcome.bids, &outcome.primal);
    let a_total: f64 = rows.iter().filter(|r| r.unit == "A").map(|r| r.dispatch).sum();
    assert!((a_total - 94.615385).abs() < 0.01, "A dispatch was {a_total}");

    let flows = result::interconnector_flows(&inputs.directions, &outcome.flow_vars, &outcome.loss_vars, &outcome.primal);
    assert_eq!(flows.len(), 1);
    assert!((flows[0].flow - 92.307692).abs() < 0.01, "flow was {}", flows[0].flow);
    assert!((flows[0].loss - 4.615385).abs() < 0.01, "loss was {}", flows[0].loss);
}

#[test]
fn test_joint_energy_and_fcas_dispatch_respects_trapezium_envelope() {
    let units = vec![unit("A", "NSW", DispatchType::Generator), unit("B", "NSW", DispatchType::Generator)];

    let volume_bids = vec![
        volume_row("A", Service::Energy, DispatchType::Generator, 100.0),
        volume_row("A", Service::Raise6Sec, DispatchType::Generator, 10.0),
        volume_row("B", Service::Energy, DispatchType::Generator, 110.0),
        volume_row("B", Service::Raise6Sec, DispatchType::Generator, 15.0),
        volume_row("B", Service::RaiseReg, DispatchType::Generator, 15.0),
    ];
    let price_bids = vec![
        price_row("A", Service::Energy, DispatchType::Generator, 40.0),
        price_row("A", Service::Raise6Sec, DispatchType::Generator, 5.0),
        price_row("B", Service::Energy, DispatchType::Generator, 45.0),
        price_row("B", Service::Raise6Sec, DispatchType::Generator, 5.0),
        price_row("B", Service::RaiseReg, DispatchType::Generator, 3.0),
    ];

    let trapeziums = vec![
        FcasTrapezium {
            unit: "A".into(),
            dispatch_type: DispatchType::Generator,
            service: Service::Raise6Sec,
            max_availability: 10.0,
            enablement_min: 70.0,
            low_break_point: 80.0,
            high_break_point: 100.0,
            enablement_max: 110.0,
        },
        FcasTrapezium {
            unit: "B".into(),
            dispatch_type: DispatchType::Generator,
            service: Service::Raise6Sec,
            max_availability: 15.0,
            enablement_min: 50.0,
            low_break_point: 65.0,
            high_break_point: 95.0,
            enablement_max: 110.0,
        },
        FcasTrapezium {
            unit: "B".into(),
            dispatch_type: DispatchType::Generator,
            service: Service::RaiseReg,
            max_availability: 15.0,
            enablement_min: 50.0,
            low_break_point: 65.0,
            high_break_point: 95.0,
            enablement_max: 110.0,
        },
    ];
    let fcas_requirements = vec![
        FcasRequirementRow { set: "raise_6s_req".into(), service: Service::Raise6Sec, region: "NSW".into(), volume: 10.0, constraint_type: ConstraintType::GreaterEqual },
        FcasRequirementRow { set: "raise_reg_req".into(), service: Service::RaiseReg, region: "NSW".into(), volume: 10.0, constraint_type: ConstraintType::GreaterEqual },
    ];

    let inputs = MarketInputs {
        units,
        volume_bids,
        price_bids,
        trapeziums,
        fcas_requirements,
        demand: vec![RegionDemand { region: "NSW".into(), demand: 195.0 }],
        ..MarketInputs::default()
    };
    let config = Configuration::default();
    let outcome = market::dispatch(&inputs, &config).unwrap();

    let rows = result::unit_dispatch(&outcome.bids, &outcome.primal);
    let dispatch_of = |u: &str, s: Service| rows.iter().find(|r| r.unit == u && r.service == s).map_or(0.0, |r| r.dispatch);

    assert!((dispatch_of("A", Service::Energy) - 100.0).abs() < 1e-3);
    assert!((dispatch_of("A", Service::Raise6Sec) - 5.0).abs() < 1e-3);
    assert!((dispatch_of("B", Service::Energy) - 95.0).abs() < 1e-3);
    assert!((dispatch_of("B", Service::Raise6Sec) - 5.0).abs() < 1e-3);
    assert!((dispatch_of("B", Service::RaiseReg) - 10.0).abs() < 1e-3);
}

#[test]
fn test_ramp_limited_dispatch_caps_output_below_capacity_and_demand() {
    let units = vec![unit("A", "NSW", DispatchType::Generator)];
    let (volumes, prices) = two_band("A", [(90.0, 20.0), (0.0, 0.0)]);
    let ramp_bids = vec![RampBidRow {
        unit: "A".into(),
        dispatch_type: None,
        initial_output: 50.0,
        ramp_up_rate: 30.0,
        ramp_down_rate: 30.0,
    }];
    let inputs = MarketInputs {
        units,
        volume_bids: vec![volumes],
        price_bids: vec![prices],
        ramp_bids,
        demand: vec![RegionDemand { region: "NSW".into(), demand: 100.0 }],
        ..MarketInputs::default()
    };
    let mut config = Configuration::default();
    config.dispatch_interval = 30.0;
    let outcome = market::dispatch(&inputs, &config).unwrap();

    let rows = result::unit_dispatch(&outcome.bids, &outcome.primal);
    let a_total: f64 = rows.iter().filter(|r| r.unit == "A").map(|r| r.dispatch).sum();
    // Ramp-constrained at 50 + 30 * 0.5h = 65 MW, well short of both the 90 MW
    // capacity and the 100 MW demand (the elastic demand deficit absorbs the rest).
    assert!((a_total - 65.0).abs() < 1e-6, "A dispatch was {a_total}");
}

#[test]
fn test_fast_start_mode_two_dispatch_is_fixed_by_time_in_mode() {
    let units = vec![unit("A", "NSW", DispatchType::Generator)];
    let (volumes, prices) = two_band("A", [(40.0, 0.01), (0.0, 0.0)]);
    let fast_start_states = vec![FastStartStartState {
        unit: "A".into(),
        current_mode: 2,
        time_in_current_mode: 0.0,
        mode_two_length: 10.0,
        mode_four_length: 20.0,
        min_loading: 40.0,
    }];
    let inputs = MarketInputs {
        units,
        volume_bids: vec![volumes],
        price_bids: vec![prices],
        fast_start_states,
        demand: vec![RegionDemand { region: "NSW".into(), demand: 100.0 }],
        ..MarketInputs::default()
    };
    let mut config = Configuration::default();
    config.dispatch_interval = 5.0;
    let outcome = market::dispatch(&inputs, &config).unwrap();

    let rows = result::unit_dispatch(&outcome.bids, &outcome.primal);
    let a_total: f64 = rows.iter().filter(|r| r.unit == "A").map(|r| r.dispatch).sum();
    // time_in_end_mode = 0 + 5 = 5, mode_two_length = 10: dispatch = (5/10) * 40 = 20 MW,
    // fixed by the mode-2 profile band regardless of how cheap the bid is.
    assert!((a_total - 20.0).abs() < 1e-6, "A dispatch was {a_total}");
}
