//! Interconnector loss module (component F, §4.6): flow, loss and SOS2
//! weight variables, and the three linking constraint sets per link.
use crate::constraint::{ConstraintRow, ConstraintType, LhsTerm};
use crate::ids::{IdAllocator, VarId};
use crate::interconnector::{InterconnectorDirection, LossModel};
use crate::variables::{Variable, VariableKind};
use std::collections::HashMap;

/// Everything the loss module contributes to the model for one dispatch
/// interval.
pub struct LossModuleOutput {
    pub variables: Vec<Variable>,
    pub rows: Vec<ConstraintRow>,
    pub terms: Vec<LhsTerm>,
    /// Flow variable id, keyed by link id.
    pub flow_vars: HashMap<String, VarId>,
    /// Loss variable id, keyed by link id.
    pub loss_vars: HashMap<String, VarId>,
    /// From-region loss share, keyed by link id (for the demand balance
    /// builder, §4.3).
    pub loss_shares: HashMap<String, f64>,
    /// Weight variable ids per link, in ascending break-point order — the
    /// SOS2 group the solver interface declares (§4.6 step 4).
    pub sos2_groups: Vec<Vec<VarId>>,
    /// Link id for each entry of `sos2_groups`, same index order.
    pub sos2_links: Vec<String>,
    /// Break-points (same order as the weights) for each entry of
    /// `sos2_groups` — lets the re-linearization step (§4.9 step 5) find
    /// distance-from-flow without re-deriving the loss model.
    pub sos2_break_points: Vec<Vec<f64>>,
    /// Flow variable ids sharing one market interconnector id — the SOS1
    /// group declared when a plain interconnector has more than one
    /// direction link (§4.6 step 5).
    pub sos1_groups: Vec<Vec<VarId>>,
}

/// Build the flow/loss/weight variables and linking constraints for every
/// direction and loss model in this interval.
pub fn build_loss_module(
    directions: &[InterconnectorDirection],
    loss_models: &[LossModel],
    alloc: &mut IdAllocator,
) -> LossModuleOutput {
    let mut variables = Vec::new();
    let mut rows = Vec::new();
    let mut terms = Vec::new();
    let mut flow_vars = HashMap::new();
    let mut loss_vars = HashMap::new();
    let mut loss_shares = HashMap::new();
    let mut sos2_groups = Vec::new();
    let mut sos2_links = Vec::new();
    let mut sos2_break_points = Vec::new();

    for direction in directions {
        let link = direction.link_id();
        let id = alloc.alloc_vars(1).start;
        variables.push(Variable { id, lower: direction.min, upper: direction.max, kind: VariableKind::Continuous, owner: "interconnector_flow" });
        flow_vars.insert(link, id);
    }

    for model in loss_models {
        let max_abs = model.break_points.iter().map(|(bp, _)| bp.abs()).fold(0.0_f64, f64::max);

        let loss_id = alloc.alloc_vars(1).start;
        variables.push(Variable { id: loss_id, lower: -max_abs, upper: max_abs, kind: VariableKind::Continuous, owner: "interconnector_loss" });
        loss_vars.insert(model.link.clone(), loss_id);
        loss_shares.insert(model.link.clone(), model.from_region_loss_share);

        let weight_ids = alloc.alloc_vars(model.break_points.len());
        let mut weight_var_ids = Vec::with_capacity(model.break_points.len());
        for id in weight_ids {
            variables.push(Variable { id, lower: 0.0, upper: 1.0, kind: VariableKind::Continuous, owner: "loss_weight" });
            weight_var_ids.push(id);
        }

        let Some(&flow_id) = flow_vars.get(&model.link) else { continue };

        let sum_to_one_id = alloc.alloc_cons(1).start;
        rows.push(ConstraintRow { id: sum_to_one_id, constraint_type: ConstraintType::Equal, rhs: 1.0, owner: "loss_weights_sum_to_one" });
        for &w in &weight_var_ids {
            terms.push(LhsTerm { constraint_id: sum_to_one_id, variable_id: w, coefficient: 1.0 });
        }

        let flow_match_id = alloc.alloc_cons(1).start;
        rows.push(ConstraintRow { id: flow_match_id, constraint_type: ConstraintType::Equal, rhs: 0.0, owner: "loss_weights_match_flow" });
        for (&w, (bp, _)) in weight_var_ids.iter().zip(&model.break_points) {
            terms.push(LhsTerm { constraint_id: flow_match_id, variable_id: w, coefficient: *bp });
        }
        terms.push(LhsTerm { constraint_id: flow_match_id, variable_id: flow_id, coefficient: -1.0 });

        let loss_match_id = alloc.alloc_cons(1).start;
        rows.push(ConstraintRow { id: loss_match_id, constraint_type: ConstraintType::Equal, rhs: 0.0, owner: "loss_weights_match_loss" });
        for (&w, (_, loss_mw)) in weight_var_ids.iter().zip(&model.break_points) {
            terms.push(LhsTerm { constraint_id: loss_match_id, variable_id: w, coefficient: *loss_mw });
        }
        terms.push(LhsTerm { constraint_id: loss_match_id, variable_id: loss_id, coefficient: -1.0 });

        sos2_break_points.push(model.break_points.iter().map(|(bp, _)| *bp).collect());
        sos2_links.push(model.link.clone());
        sos2_groups.push(weight_var_ids);
    }

    let sos1_groups = build_sos1_groups(directions, &flow_vars);

    LossModuleOutput {
        variables,
        rows,
        terms,
        flow_vars,
        loss_vars,
        loss_shares,
        sos2_groups,
        sos2_links,
        sos2_break_points,
        sos1_groups,
    }
}

/// For each market interconnector with more than one direction link, group
/// their flow variable ids into a SOS1 set so only one direction carries
/// flow (§4.6 step 5).
fn build_sos1_groups(
    directions: &[InterconnectorDirection],
    flow_vars: &HashMap<String, VarId>,
) -> Vec<Vec<VarId>> {
    let mut by_interconnector: HashMap<&str, Vec<VarId>> = HashMap::new();
    for direction in directions {
        if !direction.is_market_link() {
            continue;
        }
        if let Some(&var_id) = flow_vars.get(&direction.link_id()) {
            by_interconnector.entry(direction.interconnector.as_str()).or_default().push(var_id);
        }
    }
    by_interconnector.into_values().filter(|group| group.len() > 1).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loss_module_wires_weights_to_flow_and_loss() {
        let directions = vec![InterconnectorDirection {
            interconnector: "inter_one".into(),
            link: None,
            from_region: "NSW".into(),
            to_region: "VIC".into(),
            min: -120.0,
            max: 120.0,
            from_region_loss_factor: 1.0,
            to_region_loss_factor: 1.0,
            generic_constraint_factor: 1,
        }];
        let loss_models = vec![LossModel {
            interconnector: "inter_one".into(),
            link: "inter_one".into(),
            from_region_loss_share: 0.5,
            break_points: vec![(-120.0, -6.0), (0.0, 0.0), (100.0, 4.615)],
        }];
        let mut alloc = IdAllocator::new();
        let out = build_loss_module(&directions, &loss_models, &mut alloc);
        assert_eq!(out.sos2_groups.len(), 1);
        assert_eq!(out.sos2_groups[0].len(), 3);
        assert_eq!(out.rows.len(), 3);
        assert!(out.flow_vars.contains_key("inter_one"));
        assert!(out.loss_vars.contains_key("inter_one"));
        assert!(out.sos1_groups.is_empty());
    }

    #[test]
    fn test_market_interconnector_links_form_a_sos1_group() {
        let directions = vec![
            InterconnectorDirection {
                interconnector: "basslink".into(),
                link: Some("basslink_forward".into()),
                from_region: "VIC".into(),
                to_region: "TAS".into(),
                min: 0.0,
                max: 500.0,
                from_region_loss_factor: 1.0,
                to_region_loss_factor: 1.0,
                generic_constraint_factor: 1,
            },
            InterconnectorDirection {
                interconnector: "basslink".into(),
                link: Some("basslink_reverse".into()),
                from_region: "TAS".into(),
                to_region: "VIC".into(),
                min: 0.0,
                max: 500.0,
                from_region_loss_factor: 1.0,
                to_region_loss_factor: 1.0,
                generic_constraint_factor: -1,
            },
        ];
        let mut alloc = IdAllocator::new();
        let out = build_loss_module(&directions, &[], &mut alloc);
        assert_eq!(out.sos1_groups.len(), 1);
        assert_eq!(out.sos1_groups[0].len(), 2);
    }
}
