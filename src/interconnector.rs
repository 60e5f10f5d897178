//! Interconnectors, links, and their piecewise-linear loss models (§3, §4.6).
use serde::Deserialize;
use std::collections::HashMap;

fn default_link(interconnector: &str) -> String {
    interconnector.to_string()
}

fn default_loss_factor() -> f64 {
    1.0
}

fn default_generic_constraint_factor() -> i8 {
    1
}

/// One directional link of an interconnector.
///
/// For a plain interconnector `link` equals `interconnector`. A directional
/// "market interconnector" has two rows sharing `interconnector` but with
/// distinct `link` ids, one per direction, each with its own loss factors
/// and generic-constraint sign.
#[derive(Debug, Clone, Deserialize)]
pub struct InterconnectorDirection {
    pub interconnector: String,
    #[serde(default)]
    pub link: Option<String>,
    pub from_region: String,
    pub to_region: String,
    pub min: f64,
    pub max: f64,
    #[serde(default = "default_loss_factor")]
    pub from_region_loss_factor: f64,
    #[serde(default = "default_loss_factor")]
    pub to_region_loss_factor: f64,
    #[serde(default = "default_generic_constraint_factor")]
    pub generic_constraint_factor: i8,
}

impl InterconnectorDirection {
    /// The effective link id: `link` if present, else `interconnector`.
    pub fn link_id(&self) -> String {
        self.link.clone().unwrap_or_else(|| default_link(&self.interconnector))
    }

    /// Whether this direction is part of a multi-link ("market")
    /// interconnector, i.e. `link` was given and differs from `interconnector`.
    pub fn is_market_link(&self) -> bool {
        self.link.as_deref().is_some_and(|l| l != self.interconnector)
    }
}

/// Per-link loss share between the two connected regions.
#[derive(Debug, Clone, Deserialize)]
pub struct LossShareRow {
    pub interconnector: String,
    #[serde(default)]
    pub link: Option<String>,
    /// Fraction of losses attributed to `from_region`; `1 - share` goes to
    /// `to_region`.
    pub from_region_loss_share: f64,
}

/// One break-point of a link's piecewise-linear loss function, with the loss
/// function pre-evaluated at that flow (the "equivalent piecewise-evaluable
/// description" spec.md §6 allows in place of a callable).
#[derive(Debug, Clone, Deserialize)]
pub struct LossBreakPointRow {
    pub interconnector: String,
    #[serde(default)]
    pub link: Option<String>,
    pub loss_segment: u32,
    pub break_point: f64,
    pub loss_mw: f64,
}

/// A link's breakpoints, sorted by `loss_segment`.
#[derive(Debug, Clone)]
pub struct LossModel {
    pub interconnector: String,
    pub link: String,
    pub from_region_loss_share: f64,
    /// `(break_point, loss_mw)` pairs, ascending by `loss_segment`.
    pub break_points: Vec<(f64, f64)>,
}

fn row_link_id(interconnector: &str, link: &Option<String>) -> String {
    link.clone().unwrap_or_else(|| interconnector.to_string())
}

/// Group loss-share and break-point rows into one [`LossModel`] per link,
/// break-points sorted ascending by `loss_segment`.
pub fn assemble_loss_models(loss_shares: &[LossShareRow], break_points: &[LossBreakPointRow]) -> Vec<LossModel> {
    let mut shares: HashMap<String, f64> = HashMap::new();
    for row in loss_shares {
        shares.insert(row_link_id(&row.interconnector, &row.link), row.from_region_loss_share);
    }

    let mut grouped: HashMap<(String, String), Vec<(u32, f64, f64)>> = HashMap::new();
    for row in break_points {
        let link = row_link_id(&row.interconnector, &row.link);
        grouped
            .entry((row.interconnector.clone(), link))
            .or_default()
            .push((row.loss_segment, row.break_point, row.loss_mw));
    }

    let mut models: Vec<LossModel> = grouped
        .into_iter()
        .map(|((interconnector, link), mut segments)| {
            segments.sort_by_key(|(segment, _, _)| *segment);
            let from_region_loss_share = shares.get(&link).copied().unwrap_or(0.5);
            LossModel {
                interconnector,
                link,
                from_region_loss_share,
                break_points: segments.into_iter().map(|(_, bp, loss)| (bp, loss)).collect(),
            }
        })
        .collect();
    models.sort_by(|a, b| (a.interconnector.as_str(), a.link.as_str()).cmp(&(b.interconnector.as_str(), b.link.as_str())));
    models
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assemble_loss_models_sorts_by_segment() {
        let shares = vec![LossShareRow { interconnector: "inter_one".into(), link: None, from_region_loss_share: 0.5 }];
        let break_points = vec![
            LossBreakPointRow { interconnector: "inter_one".into(), link: None, loss_segment: 2, break_point: 100.0, loss_mw: 4.615 },
            LossBreakPointRow { interconnector: "inter_one".into(), link: None, loss_segment: 0, break_point: -120.0, loss_mw: -6.0 },
            LossBreakPointRow { interconnector: "inter_one".into(), link: None, loss_segment: 1, break_point: 0.0, loss_mw: 0.0 },
        ];
        let models = assemble_loss_models(&shares, &break_points);
        assert_eq!(models.len(), 1);
        assert_eq!(models[0].from_region_loss_share, 0.5);
        assert_eq!(models[0].break_points, vec![(-120.0, -6.0), (0.0, 0.0), (100.0, 4.615)]);
    }

    #[test]
    fn test_link_id_defaults_to_interconnector() {
        let d = InterconnectorDirection {
            interconnector: "inter_one".into(),
            link: None,
            from_region: "NSW".into(),
            to_region: "VIC".into(),
            min: -100.0,
            max: 100.0,
            from_region_loss_factor: default_loss_factor(),
            to_region_loss_factor: default_loss_factor(),
            generic_constraint_factor: default_generic_constraint_factor(),
        };
        assert_eq!(d.link_id(), "inter_one");
        assert!(!d.is_market_link());
    }

    #[test]
    fn test_is_market_link_when_link_differs() {
        let d = InterconnectorDirection {
            interconnector: "basslink".into(),
            link: Some("basslink_forward".into()),
            from_region: "VIC".into(),
            to_region: "TAS".into(),
            min: 0.0,
            max: 500.0,
            from_region_loss_factor: 1.0,
            to_region_loss_factor: 1.0,
            generic_constraint_factor: 1,
        };
        assert!(d.is_market_link());
    }
}
