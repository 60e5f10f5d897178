//! Code for loading the run configuration for a dispatch interval.
use crate::input::read_toml;
use crate::log::DEFAULT_LOG_LEVEL;
use anyhow::{ensure, Result};
use documented::DocumentedFields;
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::path::Path;

const DEFAULT_SETTINGS_FILE_HEADER: &str =
    "# This file contains the run configuration for the market engine.\n";

/// Default log level for program
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

/// Default dispatch interval length, in minutes (AEMO's five-minute dispatch interval).
fn default_dispatch_interval() -> f64 {
    5.0
}

fn default_validate_inputs() -> bool {
    true
}

/// The identifier of the underlying LP/MIP solver to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SolverName {
    /// The HiGHS open-source LP/MIP solver (the only backend currently wired up).
    Highs,
}

impl Default for SolverName {
    fn default() -> Self {
        Self::Highs
    }
}

/// Run configuration for a single dispatch interval.
///
/// Corresponds to the "Configuration" options in the external interface: dispatch interval
/// length, which solver to use, whether the over-constrained dispatch re-run is permitted, the
/// market price caps/floor that trigger it, and whether input validation is performed.
#[derive(Debug, Clone, DocumentedFields, Serialize, Deserialize, PartialEq)]
pub struct Configuration {
    /// The default program log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Length of the dispatch interval, in minutes.
    #[serde(default = "default_dispatch_interval")]
    pub dispatch_interval: f64,
    /// Which solver backend to use.
    #[serde(default)]
    pub solver_name: SolverName,
    /// Whether to run the over-constrained dispatch re-run (section 4.9 step 7) when a market
    /// price cap/floor is hit while an elastic constraint was violated.
    #[serde(default)]
    pub allow_over_constrained_dispatch_re_run: bool,
    /// The energy market price floor. Required (and must be finite) when
    /// `allow_over_constrained_dispatch_re_run` is set.
    #[serde(default)]
    pub energy_market_floor_price: Option<f64>,
    /// The energy market price cap. Required (and must be finite) when
    /// `allow_over_constrained_dispatch_re_run` is set.
    #[serde(default)]
    pub energy_market_ceiling_price: Option<f64>,
    /// The FCAS market price cap. Required (and must be finite) when
    /// `allow_over_constrained_dispatch_re_run` is set.
    #[serde(default)]
    pub fcas_market_ceiling_price: Option<f64>,
    /// Whether to validate input tables before building the model. When disabled, the builders
    /// trust caller input and may silently produce a solution containing NaNs.
    #[serde(default = "default_validate_inputs")]
    pub validate_inputs: bool,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            dispatch_interval: default_dispatch_interval(),
            solver_name: SolverName::default(),
            allow_over_constrained_dispatch_re_run: false,
            energy_market_floor_price: None,
            energy_market_ceiling_price: None,
            fcas_market_ceiling_price: None,
            validate_inputs: default_validate_inputs(),
        }
    }
}

impl Configuration {
    /// Read configuration from a TOML file.
    ///
    /// If the file is not present, default values are used.
    ///
    /// # Returns
    ///
    /// The run configuration as a [`Configuration`] struct or an error if the file is invalid.
    pub fn load_from_path(file_path: &Path) -> Result<Configuration> {
        if !file_path.is_file() {
            return Ok(Configuration::default());
        }

        let config: Configuration = read_toml(file_path)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the over-constrained dispatch re-run's required prices are present.
    pub fn validate(&self) -> Result<()> {
        if self.allow_over_constrained_dispatch_re_run {
            ensure!(
                self.energy_market_floor_price.is_some_and(f64::is_finite),
                "energy_market_floor_price must be set and finite when \
                 allow_over_constrained_dispatch_re_run is true"
            );
            ensure!(
                self.energy_market_ceiling_price
                    .is_some_and(f64::is_finite),
                "energy_market_ceiling_price must be set and finite when \
                 allow_over_constrained_dispatch_re_run is true"
            );
            ensure!(
                self.fcas_market_ceiling_price.is_some_and(f64::is_finite),
                "fcas_market_ceiling_price must be set and finite when \
                 allow_over_constrained_dispatch_re_run is true"
            );
        }
        Ok(())
    }

    /// The contents of the default configuration file, with doc comments as TOML comments.
    pub fn default_file_contents() -> String {
        let config = Configuration::default();
        let config_raw = toml::to_string(&config).expect("Could not convert configuration to TOML");

        let mut out = DEFAULT_SETTINGS_FILE_HEADER.to_string();
        for line in config_raw.split('\n') {
            if let Some(last) = line.find('=') {
                let field = line[..last].trim();
                if let Ok(docs) = Configuration::get_field_docs(field) {
                    for doc_line in docs.split('\n') {
                        writeln!(&mut out, "# {}", doc_line.trim()).unwrap();
                    }
                }
                writeln!(&mut out, "{}", line.trim()).unwrap();
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write as _;
    use tempfile::tempdir;

    #[test]
    fn test_load_from_path_no_file() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("config.toml");
        assert_eq!(
            Configuration::load_from_path(&file_path).unwrap(),
            Configuration::default()
        );
    }

    #[test]
    fn test_load_from_path() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("config.toml");
        {
            let mut file = File::create(&file_path).unwrap();
            writeln!(file, "dispatch_interval = 30.0").unwrap();
        }

        let config = Configuration::load_from_path(&file_path).unwrap();
        assert_eq!(config.dispatch_interval, 30.0);
        assert!(!config.allow_over_constrained_dispatch_re_run);
    }

    #[test]
    fn test_validate_requires_prices_for_ocd() {
        let mut config = Configuration {
            allow_over_constrained_dispatch_re_run: true,
            ..Configuration::default()
        };
        assert!(config.validate().is_err());

        config.energy_market_floor_price = Some(-1000.0);
        config.energy_market_ceiling_price = Some(16_600.0);
        config.fcas_market_ceiling_price = Some(16_600.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_file_contents_not_empty() {
        assert!(!Configuration::default_file_contents().is_empty());
    }
}
