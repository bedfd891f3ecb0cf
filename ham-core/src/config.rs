//! Declarative model specifications.
//!
//! A model is described in a TOML file: the household block and the
//! aggregate projection (both dispatched by a `type` key to a registered
//! implementation), the idiosyncratic and aggregate shock processes, and
//! the asset grid. `build` discretizes the idiosyncratic process and
//! assembles a ready-to-solve [`AggregateModel`].

use crate::equilibrium::{AggregateModel, AggregateModelBuilder, Projection};
use crate::errors::{HamError, HamResult};
use crate::grid::CartesianGrid;
use crate::household::Household;
use crate::markov::Ar1Process;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// How to discretize the idiosyncratic process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscretizationMethod {
    #[default]
    Rouwenhorst,
    Tauchen,
}

/// The idiosyncratic shock process and its discretization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdiosyncraticSpec {
    pub rho: f64,
    pub sigma: f64,
    /// Number of discrete states.
    pub states: usize,
    #[serde(default)]
    pub method: DiscretizationMethod,
    /// Grid width in unconditional standard deviations (Tauchen only).
    #[serde(default = "default_tauchen_width")]
    pub width: f64,
}

fn default_tauchen_width() -> f64 {
    3.0
}

/// The aggregate exogenous process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateShockSpec {
    pub rho: f64,
    pub sigma: f64,
}

/// The asset grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    pub min: f64,
    pub max: f64,
    pub points: usize,
}

/// A complete declarative model specification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSpec {
    pub name: String,
    /// The individual block, dispatched by its `type` key.
    pub household: Arc<dyn Household>,
    /// The aggregate price mapping, dispatched by its `type` key.
    ///
    /// Required: a specification without a projection fails to parse.
    pub projection: Arc<dyn Projection>,
    pub idiosyncratic: IdiosyncraticSpec,
    pub aggregate: AggregateShockSpec,
    pub grid: GridSpec,
}

impl ModelSpec {
    /// Parse and validate a specification from TOML text.
    pub fn from_toml_str(text: &str) -> HamResult<Self> {
        let spec: ModelSpec = toml::from_str(text)?;
        spec.validate()?;
        Ok(spec)
    }

    /// Read, parse and validate a specification file.
    pub fn from_path(path: impl AsRef<Path>) -> HamResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Check parameter ranges without building the model.
    pub fn validate(&self) -> HamResult<()> {
        // Constructor validation covers the process parameters
        Ar1Process::new(self.idiosyncratic.rho, self.idiosyncratic.sigma)?;
        Ar1Process::new(self.aggregate.rho, self.aggregate.sigma)?;
        CartesianGrid::new(self.grid.min, self.grid.max, self.grid.points)?;

        if self.idiosyncratic.states == 0 {
            return Err(HamError::InvalidParameter {
                name: "idiosyncratic.states".to_string(),
                reason: "at least one state required".to_string(),
            });
        }
        if !(self.idiosyncratic.width > 0.0) {
            return Err(HamError::InvalidParameter {
                name: "idiosyncratic.width".to_string(),
                reason: format!("must be positive, got {}", self.idiosyncratic.width),
            });
        }

        self.household.validate()?;
        self.projection.validate()?;
        Ok(())
    }

    /// Discretize the idiosyncratic process and assemble the model.
    pub fn build(&self) -> HamResult<AggregateModel> {
        let process = Ar1Process::new(self.idiosyncratic.rho, self.idiosyncratic.sigma)?;
        let chain = match self.idiosyncratic.method {
            DiscretizationMethod::Rouwenhorst => process.rouwenhorst(self.idiosyncratic.states)?,
            DiscretizationMethod::Tauchen => {
                process.tauchen(self.idiosyncratic.states, self.idiosyncratic.width)?
            }
        };
        let grid = CartesianGrid::new(self.grid.min, self.grid.max, self.grid.points)?;
        let aggregate_shock = Ar1Process::new(self.aggregate.rho, self.aggregate.sigma)?;

        AggregateModelBuilder::new()
            .with_household(self.household.clone())
            .with_projection(self.projection.clone())
            .with_shock_chain(chain)
            .with_asset_grid(grid)
            .with_aggregate_shock(aggregate_shock)
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPEC: &str = r#"
        name = "test economy"

        [household]
        type = "test_power_utility"
        beta = 0.95
        gamma = 2.0

        [projection]
        type = "test_fixed_prices"
        r = 0.02
        w = 1.0

        [idiosyncratic]
        rho = 0.9
        sigma = 0.1
        states = 2

        [aggregate]
        rho = 0.9
        sigma = 0.01

        [grid]
        min = 0.0
        max = 20.0
        points = 40
    "#;

    #[test]
    fn parses_and_builds_a_model() {
        let spec = ModelSpec::from_toml_str(SPEC).unwrap();
        assert_eq!(spec.name, "test economy");
        assert_eq!(spec.idiosyncratic.method, DiscretizationMethod::Rouwenhorst);

        let model = spec.build().unwrap();
        assert_eq!(model.chain().n_states(), 2);
        assert_eq!(model.grid().len(), 40);
        assert_eq!(model.aggregate_shock().rho(), 0.9);
    }

    #[test]
    fn tauchen_method_is_selectable() {
        let text = SPEC.replace("states = 2", "states = 3\nmethod = \"tauchen\"\nwidth = 2.5");
        let spec = ModelSpec::from_toml_str(&text).unwrap();
        assert_eq!(spec.idiosyncratic.method, DiscretizationMethod::Tauchen);

        let model = spec.build().unwrap();
        assert_eq!(model.chain().n_states(), 3);
    }

    #[test]
    fn missing_projection_fails_to_parse() {
        let text = SPEC.replace("[projection]", "[not_a_projection]");
        assert!(matches!(
            ModelSpec::from_toml_str(&text),
            Err(HamError::Parse(_))
        ));
    }

    #[test]
    fn unknown_household_type_fails_to_parse() {
        let text = SPEC.replace("test_power_utility", "no_such_household");
        assert!(ModelSpec::from_toml_str(&text).is_err());
    }

    #[test]
    fn out_of_range_parameters_are_rejected() {
        for (from, to) in [
            ("rho = 0.9", "rho = 1.5"),
            ("sigma = 0.1", "sigma = -0.1"),
            ("points = 40", "points = 1"),
            ("beta = 0.95", "beta = 1.5"),
        ] {
            let text = SPEC.replacen(from, to, 1);
            assert!(
                ModelSpec::from_toml_str(&text).is_err(),
                "expected {to:?} to be rejected"
            );
        }
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        assert!(matches!(
            ModelSpec::from_toml_str("name = [unclosed"),
            Err(HamError::Parse(_))
        ));
    }

    #[test]
    fn specs_round_trip_through_serde() {
        let spec = ModelSpec::from_toml_str(SPEC).unwrap();
        let json = serde_json::to_string(&spec).unwrap();
        let back: ModelSpec = serde_json::from_str(&json).unwrap();

        assert_eq!(back.name, spec.name);
        assert_eq!(back.grid, spec.grid);
        assert_eq!(back.idiosyncratic, spec.idiosyncratic);
        assert!(back.build().is_ok());
    }
}
