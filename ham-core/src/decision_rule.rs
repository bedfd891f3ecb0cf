//! Decision rules tabulated on the product of exogenous and endogenous grids.

use crate::errors::{HamError, HamResult};
use crate::grid::CartesianGrid;
use ndarray::{Array2, ArrayView1};
use serde::{Deserialize, Serialize};

/// A control variable tabulated on the product of the exogenous Markov
/// nodes (rows) and the endogenous asset grid (columns).
///
/// Evaluation interpolates linearly along the asset dimension and
/// extrapolates linearly beyond the ends of the grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRule {
    grid: CartesianGrid,
    values: Array2<f64>,
}

impl DecisionRule {
    /// Create a decision rule from tabulated values.
    ///
    /// `values` must have one column per grid node.
    pub fn new(grid: CartesianGrid, values: Array2<f64>) -> HamResult<Self> {
        if values.ncols() != grid.len() || values.nrows() == 0 {
            return Err(HamError::ShapeMismatch {
                context: "decision rule values".to_string(),
                expected: format!("(n_exogenous >= 1) x {}", grid.len()),
                actual: format!("{}x{}", values.nrows(), values.ncols()),
            });
        }
        Ok(Self { grid, values })
    }

    /// Number of exogenous states the rule is tabulated over.
    pub fn n_exogenous(&self) -> usize {
        self.values.nrows()
    }

    pub fn grid(&self) -> &CartesianGrid {
        &self.grid
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    /// Tabulated values for exogenous state `i_exo`.
    pub fn row(&self, i_exo: usize) -> ArrayView1<f64> {
        self.values.row(i_exo)
    }

    /// Evaluate the rule at asset level `assets` in exogenous state `i_exo`.
    ///
    /// # Panics
    /// Panics if `i_exo` is out of range.
    pub fn eval(&self, i_exo: usize, assets: f64) -> f64 {
        assert!(
            i_exo < self.values.nrows(),
            "exogenous index {} out of range",
            i_exo
        );
        self.grid.interp(self.values.row(i_exo), assets)
    }

    /// Sup-norm distance to another rule tabulated on the same grid.
    pub fn max_abs_diff(&self, other: &DecisionRule) -> f64 {
        assert_eq!(
            self.values.dim(),
            other.values.dim(),
            "rules must share a tabulation"
        );
        self.values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max)
    }
}
