//! Grids over endogenous states.

use crate::errors::{HamError, HamResult};
use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};

/// A uniformly spaced grid over a one-dimensional endogenous state
/// (asset holdings).
///
/// The grid spans `[min, max]` with `points` nodes. Uniform spacing keeps
/// node lookup O(1), which matters on the hot path of the distribution
/// transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartesianGrid {
    min: f64,
    max: f64,
    points: usize,
}

impl CartesianGrid {
    /// Create a new grid over `[min, max]` with `points` nodes.
    pub fn new(min: f64, max: f64, points: usize) -> HamResult<Self> {
        if !(max > min) {
            return Err(HamError::InvalidParameter {
                name: "grid".to_string(),
                reason: format!("max ({max}) must be greater than min ({min})"),
            });
        }
        if points < 2 {
            return Err(HamError::InvalidParameter {
                name: "grid".to_string(),
                reason: format!("at least 2 points required, got {points}"),
            });
        }
        Ok(Self { min, max, points })
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn len(&self) -> usize {
        self.points
    }

    pub fn is_empty(&self) -> bool {
        self.points == 0
    }

    /// Distance between adjacent nodes.
    pub fn step(&self) -> f64 {
        (self.max - self.min) / (self.points - 1) as f64
    }

    /// The i-th node value.
    ///
    /// # Panics
    /// Panics if `i` is out of range.
    pub fn node(&self, i: usize) -> f64 {
        assert!(i < self.points, "node index {} out of range", i);
        self.min + i as f64 * self.step()
    }

    /// All node values.
    pub fn nodes(&self) -> Array1<f64> {
        Array1::from_shape_fn(self.points, |i| self.node(i))
    }

    /// Locate the grid segment bracketing `x`.
    ///
    /// Returns `(i, w)` such that `x` is represented as mass `1 - w` on node
    /// `i` and mass `w` on node `i + 1`, with `i <= len() - 2` and
    /// `w` clamped to `[0, 1]`. Values outside the grid are assigned
    /// entirely to the nearest end node.
    pub fn bracket(&self, x: f64) -> (usize, f64) {
        let pos = (x - self.min) / self.step();
        let i = (pos.floor() as isize).clamp(0, self.points as isize - 2) as usize;
        let w = (pos - i as f64).clamp(0.0, 1.0);
        (i, w)
    }

    /// Linearly interpolate `values` (one per node) at `x`, extrapolating
    /// linearly beyond either end of the grid.
    ///
    /// # Panics
    /// Panics if `values` does not have one entry per node.
    pub fn interp(&self, values: ArrayView1<f64>, x: f64) -> f64 {
        assert_eq!(
            values.len(),
            self.points,
            "values must have one entry per grid node"
        );

        let pos = (x - self.min) / self.step();
        let i = (pos.floor() as isize).clamp(0, self.points as isize - 2) as usize;
        let t = pos - i as f64;
        values[i] + t * (values[i + 1] - values[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn nodes_span_the_interval() {
        let grid = CartesianGrid::new(0.0, 10.0, 11).unwrap();

        assert_eq!(grid.len(), 11);
        assert_eq!(grid.step(), 1.0);
        assert_eq!(grid.node(0), 0.0);
        assert_eq!(grid.node(10), 10.0);
        assert_eq!(grid.nodes().len(), 11);
    }

    #[test]
    fn bracket_interior_point() {
        let grid = CartesianGrid::new(0.0, 4.0, 5).unwrap();

        let (i, w) = grid.bracket(2.25);
        assert_eq!(i, 2);
        assert!((w - 0.25).abs() < 1e-14);
    }

    #[test]
    fn bracket_clamps_outside_the_grid() {
        let grid = CartesianGrid::new(0.0, 4.0, 5).unwrap();

        assert_eq!(grid.bracket(-3.0), (0, 0.0));
        assert_eq!(grid.bracket(9.0), (3, 1.0));
    }

    #[test]
    fn bracket_at_the_last_node() {
        let grid = CartesianGrid::new(0.0, 4.0, 5).unwrap();

        let (i, w) = grid.bracket(4.0);
        assert_eq!(i, 3);
        assert_eq!(w, 1.0);
    }

    #[test]
    fn interp_is_exact_at_nodes_and_extrapolates() {
        let grid = CartesianGrid::new(0.0, 2.0, 3).unwrap();
        let values = array![1.0, 3.0, 7.0];

        assert_eq!(grid.interp(values.view(), 0.0), 1.0);
        assert_eq!(grid.interp(values.view(), 1.0), 3.0);
        assert!((grid.interp(values.view(), 0.5) - 2.0).abs() < 1e-14);
        // Beyond the top node the last segment's slope (4.0) applies
        assert!((grid.interp(values.view(), 3.0) - 11.0).abs() < 1e-12);
    }

    #[test]
    fn invalid_bounds_are_rejected() {
        assert!(CartesianGrid::new(1.0, 1.0, 5).is_err());
        assert!(CartesianGrid::new(2.0, 1.0, 5).is_err());
        assert!(CartesianGrid::new(0.0, 1.0, 1).is_err());
    }
}
