//! The cross-sectional distribution over (idiosyncratic state, assets).
//!
//! The distribution is a histogram on the product of the Markov nodes and
//! the asset grid. Its one-period transition uses the lottery method:
//! each mass point's savings choice is split linearly between the two
//! bracketing grid nodes, then mixed across exogenous states by the
//! chain's transition matrix. Mass is conserved exactly.

use crate::decision_rule::DecisionRule;
use crate::errors::{HamError, HamResult};
use crate::grid::CartesianGrid;
use crate::markov::MarkovChain;
use log::{debug, info};
use ndarray::{Array1, Array2};

/// Solver options for the stationary distribution.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DistributionOptions {
    /// Sup-norm tolerance on the histogram.
    pub tol: f64,
    /// Maximum number of forward iterations.
    pub maxit: usize,
}

impl Default for DistributionOptions {
    fn default() -> Self {
        Self {
            tol: 1e-11,
            maxit: 50_000,
        }
    }
}

/// Advance the distribution `mu` one period under the `savings` rule and
/// the exogenous `chain`.
///
/// Savings outside the grid are assigned to the nearest end node.
///
/// # Panics
/// Panics if the shapes of `mu`, `savings` and `chain` disagree.
pub fn push_forward(
    mu: &Array2<f64>,
    savings: &DecisionRule,
    chain: &MarkovChain,
) -> Array2<f64> {
    let grid = savings.grid();
    let (n_e, n_a) = mu.dim();
    assert_eq!(n_e, chain.n_states(), "distribution/chain state mismatch");
    assert_eq!(n_a, grid.len(), "distribution/grid node mismatch");

    let transition = chain.transition();
    let policy = savings.values();

    let mut next = Array2::zeros((n_e, n_a));
    for e in 0..n_e {
        for i in 0..n_a {
            let mass = mu[[e, i]];
            if mass == 0.0 {
                continue;
            }
            let (j, w) = grid.bracket(policy[[e, i]]);
            for e2 in 0..n_e {
                let p = transition[[e, e2]];
                next[[e2, j]] += p * (1.0 - w) * mass;
                next[[e2, j + 1]] += p * w * mass;
            }
        }
    }
    next
}

/// The stationary distribution under the `savings` rule, by forward
/// iteration from the product of the chain's stationary distribution and
/// a uniform asset distribution.
pub fn stationary(
    savings: &DecisionRule,
    chain: &MarkovChain,
    options: &DistributionOptions,
) -> HamResult<Array2<f64>> {
    let n_e = chain.n_states();
    let n_a = savings.grid().len();

    let pi = chain.stationary_distribution()?;
    let mut mu = Array2::from_shape_fn((n_e, n_a), |(e, _)| pi[e] / n_a as f64);

    let mut residual = f64::INFINITY;
    for it in 1..=options.maxit {
        let next = push_forward(&mu, savings, chain);

        residual = next
            .iter()
            .zip(mu.iter())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max);
        mu = next;

        if it % 1000 == 0 {
            debug!("distribution iteration {it}: residual {residual:e}");
        }

        if residual < options.tol {
            info!("stationary distribution converged after {it} iterations");
            return Ok(mu);
        }
    }

    Err(HamError::ConvergenceFailure {
        solver: "stationary distribution",
        iterations: options.maxit,
        residual,
        tolerance: options.tol,
    })
}

/// Aggregate asset holdings: the first moment of the asset marginal.
pub fn aggregate_assets(mu: &Array2<f64>, grid: &CartesianGrid) -> f64 {
    assert_eq!(mu.ncols(), grid.len(), "distribution/grid node mismatch");

    let mut total = 0.0;
    for i in 0..grid.len() {
        let node = grid.node(i);
        for e in 0..mu.nrows() {
            total += mu[[e, i]] * node;
        }
    }
    total
}

/// Marginal distribution over assets.
pub fn asset_marginal(mu: &Array2<f64>) -> Array1<f64> {
    mu.sum_axis(ndarray::Axis(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markov::Ar1Process;
    use ndarray::array;

    fn identity_rule(grid: CartesianGrid, n_e: usize) -> DecisionRule {
        let values = Array2::from_shape_fn((n_e, grid.len()), |(_, i)| grid.node(i));
        DecisionRule::new(grid, values).unwrap()
    }

    #[test]
    fn push_forward_conserves_mass() {
        let chain = Ar1Process::new(0.9, 0.1).unwrap().rouwenhorst(3).unwrap();
        let grid = CartesianGrid::new(0.0, 10.0, 21).unwrap();
        let values = Array2::from_shape_fn((3, 21), |(_, i)| 0.7 * grid.node(i) + 0.5);
        let savings = DecisionRule::new(grid, values).unwrap();

        let mu = Array2::from_elem((3, 21), 1.0 / (3.0 * 21.0));
        let next = push_forward(&mu, &savings, &chain);

        assert!((next.sum() - 1.0).abs() < 1e-12);
        assert!(next.iter().all(|&m| m >= 0.0));
    }

    #[test]
    fn identity_rule_leaves_asset_marginal_unchanged() {
        let chain = Ar1Process::new(0.5, 0.2).unwrap().rouwenhorst(2).unwrap();
        let grid = CartesianGrid::new(0.0, 5.0, 11).unwrap();
        let savings = identity_rule(grid, 2);

        let mut mu = Array2::zeros((2, 11));
        mu[[0, 3]] = 0.25;
        mu[[1, 3]] = 0.25;
        mu[[0, 7]] = 0.25;
        mu[[1, 7]] = 0.25;

        let next = push_forward(&mu, &savings, &chain);
        let marginal = asset_marginal(&next);

        assert!((marginal[3] - 0.5).abs() < 1e-12);
        assert!((marginal[7] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn off_grid_savings_pile_up_at_the_edge() {
        let chain = MarkovChain::new(array![0.0], array![[1.0]]).unwrap();
        let grid = CartesianGrid::new(0.0, 4.0, 5).unwrap();
        let values = Array2::from_elem((1, 5), 100.0);
        let savings = DecisionRule::new(grid, values).unwrap();

        let mu = Array2::from_elem((1, 5), 0.2);
        let next = push_forward(&mu, &savings, &chain);

        assert!((next[[0, 4]] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn stationary_distribution_is_stationary() {
        let chain = Ar1Process::new(0.8, 0.2).unwrap().rouwenhorst(2).unwrap();
        let grid = CartesianGrid::new(0.0, 8.0, 25).unwrap();
        // Contraction toward an interior target keeps mass in the grid
        let values = Array2::from_shape_fn((2, 25), |(e, i)| {
            0.5 * grid.node(i) + 1.0 + 0.5 * e as f64
        });
        let savings = DecisionRule::new(grid, values).unwrap();

        let mu = stationary(&savings, &chain, &DistributionOptions::default()).unwrap();

        assert!((mu.sum() - 1.0).abs() < 1e-9);
        let next = push_forward(&mu, &savings, &chain);
        let residual = next
            .iter()
            .zip(mu.iter())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max);
        assert!(residual < 1e-10);
    }

    #[test]
    fn aggregate_assets_of_a_point_mass() {
        let grid = CartesianGrid::new(0.0, 10.0, 11).unwrap();
        let mut mu = Array2::zeros((2, 11));
        mu[[0, 4]] = 0.5;
        mu[[1, 6]] = 0.5;

        assert!((aggregate_assets(&mu, &grid) - 5.0).abs() < 1e-12);
    }
}
