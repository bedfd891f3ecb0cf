//! Discretization of exogenous shock processes into Markov chains.

use crate::errors::{HamError, HamResult};
use log::debug;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

const STATIONARY_TOL: f64 = 1e-13;
const STATIONARY_MAXIT: usize = 50_000;

/// A finite-state Markov chain: state values plus a row-stochastic
/// transition matrix.
///
/// `transition[[i, j]]` is the probability of moving from state `i` to
/// state `j`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkovChain {
    nodes: Array1<f64>,
    transition: Array2<f64>,
}

impl MarkovChain {
    /// Create a chain from state values and a transition matrix.
    ///
    /// The matrix must be square with one row per node, and every row must
    /// sum to one.
    pub fn new(nodes: Array1<f64>, transition: Array2<f64>) -> HamResult<Self> {
        let n = nodes.len();
        if transition.nrows() != n || transition.ncols() != n {
            return Err(HamError::ShapeMismatch {
                context: "markov chain transition matrix".to_string(),
                expected: format!("{n}x{n}"),
                actual: format!("{}x{}", transition.nrows(), transition.ncols()),
            });
        }
        for (i, row) in transition.outer_iter().enumerate() {
            let sum: f64 = row.sum();
            if (sum - 1.0).abs() > 1e-8 {
                return Err(HamError::InvalidParameter {
                    name: "transition matrix".to_string(),
                    reason: format!("row {i} sums to {sum}, expected 1"),
                });
            }
            if row.iter().any(|&p| p < 0.0) {
                return Err(HamError::InvalidParameter {
                    name: "transition matrix".to_string(),
                    reason: format!("row {i} contains a negative probability"),
                });
            }
        }
        Ok(Self { nodes, transition })
    }

    pub fn n_states(&self) -> usize {
        self.nodes.len()
    }

    /// The value of state `i`.
    ///
    /// # Panics
    /// Panics if `i` is out of range.
    pub fn node(&self, i: usize) -> f64 {
        self.nodes[i]
    }

    pub fn nodes(&self) -> &Array1<f64> {
        &self.nodes
    }

    pub fn transition(&self) -> &Array2<f64> {
        &self.transition
    }

    /// The stationary distribution of the chain, computed by power
    /// iteration to a sup-norm fixed point.
    pub fn stationary_distribution(&self) -> HamResult<Array1<f64>> {
        let n = self.n_states();
        let mut pi = Array1::from_elem(n, 1.0 / n as f64);

        let mut residual = f64::INFINITY;
        for it in 0..STATIONARY_MAXIT {
            let mut next = pi.dot(&self.transition);
            let total = next.sum();
            next /= total;

            residual = next
                .iter()
                .zip(pi.iter())
                .map(|(a, b)| (a - b).abs())
                .fold(0.0, f64::max);
            pi = next;

            if residual < STATIONARY_TOL {
                debug!("chain stationary distribution converged after {it} iterations");
                return Ok(pi);
            }
        }

        Err(HamError::ConvergenceFailure {
            solver: "markov chain stationary distribution",
            iterations: STATIONARY_MAXIT,
            residual,
            tolerance: STATIONARY_TOL,
        })
    }
}

/// A continuous AR(1) shock process
/// $$ x_{t+1} = \rho x_t + \epsilon_t, \qquad \epsilon_t \sim N(0, \sigma^2) $$
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ar1Process {
    rho: f64,
    sigma: f64,
}

impl Ar1Process {
    /// Create a new process. Requires `|rho| < 1` and `sigma > 0`.
    pub fn new(rho: f64, sigma: f64) -> HamResult<Self> {
        if !(rho.abs() < 1.0) {
            return Err(HamError::InvalidParameter {
                name: "rho".to_string(),
                reason: format!("autocorrelation must satisfy |rho| < 1, got {rho}"),
            });
        }
        if !(sigma > 0.0) {
            return Err(HamError::InvalidParameter {
                name: "sigma".to_string(),
                reason: format!("innovation std must be positive, got {sigma}"),
            });
        }
        Ok(Self { rho, sigma })
    }

    pub fn rho(&self) -> f64 {
        self.rho
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    /// Unconditional standard deviation $\sigma / \sqrt{1 - \rho^2}$.
    pub fn unconditional_std(&self) -> f64 {
        self.sigma / (1.0 - self.rho * self.rho).sqrt()
    }

    /// Discretize into an `n`-state chain with the Rouwenhorst method.
    ///
    /// Matches the conditional mean and variance of the process exactly and
    /// remains accurate at high persistence. `n == 1` produces the
    /// degenerate single-state chain at the unconditional mean, which is
    /// useful for shutting off idiosyncratic risk in experiments.
    pub fn rouwenhorst(&self, n: usize) -> HamResult<MarkovChain> {
        if n == 0 {
            return Err(HamError::InvalidParameter {
                name: "states".to_string(),
                reason: "at least one state required".to_string(),
            });
        }
        if n == 1 {
            return MarkovChain::new(Array1::zeros(1), Array2::ones((1, 1)));
        }

        let p = (1.0 + self.rho) / 2.0;
        let mut transition = ndarray::array![[p, 1.0 - p], [1.0 - p, p]];

        for size in 3..=n {
            let m = size - 1;
            let mut next = Array2::zeros((size, size));
            for i in 0..m {
                for j in 0..m {
                    let v = transition[[i, j]];
                    next[[i, j]] += p * v;
                    next[[i, j + 1]] += (1.0 - p) * v;
                    next[[i + 1, j]] += (1.0 - p) * v;
                    next[[i + 1, j + 1]] += p * v;
                }
            }
            // Interior rows receive mass from two overlapping blocks
            for i in 1..m {
                for j in 0..size {
                    next[[i, j]] /= 2.0;
                }
            }
            transition = next;
        }

        let spread = self.unconditional_std() * ((n - 1) as f64).sqrt();
        let step = 2.0 * spread / (n - 1) as f64;
        let nodes = Array1::from_shape_fn(n, |i| -spread + i as f64 * step);

        MarkovChain::new(nodes, transition)
    }

    /// Discretize into an `n`-state chain with Tauchen's method.
    ///
    /// Nodes span `width` unconditional standard deviations either side of
    /// the mean; transition masses are normal-CDF bin probabilities.
    pub fn tauchen(&self, n: usize, width: f64) -> HamResult<MarkovChain> {
        if n < 2 {
            return Err(HamError::InvalidParameter {
                name: "states".to_string(),
                reason: format!("tauchen requires at least 2 states, got {n}"),
            });
        }
        if !(width > 0.0) {
            return Err(HamError::InvalidParameter {
                name: "width".to_string(),
                reason: format!("grid width must be positive, got {width}"),
            });
        }

        let spread = width * self.unconditional_std();
        let step = 2.0 * spread / (n - 1) as f64;
        let nodes = Array1::from_shape_fn(n, |i| -spread + i as f64 * step);

        let mut transition = Array2::zeros((n, n));
        for i in 0..n {
            let mean = self.rho * nodes[i];
            transition[[i, 0]] = normal_cdf((nodes[0] - mean + step / 2.0) / self.sigma);
            transition[[i, n - 1]] =
                1.0 - normal_cdf((nodes[n - 1] - mean - step / 2.0) / self.sigma);
            for j in 1..n - 1 {
                transition[[i, j]] = normal_cdf((nodes[j] - mean + step / 2.0) / self.sigma)
                    - normal_cdf((nodes[j] - mean - step / 2.0) / self.sigma);
            }
        }

        MarkovChain::new(nodes, transition)
    }
}

/// Standard normal CDF via the Abramowitz-Stegun error-function polynomial
/// (7.1.26), absolute error below 1.5e-7.
fn normal_cdf(x: f64) -> f64 {
    0.5 * (1.0 + erf(x / std::f64::consts::SQRT_2))
}

fn erf(x: f64) -> f64 {
    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();

    let t = 1.0 / (1.0 + 0.3275911 * x);
    let poly = t
        * (0.254829592
            + t * (-0.284496736 + t * (1.421413741 + t * (-1.453152027 + t * 1.061405429))));

    sign * (1.0 - poly * (-x * x).exp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use is_close::is_close;
    use ndarray::array;

    #[test]
    fn two_state_rouwenhorst_matches_closed_form() {
        let process = Ar1Process::new(0.9, 0.1).unwrap();
        let chain = process.rouwenhorst(2).unwrap();

        let p = (1.0 + 0.9) / 2.0;
        assert!(is_close!(chain.transition()[[0, 0]], p));
        assert!(is_close!(chain.transition()[[0, 1]], 1.0 - p));
        assert!(is_close!(chain.transition()[[1, 1]], p));

        let spread = process.unconditional_std();
        assert!(is_close!(chain.node(0), -spread));
        assert!(is_close!(chain.node(1), spread));
    }

    #[test]
    fn rouwenhorst_rows_are_stochastic() {
        let process = Ar1Process::new(0.95, 0.02).unwrap();
        let chain = process.rouwenhorst(7).unwrap();

        assert_eq!(chain.n_states(), 7);
        for row in chain.transition().outer_iter() {
            assert!(is_close!(row.sum(), 1.0));
        }
    }

    #[test]
    fn degenerate_single_state_chain() {
        let process = Ar1Process::new(0.5, 0.1).unwrap();
        let chain = process.rouwenhorst(1).unwrap();

        assert_eq!(chain.n_states(), 1);
        assert_eq!(chain.node(0), 0.0);
        assert_eq!(chain.transition()[[0, 0]], 1.0);
    }

    #[test]
    fn tauchen_rows_are_stochastic() {
        let process = Ar1Process::new(0.8, 0.1).unwrap();
        let chain = process.tauchen(9, 3.0).unwrap();

        for row in chain.transition().outer_iter() {
            assert!(is_close!(row.sum(), 1.0));
        }
    }

    #[test]
    fn tauchen_iid_rows_are_identical() {
        let process = Ar1Process::new(0.0, 0.1).unwrap();
        let chain = process.tauchen(5, 3.0).unwrap();

        let first = chain.transition().row(0).to_owned();
        for row in chain.transition().outer_iter() {
            for (a, b) in row.iter().zip(first.iter()) {
                assert!(is_close!(*a, *b));
            }
        }
    }

    #[test]
    fn stationary_distribution_is_a_fixed_point() {
        let process = Ar1Process::new(0.9, 0.1).unwrap();
        let chain = process.rouwenhorst(5).unwrap();

        let pi = chain.stationary_distribution().unwrap();
        assert!(is_close!(pi.sum(), 1.0));

        let advanced = pi.dot(chain.transition());
        for (a, b) in advanced.iter().zip(pi.iter()) {
            assert!((a - b).abs() < 1e-10);
        }
    }

    #[test]
    fn symmetric_two_state_stationary_is_uniform() {
        let chain = MarkovChain::new(array![-1.0, 1.0], array![[0.7, 0.3], [0.3, 0.7]]).unwrap();

        let pi = chain.stationary_distribution().unwrap();
        assert!((pi[0] - 0.5).abs() < 1e-10);
        assert!((pi[1] - 0.5).abs() < 1e-10);
    }

    #[test]
    fn invalid_processes_are_rejected() {
        assert!(Ar1Process::new(1.0, 0.1).is_err());
        assert!(Ar1Process::new(-1.2, 0.1).is_err());
        assert!(Ar1Process::new(0.5, 0.0).is_err());
        assert!(Ar1Process::new(0.5, -1.0).is_err());
    }

    #[test]
    fn non_stochastic_rows_are_rejected() {
        let result = MarkovChain::new(array![0.0, 1.0], array![[0.5, 0.4], [0.3, 0.7]]);
        assert!(result.is_err());
    }

    #[test]
    fn mismatched_shapes_are_rejected() {
        let result = MarkovChain::new(array![0.0, 1.0, 2.0], array![[0.5, 0.5], [0.5, 0.5]]);
        assert!(matches!(result, Err(HamError::ShapeMismatch { .. })));
    }

    #[test]
    fn normal_cdf_reference_values() {
        assert!((normal_cdf(0.0) - 0.5).abs() < 1e-9);
        assert!((normal_cdf(1.959964) - 0.975).abs() < 1e-4);
        assert!((normal_cdf(-1.959964) - 0.025).abs() < 1e-4);
    }
}
