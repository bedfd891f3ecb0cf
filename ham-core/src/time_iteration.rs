//! Time iteration for the stationary consumption-savings problem.
//!
//! The solver iterates backward on the Euler equation
//! $$ u'(c_t) = \beta \, E\left[ (1 + r_{t+1}) \, u'(c_{t+1}) \right] $$
//! using the endogenous grid method: each backward step computes the
//! expected discounted marginal utility on the savings grid, inverts the
//! marginal utility to obtain consumption on an endogenous asset grid,
//! re-interpolates onto the fixed grid and imposes the borrowing
//! constraint where it binds. The stationary policy is the sup-norm fixed
//! point of this step.

use crate::decision_rule::DecisionRule;
use crate::errors::{HamError, HamResult};
use crate::grid::CartesianGrid;
use crate::household::{Household, Prices};
use crate::interpolate::interp_linear;
use crate::markov::MarkovChain;
use log::{debug, info};
use ndarray::Array2;

/// Solver options for time iteration.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TimeIterationOptions {
    /// Sup-norm tolerance on the consumption policy.
    pub tol: f64,
    /// Maximum number of backward steps.
    pub maxit: usize,
}

impl Default for TimeIterationOptions {
    fn default() -> Self {
        Self {
            tol: 1e-9,
            maxit: 5_000,
        }
    }
}

/// Solved policies plus solver diagnostics.
#[derive(Debug, Clone)]
pub struct TimeIterationResult {
    /// Next-period asset choice on the (exogenous, assets) tabulation.
    pub savings: DecisionRule,
    /// Consumption on the same tabulation.
    pub consumption: DecisionRule,
    /// Backward steps taken until convergence.
    pub iterations: usize,
    /// Final sup-norm change of the consumption policy.
    pub residual: f64,
}

/// Solve the stationary problem of `household` on `grid`, facing the
/// idiosyncratic `chain` and constant `prices`.
pub fn time_iteration(
    household: &dyn Household,
    chain: &MarkovChain,
    grid: &CartesianGrid,
    prices: &Prices,
    options: &TimeIterationOptions,
) -> HamResult<TimeIterationResult> {
    check_feasibility(household, chain, grid, prices)?;

    let gross = 1.0 + prices.r;
    let floor = savings_floor(household, grid);

    // Initial guess: consume the whole budget
    let mut consumption = Array2::from_shape_fn((chain.n_states(), grid.len()), |(e, i)| {
        gross * grid.node(i) + household.labor_income(chain.node(e), prices) - floor
    });

    let mut residual = f64::INFINITY;
    for it in 1..=options.maxit {
        let (next, _savings) = egm_step(household, chain, grid, prices, prices, &consumption);

        residual = next
            .iter()
            .zip(consumption.iter())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max);
        consumption = next;

        if it % 50 == 0 {
            debug!("time iteration {it}: residual {residual:e}");
        }

        if residual < options.tol {
            info!("time iteration converged after {it} iterations (residual {residual:e})");

            let (final_c, final_s) =
                egm_step(household, chain, grid, prices, prices, &consumption);
            return Ok(TimeIterationResult {
                savings: DecisionRule::new(grid.clone(), final_s)?,
                consumption: DecisionRule::new(grid.clone(), final_c)?,
                iterations: it,
                residual,
            });
        }
    }

    Err(HamError::ConvergenceFailure {
        solver: "time iteration",
        iterations: options.maxit,
        residual,
        tolerance: options.tol,
    })
}

/// One backward step of the endogenous grid method.
///
/// Given next period's consumption policy `next_consumption` (tabulated on
/// `grid` under `next_prices`), returns today's consumption and savings
/// policies under `prices`. The stationary solver calls this with
/// `prices == next_prices`; the perturbation engine calls it with today's
/// prices deviated and the continuation anchored at the steady state.
pub fn egm_step(
    household: &dyn Household,
    chain: &MarkovChain,
    grid: &CartesianGrid,
    prices: &Prices,
    next_prices: &Prices,
    next_consumption: &Array2<f64>,
) -> (Array2<f64>, Array2<f64>) {
    let n_e = chain.n_states();
    let n_a = grid.len();
    assert_eq!(next_consumption.dim(), (n_e, n_a), "policy shape mismatch");

    let beta = household.discount_factor();
    let gross = 1.0 + prices.r;
    let gross_next = 1.0 + next_prices.r;
    let floor = savings_floor(household, grid);
    let transition = chain.transition();

    // Marginal utility of next period's consumption, per (state, savings node)
    let next_mu = next_consumption.mapv(|c| household.marginal_utility(c));

    let mut consumption = Array2::zeros((n_e, n_a));
    let mut savings = Array2::zeros((n_e, n_a));

    let mut endo_assets = vec![0.0; n_a];
    let mut endo_consumption = vec![0.0; n_a];

    for e in 0..n_e {
        let income = household.labor_income(chain.node(e), prices);

        // Endogenous grid: for each savings node, the consumption satisfying
        // the Euler equation and the asset level it corresponds to today
        for j in 0..n_a {
            let mut expected = 0.0;
            for e2 in 0..n_e {
                expected += transition[[e, e2]] * next_mu[[e2, j]];
            }
            let c = household.inverse_marginal_utility(beta * gross_next * expected);
            endo_consumption[j] = c;
            endo_assets[j] = (c + grid.node(j) - income) / gross;
        }

        // Back onto the fixed grid, with the constraint imposed below the
        // first endogenous node
        for i in 0..n_a {
            let assets = grid.node(i);
            if assets <= endo_assets[0] {
                savings[[e, i]] = floor;
                consumption[[e, i]] = gross * assets + income - floor;
            } else {
                let c = interp_linear(&endo_assets, &endo_consumption, assets);
                let mut s = gross * assets + income - c;
                if s < floor {
                    s = floor;
                }
                savings[[e, i]] = s;
                consumption[[e, i]] = gross * assets + income - s;
            }
        }
    }

    (consumption, savings)
}

/// The lowest savings level the solver allows: the borrowing limit,
/// truncated to the bottom of the grid.
fn savings_floor(household: &dyn Household, grid: &CartesianGrid) -> f64 {
    household.borrowing_limit().max(grid.min())
}

fn check_feasibility(
    household: &dyn Household,
    chain: &MarkovChain,
    grid: &CartesianGrid,
    prices: &Prices,
) -> HamResult<()> {
    if !(1.0 + prices.r > 0.0) {
        return Err(HamError::InvalidParameter {
            name: "prices".to_string(),
            reason: format!("gross return must be positive, got r = {}", prices.r),
        });
    }

    let floor = savings_floor(household, grid);
    for e in 0..chain.n_states() {
        let income = household.labor_income(chain.node(e), prices);
        let consumption_at_floor = (1.0 + prices.r) * floor + income - floor;
        if !(consumption_at_floor > 0.0) {
            return Err(HamError::InvalidParameter {
                name: "household".to_string(),
                reason: format!(
                    "consumption at the borrowing limit is non-positive ({consumption_at_floor}) in state {e}"
                ),
            });
        }
    }
    Ok(())
}
