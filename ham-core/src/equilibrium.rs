//! Aggregate equilibrium: the projection of aggregates into individual
//! prices and the steady-state fixed point over the cross-sectional
//! distribution.
//!
//! A model couples an individual block (a [`Household`] solved on an asset
//! grid against an idiosyncratic Markov chain) with an aggregate block: a
//! [`Projection`] mapping the aggregate exogenous state and aggregate
//! capital into the prices every agent faces. A steady state is a capital
//! level consistent with the asset holdings that agents choose at the
//! prices it implies.

use crate::decision_rule::DecisionRule;
use crate::distribution::{aggregate_assets, stationary, DistributionOptions};
use crate::errors::{HamError, HamResult};
use crate::grid::CartesianGrid;
use crate::household::{Household, Prices};
use crate::markov::{Ar1Process, MarkovChain};
use crate::perturbation::{PerturbOptions, PerturbedEquilibrium};
use crate::time_iteration::{time_iteration, TimeIterationOptions, TimeIterationResult};
use log::{debug, info};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Maps the aggregate state into the prices faced by individual agents.
///
/// The projection is a required part of a model: it is supplied at
/// construction time (typically from the model specification file) rather
/// than attached after the fact, so a model without one cannot be built.
///
/// Implementations are selected and calibrated from specification files,
/// so they are serialized through `typetag` under a `type` key.
#[typetag::serde(tag = "type")]
pub trait Projection: std::fmt::Debug + Send + Sync {
    /// Prices implied by the aggregate exogenous state and aggregate
    /// capital.
    fn project(&self, exogenous: f64, capital: f64) -> HamResult<Prices>;

    /// Check the calibration for internal consistency.
    fn validate(&self) -> HamResult<()> {
        Ok(())
    }
}

/// A heterogeneous-agent model: individual block, aggregate block and the
/// discretized exogenous processes, solved together.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateModel {
    household: Arc<dyn Household>,
    projection: Arc<dyn Projection>,
    chain: MarkovChain,
    grid: CartesianGrid,
    aggregate_shock: Ar1Process,
}

impl AggregateModel {
    pub fn builder() -> AggregateModelBuilder {
        AggregateModelBuilder::new()
    }

    pub fn household(&self) -> &Arc<dyn Household> {
        &self.household
    }

    pub fn projection(&self) -> &Arc<dyn Projection> {
        &self.projection
    }

    pub fn chain(&self) -> &MarkovChain {
        &self.chain
    }

    pub fn grid(&self) -> &CartesianGrid {
        &self.grid
    }

    pub fn aggregate_shock(&self) -> &Ar1Process {
        &self.aggregate_shock
    }

    /// Solve the individual block and the distribution fixed point at a
    /// candidate capital level, returning the excess asset supply.
    fn evaluate_candidate(
        &self,
        capital: f64,
        options: &SteadyStateOptions,
    ) -> HamResult<CandidateSolution> {
        let prices = self.projection.project(0.0, capital)?;
        let policies = time_iteration(
            self.household.as_ref(),
            &self.chain,
            &self.grid,
            &prices,
            &options.time_iteration,
        )?;
        let distribution = stationary(&policies.savings, &self.chain, &options.distribution)?;
        let supply = aggregate_assets(&distribution, &self.grid);

        Ok(CandidateSolution {
            excess: supply - capital,
            prices,
            policies,
            distribution,
        })
    }

    /// Find the steady state: capital such that the stationary asset
    /// supply it induces equals itself.
    ///
    /// Solved by bisection on the excess-supply function over
    /// `options.bracket`. A bracket on which excess supply does not change
    /// sign is an error, as is any failure of the inner solvers.
    pub fn find_steady_state(&self, options: &SteadyStateOptions) -> HamResult<Equilibrium> {
        let (mut lo, mut hi) = options.bracket;
        if !(lo < hi) {
            return Err(HamError::InvalidParameter {
                name: "bracket".to_string(),
                reason: format!("lower bound {lo} must be below upper bound {hi}"),
            });
        }

        let mut f_lo = self.evaluate_candidate(lo, options)?.excess;
        let f_hi = self.evaluate_candidate(hi, options)?.excess;
        if f_lo * f_hi > 0.0 {
            return Err(HamError::BracketingFailure {
                lower: lo,
                upper: hi,
                excess_lower: f_lo,
                excess_upper: f_hi,
            });
        }

        let mut it = 0;
        while hi - lo > options.tol {
            it += 1;
            if it > options.maxit {
                return Err(HamError::ConvergenceFailure {
                    solver: "steady state bisection",
                    iterations: options.maxit,
                    residual: hi - lo,
                    tolerance: options.tol,
                });
            }

            let mid = 0.5 * (lo + hi);
            let f_mid = self.evaluate_candidate(mid, options)?.excess;
            debug!("steady state bisection {it}: K = {mid:.6}, excess supply = {f_mid:.6}");

            if f_mid.signum() == f_lo.signum() {
                lo = mid;
                f_lo = f_mid;
            } else {
                hi = mid;
            }
        }

        let capital = 0.5 * (lo + hi);
        let solution = self.evaluate_candidate(capital, options)?;
        info!(
            "steady state found: K = {:.6}, r = {:.6}, w = {:.6} (excess supply {:.2e})",
            capital, solution.prices.r, solution.prices.w, solution.excess
        );

        Ok(Equilibrium {
            exogenous: 0.0,
            capital,
            prices: solution.prices,
            savings: solution.policies.savings,
            consumption: solution.policies.consumption,
            distribution: solution.distribution,
        })
    }

    /// Linearize the aggregate system around `equilibrium`.
    pub fn perturb(
        &self,
        equilibrium: &Equilibrium,
        options: &PerturbOptions,
    ) -> HamResult<PerturbedEquilibrium> {
        PerturbedEquilibrium::new(self.clone(), equilibrium.clone(), options.clone())
    }
}

struct CandidateSolution {
    excess: f64,
    prices: Prices,
    policies: TimeIterationResult,
    distribution: Array2<f64>,
}

/// Build a new model from its parts.
///
/// The builder validates the assembled pieces: every part must be
/// supplied, calibrations must pass their own checks, and the asset grid
/// must not dip below the household's borrowing limit.
pub struct AggregateModelBuilder {
    household: Option<Arc<dyn Household>>,
    projection: Option<Arc<dyn Projection>>,
    chain: Option<MarkovChain>,
    grid: Option<CartesianGrid>,
    aggregate_shock: Option<Ar1Process>,
}

impl Default for AggregateModelBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AggregateModelBuilder {
    pub fn new() -> Self {
        Self {
            household: None,
            projection: None,
            chain: None,
            grid: None,
            aggregate_shock: None,
        }
    }

    /// Register the individual block.
    pub fn with_household(&mut self, household: Arc<dyn Household>) -> &mut Self {
        self.household = Some(household);
        self
    }

    /// Register the aggregate price mapping.
    pub fn with_projection(&mut self, projection: Arc<dyn Projection>) -> &mut Self {
        self.projection = Some(projection);
        self
    }

    /// Supply the discretized idiosyncratic process.
    pub fn with_shock_chain(&mut self, chain: MarkovChain) -> &mut Self {
        self.chain = Some(chain);
        self
    }

    /// Supply the asset grid.
    pub fn with_asset_grid(&mut self, grid: CartesianGrid) -> &mut Self {
        self.grid = Some(grid);
        self
    }

    /// Supply the aggregate exogenous process.
    pub fn with_aggregate_shock(&mut self, process: Ar1Process) -> &mut Self {
        self.aggregate_shock = Some(process);
        self
    }

    pub fn build(&self) -> HamResult<AggregateModel> {
        let household = self.require(&self.household, "household")?;
        let projection = self.require(&self.projection, "projection")?;
        let chain = self.require(&self.chain, "shock chain")?;
        let grid = self.require(&self.grid, "asset grid")?;
        let aggregate_shock = self.require(&self.aggregate_shock, "aggregate shock")?;

        household.validate()?;
        projection.validate()?;

        if grid.min() < household.borrowing_limit() {
            return Err(HamError::InvalidParameter {
                name: "asset grid".to_string(),
                reason: format!(
                    "grid minimum {} lies below the borrowing limit {}",
                    grid.min(),
                    household.borrowing_limit()
                ),
            });
        }

        Ok(AggregateModel {
            household,
            projection,
            chain,
            grid,
            aggregate_shock,
        })
    }

    fn require<T: Clone>(&self, field: &Option<T>, name: &str) -> HamResult<T> {
        field.clone().ok_or_else(|| HamError::InvalidParameter {
            name: name.to_string(),
            reason: "not supplied to the builder".to_string(),
        })
    }
}

/// Solver options for the steady-state search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SteadyStateOptions {
    /// Capital bracket `(lower, upper)` for the bisection.
    pub bracket: (f64, f64),
    /// Bracket-width tolerance on capital.
    pub tol: f64,
    /// Maximum bisection steps.
    pub maxit: usize,
    /// Options for the inner individual solver.
    pub time_iteration: TimeIterationOptions,
    /// Options for the inner distribution fixed point.
    pub distribution: DistributionOptions,
}

impl Default for SteadyStateOptions {
    fn default() -> Self {
        Self {
            bracket: (1.0, 50.0),
            tol: 1e-5,
            maxit: 100,
            time_iteration: TimeIterationOptions::default(),
            distribution: DistributionOptions::default(),
        }
    }
}

/// A steady state of the aggregate system: time-invariant prices,
/// policies and cross-sectional distribution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Equilibrium {
    /// Steady-state aggregate exogenous state (the process mean).
    pub exogenous: f64,
    /// Aggregate capital.
    pub capital: f64,
    /// Prices implied by the projection at the steady state.
    pub prices: Prices,
    /// Stationary savings policy.
    pub savings: DecisionRule,
    /// Stationary consumption policy.
    pub consumption: DecisionRule,
    /// Stationary distribution over (idiosyncratic state, assets).
    pub distribution: Array2<f64>,
}

impl Equilibrium {
    /// Marginal distribution over assets.
    pub fn marginal_asset_distribution(&self) -> Array1<f64> {
        crate::distribution::asset_marginal(&self.distribution)
    }

    /// Aggregate asset holdings implied by the distribution.
    pub fn total_assets(&self) -> f64 {
        aggregate_assets(&self.distribution, self.savings.grid())
    }
}
