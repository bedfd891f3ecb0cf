//! Linearization of the aggregate system around a steady state.
//!
//! The aggregate state is the vector $(z, \mu)$: the exogenous state and
//! the flattened cross-sectional distribution. One period of the
//! aggregate system composes
//!
//! 1. the projection of $(z, K(\mu))$ into prices,
//! 2. one backward step of the individual solver at those prices, with the
//!    continuation anchored at the steady-state policy and prices,
//! 3. the distribution push-forward under the responding policy, and
//! 4. the AR(1) decay of $z$.
//!
//! The steady state is a fixed point of this map by construction. Its
//! Jacobian, computed column by column with central finite differences,
//! drives the linear impulse-response simulation; the non-linear map can
//! be stepped directly as an alternative.

use crate::decision_rule::DecisionRule;
use crate::distribution::{aggregate_assets, push_forward};
use crate::equilibrium::{AggregateModel, Equilibrium};
use crate::errors::HamResult;
use crate::household::Prices;
use crate::time_iteration::egm_step;
use log::{debug, info, warn};
use nalgebra::{DMatrix, DVector, Normed};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Options for the perturbation and the simulated responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerturbOptions {
    /// Central finite-difference step for the Jacobian.
    pub step: f64,
    /// Number of periods simulated by a response.
    pub horizon: usize,
}

impl Default for PerturbOptions {
    fn default() -> Self {
        Self {
            step: 1e-5,
            horizon: 150,
        }
    }
}

/// One period of a simulated trajectory: the aggregate exogenous state,
/// the cross-sectional distribution, the responding savings policy and
/// the implied aggregates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationStep {
    /// Aggregate exogenous state $z_t$.
    pub exogenous: f64,
    /// Distribution over (idiosyncratic state, assets) at the start of the
    /// period.
    pub distribution: Array2<f64>,
    /// Savings policy values on the (state, assets) tabulation.
    pub controls: Array2<f64>,
    /// Aggregate capital implied by the distribution.
    pub capital: f64,
    /// Prices implied by the projection this period.
    pub prices: Prices,
}

/// A steady state together with the linearized aggregate dynamics around
/// it.
#[derive(Debug)]
pub struct PerturbedEquilibrium {
    model: AggregateModel,
    steady_state: Equilibrium,
    jacobian: DMatrix<f64>,
    spectral_radius: f64,
    options: PerturbOptions,
}

impl PerturbedEquilibrium {
    pub(crate) fn new(
        model: AggregateModel,
        steady_state: Equilibrium,
        options: PerturbOptions,
    ) -> HamResult<Self> {
        let mut this = Self {
            model,
            steady_state,
            jacobian: DMatrix::zeros(0, 0),
            spectral_radius: 0.0,
            options,
        };

        this.check_fixed_point()?;
        this.jacobian = this.compute_jacobian()?;
        this.spectral_radius = reduced_spectral_radius(&this.jacobian);

        info!(
            "perturbation complete: state dimension {}, spectral radius {:.6}",
            this.jacobian.nrows(),
            this.spectral_radius
        );
        if this.spectral_radius >= 1.0 {
            warn!(
                "linearized dynamics are not stable (spectral radius {:.6}); responses will not decay",
                this.spectral_radius
            );
        }

        Ok(this)
    }

    /// The Jacobian of the one-period aggregate transition map at the
    /// steady state.
    pub fn jacobian(&self) -> &DMatrix<f64> {
        &self.jacobian
    }

    /// The largest eigenvalue modulus of the Jacobian on the zero-net-mass
    /// subspace.
    pub fn spectral_radius(&self) -> f64 {
        self.spectral_radius
    }

    pub fn steady_state(&self) -> &Equilibrium {
        &self.steady_state
    }

    /// Simulate the linearized system's response to a sequence of
    /// innovations to the aggregate exogenous state.
    ///
    /// `shocks[t]` is added to the exogenous state in period `t`; the
    /// deviation is then iterated forward with the Jacobian for the
    /// configured horizon. With no shocks the trajectory stays at the
    /// steady state.
    pub fn response(&self, shocks: &[f64]) -> HamResult<Vec<SimulationStep>> {
        let dim = self.state_dimension();
        let mut deviation: DVector<f64> = DVector::zeros(dim);
        let mut steps = Vec::with_capacity(self.options.horizon);

        for t in 0..self.options.horizon {
            if t < shocks.len() {
                deviation[0] += shocks[t];
            }

            let exogenous = self.steady_state.exogenous + deviation[0];
            let distribution = self.deviated_distribution(&deviation);
            steps.push(self.report(exogenous, distribution)?);

            deviation = &self.jacobian * deviation;
        }

        Ok(steps)
    }

    /// Simulate the non-linear transition map directly under the same
    /// shock sequence.
    pub fn simulate_nonlinear(&self, shocks: &[f64]) -> HamResult<Vec<SimulationStep>> {
        let mut exogenous = self.steady_state.exogenous;
        let mut distribution = self.steady_state.distribution.clone();
        let mut steps = Vec::with_capacity(self.options.horizon);

        for t in 0..self.options.horizon {
            if t < shocks.len() {
                exogenous += shocks[t];
            }

            let step = self.report(exogenous, distribution.clone())?;
            let savings = DecisionRule::new(self.model.grid().clone(), step.controls.clone())?;
            steps.push(step);

            distribution = push_forward(&distribution, &savings, self.model.chain());
            exogenous = self.model.aggregate_shock().rho() * exogenous;
        }

        Ok(steps)
    }

    fn state_dimension(&self) -> usize {
        1 + self.steady_state.distribution.len()
    }

    /// The savings policy, capital and prices at an aggregate state.
    fn policy_response(
        &self,
        exogenous: f64,
        distribution: &Array2<f64>,
    ) -> HamResult<(Array2<f64>, f64, Prices)> {
        let capital = aggregate_assets(distribution, self.model.grid());
        let prices = self.model.projection().project(exogenous, capital)?;

        let (_, savings) = egm_step(
            self.model.household().as_ref(),
            self.model.chain(),
            self.model.grid(),
            &prices,
            &self.steady_state.prices,
            self.steady_state.consumption.values(),
        );

        Ok((savings, capital, prices))
    }

    /// One period of the non-linear aggregate transition map.
    fn transition(&self, exogenous: f64, distribution: &Array2<f64>) -> HamResult<(f64, Array2<f64>)> {
        let (savings, _, _) = self.policy_response(exogenous, distribution)?;
        let rule = DecisionRule::new(self.model.grid().clone(), savings)?;
        let next_distribution = push_forward(distribution, &rule, self.model.chain());
        let next_exogenous = self.model.aggregate_shock().rho() * exogenous;
        Ok((next_exogenous, next_distribution))
    }

    fn report(&self, exogenous: f64, distribution: Array2<f64>) -> HamResult<SimulationStep> {
        let (controls, capital, prices) = self.policy_response(exogenous, &distribution)?;
        Ok(SimulationStep {
            exogenous,
            distribution,
            controls,
            capital,
            prices,
        })
    }

    fn deviated_distribution(&self, deviation: &DVector<f64>) -> Array2<f64> {
        let mut distribution = self.steady_state.distribution.clone();
        for (value, dev) in distribution.iter_mut().zip(deviation.iter().skip(1)) {
            *value += dev;
        }
        distribution
    }

    fn check_fixed_point(&self) -> HamResult<()> {
        let (next_z, next_mu) = self.transition(
            self.steady_state.exogenous,
            &self.steady_state.distribution,
        )?;

        let residual = next_mu
            .iter()
            .zip(self.steady_state.distribution.iter())
            .map(|(a, b)| (a - b).abs())
            .fold((next_z - self.steady_state.exogenous).abs(), f64::max);
        debug!("steady-state fixed-point residual: {residual:e}");
        if residual > 1e-6 {
            warn!(
                "steady state is not a fixed point of the transition map (residual {residual:e}); \
                 the linearization may be inaccurate"
            );
        }
        Ok(())
    }

    fn compute_jacobian(&self) -> HamResult<DMatrix<f64>> {
        let dim = self.state_dimension();
        let h = self.options.step;
        let z_ss = self.steady_state.exogenous;

        let mut jacobian = DMatrix::zeros(dim, dim);
        let mut perturbed = DVector::zeros(dim);

        for k in 0..dim {
            perturbed.fill(0.0);

            perturbed[k] = h;
            let plus = {
                let z = z_ss + perturbed[0];
                let mu = self.deviated_distribution(&perturbed);
                self.transition(z, &mu)?
            };

            perturbed[k] = -h;
            let minus = {
                let z = z_ss + perturbed[0];
                let mu = self.deviated_distribution(&perturbed);
                self.transition(z, &mu)?
            };

            jacobian[(0, k)] = (plus.0 - minus.0) / (2.0 * h);
            for (row, (p, m)) in plus.1.iter().zip(minus.1.iter()).enumerate() {
                jacobian[(1 + row, k)] = (p - m) / (2.0 * h);
            }
        }

        Ok(jacobian)
    }
}

/// The largest eigenvalue modulus after discarding the mass-conservation
/// mode.
///
/// The push-forward conserves total mass, so the Jacobian always carries
/// a unit eigenvalue along the mass direction; deviations generated by
/// shocks have zero net mass and never load on it. The stability
/// diagnostic therefore excludes the single eigenvalue closest to one.
fn reduced_spectral_radius(jacobian: &DMatrix<f64>) -> f64 {
    let eigenvalues = jacobian.complex_eigenvalues();

    let mass_mode = eigenvalues
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| {
            let da = (*a - nalgebra::Complex::new(1.0, 0.0)).norm();
            let db = (*b - nalgebra::Complex::new(1.0, 0.0)).norm();
            da.total_cmp(&db)
        })
        .map(|(i, _)| i);

    eigenvalues
        .iter()
        .enumerate()
        .filter(|(i, _)| Some(*i) != mass_mode)
        .map(|(_, v)| v.norm())
        .fold(0.0, f64::max)
}
