//! Heterogeneous-agent macroeconomic modeling.
//!
//! A model couples an individual consumption-savings block with an
//! aggregate block and is solved in stages: the idiosyncratic shock
//! process is discretized into a Markov chain, the individual problem is
//! solved by time iteration on an asset grid, a steady state is found as
//! a fixed point over the cross-sectional distribution, and the aggregate
//! system is linearized around it to simulate shock responses.
//!
//! Models are assembled from declarative TOML specifications; the
//! household and the price projection are strategy objects selected by a
//! `type` key (see [`models`] for the ready-made blocks).
//!
//! ```no_run
//! use ham::models::aiyagari_spec;
//! use ham::{PerturbOptions, SteadyStateOptions};
//!
//! # fn main() -> ham::HamResult<()> {
//! let model = aiyagari_spec()?.build()?;
//!
//! let eq = model.find_steady_state(&SteadyStateOptions::default())?;
//! println!("steady-state capital: {:.4}", eq.capital);
//!
//! let peq = model.perturb(&eq, &PerturbOptions::default())?;
//! for step in peq.response(&[0.1])? {
//!     println!("z = {:+.4}, K = {:.4}", step.exogenous, step.capital);
//! }
//! # Ok(())
//! # }
//! ```

pub use ham_core::config::{
    AggregateShockSpec, DiscretizationMethod, GridSpec, IdiosyncraticSpec, ModelSpec,
};
pub use ham_core::decision_rule::DecisionRule;
pub use ham_core::distribution::{
    aggregate_assets, asset_marginal, push_forward, stationary, DistributionOptions,
};
pub use ham_core::equilibrium::{
    AggregateModel, AggregateModelBuilder, Equilibrium, Projection, SteadyStateOptions,
};
pub use ham_core::errors::{HamError, HamResult};
pub use ham_core::grid::CartesianGrid;
pub use ham_core::household::{Household, Prices};
pub use ham_core::markov::{Ar1Process, MarkovChain};
pub use ham_core::perturbation::{PerturbOptions, PerturbedEquilibrium, SimulationStep};
pub use ham_core::time_iteration::{
    egm_step, time_iteration, TimeIterationOptions, TimeIterationResult,
};

pub use ham_models as models;
