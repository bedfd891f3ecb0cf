//! Individual agent primitives.

use crate::errors::HamResult;
use serde::{Deserialize, Serialize};

/// Prices faced by an individual agent within a period: the return on
/// assets and the wage per efficiency unit of labor.
///
/// This is the codomain of the aggregate projection: the aggregate block
/// maps its state into a `Prices` value, and the idiosyncratic block is
/// solved against it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prices {
    /// Net interest rate on asset holdings.
    pub r: f64,
    /// Wage per efficiency unit.
    pub w: f64,
}

/// The primitives of an individual consumption-savings problem.
///
/// An implementation supplies the utility curvature, the discounting, the
/// mapping from the idiosyncratic exogenous state into labor income, and
/// the borrowing limit. The solver is agnostic about the functional forms;
/// it only ever calls these hooks.
///
/// Implementations are selected and calibrated from model specification
/// files, so they are serialized through `typetag` under a `type` key.
#[typetag::serde(tag = "type")]
pub trait Household: std::fmt::Debug + Send + Sync {
    /// Discount factor $\beta$.
    fn discount_factor(&self) -> f64;

    /// Marginal utility $u'(c)$.
    fn marginal_utility(&self, consumption: f64) -> f64;

    /// Inverse marginal utility $(u')^{-1}(m)$.
    fn inverse_marginal_utility(&self, marginal: f64) -> f64;

    /// Per-period labor income in idiosyncratic state `shock` under `prices`.
    fn labor_income(&self, shock: f64, prices: &Prices) -> f64;

    /// Lowest permitted asset position.
    fn borrowing_limit(&self) -> f64 {
        0.0
    }

    /// Check the calibration for internal consistency.
    ///
    /// Called when a model is assembled from a specification file.
    fn validate(&self) -> HamResult<()> {
        Ok(())
    }
}
