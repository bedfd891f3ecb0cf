#![allow(dead_code)]

use crate::errors::{HamError, HamResult};
use crate::household::{Household, Prices};
use crate::equilibrium::Projection;
use serde::{Deserialize, Serialize};

/// Power-utility household used by the solver tests.
///
/// Marginal utility $u'(c) = c^{-\gamma}$, labor income `w * exp(shock)`,
/// borrowing limit at zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct TestHousehold {
    pub beta: f64,
    pub gamma: f64,
}

impl TestHousehold {
    pub fn new(beta: f64, gamma: f64) -> Self {
        Self { beta, gamma }
    }
}

#[typetag::serde(name = "test_power_utility")]
impl Household for TestHousehold {
    fn discount_factor(&self) -> f64 {
        self.beta
    }

    fn marginal_utility(&self, consumption: f64) -> f64 {
        debug_assert!(consumption > 0.0, "marginal utility of c = {consumption}");
        consumption.powf(-self.gamma)
    }

    fn inverse_marginal_utility(&self, marginal: f64) -> f64 {
        marginal.powf(-1.0 / self.gamma)
    }

    fn labor_income(&self, shock: f64, prices: &Prices) -> f64 {
        prices.w * shock.exp()
    }

    fn validate(&self) -> HamResult<()> {
        if !(self.beta > 0.0 && self.beta < 1.0) {
            return Err(HamError::InvalidParameter {
                name: "beta".to_string(),
                reason: format!("discount factor must lie in (0, 1), got {}", self.beta),
            });
        }
        Ok(())
    }
}

/// Projection returning the same prices for any aggregate state.
///
/// Useful for partial-equilibrium tests: asset supply no longer depends on
/// the capital candidate, so the steady-state fixed point is the supply
/// itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct TestFixedProjection {
    pub r: f64,
    pub w: f64,
}

#[typetag::serde(name = "test_fixed_prices")]
impl Projection for TestFixedProjection {
    fn project(&self, _exogenous: f64, _capital: f64) -> HamResult<Prices> {
        Ok(Prices {
            r: self.r,
            w: self.w,
        })
    }
}
