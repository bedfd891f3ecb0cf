//! The Aiyagari economy: CRRA households facing idiosyncratic efficiency
//! risk, with factor prices set by a Cobb-Douglas production technology.

use ham_core::errors::{HamError, HamResult};
use ham_core::equilibrium::Projection;
use ham_core::household::{Household, Prices};
use serde::{Deserialize, Serialize};

/// CRRA consumption-savings household.
///
/// Per-period utility is
/// $$ u(c) = \frac{c^{1-\gamma}}{1-\gamma} $$
/// (logarithmic at $\gamma = 1$; the marginal utility $c^{-\gamma}$ covers
/// both cases). Labor income is the wage scaled by the exponential of the
/// idiosyncratic log-efficiency state, $w \, e^{\epsilon}$.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrraHousehold {
    /// Discount factor
    /// unit: dimensionless, in (0, 1)
    pub beta: f64,
    /// Relative risk aversion
    pub gamma: f64,
    /// Lowest permitted asset position
    #[serde(default)]
    pub borrowing_limit: f64,
}

impl CrraHousehold {
    /// Create a household with a zero borrowing limit.
    pub fn new(beta: f64, gamma: f64) -> Self {
        Self {
            beta,
            gamma,
            borrowing_limit: 0.0,
        }
    }

    /// Set a non-zero borrowing limit.
    pub fn with_borrowing_limit(self, borrowing_limit: f64) -> Self {
        Self {
            borrowing_limit,
            ..self
        }
    }
}

#[typetag::serde(name = "crra")]
impl Household for CrraHousehold {
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

    fn borrowing_limit(&self) -> f64 {
        self.borrowing_limit
    }

    fn validate(&self) -> HamResult<()> {
        if !(self.beta > 0.0 && self.beta < 1.0) {
            return Err(HamError::InvalidParameter {
                name: "beta".to_string(),
                reason: format!("discount factor must lie in (0, 1), got {}", self.beta),
            });
        }
        if !(self.gamma > 0.0) {
            return Err(HamError::InvalidParameter {
                name: "gamma".to_string(),
                reason: format!("risk aversion must be positive, got {}", self.gamma),
            });
        }
        Ok(())
    }
}

/// Cobb-Douglas factor prices.
///
/// With output $Y = e^z K^\alpha N^{1-\alpha}$, competitive factor markets
/// pay
/// $$ r = \alpha e^z (N/K)^{1-\alpha} - \delta, \qquad
///    w = (1-\alpha) e^z (K/N)^{\alpha} $$
///
/// This is the mapping from the aggregate state into the prices faced by
/// individual agents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CobbDouglasProjection {
    /// Capital share
    pub alpha: f64,
    /// Depreciation rate
    pub delta: f64,
    /// Aggregate labor supply in efficiency units
    #[serde(default = "default_labor")]
    pub labor: f64,
}

fn default_labor() -> f64 {
    1.0
}

impl CobbDouglasProjection {
    pub fn new(alpha: f64, delta: f64) -> Self {
        Self {
            alpha,
            delta,
            labor: default_labor(),
        }
    }
}

#[typetag::serde(name = "cobb_douglas")]
impl Projection for CobbDouglasProjection {
    fn project(&self, exogenous: f64, capital: f64) -> HamResult<Prices> {
        if !(capital > 0.0) {
            return Err(HamError::InvalidParameter {
                name: "capital".to_string(),
                reason: format!("must be positive to price factors, got {capital}"),
            });
        }

        let tfp = exogenous.exp();
        let ratio = self.labor / capital;
        Ok(Prices {
            r: self.alpha * tfp * ratio.powf(1.0 - self.alpha) - self.delta,
            w: (1.0 - self.alpha) * tfp * ratio.powf(-self.alpha),
        })
    }

    fn validate(&self) -> HamResult<()> {
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return Err(HamError::InvalidParameter {
                name: "alpha".to_string(),
                reason: format!("capital share must lie in (0, 1), got {}", self.alpha),
            });
        }
        if !(self.delta >= 0.0 && self.delta <= 1.0) {
            return Err(HamError::InvalidParameter {
                name: "delta".to_string(),
                reason: format!("depreciation must lie in [0, 1], got {}", self.delta),
            });
        }
        if !(self.labor > 0.0) {
            return Err(HamError::InvalidParameter {
                name: "labor".to_string(),
                reason: format!("labor supply must be positive, got {}", self.labor),
            });
        }
        Ok(())
    }
}

/// A calibrated specification of the Aiyagari example economy.
pub const AIYAGARI_TOML: &str = r#"
name = "aiyagari"

[household]
type = "crra"
beta = 0.96
gamma = 4.0
borrowing_limit = 0.0

[projection]
type = "cobb_douglas"
alpha = 0.36
delta = 0.08
labor = 1.0

[idiosyncratic]
rho = 0.9
sigma = 0.2
states = 2

[aggregate]
rho = 0.9
sigma = 0.01

[grid]
min = 0.0
max = 30.0
points = 60
"#;

/// Parse the calibrated Aiyagari specification.
pub fn aiyagari_spec() -> HamResult<ham_core::config::ModelSpec> {
    ham_core::config::ModelSpec::from_toml_str(AIYAGARI_TOML)
}
