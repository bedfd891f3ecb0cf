//! Partial-equilibrium building blocks.

use ham_core::errors::{HamError, HamResult};
use ham_core::equilibrium::Projection;
use ham_core::household::Prices;
use serde::{Deserialize, Serialize};

/// A projection that returns the same prices for any aggregate state.
///
/// Closes the aggregate block without feedback from the distribution:
/// useful for checking the one-agent sub-part of a model in isolation, or
/// for experiments where prices are pinned externally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixedPricesProjection {
    pub r: f64,
    pub w: f64,
}

impl FixedPricesProjection {
    pub fn new(r: f64, w: f64) -> Self {
        Self { r, w }
    }
}

#[typetag::serde(name = "fixed_prices")]
impl Projection for FixedPricesProjection {
    fn project(&self, _exogenous: f64, _capital: f64) -> HamResult<Prices> {
        Ok(Prices {
            r: self.r,
            w: self.w,
        })
    }

    fn validate(&self) -> HamResult<()> {
        if !(self.r > -1.0) {
            return Err(HamError::InvalidParameter {
                name: "r".to_string(),
                reason: format!("gross return must be positive, got r = {}", self.r),
            });
        }
        if !(self.w >= 0.0) {
            return Err(HamError::InvalidParameter {
                name: "w".to_string(),
                reason: format!("wage must be non-negative, got {}", self.w),
            });
        }
        Ok(())
    }
}
