use serde::{Deserialize, Serialize};

use crate::error::{CoverageError, Result};
use crate::geo::EARTH_RADIUS;

/// Atmospheric refraction folded into an effective Earth radius,
/// `R_eff = k·R`. The standard atmosphere gives k = 4/3.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RefractionParams {
    pub k_factor: f64,
}

impl Default for RefractionParams {
    fn default() -> Self {
        Self { k_factor: 4.0 / 3.0 }
    }
}

impl RefractionParams {
    pub fn validate(&self) -> Result<()> {
        if !(self.k_factor.is_finite() && self.k_factor > 0.0) {
            return Err(CoverageError::InvalidRefraction(self.k_factor));
        }
        Ok(())
    }
}

pub fn effective_earth_radius(params: RefractionParams) -> f64 {
    EARTH_RADIUS * params.k_factor
}

/// Height the surface falls below the tangent plane at horizontal
/// offset `(x, y)` from the radar: `d² / (2·R_eff)`.
#[inline(always)]
pub fn curvature_drop(x: f64, y: f64, r_eff: f64) -> f64 {
    let d = x.hypot(y);
    (d * d) / (2.0 * r_eff)
}
