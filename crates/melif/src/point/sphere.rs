//! Spherical parametrization of 2- and 3-measure ensembles.
//!
//! One angle `θ` maps to `(cos θ, sin θ)`. Two angles `(φ, θ)` map to
//! `(cos φ sin θ, sin φ sin θ, cos θ)`, so `θ = 0` is the pole of the last
//! measure. Angles are sampled in `[MIN_ANGLE, MAX_ANGLE]`, which keeps every
//! coordinate non-negative.

use super::{Point, SpacePoint};
use crate::error::{MelifError, Result};

pub const MIN_ANGLE: f64 = 0.0;
pub const MAX_ANGLE: f64 = std::f64::consts::FRAC_PI_2;
pub const ANGLE_RANGE: f64 = MAX_ANGLE - MIN_ANGLE;

/// Angles → unit-sphere point. Only 1 or 2 angles are supported.
pub fn spherical_to_cartesian(angles: &[f64]) -> Result<Point> {
    if let Some(bad) = angles.iter().find(|a| !a.is_finite()) {
        return Err(MelifError::point(format!("angle {bad} is not finite")));
    }
    let coords = match *angles {
        [theta] => vec![theta.cos(), theta.sin()],
        [phi, theta] => {
            let s = theta.sin();
            vec![phi.cos() * s, phi.sin() * s, theta.cos()]
        }
        _ => {
            return Err(MelifError::config(format!(
                "spherical coordinates support 1 or 2 angles, got {}",
                angles.len()
            )))
        }
    };
    Ok(Point::from_unit(coords))
}

/// Angle of sample `position` on a grid of `epsilon` equal steps.
#[inline]
pub fn angle_at(epsilon: u64, position: u64) -> f64 {
    MIN_ANGLE + ANGLE_RANGE / (epsilon as f64) * (position as f64)
}

impl SpacePoint {
    /// Each coordinate `k/delta` read as the fraction `k/delta` of the angle range.
    pub fn angles(&self) -> Vec<f64> {
        let delta = self.delta() as f64;
        self.coords()
            .iter()
            .map(|&k| MIN_ANGLE + ANGLE_RANGE * (k as f64) / delta)
            .collect()
    }

    #[inline]
    pub fn to_sphere(&self) -> Result<Point> {
        spherical_to_cartesian(&self.angles())
    }
}
