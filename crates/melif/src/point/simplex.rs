use std::cmp::Ordering;
use std::fmt;

use nalgebra::DVector;
use serde::Serialize;

use super::POINT_EPS;
use crate::error::{MelifError, Result};

/// Weight point. Immutable; derived points come from explicit transforms.
///
/// Invariants:
/// - Built by `normalize`: non-negative coordinates summing to 1.
/// - Built by `sphere::spherical_to_cartesian`: unit Euclidean norm.
/// - All coordinates finite.
#[derive(Clone, Debug, Serialize)]
pub struct Point {
    coords: Vec<f64>,
    #[serde(skip)]
    generation: u32,
}

impl Point {
    /// Divide every coordinate by the sum.
    pub fn normalize(raw: &[f64]) -> Result<Self> {
        Self::normalize_gen(raw, 0)
    }

    fn normalize_gen(raw: &[f64], generation: u32) -> Result<Self> {
        if raw.is_empty() {
            return Err(MelifError::point("point has no coordinates"));
        }
        if let Some(bad) = raw.iter().find(|c| !c.is_finite() || **c < 0.0) {
            return Err(MelifError::point(format!(
                "coordinate {bad} is negative or not finite"
            )));
        }
        let sum: f64 = raw.iter().sum();
        if sum <= 0.0 {
            return Err(MelifError::point("all coordinates are zero"));
        }
        Ok(Self {
            coords: raw.iter().map(|c| c / sum).collect(),
            generation,
        })
    }

    /// Wrap coordinates that already satisfy one of the invariants.
    pub(crate) fn from_unit(coords: Vec<f64>) -> Self {
        Self {
            coords,
            generation: 0,
        }
    }

    #[inline]
    pub fn coords(&self) -> &[f64] {
        &self.coords
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.coords.len()
    }

    #[inline]
    pub fn generation(&self) -> u32 {
        self.generation
    }

    #[inline]
    pub fn as_vector(&self) -> DVector<f64> {
        DVector::from_column_slice(&self.coords)
    }

    /// Add `delta` to coordinate `i`, then renormalize.
    pub fn perturb(&self, i: usize, delta: f64) -> Result<Point> {
        if i >= self.coords.len() {
            return Err(MelifError::config(format!(
                "coordinate {i} out of range for a {}-dimensional point",
                self.coords.len()
            )));
        }
        let mut raw = self.coords.clone();
        raw[i] += delta;
        Self::normalize_gen(&raw, self.generation + 1)
    }

    /// Coordinate-descent neighbourhood: `±delta` on every coordinate but the last.
    ///
    /// Variants that would leave the simplex (negative coordinate) are skipped.
    pub fn neighbours(&self, delta: f64) -> Vec<Point> {
        let mut out = Vec::with_capacity(2 * self.coords.len().saturating_sub(1));
        for i in 0..self.coords.len().saturating_sub(1) {
            for d in [delta, -delta] {
                if let Ok(p) = self.perturb(i, d) {
                    out.push(p);
                }
            }
        }
        out
    }

    /// Coordinate-wise average, renormalized.
    pub fn midpoint(&self, other: &Point) -> Result<Point> {
        if self.dim() != other.dim() {
            return Err(MelifError::config(format!(
                "midpoint of points with dimensions {} and {}",
                self.dim(),
                other.dim()
            )));
        }
        let raw: Vec<f64> = self
            .coords
            .iter()
            .zip(&other.coords)
            .map(|(a, b)| 0.5 * (a + b))
            .collect();
        Self::normalize_gen(&raw, self.generation.max(other.generation) + 1)
    }

    /// Lexicographic comparison where coordinates within `eps` count as equal.
    pub fn compare_eps(&self, other: &Point, eps: f64) -> Ordering {
        for (a, b) in self.coords.iter().zip(&other.coords) {
            let d = a - b;
            if d > eps {
                return Ordering::Greater;
            }
            if d < -eps {
                return Ordering::Less;
            }
        }
        self.coords.len().cmp(&other.coords.len())
    }
}

impl PartialEq for Point {
    fn eq(&self, other: &Self) -> bool {
        self.compare_eps(other, POINT_EPS) == Ordering::Equal
    }
}

impl Eq for Point {}

impl PartialOrd for Point {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Point {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare_eps(other, POINT_EPS)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, c) in self.coords.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{c:.3}")?;
        }
        write!(f, "]")?;
        if self.generation > 0 {
            write!(f, "/{}", self.generation)?;
        }
        Ok(())
    }
}
