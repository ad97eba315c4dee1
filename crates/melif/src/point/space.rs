//! Exact rational coordinates.
//!
//! - `Coord`: reduced fraction, ordered by cross-multiplication in `i128`.
//! - `SpacePoint`: integer vector over one shared denominator `delta`.
//!   Equality is structural (no implicit reduction): `[1]/2 != [2]/4`.
//! - `midpoint`: exact, deterministic; no floating point involved.

use std::cmp::Ordering;
use std::fmt;

use crate::error::{MelifError, Result};

pub fn gcd(a: i64, b: i64) -> i64 {
    let (mut a, mut b) = (a.unsigned_abs(), b.unsigned_abs());
    while b != 0 {
        let r = a % b;
        a = b;
        b = r;
    }
    a as i64
}

pub fn lcm(a: i64, b: i64) -> Result<i64> {
    let g = gcd(a, b);
    if g == 0 {
        return Ok(0);
    }
    (a / g)
        .checked_mul(b)
        .map(i64::abs)
        .ok_or(MelifError::ArithmeticOverflow("lcm"))
}

/// Fraction in lowest terms with a positive denominator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Coord {
    num: i64,
    den: i64,
}

impl Coord {
    pub fn new(num: i64, den: i64) -> Result<Self> {
        if den == 0 {
            return Err(MelifError::point("zero denominator"));
        }
        let g = gcd(num, den);
        let sign = if den < 0 { -1 } else { 1 };
        Ok(Self {
            num: sign * num / g,
            den: sign * den / g,
        })
    }

    #[inline]
    pub fn num(&self) -> i64 {
        self.num
    }

    #[inline]
    pub fn den(&self) -> i64 {
        self.den
    }

    #[inline]
    pub fn to_f64(self) -> f64 {
        self.num as f64 / self.den as f64
    }
}

impl PartialOrd for Coord {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Coord {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.num as i128 * other.den as i128).cmp(&(other.num as i128 * self.den as i128))
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

/// Integer coordinates over a shared positive denominator.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SpacePoint {
    coords: Vec<i64>,
    delta: i64,
}

impl SpacePoint {
    pub fn new(coords: Vec<i64>, delta: i64) -> Result<Self> {
        if delta <= 0 {
            return Err(MelifError::point(format!(
                "denominator must be positive, got {delta}"
            )));
        }
        Ok(Self { coords, delta })
    }

    /// Origin of a `dim`-dimensional grid.
    pub fn zeros(dim: usize) -> Self {
        Self {
            coords: vec![0; dim],
            delta: 1,
        }
    }

    #[inline]
    pub fn coords(&self) -> &[i64] {
        &self.coords
    }

    #[inline]
    pub fn delta(&self) -> i64 {
        self.delta
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.coords.len()
    }

    /// Coordinate `i` as a reduced fraction.
    #[inline]
    pub fn coord(&self, i: usize) -> Coord {
        let g = gcd(self.coords[i], self.delta);
        Coord {
            num: self.coords[i] / g,
            den: self.delta / g,
        }
    }
}

/// Rational order per coordinate; equal rationals fall back to `delta`, then
/// raw numerators, so the order agrees with structural equality.
impl Ord for SpacePoint {
    fn cmp(&self, other: &Self) -> Ordering {
        self.dim()
            .cmp(&other.dim())
            .then_with(|| {
                (0..self.dim())
                    .map(|i| self.coord(i).cmp(&other.coord(i)))
                    .find(|o| *o != Ordering::Equal)
                    .unwrap_or(Ordering::Equal)
            })
            .then_with(|| self.delta.cmp(&other.delta))
            .then_with(|| self.coords.cmp(&other.coords))
    }
}

impl PartialOrd for SpacePoint {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for SpacePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}/{}", self.coords, self.delta)
    }
}

/// Exact midpoint of `a` and `b`.
///
/// Both points are raised to the LCM of their deltas and summed. An all-even
/// sum is halved and reduced by the common divisor with the denominator;
/// otherwise the denominator is doubled.
pub fn midpoint(a: &SpacePoint, b: &SpacePoint) -> Result<SpacePoint> {
    if a.dim() != b.dim() {
        return Err(MelifError::config(format!(
            "midpoint of points with dimensions {} and {}",
            a.dim(),
            b.dim()
        )));
    }
    let common = lcm(a.delta, b.delta)?;
    let mul_a = common / a.delta;
    let mul_b = common / b.delta;
    let overflow = MelifError::ArithmeticOverflow("midpoint");
    let mut sum = Vec::with_capacity(a.dim());
    for (&x, &y) in a.coords.iter().zip(&b.coords) {
        let s = x
            .checked_mul(mul_a)
            .zip(y.checked_mul(mul_b))
            .and_then(|(p, q)| p.checked_add(q))
            .ok_or_else(|| overflow.clone())?;
        sum.push(s);
    }
    if sum.iter().all(|s| s % 2 == 0) {
        sum.iter_mut().for_each(|s| *s /= 2);
        let g = sum.iter().fold(common, |acc, &s| gcd(acc, s));
        sum.iter_mut().for_each(|s| *s /= g);
        Ok(SpacePoint {
            coords: sum,
            delta: common / g,
        })
    } else {
        let delta = common.checked_mul(2).ok_or(overflow)?;
        Ok(SpacePoint { coords: sum, delta })
    }
}
