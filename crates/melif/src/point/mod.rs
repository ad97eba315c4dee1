//! Weight-space points: normalized simplex points, spherical parametrization,
//! and exact rational grid points.
//!
//! Purpose
//! - `Point` is the floating representation handed to the cut engine and the
//!   search. Equality/ordering are eps-aware (`POINT_EPS`).
//! - `SpacePoint` and `Coord` are exact: integer numerators over a shared
//!   denominator, compared by cross-multiplication. The grid enrichment uses
//!   them so that midpoints never accumulate floating error.
//! - `sphere` maps angle vectors (1 or 2 angles) to Cartesian points on the
//!   unit sphere for 2- and 3-measure ensembles.
//!
//! Code cross-refs: `cut::EvaluatedMeasures::evaluate_point`, `enrich::grid`.

mod simplex;
mod space;
mod sphere;

pub use simplex::Point;
pub use space::{gcd, lcm, midpoint, Coord, SpacePoint};
pub use sphere::{angle_at, spherical_to_cartesian, ANGLE_RANGE, MAX_ANGLE, MIN_ANGLE};

/// Per-coordinate tolerance for comparing floating `Point`s.
pub const POINT_EPS: f64 = 1e-5;

#[cfg(test)]
mod tests;
