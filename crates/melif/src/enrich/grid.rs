//! Axis-line enrichment over an exact rational angle grid (3 measures).
//!
//! Points are `SpacePoint`s whose coordinates are fractions of `[0, π/2]`.
//! For every dimension the sampled points are grouped into rows sharing that
//! coordinate. Walking a row, each point is compared with its predecessor:
//! an identical cut settles the point for that dimension, a difference of
//! more than one feature schedules the exact midpoint. Per dimension the loop
//! runs until two passes schedule the same number of midpoints.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, warn};

use crate::cache::CutCache;
use crate::cut::{diff, Cut, EvaluatedMeasures};
use crate::error::{MelifError, Result};
use crate::point::{midpoint, Coord, Point, SpacePoint};

const DIMS: usize = 2;

#[derive(Clone, Copy, Debug)]
pub struct GridCfg {
    pub cut_size: usize,
    /// Seed grid resolution; `1` seeds the four corners.
    pub initial_epsilon: i64,
    /// Midpoints with a larger denominator are dropped.
    pub max_delta: i64,
    pub max_passes: usize,
}

impl Default for GridCfg {
    fn default() -> Self {
        Self {
            cut_size: 50,
            initial_epsilon: 1,
            max_delta: 1 << 16,
            max_passes: 64,
        }
    }
}

#[derive(Clone, Debug)]
pub struct GridEnrichment {
    /// Sampled points not settled on any axis. Row heads have no predecessor
    /// and are always included.
    pub boundary: Vec<SpacePoint>,
    /// `boundary` mapped onto the unit sphere.
    pub points_to_try: Vec<Point>,
    pub sampled: Vec<SpacePoint>,
    pub passes_per_dim: Vec<usize>,
    pub converged: bool,
}

#[derive(Default)]
struct GridSpace {
    rows: [BTreeMap<Coord, BTreeSet<SpacePoint>>; DIMS],
    settled: [BTreeSet<SpacePoint>; DIMS],
    cuts: BTreeMap<SpacePoint, Cut>,
}

impl GridSpace {
    fn add(
        &mut self,
        points: &[SpacePoint],
        cut_of: &dyn Fn(&SpacePoint) -> Result<Cut>,
    ) -> Result<()> {
        for p in points {
            if self.cuts.contains_key(p) {
                continue;
            }
            let cut = cut_of(p)?;
            self.cuts.insert(p.clone(), cut);
            for (dim, rows) in self.rows.iter_mut().enumerate() {
                rows.entry(p.coord(dim)).or_default().insert(p.clone());
            }
        }
        Ok(())
    }

    fn enrichment(&mut self, dim: usize, max_delta: i64, scratch: &mut Cut) -> Result<Vec<SpacePoint>> {
        let mut fresh = BTreeSet::new();
        let mut newly_settled = Vec::new();
        let mut capped = 0usize;
        for row in self.rows[dim].values() {
            for (prev, point) in row.iter().zip(row.iter().skip(1)) {
                if self.settled[dim].contains(point) {
                    continue;
                }
                match diff(&self.cuts[prev], &self.cuts[point], scratch) {
                    0 => newly_settled.push(point.clone()),
                    1 => {}
                    _ => {
                        let mid = midpoint(prev, point)?;
                        if mid.delta() > max_delta {
                            capped += 1;
                        } else if !self.cuts.contains_key(&mid) {
                            fresh.insert(mid);
                        }
                    }
                }
            }
        }
        if capped > 0 {
            debug!(dim, capped, max_delta, "midpoints beyond the resolution cap dropped");
        }
        self.settled[dim].extend(newly_settled);
        Ok(fresh.into_iter().collect())
    }

    /// Sampled points never found equal to their row predecessor, on any axis.
    fn boundary(&self) -> Vec<SpacePoint> {
        self.cuts
            .keys()
            .filter(|p| !self.settled.iter().any(|settled| settled.contains(*p)))
            .cloned()
            .collect()
    }
}

fn seed_grid(epsilon: i64) -> Result<Vec<SpacePoint>> {
    let mut seed = Vec::new();
    for i in 0..=epsilon {
        for j in 0..=epsilon {
            seed.push(SpacePoint::new(vec![i, j], epsilon)?);
        }
    }
    Ok(seed)
}

pub fn enrich_grid(
    measures: &EvaluatedMeasures,
    cache: &dyn CutCache<SpacePoint>,
    cfg: GridCfg,
) -> Result<GridEnrichment> {
    if measures.measure_count() != DIMS + 1 {
        return Err(MelifError::config(format!(
            "grid enrichment needs exactly {} measures, got {}",
            DIMS + 1,
            measures.measure_count()
        )));
    }
    if cfg.initial_epsilon < 1 || cfg.max_delta < cfg.initial_epsilon {
        return Err(MelifError::config(format!(
            "grid resolution must satisfy 1 <= initial_epsilon ({}) <= max_delta ({})",
            cfg.initial_epsilon, cfg.max_delta
        )));
    }
    if cfg.cut_size > measures.feature_count() {
        return Err(MelifError::config(format!(
            "cut size {} exceeds feature count {}",
            cfg.cut_size,
            measures.feature_count()
        )));
    }
    let compute = |p: &SpacePoint| -> Result<Cut> {
        measures.compute_cut(&p.to_sphere()?, cfg.cut_size)
    };
    let cut_of = |p: &SpacePoint| cache.get_or_compute(p, &compute);

    let mut space = GridSpace::default();
    let mut scratch = Cut::new();
    let mut current = seed_grid(cfg.initial_epsilon)?;
    let mut passes_per_dim = Vec::with_capacity(DIMS);
    let mut converged = true;
    for dim in 0..DIMS {
        let mut passes = 0;
        loop {
            let prev_count = current.len();
            space.add(&current, &cut_of)?;
            current = space.enrichment(dim, cfg.max_delta, &mut scratch)?;
            passes += 1;
            debug!(
                dim,
                pass = passes,
                scheduled = current.len(),
                sampled = space.cuts.len(),
                "grid pass"
            );
            if current.len() == prev_count {
                break;
            }
            if passes >= cfg.max_passes {
                warn!(dim, passes, "grid enrichment stopped before the midpoint count repeated");
                converged = false;
                break;
            }
        }
        passes_per_dim.push(passes);
    }
    // midpoints scheduled by the final pass are still worth a cut
    space.add(&current, &cut_of)?;

    let boundary = space.boundary();
    let points_to_try = boundary
        .iter()
        .map(SpacePoint::to_sphere)
        .collect::<Result<Vec<_>>>()?;
    Ok(GridEnrichment {
        boundary,
        points_to_try,
        sampled: space.cuts.into_keys().collect(),
        passes_per_dim,
        converged,
    })
}
