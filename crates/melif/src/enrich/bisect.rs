//! 1-D bisection enrichment for 2-measure ensembles.
//!
//! Samples live on an integer grid: position `p` of `epsilon` steps is the
//! angle `angle_at(epsilon, p)` in `[0, π/2]`, mapped to `(cos, sin)`.
//! Each pass zooms the grid by `zoom` and subdivides every interval whose
//! end points carry different cuts. The loop stops once two consecutive
//! passes report the same number of cut-change positions.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, warn};

use crate::cut::{Cut, EvaluatedMeasures};
use crate::error::{MelifError, Result};
use crate::point::{angle_at, spherical_to_cartesian, Coord, Point};

#[derive(Clone, Copy, Debug)]
pub struct BisectCfg {
    pub start_epsilon: u64,
    pub zoom: u64,
    pub cut_size: usize,
    /// Upper bound on passes; hitting it, or zooming `epsilon` past `i64`,
    /// returns the last state with `converged = false`.
    pub max_passes: usize,
}

impl Default for BisectCfg {
    fn default() -> Self {
        Self {
            start_epsilon: 100,
            zoom: 10,
            cut_size: 50,
            max_passes: 32,
        }
    }
}

/// Restartable enrichment state: grid resolution, sampled positions, and the
/// exact-angle memo of cuts computed so far.
#[derive(Clone, Debug)]
pub struct BisectState {
    epsilon: u64,
    positions: BTreeSet<u64>,
    memo: BTreeMap<Coord, (Cut, Option<usize>)>,
}

impl BisectState {
    /// Evenly spaced `epsilon + 1` samples.
    pub fn initial(epsilon: u64) -> Result<Self> {
        Self::new(epsilon, (0..=epsilon).collect())
    }

    pub fn new(epsilon: u64, positions: BTreeSet<u64>) -> Result<Self> {
        if epsilon == 0 {
            return Err(MelifError::config("epsilon must be positive"));
        }
        if let Some(&last) = positions.iter().next_back() {
            if last > epsilon {
                return Err(MelifError::config(format!(
                    "position {last} lies beyond epsilon {epsilon}"
                )));
            }
        }
        i64::try_from(epsilon).map_err(|_| MelifError::ArithmeticOverflow("epsilon"))?;
        Ok(Self {
            epsilon,
            positions,
            memo: BTreeMap::new(),
        })
    }

    #[inline]
    pub fn epsilon(&self) -> u64 {
        self.epsilon
    }

    #[inline]
    pub fn positions(&self) -> &BTreeSet<u64> {
        &self.positions
    }

    fn key(&self, position: u64) -> Result<Coord> {
        // `new`/`zoomed` keep epsilon (and so every position) within i64.
        Coord::new(position as i64, self.epsilon as i64)
    }

    fn evaluate(&mut self, measures: &EvaluatedMeasures, cut_size: usize) -> Result<Pass> {
        let mut cuts = Vec::with_capacity(self.positions.len());
        let mut last_features = Vec::with_capacity(self.positions.len());
        let mut computed = 0usize;
        for &pos in &self.positions {
            let key = self.key(pos)?;
            let entry = match self.memo.get(&key) {
                Some(hit) => hit.clone(),
                None => {
                    let point = spherical_to_cartesian(&[angle_at(self.epsilon, pos)])?;
                    let fresh = measures.compute_cut_with_last(&point, cut_size)?;
                    self.memo.insert(key, fresh.clone());
                    computed += 1;
                    fresh
                }
            };
            cuts.push(entry.0);
            last_features.push(entry.1);
        }
        let ordered: Vec<u64> = self.positions.iter().copied().collect();
        let changes: Vec<(u64, u64)> = (1..ordered.len())
            .filter(|&i| cuts[i] != cuts[i - 1])
            .map(|i| (ordered[i - 1], ordered[i]))
            .collect();
        debug!(
            epsilon = self.epsilon,
            samples = ordered.len(),
            computed,
            changes = changes.len(),
            "bisection pass"
        );
        Ok(Pass {
            cuts,
            last_features,
            changes,
        })
    }

    /// Rescale by `zoom` and put `zoom - 1` evenly spaced samples inside every
    /// interval `(prev, pos)` that ends in a cut change.
    fn zoomed(&self, changes: &[(u64, u64)], zoom: u64) -> Result<BisectState> {
        let overflow = || MelifError::ArithmeticOverflow("bisection zoom");
        let epsilon = self.epsilon.checked_mul(zoom).ok_or_else(overflow)?;
        i64::try_from(epsilon).map_err(|_| overflow())?;
        let mut positions: BTreeSet<u64> = self.positions.iter().map(|p| p * zoom).collect();
        for &(prev, pos) in changes {
            let gap = pos - prev;
            positions.extend((1..zoom).map(|k| prev * zoom + k * gap));
        }
        Ok(BisectState {
            epsilon,
            positions,
            memo: self.memo.clone(),
        })
    }
}

struct Pass {
    cuts: Vec<Cut>,
    last_features: Vec<Option<usize>>,
    changes: Vec<(u64, u64)>,
}

/// Final (or last reached) state of a bisection run.
#[derive(Clone, Debug)]
pub struct Bisection {
    pub epsilon: u64,
    pub positions: Vec<u64>,
    pub angles: Vec<f64>,
    pub cuts: Vec<Cut>,
    /// Sample positions whose cut differs from the preceding sample.
    pub change_positions: Vec<u64>,
    /// Unit-circle points at the change angles.
    pub points_to_try: Vec<Point>,
    /// The `cut_size`-th ranked feature at each sample.
    pub last_features: Vec<Option<usize>>,
    pub passes: usize,
    pub converged: bool,
    pub state: BisectState,
}

pub fn bisect(measures: &EvaluatedMeasures, cfg: BisectCfg) -> Result<Bisection> {
    bisect_from(measures, cfg, BisectState::initial(cfg.start_epsilon)?)
}

/// Continue from any intermediate state.
pub fn bisect_from(
    measures: &EvaluatedMeasures,
    cfg: BisectCfg,
    start: BisectState,
) -> Result<Bisection> {
    if measures.measure_count() != 2 {
        return Err(MelifError::config(format!(
            "bisection needs exactly 2 measures, got {}",
            measures.measure_count()
        )));
    }
    if cfg.zoom < 2 {
        return Err(MelifError::config("zoom must be at least 2"));
    }
    if cfg.cut_size > measures.feature_count() {
        return Err(MelifError::config(format!(
            "cut size {} exceeds feature count {}",
            cfg.cut_size,
            measures.feature_count()
        )));
    }
    let mut state = start;
    let mut pass = state.evaluate(measures, cfg.cut_size)?;
    let mut passes = 1;
    let converged = loop {
        if passes >= cfg.max_passes {
            warn!(
                passes,
                changes = pass.changes.len(),
                "bisection stopped before the change count stabilized"
            );
            break false;
        }
        let prev_count = pass.changes.len();
        state = match state.zoomed(&pass.changes, cfg.zoom) {
            Ok(next) => next,
            Err(MelifError::ArithmeticOverflow(what)) => {
                warn!(
                    passes,
                    epsilon = state.epsilon,
                    what,
                    "bisection grid cannot be zoomed further"
                );
                break false;
            }
            Err(e) => return Err(e),
        };
        pass = state.evaluate(measures, cfg.cut_size)?;
        passes += 1;
        if pass.changes.len() == prev_count {
            break true;
        }
    };

    let epsilon = state.epsilon;
    let positions: Vec<u64> = state.positions.iter().copied().collect();
    let angles = positions.iter().map(|&p| angle_at(epsilon, p)).collect();
    let change_positions: Vec<u64> = pass.changes.iter().map(|&(_, pos)| pos).collect();
    let points_to_try = change_positions
        .iter()
        .map(|&p| spherical_to_cartesian(&[angle_at(epsilon, p)]))
        .collect::<Result<Vec<_>>>()?;
    Ok(Bisection {
        epsilon,
        positions,
        angles,
        cuts: pass.cuts,
        change_positions,
        points_to_try,
        last_features: pass.last_features,
        passes,
        converged,
        state,
    })
}
