//! MeLiF: priority-driven coordinate descent over measure weights.
//!
//! Purpose
//! - Start from seed points, score each through a `FoldsEvaluator`, and
//!   enqueue its `±delta` neighbours with the parent's score as priority, so
//!   the surroundings of good points are explored first.
//! - Queued priorities are boosted by `priority_increment` (on every
//!   improvement, or on every step) so older work is not starved by newcomers.
//! - A run ends when every submitted task has resolved. Stop rules make
//!   remaining tasks return without evaluating.
//!
//! - `scan_and_score` is the exhaustive alternative: score every enumerated
//!   boundary point once, with no neighbour expansion.
//!
//! Code cross-refs: `sched::Executor`, `context::SearchContext`, `enrich`.

mod eval;
mod scan;
mod stats;

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use crate::context::SearchContext;
use crate::error::{MelifError, Result};
use crate::point::Point;
use crate::sched::{Executor, SchedCfg, Spawner, TaskHandle};

pub use eval::{DataSetFilter, FeatureSubset, FoldsEvaluator, PreferredSizeFilter};
pub use scan::{scan_and_score, scan_points, FULL_SPACE_SCAN};
pub use stats::{RunStats, SelectionResult, TaskFailure};

/// When queued priorities get boosted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BoostPolicy {
    OnImprovement,
    EveryStep,
}

/// Conditions that end a run early; `None` disables a limit.
#[derive(Clone, Copy, Debug)]
pub struct StopRule {
    pub max_points: Option<usize>,
    pub no_improve_limit: Option<usize>,
    /// A best score within this distance of `1.0` stops the run.
    pub perfect_score_eps: f64,
}

impl Default for StopRule {
    fn default() -> Self {
        Self {
            max_points: Some(75),
            no_improve_limit: None,
            perfect_score_eps: 1e-4,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct SearchCfg {
    pub delta: f64,
    pub priority_increment: f64,
    pub boost: BoostPolicy,
    pub stop: StopRule,
    pub sched: SchedCfg,
}

impl Default for SearchCfg {
    fn default() -> Self {
        Self {
            delta: 0.1,
            priority_increment: 0.1,
            boost: BoostPolicy::OnImprovement,
            stop: StopRule::default(),
            sched: SchedCfg::default(),
        }
    }
}

/// The all-equal point plus, per coordinate `c`, the point with weight on `c`
/// and on the last coordinate.
pub fn default_seeds(dim: usize) -> Result<Vec<Point>> {
    if dim == 0 {
        return Err(MelifError::config("seeds need at least one measure"));
    }
    let mut seeds = vec![Point::normalize(&vec![1.0; dim])?];
    for c in 0..dim {
        let mut raw = vec![0.0; dim];
        raw[c] = 1.0;
        raw[dim - 1] = 1.0;
        seeds.push(Point::normalize(&raw)?);
    }
    Ok(seeds)
}

pub struct PriorityMelif<D, E> {
    ctx: SearchContext<D>,
    evaluator: Arc<E>,
    cfg: SearchCfg,
}

impl<D, E> PriorityMelif<D, E>
where
    D: Send + Sync + 'static,
    E: FoldsEvaluator<D> + 'static,
{
    pub fn new(ctx: SearchContext<D>, evaluator: E, cfg: SearchCfg) -> Result<Self> {
        if !(cfg.delta > 0.0 && cfg.delta.is_finite()) {
            return Err(MelifError::config(format!(
                "neighbour delta must be positive, got {}",
                cfg.delta
            )));
        }
        Ok(Self {
            ctx,
            evaluator: Arc::new(evaluator),
            cfg,
        })
    }

    #[inline]
    pub fn context(&self) -> &SearchContext<D> {
        &self.ctx
    }

    /// Run from `default_seeds`.
    pub fn run_default(&self, name: &str) -> Result<RunStats> {
        self.run(name, &default_seeds(self.ctx.dim())?)
    }

    pub fn run(&self, name: &str, seeds: &[Point]) -> Result<RunStats> {
        if let Some(bad) = seeds.iter().find(|p| p.dim() != self.ctx.dim()) {
            return Err(MelifError::config(format!(
                "seed {bad} has {} weights but there are {} measures",
                bad.dim(),
                self.ctx.dim()
            )));
        }
        let executor = Executor::new(self.cfg.sched)?;
        let run = Arc::new(Run {
            ctx: self.ctx.clone(),
            evaluator: self.evaluator.clone(),
            cfg: self.cfg,
            spawner: executor.spawner(),
            stats: Mutex::new(RunStats::new(name)),
            visited: Mutex::new(BTreeSet::new()),
            started: AtomicUsize::new(0),
            stopped: AtomicBool::new(false),
            handles: Mutex::new(Vec::new()),
        });
        info!(algorithm = name, seeds = seeds.len(), "search started");
        for seed in seeds {
            run.submit(seed.clone(), 1.0);
        }

        loop {
            let next = lock(&run.handles).pop();
            let Some((point, handle)) = next else {
                break;
            };
            if let Err(error) = handle.wait() {
                warn!(%point, %error, "task failed");
                lock(&run.stats).failures.push(TaskFailure { point, error });
            }
        }
        executor.shutdown()?;

        let mut stats = lock(&run.stats).clone();
        stats.work_time = stats.started_at.elapsed().unwrap_or_default();
        match &stats.best {
            Some(best) => info!(
                algorithm = name,
                score = best.score,
                point = %best.point,
                visited = stats.visited_points,
                failures = stats.failures.len(),
                secs = stats.work_time.as_secs_f64(),
                "search finished"
            ),
            None => warn!(algorithm = name, failures = stats.failures.len(), "search found no score"),
        }
        Ok(stats)
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Shared state of one `run` call.
struct Run<D, E> {
    ctx: SearchContext<D>,
    evaluator: Arc<E>,
    cfg: SearchCfg,
    spawner: Spawner,
    stats: Mutex<RunStats>,
    visited: Mutex<BTreeSet<Point>>,
    /// Evaluations admitted so far (bounded by `max_points`).
    started: AtomicUsize,
    stopped: AtomicBool,
    handles: Mutex<Vec<(Point, TaskHandle<Option<f64>>)>>,
}

impl<D, E> Run<D, E>
where
    D: Send + Sync + 'static,
    E: FoldsEvaluator<D> + 'static,
{
    fn submit(self: &Arc<Self>, point: Point, priority: f64) {
        let run = self.clone();
        let task_point = point.clone();
        match self.spawner.submit(priority, move || run.process(task_point)) {
            Ok(handle) => lock(&self.handles).push((point, handle)),
            Err(error) => {
                warn!(%point, %error, "task rejected");
                lock(&self.stats).rejected += 1;
            }
        }
    }

    fn stop(&self, reason: &'static str) -> bool {
        if !self.stopped.swap(true, Ordering::SeqCst) {
            info!(reason, "stop condition reached");
        }
        true
    }

    fn should_stop(&self) -> bool {
        if self.stopped.load(Ordering::SeqCst) {
            return true;
        }
        let rule = self.cfg.stop;
        let stats = lock(&self.stats);
        if let Some(best) = stats.best_score() {
            if (best - 1.0).abs() < rule.perfect_score_eps {
                drop(stats);
                return self.stop("perfect score");
            }
        }
        if let Some(limit) = rule.no_improve_limit {
            if stats.no_improve > limit {
                drop(stats);
                return self.stop("no improvement");
            }
        }
        false
    }

    fn process(self: &Arc<Self>, point: Point) -> Result<Option<f64>> {
        if self.should_stop() {
            return Ok(None);
        }
        if !lock(&self.visited).insert(point.clone()) {
            warn!(%point, "point is already processed");
            lock(&self.stats).skipped += 1;
            return Ok(None);
        }
        if let Some(max) = self.cfg.stop.max_points {
            if self.started.fetch_add(1, Ordering::SeqCst) >= max {
                self.stop("max points");
                return Ok(None);
            }
        }

        debug!(%point, "processing point");
        let selected = self.ctx.cut_at(&point)?;
        let score = self.evaluator.score(self.ctx.dataset(), &point)?;
        if !score.is_finite() {
            return Err(MelifError::TaskFailed(format!(
                "evaluator returned {score} at {point}"
            )));
        }
        let improved = lock(&self.stats).update_best_result(SelectionResult {
            point: point.clone(),
            selected,
            score,
        });
        if improved {
            debug!(%point, score, "new best");
        }
        if improved || self.cfg.boost == BoostPolicy::EveryStep {
            self.spawner.increase_priorities(self.cfg.priority_increment);
        }

        for neighbour in point.neighbours(self.cfg.delta) {
            if lock(&self.visited).contains(&neighbour) {
                continue;
            }
            self.submit(neighbour, score);
        }
        Ok(Some(score))
    }
}

#[cfg(test)]
mod tests;
