//! Full-space scan: score every point of the enumerated cut-change boundary.
//!
//! Two measures go through bisection, three through the Delaunay mesh (every
//! sampled point is scored, not only the boundary vertices). Points are
//! submitted to an `Executor` in enumeration order; a full queue is drained
//! from the oldest pending task before the next submission.

use std::collections::VecDeque;
use std::sync::Arc;

use tracing::{info, warn};

use super::{FoldsEvaluator, RunStats, SelectionResult, TaskFailure};
use crate::context::SearchContext;
use crate::enrich::{bisect, enrich_mesh, BisectCfg, MeshCfg};
use crate::error::{MelifError, Result};
use crate::point::Point;
use crate::sched::{Executor, SchedCfg, TaskHandle};

/// Algorithm name recorded in the returned `RunStats`.
pub const FULL_SPACE_SCAN: &str = "full-space-scan";

/// Points worth scoring for the context's measures.
pub fn scan_points<D>(ctx: &SearchContext<D>) -> Result<Vec<Point>> {
    match ctx.dim() {
        2 => {
            let cfg = BisectCfg {
                cut_size: ctx.cut_size(),
                ..BisectCfg::default()
            };
            Ok(bisect(ctx.measures(), cfg)?.points_to_try)
        }
        3 => {
            let cfg = MeshCfg {
                cut_size: ctx.cut_size(),
                ..MeshCfg::default()
            };
            let mesh = enrich_mesh(ctx.measures(), ctx.cache(), cfg)?;
            // a non-recording cache leaves only the mesh vertices
            if mesh.sampled_points.is_empty() {
                Ok(mesh.boundary_points)
            } else {
                Ok(mesh.sampled_points)
            }
        }
        n => Err(MelifError::config(format!(
            "full-space scan supports 2 or 3 measures, got {n}"
        ))),
    }
}

/// Score each point of `scan_points` on a fresh executor and keep the best.
///
/// Failed evaluations are collected in `RunStats::failures`.
pub fn scan_and_score<D, E>(
    ctx: &SearchContext<D>,
    evaluator: E,
    sched: SchedCfg,
) -> Result<RunStats>
where
    D: Send + Sync + 'static,
    E: FoldsEvaluator<D> + 'static,
{
    let points = scan_points(ctx)?;
    info!(algorithm = FULL_SPACE_SCAN, points = points.len(), "scan started");
    let executor = Executor::new(sched)?;
    let evaluator = Arc::new(evaluator);
    let mut stats = RunStats::new(FULL_SPACE_SCAN);
    let mut pending: VecDeque<(Point, TaskHandle<SelectionResult>)> = VecDeque::new();

    for point in points {
        loop {
            let task = score_task(ctx.clone(), evaluator.clone(), point.clone());
            match executor.submit(1.0, task) {
                Ok(handle) => {
                    pending.push_back((point, handle));
                    break;
                }
                Err(MelifError::QueueFull { .. }) if !pending.is_empty() => {
                    if let Some((done, handle)) = pending.pop_front() {
                        fold(&mut stats, done, handle);
                    }
                }
                Err(error) => {
                    warn!(%point, %error, "task rejected");
                    stats.rejected += 1;
                    break;
                }
            }
        }
    }
    while let Some((point, handle)) = pending.pop_front() {
        fold(&mut stats, point, handle);
    }
    executor.shutdown()?;

    stats.work_time = stats.started_at.elapsed().unwrap_or_default();
    match &stats.best {
        Some(best) => info!(
            algorithm = FULL_SPACE_SCAN,
            score = best.score,
            point = %best.point,
            visited = stats.visited_points,
            failures = stats.failures.len(),
            secs = stats.work_time.as_secs_f64(),
            "scan finished"
        ),
        None => warn!(
            algorithm = FULL_SPACE_SCAN,
            failures = stats.failures.len(),
            "scan found no score"
        ),
    }
    Ok(stats)
}

fn score_task<D, E>(
    ctx: SearchContext<D>,
    evaluator: Arc<E>,
    point: Point,
) -> impl FnOnce() -> Result<SelectionResult> + Send + 'static
where
    D: Send + Sync + 'static,
    E: FoldsEvaluator<D> + 'static,
{
    move || {
        let selected = ctx.cut_at(&point)?;
        let score = evaluator.score(ctx.dataset(), &point)?;
        if !score.is_finite() {
            return Err(MelifError::TaskFailed(format!(
                "evaluator returned {score} at {point}"
            )));
        }
        Ok(SelectionResult {
            point,
            selected,
            score,
        })
    }
}

fn fold(stats: &mut RunStats, point: Point, handle: TaskHandle<SelectionResult>) {
    match handle.wait() {
        Ok(result) => {
            stats.update_best_result(result);
        }
        Err(error) => {
            warn!(%point, %error, "task failed");
            stats.failures.push(TaskFailure { point, error });
        }
    }
}
