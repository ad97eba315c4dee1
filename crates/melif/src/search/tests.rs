use std::time::Duration;

use rand::{rngs::StdRng, Rng, SeedableRng};

use super::*;
use crate::cut::{Cut, EvaluatedMeasures};
use crate::sched::SchedCfg;

fn ctx(seed: u64) -> SearchContext<()> {
    let mut rng = StdRng::seed_from_u64(seed);
    let rows: Vec<Vec<f64>> = (0..20)
        .map(|_| (0..3).map(|_| rng.gen::<f64>()).collect())
        .collect();
    SearchContext::with_map_cache((), EvaluatedMeasures::from_rows(&rows).unwrap(), 5).unwrap()
}

fn cfg(stop: StopRule) -> SearchCfg {
    SearchCfg {
        stop,
        sched: SchedCfg {
            threads: 2,
            capacity: 64,
            starvation_timeout: Duration::from_secs(5),
        },
        ..SearchCfg::default()
    }
}

fn points(max: usize) -> StopRule {
    StopRule {
        max_points: Some(max),
        ..StopRule::default()
    }
}

const TARGET: [f64; 3] = [0.6, 0.3, 0.1];

fn closeness(_: &(), p: &Point) -> Result<f64> {
    let l1: f64 = p.coords().iter().zip(TARGET).map(|(a, b)| (a - b).abs()).sum();
    Ok(1.0 - l1 / 2.0)
}

#[test]
fn default_seeds_cover_corners() {
    let seeds = default_seeds(3).unwrap();
    let expect = [
        [1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0],
        [0.5, 0.0, 0.5],
        [0.0, 0.5, 0.5],
        [0.0, 0.0, 1.0],
    ];
    assert_eq!(seeds.len(), expect.len());
    for (s, e) in seeds.iter().zip(expect) {
        assert!(s.coords().iter().zip(e).all(|(a, b)| (a - b).abs() < 1e-12));
    }
    assert!(default_seeds(0).is_err());
}

#[test]
fn run_stats_best_is_monotonic() {
    let mut stats = RunStats::new("unit");
    let p = Point::normalize(&[1.0, 1.0]).unwrap();
    let result = |score| SelectionResult {
        point: p.clone(),
        selected: Cut::from_indices([0]),
        score,
    };
    assert!(stats.update_best_result(result(0.4)));
    assert!(!stats.update_best_result(result(0.2)));
    assert!(!stats.update_best_result(result(0.4)));
    assert_eq!(stats.no_improve, 2);
    assert!(stats.update_best_result(result(0.7)));
    assert_eq!(stats.best_score(), Some(0.7));
    assert_eq!(stats.no_improve, 0);
    assert_eq!(stats.visited_points, 4);
}

#[test]
fn search_climbs_towards_the_best_point() {
    let ctx = ctx(1);
    let seed_best = default_seeds(3)
        .unwrap()
        .iter()
        .map(|p| closeness(&(), p).unwrap())
        .fold(f64::MIN, f64::max);
    let melif = PriorityMelif::new(ctx, closeness, cfg(points(60))).unwrap();
    let stats = melif.run_default("pq-melif").unwrap();
    let best = stats.best.clone().unwrap();
    assert!(best.score > seed_best);
    assert!(stats.visited_points <= 60);
    assert_eq!(best.selected.len(), 5);
    assert!(stats.failures.is_empty());
    assert_eq!(stats.algorithm, "pq-melif");
    // every evaluated point went through the shared cut cache
    assert!(melif.context().cache().all_known_points().len() >= stats.visited_points);
}

#[test]
fn max_points_bounds_evaluations_exactly() {
    let melif = PriorityMelif::new(
        ctx(2),
        |_: &(), p: &Point| -> Result<f64> { Ok(p.coords()[0] * 0.5) },
        cfg(points(10)),
    )
    .unwrap();
    let stats = melif.run_default("bounded").unwrap();
    assert_eq!(stats.visited_points, 10);
}

#[test]
fn perfect_score_stops_the_run() {
    let melif = PriorityMelif::new(
        ctx(3),
        |_: &(), _: &Point| -> Result<f64> { Ok(1.0) },
        cfg(points(1_000)),
    )
    .unwrap();
    let stats = melif.run_default("perfect").unwrap();
    assert_eq!(stats.best_score(), Some(1.0));
    assert!(stats.visited_points <= 2, "visited {}", stats.visited_points);
}

#[test]
fn no_improvement_limit_stops_the_run() {
    let rule = StopRule {
        max_points: None,
        no_improve_limit: Some(3),
        ..StopRule::default()
    };
    let melif = PriorityMelif::new(
        ctx(4),
        |_: &(), _: &Point| -> Result<f64> { Ok(0.5) },
        cfg(rule),
    )
    .unwrap();
    let stats = melif.run_default("plateau").unwrap();
    assert!((5..=6).contains(&stats.visited_points), "visited {}", stats.visited_points);
}

#[test]
fn failing_points_are_reported_not_fatal() {
    let melif = PriorityMelif::new(
        ctx(5),
        |_: &(), p: &Point| -> Result<f64> {
            if p.coords()[2] < 0.3 {
                return Err(MelifError::TaskFailed("classifier diverged".into()));
            }
            Ok(1.0 - p.coords()[2])
        },
        cfg(points(30)),
    )
    .unwrap();
    let stats = melif.run_default("flaky").unwrap();
    assert!(!stats.failures.is_empty());
    assert!(stats.failures.iter().all(|f| f.point.coords()[2] < 0.3));
    assert!(stats.best.is_some());
}

#[test]
fn panicking_evaluator_is_isolated() {
    let melif = PriorityMelif::new(
        ctx(6),
        |_: &(), p: &Point| -> Result<f64> {
            if p.generation() > 0 {
                panic!("evaluator crashed");
            }
            Ok(0.25)
        },
        cfg(points(20)),
    )
    .unwrap();
    let stats = melif.run_default("panicky").unwrap();
    assert_eq!(stats.best_score(), Some(0.25));
    assert!(!stats.failures.is_empty());
    assert!(stats
        .failures
        .iter()
        .all(|f| f.error == MelifError::TaskFailed("evaluator crashed".into())));
}

#[test]
fn duplicate_points_are_skipped() {
    let melif = PriorityMelif::new(ctx(7), closeness, cfg(points(1))).unwrap();
    let p = Point::normalize(&[1.0, 2.0, 3.0]).unwrap();
    let stats = melif.run("dupes", &[p.clone(), p]).unwrap();
    assert_eq!(stats.visited_points, 1);
    assert!(stats.skipped >= 1);
}

#[test]
fn every_step_boost_still_converges() {
    let mut c = cfg(points(25));
    c.boost = BoostPolicy::EveryStep;
    let melif = PriorityMelif::new(ctx(8), closeness, c).unwrap();
    let stats = melif.run_default("every-step").unwrap();
    assert_eq!(stats.visited_points, 25);
}

#[test]
fn rejects_bad_inputs() {
    let melif = PriorityMelif::new(ctx(9), closeness, cfg(points(5))).unwrap();
    let flat = Point::normalize(&[1.0, 1.0]).unwrap();
    assert!(matches!(
        melif.run("bad", &[flat]),
        Err(MelifError::InvalidConfiguration(_))
    ));
    let mut c = cfg(points(5));
    c.delta = 0.0;
    assert!(PriorityMelif::new(ctx(9), closeness, c).is_err());
}

#[derive(Debug, PartialEq)]
struct Columns(Vec<usize>);

impl FeatureSubset for Columns {
    fn restrict(&self, features: &Cut) -> Self {
        Columns(self.0.iter().copied().filter(|&f| features.contains(f)).collect())
    }
}

#[test]
fn preferred_size_filter_keeps_top_features() {
    let m = EvaluatedMeasures::from_rows(&[vec![0.9, 0.1], vec![0.1, 0.9], vec![0.5, 0.5]]).unwrap();
    let data = Columns(vec![0, 1, 2]);
    let filter = PreferredSizeFilter { size: 2 };
    let p = Point::normalize(&[1.0, 0.0]).unwrap();
    assert_eq!(filter.filter(&data, &p, &m).unwrap(), Columns(vec![0, 2]));
}

// --- full-space scan -------------------------------------------------------

fn scan_sched(capacity: usize) -> SchedCfg {
    SchedCfg {
        threads: 2,
        capacity,
        starvation_timeout: Duration::from_secs(5),
    }
}

fn fixed_ctx(rows: &[Vec<f64>]) -> SearchContext<()> {
    SearchContext::with_map_cache((), EvaluatedMeasures::from_rows(rows).unwrap(), 1).unwrap()
}

#[test]
fn scan_scores_every_bisection_point() {
    let ctx = fixed_ctx(&[vec![1.0, 0.0], vec![0.0, 1.0], vec![0.6, 0.6]]);
    let first = |_: &(), p: &Point| -> Result<f64> { Ok(p.coords()[0]) };
    let points = scan_points(&ctx).unwrap();
    assert!(points.len() >= 2);
    let expect = points.iter().map(|p| p.coords()[0]).fold(f64::MIN, f64::max);

    let stats = scan_and_score(&ctx, first, scan_sched(64)).unwrap();
    assert_eq!(stats.algorithm, FULL_SPACE_SCAN);
    assert_eq!(stats.visited_points, points.len());
    assert!(stats.failures.is_empty());
    let best = stats.best.unwrap();
    assert_eq!(best.score, expect);
    assert_eq!(best.selected, ctx.cut_at(&best.point).unwrap());
}

#[test]
fn scan_drains_a_small_queue_over_mesh_points() {
    let ctx = fixed_ctx(&[
        vec![1.0, 0.0, 0.0],
        vec![0.0, 1.0, 0.0],
        vec![0.0, 0.0, 1.0],
        vec![0.4, 0.4, 0.4],
    ]);
    let stats = scan_and_score(&ctx, closeness, scan_sched(2)).unwrap();
    // corners, the inserted centroid and the three sub-triangle centroids
    assert_eq!(stats.visited_points, 7);
    assert_eq!(stats.rejected, 0);
    assert_eq!(ctx.cache().all_known_points().len(), 7);
    assert!(stats.best.is_some());
}

#[test]
fn scan_keeps_going_past_failed_points() {
    let ctx = fixed_ctx(&[vec![1.0, 0.0], vec![0.0, 1.0], vec![0.6, 0.6]]);
    let total = scan_points(&ctx).unwrap().len();
    let flaky = |_: &(), p: &Point| -> Result<f64> {
        // only the crossing near the first axis fails
        if p.coords()[0] > 0.7 {
            return Err(MelifError::TaskFailed("fold diverged".into()));
        }
        Ok(p.coords()[1])
    };
    let stats = scan_and_score(&ctx, flaky, scan_sched(64)).unwrap();
    assert!(!stats.failures.is_empty());
    assert!(stats.failures.iter().all(|f| f.point.coords()[0] > 0.7));
    assert!(stats.best.is_some());
    assert_eq!(stats.visited_points + stats.failures.len(), total);
}

#[test]
fn scan_needs_two_or_three_measures() {
    let ctx = fixed_ctx(&[vec![0.1, 0.2, 0.3, 0.4], vec![0.4, 0.3, 0.2, 0.1]]);
    assert!(matches!(
        scan_and_score(&ctx, |_: &(), _: &Point| -> Result<f64> { Ok(0.0) }, scan_sched(8)),
        Err(MelifError::InvalidConfiguration(_))
    ));
}
