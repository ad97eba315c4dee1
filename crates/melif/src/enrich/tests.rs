use std::collections::BTreeSet;

use rand::{rngs::StdRng, Rng, SeedableRng};

use super::*;
use crate::cache::{CutCache, MapCache, NopCache};
use crate::cut::EvaluatedMeasures;
use crate::error::MelifError;
use crate::point::{Point, SpacePoint};

fn random_measures(seed: u64, features: usize, measures: usize) -> EvaluatedMeasures {
    let mut rng = StdRng::seed_from_u64(seed);
    let rows: Vec<Vec<f64>> = (0..features)
        .map(|_| (0..measures).map(|_| rng.gen::<f64>()).collect())
        .collect();
    EvaluatedMeasures::from_rows(&rows).unwrap()
}

/// f0 wins below atan(1.25) (about 51.3°), f1 above.
fn crossing_pair() -> EvaluatedMeasures {
    EvaluatedMeasures::from_rows(&[vec![1.0, 0.0], vec![0.0, 0.8], vec![0.1, 0.1]]).unwrap()
}

// --- bisection -------------------------------------------------------------

#[test]
fn bisection_locates_single_crossing() {
    let cfg = BisectCfg {
        cut_size: 1,
        ..BisectCfg::default()
    };
    let out = bisect(&crossing_pair(), cfg).unwrap();
    assert!(out.converged);
    assert_eq!(out.passes, 2);
    assert_eq!(out.epsilon, 1000);
    assert_eq!(out.change_positions, vec![571]);
    let p = &out.points_to_try[0];
    let step = std::f64::consts::FRAC_PI_2 / 1000.0;
    assert!((p.coords()[1].atan2(p.coords()[0]) - 1.25f64.atan()).abs() <= step);
    assert_eq!(out.cuts.len(), out.positions.len());
    assert_eq!(out.last_features.len(), out.positions.len());
    assert_eq!(out.last_features[0], Some(0));
    assert_eq!(*out.last_features.last().unwrap(), Some(1));
}

#[test]
fn bisection_converges_on_random_data() {
    let m = random_measures(11, 40, 2);
    let cfg = BisectCfg {
        cut_size: 8,
        ..BisectCfg::default()
    };
    let out = bisect(&m, cfg).unwrap();
    assert!(out.converged);
    assert!(out.passes <= cfg.max_passes);
    // a further zoom pass from the final state finds the same number of changes
    let again = bisect_from(
        &m,
        BisectCfg {
            max_passes: 2,
            ..cfg
        },
        out.state.clone(),
    )
    .unwrap();
    assert_eq!(again.epsilon, out.epsilon * cfg.zoom);
    assert_eq!(again.change_positions.len(), out.change_positions.len());
    for w in out.positions.windows(2) {
        assert!(w[0] < w[1]);
    }
    assert!(out.cuts.iter().all(|c| c.len() == 8));
}

#[test]
fn bisection_restarts_from_bare_state() {
    let m = crossing_pair();
    let cfg = BisectCfg {
        cut_size: 1,
        ..BisectCfg::default()
    };
    let sparse = BisectState::new(4, [0, 4].into_iter().collect()).unwrap();
    let out = bisect_from(&m, cfg, sparse).unwrap();
    assert!(out.converged);
    assert_eq!(out.change_positions.len(), 1);
    assert!(BisectState::new(4, [5].into_iter().collect()).is_err());
    assert!(BisectState::initial(0).is_err());
}

#[test]
fn bisection_reports_pass_cap() {
    let m = random_measures(3, 30, 2);
    let cfg = BisectCfg {
        cut_size: 5,
        max_passes: 1,
        ..BisectCfg::default()
    };
    let out = bisect(&m, cfg).unwrap();
    assert_eq!(out.passes, 1);
    assert!(!out.converged);
}

#[test]
fn bisection_rejects_wrong_dimensionality() {
    let m = random_measures(1, 10, 3);
    assert!(matches!(
        bisect(&m, BisectCfg::default()),
        Err(MelifError::InvalidConfiguration(_))
    ));
    let m2 = random_measures(1, 10, 2);
    assert!(bisect(&m2, BisectCfg::default()).is_err()); // cut size 50 > 10 features
}

#[test]
fn bisection_zoom_overflow_keeps_last_state() {
    let cfg = BisectCfg {
        cut_size: 1,
        zoom: u64::MAX / 2,
        start_epsilon: 4,
        ..BisectCfg::default()
    };
    let out = bisect(&crossing_pair(), cfg).unwrap();
    assert!(!out.converged);
    assert_eq!(out.passes, 1);
    assert_eq!(out.epsilon, 4);
    assert_eq!(out.change_positions, vec![3]);
    assert_eq!(out.state.epsilon(), 4);
}

#[test]
fn bisection_default_zoom_stops_at_the_i64_horizon() {
    // 10^18 still fits in i64, 10^19 does not
    let cfg = BisectCfg {
        cut_size: 1,
        start_epsilon: 10u64.pow(18),
        ..BisectCfg::default()
    };
    let state = BisectState::new(cfg.start_epsilon, [0, cfg.start_epsilon].into_iter().collect())
        .unwrap();
    let out = bisect_from(&crossing_pair(), cfg, state).unwrap();
    assert!(!out.converged);
    assert_eq!(out.passes, 1);
    assert_eq!(out.change_positions.len(), 1);
}

// --- mesh ------------------------------------------------------------------

/// Pure measures plus a generalist that only wins at the simplex centre.
fn three_way() -> EvaluatedMeasures {
    EvaluatedMeasures::from_rows(&[
        vec![1.0, 0.0, 0.0],
        vec![0.0, 1.0, 0.0],
        vec![0.0, 0.0, 1.0],
        vec![0.4, 0.4, 0.4],
    ])
    .unwrap()
}

#[test]
fn mesh_inserts_centroid_with_novel_cut() {
    let cache: MapCache<Point> = MapCache::new();
    let cfg = MeshCfg {
        cut_size: 1,
        ..MeshCfg::default()
    };
    let out = enrich_mesh(&three_way(), &cache, cfg).unwrap();
    assert!(out.converged);
    assert_eq!(out.passes, 2);
    assert_eq!(out.vertices, 4);
    assert_eq!(out.triangles, 3);
    assert_eq!(out.boundary_points.len(), 4);
    assert_eq!(out.sampled_points.len(), 7);
    assert!(out.boundary_points.iter().all(|p| p.dim() == 3));
}

#[test]
fn mesh_is_independent_of_cache_choice() {
    let m = random_measures(5, 30, 3);
    let cfg = MeshCfg {
        cut_size: 6,
        max_passes: 6,
        ..MeshCfg::default()
    };
    let cached = enrich_mesh(&m, &MapCache::<Point>::new(), cfg).unwrap();
    let plain = enrich_mesh(&m, &NopCache, cfg).unwrap();
    assert_eq!(cached.vertices, plain.vertices);
    assert_eq!(cached.boundary_points, plain.boundary_points);
    assert!(plain.sampled_points.is_empty());
    assert!(cached.sampled_points.len() >= cached.vertices);
}

#[test]
fn mesh_resumes_from_partial_triangulation() {
    let m = random_measures(9, 25, 3);
    let cfg = MeshCfg {
        cut_size: 5,
        max_passes: 8,
        ..MeshCfg::default()
    };
    let full = enrich_mesh(&m, &NopCache, cfg).unwrap();
    let first = enrich_mesh(
        &m,
        &NopCache,
        MeshCfg {
            max_passes: 1,
            ..cfg
        },
    )
    .unwrap();
    assert_eq!(first.passes, 1);
    let rest = enrich_mesh_from(
        &m,
        &NopCache,
        MeshCfg {
            max_passes: cfg.max_passes - 1,
            ..cfg
        },
        first.triangulation,
    )
    .unwrap();
    assert_eq!(rest.vertices, full.vertices);
    assert_eq!(rest.triangles, full.triangles);
}

#[test]
fn mesh_homogeneous_chart_and_vertex_cap() {
    let m = random_measures(2, 20, 3);
    let cfg = MeshCfg {
        cut_size: 4,
        max_vertices: 3,
        chart: MeshChart::Homogeneous,
        ..MeshCfg::default()
    };
    let out = enrich_mesh(&m, &NopCache, cfg).unwrap();
    assert_eq!(out.vertices, 3);
    assert!(!out.converged);
    let p = MeshChart::Homogeneous.to_point(nalgebra::Vector2::new(1.0, 1.0)).unwrap();
    assert!(p.coords().iter().all(|c| (c - 1.0 / 3.0).abs() < 1e-12));
    assert!(enrich_mesh(&random_measures(2, 20, 2), &NopCache, cfg).is_err());
}

// --- grid ------------------------------------------------------------------

#[test]
fn grid_without_cut_changes_keeps_only_row_heads() {
    let m = EvaluatedMeasures::from_rows(&[vec![1.0, 1.0, 1.0], vec![0.0, 0.0, 0.0]]).unwrap();
    let cfg = GridCfg {
        cut_size: 1,
        ..GridCfg::default()
    };
    let out = enrich_grid(&m, &MapCache::<SpacePoint>::new(), cfg).unwrap();
    assert!(out.converged);
    assert_eq!(out.passes_per_dim, vec![2, 1]);
    assert_eq!(out.sampled.len(), 4);
    // every corner but the origin follows an equal-cut predecessor on some axis
    assert_eq!(out.boundary, vec![SpacePoint::new(vec![0, 0], 1).unwrap()]);
    assert_eq!(out.points_to_try.len(), 1);
}

#[test]
fn grid_refines_towards_boundaries() {
    // pairs of features dominate each measure, so region changes swap both
    let m = EvaluatedMeasures::from_rows(&[
        vec![1.0, 0.0, 0.0],
        vec![0.9, 0.0, 0.0],
        vec![0.0, 1.0, 0.0],
        vec![0.0, 0.9, 0.0],
        vec![0.0, 0.0, 1.0],
        vec![0.0, 0.0, 0.9],
    ])
    .unwrap();
    let cfg = GridCfg {
        cut_size: 2,
        max_delta: 64,
        ..GridCfg::default()
    };
    let cache: MapCache<SpacePoint> = MapCache::new();
    let out = enrich_grid(&m, &cache, cfg).unwrap();
    assert!(out.converged);
    assert!(out.sampled.len() > 4);
    assert!(out.sampled.iter().all(|p| p.delta() <= 64));
    assert!(!out.boundary.is_empty());
    assert_eq!(out.points_to_try.len(), out.boundary.len());
    assert!(out
        .points_to_try
        .iter()
        .all(|p| p.dim() == 3 && p.coords().iter().all(|c| *c >= 0.0)));
    let keys: BTreeSet<SpacePoint> = cache.all_known_points().into_iter().collect();
    assert!(out.sampled.iter().all(|p| keys.contains(p)));
}

#[test]
fn grid_rejects_bad_configuration() {
    let m = random_measures(4, 10, 3);
    let bad = GridCfg {
        cut_size: 2,
        initial_epsilon: 0,
        ..GridCfg::default()
    };
    assert!(enrich_grid(&m, &NopCache, bad).is_err());
    let two = random_measures(4, 10, 2);
    assert!(enrich_grid(
        &two,
        &NopCache,
        GridCfg {
            cut_size: 2,
            ..GridCfg::default()
        }
    )
    .is_err());
}

#[test]
fn sphere_points_from_grid_corners() {
    let p = SpacePoint::new(vec![0, 1], 1).unwrap().to_sphere().unwrap();
    assert!(p == Point::normalize(&[1.0, 0.0, 0.0]).unwrap());
}
