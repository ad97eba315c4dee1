//! Triangulation-driven boundary enrichment for 3-measure ensembles.
//!
//! Each pass visits the triangles present at its start. A triangle whose
//! centroid cut differs from all three vertex cuts receives the centroid as a
//! new vertex. The loop ends after a pass without insertions.

use nalgebra::Vector2;
use tracing::{debug, warn};

use super::delaunay::Triangulation;
use crate::cache::CutCache;
use crate::cut::{Cut, EvaluatedMeasures};
use crate::error::{MelifError, Result};
use crate::point::Point;

/// How a 2-D mesh vertex maps to a weight point.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MeshChart {
    /// `(w0, w1)` with `w2 = 1 - w0 - w1`; seeded with the whole simplex.
    Simplex,
    /// `(x, y)` read as the projective point `(x, y, 1)`; seeded with
    /// `(0, 1), (1, 0), (1, 1)`.
    Homogeneous,
}

impl MeshChart {
    pub fn to_point(self, v: Vector2<f64>) -> Result<Point> {
        match self {
            MeshChart::Simplex => {
                Point::normalize(&[v.x.max(0.0), v.y.max(0.0), (1.0 - v.x - v.y).max(0.0)])
            }
            MeshChart::Homogeneous => Point::normalize(&[v.x, v.y, 1.0]),
        }
    }

    pub fn seed(self) -> Result<Triangulation> {
        let v = Vector2::new;
        match self {
            MeshChart::Simplex => Triangulation::new(v(0.0, 0.0), v(1.0, 0.0), v(0.0, 1.0)),
            MeshChart::Homogeneous => Triangulation::new(v(0.0, 1.0), v(1.0, 0.0), v(1.0, 1.0)),
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct MeshCfg {
    pub cut_size: usize,
    pub max_passes: usize,
    pub max_vertices: usize,
    pub chart: MeshChart,
}

impl Default for MeshCfg {
    fn default() -> Self {
        Self {
            cut_size: 50,
            max_passes: 64,
            max_vertices: 100_000,
            chart: MeshChart::Simplex,
        }
    }
}

#[derive(Clone, Debug)]
pub struct MeshEnrichment {
    /// Vertices with at least one edge-adjacent vertex of a different cut.
    pub boundary_points: Vec<Point>,
    /// Cache key set after the run; empty with a non-recording cache.
    pub sampled_points: Vec<Point>,
    pub triangles: usize,
    pub vertices: usize,
    pub passes: usize,
    pub converged: bool,
    /// Final mesh; feed it back to `enrich_mesh_from` to continue.
    pub triangulation: Triangulation,
}

pub fn enrich_mesh(
    measures: &EvaluatedMeasures,
    cache: &dyn CutCache<Point>,
    cfg: MeshCfg,
) -> Result<MeshEnrichment> {
    enrich_mesh_from(measures, cache, cfg, cfg.chart.seed()?)
}

pub fn enrich_mesh_from(
    measures: &EvaluatedMeasures,
    cache: &dyn CutCache<Point>,
    cfg: MeshCfg,
    mut tri: Triangulation,
) -> Result<MeshEnrichment> {
    if measures.measure_count() != 3 {
        return Err(MelifError::config(format!(
            "mesh enrichment needs exactly 3 measures, got {}",
            measures.measure_count()
        )));
    }
    let compute = |p: &Point| measures.compute_cut(p, cfg.cut_size);
    let cut_at = |v: Vector2<f64>| -> Result<Cut> {
        let point = cfg.chart.to_point(v)?;
        cache.get_or_compute(&point, &compute)
    };

    let mut passes = 0;
    let converged = loop {
        let snapshot: Vec<[usize; 3]> = tri.triangles().collect();
        let mut inserted = 0usize;
        let mut capped = false;
        for cell in snapshot {
            if tri.vertex_count() >= cfg.max_vertices {
                capped = true;
                break;
            }
            let [a, b, c] = tri.corners(cell);
            let corner_cuts = [cut_at(a)?, cut_at(b)?, cut_at(c)?];
            let centroid = (a + b + c) / 3.0;
            let centre_cut = cut_at(centroid)?;
            if corner_cuts.iter().all(|k| *k != centre_cut) && tri.insert(centroid)?.is_some() {
                inserted += 1;
            }
        }
        passes += 1;
        debug!(
            pass = passes,
            inserted,
            vertices = tri.vertex_count(),
            triangles = tri.triangle_count(),
            "mesh pass"
        );
        if inserted == 0 && !capped {
            break true;
        }
        if capped || passes >= cfg.max_passes {
            warn!(
                passes,
                vertices = tri.vertex_count(),
                "mesh enrichment stopped before a quiet pass"
            );
            break false;
        }
    };

    let cuts = tri
        .vertices()
        .iter()
        .map(|&v| cut_at(v))
        .collect::<Result<Vec<_>>>()?;
    let boundary_points = tri
        .adjacency()
        .iter()
        .enumerate()
        .filter(|(i, near)| near.iter().any(|&j| cuts[j] != cuts[*i]))
        .map(|(i, _)| cfg.chart.to_point(tri.vertices()[i]))
        .collect::<Result<Vec<_>>>()?;

    Ok(MeshEnrichment {
        boundary_points,
        sampled_points: cache.all_known_points(),
        triangles: tri.triangle_count(),
        vertices: tri.vertex_count(),
        passes,
        converged,
        triangulation: tri,
    })
}
