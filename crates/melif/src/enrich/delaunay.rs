//! Incremental Delaunay triangulation (Bowyer–Watson) inside a fixed seed triangle.
//!
//! The seed triangle is the domain: every inserted point must lie strictly
//! inside it, so the triangulation never needs auxiliary super vertices and
//! every cell is made of real vertices.

use std::collections::{BTreeMap, BTreeSet};

use nalgebra::Vector2;

use crate::error::{MelifError, Result};

/// Relative tolerance for orientation and in-circle predicates.
pub const DELAUNAY_EPS: f64 = 1e-12;

#[derive(Clone, Copy, Debug)]
struct Cell {
    v: [usize; 3],
    center: Vector2<f64>,
    r2: f64,
}

#[inline]
fn orient(a: Vector2<f64>, b: Vector2<f64>, c: Vector2<f64>) -> f64 {
    (b - a).perp(&(c - a))
}

fn circumcircle(a: Vector2<f64>, b: Vector2<f64>, c: Vector2<f64>) -> Option<(Vector2<f64>, f64)> {
    let (ba, ca) = (b - a, c - a);
    let (b2, c2) = (ba.norm_squared(), ca.norm_squared());
    let d = 2.0 * ba.perp(&ca);
    if d.abs() <= 2.0 * DELAUNAY_EPS * (b2 * c2).sqrt() {
        return None;
    }
    let u = Vector2::new(ca.y * b2 - ba.y * c2, ba.x * c2 - ca.x * b2) / d;
    Some((a + u, u.norm_squared()))
}

#[derive(Clone, Debug)]
pub struct Triangulation {
    vertices: Vec<Vector2<f64>>,
    cells: Vec<Cell>,
}

impl Triangulation {
    /// Triangulation consisting of the single seed triangle `(a, b, c)`.
    pub fn new(a: Vector2<f64>, b: Vector2<f64>, c: Vector2<f64>) -> Result<Self> {
        let (center, r2) = circumcircle(a, b, c)
            .ok_or_else(|| MelifError::point("seed triangle is degenerate"))?;
        Ok(Self {
            vertices: vec![a, b, c],
            cells: vec![Cell {
                v: [0, 1, 2],
                center,
                r2,
            }],
        })
    }

    #[inline]
    pub fn vertices(&self) -> &[Vector2<f64>] {
        &self.vertices
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.cells.len()
    }

    /// Vertex indices of every triangle.
    pub fn triangles(&self) -> impl Iterator<Item = [usize; 3]> + '_ {
        self.cells.iter().map(|c| c.v)
    }

    pub fn corners(&self, tri: [usize; 3]) -> [Vector2<f64>; 3] {
        tri.map(|i| self.vertices[i])
    }

    /// Area-weighted containment test against the seed triangle.
    fn strictly_inside_seed(&self, p: Vector2<f64>) -> bool {
        let [a, b, c] = [self.vertices[0], self.vertices[1], self.vertices[2]];
        let area = orient(a, b, c);
        let tol = DELAUNAY_EPS * area.abs();
        [orient(a, b, p), orient(b, c, p), orient(c, a, p)]
            .iter()
            .all(|s| s * area.signum() > tol)
    }

    /// Insert `p`; `None` if it coincides with a vertex or would create a
    /// degenerate cell (the triangulation is left untouched).
    pub fn insert(&mut self, p: Vector2<f64>) -> Result<Option<usize>> {
        if !p.iter().all(|v| v.is_finite()) || !self.strictly_inside_seed(p) {
            return Err(MelifError::point(format!(
                "({}, {}) is not strictly inside the seed triangle",
                p.x, p.y
            )));
        }
        let bad: Vec<usize> = (0..self.cells.len())
            .filter(|&i| {
                let cell = &self.cells[i];
                (p - cell.center).norm_squared() < cell.r2 * (1.0 - DELAUNAY_EPS)
            })
            .collect();
        if bad.is_empty() {
            return Ok(None);
        }
        let scale = self.cells[bad[0]].r2.sqrt().max(f64::MIN_POSITIVE);
        let duplicate = bad
            .iter()
            .flat_map(|&i| self.cells[i].v)
            .any(|v| (self.vertices[v] - p).norm() <= DELAUNAY_EPS * scale);
        if duplicate {
            return Ok(None);
        }

        // Cavity boundary: edges owned by exactly one bad cell, orientation kept.
        let mut edges: BTreeMap<(usize, usize), ((usize, usize), usize)> = BTreeMap::new();
        for &i in &bad {
            let [a, b, c] = self.cells[i].v;
            for (u, w) in [(a, b), (b, c), (c, a)] {
                edges
                    .entry((u.min(w), u.max(w)))
                    .or_insert(((u, w), 0))
                    .1 += 1;
            }
        }
        let id = self.vertices.len();
        let mut fresh = Vec::with_capacity(edges.len());
        for ((u, w), count) in edges.into_values() {
            if count != 1 {
                continue;
            }
            let Some((center, r2)) = circumcircle(self.vertices[u], self.vertices[w], p) else {
                return Ok(None);
            };
            fresh.push(Cell {
                v: [u, w, id],
                center,
                r2,
            });
        }

        let doomed: BTreeSet<usize> = bad.into_iter().collect();
        let mut index = 0;
        self.cells.retain(|_| {
            let keep = !doomed.contains(&index);
            index += 1;
            keep
        });
        self.cells.extend(fresh);
        self.vertices.push(p);
        Ok(Some(id))
    }

    /// Edge-adjacent vertices per vertex.
    pub fn adjacency(&self) -> Vec<BTreeSet<usize>> {
        let mut adj = vec![BTreeSet::new(); self.vertices.len()];
        for cell in &self.cells {
            let [a, b, c] = cell.v;
            for (u, w) in [(a, b), (b, c), (c, a)] {
                adj[u].insert(w);
                adj[w].insert(u);
            }
        }
        adj
    }
}
