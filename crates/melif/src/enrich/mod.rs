//! Boundary enrichment: adaptively sample the weight space until the points
//! where the cut changes are located.
//!
//! Purpose
//! - `bisect`: 2 measures, one angle, zoomed integer grid.
//! - `mesh`: 3 measures, Delaunay refinement of the weight simplex
//!   (`delaunay` holds the triangulation).
//! - `grid`: 3 measures, exact rational midpoints along axis rows.
//!
//! Every variant is a pure function of its inputs (plus the cache it is handed)
//! and returns enough state to resume. Stopping rules compare counts between
//! passes; each variant also carries a pass cap and reports `converged`.

mod bisect;
mod delaunay;
mod grid;
mod mesh;

pub use bisect::{bisect, bisect_from, BisectCfg, BisectState, Bisection};
pub use delaunay::{Triangulation, DELAUNAY_EPS};
pub use grid::{enrich_grid, GridCfg, GridEnrichment};
pub use mesh::{enrich_mesh, enrich_mesh_from, MeshCfg, MeshChart, MeshEnrichment};

#[cfg(test)]
mod tests;
