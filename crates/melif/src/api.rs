//! Curated internal API (UNSTABLE).
//!
//! Important
//! - Not a public API. A convenience surface for the CLI, benches and
//!   experiments; breaking changes are allowed.

// Weight space
pub use crate::point::{
    angle_at, midpoint, spherical_to_cartesian, Coord, Point, SpacePoint, POINT_EPS,
};
// Cuts and caching
pub use crate::cache::{CutCache, MapCache, NopCache};
pub use crate::cut::{diff as cut_diff, Cut, EvaluatedMeasures};
// Relevance measures
pub use crate::measure::{evaluate_measures, MeasureRegistry, RelevanceMeasure};
// Boundary enumeration
pub use crate::enrich::{
    bisect, bisect_from, enrich_grid, enrich_mesh, enrich_mesh_from, BisectCfg, BisectState,
    Bisection, GridCfg, GridEnrichment, MeshCfg, MeshChart, MeshEnrichment, Triangulation,
};
// Scheduling and search
pub use crate::context::SearchContext;
pub use crate::sched::{Executor, SchedCfg, Spawner, TaskHandle};
pub use crate::search::{
    default_seeds, scan_and_score, scan_points, BoostPolicy, DataSetFilter, FoldsEvaluator,
    PreferredSizeFilter, PriorityMelif, RunStats, SearchCfg, SelectionResult, StopRule,
};
pub use crate::error::{MelifError, Result};
