//! Ensemble feature selection by measure linear forms (MeLiF).
//!
//! A weight point on the standard simplex combines per-feature relevance
//! measures into one ranking; its top-k features form the point's cut.
//! The crate covers:
//! - `point`/`cut`/`cache`: weight points, cuts and memoized cut evaluation.
//! - `enrich`: enumerate the cut-change boundary of the weight space
//!   (bisection for two measures, Delaunay mesh or integer grid for three).
//! - `sched`/`search`: a priority-scheduled worker pool and the MeLiF
//!   coordinate search that runs on it.
//!
//! API Policy
//! - Project-internal. `api` is the curated surface; module paths may move.

pub mod api;
pub mod cache;
pub mod context;
pub mod cut;
pub mod enrich;
pub mod error;
pub mod measure;
pub mod point;
pub mod sched;
pub mod search;

/// Library version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use error::{MelifError, Result};

/// Common exports for quick imports in callers.
pub mod prelude {
    pub use crate::cache::{CutCache, MapCache};
    pub use crate::context::SearchContext;
    pub use crate::cut::{Cut, EvaluatedMeasures};
    pub use crate::error::{MelifError, Result};
    pub use crate::point::{Point, SpacePoint};
    pub use crate::search::{scan_and_score, PriorityMelif, RunStats, SearchCfg, StopRule};
}
