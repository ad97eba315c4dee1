//! Priority scheduling for the coordinate-descent search.
//!
//! - `queue`: bounded, indexed max-heap with in-place priority boosts and a
//!   starvation window on `take`.
//! - `executor`: fixed worker pool over one queue; tasks return `Result` and
//!   panics are caught per task.

mod executor;
mod queue;

pub use executor::{Executor, SchedCfg, Spawner, TaskHandle};
pub use queue::{PriorityQueue, TaskId, DEFAULT_CAPACITY, DEFAULT_STARVATION_TIMEOUT};
