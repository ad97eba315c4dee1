//! Cut engine: ensemble scores at a weight point and the top-K feature set.
//!
//! - `EvaluatedMeasures`: `[features × measures]` matrix, normalized per measure.
//! - `Cut`: word-packed bit-set of feature indices; `diff_into` reuses a
//!   scratch set so refinement loops stay allocation-light.

mod bits;
mod engine;

pub use bits::Cut;
pub use engine::EvaluatedMeasures;

/// `a \ b` into `scratch`; returns the number of features that left the cut.
#[inline]
pub fn diff(a: &Cut, b: &Cut, scratch: &mut Cut) -> usize {
    a.diff_into(b, scratch).len()
}
