use std::cmp::Ordering;
use std::time::{Duration, SystemTime};

use serde::Serialize;

use crate::cut::Cut;
use crate::error::MelifError;
use crate::point::Point;

/// One scored weight point and the features it selects.
#[derive(Clone, Debug, Serialize)]
pub struct SelectionResult {
    pub point: Point,
    pub selected: Cut,
    pub score: f64,
}

impl SelectionResult {
    #[inline]
    pub fn better_than(&self, other: &SelectionResult) -> bool {
        self.score > other.score
    }
}

impl PartialEq for SelectionResult {
    fn eq(&self, other: &Self) -> bool {
        self.score == other.score
    }
}

impl PartialOrd for SelectionResult {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.score.partial_cmp(&other.score)
    }
}

#[derive(Clone, Debug)]
pub struct TaskFailure {
    pub point: Point,
    pub error: MelifError,
}

/// Outcome of one search run.
///
/// Invariants:
/// - `best` only ever moves to a strictly higher score.
#[derive(Clone, Debug)]
pub struct RunStats {
    pub algorithm: String,
    pub started_at: SystemTime,
    pub work_time: Duration,
    pub best: Option<SelectionResult>,
    pub visited_points: usize,
    /// Evaluations since the last improvement of `best`.
    pub no_improve: usize,
    /// Points skipped because they were already evaluated.
    pub skipped: usize,
    /// Follow-up submissions refused by the scheduler.
    pub rejected: usize,
    pub failures: Vec<TaskFailure>,
}

impl RunStats {
    pub fn new(algorithm: impl Into<String>) -> Self {
        Self {
            algorithm: algorithm.into(),
            started_at: SystemTime::now(),
            work_time: Duration::ZERO,
            best: None,
            visited_points: 0,
            no_improve: 0,
            skipped: 0,
            rejected: 0,
            failures: Vec::new(),
        }
    }

    /// Record one evaluation; `true` if it became the new best.
    pub fn update_best_result(&mut self, result: SelectionResult) -> bool {
        self.visited_points += 1;
        self.no_improve += 1;
        let improved = self.best.as_ref().map_or(true, |b| result.better_than(b));
        if improved {
            self.best = Some(result);
            self.no_improve = 0;
        }
        improved
    }

    pub fn best_score(&self) -> Option<f64> {
        self.best.as_ref().map(|b| b.score)
    }
}
