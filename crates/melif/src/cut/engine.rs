use std::cmp::Ordering;

use nalgebra::{DMatrix, DVector};

use super::Cut;
use crate::error::{MelifError, Result};
use crate::point::Point;

/// Pre-normalized `[features × measures]` relevance matrix.
#[derive(Clone, Debug)]
pub struct EvaluatedMeasures {
    matrix: DMatrix<f64>,
}

impl EvaluatedMeasures {
    /// Wrap an already normalized matrix (rows: features, columns: measures).
    pub fn new(matrix: DMatrix<f64>) -> Result<Self> {
        if matrix.ncols() == 0 {
            return Err(MelifError::config("at least one measure is required"));
        }
        if matrix.iter().any(|v| !v.is_finite()) {
            return Err(MelifError::config("measure matrix contains non-finite values"));
        }
        Ok(Self { matrix })
    }

    /// One row per feature, one entry per measure.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let measures = rows.first().map_or(0, Vec::len);
        if let Some(bad) = rows.iter().position(|r| r.len() != measures) {
            return Err(MelifError::config(format!(
                "feature {bad} has {} measure values, expected {measures}",
                rows[bad].len()
            )));
        }
        let matrix = DMatrix::from_fn(rows.len(), measures, |i, j| rows[i][j]);
        Self::new(matrix)
    }

    /// Raw per-measure scores (one column per measure), min-max normalized into `[0, 1]`.
    ///
    /// A constant column normalizes to zeros.
    pub fn from_raw_columns(columns: &[Vec<f64>]) -> Result<Self> {
        let features = columns.first().map_or(0, Vec::len);
        if let Some(bad) = columns.iter().position(|c| c.len() != features) {
            return Err(MelifError::config(format!(
                "measure {bad} scored {} features, expected {features}",
                columns[bad].len()
            )));
        }
        let mut matrix = DMatrix::zeros(features, columns.len());
        for (j, col) in columns.iter().enumerate() {
            let min = col.iter().copied().fold(f64::INFINITY, f64::min);
            let max = col.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let span = max - min;
            for (i, v) in col.iter().enumerate() {
                matrix[(i, j)] = if span > 0.0 { (v - min) / span } else { 0.0 };
            }
        }
        Self::new(matrix)
    }

    #[inline]
    pub fn feature_count(&self) -> usize {
        self.matrix.nrows()
    }

    #[inline]
    pub fn measure_count(&self) -> usize {
        self.matrix.ncols()
    }

    #[inline]
    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }

    /// Ensemble score per feature: `Σ_j w_j · m[f][j]`.
    pub fn evaluate_point(&self, point: &Point) -> Result<DVector<f64>> {
        if point.dim() != self.measure_count() {
            return Err(MelifError::config(format!(
                "point has {} weights but there are {} measures",
                point.dim(),
                self.measure_count()
            )));
        }
        Ok(&self.matrix * point.as_vector())
    }

    /// Top-`k` feature indices, best first; ties go to the lower index.
    pub fn ranked(&self, point: &Point, k: usize) -> Result<Vec<usize>> {
        if k > self.feature_count() {
            return Err(MelifError::config(format!(
                "cut size {k} exceeds feature count {}",
                self.feature_count()
            )));
        }
        let scores = self.evaluate_point(point)?;
        let by_score = |a: &usize, b: &usize| -> Ordering {
            scores[*b].total_cmp(&scores[*a]).then(a.cmp(b))
        };
        let mut order: Vec<usize> = (0..self.feature_count()).collect();
        if k == 0 {
            return Ok(Vec::new());
        }
        if k < order.len() {
            order.select_nth_unstable_by(k - 1, by_score);
            order.truncate(k);
        }
        order.sort_by(by_score);
        Ok(order)
    }

    pub fn compute_cut(&self, point: &Point, k: usize) -> Result<Cut> {
        Ok(Cut::from_indices(self.ranked(point, k)?))
    }

    /// Cut plus the `k`-th ranked feature (the one sitting on the cutting line).
    pub fn compute_cut_with_last(&self, point: &Point, k: usize) -> Result<(Cut, Option<usize>)> {
        let ranked = self.ranked(point, k)?;
        let last = ranked.last().copied();
        Ok((Cut::from_indices(ranked), last))
    }
}
