use crate::cut::{Cut, EvaluatedMeasures};
use crate::error::Result;
use crate::point::Point;

/// Scores a weight point on a dataset, typically by k-fold cross-validation of
/// a classifier trained on the point's cut. May be expensive; must be pure.
pub trait FoldsEvaluator<D>: Send + Sync {
    fn score(&self, dataset: &D, point: &Point) -> Result<f64>;
}

impl<D, F> FoldsEvaluator<D> for F
where
    F: Fn(&D, &Point) -> Result<f64> + Send + Sync,
{
    fn score(&self, dataset: &D, point: &Point) -> Result<f64> {
        self(dataset, point)
    }
}

/// Reduces a dataset to the features selected at a point.
pub trait DataSetFilter<D>: Send + Sync {
    type Output;

    fn filter(&self, dataset: &D, point: &Point, measures: &EvaluatedMeasures) -> Result<Self::Output>;
}

/// Datasets that can be restricted to a feature subset.
pub trait FeatureSubset: Sized {
    fn restrict(&self, features: &Cut) -> Self;
}

/// Keeps the top `size` features of the ensemble ranking.
#[derive(Clone, Copy, Debug)]
pub struct PreferredSizeFilter {
    pub size: usize,
}

impl<D: FeatureSubset> DataSetFilter<D> for PreferredSizeFilter {
    type Output = D;

    fn filter(&self, dataset: &D, point: &Point, measures: &EvaluatedMeasures) -> Result<D> {
        let cut = measures.compute_cut(point, self.size)?;
        Ok(dataset.restrict(&cut))
    }
}
