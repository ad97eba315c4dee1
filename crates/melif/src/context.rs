//! Everything a search run shares: dataset, evaluated measures, cut cache and
//! cut size. Passed explicitly; cloning is cheap (`Arc`s).

use std::sync::Arc;

use crate::cache::{CutCache, MapCache};
use crate::cut::{Cut, EvaluatedMeasures};
use crate::error::{MelifError, Result};
use crate::point::Point;

pub struct SearchContext<D> {
    dataset: Arc<D>,
    measures: Arc<EvaluatedMeasures>,
    cache: Arc<dyn CutCache<Point>>,
    cut_size: usize,
}

impl<D> Clone for SearchContext<D> {
    fn clone(&self) -> Self {
        Self {
            dataset: self.dataset.clone(),
            measures: self.measures.clone(),
            cache: self.cache.clone(),
            cut_size: self.cut_size,
        }
    }
}

impl<D> SearchContext<D> {
    pub fn new(
        dataset: Arc<D>,
        measures: Arc<EvaluatedMeasures>,
        cache: Arc<dyn CutCache<Point>>,
        cut_size: usize,
    ) -> Result<Self> {
        if cut_size > measures.feature_count() {
            return Err(MelifError::config(format!(
                "cut size {cut_size} exceeds feature count {}",
                measures.feature_count()
            )));
        }
        Ok(Self {
            dataset,
            measures,
            cache,
            cut_size,
        })
    }

    /// Context with a fresh in-memory cache.
    pub fn with_map_cache(dataset: D, measures: EvaluatedMeasures, cut_size: usize) -> Result<Self> {
        Self::new(
            Arc::new(dataset),
            Arc::new(measures),
            Arc::new(MapCache::<Point>::new()),
            cut_size,
        )
    }

    #[inline]
    pub fn dataset(&self) -> &D {
        &self.dataset
    }

    #[inline]
    pub fn measures(&self) -> &EvaluatedMeasures {
        &self.measures
    }

    #[inline]
    pub fn cache(&self) -> &dyn CutCache<Point> {
        self.cache.as_ref()
    }

    #[inline]
    pub fn cut_size(&self) -> usize {
        self.cut_size
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.measures.measure_count()
    }

    /// Cut at `point`, memoized through the shared cache.
    pub fn cut_at(&self, point: &Point) -> Result<Cut> {
        let measures = &self.measures;
        let k = self.cut_size;
        self.cache
            .get_or_compute(point, &|p: &Point| measures.compute_cut(p, k))
    }
}
