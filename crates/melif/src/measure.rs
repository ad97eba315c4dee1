//! Feature relevance measures and the explicit name → constructor registry.
//!
//! A measure scores one feature column against binary class labels. Raw
//! scores are min-max normalized per measure by `evaluate_measures` before
//! they reach the cut engine.

use std::collections::BTreeMap;

use tracing::debug;

use crate::cut::EvaluatedMeasures;
use crate::error::{MelifError, Result};

pub trait RelevanceMeasure: Send + Sync {
    fn name(&self) -> &'static str;

    /// Relevance of one feature; `values` and `classes` have equal length.
    fn evaluate(&self, values: &[f64], classes: &[u32]) -> f64;
}

fn mean(xs: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = xs.fold((0.0, 0usize), |(s, n), x| (s + x, n + 1));
    if n == 0 {
        f64::NAN
    } else {
        sum / n as f64
    }
}

/// Linear correlation between raw feature values and class labels.
///
/// Despite the name, values are not ranked first. A constant column scores 0.
#[derive(Clone, Copy, Debug, Default)]
pub struct SpearmanRankCorrelation;

impl RelevanceMeasure for SpearmanRankCorrelation {
    fn name(&self) -> &'static str {
        "spearman"
    }

    fn evaluate(&self, values: &[f64], classes: &[u32]) -> f64 {
        let x_mean = mean(values.iter().copied());
        let y_mean = mean(classes.iter().map(|&c| f64::from(c)));
        let (mut xy, mut xx, mut yy) = (0.0, 0.0, 0.0);
        for (&x, &c) in values.iter().zip(classes) {
            let (dx, dy) = (x - x_mean, f64::from(c) - y_mean);
            xy += dx * dy;
            xx += dx * dx;
            yy += dy * dy;
        }
        let denom = (xx * yy).sqrt();
        if denom > 0.0 {
            xy / denom
        } else {
            0.0
        }
    }
}

/// Share of samples whose nearer class (distance to the class mean over the
/// class variance) is their actual class. Labels are `0` and `1`.
#[derive(Clone, Copy, Debug, Default)]
pub struct FitCriterion;

impl FitCriterion {
    fn class_stats(values: &[f64], classes: &[u32], class: u32) -> (f64, f64) {
        let members = || {
            values
                .iter()
                .zip(classes)
                .filter(move |(_, &c)| c == class)
                .map(|(&v, _)| v)
        };
        let m = mean(members());
        let var = mean(members().map(|v| (v - m) * (v - m)));
        (m, var)
    }
}

impl RelevanceMeasure for FitCriterion {
    fn name(&self) -> &'static str {
        "fit-criterion"
    }

    fn evaluate(&self, values: &[f64], classes: &[u32]) -> f64 {
        if classes.is_empty() {
            return 0.0;
        }
        let (m0, v0) = Self::class_stats(values, classes, 0);
        let (m1, v1) = Self::class_stats(values, classes, 1);
        let hits = values
            .iter()
            .zip(classes)
            .filter(|(&v, &c)| {
                let predicted = if (v - m0).abs() / v0 < (v - m1).abs() / v1 {
                    0
                } else {
                    1
                };
                predicted == c
            })
            .count();
        hits as f64 / classes.len() as f64
    }
}

/// Value difference metric: half the L1 distance between the per-class
/// distributions of exact feature values. Labels are `0` and `1`; a missing
/// class scores 0.
#[derive(Clone, Copy, Debug, Default)]
pub struct ValueDifference;

impl RelevanceMeasure for ValueDifference {
    fn name(&self) -> &'static str {
        "vdm"
    }

    fn evaluate(&self, values: &[f64], classes: &[u32]) -> f64 {
        // value bits -> (count in class 0, count in class 1)
        let mut counts: BTreeMap<u64, (usize, usize)> = BTreeMap::new();
        let (mut n0, mut n1) = (0usize, 0usize);
        for (&v, &c) in values.iter().zip(classes) {
            let entry = counts.entry(v.to_bits()).or_default();
            match c {
                0 => {
                    entry.0 += 1;
                    n0 += 1;
                }
                1 => {
                    entry.1 += 1;
                    n1 += 1;
                }
                _ => {}
            }
        }
        if n0 == 0 || n1 == 0 {
            return 0.0;
        }
        let l1: f64 = counts
            .values()
            .map(|&(a, b)| (a as f64 / n0 as f64 - b as f64 / n1 as f64).abs())
            .sum();
        l1 / 2.0
    }
}

fn entropy<'a>(counts: impl Iterator<Item = &'a usize>, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    counts
        .filter(|&&n| n > 0)
        .map(|&n| {
            let p = n as f64 / total as f64;
            -p * p.log2()
        })
        .sum()
}

/// Symmetric uncertainty `2 (H(X) - H(X|Y)) / (H(X) + H(Y))` between exact
/// feature values `X` and class labels `Y`, in bits. Two zero entropies score 0.
#[derive(Clone, Copy, Debug, Default)]
pub struct SymmetricUncertainty;

impl RelevanceMeasure for SymmetricUncertainty {
    fn name(&self) -> &'static str {
        "su"
    }

    fn evaluate(&self, values: &[f64], classes: &[u32]) -> f64 {
        let n = values.len().min(classes.len());
        let mut prior: BTreeMap<u64, usize> = BTreeMap::new();
        let mut per_class: BTreeMap<u32, BTreeMap<u64, usize>> = BTreeMap::new();
        for (&v, &c) in values.iter().zip(classes) {
            *prior.entry(v.to_bits()).or_default() += 1;
            *per_class.entry(c).or_default().entry(v.to_bits()).or_default() += 1;
        }
        let class_sizes: Vec<usize> = per_class.values().map(|m| m.values().sum()).collect();
        let hx = entropy(prior.values(), n);
        let hy = entropy(class_sizes.iter(), n);
        let posterior: f64 = per_class
            .values()
            .zip(&class_sizes)
            .map(|(m, &size)| size as f64 / n as f64 * entropy(m.values(), size))
            .sum();
        if hx + hy > 0.0 {
            2.0 * (hx - posterior) / (hx + hy)
        } else {
            0.0
        }
    }
}

type Ctor = fn() -> Box<dyn RelevanceMeasure>;

/// Measure identifiers mapped to constructors.
#[derive(Clone)]
pub struct MeasureRegistry {
    ctors: BTreeMap<&'static str, Ctor>,
}

impl MeasureRegistry {
    pub fn empty() -> Self {
        Self {
            ctors: BTreeMap::new(),
        }
    }

    /// `spearman`, `fit-criterion`, `vdm` and `su`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register("spearman", || {
            Box::new(SpearmanRankCorrelation) as Box<dyn RelevanceMeasure>
        });
        registry.register("fit-criterion", || {
            Box::new(FitCriterion) as Box<dyn RelevanceMeasure>
        });
        registry.register("vdm", || {
            Box::new(ValueDifference) as Box<dyn RelevanceMeasure>
        });
        registry.register("su", || {
            Box::new(SymmetricUncertainty) as Box<dyn RelevanceMeasure>
        });
        registry
    }

    pub fn register(&mut self, name: &'static str, ctor: Ctor) {
        self.ctors.insert(name, ctor);
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.ctors.keys().copied().collect()
    }

    pub fn create(&self, name: &str) -> Result<Box<dyn RelevanceMeasure>> {
        self.ctors.get(name).map(|ctor| ctor()).ok_or_else(|| {
            MelifError::config(format!(
                "unknown measure '{name}' (known: {})",
                self.names().join(", ")
            ))
        })
    }

    /// Comma-separated identifiers, in order.
    pub fn create_all(&self, list: &str) -> Result<Vec<Box<dyn RelevanceMeasure>>> {
        list.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|name| self.create(name))
            .collect()
    }
}

impl Default for MeasureRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

/// Score every feature with every measure and normalize per measure.
///
/// `features[f]` holds the values of feature `f` across all samples.
pub fn evaluate_measures(
    features: &[Vec<f64>],
    classes: &[u32],
    measures: &[Box<dyn RelevanceMeasure>],
) -> Result<EvaluatedMeasures> {
    if measures.is_empty() {
        return Err(MelifError::config("at least one measure is required"));
    }
    if let Some(bad) = features.iter().position(|f| f.len() != classes.len()) {
        return Err(MelifError::config(format!(
            "feature {bad} has {} values but there are {} class labels",
            features[bad].len(),
            classes.len()
        )));
    }
    let columns: Vec<Vec<f64>> = measures
        .iter()
        .map(|m| {
            debug!(measure = m.name(), features = features.len(), "evaluating measure");
            features.iter().map(|f| m.evaluate(f, classes)).collect()
        })
        .collect();
    EvaluatedMeasures::from_raw_columns(&columns)
}
