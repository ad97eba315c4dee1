//! Tabular input: one row per sample, one numeric column per feature and a
//! class column. CSV and Parquet are read through polars.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{bail, Context, Result};
use polars::prelude::*;

pub struct Table {
    pub feature_names: Vec<String>,
    /// `features[f]` holds feature `f` across all samples.
    pub features: Vec<Vec<f64>>,
    pub classes: Vec<u32>,
    /// Original class labels; `classes` index into this.
    pub labels: Vec<String>,
}

pub fn load(path: &Path, class_column: &str) -> Result<Table> {
    let lf = match path.extension().and_then(|e| e.to_str()) {
        Some("parquet") => LazyFrame::scan_parquet(path, ScanArgsParquet::default())
            .with_context(|| format!("scanning {}", path.display()))?,
        _ => LazyCsvReader::new(path)
            .with_has_header(true)
            .with_infer_schema_length(Some(100))
            .finish()
            .with_context(|| format!("reading {}", path.display()))?,
    };
    let df = lf
        .collect()
        .with_context(|| format!("loading {}", path.display()))?;
    tracing::info!(rows = df.height(), cols = df.width(), "input_shape");
    from_frame(&df, class_column)
}

pub fn from_frame(df: &DataFrame, class_column: &str) -> Result<Table> {
    let mut feature_names = Vec::new();
    let mut features = Vec::new();
    let mut class_series = None;
    for s in df.get_columns() {
        let name = s.name().to_string();
        if name == class_column {
            class_series = Some(s);
            continue;
        }
        let cast = s
            .cast(&DataType::Float64)
            .with_context(|| format!("column '{name}' is not numeric"))?;
        let values = cast
            .f64()?
            .into_iter()
            .collect::<Option<Vec<f64>>>()
            .with_context(|| format!("column '{name}' has missing or non-numeric values"))?;
        feature_names.push(name);
        features.push(values);
    }
    let Some(class_series) = class_series else {
        bail!("class column '{class_column}' not found");
    };
    if features.is_empty() {
        bail!("no feature columns besides '{class_column}'");
    }
    let (classes, labels) = class_ids(class_series)?;
    if labels.len() != 2 {
        tracing::warn!(labels = labels.len(), "measures expect exactly two classes");
    }
    Ok(Table {
        feature_names,
        features,
        classes,
        labels,
    })
}

/// Map labels to ids in sorted label order.
fn class_ids(s: &Series) -> Result<(Vec<u32>, Vec<String>)> {
    let cast = s.cast(&DataType::String)?;
    let raw = cast
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect::<Option<Vec<String>>>()
        .context("class column has missing values")?;
    let mut ids: BTreeMap<&str, u32> = raw.iter().map(|l| (l.as_str(), 0)).collect();
    for (i, id) in ids.values_mut().enumerate() {
        *id = u32::try_from(i)?;
    }
    let classes = raw.iter().map(|l| ids[l.as_str()]).collect();
    let labels = ids.keys().map(|l| l.to_string()).collect();
    Ok((classes, labels))
}
