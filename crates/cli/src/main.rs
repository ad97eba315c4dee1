use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use melif::api::{
    bisect, enrich_grid, enrich_mesh, evaluate_measures, BisectCfg, EvaluatedMeasures, GridCfg,
    MapCache, MeasureRegistry, MeshCfg, Point, SpacePoint,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_subscriber::fmt::SubscriberBuilder;

mod dataset;
mod provenance;

#[derive(Parser)]
#[command(name = "melif-cli")]
#[command(about = "Measure-ensemble feature selection: boundary scans")]
struct Cmd {
    /// Log at DEBUG (per-pass progress)
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    action: Action,
}

#[derive(Subcommand)]
enum Action {
    /// Enumerate the cut-change boundary and write it as JSON
    Scan(ScanArgs),
    /// Print a small provenance JSON block
    Report,
}

#[derive(Args, Debug, Clone)]
struct ScanArgs {
    /// CSV or Parquet table, one row per sample
    #[arg(long)]
    input: PathBuf,
    #[arg(long, default_value = "class")]
    class_column: String,
    /// Comma-separated measure identifiers (2 or 3)
    #[arg(long, default_value = "spearman,fit-criterion")]
    measures: String,
    #[arg(long, default_value_t = 50)]
    cut_size: usize,
    /// Use the exact axis-line grid instead of the mesh (3 measures)
    #[arg(long)]
    grid: bool,
    #[arg(long)]
    out: PathBuf,
}

#[derive(Debug, Serialize)]
struct ScanReport {
    algorithm: &'static str,
    measures: Vec<&'static str>,
    features: usize,
    cut_size: usize,
    passes: usize,
    converged: bool,
    sampled: usize,
    boundary_points: Vec<Point>,
}

fn main() -> Result<()> {
    let cmd = Cmd::parse();
    let level = if cmd.verbose { Level::DEBUG } else { Level::INFO };
    SubscriberBuilder::default()
        .with_target(false)
        .with_max_level(level)
        .init();
    match cmd.action {
        Action::Scan(args) => scan(&args).map(|_| ()),
        Action::Report => report(),
    }
}

fn scan(args: &ScanArgs) -> Result<ScanReport> {
    tracing::info!(
        input = %args.input.display(),
        measures = %args.measures,
        cut_size = args.cut_size,
        "scan"
    );
    let table = dataset::load(&args.input, &args.class_column)?;
    let registry = MeasureRegistry::default();
    let measures = registry.create_all(&args.measures)?;
    let names: Vec<&'static str> = measures.iter().map(|m| m.name()).collect();
    let evaluated = evaluate_measures(&table.features, &table.classes, &measures)?;
    let mut report = boundary_scan(&evaluated, args.cut_size, args.grid)?;
    report.measures = names;
    tracing::info!(
        algorithm = report.algorithm,
        boundary = report.boundary_points.len(),
        sampled = report.sampled,
        converged = report.converged,
        "scan_done"
    );

    write_json(&args.out, &report)?;
    provenance::write_sidecar(
        &args.out,
        serde_json::json!({
            "input": args.input.to_string_lossy(),
            "class_column": args.class_column,
            "measures": report.measures,
            "cut_size": args.cut_size,
            "algorithm": report.algorithm,
            "features": table.feature_names.len(),
            "samples": table.classes.len(),
        }),
    )?;
    Ok(report)
}

fn boundary_scan(measures: &EvaluatedMeasures, cut_size: usize, grid: bool) -> Result<ScanReport> {
    let features = measures.feature_count();
    let report = match (measures.measure_count(), grid) {
        (2, false) => {
            let b = bisect(
                measures,
                BisectCfg {
                    cut_size,
                    ..BisectCfg::default()
                },
            )?;
            ScanReport {
                algorithm: "bisect",
                measures: Vec::new(),
                features,
                cut_size,
                passes: b.passes,
                converged: b.converged,
                sampled: b.positions.len(),
                boundary_points: b.points_to_try,
            }
        }
        (3, false) => {
            let cache = MapCache::<Point>::new();
            let m = enrich_mesh(
                measures,
                &cache,
                MeshCfg {
                    cut_size,
                    ..MeshCfg::default()
                },
            )?;
            ScanReport {
                algorithm: "mesh",
                measures: Vec::new(),
                features,
                cut_size,
                passes: m.passes,
                converged: m.converged,
                sampled: m.sampled_points.len(),
                boundary_points: m.boundary_points,
            }
        }
        (3, true) => {
            let cache = MapCache::<SpacePoint>::new();
            let g = enrich_grid(
                measures,
                &cache,
                GridCfg {
                    cut_size,
                    ..GridCfg::default()
                },
            )?;
            ScanReport {
                algorithm: "grid",
                measures: Vec::new(),
                features,
                cut_size,
                passes: g.passes_per_dim.iter().sum(),
                converged: g.converged,
                sampled: g.sampled.len(),
                boundary_points: g.points_to_try,
            }
        }
        (n, true) => bail!("--grid needs 3 measures, got {n}"),
        (n, false) => bail!("scan supports 2 or 3 measures, got {n}"),
    };
    Ok(report)
}

fn write_json<T: Serialize>(out: &Path, value: &T) -> Result<()> {
    if let Some(parent) = out.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating output dir {}", parent.display()))?;
        }
    }
    std::fs::write(out, serde_json::to_vec_pretty(value)?)
        .with_context(|| format!("writing {}", out.display()))?;
    Ok(())
}

fn report() -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&provenance::report())?);
    Ok(())
}
