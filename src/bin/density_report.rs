use std::path::PathBuf;

use anyhow::{Context, Result};
use arrow::util::pretty::pretty_format_batches;
use clap::Parser;
use quad_density::data::export::{export_csv, export_json, export_parquet, summary_batch};
use quad_density::data::loader::{load_measurements, load_quad};
use quad_density::data::sampler::SamplerKind;
use quad_density::solver::{DensityReport, SolverConfig, load_config, solve};

/// Attribute a measured L* ramp to the ink channels of a `.quad` file.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Measured ramp (`.txt`/`.tsv`, `.csv` or `.json`).
    measurements: PathBuf,

    /// QuadToneRIP curve file.
    quad: PathBuf,

    /// JSON solver config; fields not given keep their defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the full report as JSON.
    #[arg(long)]
    json: Option<PathBuf>,

    /// Write the per-step attribution table as CSV.
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Write the per-step attribution table as Parquet.
    #[arg(long)]
    parquet: Option<PathBuf>,

    /// Override the config's draw sampler.
    #[arg(long, value_enum)]
    sampler: Option<SamplerKind>,
}

fn print_report(report: &DensityReport) -> Result<()> {
    println!(
        "{} steps, total density {:.3}, active channels: {}",
        report.len(),
        report.total_density,
        report.active_channels.join(", ")
    );
    println!("{}", pretty_format_batches(&[summary_batch(report)?]).context("formatting summary")?);

    for snap in &report.snapshots {
        let shares: Vec<String> = snap
            .shares
            .iter()
            .map(|(name, share)| format!("{name} {:.1}%", share * 100.0))
            .collect();
        println!(
            "{:<9} input {:>5.1}%  ΔL {:>6.3}  {}",
            snap.region,
            snap.input,
            snap.delta,
            shares.join("  ")
        );
    }

    if let Some(absorber) = &report.absorber {
        println!("unclaimed density absorbed by {absorber}");
    }
    if !report.fallback_steps.is_empty() {
        println!("fallback attribution at steps {:?}", report.fallback_steps);
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => SolverConfig::default(),
    };
    if let Some(sampler) = args.sampler {
        config.sampler = sampler;
    }

    let measurements = load_measurements(&args.measurements)?;
    let quad = load_quad(&args.quad)?;
    let report = solve(&measurements.samples, &quad.channels, &config);

    print_report(&report)?;

    if let Some(path) = &args.json {
        export_json(&report, path).with_context(|| format!("writing {}", path.display()))?;
    }
    if let Some(path) = &args.csv {
        export_csv(&report, path).with_context(|| format!("writing {}", path.display()))?;
    }
    if let Some(path) = &args.parquet {
        export_parquet(&report, path).with_context(|| format!("writing {}", path.display()))?;
    }
    Ok(())
}
