//! Longevity CLI
//!
//! Estimates remaining (healthy) life for every gender and income decile
//! and reports inequality across deciles.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::info;

use longevity::assumptions::{CoefficientSet, MortalityModel};
use longevity::config::EstimatorConfig;
use longevity::data::{load_observations, load_panel};
use longevity::scenario::SubgroupRunner;

#[derive(Parser, Debug)]
#[command(name = "longevity")]
#[command(about = "Healthy and total life expectancy by gender and income decile")]
struct Args {
    /// Person-level observation CSV (disability and income by age)
    #[arg(long)]
    observations: PathBuf,

    /// Person-year panel CSV used to fit the mortality model
    #[arg(long, conflicts_with = "coefficients")]
    panel: Option<PathBuf>,

    /// JSON coefficient set `{age, income_decile, gender_flag}` used instead of a fit
    #[arg(long)]
    coefficients: Option<PathBuf>,

    /// Estimator configuration JSON (defaults apply otherwise)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Count only years free of disability
    #[arg(long)]
    healthy: bool,

    /// Per-age output CSV
    #[arg(short, long, default_value = "longevity_output.csv")]
    output: PathBuf,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => EstimatorConfig::from_json_path(path)
            .with_context(|| format!("reading config {}", path.display()))?,
        None => EstimatorConfig::default(),
    };

    let observations = load_observations(&args.observations)
        .with_context(|| format!("loading observations {}", args.observations.display()))?;
    info!("loaded {} observations", observations.len());

    let mortality = match (&args.coefficients, &args.panel) {
        (Some(path), _) => MortalityModel::provided(
            CoefficientSet::from_json_path(path)
                .with_context(|| format!("reading coefficients {}", path.display()))?,
        ),
        (None, Some(path)) => {
            let panel = load_panel(path).with_context(|| format!("loading panel {}", path.display()))?;
            info!("loaded {} panel rows", panel.len());
            MortalityModel::fitted(Arc::new(panel), config.fit.clone())
        }
        (None, None) => bail!("either --panel or --coefficients is required"),
    };

    let runner = SubgroupRunner::new(observations, mortality, config);
    let estimates = runner.run_all(args.healthy).context("estimating subgroups")?;
    let summary = SubgroupRunner::summarize(&estimates)?;

    let label = if args.healthy { "healthy life" } else { "life" };
    println!("Remaining {} at first modeled age", label);
    println!("{:>8} {:>7} {:>10} {:>10}", "Gender", "Decile", "Mean", "Std");
    println!("{}", "-".repeat(38));
    for est in &estimates {
        if let Some(row) = est.rows().first() {
            println!(
                "{:>8} {:>7} {:>10.3} {:>10.3}",
                est.gender.as_str(),
                est.income_decile,
                row.mean,
                row.std
            );
        }
    }

    println!("\nInequality across deciles:");
    for s in &summary {
        println!(
            "  {:<6} age {}: gini={:.6} theil={:.6}",
            s.gender.as_str(),
            s.start_age,
            s.gini,
            s.theil
        );
    }

    let mut writer = csv::Writer::from_path(&args.output)
        .with_context(|| format!("creating {}", args.output.display()))?;
    for est in &estimates {
        for row in est.rows() {
            writer.serialize(row)?;
        }
    }
    writer.flush()?;
    println!("\nFull results written to: {}", args.output.display());

    Ok(())
}
