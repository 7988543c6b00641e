use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use mdbench::plot::{atoms_label, render_chart, PlotSeries};
use mdbench::{logging, AlignmentPolicy, PlotConfig, TrialSet};

/// Plot averaged throughput against parallelism for several input sizes
#[derive(Parser, Debug)]
#[command(name = "mdbench-plot")]
#[command(about = "Aggregate repeated mdbench trials into a ns/day chart", long_about = None)]
struct Cli {
    /// TOML file listing the series and figure settings
    #[arg(long)]
    config: Option<PathBuf>,
    /// Output image (.png or .svg)
    #[arg(long)]
    output: Option<PathBuf>,
    #[arg(long)]
    dpi: Option<u32>,
    /// Trials per input size
    #[arg(long)]
    trials: Option<usize>,
    /// Take parallelism levels from the last trial instead of requiring them to match
    #[arg(long)]
    lenient_levels: bool,
    /// Log file; stderr when omitted
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.log_file.as_deref(), "info")?;

    let mut config = match &cli.config {
        Some(path) => PlotConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => PlotConfig::default(),
    };
    if let Some(output) = cli.output {
        config.output = output;
    }
    if let Some(dpi) = cli.dpi {
        config.dpi = dpi;
    }
    if let Some(trials) = cli.trials {
        config.trials = trials;
    }
    config.validate()?;

    let policy = if cli.lenient_levels {
        AlignmentPolicy::LastTrialLevels
    } else {
        AlignmentPolicy::Strict
    };

    let mut series = Vec::with_capacity(config.series.len());
    for spec in &config.series {
        let trials = TrialSet::load(&spec.dir, &config.result_prefix, config.trials)
            .with_context(|| format!("loading trials from {}", spec.dir.display()))?;
        let stats = trials.aggregate(policy)?;
        log::info!(
            "{}: {} levels over {} trials",
            spec.dir.display(),
            stats.parallels.len(),
            trials.tables.len()
        );
        series.push(PlotSeries {
            label: atoms_label(spec.atoms),
            stats,
        });
    }

    render_chart(&config.output, &series, &config)?;
    println!("Chart written to {}", config.output.display());
    Ok(())
}
