use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use mdbench::runner::outcome_header;
use mdbench::{job, logging, BenchConfig, BenchmarkRunner, ReportPolicy};

/// Benchmark an MD engine across levels of job parallelism
#[derive(Parser, Debug)]
#[command(name = "mdbench")]
#[command(about = "Sweep parallel mdrun instances over one multi-GPU node", long_about = None)]
struct Cli {
    /// Simulation input (.tpr)
    input: PathBuf,
    /// TOML file overriding the default sweep and hardware layout
    #[arg(long)]
    config: Option<PathBuf>,
    /// Steps per engine run
    #[arg(long)]
    nsteps: Option<u64>,
    /// Keep going when some instances print no performance line
    #[arg(long)]
    tolerate_missing: bool,
    /// Append-mode log file
    #[arg(long, default_value = "benchmark.log")]
    log_file: PathBuf,
    /// Write a PBS job script for this input to the given path and exit
    #[arg(long)]
    job_script: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => BenchConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => BenchConfig::default(),
    };
    if let Some(nsteps) = cli.nsteps {
        config.engine.nsteps = nsteps;
    }
    if cli.tolerate_missing {
        config.report_policy = ReportPolicy::Tolerant;
    }

    if let Some(out) = &cli.job_script {
        config.validate()?;
        let runner = std::env::args().next().unwrap_or_else(|| "mdbench".to_string());
        fs::write(out, job::render(&config, &runner, &cli.input))
            .with_context(|| format!("writing job script {}", out.display()))?;
        println!("Job script written to {}", out.display());
        return Ok(());
    }

    logging::init(Some(&cli.log_file), "info")
        .with_context(|| format!("opening log file {}", cli.log_file.display()))?;

    let runner = BenchmarkRunner::new(config);
    let summary = runner.run(&cli.input).map_err(|e| {
        log::error!("{e}");
        e
    })?;

    println!("{}", outcome_header());
    for outcome in &summary.outcomes {
        println!("{outcome}");
    }
    println!();
    println!("Scratch directory: {}", summary.scratch_dir.display());
    println!("Results: {}", summary.results_file.display());

    Ok(())
}
