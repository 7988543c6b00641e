//! Benchmark and plot configuration.
//!
//! Both configurations deserialize from TOML and every field falls back to the
//! stock TGPU10 benchmark values, so an empty file (or no file at all)
//! reproduces the stock sweep:
//!
//! ```toml
//! total_cpus = 18
//! gpu_count = 2
//!
//! [engine]
//! nsteps = 20000
//!
//! [[sweep]]
//! parallels = 1
//! cpus = 18
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{BenchError, Result};

/// One point of the parallelism sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepEntry {
    pub parallels: usize,
    pub cpus: usize,
}

impl SweepEntry {
    pub const fn new(parallels: usize, cpus: usize) -> Self {
        Self { parallels, cpus }
    }
}

/// How the runner reacts when fewer (or more) instances report performance
/// than were launched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportPolicy {
    #[default]
    Strict,
    /// Warn and keep the partial total.
    Tolerant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceCommands {
    pub start: String,
    pub stop: String,
}

impl Default for ServiceCommands {
    fn default() -> Self {
        Self {
            start: "nvidia-cuda-mps-control -d".to_string(),
            stop: "echo quit | nvidia-cuda-mps-control".to_string(),
        }
    }
}

/// Engine flags that are the same for every instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
    pub nsteps: u64,
    pub offload_flags: Vec<String>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            nsteps: 20_000,
            offload_flags: [
                "-notunepme",
                "-nb",
                "gpu",
                "-bonded",
                "gpu",
                "-pme",
                "gpu",
                "-resethway",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

/// PBS submission script parameters, rendered by [`crate::job`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JobTemplate {
    pub name: String,
    pub nodes: usize,
    pub modules: Vec<String>,
    pub stdout: String,
    pub stderr: String,
}

impl Default for JobTemplate {
    fn default() -> Self {
        Self {
            name: "gmx_bm".to_string(),
            nodes: 1,
            modules: vec!["gromacs/2024.5-gcc-impi".to_string()],
            stdout: "job.out".to_string(),
            stderr: "job.err".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchConfig {
    pub sweep: Vec<SweepEntry>,
    pub total_cpus: usize,
    pub gpu_count: usize,
    pub engine_candidates: Vec<String>,
    pub input_extension: String,
    pub scratch_base: PathBuf,
    /// Relative paths are resolved against the caller's working directory.
    pub results_base: PathBuf,
    pub report_policy: ReportPolicy,
    pub engine: EngineOptions,
    pub service: ServiceCommands,
    pub job: JobTemplate,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            sweep: vec![
                SweepEntry::new(1, 18),
                SweepEntry::new(2, 9),
                SweepEntry::new(4, 4),
                SweepEntry::new(6, 3),
                SweepEntry::new(9, 2),
                SweepEntry::new(18, 1),
            ],
            total_cpus: 18,
            gpu_count: 2,
            engine_candidates: vec!["gmx".into(), "gmx_mpi".into(), "gmx_d".into()],
            input_extension: "tpr".to_string(),
            scratch_base: PathBuf::from("/tmp/gmx_bm"),
            results_base: PathBuf::from("perf_results"),
            report_policy: ReportPolicy::Strict,
            engine: EngineOptions::default(),
            service: ServiceCommands::default(),
            job: JobTemplate::default(),
        }
    }
}

impl BenchConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn validate(&self) -> Result<()> {
        validate_sweep(&self.sweep, self.total_cpus)?;
        if self.gpu_count == 0 {
            return Err(BenchError::InvalidConfig(
                "gpu_count must be at least 1".to_string(),
            ));
        }
        if self.engine_candidates.is_empty() {
            return Err(BenchError::InvalidConfig(
                "engine_candidates must name at least one program".to_string(),
            ));
        }
        if self.engine.nsteps == 0 {
            return Err(BenchError::InvalidConfig("nsteps must be positive".to_string()));
        }
        Ok(())
    }
}

/// Every entry must split the CPU budget exactly, and each level may appear
/// only once since levels name the per-configuration subdirectories.
pub fn validate_sweep(sweep: &[SweepEntry], total_cpus: usize) -> Result<()> {
    if sweep.is_empty() {
        return Err(BenchError::InvalidSweep("sweep is empty".to_string()));
    }
    let mut seen = HashSet::new();
    for entry in sweep {
        if entry.parallels == 0 || entry.cpus == 0 {
            return Err(BenchError::InvalidSweep(format!(
                "{} parallels x {} cpus: both must be non-zero",
                entry.parallels, entry.cpus
            )));
        }
        if entry.parallels.checked_mul(entry.cpus) != Some(total_cpus) {
            return Err(BenchError::InvalidSweep(format!(
                "{} parallels x {} cpus does not use all {} cpus",
                entry.parallels, entry.cpus, total_cpus
            )));
        }
        if !seen.insert(entry.parallels) {
            return Err(BenchError::InvalidSweep(format!(
                "{} parallels listed twice",
                entry.parallels
            )));
        }
    }
    Ok(())
}

/// One input size in the comparison chart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesSpec {
    /// Directory holding this size's trial files.
    pub dir: PathBuf,
    pub atoms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotConfig {
    pub series: Vec<SeriesSpec>,
    pub trials: usize,
    pub result_prefix: String,
    pub output: PathBuf,
    pub dpi: u32,
    pub width_in: f64,
    pub height_in: f64,
    pub x_label: String,
    pub y_label: String,
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            series: [("30k", 32_351), ("70k", 68_895), ("100k", 101_240)]
                .iter()
                .map(|(dir, atoms)| SeriesSpec {
                    dir: PathBuf::from(dir),
                    atoms: *atoms,
                })
                .collect(),
            trials: 5,
            result_prefix: "perf_results".to_string(),
            output: PathBuf::from("nsday.png"),
            dpi: 300,
            width_in: 3.5,
            height_in: 2.625,
            x_label: "Parallel simulations".to_string(),
            y_label: "Total ns/day".to_string(),
        }
    }
}

impl PlotConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.series.is_empty() {
            return Err(BenchError::InvalidConfig("no series to plot".to_string()));
        }
        if self.trials == 0 {
            return Err(BenchError::InvalidConfig("trials must be positive".to_string()));
        }
        if self.dpi == 0 || self.width_in <= 0.0 || self.height_in <= 0.0 {
            return Err(BenchError::InvalidConfig(
                "figure size and dpi must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
