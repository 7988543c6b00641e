//! Parallel-throughput benchmarking for GROMACS-style MD engines.
//!
//! The runner sweeps a set of `(parallel instances, cpus per instance)`
//! configurations over one machine, pinning every instance to its own CPU
//! range and spreading instances over the GPUs, and writes the summed ns/day
//! per configuration to a result table. The aggregation side averages
//! repeated result tables and plots throughput against parallelism.

pub mod aggregate;
pub mod config;
pub mod detect;
pub mod error;
pub mod host;
pub mod job;
pub mod logging;
pub mod paths;
pub mod perf;
pub mod plot;
pub mod results;
pub mod runner;
pub mod script;
pub mod stats;

pub use aggregate::{aggregate, AlignmentPolicy, SeriesStats, TrialSet};
pub use config::{BenchConfig, PlotConfig, ReportPolicy, SweepEntry};
pub use error::{BenchError, Result};
pub use results::{ResultRow, ResultTable};
pub use runner::{BashExecutor, BenchmarkRunner, ConfigOutcome, RunSummary, ScriptExecutor};
