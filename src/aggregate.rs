//! Trial aggregation: element-wise mean and spread of repeated sweeps.

use std::path::{Path, PathBuf};

use log::info;

use crate::error::{BenchError, Result};
use crate::results::ResultTable;
use crate::stats::{mean, population_std_dev};

/// How strictly trials must agree on their first column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlignmentPolicy {
    /// Same levels in the same order in every trial.
    #[default]
    Strict,
    /// Only the row count must agree; levels come from the last trial.
    LastTrialLevels,
}

#[derive(Debug, Clone)]
pub struct TrialSet {
    pub paths: Vec<PathBuf>,
    pub tables: Vec<ResultTable>,
}

impl TrialSet {
    /// Loads `<dir>/<prefix>_0.txt` through `<dir>/<prefix>_<trials-1>.txt`.
    pub fn load(dir: &Path, prefix: &str, trials: usize) -> Result<Self> {
        let paths: Vec<PathBuf> = (0..trials)
            .map(|trial| dir.join(format!("{prefix}_{trial}.txt")))
            .collect();
        Self::from_paths(paths)
    }

    pub fn from_paths(paths: Vec<PathBuf>) -> Result<Self> {
        let tables = paths
            .iter()
            .map(ResultTable::read)
            .collect::<Result<Vec<_>>>()?;
        info!("loaded {} trials", tables.len());
        Ok(Self { paths, tables })
    }

    pub fn aggregate(&self, policy: AlignmentPolicy) -> Result<SeriesStats> {
        aggregate_labelled(&self.paths, &self.tables, policy)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeriesStats {
    pub parallels: Vec<usize>,
    pub mean: Vec<f64>,
    pub std_dev: Vec<f64>,
}

impl SeriesStats {
    pub fn lower(&self) -> Vec<f64> {
        self.mean.iter().zip(&self.std_dev).map(|(m, s)| m - s).collect()
    }

    pub fn upper(&self) -> Vec<f64> {
        self.mean.iter().zip(&self.std_dev).map(|(m, s)| m + s).collect()
    }
}

/// Mean and population standard deviation of throughput across `tables`,
/// row by row.
pub fn aggregate(tables: &[ResultTable], policy: AlignmentPolicy) -> Result<SeriesStats> {
    let labels: Vec<PathBuf> = (0..tables.len())
        .map(|i| PathBuf::from(format!("trial {i}")))
        .collect();
    aggregate_labelled(&labels, tables, policy)
}

fn aggregate_labelled(
    labels: &[PathBuf],
    tables: &[ResultTable],
    policy: AlignmentPolicy,
) -> Result<SeriesStats> {
    check_alignment(labels, tables, policy)?;
    let last = tables.last().ok_or(BenchError::NoTrials)?;

    let rows = last.rows.len();
    let mut stats = SeriesStats {
        parallels: last.parallels(),
        mean: Vec::with_capacity(rows),
        std_dev: Vec::with_capacity(rows),
    };
    for row in 0..rows {
        let samples: Vec<f64> = tables.iter().map(|t| t.rows[row].throughput).collect();
        stats.mean.push(mean(&samples));
        stats.std_dev.push(population_std_dev(&samples));
    }
    Ok(stats)
}

fn check_alignment(
    paths: &[PathBuf],
    tables: &[ResultTable],
    policy: AlignmentPolicy,
) -> Result<()> {
    let Some(reference) = tables.last() else {
        return Err(BenchError::NoTrials);
    };
    let levels = reference.parallels();
    for (path, table) in paths.iter().zip(tables) {
        if table.rows.len() != reference.rows.len() {
            return Err(BenchError::TrialMismatch {
                path: path.clone(),
                reason: format!(
                    "{} rows, expected {}",
                    table.rows.len(),
                    reference.rows.len()
                ),
            });
        }
        if policy == AlignmentPolicy::Strict && table.parallels() != levels {
            return Err(BenchError::TrialMismatch {
                path: path.clone(),
                reason: format!("levels {:?}, expected {:?}", table.parallels(), levels),
            });
        }
    }
    Ok(())
}
