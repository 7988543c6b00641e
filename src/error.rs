use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, BenchError>;

#[derive(Debug, Error)]
pub enum BenchError {
    #[error("input file {0} does not exist")]
    InputNotFound(PathBuf),

    #[error("input file {path} must have the .{expected} extension")]
    WrongExtension { path: PathBuf, expected: String },

    #[error("invalid sweep: {0}")]
    InvalidSweep(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("none of the candidate programs {0:?} were found on PATH")]
    ToolNotFound(Vec<String>),

    /// Every suffix `_0.._{bound-1}` of `base` is taken.
    #[error("existing trials exceeded {bound} for {base}")]
    PathsExhausted { base: PathBuf, bound: usize },

    #[error("{parallels} parallels: {reported} of {expected} instances reported performance")]
    MissingReports {
        parallels: usize,
        reported: usize,
        expected: usize,
    },

    #[error("{path}:{line}: {reason}")]
    ResultTableParse {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("trial {path} does not line up with the other trials: {reason}")]
    TrialMismatch { path: PathBuf, reason: String },

    #[error("no trial tables to aggregate")]
    NoTrials,

    #[error("plotting failed: {0}")]
    Plot(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Config(#[from] toml::de::Error),
}

impl<E> From<plotters::drawing::DrawingAreaErrorKind<E>> for BenchError
where
    E: std::error::Error + Send + Sync,
{
    fn from(err: plotters::drawing::DrawingAreaErrorKind<E>) -> Self {
        BenchError::Plot(err.to_string())
    }
}
