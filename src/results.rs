use std::fmt;
use std::fs;
use std::path::Path;

use crate::error::{BenchError, Result};

pub const HEADER: &str = "# parallels\tns/day";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResultRow {
    pub parallels: usize,
    pub throughput: f64,
}

/// Total throughput per parallelism level for one trial.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultTable {
    pub rows: Vec<ResultRow>,
}

impl ResultTable {
    pub fn push(&mut self, parallels: usize, throughput: f64) {
        self.rows.push(ResultRow {
            parallels,
            throughput,
        });
    }

    pub fn parallels(&self) -> Vec<usize> {
        self.rows.iter().map(|r| r.parallels).collect()
    }

    pub fn throughputs(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.throughput).collect()
    }

    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, self.to_string())?;
        Ok(())
    }

    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        Self::parse(&content).map_err(|(line, reason)| BenchError::ResultTableParse {
            path: path.to_path_buf(),
            line,
            reason,
        })
    }

    /// Blank lines and `#` comments are skipped. The first column may be
    /// written as a float (`1.000000000000000000e+00`) as long as it is
    /// integral.
    pub fn parse(content: &str) -> std::result::Result<Self, (usize, String)> {
        let mut table = Self::default();
        for (idx, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let lineno = idx + 1;
            let mut fields = line.split_whitespace();
            let (Some(p), Some(t), None) = (fields.next(), fields.next(), fields.next()) else {
                return Err((lineno, format!("expected two columns, got {line:?}")));
            };
            let parallels = parse_level(p).ok_or_else(|| (lineno, format!("bad level {p:?}")))?;
            let throughput = t
                .parse::<f64>()
                .map_err(|e| (lineno, format!("bad throughput {t:?}: {e}")))?;
            table.push(parallels, throughput);
        }
        Ok(table)
    }
}

fn parse_level(field: &str) -> Option<usize> {
    if let Ok(n) = field.parse::<usize>() {
        return Some(n);
    }
    let value = field.parse::<f64>().ok()?;
    (value >= 0.0 && value.fract() == 0.0).then_some(value as usize)
}

impl fmt::Display for ResultTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{HEADER}")?;
        for row in &self.rows {
            writeln!(f, "{} {:?}", row.parallels, row.throughput)?;
        }
        Ok(())
    }
}
