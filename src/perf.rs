use log::warn;

/// Literal the engine prints in front of its ns/day figure.
pub const PERFORMANCE_MARKER: &str = "Performance:";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PerformanceReport {
    /// Parsed values, in the order they appeared.
    pub values: Vec<f64>,
    /// Marker lines whose second field was not a number.
    pub malformed: usize,
}

impl PerformanceReport {
    pub fn total(&self) -> f64 {
        self.values.iter().sum()
    }

    pub fn reported(&self) -> usize {
        self.values.len()
    }
}

pub fn parse_performance(text: &str) -> PerformanceReport {
    let mut report = PerformanceReport::default();
    for line in text.lines().filter(|l| l.contains(PERFORMANCE_MARKER)) {
        match line.split_whitespace().nth(1).map(str::parse::<f64>) {
            Some(Ok(value)) => report.values.push(value),
            _ => {
                warn!("unparseable performance line: {}", line.trim());
                report.malformed += 1;
            }
        }
    }
    report
}
