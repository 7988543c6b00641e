//! PBS submission script for running the benchmark on a batch node.

use std::path::Path;

use crate::config::BenchConfig;

/// Renders a `qsub` script that requests one node with the configured CPU
/// and GPU budget and runs `runner` on `input` from the submission directory.
pub fn render(config: &BenchConfig, runner: &str, input: &Path) -> String {
    let job = &config.job;
    let mut lines = vec![
        "#!/bin/bash".to_string(),
        format!("#PBS -N {}", job.name),
        format!(
            "#PBS -l nodes={}:ppn={}:gpus={}",
            job.nodes, config.total_cpus, config.gpu_count
        ),
        format!("#PBS -e {}", job.stderr),
        format!("#PBS -o {}", job.stdout),
        String::new(),
    ];
    if !job.modules.is_empty() {
        lines.push("# load modules".to_string());
        lines.extend(job.modules.iter().map(|m| format!("ml {m}")));
        lines.push(String::new());
    }
    lines.push("cd ${PBS_O_WORKDIR}".to_string());
    lines.push(String::new());
    lines.push(format!("{} {}", runner, input.display()));

    let mut script = lines.join("\n");
    script.push('\n');
    script
}
