//! Launch planning for one sweep configuration.
//!
//! A [`LaunchPlan`] pins each of the `p` instances to its own contiguous CPU
//! range and spreads them over the GPUs in launch order, then renders the
//! shell script that starts all of them in the background between the GPU
//! service start and stop commands.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{EngineOptions, ServiceCommands, SweepEntry};
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceLaunch {
    pub index: usize,
    pub threads: usize,
    pub pin_offset: usize,
    pub gpu_id: usize,
    pub command: String,
}

#[derive(Debug, Clone)]
pub struct LaunchPlan {
    pub entry: SweepEntry,
    pub instances: Vec<InstanceLaunch>,
}

/// Device for instance `index` of `parallels`: the instances are cut into
/// `gpu_count` consecutive blocks, the lower blocks taking the extra instance
/// when the split is uneven.
pub fn gpu_for_instance(index: usize, parallels: usize, gpu_count: usize) -> usize {
    index * gpu_count / parallels
}

impl LaunchPlan {
    pub fn new(
        engine: &str,
        input: &Path,
        entry: SweepEntry,
        gpu_count: usize,
        options: &EngineOptions,
    ) -> Self {
        let instances = (0..entry.parallels)
            .map(|j| {
                let pin_offset = j * entry.cpus;
                let gpu_id = gpu_for_instance(j, entry.parallels, gpu_count);
                let mut command = format!("{} mdrun -s {} ", engine, input.display());
                // hardware
                command.push_str(&format!(
                    "-ntomp {} -pinstride 1 -pinoffset {} -pin on -gpu_id {} ",
                    entry.cpus, pin_offset, gpu_id
                ));
                for flag in &options.offload_flags {
                    command.push_str(flag);
                    command.push(' ');
                }
                command.push_str(&format!("-nsteps {} -deffnm {} &", options.nsteps, j));
                InstanceLaunch {
                    index: j,
                    threads: entry.cpus,
                    pin_offset,
                    gpu_id,
                    command,
                }
            })
            .collect();
        Self { entry, instances }
    }

    pub fn script_name(&self) -> String {
        format!("prun_{}.sh", self.entry.parallels)
    }

    pub fn render_script(&self, service: &ServiceCommands) -> String {
        let mut lines = Vec::with_capacity(self.instances.len() + 3);
        lines.push(service.start.as_str());
        lines.extend(self.instances.iter().map(|i| i.command.as_str()));
        lines.push("wait");
        lines.push(service.stop.as_str());
        let mut script = lines.join("\n");
        script.push('\n');
        script
    }

    /// Writes the script into `dir` and returns its path.
    pub fn write_script(&self, dir: &Path, service: &ServiceCommands) -> Result<PathBuf> {
        let path = dir.join(self.script_name());
        fs::write(&path, self.render_script(service))?;
        Ok(path)
    }
}
