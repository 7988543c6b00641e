//! The parallelism sweep.
//!
//! Each configuration gets its own directory under a fresh scratch folder.
//! The generated script is run to completion before the next configuration
//! starts, since every configuration uses the whole CPU and GPU budget.

use std::env;
use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use log::{info, warn};

use crate::config::{BenchConfig, ReportPolicy, SweepEntry};
use crate::detect::{detect_program, detect_program_in};
use crate::error::{BenchError, Result};
use crate::host::online_cpus;
use crate::paths::{allocate, PathKind};
use crate::perf::parse_performance;
use crate::results::ResultTable;
use crate::script::LaunchPlan;

#[derive(Debug, Clone, Default)]
pub struct ScriptOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Runs a generated script and blocks until it exits.
pub trait ScriptExecutor {
    fn execute(&self, script: &Path, workdir: &Path) -> Result<ScriptOutput>;
}

/// `bash ./<script>` with `workdir` as the working directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct BashExecutor;

impl ScriptExecutor for BashExecutor {
    fn execute(&self, script: &Path, workdir: &Path) -> Result<ScriptOutput> {
        let name = script.file_name().unwrap_or(script.as_os_str());
        let mut arg = OsString::from("./");
        arg.push(name);
        let output = Command::new("bash").arg(arg).current_dir(workdir).output()?;
        Ok(ScriptOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConfigOutcome {
    pub parallels: usize,
    pub cpus: usize,
    pub total: f64,
    pub reported: usize,
    pub expected: usize,
}

impl fmt::Display for ConfigOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:>9} | {:>6} | {:>12.4} | {:>4}/{:<4}",
            self.parallels, self.cpus, self.total, self.reported, self.expected
        )
    }
}

pub fn outcome_header() -> String {
    format!(
        "{:>9} | {:>6} | {:>12} | {:>9}\n{}",
        "Parallels",
        "CPUs",
        "ns/day",
        "Reported",
        "-".repeat(45)
    )
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub scratch_dir: PathBuf,
    pub results_file: PathBuf,
    pub outcomes: Vec<ConfigOutcome>,
}

impl RunSummary {
    pub fn table(&self) -> ResultTable {
        let mut table = ResultTable::default();
        for outcome in &self.outcomes {
            table.push(outcome.parallels, outcome.total);
        }
        table
    }
}

pub struct BenchmarkRunner<E = BashExecutor> {
    config: BenchConfig,
    executor: E,
    search_path: Option<OsString>,
}

impl BenchmarkRunner<BashExecutor> {
    pub fn new(config: BenchConfig) -> Self {
        Self::with_executor(config, BashExecutor)
    }
}

impl<E: ScriptExecutor> BenchmarkRunner<E> {
    pub fn with_executor(config: BenchConfig, executor: E) -> Self {
        Self {
            config,
            executor,
            search_path: None,
        }
    }

    /// Resolve the engine against `search_path` instead of `$PATH`.
    pub fn with_search_path(mut self, search_path: OsString) -> Self {
        self.search_path = Some(search_path);
        self
    }

    pub fn config(&self) -> &BenchConfig {
        &self.config
    }

    /// Checks every precondition, then runs the whole sweep on `input`.
    /// Nothing is created on disk until the checks pass, and the result file
    /// only appears once every configuration has finished.
    pub fn run(&self, input: &Path) -> Result<RunSummary> {
        check_input(input, &self.config.input_extension)?;
        self.config.validate()?;
        let engine = self.detect_engine()?;

        let input = fs::canonicalize(input)?;
        info!("Using {} for benchmarking", input.display());
        if let Some(online) = online_cpus() {
            if self.config.total_cpus > online {
                warn!(
                    "configured for {} cpus but only {} are online",
                    self.config.total_cpus, online
                );
            }
        }

        let results_base = if self.config.results_base.is_relative() {
            env::current_dir()?.join(&self.config.results_base)
        } else {
            self.config.results_base.clone()
        };
        let scratch_dir = allocate(&self.config.scratch_base, PathKind::Folder)?;

        let mut outcomes = Vec::with_capacity(self.config.sweep.len());
        for entry in &self.config.sweep {
            outcomes.push(self.run_config(&engine, &input, &scratch_dir, *entry)?);
        }

        info!("Done simulating in {}", scratch_dir.display());
        // allocated only once the sweep is complete, so an aborted run never
        // leaves an empty trial file behind
        let results_file = allocate(&results_base, PathKind::File)?;
        let summary = RunSummary {
            scratch_dir,
            results_file,
            outcomes,
        };
        summary.table().write(&summary.results_file)?;
        info!("Results should be in {}", summary.results_file.display());
        Ok(summary)
    }

    fn detect_engine(&self) -> Result<String> {
        let candidates = &self.config.engine_candidates;
        let found = match &self.search_path {
            Some(path) => detect_program_in(candidates, path),
            None => detect_program(candidates),
        };
        found.ok_or_else(|| BenchError::ToolNotFound(candidates.clone()))
    }

    fn run_config(
        &self,
        engine: &str,
        input: &Path,
        scratch_dir: &Path,
        entry: SweepEntry,
    ) -> Result<ConfigOutcome> {
        let p = entry.parallels;
        let dir = scratch_dir.join(p.to_string());
        fs::create_dir_all(&dir)?;

        let plan = LaunchPlan::new(
            engine,
            input,
            entry,
            self.config.gpu_count,
            &self.config.engine,
        );
        let script = plan.write_script(&dir, &self.config.service)?;
        info!(
            "{} parallels, {} cpus, running ./{} in {}",
            p,
            entry.cpus,
            plan.script_name(),
            dir.display()
        );

        let output = self.executor.execute(&script, &dir)?;
        fs::write(dir.join(format!("prun_{p}.out")), &output.stdout)?;
        fs::write(dir.join(format!("prun_{p}.err")), &output.stderr)?;
        if !output.success {
            warn!("./{} exited with status {:?}", plan.script_name(), output.code);
        }

        let report = parse_performance(&output.stderr);
        info!("--- ns/day ---");
        for (idx, value) in report.values.iter().enumerate() {
            match plan.instances.get(idx) {
                Some(instance) => info!("{:.4} ns/day | {}", value, instance.command),
                None => info!("{:.4} ns/day | (no matching instance)", value),
            }
        }
        info!("---        ---");
        let total = report.total();
        info!("Total performance for {} parallels: {:.4} ns/day\n", p, total);

        let reported = report.reported();
        if reported != p {
            match self.config.report_policy {
                ReportPolicy::Strict => {
                    return Err(BenchError::MissingReports {
                        parallels: p,
                        reported,
                        expected: p,
                    })
                }
                ReportPolicy::Tolerant => warn!(
                    "{} of {} instances reported performance for {} parallels, total is partial",
                    reported, p, p
                ),
            }
        }

        Ok(ConfigOutcome {
            parallels: p,
            cpus: entry.cpus,
            total,
            reported,
            expected: p,
        })
    }
}

fn check_input(input: &Path, extension: &str) -> Result<()> {
    if input.extension().and_then(|e| e.to_str()) != Some(extension) {
        return Err(BenchError::WrongExtension {
            path: input.to_path_buf(),
            expected: extension.to_string(),
        });
    }
    if !input.exists() {
        return Err(BenchError::InputNotFound(input.to_path_buf()));
    }
    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    /// Answers every backgrounded engine line in the script with one
    /// `Performance:` line, optionally dropping some.
    struct FakeEngine {
        value: f64,
        drop_reports: usize,
        seen: RefCell<Vec<PathBuf>>,
    }

    impl FakeEngine {
        fn new(value: f64) -> Self {
            Self {
                value,
                drop_reports: 0,
                seen: RefCell::new(Vec::new()),
            }
        }
    }

    impl ScriptExecutor for FakeEngine {
        fn execute(&self, script: &Path, workdir: &Path) -> Result<ScriptOutput> {
            assert_eq!(script.parent(), Some(workdir));
            self.seen.borrow_mut().push(script.to_path_buf());
            let text = fs::read_to_string(script)?;
            let launched = text.lines().filter(|l| l.ends_with('&')).count();
            let stderr = (0..launched.saturating_sub(self.drop_reports))
                .map(|_| format!("Performance:      {}        0.165\n", self.value))
                .collect();
            Ok(ScriptOutput {
                success: true,
                code: Some(0),
                stdout: String::new(),
                stderr,
            })
        }
    }

    struct Fixture {
        tmp: TempDir,
        input: PathBuf,
        bin: PathBuf,
    }

    fn fixture() -> Fixture {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("topol.tpr");
        fs::write(&input, b"tpr").unwrap();
        let bin = tmp.path().join("bin");
        fs::create_dir(&bin).unwrap();
        let gmx = bin.join("gmx");
        fs::write(&gmx, "#!/bin/sh\n").unwrap();
        fs::set_permissions(&gmx, fs::Permissions::from_mode(0o755)).unwrap();
        Fixture { tmp, input, bin }
    }

    fn config_in(tmp: &Path) -> BenchConfig {
        BenchConfig {
            scratch_base: tmp.join("scratch").join("gmx_bm"),
            results_base: tmp.join("perf_results"),
            ..BenchConfig::default()
        }
    }

    #[test]
    fn test_total_is_parallels_times_value() {
        let fx = fixture();
        let runner = BenchmarkRunner::with_executor(config_in(fx.tmp.path()), FakeEngine::new(12.5))
            .with_search_path(fx.bin.clone().into_os_string());

        let summary = runner.run(&fx.input).unwrap();
        assert_eq!(summary.outcomes.len(), 6);
        for outcome in &summary.outcomes {
            assert_eq!(outcome.reported, outcome.parallels);
            assert!((outcome.total - 12.5 * outcome.parallels as f64).abs() < 1e-9);
        }

        assert_eq!(summary.scratch_dir, fx.tmp.path().join("scratch").join("gmx_bm_0"));
        assert_eq!(summary.results_file, fx.tmp.path().join("perf_results_0.txt"));
        let written = ResultTable::read(&summary.results_file).unwrap();
        assert_eq!(written.parallels(), vec![1, 2, 4, 6, 9, 18]);
        assert_eq!(written, summary.table());

        for p in [1, 2, 4, 6, 9, 18] {
            let dir = summary.scratch_dir.join(p.to_string());
            assert!(dir.join(format!("prun_{p}.sh")).is_file());
            assert!(dir.join(format!("prun_{p}.err")).is_file());
        }
        assert_eq!(runner.executor.seen.borrow().len(), 6);
    }

    #[test]
    fn test_second_run_gets_new_directories() {
        let fx = fixture();
        let runner = BenchmarkRunner::with_executor(config_in(fx.tmp.path()), FakeEngine::new(1.0))
            .with_search_path(fx.bin.clone().into_os_string());

        let first = runner.run(&fx.input).unwrap();
        let second = runner.run(&fx.input).unwrap();
        assert_ne!(first.scratch_dir, second.scratch_dir);
        assert_eq!(second.results_file, fx.tmp.path().join("perf_results_1.txt"));
    }

    #[test]
    fn test_strict_policy_rejects_missing_reports() {
        let fx = fixture();
        let mut engine = FakeEngine::new(10.0);
        engine.drop_reports = 1;
        let runner = BenchmarkRunner::with_executor(config_in(fx.tmp.path()), engine)
            .with_search_path(fx.bin.clone().into_os_string());

        match runner.run(&fx.input) {
            Err(BenchError::MissingReports {
                parallels,
                reported,
                expected,
            }) => {
                assert_eq!((parallels, reported, expected), (1, 0, 1));
            }
            other => panic!("expected MissingReports, got {other:?}"),
        }
        assert!(!fx.tmp.path().join("perf_results_0.txt").exists());
    }

    #[test]
    fn test_aborted_run_does_not_consume_a_trial_number() {
        let fx = fixture();
        let mut engine = FakeEngine::new(10.0);
        engine.drop_reports = 1;
        let failing = BenchmarkRunner::with_executor(config_in(fx.tmp.path()), engine)
            .with_search_path(fx.bin.clone().into_os_string());
        assert!(failing.run(&fx.input).is_err());

        let ok = BenchmarkRunner::with_executor(config_in(fx.tmp.path()), FakeEngine::new(2.0))
            .with_search_path(fx.bin.clone().into_os_string());
        let summary = ok.run(&fx.input).unwrap();
        assert_eq!(summary.results_file, fx.tmp.path().join("perf_results_0.txt"));
        assert_eq!(ResultTable::read(&summary.results_file).unwrap().rows.len(), 6);

        let leftovers: Vec<PathBuf> = fs::read_dir(fx.tmp.path())
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with("perf_results_"))
            })
            .collect();
        assert_eq!(leftovers, vec![summary.results_file.clone()]);
    }

    #[test]
    fn test_tolerant_policy_keeps_partial_totals() {
        let fx = fixture();
        let mut config = config_in(fx.tmp.path());
        config.report_policy = ReportPolicy::Tolerant;
        let mut engine = FakeEngine::new(10.0);
        engine.drop_reports = 1;
        let runner = BenchmarkRunner::with_executor(config, engine)
            .with_search_path(fx.bin.clone().into_os_string());

        let summary = runner.run(&fx.input).unwrap();
        for outcome in &summary.outcomes {
            assert_eq!(outcome.reported, outcome.parallels - 1);
            assert!((outcome.total - 10.0 * (outcome.parallels - 1) as f64).abs() < 1e-9);
        }
    }

    #[test]
    fn test_preconditions_fail_before_any_side_effect() {
        let fx = fixture();
        let config = config_in(fx.tmp.path());
        let scratch_parent = fx.tmp.path().join("scratch");

        let wrong_ext = fx.tmp.path().join("topol.gro");
        fs::write(&wrong_ext, b"gro").unwrap();
        let runner = BenchmarkRunner::with_executor(config.clone(), FakeEngine::new(1.0))
            .with_search_path(fx.bin.clone().into_os_string());
        assert!(matches!(
            runner.run(&wrong_ext),
            Err(BenchError::WrongExtension { .. })
        ));
        assert!(matches!(
            runner.run(&fx.tmp.path().join("missing.tpr")),
            Err(BenchError::InputNotFound(_))
        ));

        let no_engine = BenchmarkRunner::with_executor(config, FakeEngine::new(1.0))
            .with_search_path(fx.tmp.path().join("empty").into_os_string());
        assert!(matches!(
            no_engine.run(&fx.input),
            Err(BenchError::ToolNotFound(_))
        ));

        assert!(!scratch_parent.exists());
        assert!(!fx.tmp.path().join("perf_results_0.txt").exists());
    }

    #[test]
    fn test_invalid_sweep_fails_before_running() {
        let fx = fixture();
        let mut config = config_in(fx.tmp.path());
        config.sweep.push(SweepEntry::new(3, 5));
        let runner = BenchmarkRunner::with_executor(config, FakeEngine::new(1.0))
            .with_search_path(fx.bin.clone().into_os_string());

        assert!(matches!(
            runner.run(&fx.input),
            Err(BenchError::InvalidSweep(_))
        ));
        assert!(runner.executor.seen.borrow().is_empty());
    }

    #[test]
    fn test_outcome_row_format() {
        let outcome = ConfigOutcome {
            parallels: 9,
            cpus: 2,
            total: 301.25,
            reported: 9,
            expected: 9,
        };
        assert_eq!(outcome.to_string(), "        9 |      2 |     301.2500 |    9/9   ");
        assert!(outcome_header().starts_with("Parallels |"));
    }
}
