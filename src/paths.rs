use std::ffi::OsString;
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use log::info;

use crate::error::{BenchError, Result};

/// Number of suffixes probed before giving up.
pub const MAX_PROBES: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    /// `<base>_<n>.txt`, created empty.
    File,
    /// `<base>_<n>`, created as a directory.
    Folder,
}

pub fn allocate(base: &Path, kind: PathKind) -> Result<PathBuf> {
    allocate_with_bound(base, kind, MAX_PROBES)
}

/// Returns the first `<base>_<n>` (n < bound) that did not exist, after
/// creating it. Creation is exclusive, so a path that appears between the
/// probe and the create is skipped rather than shared.
pub fn allocate_with_bound(base: &Path, kind: PathKind, bound: usize) -> Result<PathBuf> {
    if let Some(parent) = base.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    for trial in 0..bound {
        let candidate = suffixed(base, trial, kind);
        let created = match kind {
            PathKind::Folder => fs::create_dir(&candidate),
            PathKind::File => OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&candidate)
                .map(|_| ()),
        };
        match created {
            Ok(()) => {
                match kind {
                    PathKind::Folder => {
                        info!("Benchmarking will occur in {}", candidate.display())
                    }
                    PathKind::File => info!("Results will be saved in {}\n", candidate.display()),
                }
                return Ok(candidate);
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e.into()),
        }
    }

    info!("Existing trials exceeded {}! will exit now.", bound);
    Err(BenchError::PathsExhausted {
        base: base.to_path_buf(),
        bound,
    })
}

fn suffixed(base: &Path, trial: usize, kind: PathKind) -> PathBuf {
    let mut name = OsString::from(base.as_os_str());
    name.push(format!("_{trial}"));
    if kind == PathKind::File {
        name.push(".txt");
    }
    PathBuf::from(name)
}
