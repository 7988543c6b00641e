use std::env;
use std::ffi::OsStr;
use std::path::PathBuf;

/// First of `programs` that resolves on `PATH`.
pub fn detect_program<S: AsRef<str>>(programs: &[S]) -> Option<String> {
    programs
        .iter()
        .map(AsRef::as_ref)
        .find(|program| which::which(program).is_ok())
        .map(str::to_string)
}

pub fn detect_program_in<S: AsRef<str>>(programs: &[S], search_path: &OsStr) -> Option<String> {
    programs
        .iter()
        .map(AsRef::as_ref)
        .find(|program| resolve(program, search_path).is_some())
        .map(str::to_string)
}

/// Names containing a separator are checked as paths, relative ones against
/// the current directory.
pub fn resolve(program: &str, search_path: &OsStr) -> Option<PathBuf> {
    if program.is_empty() {
        return None;
    }
    let cwd = env::current_dir().ok()?;
    which::which_in(program, Some(search_path), cwd).ok()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    fn install(dir: &Path, name: &str, mode: u32) {
        let path = dir.join(name);
        fs::write(&path, "#!/bin/sh\n").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(mode)).unwrap();
    }

    #[test]
    fn test_first_resolvable_candidate_wins() {
        let tmp = TempDir::new().unwrap();
        install(tmp.path(), "gmx_mpi", 0o755);
        install(tmp.path(), "gmx_d", 0o755);

        let found = detect_program_in(&["gmx", "gmx_mpi", "gmx_d"], tmp.path().as_os_str());
        assert_eq!(found.as_deref(), Some("gmx_mpi"));
    }

    #[test]
    fn test_non_executable_is_ignored() {
        let tmp = TempDir::new().unwrap();
        install(tmp.path(), "gmx", 0o644);

        assert_eq!(detect_program_in(&["gmx"], tmp.path().as_os_str()), None);
    }

    #[test]
    fn test_searches_every_path_entry() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        install(second.path(), "gmx_d", 0o755);

        let search = env::join_paths([first.path(), second.path()]).unwrap();
        assert_eq!(
            detect_program_in(&["gmx", "gmx_d"], &search).as_deref(),
            Some("gmx_d")
        );
    }

    #[test]
    fn test_nothing_found() {
        let tmp = TempDir::new().unwrap();
        let none: Option<String> = detect_program_in(&["gmx", "gmx_mpi"], tmp.path().as_os_str());
        assert!(none.is_none());
    }

    #[test]
    fn test_lookup_on_process_path() {
        let found = detect_program(&["mdbench-no-such-engine", "sh"]);
        assert_eq!(found.as_deref(), Some("sh"));
    }

    #[test]
    fn test_empty_name_never_resolves() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(resolve("", tmp.path().as_os_str()), None);
    }

    #[test]
    fn test_explicit_path() {
        let tmp = TempDir::new().unwrap();
        install(tmp.path(), "engine.sh", 0o755);
        let explicit = tmp.path().join("engine.sh");

        let found = detect_program_in(&[explicit.to_str().unwrap()], OsStr::new(""));
        assert_eq!(found.as_deref(), explicit.to_str());
    }
}
