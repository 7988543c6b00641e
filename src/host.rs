/// Online CPUs on this machine, if the OS reports them.
#[cfg(target_os = "linux")]
pub fn online_cpus() -> Option<usize> {
    // SAFETY: sysconf has no preconditions and only reads system state.
    let n = unsafe { libc::sysconf(libc::_SC_NPROCESSORS_ONLN) };
    if n > 0 {
        Some(n as usize)
    } else {
        fallback()
    }
}

#[cfg(not(target_os = "linux"))]
pub fn online_cpus() -> Option<usize> {
    fallback()
}

fn fallback() -> Option<usize> {
    std::thread::available_parallelism().ok().map(|n| n.get())
}
