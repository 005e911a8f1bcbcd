//! Best-effort file descriptor limit adjustment
//!
//! Syncs with many sources open many files and sockets at once; the soft
//! NOFILE limit is raised to the hard limit where the platform allows it.
//! Callers treat any failure as advisory.

/// Raise the soft file descriptor limit to the hard limit. Returns the new
/// soft limit, or `None` when there was nothing to raise.
#[cfg(unix)]
pub fn raise_file_descriptor_limit() -> std::io::Result<Option<u64>> {
    let mut limit = libc::rlimit {
        rlim_cur: 0,
        rlim_max: 0,
    };
    if unsafe { libc::getrlimit(libc::RLIMIT_NOFILE, &mut limit) } != 0 {
        return Err(std::io::Error::last_os_error());
    }
    if limit.rlim_cur >= limit.rlim_max {
        return Ok(None);
    }
    limit.rlim_cur = limit.rlim_max;
    if unsafe { libc::setrlimit(libc::RLIMIT_NOFILE, &limit) } != 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(Some(limit.rlim_cur as u64))
}

#[cfg(not(unix))]
pub fn raise_file_descriptor_limit() -> std::io::Result<Option<u64>> {
    Ok(None)
}
