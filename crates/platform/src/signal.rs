// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tree-wide signal delivery and pid liveness.

use tracing::debug;

use crate::error::PlatformError;

/// Send the graceful termination signal to the child's whole tree.
///
/// Unix: SIGTERM to the process group (the child is its own group leader).
/// Windows: `taskkill /T` without `/F`.
pub fn graceful_shutdown(root_pid: u32) -> Result<(), PlatformError> {
    debug!(pid = root_pid, "graceful shutdown signal");
    #[cfg(unix)]
    {
        signal_group(root_pid, nix::sys::signal::Signal::SIGTERM)
    }
    #[cfg(windows)]
    {
        taskkill(root_pid, false)
    }
}

/// Force-kill the child's whole tree.
pub fn force_kill(root_pid: u32) -> Result<(), PlatformError> {
    debug!(pid = root_pid, "force kill signal");
    #[cfg(unix)]
    {
        signal_group(root_pid, nix::sys::signal::Signal::SIGKILL)
    }
    #[cfg(windows)]
    {
        taskkill(root_pid, true)
    }
}

/// Probe whether `pid` still exists (signal 0).
pub fn is_process_running(pid: u32) -> bool {
    #[cfg(unix)]
    {
        nix::sys::signal::kill(nix::unistd::Pid::from_raw(pid as i32), None).is_ok()
    }
    #[cfg(windows)]
    {
        std::process::Command::new("tasklist")
            .args(["/FI", &format!("PID eq {pid}"), "/NH"])
            .output()
            .map(|out| String::from_utf8_lossy(&out.stdout).contains(&pid.to_string()))
            .unwrap_or(false)
    }
}

#[cfg(unix)]
fn signal_group(root_pid: u32, signal: nix::sys::signal::Signal) -> Result<(), PlatformError> {
    use nix::errno::Errno;
    use nix::sys::signal::killpg;
    use nix::unistd::Pid;

    match killpg(Pid::from_raw(root_pid as i32), signal) {
        Ok(()) => Ok(()),
        // Already gone is success for our purposes
        Err(Errno::ESRCH) => Ok(()),
        Err(errno) => Err(PlatformError::Signal { pid: root_pid, message: errno.to_string() }),
    }
}

#[cfg(windows)]
fn taskkill(root_pid: u32, force: bool) -> Result<(), PlatformError> {
    let mut cmd = std::process::Command::new("taskkill");
    cmd.args(["/PID", &root_pid.to_string(), "/T"]);
    if force {
        cmd.arg("/F");
    }
    let status = cmd.status().map_err(|e| PlatformError::Signal {
        pid: root_pid,
        message: e.to_string(),
    })?;
    if status.success() {
        Ok(())
    } else {
        Err(PlatformError::Signal {
            pid: root_pid,
            message: format!("taskkill exited with {status}"),
        })
    }
}

#[cfg(test)]
#[path = "signal_tests.rs"]
mod tests;
