// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Spawn-option assembly for supervised children.
//!
//! Unix children become leaders of a fresh process group (group id == root
//! pid), which lets the supervisor signal the whole tree via the negative
//! pid. On Linux the shell additionally gets PR_SET_PDEATHSIG so the kernel
//! reaps it if the supervisor dies without a shutdown pass.

use std::collections::HashMap;
use std::path::Path;

use tokio::process::Command;

use crate::shell::Shell;

#[cfg(windows)]
const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;

/// Build the command that runs `command_line` through `shell` in `cwd`
/// with exactly `env` as the child environment additions.
pub fn build_command(
    shell: &Shell,
    command_line: &str,
    cwd: &Path,
    env: &HashMap<String, String>,
) -> Command {
    let mut cmd = Command::new(&shell.program);
    cmd.args(shell.invocation(command_line));
    cmd.current_dir(cwd);
    cmd.envs(env);
    cmd.kill_on_drop(false);

    #[cfg(unix)]
    {
        // Fresh process group led by the child itself.
        cmd.process_group(0);
    }

    #[cfg(target_os = "linux")]
    {
        // SAFETY: set_pdeathsig is async-signal-safe (a single prctl call,
        // no allocation), which is all pre_exec requires.
        #[allow(unsafe_code)]
        unsafe {
            cmd.pre_exec(|| {
                nix::sys::prctl::set_pdeathsig(nix::sys::signal::Signal::SIGKILL)
                    .map_err(|e| std::io::Error::from_raw_os_error(e as i32))?;
                Ok(())
            });
        }
    }

    #[cfg(windows)]
    {
        cmd.creation_flags(CREATE_NEW_PROCESS_GROUP);
    }

    cmd
}

#[cfg(test)]
#[path = "spawn_tests.rs"]
mod tests;
