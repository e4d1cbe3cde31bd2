//! Classic SysV-style detachment into the background

use crate::error::{ModswitchError, Result};
use nix::unistd::{fork, setsid, ForkResult};
use std::fs::OpenOptions;
use std::io;

fn step_err(step: &'static str) -> impl FnOnce(io::Error) -> ModswitchError {
    move |source| ModswitchError::Daemonize { step, source }
}

/// Double-fork into a session-less daemon.
///
/// Returns only in the final daemon process. Both intermediate parents exit
/// with status 0 without running destructors, so resources they share with
/// the daemon (notably the instance lock) stay held.
///
/// Must be called while the process is still single-threaded.
pub fn detach() -> Result<()> {
    // SAFETY: no other threads exist at this point
    match unsafe { fork() }.map_err(|e| step_err("fork")(e.into()))? {
        ForkResult::Parent { child } => {
            tracing::info!(%child, "detached into background");
            std::process::exit(0);
        }
        ForkResult::Child => {}
    }

    setsid().map_err(|e| step_err("setsid")(e.into()))?;

    // Give up session leadership so no controlling terminal can be acquired
    // SAFETY: still single-threaded
    match unsafe { fork() }.map_err(|e| step_err("second fork")(e.into()))? {
        // SAFETY: _exit skips destructors, leaving the shared lock fd alone
        ForkResult::Parent { .. } => unsafe { libc::_exit(0) },
        ForkResult::Child => {}
    }

    let null = OpenOptions::new()
        .read(true)
        .write(true)
        .open("/dev/null")
        .map_err(step_err("open /dev/null"))?;
    rustix::stdio::dup2_stdin(&null).map_err(|e| step_err("redirect stdin")(e.into()))?;
    rustix::stdio::dup2_stdout(&null).map_err(|e| step_err("redirect stdout")(e.into()))?;
    rustix::stdio::dup2_stderr(&null).map_err(|e| step_err("redirect stderr")(e.into()))?;

    rustix::process::chdir("/").map_err(|e| step_err("chdir /")(e.into()))?;

    Ok(())
}
