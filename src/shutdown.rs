//! Orderly exit: stop every background job, then wait until no child is left.

use crate::error::ShellError;
use crate::jobs::JobTable;
use crate::registry::BackgroundRegistry;
use crate::signals::FINISHED_NOTICE;
use nix::errno::Errno;
use nix::sys::signal::{Signal, kill};
use nix::sys::wait::waitpid;
use nix::unistd::Pid;
use std::io::Write;

/// Sends SIGTERM to every tracked pid and returns how many were signalled.
///
/// Pids stay in the registry; they are removed when their exit is collected.
pub fn terminate_all(registry: &BackgroundRegistry) -> usize {
    let mut signalled = 0;
    registry.for_each(|pid| match kill(pid, Signal::SIGTERM) {
        Ok(()) => signalled += 1,
        Err(Errno::ESRCH) => log::debug!("background process {} already exited", pid),
        Err(e) => log::warn!("failed to terminate background process {}: {}", pid, e),
    });
    signalled
}

/// Terminates all background jobs and blocks until every child of the shell is reaped.
///
/// The registry lock is held for the whole protocol, which keeps the signal
/// listener from reaping concurrently: every tracked pid is announced exactly once,
/// here. Returns the number of children reaped.
pub fn shutdown(jobs: &JobTable, out: &mut dyn Write) -> Result<usize, ShellError> {
    let mut registry = jobs.background();
    let signalled = terminate_all(&registry);
    log::debug!("shutdown: sent SIGTERM to {} background processes", signalled);

    let mut reaped = 0;
    loop {
        match waitpid(Pid::from_raw(-1), None) {
            Ok(status) => {
                let Some(pid) = status.pid() else { continue };
                reaped += 1;
                if registry.remove(pid) {
                    writeln!(out, "{}", FINISHED_NOTICE)?;
                }
                log::debug!("shutdown: reaped {}", pid);
            }
            Err(Errno::EINTR) => continue,
            Err(Errno::ECHILD) => break,
            Err(e) => return Err(ShellError::Wait(e)),
        }
    }

    for pid in registry.pids() {
        log::debug!("shutdown: dropping stale entry {}", pid);
        registry.remove(pid);
    }
    out.flush()?;
    Ok(reaped)
}
