//! Child-termination and interrupt handling.
//!
//! SIGCHLD and SIGINT are blocked in the main thread before any other thread is
//! started, so every thread inherits the mask and the kernel never runs an
//! asynchronous handler. A dedicated listener thread collects the pending signals
//! with `sigwait` and runs [`reap_background`] or [`interrupt_foreground`] in
//! ordinary thread context, where taking the registry mutex is allowed.

use crate::error::ShellError;
use crate::jobs::JobTable;
use nix::errno::Errno;
use nix::sys::signal::{SigSet, Signal, kill};
use nix::sys::wait::{WaitPidFlag, WaitStatus, waitpid};
use std::io::Write;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Line printed once for every background process that has been reaped.
pub const FINISHED_NOTICE: &str = "Shell: Background process finished";

fn handled_signals() -> SigSet {
    let mut set = SigSet::empty();
    set.add(Signal::SIGCHLD);
    set.add(Signal::SIGINT);
    set
}

/// Blocks the handled signals in the calling thread and starts the listener thread.
///
/// Must be called from the main thread before any other thread is spawned, otherwise
/// a thread with the signals unblocked could receive them instead of the listener.
/// Children started through `std::process::Command` get an empty signal mask, so
/// blocking here does not leak into them.
pub fn install(jobs: Arc<JobTable>) -> Result<JoinHandle<()>, ShellError> {
    let set = handled_signals();
    set.thread_block().map_err(ShellError::Signal)?;

    thread::Builder::new()
        .name("signal-listener".to_string())
        .spawn(move || listen(set, &jobs))
        .map_err(ShellError::Listener)
}

fn listen(set: SigSet, jobs: &JobTable) {
    loop {
        match set.wait() {
            Ok(Signal::SIGCHLD) => {
                let mut stdout = std::io::stdout();
                if let Err(e) = reap_background(jobs, &mut stdout) {
                    log::warn!("failed to announce finished background process: {}", e);
                }
            }
            Ok(Signal::SIGINT) => {
                interrupt_foreground(jobs);
            }
            Ok(other) => log::debug!("ignoring unexpected signal {:?}", other),
            Err(Errno::EINTR) => continue,
            Err(e) => {
                log::warn!("signal listener stopped: {}", e);
                return;
            }
        }
    }
}

/// Reaps every tracked background child that has terminated, without blocking.
///
/// Several children may exit before one SIGCHLD is handled, so all tracked pids
/// are polled on each call. Only registry members are waited on; the foreground
/// child is left to the thread blocked on it. Returns the number of notices written.
pub fn reap_background(jobs: &JobTable, out: &mut dyn Write) -> std::io::Result<usize> {
    let mut registry = jobs.background();
    let mut finished = 0;

    for pid in registry.pids() {
        match waitpid(pid, Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::Exited(..) | WaitStatus::Signaled(..)) => {
                registry.remove(pid);
                log::debug!("reaped background process {}", pid);
                writeln!(out, "{}", FINISHED_NOTICE)?;
                finished += 1;
            }
            Ok(_) => {}
            Err(Errno::ECHILD) => {
                // already collected by someone else
                log::debug!("background process {} is gone", pid);
                registry.remove(pid);
            }
            Err(e) => log::warn!("waitpid({}) failed: {}", pid, e),
        }
    }

    if finished > 0 {
        out.flush()?;
    }
    Ok(finished)
}

/// Forwards an interrupt to the foreground child as SIGTERM.
///
/// Returns whether a foreground process was signalled. With nothing in the
/// foreground the interrupt is dropped; the shell itself keeps running.
pub fn interrupt_foreground(jobs: &JobTable) -> bool {
    let Some(pid) = jobs.foreground().get() else {
        log::debug!("interrupt with no foreground process");
        return false;
    };
    match kill(pid, Signal::SIGTERM) {
        Ok(()) => {
            log::debug!("forwarded interrupt to foreground process {}", pid);
            true
        }
        Err(Errno::ESRCH) => false,
        Err(e) => {
            log::warn!("failed to signal foreground process {}: {}", pid, e);
            false
        }
    }
}
