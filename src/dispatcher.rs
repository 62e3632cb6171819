//! Launching of external programs in the foreground or the background.

use crate::command::{CommandFactory, ExecutableCommand, ExecutionMode, ExitCode};
use crate::env::Environment;
use crate::error::ShellError;
use crate::interpreter::Factory;
use crate::jobs::JobTable;
use anyhow::Result;
use nix::errno::Errno;
use nix::sys::signal::{Signal, kill};
use nix::sys::wait::{WaitStatus, waitpid};
use nix::unistd::Pid;
use std::borrow::Cow;
use std::ffi::{OsStr, OsString};
use std::io::{ErrorKind, Write};
use std::os::unix::fs::PermissionsExt;
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Exit code of a command whose program could not be found.
pub const NOT_FOUND: ExitCode = 127;
/// Exit code of a command whose program exists but could not be started.
pub const NOT_EXECUTABLE: ExitCode = 126;

/// Command that is not a builtin.
pub struct ExternalCommand {
    name: String,
    program: Option<PathBuf>,
    args: Vec<OsString>,
    mode: ExecutionMode,
}

impl ExternalCommand {
    pub fn new(
        name: String,
        program: Option<PathBuf>,
        args: Vec<OsString>,
        mode: ExecutionMode,
    ) -> Self {
        Self {
            name,
            program,
            args,
            mode,
        }
    }
}

impl CommandFactory for Factory<ExternalCommand> {
    fn try_create(
        &self,
        env: &Environment,
        name: &str,
        args: &[&str],
        mode: ExecutionMode,
    ) -> Option<Box<dyn ExecutableCommand>> {
        let search_paths = env.get_var("PATH").unwrap_or_default();
        let program =
            find_command_path(OsStr::new(&search_paths), Path::new(name)).map(Cow::into_owned);
        Some(Box::new(ExternalCommand::new(
            name.to_string(),
            program,
            args.iter().map(|x| x.into()).collect(),
            mode,
        )))
    }
}

impl ExecutableCommand for ExternalCommand {
    fn execute(
        self: Box<Self>,
        _stdout: &mut dyn Write,
        stderr: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        let Some(program) = &self.program else {
            writeln!(stderr, "{}: command not found", self.name)?;
            return Ok(NOT_FOUND);
        };

        let mut cmd = Command::new(program);
        cmd.args(&self.args)
            .envs(env.vars.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .current_dir(&env.current_dir);

        let outcome = match self.mode {
            ExecutionMode::Foreground => run_foreground(&mut cmd, &self.name, &env.jobs),
            ExecutionMode::Background => {
                spawn_background(&mut cmd, &self.name, &env.jobs).map(|_| 0)
            }
        };

        match outcome {
            Ok(code) => Ok(code),
            Err(ShellError::Spawn { command, source }) => {
                writeln!(stderr, "Exec Error: {}: {}", command, source)?;
                Ok(if source.kind() == ErrorKind::NotFound {
                    NOT_FOUND
                } else {
                    NOT_EXECUTABLE
                })
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Spawns `cmd` and blocks until that child exits.
///
/// The child's pid sits in the foreground slot for the whole wait so the interrupt
/// handler can forward Ctrl-C to it. Background children exiting meanwhile are left
/// to the reaper.
pub fn run_foreground(
    cmd: &mut Command,
    name: &str,
    jobs: &JobTable,
) -> Result<ExitCode, ShellError> {
    let child = cmd.spawn().map_err(|source| ShellError::Spawn {
        command: name.to_string(),
        source,
    })?;
    let pid = Pid::from_raw(child.id() as i32);

    jobs.foreground().set(pid);
    log::debug!("waiting for foreground process {} ({})", pid, name);
    let status = wait_for_exit(pid);
    jobs.foreground().clear();

    let code = exit_code(status?);
    log::debug!("foreground process {} exited with {}", pid, code);
    Ok(code)
}

/// Spawns `cmd` as the leader of a new process group and registers it as a background job.
///
/// The registry lock is held across the spawn, so the reaper cannot look for the
/// child before it is registered.
pub fn spawn_background(
    cmd: &mut Command,
    name: &str,
    jobs: &JobTable,
) -> Result<Pid, ShellError> {
    // own group: terminal-generated SIGINT must not reach background jobs
    cmd.process_group(0);

    let mut registry = jobs.background();
    let child = cmd.spawn().map_err(|source| ShellError::Spawn {
        command: name.to_string(),
        source,
    })?;
    let pid = Pid::from_raw(child.id() as i32);

    if let Err(e) = registry.insert(pid) {
        log::warn!("could not track background process {}, stopping it", pid);
        let _ = kill(pid, Signal::SIGKILL);
        let _ = wait_for_exit(pid);
        return Err(e);
    }
    log::debug!("started background process {} ({})", pid, name);
    Ok(pid)
}

/// Blocks until `pid` terminates, retrying when the wait is interrupted.
pub fn wait_for_exit(pid: Pid) -> Result<WaitStatus, ShellError> {
    loop {
        match waitpid(pid, None) {
            Ok(status @ (WaitStatus::Exited(..) | WaitStatus::Signaled(..))) => return Ok(status),
            Ok(_) | Err(Errno::EINTR) => continue,
            Err(e) => return Err(ShellError::Wait(e)),
        }
    }
}

/// Converts a wait status into a shell exit code.
pub fn exit_code(status: WaitStatus) -> ExitCode {
    match status {
        WaitStatus::Exited(_, code) => code,
        WaitStatus::Signaled(_, signal, _) => 128 + signal as i32,
        _ => -1,
    }
}

/// Resolve a command path the way a typical shell would.
///
/// Behavior:
/// - Absolute path: returns it if it exists.
/// - Relative with multiple components (e.g., `bin/sh`) or `./`-prefixed: returns it if it exists.
/// - Single path component (no separators): search each directory in `search_paths` (PATH)
///   and return the first existing match.
/// - Empty path: returns `None`.
///
/// Returns either a borrowed reference to the provided `path` or an owned `PathBuf`
/// when the result is discovered via PATH lookup.
pub fn find_command_path<'a>(search_paths: &OsStr, path: &'a Path) -> Option<Cow<'a, Path>> {
    if path.is_absolute() {
        return find_by_path(path).map(Cow::Borrowed);
    }

    if path.starts_with("./") && path.exists() {
        return Some(Cow::Borrowed(path));
    }

    let mut components = path.components();
    let first = components.next();
    let second = components.next();
    match (first, second) {
        (None, None) => None,
        (Some(x), None) => find_in_path(search_paths, x.as_os_str()).map(Cow::Owned),
        _ => find_by_path(path).map(Cow::Borrowed),
    }
}

/// Like `execvp`, entries that are not executable regular files are passed over.
fn find_in_path(search_paths: &OsStr, cmd: &OsStr) -> Option<PathBuf> {
    std::env::split_paths(search_paths)
        .map(|dir| dir.join(cmd))
        .find(|path| is_executable(path))
}

fn is_executable(path: &Path) -> bool {
    path.metadata()
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

fn find_by_path(path: &Path) -> Option<&Path> {
    if path.exists() { Some(path) } else { None }
}
