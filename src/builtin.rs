use crate::command::{CommandFactory, ExecutableCommand, ExecutionMode, ExitCode};
use crate::env::Environment;
use crate::interpreter::Factory;
use crate::shutdown;
use anyhow::{Context, Result, anyhow};
use argh::{EarlyExit, FromArgs};
use std::env;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

/// Built-in commands known to the shell at compile time.
///
/// Builtins are parsed using the [`argh`] crate (`FromArgs`) and executed directly
/// in-process without spawning a child process. A trailing `&` has no effect on them.
pub(crate) trait BuiltinCommand: Sized + FromArgs {
    /// Canonical name of the command, e.g. "cd".
    fn name() -> &'static str;

    /// Executes the command using the provided output stream and environment.
    ///
    /// Return value should follow shell conventions: 0 for success, non-zero for error.
    fn execute(self, stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode>;
}

impl<T: BuiltinCommand> ExecutableCommand for T {
    fn execute(
        self: Box<Self>,
        stdout: &mut dyn Write,
        _stderr: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        match T::execute(*self, stdout, env) {
            Ok(x) => Ok(x),
            Err(e) => {
                writeln!(stdout, "{:#}", e)?;
                Ok(1)
            }
        }
    }
}

struct InvalidArgs {
    output: String,
    is_error: bool,
}

impl ExecutableCommand for InvalidArgs {
    fn execute(
        self: Box<Self>,
        stdout: &mut dyn Write,
        _stderr: &mut dyn Write,
        _env: &mut Environment,
    ) -> Result<ExitCode> {
        writeln!(stdout, "{}", self.output)?;
        Ok(if self.is_error { 1 } else { 0 })
    }
}

impl<T: BuiltinCommand + 'static> CommandFactory for Factory<T> {
    fn try_create(
        &self,
        _env: &Environment,
        name: &str,
        args: &[&str],
        mode: ExecutionMode,
    ) -> Option<Box<dyn ExecutableCommand>> {
        if name != T::name() {
            return None;
        }
        if mode == ExecutionMode::Background {
            log::debug!("running builtin '{}' in the foreground", name);
        }
        Some(match T::from_args(&[name], args) {
            Ok(cmd) => Box::new(cmd),
            Err(EarlyExit { output, status }) => Box::new(InvalidArgs {
                output,
                is_error: status.is_err(),
            }),
        })
    }
}

#[derive(FromArgs)]
/// Change the current working directory.
/// `~` stands for the home directory; with no target, changes to the home directory.
pub struct Cd {
    #[argh(positional, greedy)]
    /// directory to switch to; absolute, relative to the current directory, or starting with `~`.
    pub targets: Vec<String>,
}

impl Cd {
    fn resolve_target(&self, env: &Environment) -> Result<PathBuf> {
        let home = || env.home_dir().ok_or_else(|| anyhow!("cd: HOME not set"));
        match self.targets.as_slice() {
            [] => home(),
            [target] if target == "~" => home(),
            [target] => match target.strip_prefix("~/") {
                Some(rest) => Ok(home()?.join(rest)),
                None => Ok(PathBuf::from(target)),
            },
            _ => Err(anyhow!("cd: too many arguments")),
        }
    }
}

impl BuiltinCommand for Cd {
    fn name() -> &'static str {
        "cd"
    }

    fn execute(self, _stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        let target = self.resolve_target(env)?;

        let new_dir = if target.is_absolute() {
            target
        } else {
            env.current_dir.join(target)
        };

        let canonical = fs::canonicalize(&new_dir)
            .with_context(|| format!("cd: {}", new_dir.display()))?;

        env::set_current_dir(&canonical)
            .with_context(|| format!("cd: {}", canonical.display()))?;
        env.current_dir = canonical;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Terminate background processes, wait for every child and leave the shell.
pub struct Exit {
    #[argh(positional, greedy)]
    /// ignored.
    pub _args: Vec<String>,
}

impl BuiltinCommand for Exit {
    fn name() -> &'static str {
        "exit"
    }

    fn execute(self, stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        let reaped = shutdown::shutdown(&env.jobs, stdout)?;
        log::debug!("exit: {} children reaped", reaped);
        env.should_exit = true;
        Ok(0)
    }
}
