use crate::env::Environment;
use anyhow::Result;
use std::io::Write;

/// Conventional process exit code type used by this crate.
///
/// A value of 0 indicates success; any non-zero value indicates failure.
/// Children killed by a signal are reported as `128 + signal`, like POSIX shells do.
pub type ExitCode = i32;

/// How an external command is run relative to the shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// The shell blocks until the child exits.
    Foreground,
    /// The shell returns to the prompt at once and reaps the child later.
    Background,
}

/// Object-safe trait for any command that can be executed by the shell.
///
/// This is implemented by built-ins via a blanket impl and by external commands.
pub trait ExecutableCommand {
    /// Executes the command.
    ///
    /// Shell-side messages go to `stdout`; failures to launch a program go to `stderr`.
    fn execute(
        self: Box<Self>,
        stdout: &mut dyn Write,
        stderr: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode>;
}

/// Factory that tries to create a command from a name and its arguments.
///
/// Returns `None` when the factory doesn't recognize the `name`.
pub trait CommandFactory {
    /// Attempt to create a command instance for the provided name, arguments and mode.
    fn try_create(
        &self,
        env: &Environment,
        name: &str,
        args: &[&str],
        mode: ExecutionMode,
    ) -> Option<Box<dyn ExecutableCommand>>;
}
