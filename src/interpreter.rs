use crate::command::{CommandFactory, ExecutionMode, ExitCode};
use crate::config::ShellConfig;
use crate::env::Environment;
use crate::error::ShellError;
use crate::jobs::JobTable;
use crate::{lexer, shutdown, signals};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::io::Write;
use std::sync::Arc;

/// Factory allows creating instances of ExecutableCommand.
///
/// Only supports commands defined in this crate: builtins and [`ExternalCommand`](crate::dispatcher::ExternalCommand).
pub(crate) struct Factory<T> {
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Default for Factory<T> {
    fn default() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

/// An interactive shell that runs built-ins in-process and external programs in the
/// foreground or, with a trailing `&`, in the background.
///
/// The interpreter maintains an [`Environment`] and a list of [`CommandFactory`] objects
/// that are queried to create commands by name. See [`Default`] for the built-in
/// factories included out of the box.
///
/// Example
/// ```
/// use job_shell::Interpreter;
/// let mut sh = Interpreter::default();
/// let code = sh
///     .execute_line("true", &mut std::io::sink(), &mut std::io::sink())
///     .unwrap();
/// assert_eq!(code, Some(0));
/// ```
pub struct Interpreter {
    env: Environment,
    commands: Vec<Box<dyn CommandFactory>>,
    config: ShellConfig,
}

impl Interpreter {
    /// Create a new interpreter with a custom set of command factories.
    pub fn new(config: ShellConfig, commands: Vec<Box<dyn CommandFactory>>) -> Self {
        let jobs = Arc::new(JobTable::with_buckets(config.registry_buckets));
        Self {
            env: Environment::new(jobs),
            commands,
            config,
        }
    }

    /// Create an interpreter with the default commands and the given settings.
    pub fn with_config(config: ShellConfig) -> Self {
        Self::new(config, default_commands())
    }

    pub fn environment(&self) -> &Environment {
        &self.env
    }

    pub fn environment_mut(&mut self) -> &mut Environment {
        &mut self.env
    }

    /// Run a single command invocation by name with arguments.
    ///
    /// Returns the command's exit code or an error if the command fails to execute.
    pub fn run(
        &mut self,
        name: &str,
        args: &[&str],
        mode: ExecutionMode,
        stdout: &mut dyn Write,
        stderr: &mut dyn Write,
    ) -> anyhow::Result<ExitCode> {
        for factory in &self.commands {
            if let Some(cmd) = factory.try_create(&self.env, name, args, mode) {
                return cmd.execute(stdout, stderr, &mut self.env);
            }
        }
        Err(anyhow::anyhow!("command not found: {}", name))
    }

    /// Tokenize and run one input line.
    ///
    /// Returns `Ok(None)` for a blank line. Only the first token names the command;
    /// a trailing `&` sends it to the background.
    pub fn execute_line(
        &mut self,
        line: &str,
        stdout: &mut dyn Write,
        stderr: &mut dyn Write,
    ) -> anyhow::Result<Option<ExitCode>> {
        let limits = &self.config.limits;
        if line.len() > limits.max_line_len {
            return Err(ShellError::LineTooLong {
                len: line.len(),
                max: limits.max_line_len,
            }
            .into());
        }

        let tokens = lexer::tokenize(line, limits)?;
        let (tokens, mode) = lexer::split_background(tokens);
        let Some((name, rest)) = tokens.split_first() else {
            return Ok(None);
        };
        let args: Vec<&str> = rest.iter().map(String::as_str).collect();
        self.run(name, &args, mode, stdout, stderr).map(Some)
    }

    /// Prompt in the form `<username>:<cwd>$ `.
    pub fn prompt(&self) -> String {
        format!(
            "{}:{}$ ",
            self.env.user_name(),
            self.env.current_dir.display()
        )
    }

    /// Read-Eval-Print Loop.
    ///
    /// Installs the signal listener, then reads lines until `exit` or end of input.
    /// Errors of a single line are reported and the loop goes on.
    pub fn repl(&mut self) -> Result<(), ShellError> {
        signals::install(Arc::clone(&self.env.jobs))?;
        let mut rl = DefaultEditor::new()?;

        while !self.env.should_exit {
            match rl.readline(&self.prompt()) {
                Ok(line) => {
                    if self.config.history && !line.trim().is_empty() {
                        rl.add_history_entry(line.as_str())?;
                    }
                    let mut stdout = std::io::stdout();
                    let mut stderr = std::io::stderr();
                    if let Err(e) = self.execute_line(&line, &mut stdout, &mut stderr) {
                        eprintln!("Error: {:#}", e);
                    }
                }
                Err(ReadlineError::Interrupted) => continue,
                Err(ReadlineError::Eof) => {
                    log::debug!("end of input, shutting down");
                    shutdown::shutdown(&self.env.jobs, &mut std::io::stdout())?;
                    self.env.should_exit = true;
                }
                Err(err) => {
                    shutdown::shutdown(&self.env.jobs, &mut std::io::stdout())?;
                    return Err(err.into());
                }
            }
        }

        Ok(())
    }
}

fn default_commands() -> Vec<Box<dyn CommandFactory>> {
    use crate::builtin::*;
    use crate::dispatcher::ExternalCommand;
    vec![
        Box::new(Factory::<Cd>::default()),
        Box::new(Factory::<Exit>::default()),
        Box::new(Factory::<ExternalCommand>::default()),
    ]
}

impl Default for Interpreter {
    /// Create an interpreter with the default settings and commands:
    /// - built-ins: `cd`, `exit`
    /// - external command launcher
    fn default() -> Self {
        Self::with_config(ShellConfig::default())
    }
}
