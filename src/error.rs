use thiserror::Error;

/// Errors raised by the shell itself, as opposed to failures of the commands it runs.
#[derive(Error, Debug)]
pub enum ShellError {
    #[error("input line is {len} bytes long, the limit is {max}")]
    LineTooLong { len: usize, max: usize },
    #[error("token is {len} bytes long, the limit is {max}")]
    TokenTooLong { len: usize, max: usize },
    #[error("too many tokens, the limit is {max}")]
    TooManyTokens { max: usize },
    #[error("out of memory while tracking process {0}")]
    ResourceExhausted(i32),
    #[error("Exec Error: {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("waiting for child processes failed: {0}")]
    Wait(#[source] nix::Error),
    #[error("signal handling failed: {0}")]
    Signal(#[source] nix::Error),
    #[error("failed to start the signal listener: {0}")]
    Listener(#[source] std::io::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("failed to read input: {0}")]
    Readline(#[from] rustyline::error::ReadlineError),
}
