//! A minimal interactive shell with background job tracking.
//!
//! Lines are split into whitespace-separated tokens; the first token names the
//! command and a trailing `&` runs it in the background. Built-ins (`cd`, `exit`)
//! run in-process, everything else is spawned as a child process.
//!
//! Background children are kept in a [`registry::BackgroundRegistry`] until a
//! signal listener thread reaps them and prints a notice. On `exit` every tracked
//! child is terminated and the shell waits for all of its children before leaving.
//!
//! The main entry point is [`Interpreter`].

mod builtin;
pub mod command;
pub mod config;
pub mod dispatcher;
pub mod env;
pub mod error;
mod interpreter;
pub mod jobs;
pub mod lexer;
pub mod registry;
pub mod shutdown;
pub mod signals;

/// Just a convenient re-export of the interactive command runner.
///
/// See [`Interpreter`] for the high-level API and examples.
pub use interpreter::Interpreter;

pub use config::{Limits, ShellConfig};
pub use error::ShellError;
