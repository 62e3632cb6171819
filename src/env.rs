use crate::jobs::JobTable;
use std::collections::HashMap;
use std::env as stdenv;
use std::path::PathBuf;
use std::sync::Arc;

/// Mutable, user-level view of the process environment used by the interpreter.
///
/// The environment contains:
/// - `vars`: a map of environment variables that will be visible to executed commands.
/// - `current_dir`: the working directory for command execution.
/// - `should_exit`: set by `exit` once shutdown has finished.
/// - `jobs`: the background registry and foreground slot shared with the signal listener.
#[derive(Debug, Clone)]
pub struct Environment {
    /// Key-value store of environment variables (e.g., PATH, HOME).
    pub vars: HashMap<String, String>,
    /// The current working directory for command execution.
    pub current_dir: PathBuf,
    /// When set to true, indicates that an interactive loop should exit.
    pub should_exit: bool,
    pub jobs: Arc<JobTable>,
}

impl Environment {
    /// Capture the current process state into a new `Environment` instance.
    ///
    /// This copies variables from `std::env::vars()` and initializes `current_dir`
    /// from `std::env::current_dir()`.
    pub fn new(jobs: Arc<JobTable>) -> Self {
        let vars = stdenv::vars().collect();
        let current_dir = stdenv::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self {
            vars,
            current_dir,
            should_exit: false,
            jobs,
        }
    }

    /// Get the value of an environment variable.
    ///
    /// Looks up the key in `self.vars` first, falling back to `std::env::var`.
    pub fn get_var(&self, key: &str) -> Option<String> {
        self.vars
            .get(key)
            .cloned()
            .or_else(|| stdenv::var(key).ok())
    }

    /// Set or override an environment variable in `self.vars`.
    pub fn set_var(&mut self, key: impl Into<String>, val: impl Into<String>) {
        self.vars.insert(key.into(), val.into());
    }

    /// Home directory of the invoking user: `$HOME`, then the password database.
    pub fn home_dir(&self) -> Option<PathBuf> {
        self.get_var("HOME")
            .filter(|h| !h.is_empty())
            .map(PathBuf::from)
            .or_else(dirs::home_dir)
    }

    /// Login name shown in the prompt.
    pub fn user_name(&self) -> String {
        self.get_var("USER")
            .or_else(|| self.get_var("LOGNAME"))
            .filter(|u| !u.is_empty())
            .or_else(|| {
                nix::unistd::User::from_uid(nix::unistd::getuid())
                    .ok()
                    .flatten()
                    .map(|u| u.name)
            })
            .unwrap_or_else(|| "?".to_string())
    }
}
