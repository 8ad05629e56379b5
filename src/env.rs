use std::collections::HashMap;
use std::env as stdenv;
use std::ffi::OsString;
use std::path::PathBuf;

/// Mutable, user-level view of the process environment used by the interpreter.
///
/// The environment contains:
/// - `vars`: variables handed to spawned programs; `PATH` and `HOME` are read from here.
/// - `current_dir`: the working directory tracked by `cd` and used for children.
/// - `should_exit`: set by the `exit` builtin, polled by the read-eval-print loop.
#[derive(Debug, Clone)]
pub struct Environment {
    /// Key-value store of environment variables (e.g., PATH, HOME).
    pub vars: HashMap<String, String>,
    /// The current working directory for command execution.
    pub current_dir: PathBuf,
    /// When set to true, the interactive loop stops after the current line.
    pub should_exit: bool,
}

impl Environment {
    /// Capture the current process state into a new `Environment` instance.
    pub fn new() -> Self {
        let current_dir = stdenv::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::with_vars(stdenv::vars().collect(), current_dir)
    }

    /// Build an environment from explicit variables, ignoring the process state.
    pub fn with_vars(vars: HashMap<String, String>, current_dir: PathBuf) -> Self {
        Self {
            vars,
            current_dir,
            should_exit: false,
        }
    }

    /// Get the value of an environment variable.
    pub fn get_var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }

    /// Set or override an environment variable in `self.vars`.
    pub fn set_var(&mut self, key: impl Into<String>, val: impl Into<String>) {
        self.vars.insert(key.into(), val.into());
    }

    /// Directories searched for external commands, in `PATH` list form.
    ///
    /// An unset `PATH` is treated like an empty one.
    pub fn search_paths(&self) -> OsString {
        self.get_var("PATH").map(OsString::from).unwrap_or_default()
    }

    /// The user's home directory, used for `~` expansion.
    pub fn home_dir(&self) -> Option<PathBuf> {
        self.get_var("HOME")
            .filter(|home| !home.is_empty())
            .map(PathBuf::from)
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}
