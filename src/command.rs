//! The seams between the dispatch loop and the commands it runs.

use crate::env::Environment;
use anyhow::Result;
use std::io::{Read, Write};
use std::process::Stdio;

/// Exit status of a command: 0 for success, anything else for failure.
pub type ExitCode = i32;

/// Input side of a command. Builtins read it in-process; programs get it as a [`Stdio`].
pub trait Stdin: Read {
    fn stdio(self: Box<Self>) -> Stdio;
}

/// Output side of a command. Builtins write to it in-process; programs get it as a [`Stdio`].
///
/// Anything that is `Write + Into<Stdio>` qualifies, which covers both the shell's own
/// stdout and a file opened for redirection.
pub trait Stdout: Write {
    fn stdio(self: Box<Self>) -> Stdio;
}

impl<T: Write + Into<Stdio>> Stdout for T {
    fn stdio(self: Box<Self>) -> Stdio {
        (*self).into()
    }
}

/// Standard streams handed to a command for a single run.
///
/// Standard error is not part of it: both builtins and programs share the shell's.
pub struct Streams {
    pub stdin: Box<dyn Stdin>,
    pub stdout: Box<dyn Stdout>,
}

impl Streams {
    pub fn new(stdin: Box<dyn Stdin>, stdout: Box<dyn Stdout>) -> Self {
        Self { stdin, stdout }
    }
}

/// A command resolved by name and ready to run once.
pub trait ExecutableCommand {
    /// Runs the command to completion.
    ///
    /// Builtins report their own failures and return a non-zero code; an `Err`
    /// means a program could not be started or did not exit successfully.
    fn execute(self: Box<Self>, streams: Streams, env: &mut Environment) -> Result<ExitCode>;
}

/// Recognizes command names and builds the matching command.
///
/// The interpreter asks its factories in order; the first one returning `Some` wins.
pub trait CommandFactory {
    /// `None` when `name` is not something this factory handles.
    fn try_create(
        &self,
        env: &Environment,
        name: &str,
        args: &[&str],
    ) -> Option<Box<dyn ExecutableCommand>>;
}
