//! A minimal interactive command shell.
//!
//! Each input line is split into words with POSIX-like quoting (single quotes, double
//! quotes, backslash escapes), then either handed to one of the builtins (`exit`,
//! `echo`, `type`, `pwd`, `cd`) or resolved on `PATH` and run as a child process whose
//! standard output may be redirected to a file with `>` or `1>`.
//!
//! The main entry point is [`Interpreter`]. The public modules [`command`] and [`env`]
//! expose traits and types for implementing your own commands and for interacting with
//! the process environment; [`line_reader`] provides the sources of input lines.

mod builtin;
pub mod command;
pub mod env;
mod external;
mod interpreter;
mod io_adapters;
mod lexer;
pub mod line_reader;
mod parser;

pub use builtin::{BUILTINS, is_builtin};
pub use external::find_in_path;
/// Just a convenient re-export of the interactive command runner.
///
/// See [`Interpreter`] for the high-level API and examples.
pub use interpreter::{Interpreter, PROMPT};
pub use lexer::split_into_tokens;
pub use parser::{Invocation, extract_redirection};
