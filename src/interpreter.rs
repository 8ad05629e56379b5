use crate::builtin::is_builtin;
use crate::command::{CommandFactory, ExecutableCommand, ExitCode, Stdout, Streams};
use crate::env::Environment;
use crate::external::open_redirect_target;
use crate::io_adapters::{InheritedStdin, MemWriter};
use crate::lexer;
use crate::line_reader::LineSource;
use crate::parser::{self, Invocation};
use anyhow::{Context, anyhow};
use log::{debug, info, warn};
use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

/// Text shown before every line is read.
pub const PROMPT: &str = "$ ";

/// Factory allows creating instances of ExecutableCommand.
///
/// Only support commands defined in this crate — BuiltinCommand and ExternalCommand.
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

/// Where the shell's own messages and builtin output go.
enum Output {
    Inherited,
    Captured(MemWriter),
}

impl Output {
    fn stdout(&self) -> Box<dyn Stdout> {
        match self {
            Output::Inherited => Box::new(std::io::stdout()),
            Output::Captured(writer) => Box::new(writer.clone()),
        }
    }
}

/// A minimal interactive shell that can execute built-in and external commands.
///
/// The interpreter maintains an [`Environment`] and a list of [`CommandFactory`] objects
/// that are queried, in order, to create commands by name. See [`Default`] for the
/// factories included out of the box.
///
/// Example
/// ```
/// use minishell::Interpreter;
/// let (mut sh, output) = Interpreter::default().with_captured_output();
/// sh.execute_line(r#"echo 'hello   world' "again""#).unwrap();
/// assert_eq!(output.borrow().as_slice(), b"hello   world again\n");
/// ```
pub struct Interpreter {
    env: Environment,
    commands: Vec<Box<dyn CommandFactory>>,
    output: Output,
}

impl Interpreter {
    /// Create a new interpreter with a custom set of command factories.
    pub fn new(commands: Vec<Box<dyn CommandFactory>>) -> Self {
        Self {
            env: Environment::new(),
            commands,
            output: Output::Inherited,
        }
    }

    /// Replace the environment captured from the process.
    pub fn with_environment(mut self, env: Environment) -> Self {
        self.env = env;
        self
    }

    /// Send the shell's messages and builtin output to an in-memory buffer.
    ///
    /// External programs without a redirection get a null stdout in this mode.
    pub fn with_captured_output(mut self) -> (Self, Rc<RefCell<Vec<u8>>>) {
        let (writer, handle) = MemWriter::with_handle();
        self.output = Output::Captured(writer);
        (self, handle)
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// Run a single command invocation by name with arguments.
    ///
    /// No tokenization or redirection takes place. Returns the command's exit code or
    /// an error if no factory knows the command or it fails to execute.
    pub fn run(&mut self, name: &str, args: &[&str]) -> anyhow::Result<ExitCode> {
        let cmd = self
            .create(name, args)
            .ok_or_else(|| anyhow!("{name}: command not found"))?;
        let streams = Streams::new(Box::new(InheritedStdin), self.output.stdout());
        cmd.execute(streams, &mut self.env)
    }

    /// Read-eval-print loop: prompt, read a line, run it, until input ends or `exit` runs.
    ///
    /// Failing to read is treated like the end of input.
    pub fn repl(&mut self, source: &mut dyn LineSource) -> anyhow::Result<()> {
        info!("session started in {}", self.env.current_dir.display());
        while !self.env.should_exit {
            let line = match source.read_line(PROMPT) {
                Ok(Some(line)) => line,
                Ok(None) => {
                    info!("end of input");
                    break;
                }
                Err(err) => {
                    warn!("failed to read input: {err:#}");
                    break;
                }
            };
            if let Err(err) = self.execute_line(&line) {
                warn!("failed to report command result: {err:#}");
            }
        }
        Ok(())
    }

    /// Tokenize and run one line of input.
    ///
    /// Blank lines do nothing. A command name containing `/` is run from that path
    /// directly; any other non-builtin name is searched for on `PATH`.
    ///
    /// Command failures are reported on the shell's stdout and are not errors; an
    /// `Err` means that report itself could not be written.
    pub fn execute_line(&mut self, line: &str) -> anyhow::Result<ExitCode> {
        let words = lexer::split_into_tokens(line);
        debug!("tokens: {words:?}");
        let Some(name) = words.first().cloned() else {
            return Ok(0);
        };

        // Builtins take every word literally; only programs get redirections.
        let invocation = if is_builtin(&name) {
            Invocation::plain(words)
        } else {
            parser::extract_redirection(words)
        };
        self.dispatch(&name, invocation)
    }

    fn dispatch(&mut self, name: &str, invocation: Invocation) -> anyhow::Result<ExitCode> {
        let mut report = self.output.stdout();
        let Some(cmd) = self.create(name, &invocation.args()) else {
            writeln!(report, "{name}: command not found")?;
            return Ok(127);
        };

        let stdout: Box<dyn Stdout> = match &invocation.stdout {
            Some(target) => {
                debug!("redirecting stdout of {name} to {target}");
                match open_redirect_target(&self.env.current_dir.join(target))
                    .with_context(|| target.clone())
                {
                    Ok(file) => Box::new(file),
                    Err(err) => {
                        writeln!(report, "{name}: {err:#}")?;
                        return Ok(1);
                    }
                }
            }
            None => self.output.stdout(),
        };

        match cmd.execute(Streams::new(Box::new(InheritedStdin), stdout), &mut self.env) {
            Ok(code) => Ok(code),
            Err(err) => {
                debug!("{name} failed: {err:#}");
                writeln!(report, "{name}: {err:#}")?;
                Ok(1)
            }
        }
    }

    fn create(&self, name: &str, args: &[&str]) -> Option<Box<dyn ExecutableCommand>> {
        self.commands
            .iter()
            .find_map(|factory| factory.try_create(&self.env, name, args))
    }
}

impl Default for Interpreter {
    /// Create an interpreter with the default set of commands:
    /// - built-ins: `pwd`, `cd`, `echo`, `exit`, `type`
    /// - external command launcher
    fn default() -> Self {
        use crate::builtin::*;
        use crate::external::ExternalCommand;
        Self::new(vec![
            Box::new(Factory::<Pwd>::default()),
            Box::new(Factory::<Cd>::default()),
            Box::new(Factory::<Echo>::default()),
            Box::new(Factory::<Exit>::default()),
            Box::new(Factory::<Type>::default()),
            Box::new(Factory::<ExternalCommand>::default()),
        ])
    }
}
