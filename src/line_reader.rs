//! Sources of input lines for the interactive loop.

use anyhow::Result;
use log::debug;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::io::{BufRead, Write};

/// Something that can show a prompt and hand back one line of input.
pub trait LineSource {
    /// Show `prompt` and read one line, without its line terminator.
    ///
    /// Returns `Ok(None)` once the input is exhausted. Any error ends the session.
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>>;
}

/// Line editor for interactive terminals, with in-memory history.
pub struct Editor {
    editor: DefaultEditor,
}

impl Editor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            editor: DefaultEditor::new()?,
        })
    }
}

impl LineSource for Editor {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        match self.editor.readline(prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    self.editor.add_history_entry(line.as_str())?;
                }
                Ok(Some(strip_line_ending(&line).to_string()))
            }
            Err(ReadlineError::Eof) => Ok(None),
            Err(ReadlineError::Interrupted) => {
                debug!("interrupted while reading");
                Ok(None)
            }
            Err(err) => Err(err.into()),
        }
    }
}

/// Plain reader for non-interactive input: the prompt goes to `output`,
/// lines come from `input`.
pub struct PlainLines<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> PlainLines<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl<R: BufRead, W: Write> LineSource for PlainLines<R, W> {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        write!(self.output, "{prompt}")?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(strip_line_ending(&line).to_string()))
    }
}

/// Drops every trailing `\n` and `\r`.
pub fn strip_line_ending(line: &str) -> &str {
    line.trim_end_matches(['\n', '\r'])
}
