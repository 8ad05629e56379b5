use anyhow::{Context, Result};
use argh::FromArgs;
use log::LevelFilter;
use minishell::Interpreter;
use minishell::line_reader::{Editor, LineSource, PlainLines};
use simplelog::{Config, WriteLogger};
use std::fs::File;
use std::io::{self, BufReader, IsTerminal};
use std::path::PathBuf;

#[derive(FromArgs)]
/// A minimal interactive shell with builtins, PATH lookup and stdout redirection.
struct Args {
    #[argh(option)]
    /// write diagnostic logs to this file; nothing is logged when omitted.
    log_file: Option<PathBuf>,

    #[argh(option, default = "LevelFilter::Info")]
    /// log verbosity: off, error, warn, info, debug or trace.
    log_level: LevelFilter,
}

fn init_logging(args: &Args) -> Result<()> {
    let Some(path) = &args.log_file else {
        return Ok(());
    };
    let file = File::create(path)
        .with_context(|| format!("can't create log file {}", path.display()))?;
    WriteLogger::init(args.log_level, Config::default(), file)?;
    Ok(())
}

fn main() -> Result<()> {
    let args: Args = argh::from_env();
    init_logging(&args)?;

    let mut source: Box<dyn LineSource> = if io::stdin().is_terminal() {
        Box::new(Editor::new()?)
    } else {
        Box::new(PlainLines::new(BufReader::new(io::stdin()), io::stdout()))
    };

    Interpreter::default().repl(source.as_mut())
}
