use crate::command::{CommandFactory, ExecutableCommand, ExitCode, Streams};
use crate::env::Environment;
use crate::interpreter::Factory;
use anyhow::{Result, bail};
use log::{debug, info};
use std::ffi::{OsStr, OsString};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};

/// Command that is not a builtin: a program found on disk.
pub struct ExternalCommand {
    /// Name the user typed; becomes `argv[0]` of the child.
    argv0: OsString,
    /// Resolved location of the executable.
    program: PathBuf,
    args: Vec<OsString>,
}

impl ExternalCommand {
    pub fn new(argv0: OsString, program: PathBuf, args: Vec<OsString>) -> Self {
        Self {
            argv0,
            program,
            args,
        }
    }
}

impl CommandFactory for Factory<ExternalCommand> {
    fn try_create(
        &self,
        env: &Environment,
        name: &str,
        args: &[&str],
    ) -> Option<Box<dyn ExecutableCommand>> {
        let program = find_command_path(&env.search_paths(), Path::new(name))?;
        debug!("resolved {name} to {}", program.display());
        Some(Box::new(ExternalCommand::new(
            name.into(),
            program,
            args.iter().map(|x| x.into()).collect(),
        )))
    }
}

impl ExecutableCommand for ExternalCommand {
    fn execute(self: Box<Self>, streams: Streams, env: &mut Environment) -> Result<ExitCode> {
        let mut cmd = std::process::Command::new(&self.program);
        set_argv0(&mut cmd, &self.argv0);
        let mut child = cmd
            .args(&self.args)
            .stdin(streams.stdin.stdio())
            .stdout(streams.stdout.stdio())
            .stderr(Stdio::inherit())
            .env_clear()
            .envs(env.vars.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .current_dir(&env.current_dir)
            .spawn()?;
        let exit_status = child.wait()?;
        info!("{} finished with {exit_status:?}", self.program.display());
        match exit_status.code() {
            Some(0) => Ok(0),
            Some(code) => bail!("exit status {code}"),
            None => bail!("{}", terminated_by_signal(exit_status)),
        }
    }
}

#[cfg(unix)]
fn set_argv0(cmd: &mut std::process::Command, argv0: &OsStr) {
    use std::os::unix::process::CommandExt;
    cmd.arg0(argv0);
}

#[cfg(not(unix))]
fn set_argv0(_cmd: &mut std::process::Command, _argv0: &OsStr) {}

#[cfg(unix)]
fn terminated_by_signal(exit_status: ExitStatus) -> String {
    use std::os::unix::process::ExitStatusExt;
    match exit_status.signal() {
        Some(signal) if exit_status.core_dumped() => format!("signal: {signal} (core dumped)"),
        Some(signal) => format!("signal: {signal}"),
        None => "terminated abnormally".to_string(),
    }
}

#[cfg(not(unix))]
fn terminated_by_signal(_exit_status: ExitStatus) -> String {
    "terminated abnormally".to_string()
}

/// Resolve a command name the way a typical shell would.
///
/// Behavior:
/// - A name with a path separator (`/bin/sh`, `./foo`, `bin/sh`) is checked as-is.
/// - A single path component is searched for in each directory of `search_paths` (PATH).
/// - Empty name: returns `None`.
///
/// Only executable regular files are ever returned.
pub fn find_command_path(search_paths: &OsStr, path: &Path) -> Option<PathBuf> {
    let mut components = path.components();
    match (components.next(), components.next()) {
        (None, _) => None,
        (Some(x), None) if !path.is_absolute() => find_in_path(search_paths, x.as_os_str()),
        _ => is_executable(path).then(|| path.to_path_buf()),
    }
}

/// Search each directory of a PATH-like list, in order, for an executable `cmd`.
///
/// Empty entries are skipped, so an empty list never matches anything.
pub fn find_in_path(search_paths: &OsStr, cmd: &OsStr) -> Option<PathBuf> {
    std::env::split_paths(search_paths)
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(|dir| dir.join(cmd))
        .find(|candidate| is_executable(candidate))
}

/// Is `path` a regular file with at least one execute permission bit set?
#[cfg(unix)]
pub fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    fs::metadata(path)
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
pub fn is_executable(path: &Path) -> bool {
    fs::metadata(path).map(|meta| meta.is_file()).unwrap_or(false)
}

/// Open (create or truncate) a file that receives a command's standard output.
pub fn open_redirect_target(target: &Path) -> Result<fs::File> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o644);
    }
    Ok(options.open(target)?)
}
