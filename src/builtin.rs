use crate::command::{CommandFactory, ExecutableCommand, ExitCode, Streams};
use crate::env::Environment;
use crate::external::find_command_path;
use crate::interpreter::Factory;
use anyhow::{Context, Result, anyhow};
use argh::{EarlyExit, FromArgs};
use log::debug;
use std::env;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// Names of every command the shell implements itself.
pub const BUILTINS: &[&str] = &["exit", "echo", "type", "pwd", "cd"];

/// Is `name` one of [`BUILTINS`]?
pub fn is_builtin(name: &str) -> bool {
    BUILTINS.contains(&name)
}

/// Built-in commands known to the shell at compile time.
///
/// Builtins implement [`argh`]'s `FromArgs` by hand and accept every word literally,
/// so `help`, `--help` or `-x` reach the command instead of producing usage text.
/// They run in-process without spawning a child process.
pub(crate) trait BuiltinCommand: Sized + FromArgs {
    /// Canonical name of the command, e.g. "echo" or "cd".
    fn name() -> &'static str;

    /// Executes the command using provided IO streams and environment.
    ///
    /// Return value should follow shell conventions: 0 for success, non-zero for error.
    fn execute(
        self,
        stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode>;
}

impl<T: BuiltinCommand> ExecutableCommand for T {
    fn execute(self: Box<Self>, streams: Streams, env: &mut Environment) -> Result<ExitCode> {
        let Streams {
            mut stdin,
            mut stdout,
        } = streams;
        match <T as BuiltinCommand>::execute(*self, &mut stdin, &mut stdout, env) {
            Ok(x) => Ok(x),
            Err(e) => {
                debug!("{} failed: {e:#}", T::name());
                writeln!(stdout, "{e:#}")?;
                Ok(1)
            }
        }
    }
}

impl<T: BuiltinCommand + 'static> CommandFactory for Factory<T> {
    fn try_create(
        &self,
        _env: &Environment,
        name: &str,
        args: &[&str],
    ) -> Option<Box<dyn ExecutableCommand>> {
        if name != T::name() {
            return None;
        }
        match T::from_args(&[name], args) {
            Ok(cmd) => Some(Box::new(cmd)),
            Err(EarlyExit { output, .. }) => {
                debug!("{name}: rejected arguments: {output}");
                None
            }
        }
    }
}

/// Print the current working directory to standard output. Arguments are ignored.
pub struct Pwd {}

impl FromArgs for Pwd {
    fn from_args(_command_name: &[&str], _args: &[&str]) -> Result<Self, EarlyExit> {
        Ok(Self {})
    }
}

impl BuiltinCommand for Pwd {
    fn name() -> &'static str {
        "pwd"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        _env: &mut Environment,
    ) -> Result<ExitCode> {
        let cwd = env::current_dir().context("pwd: error retrieving current directory")?;
        writeln!(stdout, "{}", cwd.display())?;
        Ok(0)
    }
}

/// Change the current working directory.
/// `~` stands for the home directory and `~/` starts a path relative to it.
pub struct Cd {
    /// First word after `cd`; later words are ignored.
    pub target: Option<String>,
}

impl FromArgs for Cd {
    fn from_args(_command_name: &[&str], args: &[&str]) -> Result<Self, EarlyExit> {
        Ok(Self {
            target: args.first().map(|a| a.to_string()),
        })
    }
}

impl Cd {
    /// Expand a leading `~` / `~/` against `HOME`.
    fn expand_tilde(target: &str, env: &Environment) -> Result<PathBuf> {
        let home = || {
            env.home_dir()
                .ok_or_else(|| anyhow!("cd: could not determine home directory"))
        };
        if target == "~" {
            home()
        } else if let Some(rest) = target.strip_prefix("~/") {
            Ok(home()?.join(rest))
        } else {
            Ok(PathBuf::from(target))
        }
    }
}

impl BuiltinCommand for Cd {
    fn name() -> &'static str {
        "cd"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        _stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        let Some(target) = self.target else {
            return Ok(0);
        };

        let expanded = Self::expand_tilde(&target, env)?;
        let new_dir = env.current_dir.join(expanded);

        // Errors name what the user typed, never the expanded path.
        let not_found = || anyhow!("cd: {target}: No such file or directory");
        let canonical = fs::canonicalize(&new_dir).map_err(|_| not_found())?;
        env::set_current_dir(&canonical).map_err(|_| not_found())?;
        debug!("cd: now in {}", canonical.display());
        env.current_dir = canonical;
        Ok(0)
    }
}

/// Exit the shell. The status is always 0, whatever words follow.
pub struct Exit {}

impl FromArgs for Exit {
    fn from_args(_command_name: &[&str], _args: &[&str]) -> Result<Self, EarlyExit> {
        Ok(Self {})
    }
}

impl BuiltinCommand for Exit {
    fn name() -> &'static str {
        "exit"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        _stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        env.should_exit = true;
        Ok(0)
    }
}

/// Write the arguments to standard output, separated by spaces and followed by a newline.
///
/// Every argument is printed as-is; `echo` has no options.
pub struct Echo {
    pub args: Vec<String>,
}

impl FromArgs for Echo {
    fn from_args(_command_name: &[&str], args: &[&str]) -> Result<Self, EarlyExit> {
        Ok(Self {
            args: args.iter().map(|a| a.to_string()).collect(),
        })
    }
}

impl BuiltinCommand for Echo {
    fn name() -> &'static str {
        "echo"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        _env: &mut Environment,
    ) -> Result<ExitCode> {
        writeln!(stdout, "{}", self.args.join(" "))?;
        Ok(0)
    }
}

/// Tell how each name would be interpreted if used as a command.
///
/// A name containing `/` is checked directly rather than searched for on `PATH`,
/// the same way the dispatcher resolves it.
pub struct Type {
    pub names: Vec<String>,
}

impl FromArgs for Type {
    fn from_args(_command_name: &[&str], args: &[&str]) -> Result<Self, EarlyExit> {
        Ok(Self {
            names: args.iter().map(|a| a.to_string()).collect(),
        })
    }
}

impl BuiltinCommand for Type {
    fn name() -> &'static str {
        "type"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        let search_paths = env.search_paths();
        let mut code = 0;
        for name in &self.names {
            if is_builtin(name) {
                writeln!(stdout, "{name} is a shell builtin")?;
            } else if let Some(path) = find_command_path(&search_paths, Path::new(name)) {
                writeln!(stdout, "{name} is {}", path.display())?;
            } else {
                writeln!(stdout, "{name}: not found")?;
                code = 1;
            }
        }
        Ok(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io_adapters::{InheritedStdin, MemWriter};
    use crate::test_support::lock_current_dir;
    use std::collections::HashMap;
    use std::env as stdenv;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn env_with(vars: &[(&str, &str)]) -> Environment {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Environment::with_vars(vars, stdenv::current_dir().unwrap())
    }

    fn env_with_dir(dir: &Path) -> Environment {
        Environment::with_vars(HashMap::new(), dir.to_path_buf())
    }

    fn run<T: BuiltinCommand>(cmd: T, env: &mut Environment) -> (Result<ExitCode>, String) {
        let mut out = Vec::new();
        let res = BuiltinCommand::execute(cmd, &mut Cursor::new(Vec::new()), &mut out, env);
        (res, String::from_utf8(out).unwrap())
    }

    /// Create `T` through its factory from raw words and run it like the dispatcher does.
    fn dispatch<T: BuiltinCommand + 'static>(
        args: &[&str],
        env: &mut Environment,
    ) -> (ExitCode, String) {
        let cmd = Factory::<T>::default()
            .try_create(env, T::name(), args)
            .expect("factory should accept its own name");
        let (out, handle) = MemWriter::with_handle();
        let code = cmd
            .execute(Streams::new(Box::new(InheritedStdin), Box::new(out)), env)
            .unwrap();
        let text = String::from_utf8(handle.borrow().clone()).unwrap();
        (code, text)
    }

    #[test]
    fn test_builtin_table() {
        for name in ["exit", "echo", "type", "pwd", "cd"] {
            assert!(is_builtin(name), "{name} should be a builtin");
        }
        assert!(!is_builtin("ls"));
        assert!(!is_builtin("Echo"));
    }

    #[test]
    fn test_pwd_prints_current_dir() {
        let _lock = lock_current_dir();
        let cur = stdenv::current_dir().unwrap();
        let mut env = env_with(&[]);

        let (res, out) = run(Pwd {}, &mut env);

        assert_eq!(res.unwrap(), 0);
        assert_eq!(out, format!("{}\n", cur.display()));
    }

    #[test]
    fn test_echo_joins_arguments() {
        let mut env = env_with(&[]);
        let echo = Echo::from_args(&["echo"], &["hello", "", "-n", "--help"]).unwrap();

        let (res, out) = run(echo, &mut env);

        assert_eq!(res.unwrap(), 0);
        assert_eq!(out, "hello  -n --help\n");
    }

    #[test]
    fn test_echo_without_arguments_prints_newline() {
        let mut env = env_with(&[]);
        let (_, out) = run(Echo { args: Vec::new() }, &mut env);
        assert_eq!(out, "\n");
    }

    #[test]
    fn test_exit_sets_flag() {
        let mut env = env_with(&[]);
        let exit = Exit::from_args(&["exit"], &["3"]).unwrap();
        let (res, _) = run(exit, &mut env);
        assert_eq!(res.unwrap(), 0);
        assert!(env.should_exit);
    }

    #[test]
    fn test_cd_to_absolute_path() {
        let _lock = lock_current_dir();
        let temp = TempDir::new().unwrap();
        let canonical_temp = fs::canonicalize(temp.path()).unwrap();
        let orig = stdenv::current_dir().unwrap();
        let mut env = env_with(&[]);

        let target = Some(canonical_temp.to_string_lossy().to_string());
        let (res, _) = run(Cd { target }, &mut env);

        let new_cwd = stdenv::current_dir().unwrap();
        stdenv::set_current_dir(&orig).expect("failed to restore cwd");

        assert_eq!(res.unwrap(), 0);
        assert_eq!(fs::canonicalize(new_cwd).unwrap(), canonical_temp);
        assert_eq!(env.current_dir, canonical_temp);
    }

    #[test]
    fn test_cd_relative_to_tracked_dir() {
        let _lock = lock_current_dir();
        let temp = TempDir::new().unwrap();
        let canonical_temp = fs::canonicalize(temp.path()).unwrap();
        fs::create_dir(canonical_temp.join("inner")).unwrap();
        let orig = stdenv::current_dir().unwrap();
        let mut env = Environment::with_vars(HashMap::new(), canonical_temp.clone());

        let (res, _) = run(Cd { target: Some("inner".into()) }, &mut env);
        stdenv::set_current_dir(&orig).expect("failed to restore cwd");

        assert_eq!(res.unwrap(), 0);
        assert_eq!(env.current_dir, canonical_temp.join("inner"));
    }

    #[test]
    fn test_cd_tilde_goes_home() {
        let _lock = lock_current_dir();
        let temp = TempDir::new().unwrap();
        let canonical_temp = fs::canonicalize(temp.path()).unwrap();
        fs::create_dir(canonical_temp.join("docs")).unwrap();
        let orig = stdenv::current_dir().unwrap();
        let home = canonical_temp.to_string_lossy().to_string();
        let mut env = env_with(&[("HOME", &home)]);

        let (res, _) = run(Cd { target: Some("~".into()) }, &mut env);
        assert_eq!(res.unwrap(), 0);
        assert_eq!(env.current_dir, canonical_temp);

        let (res, _) = run(Cd { target: Some("~/docs".into()) }, &mut env);
        stdenv::set_current_dir(&orig).expect("failed to restore cwd");

        assert_eq!(res.unwrap(), 0);
        assert_eq!(env.current_dir, canonical_temp.join("docs"));
    }

    #[test]
    fn test_cd_nonexistent_path_names_typed_target() {
        let _lock = lock_current_dir();
        let orig = stdenv::current_dir().unwrap();
        let mut env = env_with(&[("HOME", "/definitely/not/here")]);

        let (res, _) = run(Cd { target: Some("~/nowhere".into()) }, &mut env);

        let err = res.unwrap_err();
        assert_eq!(err.to_string(), "cd: ~/nowhere: No such file or directory");
        assert_eq!(stdenv::current_dir().unwrap(), orig);
        assert_eq!(env.current_dir, orig);
    }

    #[test]
    fn test_cd_tilde_without_home() {
        let _lock = lock_current_dir();
        let mut env = env_with(&[]);
        let (res, _) = run(Cd { target: Some("~".into()) }, &mut env);
        assert_eq!(
            res.unwrap_err().to_string(),
            "cd: could not determine home directory"
        );
    }

    #[test]
    fn test_cd_without_target_is_noop() {
        let _lock = lock_current_dir();
        let orig = stdenv::current_dir().unwrap();
        let mut env = env_with(&[("HOME", "/")]);
        let (res, _) = run(Cd { target: None }, &mut env);
        assert_eq!(res.unwrap(), 0);
        assert_eq!(stdenv::current_dir().unwrap(), orig);
    }

    #[test]
    #[cfg(unix)]
    fn test_type_reports_builtin_path_and_missing() {
        use std::os::unix::fs::PermissionsExt;
        let bin = TempDir::new().unwrap();
        for name in ["echo", "greet"] {
            let path = bin.path().join(name);
            fs::write(&path, "#!/bin/sh\n").unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        }
        let path_var = bin.path().to_string_lossy().to_string();
        let mut env = env_with(&[("PATH", &path_var)]);
        let ty = Type::from_args(&["type"], &["echo", "greet", "nosuchcmd"]).unwrap();

        let (res, out) = run(ty, &mut env);

        assert_eq!(res.unwrap(), 1);
        let expected = format!(
            "echo is a shell builtin\ngreet is {}\nnosuchcmd: not found\n",
            bin.path().join("greet").display()
        );
        assert_eq!(out, expected);
    }

    #[test]
    fn test_type_without_names_prints_nothing() {
        let mut env = env_with(&[]);
        let (res, out) = run(Type { names: Vec::new() }, &mut env);
        assert_eq!(res.unwrap(), 0);
        assert!(out.is_empty());
    }

    #[test]
    fn test_factory_ignores_other_names() {
        let env = env_with(&[]);
        assert!(Factory::<Cd>::default().try_create(&env, "pwd", &[]).is_none());
    }

    #[test]
    fn test_exit_ignores_help_words() {
        for words in [&["help"][..], &["--help"][..], &["-h", "1"][..]] {
            let mut env = env_with(&[]);
            let (code, out) = dispatch::<Exit>(words, &mut env);
            assert_eq!(code, 0);
            assert!(out.is_empty(), "unexpected output for {words:?}: {out}");
            assert!(env.should_exit);
        }
    }

    #[test]
    fn test_pwd_ignores_extra_words() {
        let _lock = lock_current_dir();
        let cur = stdenv::current_dir().unwrap();
        let mut env = env_with(&[]);
        let (code, out) = dispatch::<Pwd>(&["extra", "--help"], &mut env);
        assert_eq!(code, 0);
        assert_eq!(out, format!("{}\n", cur.display()));
    }

    #[test]
    #[cfg(unix)]
    fn test_pwd_reports_removed_directory() {
        let _lock = lock_current_dir();
        let orig = stdenv::current_dir().unwrap();
        let temp = TempDir::new().unwrap();
        let doomed = temp.path().join("doomed");
        fs::create_dir(&doomed).unwrap();
        stdenv::set_current_dir(&doomed).unwrap();
        fs::remove_dir(&doomed).unwrap();
        let mut env = env_with_dir(&orig);

        let (code, out) = dispatch::<Pwd>(&[], &mut env);
        stdenv::set_current_dir(&orig).expect("failed to restore cwd");

        assert_eq!(code, 1);
        assert!(
            out.starts_with("pwd: error retrieving current directory: "),
            "unexpected output: {out}"
        );
        assert!(out.ends_with('\n'));
    }

    #[test]
    fn test_cd_into_directory_named_help() {
        let _lock = lock_current_dir();
        let temp = TempDir::new().unwrap();
        let canonical_temp = fs::canonicalize(temp.path()).unwrap();
        fs::create_dir(canonical_temp.join("help")).unwrap();
        let orig = stdenv::current_dir().unwrap();
        let mut env = env_with_dir(&canonical_temp);

        let (code, out) = dispatch::<Cd>(&["help", "extra"], &mut env);
        stdenv::set_current_dir(&orig).expect("failed to restore cwd");

        assert_eq!(code, 0);
        assert!(out.is_empty(), "unexpected output: {out}");
        assert_eq!(env.current_dir, canonical_temp.join("help"));
    }

    #[test]
    fn test_cd_dash_word_is_a_path() {
        let _lock = lock_current_dir();
        let temp = TempDir::new().unwrap();
        let orig = stdenv::current_dir().unwrap();
        let mut env = env_with_dir(temp.path());

        let (code, out) = dispatch::<Cd>(&["-x"], &mut env);

        assert_eq!(code, 1);
        assert_eq!(out, "cd: -x: No such file or directory\n");
        assert_eq!(stdenv::current_dir().unwrap(), orig);
    }

    #[test]
    fn test_type_help_is_not_found() {
        let mut env = env_with(&[]);
        let (code, out) = dispatch::<Type>(&["help", "--help"], &mut env);
        assert_eq!(code, 1);
        assert_eq!(out, "help: not found\n--help: not found\n");
    }
}
