//! Turns a word list into an invocation: the arguments handed to the program
//! plus an optional standard-output redirection target.

/// Words that redirect standard output to the file named by the next word.
const STDOUT_REDIRECT_MARKERS: [&str; 2] = [">", "1>"];

/// A command ready to be dispatched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Command name followed by its arguments, redirection removed.
    pub argv: Vec<String>,
    /// File that should receive the command's standard output.
    pub stdout: Option<String>,
}

impl Invocation {
    /// An invocation that takes the words as they are, without looking for redirections.
    pub fn plain(argv: Vec<String>) -> Self {
        Self { argv, stdout: None }
    }

    pub fn name(&self) -> Option<&str> {
        self.argv.first().map(String::as_str)
    }

    /// Arguments after the command name.
    pub fn args(&self) -> Vec<&str> {
        self.argv.iter().skip(1).map(String::as_str).collect()
    }
}

/// Separates the first `>` / `1>` redirection from the words.
///
/// Everything before the marker stays as arguments, the word right after it
/// becomes the target, and whatever follows the target is dropped. Without a
/// marker the words are returned untouched.
pub fn extract_redirection(mut argv: Vec<String>) -> Invocation {
    let Some(marker) = argv
        .iter()
        .position(|word| STDOUT_REDIRECT_MARKERS.contains(&word.as_str()))
    else {
        return Invocation::plain(argv);
    };

    let stdout = argv.get(marker + 1).cloned();
    argv.truncate(marker);
    Invocation { argv, stdout }
}
