//! Lexical analysis of a single input line into shell words.
//!
//! The lexer is a small finite state machine walking the line once, character by
//! character. It understands single quotes, double quotes and backslash escapes
//! and nothing else: there is no expansion, no operators and no line continuation.

/// Characters a backslash may escape inside a double-quoted region.
const DOUBLE_QUOTE_ESCAPABLE: [char; 4] = ['"', '\\', '$', '\n'];

struct LexingFSM {
    input: Vec<char>,
    pos: usize,
    in_single: bool,
    in_double: bool,
    has_content: bool,
    buffer: String,
}

impl LexingFSM {
    fn new(line: &str) -> Self {
        LexingFSM {
            input: line.chars().collect(),
            pos: 0,
            in_single: false,
            in_double: false,
            has_content: false,
            buffer: String::new(),
        }
    }

    /// Runs the machine over the whole line and returns the collected words.
    ///
    /// Unterminated quotes are not an error: whatever was collected so far is
    /// flushed as the last word.
    fn make_tokens(&mut self) -> Vec<String> {
        let mut out = Vec::new();

        while let Some(ch) = self.read_char() {
            match ch {
                '\\' if self.in_double => self.handle_double_quoted_escape(),
                '\\' if !self.in_single => self.handle_escape(),
                '\'' if !self.in_double => {
                    self.in_single = !self.in_single;
                    self.has_content = true;
                }
                '"' if !self.in_single => {
                    self.in_double = !self.in_double;
                    self.has_content = true;
                }
                ' ' | '\t' if !self.in_single && !self.in_double => self.flush(&mut out),
                c => self.push(c),
            }
        }

        self.flush(&mut out);
        out
    }

    fn read_char(&mut self) -> Option<char> {
        let ch = self.input.get(self.pos).copied();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    fn peek_char(&self) -> Option<char> {
        self.input.get(self.pos).copied()
    }

    /// Unquoted backslash: the next character is taken literally, whatever it is.
    /// A backslash at the very end of the line is dropped.
    fn handle_escape(&mut self) {
        if let Some(next) = self.read_char() {
            self.push(next);
        }
    }

    /// Backslash inside double quotes only escapes a handful of characters;
    /// before anything else it stays in the word.
    fn handle_double_quoted_escape(&mut self) {
        match self.peek_char() {
            Some(next) if DOUBLE_QUOTE_ESCAPABLE.contains(&next) => {
                self.read_char();
                self.push(next);
            }
            _ => self.push('\\'),
        }
    }

    fn push(&mut self, ch: char) {
        self.buffer.push(ch);
        self.has_content = true;
    }

    fn flush(&mut self, out: &mut Vec<String>) {
        if self.has_content {
            out.push(std::mem::take(&mut self.buffer));
            self.has_content = false;
        }
    }
}

/// Splits one input line into words, applying quote and escape rules.
///
/// Element 0 of the result is the command name. A line made only of spaces and
/// tabs produces an empty vector, while an empty quoted pair such as `''`
/// produces an empty word.
pub fn split_into_tokens(line: &str) -> Vec<String> {
    LexingFSM::new(line).make_tokens()
}
