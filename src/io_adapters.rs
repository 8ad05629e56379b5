use crate::command::{Stdin, Stdout};
use std::cell::RefCell;
use std::io::{Read, Result as IoResult, Write};
use std::process::Stdio;
use std::rc::Rc;

/// The shell's own standard input, handed to commands as-is.
///
/// It holds no lock: builtins read through a fresh handle on every call and
/// external programs inherit the descriptor.
pub(crate) struct InheritedStdin;

impl Read for InheritedStdin {
    fn read(&mut self, buf: &mut [u8]) -> IoResult<usize> {
        std::io::stdin().read(buf)
    }
}

impl Stdin for InheritedStdin {
    fn stdio(self: Box<Self>) -> Stdio {
        Stdio::inherit()
    }
}

/// Memory-backed writer for capturing the shell's stdout.
///
/// Every clone appends to the same buffer. External programs handed a
/// `MemWriter` get a null stdout since their output cannot be captured in-process.
#[derive(Clone, Default)]
pub struct MemWriter {
    buf: Rc<RefCell<Vec<u8>>>,
}

impl MemWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience: create writer and return (writer, rc_handle).
    pub fn with_handle() -> (Self, Rc<RefCell<Vec<u8>>>) {
        let mw = MemWriter::new();
        let rc = mw.buf.clone();
        (mw, rc)
    }
}

impl Write for MemWriter {
    fn write(&mut self, data: &[u8]) -> IoResult<usize> {
        self.buf.borrow_mut().extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> IoResult<()> {
        Ok(())
    }
}

impl Stdout for MemWriter {
    fn stdio(self: Box<Self>) -> Stdio {
        Stdio::null()
    }
}
