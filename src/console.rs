use core::{cell::RefCell, fmt::Display};
use std::{
    io::{self, Write},
    rc::Rc,
};

use tracing::error;

/// Line-oriented output shared by every routine.
///
/// Continuations have nowhere to return an I/O error to, so the first failed
/// write is kept and handed back by [`finish`](Self::finish). Writes after a
/// failure are dropped.
pub struct Console {
    sink: RefCell<Box<dyn Write>>,
    failure: RefCell<Option<io::Error>>,
}

impl Console {
    pub fn new(sink: impl Write + 'static) -> Self {
        Console {
            sink: RefCell::new(Box::new(sink)),
            failure: RefCell::new(None),
        }
    }

    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    /// A console writing into memory, plus a handle to read back what it
    /// wrote.
    pub fn capture() -> (Self, Transcript) {
        let transcript = Transcript::default();
        (Self::new(transcript.clone()), transcript)
    }

    pub fn log(&self, line: impl Display) {
        if self.failure.borrow().is_some() {
            return;
        }
        if let Err(err) = writeln!(self.sink.borrow_mut(), "{line}") {
            error!(%err, "console write failed");
            *self.failure.borrow_mut() = Some(err);
        }
    }

    /// Flushes the sink and reports the first write failure, if any.
    pub fn finish(&self) -> io::Result<()> {
        if let Some(err) = self.failure.borrow_mut().take() {
            return Err(err);
        }
        self.sink.borrow_mut().flush()
    }
}

/// In-memory sink behind [`Console::capture`].
#[derive(Clone, Default)]
pub struct Transcript {
    bytes: Rc<RefCell<Vec<u8>>>,
}

impl Transcript {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.bytes.borrow()).into_owned()
    }

    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_owned).collect()
    }
}

impl Write for Transcript {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Broken;

    impl Write for Broken {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn capture_records_lines() {
        let (console, transcript) = Console::capture();
        console.log("one");
        console.log(2);
        console.finish().unwrap();
        assert_eq!(transcript.contents(), "one\n2\n");
        assert_eq!(transcript.lines(), ["one", "2"]);
    }

    #[test]
    fn first_failure_is_reported_by_finish() {
        let console = Console::new(Broken);
        console.log("lost");
        console.log("also lost");
        let err = console.finish().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
        assert!(console.finish().is_ok());
    }
}
