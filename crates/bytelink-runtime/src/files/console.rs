//! Console sinks for the standard output and error handles

use crate::config::ConsoleConfig;

/// Which console handle a line was written to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleStream {
    /// Handle 1
    Stdout,
    /// Handle 2
    Stderr,
}

/// Receives complete lines written to the console handles
pub trait ConsoleWriter: Send + Sync {
    /// Emit one line, without its trailing newline
    fn write_line(&self, stream: ConsoleStream, line: &str);
}

/// Forwards console lines to the `log` facade
#[derive(Debug, Clone)]
pub struct LogConsole {
    stdout_target: String,
    stderr_target: String,
}

impl LogConsole {
    /// Create a console logging to the configured targets
    pub fn new(config: &ConsoleConfig) -> Self {
        Self {
            stdout_target: config.stdout_target.clone(),
            stderr_target: config.stderr_target.clone(),
        }
    }
}

impl Default for LogConsole {
    fn default() -> Self {
        Self::new(&ConsoleConfig::default())
    }
}

impl ConsoleWriter for LogConsole {
    fn write_line(&self, stream: ConsoleStream, line: &str) {
        match stream {
            ConsoleStream::Stdout => log::info!(target: self.stdout_target.as_str(), "{}", line),
            ConsoleStream::Stderr => log::warn!(target: self.stderr_target.as_str(), "{}", line),
        }
    }
}

/// Line-buffering sink in front of a [`ConsoleWriter`]
#[derive(Debug)]
pub(crate) struct ConsoleSink {
    stream: ConsoleStream,
    pending: Vec<u8>,
}

impl ConsoleSink {
    pub(crate) fn new(stream: ConsoleStream) -> Self {
        Self {
            stream,
            pending: Vec::new(),
        }
    }

    /// Buffer bytes, emitting every completed line
    pub(crate) fn write(&mut self, bytes: &[u8], writer: &dyn ConsoleWriter) {
        for &b in bytes {
            if b == b'\n' {
                self.emit(writer);
            } else {
                self.pending.push(b);
            }
        }
    }

    /// Emit any partial line
    pub(crate) fn flush(&mut self, writer: &dyn ConsoleWriter) {
        if !self.pending.is_empty() {
            self.emit(writer);
        }
    }

    fn emit(&mut self, writer: &dyn ConsoleWriter) {
        let mut line = String::from_utf8_lossy(&self.pending).into_owned();
        if line.ends_with('\r') {
            line.pop();
        }
        writer.write_line(self.stream, &line);
        self.pending.clear();
    }
}
