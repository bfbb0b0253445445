//! Virtual synchronous file-handle table
//!
//! Guest file streams hold only an integer handle. Read handles are backed
//! by whole-file buffers fetched from a [`ByteSource`] at open time; handles
//! 1 and 2 are console sinks for standard output and standard error.
//!
//! Every I/O failure surfaces as the sentinel `-1`, never as an error.

mod console;
mod http;
mod source;

pub use console::{ConsoleStream, ConsoleWriter, LogConsole};
pub use http::HttpSource;
pub use source::{from_config, ByteSource, DirectorySource, FetchError, MemorySource};

use console::ConsoleSink;
use std::sync::Arc;

/// Standard output handle
pub const STDOUT_HANDLE: i32 = 1;

/// Standard error handle
pub const STDERR_HANDLE: i32 = 2;

/// First handle number handed out by `open_for_read`
pub const FIRST_DYNAMIC_HANDLE: i32 = 3;

/// An open read handle
#[derive(Debug, Clone)]
pub struct FileHandle {
    position: usize,
    buffer: Vec<u8>,
}

impl FileHandle {
    /// Create a handle positioned at the start of `buffer`
    pub fn new(buffer: Vec<u8>) -> Self {
        Self {
            position: 0,
            buffer,
        }
    }

    /// Current read position
    pub fn position(&self) -> usize {
        self.position
    }

    /// Total size of the buffer
    pub fn size(&self) -> usize {
        self.buffer.len()
    }

    /// Bytes left to read
    pub fn remaining(&self) -> usize {
        self.buffer.len() - self.position
    }
}

#[derive(Debug)]
enum Slot {
    Console(ConsoleSink),
    Read(FileHandle),
}

/// Registry of pseudo file descriptors
pub struct FileTable {
    slots: Vec<Option<Slot>>,
    source: Arc<dyn ByteSource>,
    console: Arc<dyn ConsoleWriter>,
    enabled: bool,
}

impl FileTable {
    /// Create a table with the console handles registered. File opening
    /// stays disabled until [`FileTable::enable`].
    pub fn new(source: Arc<dyn ByteSource>, console: Arc<dyn ConsoleWriter>) -> Self {
        Self {
            slots: vec![
                None,
                Some(Slot::Console(ConsoleSink::new(ConsoleStream::Stdout))),
                Some(Slot::Console(ConsoleSink::new(ConsoleStream::Stderr))),
            ],
            source,
            console,
            enabled: false,
        }
    }

    /// Allow `open_for_read`
    pub fn enable(&mut self) {
        self.enabled = true;
    }

    /// Whether file I/O has been enabled
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// The byte source behind this table
    pub fn source(&self) -> &Arc<dyn ByteSource> {
        &self.source
    }

    fn read_handle(&mut self, handle: i32) -> Option<&mut FileHandle> {
        let slot = usize::try_from(handle)
            .ok()
            .and_then(|idx| self.slots.get_mut(idx))
            .and_then(|slot| slot.as_mut());
        match slot {
            Some(Slot::Read(fh)) => Some(fh),
            _ => {
                log::warn!("invalid read handle {}", handle);
                None
            }
        }
    }

    /// Fetch `path` and register a read handle for it.
    ///
    /// Returns the new handle, or `-1` if file I/O is disabled or the fetch
    /// failed; nothing is registered on failure.
    pub fn open_for_read(&mut self, path: &str) -> i32 {
        if !self.enabled {
            log::warn!("open {} before file I/O was enabled", path);
            return -1;
        }
        let buffer = match self.source.fetch(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                log::debug!("open {} failed: {}", path, e);
                return -1;
            }
        };

        let first = FIRST_DYNAMIC_HANDLE as usize;
        let index = match self.slots.iter().skip(first).position(|s| s.is_none()) {
            Some(offset) => first + offset,
            None => {
                self.slots.push(None);
                self.slots.len() - 1
            }
        };
        log::debug!("opened {} ({} bytes) as handle {}", path, buffer.len(), index);
        self.slots[index] = Some(Slot::Read(FileHandle::new(buffer)));
        index as i32
    }

    /// Probe whether `path` exists in the byte source
    pub fn exists(&self, path: &str) -> bool {
        self.enabled && self.source.exists(path)
    }

    /// Advance by up to `amount` bytes; returns how far the position moved
    pub fn skip(&mut self, handle: i32, amount: i64) -> i64 {
        let Some(fh) = self.read_handle(handle) else {
            return -1;
        };
        if amount <= 0 {
            return 0;
        }
        let step = (amount as u64).min(fh.remaining() as u64) as usize;
        fh.position += step;
        step as i64
    }

    /// Bytes left before end of stream
    pub fn available(&mut self, handle: i32) -> i32 {
        match self.read_handle(handle) {
            Some(fh) => fh.remaining().min(i32::MAX as usize) as i32,
            None => -1,
        }
    }

    /// Read one byte (`0..=255`), or `-1` at end of stream
    pub fn read_byte(&mut self, handle: i32) -> i32 {
        let Some(fh) = self.read_handle(handle) else {
            return -1;
        };
        match fh.buffer.get(fh.position) {
            Some(&b) => {
                fh.position += 1;
                b as i32
            }
            None => -1,
        }
    }

    /// Fill `dst` from the current position.
    ///
    /// Returns the number of bytes copied, `0` when `dst` is empty, or `-1`
    /// at end of stream.
    pub fn read_bytes(&mut self, handle: i32, dst: &mut [u8]) -> i32 {
        let Some(fh) = self.read_handle(handle) else {
            return -1;
        };
        if dst.is_empty() {
            return 0;
        }
        let count = dst.len().min(fh.remaining());
        if count == 0 {
            return -1;
        }
        dst[..count].copy_from_slice(&fh.buffer[fh.position..fh.position + count]);
        fh.position += count;
        count as i32
    }

    /// Write to a console handle. Returns `false` for anything else.
    pub fn write(&mut self, handle: i32, bytes: &[u8]) -> bool {
        let slot = usize::try_from(handle)
            .ok()
            .and_then(|idx| self.slots.get_mut(idx))
            .and_then(|slot| slot.as_mut());
        match slot {
            Some(Slot::Console(sink)) => {
                sink.write(bytes, self.console.as_ref());
                true
            }
            _ => {
                log::warn!("write to non-writable handle {}", handle);
                false
            }
        }
    }

    /// Emit partial console lines
    pub fn flush(&mut self) {
        for slot in self.slots.iter_mut().flatten() {
            if let Slot::Console(sink) = slot {
                sink.flush(self.console.as_ref());
            }
        }
    }

    /// Release a read handle; its index becomes reusable
    pub fn release(&mut self, handle: i32) -> bool {
        if handle < FIRST_DYNAMIC_HANDLE {
            return false;
        }
        match self.slots.get_mut(handle as usize) {
            Some(slot @ Some(Slot::Read(_))) => {
                *slot = None;
                log::debug!("released handle {}", handle);
                true
            }
            _ => false,
        }
    }

    /// Inspect an open read handle
    pub fn handle(&self, handle: i32) -> Option<&FileHandle> {
        match usize::try_from(handle).ok().and_then(|idx| self.slots.get(idx)) {
            Some(Some(Slot::Read(fh))) => Some(fh),
            _ => None,
        }
    }

    /// Number of open read handles
    pub fn open_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| matches!(s, Some(Slot::Read(_))))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Capture {
        lines: Mutex<Vec<(ConsoleStream, String)>>,
    }

    impl ConsoleWriter for Capture {
        fn write_line(&self, stream: ConsoleStream, line: &str) {
            self.lines.lock().push((stream, line.to_string()));
        }
    }

    fn table_with(files: Vec<(&str, Vec<u8>)>) -> (FileTable, Arc<Capture>) {
        let source = MemorySource::new();
        for (path, bytes) in files {
            source.stage(path, bytes);
        }
        let capture = Arc::new(Capture::default());
        let mut table = FileTable::new(Arc::new(source), capture.clone());
        table.enable();
        (table, capture)
    }

    #[test]
    fn test_open_missing_returns_minus_one() {
        let (mut table, _) = table_with(vec![]);
        assert_eq!(table.open_for_read("nope"), -1);
        assert_eq!(table.open_count(), 0);
    }

    #[test]
    fn test_open_disabled() {
        let source = MemorySource::new();
        source.stage("a", vec![1]);
        let mut table = FileTable::new(Arc::new(source), Arc::new(LogConsole::default()));
        assert_eq!(table.open_for_read("a"), -1);
        table.enable();
        assert_eq!(table.open_for_read("a"), FIRST_DYNAMIC_HANDLE);
    }

    #[test]
    fn test_skip_available_read() {
        let (mut table, _) = table_with(vec![("f", vec![10, 20, 30, 40, 50])]);
        let h = table.open_for_read("f");

        assert_eq!(table.skip(h, 2), 2);
        assert_eq!(table.available(h), 3);

        let mut buf = [0u8; 10];
        assert_eq!(table.read_bytes(h, &mut buf), 3);
        assert_eq!(&buf[..3], &[30, 40, 50]);
        assert_eq!(table.read_bytes(h, &mut buf), -1);
    }

    #[test]
    fn test_skip_never_passes_end() {
        let (mut table, _) = table_with(vec![("f", vec![1, 2, 3])]);
        let h = table.open_for_read("f");

        assert_eq!(table.skip(h, 2), 2);
        assert_eq!(table.skip(h, 100), 1);
        assert_eq!(table.skip(h, 5), 0);
        assert_eq!(table.skip(h, -4), 0);
        assert_eq!(table.available(h), 0);
        assert_eq!(table.handle(h).unwrap().position(), 3);
    }

    #[test]
    fn test_read_byte_eof() {
        let (mut table, _) = table_with(vec![("f", vec![0xff])]);
        let h = table.open_for_read("f");
        assert_eq!(table.read_byte(h), 255);
        assert_eq!(table.read_byte(h), -1);
    }

    #[test]
    fn test_zero_length_read() {
        let (mut table, _) = table_with(vec![("f", vec![])]);
        let h = table.open_for_read("f");
        assert_eq!(table.read_bytes(h, &mut []), 0);
        assert_eq!(table.read_bytes(h, &mut [0u8; 1]), -1);
    }

    #[test]
    fn test_invalid_handles() {
        let (mut table, _) = table_with(vec![]);
        assert_eq!(table.available(99), -1);
        assert_eq!(table.read_byte(-3), -1);
        assert_eq!(table.skip(STDOUT_HANDLE, 1), -1);
        assert!(!table.release(STDOUT_HANDLE));
    }

    #[test]
    fn test_release_reuses_index() {
        let (mut table, _) = table_with(vec![("a", b"a".to_vec()), ("b", b"b".to_vec())]);
        let a = table.open_for_read("a");
        let b = table.open_for_read("b");
        assert_eq!((a, b), (3, 4));

        assert!(table.release(a));
        assert!(!table.release(a));
        assert_eq!(table.open_for_read("b"), 3);
    }

    #[test]
    fn test_console_line_buffering() {
        let (mut table, capture) = table_with(vec![]);
        assert!(table.write(STDOUT_HANDLE, b"hello "));
        assert!(table.write(STDOUT_HANDLE, "wörld\nnext".as_bytes()));
        assert!(table.write(STDERR_HANDLE, b"oops\r\n"));
        table.flush();

        let lines = capture.lines.lock().clone();
        assert_eq!(
            lines,
            vec![
                (ConsoleStream::Stdout, "hello wörld".to_string()),
                (ConsoleStream::Stderr, "oops".to_string()),
                (ConsoleStream::Stdout, "next".to_string()),
            ]
        );
    }

    #[test]
    fn test_write_to_read_handle_fails() {
        let (mut table, _) = table_with(vec![("f", b"x".to_vec())]);
        let h = table.open_for_read("f");
        assert!(!table.write(h, b"y"));
    }
}
