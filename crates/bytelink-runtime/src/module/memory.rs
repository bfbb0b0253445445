//! In-process module keeping exported objects in a host-side arena
//!
//! Useful for embedding a guest whose translated code runs in the same
//! process, and for exercising exported mode without a shared library.

use super::ModuleExports;
use crate::runtime::Runtime;
use crate::strings::TextKind;
use bytelink_sdk::{BridgeError, BridgeResult, Value};
use parking_lot::Mutex;

type BootstrapFn = Box<dyn Fn(&mut Runtime) -> BridgeResult<()> + Send + Sync>;

#[derive(Debug, Clone)]
enum ExternEntry {
    Text(TextKind, String),
    Array(Vec<Value>),
    Stream { fd: i32 },
}

/// A module whose exports live in host memory
pub struct MemoryModule {
    name: String,
    entries: Mutex<Vec<ExternEntry>>,
    bootstrap: Option<BootstrapFn>,
}

impl MemoryModule {
    /// Create an empty module
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Mutex::new(Vec::new()),
            bootstrap: None,
        }
    }

    /// Run `init` as the module's static initialization
    pub fn with_bootstrap(
        mut self,
        init: impl Fn(&mut Runtime) -> BridgeResult<()> + Send + Sync + 'static,
    ) -> Self {
        self.bootstrap = Some(Box::new(init));
        self
    }

    /// Create a module-owned file stream with no descriptor
    pub fn new_stream(&self) -> Value {
        self.push(ExternEntry::Stream { fd: -1 })
    }

    /// Number of exported objects
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Check if nothing has been exported yet
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Kind of a module-owned text object
    pub fn text_kind(&self, handle: u32) -> BridgeResult<TextKind> {
        match self.entries.lock().get(handle as usize) {
            Some(ExternEntry::Text(kind, _)) => Ok(*kind),
            _ => Err(invalid(handle, "text")),
        }
    }

    fn push(&self, entry: ExternEntry) -> Value {
        let mut entries = self.entries.lock();
        entries.push(entry);
        Value::Extern((entries.len() - 1) as u32)
    }

    fn with_entry<T>(&self, handle: u32, f: impl FnOnce(&mut ExternEntry) -> Option<T>, what: &str) -> BridgeResult<T> {
        let mut entries = self.entries.lock();
        entries
            .get_mut(handle as usize)
            .and_then(f)
            .ok_or_else(|| invalid(handle, what))
    }
}

fn invalid(handle: u32, what: &str) -> BridgeError {
    BridgeError::InvalidReference(format!("extern #{} is not a live {}", handle, what))
}

fn out_of_bounds(index: usize, len: usize) -> BridgeError {
    BridgeError::ArgumentError(format!("index {} out of bounds for length {}", index, len))
}

impl ModuleExports for MemoryModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn bootstrap(&self, rt: &mut Runtime) -> BridgeResult<()> {
        match &self.bootstrap {
            Some(init) => init(rt),
            None => Ok(()),
        }
    }

    fn new_text(&self, kind: TextKind, text: &str) -> BridgeResult<Value> {
        Ok(self.push(ExternEntry::Text(kind, text.to_string())))
    }

    fn text(&self, handle: u32) -> BridgeResult<String> {
        self.with_entry(
            handle,
            |entry| match entry {
                ExternEntry::Text(_, text) => Some(text.clone()),
                _ => None,
            },
            "text",
        )
    }

    fn set_text(&self, handle: u32, text: &str) -> BridgeResult<()> {
        self.with_entry(
            handle,
            |entry| match entry {
                ExternEntry::Text(_, current) => {
                    *current = text.to_string();
                    Some(())
                }
                _ => None,
            },
            "text",
        )
    }

    fn new_array(&self, items: &[Value]) -> BridgeResult<Value> {
        Ok(self.push(ExternEntry::Array(items.to_vec())))
    }

    fn array_len(&self, handle: u32) -> BridgeResult<usize> {
        self.with_entry(
            handle,
            |entry| match entry {
                ExternEntry::Array(items) => Some(items.len()),
                _ => None,
            },
            "array",
        )
    }

    fn array_get(&self, handle: u32, index: usize) -> BridgeResult<Value> {
        let items = self.with_entry(
            handle,
            |entry| match entry {
                ExternEntry::Array(items) => Some(items.get(index).copied().ok_or(items.len())),
                _ => None,
            },
            "array",
        )?;
        items.map_err(|len| out_of_bounds(index, len))
    }

    fn array_set(&self, handle: u32, index: usize, value: Value) -> BridgeResult<()> {
        let stored = self.with_entry(
            handle,
            |entry| match entry {
                ExternEntry::Array(items) => {
                    let len = items.len();
                    Some(items.get_mut(index).map(|slot| *slot = value).ok_or(len))
                }
                _ => None,
            },
            "array",
        )?;
        stored.map_err(|len| out_of_bounds(index, len))
    }

    fn descriptor_handle(&self, stream: u32) -> BridgeResult<i32> {
        self.with_entry(
            stream,
            |entry| match entry {
                ExternEntry::Stream { fd } => Some(*fd),
                _ => None,
            },
            "file stream",
        )
    }

    fn set_descriptor_handle(&self, stream: u32, fd: i32) -> BridgeResult<()> {
        self.with_entry(
            stream,
            |entry| match entry {
                ExternEntry::Stream { fd: current } => {
                    *current = fd;
                    Some(())
                }
                _ => None,
            },
            "file stream",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_entries() {
        let module = MemoryModule::new("demo");
        let Value::Extern(handle) = module.new_text(TextKind::StringBuilder, "abc").unwrap() else {
            panic!("expected an extern handle");
        };
        assert_eq!(module.text(handle).unwrap(), "abc");
        assert_eq!(module.text_kind(handle).unwrap(), TextKind::StringBuilder);
        module.set_text(handle, "xyz").unwrap();
        assert_eq!(module.text(handle).unwrap(), "xyz");
        assert!(module.text(handle + 1).is_err());
    }

    #[test]
    fn test_array_entries() {
        let module = MemoryModule::new("demo");
        let Value::Extern(handle) = module.new_array(&[Value::Int(1), Value::Int(2)]).unwrap() else {
            panic!("expected an extern handle");
        };
        assert_eq!(module.array_len(handle).unwrap(), 2);
        module.array_set(handle, 1, Value::Int(9)).unwrap();
        assert_eq!(module.array_get(handle, 1).unwrap(), Value::Int(9));
        assert!(matches!(module.array_get(handle, 2), Err(BridgeError::ArgumentError(_))));
        assert!(module.array_set(handle, 5, Value::Null).is_err());
        assert!(module.text(handle).is_err());
    }

    #[test]
    fn test_stream_descriptors() {
        let module = MemoryModule::new("demo");
        let Value::Extern(stream) = module.new_stream() else {
            panic!("expected an extern handle");
        };
        assert_eq!(module.descriptor_handle(stream).unwrap(), -1);
        module.set_descriptor_handle(stream, 4).unwrap();
        assert_eq!(module.descriptor_handle(stream).unwrap(), 4);
        assert_eq!(module.len(), 1);
    }
}
