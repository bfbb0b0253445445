//! String bridge
//!
//! Guest strings, string builders and string buffers carry their contents
//! as a host string. Where that host string lives depends on the execution
//! mode:
//!
//! - [`DirectStrings`]: in the object's native slot in the host heap
//! - [`ExportedStrings`]: inside the binary module, reached through its
//!   exported get/set entry points
//!
//! Both present the same observable behaviour: null reads as the empty
//! string and all indexing is by Unicode scalar value.

use crate::config::ExecutionMode;
use crate::heap::{Heap, NativeSlot};
use crate::module::ModuleExports;
use crate::types::ClassId;
use bytelink_sdk::{BridgeError, BridgeResult, ObjRef, Value};
use std::sync::Arc;

/// Which guest text type to create
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TextKind {
    /// `java.lang.String`
    String = 0,
    /// `java.lang.StringBuilder`
    StringBuilder = 1,
    /// `java.lang.StringBuffer`
    StringBuffer = 2,
}

impl TryFrom<u8> for TextKind {
    type Error = BridgeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(TextKind::String),
            1 => Ok(TextKind::StringBuilder),
            2 => Ok(TextKind::StringBuffer),
            other => Err(BridgeError::ArgumentError(format!("unknown text kind {}", other))),
        }
    }
}

/// Bidirectional host/guest string conversion
pub trait StringBridge: Send + Sync {
    /// Mode this strategy implements
    fn mode(&self) -> ExecutionMode;

    /// Create a guest text object holding `text`
    fn new_text(&self, heap: &mut Heap, kind: TextKind, text: &str) -> BridgeResult<Value>;

    /// Read the host string behind a guest text object
    fn text(&self, heap: &Heap, value: Value) -> BridgeResult<String>;

    /// Replace the host string behind a guest text object
    fn set_text(&self, heap: &mut Heap, value: Value, text: &str) -> BridgeResult<()>;
}

fn heap_text(heap: &Heap, r: ObjRef) -> BridgeResult<String> {
    match &heap.object(r)?.native {
        NativeSlot::Text(s) => Ok(s.clone()),
        NativeSlot::Empty => Ok(String::new()),
        _ => Err(BridgeError::type_mismatch("string", "object")),
    }
}

fn set_heap_text(heap: &mut Heap, r: ObjRef, text: &str) -> BridgeResult<()> {
    let obj = heap.object_mut(r)?;
    if matches!(obj.native, NativeSlot::Text(_) | NativeSlot::Empty) {
        obj.native = NativeSlot::Text(text.to_string());
        Ok(())
    } else {
        Err(BridgeError::type_mismatch("string", "object"))
    }
}

// ============================================================================
// Direct strategy
// ============================================================================

/// Strings stored in the host heap
#[derive(Debug, Clone)]
pub struct DirectStrings {
    string: ClassId,
    builder: ClassId,
    buffer: ClassId,
}

impl DirectStrings {
    /// Create the strategy for the given text classes
    pub fn new(string: ClassId, builder: ClassId, buffer: ClassId) -> Self {
        Self {
            string,
            builder,
            buffer,
        }
    }
}

impl StringBridge for DirectStrings {
    fn mode(&self) -> ExecutionMode {
        ExecutionMode::Direct
    }

    fn new_text(&self, heap: &mut Heap, kind: TextKind, text: &str) -> BridgeResult<Value> {
        let class = match kind {
            TextKind::String => self.string,
            TextKind::StringBuilder => self.builder,
            TextKind::StringBuffer => self.buffer,
        };
        Ok(Value::Ref(
            heap.alloc_object_with(class, NativeSlot::Text(text.to_string())),
        ))
    }

    fn text(&self, heap: &Heap, value: Value) -> BridgeResult<String> {
        match value {
            Value::Null => Ok(String::new()),
            Value::Ref(r) => heap_text(heap, r),
            other => Err(BridgeError::type_mismatch("string", other.type_name())),
        }
    }

    fn set_text(&self, heap: &mut Heap, value: Value, text: &str) -> BridgeResult<()> {
        match value {
            Value::Ref(r) => set_heap_text(heap, r, text),
            other => Err(BridgeError::type_mismatch("string", other.type_name())),
        }
    }
}

// ============================================================================
// Exported-accessor strategy
// ============================================================================

/// Strings stored inside the binary module
pub struct ExportedStrings {
    module: Arc<dyn ModuleExports>,
}

impl ExportedStrings {
    /// Create the strategy over a module's exports
    pub fn new(module: Arc<dyn ModuleExports>) -> Self {
        Self { module }
    }
}

impl StringBridge for ExportedStrings {
    fn mode(&self) -> ExecutionMode {
        ExecutionMode::Exported
    }

    fn new_text(&self, _heap: &mut Heap, kind: TextKind, text: &str) -> BridgeResult<Value> {
        self.module.new_text(kind, text)
    }

    fn text(&self, heap: &Heap, value: Value) -> BridgeResult<String> {
        match value {
            Value::Null => Ok(String::new()),
            Value::Extern(handle) => self.module.text(handle),
            Value::Ref(r) => heap_text(heap, r),
            other => Err(BridgeError::type_mismatch("string", other.type_name())),
        }
    }

    fn set_text(&self, heap: &mut Heap, value: Value, text: &str) -> BridgeResult<()> {
        match value {
            Value::Extern(handle) => self.module.set_text(handle, text),
            Value::Ref(r) => set_heap_text(heap, r, text),
            other => Err(BridgeError::type_mismatch("string", other.type_name())),
        }
    }
}

// ============================================================================
// Scalar-value indexing helpers
// ============================================================================

/// Number of Unicode scalar values in `s`
pub fn scalar_len(s: &str) -> usize {
    s.chars().count()
}

/// Scalar value at `index`
pub fn scalar_at(s: &str, index: usize) -> Option<char> {
    s.chars().nth(index)
}

/// Scalar index of the byte offset `byte_index`
pub fn scalar_index(s: &str, byte_index: usize) -> usize {
    s[..byte_index].chars().count()
}

/// Build a string from guest char values, skipping invalid scalars
pub fn from_scalars(values: impl IntoIterator<Item = i32>) -> String {
    values
        .into_iter()
        .filter_map(|v| u32::try_from(v).ok().and_then(char::from_u32))
        .collect()
}
