//! Host heap for guest objects and arrays
//!
//! In direct mode every guest object lives here. In exported mode the heap
//! only holds objects the host creates itself (class mirrors, opaque
//! wrappers, lambda instances, method handles).

use crate::linker::{LambdaFactory, LinkedTarget, MethodHandleDescriptor};
use crate::types::ClassId;
use bytelink_sdk::{BridgeError, BridgeResult, ObjRef, Value};
use rustc_hash::FxHashMap;
use std::sync::Arc;

// ============================================================================
// Native slots
// ============================================================================

/// Host value carried by an opaque wrapper
#[derive(Debug, Clone, PartialEq)]
pub enum HostValue {
    /// Typed 32-bit float array
    FloatArray(Vec<f32>),
    /// Typed 32-bit int array
    IntArray(Vec<i32>),
    /// Typed 16-bit int array
    Int16Array(Vec<i16>),
    /// Typed 8-bit int array
    Int8Array(Vec<i8>),
    /// Growable list of opaque references
    References(Vec<Value>),
    /// Host logging channel
    Console,
    /// Host global scope
    Window,
    /// Host document handle
    Document,
}

impl HostValue {
    /// Short name used in logs and errors
    pub fn kind_name(&self) -> &'static str {
        match self {
            HostValue::FloatArray(_) => "FloatArray",
            HostValue::IntArray(_) => "IntArray",
            HostValue::Int16Array(_) => "Int16Array",
            HostValue::Int8Array(_) => "Int8Array",
            HostValue::References(_) => "References",
            HostValue::Console => "Console",
            HostValue::Window => "Window",
            HostValue::Document => "Document",
        }
    }
}

/// Host-side state attached to a guest object
#[derive(Debug, Clone, Default)]
pub enum NativeSlot {
    /// Plain guest object
    #[default]
    Empty,
    /// String, StringBuilder or StringBuffer contents
    Text(String),
    /// Opaque wrapper payload
    Host(HostValue),
    /// `java.lang.Class` instance for the given class
    Mirror(ClassId),
    /// Method handle produced for a method reference
    MethodHandle(MethodHandleDescriptor),
    /// Method type; only the returned (functional interface) type is kept
    MethodType(ClassId),
    /// Bootstrapped call site or its target handle
    Factory(Arc<LambdaFactory>),
    /// Functional-interface instance forwarding to a linked target
    Lambda(Arc<LinkedTarget>),
}

// ============================================================================
// Heap entries
// ============================================================================

/// A guest object
#[derive(Debug, Clone)]
pub struct Object {
    /// Runtime class
    pub class: ClassId,
    /// Instance fields by name; absent fields read as null
    pub fields: FxHashMap<String, Value>,
    /// Host-side state
    pub native: NativeSlot,
}

impl Object {
    /// Create an object with no fields set
    pub fn new(class: ClassId, native: NativeSlot) -> Self {
        Self {
            class,
            fields: FxHashMap::default(),
            native,
        }
    }
}

/// A guest array
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GuestArray {
    /// Elements
    pub items: Vec<Value>,
}

impl GuestArray {
    /// Number of elements
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the array is empty
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Read an element
    pub fn get(&self, index: usize) -> BridgeResult<Value> {
        self.items.get(index).copied().ok_or_else(|| {
            BridgeError::ArgumentError(format!(
                "array index {} out of bounds for length {}",
                index,
                self.items.len()
            ))
        })
    }

    /// Write an element
    pub fn set(&mut self, index: usize, value: Value) -> BridgeResult<()> {
        let len = self.items.len();
        match self.items.get_mut(index) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(BridgeError::ArgumentError(format!(
                "array index {} out of bounds for length {}",
                index, len
            ))),
        }
    }
}

/// An entry in the heap
#[derive(Debug, Clone)]
pub enum HeapEntry {
    /// Guest object
    Object(Object),
    /// Guest array
    Array(GuestArray),
}

// ============================================================================
// Heap
// ============================================================================

/// Arena of guest objects addressed by [`ObjRef`]
#[derive(Debug, Default)]
pub struct Heap {
    entries: Vec<HeapEntry>,
}

impl Heap {
    /// Create an empty heap
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    fn push(&mut self, entry: HeapEntry) -> ObjRef {
        let r = ObjRef::from_index(self.entries.len() as u32);
        self.entries.push(entry);
        r
    }

    /// Allocate an object with an empty native slot
    pub fn alloc_object(&mut self, class: ClassId) -> ObjRef {
        self.push(HeapEntry::Object(Object::new(class, NativeSlot::Empty)))
    }

    /// Allocate an object carrying host-side state
    pub fn alloc_object_with(&mut self, class: ClassId, native: NativeSlot) -> ObjRef {
        self.push(HeapEntry::Object(Object::new(class, native)))
    }

    /// Allocate an array with the given elements
    pub fn alloc_array(&mut self, items: Vec<Value>) -> ObjRef {
        self.push(HeapEntry::Array(GuestArray { items }))
    }

    /// Get an entry
    pub fn get(&self, r: ObjRef) -> Option<&HeapEntry> {
        self.entries.get(r.index() as usize)
    }

    /// Get an object or fail
    pub fn object(&self, r: ObjRef) -> BridgeResult<&Object> {
        match self.get(r) {
            Some(HeapEntry::Object(obj)) => Ok(obj),
            Some(HeapEntry::Array(_)) => Err(BridgeError::type_mismatch("object", "array")),
            None => Err(BridgeError::InvalidReference(format!("{:?}", r))),
        }
    }

    /// Get a mutable object or fail
    pub fn object_mut(&mut self, r: ObjRef) -> BridgeResult<&mut Object> {
        match self.entries.get_mut(r.index() as usize) {
            Some(HeapEntry::Object(obj)) => Ok(obj),
            Some(HeapEntry::Array(_)) => Err(BridgeError::type_mismatch("object", "array")),
            None => Err(BridgeError::InvalidReference(format!("{:?}", r))),
        }
    }

    /// Get an array or fail
    pub fn array(&self, r: ObjRef) -> BridgeResult<&GuestArray> {
        match self.get(r) {
            Some(HeapEntry::Array(arr)) => Ok(arr),
            Some(HeapEntry::Object(_)) => Err(BridgeError::type_mismatch("array", "object")),
            None => Err(BridgeError::InvalidReference(format!("{:?}", r))),
        }
    }

    /// Get a mutable array or fail
    pub fn array_mut(&mut self, r: ObjRef) -> BridgeResult<&mut GuestArray> {
        match self.entries.get_mut(r.index() as usize) {
            Some(HeapEntry::Array(arr)) => Ok(arr),
            Some(HeapEntry::Object(_)) => Err(BridgeError::type_mismatch("array", "object")),
            None => Err(BridgeError::InvalidReference(format!("{:?}", r))),
        }
    }

    /// Read an instance field (null when unset)
    pub fn field(&self, r: ObjRef, name: &str) -> BridgeResult<Value> {
        Ok(self
            .object(r)?
            .fields
            .get(name)
            .copied()
            .unwrap_or(Value::Null))
    }

    /// Write an instance field
    pub fn set_field(&mut self, r: ObjRef, name: &str, value: Value) -> BridgeResult<()> {
        self.object_mut(r)?.fields.insert(name.to_string(), value);
        Ok(())
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the heap is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alloc_and_fields() {
        let mut heap = Heap::new();
        let obj = heap.alloc_object(0);

        assert_eq!(heap.field(obj, "x").unwrap(), Value::Null);
        heap.set_field(obj, "x", Value::Int(3)).unwrap();
        assert_eq!(heap.field(obj, "x").unwrap(), Value::Int(3));
        assert_eq!(heap.len(), 1);
    }

    #[test]
    fn test_array_bounds() {
        let mut heap = Heap::new();
        let arr = heap.alloc_array(vec![Value::Int(0); 2]);

        heap.array_mut(arr).unwrap().set(1, Value::Int(9)).unwrap();
        assert_eq!(heap.array(arr).unwrap().get(1).unwrap(), Value::Int(9));
        assert!(heap.array(arr).unwrap().get(2).is_err());
        assert!(heap.array_mut(arr).unwrap().set(5, Value::Null).is_err());
    }

    #[test]
    fn test_shape_mismatch() {
        let mut heap = Heap::new();
        let obj = heap.alloc_object(0);
        let arr = heap.alloc_array(vec![]);

        assert!(matches!(heap.array(obj), Err(BridgeError::TypeMismatch { .. })));
        assert!(matches!(heap.object(arr), Err(BridgeError::TypeMismatch { .. })));
        assert!(matches!(
            heap.object(ObjRef::from_index(99)),
            Err(BridgeError::InvalidReference(_))
        ));
    }
}
