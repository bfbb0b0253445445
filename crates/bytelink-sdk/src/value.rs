//! Value - host-side view of a guest value
//!
//! Guest booleans, bytes, shorts, chars and ints are all carried as
//! [`Value::Int`]; chars hold a Unicode scalar value. Object references
//! come in two flavours:
//!
//! ```text
//! Ref(ObjRef)  - entry in the host heap (direct mode objects, wrappers,
//!                class mirrors, lambda instances)
//! Extern(u32)  - opaque handle owned by a compiled binary module
//! ```

use crate::error::{BridgeError, BridgeResult};
use std::fmt;

/// Index of an object in the host heap.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjRef(u32);

impl ObjRef {
    /// Create a reference from a raw heap index
    #[inline]
    pub const fn from_index(index: u32) -> Self {
        Self(index)
    }

    /// Raw heap index
    #[inline]
    pub const fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for ObjRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

/// A guest value as seen by host code.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Value {
    /// Guest `null`
    #[default]
    Null,
    /// `Z`, `B`, `S`, `C` and `I` values
    Int(i32),
    /// `J` values
    Long(i64),
    /// `F` values
    Float(f32),
    /// `D` values
    Double(f64),
    /// Host heap object
    Ref(ObjRef),
    /// Module-owned opaque handle
    Extern(u32),
}

impl Value {
    /// Guest boolean encoding (1 / 0)
    #[inline]
    pub const fn from_bool(b: bool) -> Self {
        Value::Int(if b { 1 } else { 0 })
    }

    /// Guest char encoding
    #[inline]
    pub const fn from_char(c: char) -> Self {
        Value::Int(c as i32)
    }

    /// Check if value is null
    #[inline]
    pub const fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Get as i32 if this is an int-like value
    pub fn as_i32(&self) -> Option<i32> {
        match *self {
            Value::Int(i) => Some(i),
            _ => None,
        }
    }

    /// Get as i64, widening ints
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::Long(l) => Some(l),
            Value::Int(i) => Some(i as i64),
            _ => None,
        }
    }

    /// Get as f32
    pub fn as_f32(&self) -> Option<f32> {
        match *self {
            Value::Float(f) => Some(f),
            Value::Int(i) => Some(i as f32),
            _ => None,
        }
    }

    /// Get as f64, widening floats and ints
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::Double(d) => Some(d),
            Value::Float(f) => Some(f as f64),
            Value::Int(i) => Some(i as f64),
            Value::Long(l) => Some(l as f64),
            _ => None,
        }
    }

    /// Get as a guest boolean (any non-zero int)
    pub fn as_bool(&self) -> Option<bool> {
        self.as_i32().map(|i| i != 0)
    }

    /// Get the heap reference if this is a host object
    pub fn as_object(&self) -> Option<ObjRef> {
        match *self {
            Value::Ref(r) => Some(r),
            _ => None,
        }
    }

    /// Name of the value's kind, used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Int(_) => "int",
            Value::Long(_) => "long",
            Value::Float(_) => "float",
            Value::Double(_) => "double",
            Value::Ref(_) => "object",
            Value::Extern(_) => "extern",
        }
    }

    /// Get as i32 or fail with a type mismatch
    pub fn expect_i32(&self) -> BridgeResult<i32> {
        self.as_i32()
            .ok_or_else(|| BridgeError::type_mismatch("int", self.type_name()))
    }

    /// Get as i64 or fail with a type mismatch
    pub fn expect_i64(&self) -> BridgeResult<i64> {
        self.as_i64()
            .ok_or_else(|| BridgeError::type_mismatch("long", self.type_name()))
    }

    /// Get as f32 or fail with a type mismatch
    pub fn expect_f32(&self) -> BridgeResult<f32> {
        self.as_f32()
            .ok_or_else(|| BridgeError::type_mismatch("float", self.type_name()))
    }

    /// Get as f64 or fail with a type mismatch
    pub fn expect_f64(&self) -> BridgeResult<f64> {
        self.as_f64()
            .ok_or_else(|| BridgeError::type_mismatch("double", self.type_name()))
    }

    /// Get the heap reference or fail with a type mismatch
    pub fn expect_object(&self) -> BridgeResult<ObjRef> {
        self.as_object()
            .ok_or_else(|| BridgeError::type_mismatch("object", self.type_name()))
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i)
    }
}

impl From<i64> for Value {
    fn from(l: i64) -> Self {
        Value::Long(l)
    }
}

impl From<f32> for Value {
    fn from(f: f32) -> Self {
        Value::Float(f)
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Value::Double(d)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::from_bool(b)
    }
}

impl From<ObjRef> for Value {
    fn from(r: ObjRef) -> Self {
        Value::Ref(r)
    }
}
