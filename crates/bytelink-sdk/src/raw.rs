//! RawValue - C ABI value for the binary-module boundary
//!
//! A compiled module and the host exchange values through this tagged
//! union. Primitive payloads are stored inline in `data`; references carry
//! either a host heap index or a module-owned handle.

use crate::error::{BridgeError, BridgeResult};
use crate::value::{ObjRef, Value};

/// Tagged value passed across the module boundary.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawValue {
    /// One of the `TAG_*` constants
    pub tag: u8,
    /// Payload bits
    pub data: u64,
}

/// Null tag
pub const TAG_NULL: u8 = 0;
/// 32-bit int tag (`Z B S C I`)
pub const TAG_INT: u8 = 1;
/// 64-bit int tag
pub const TAG_LONG: u8 = 2;
/// 32-bit float tag
pub const TAG_FLOAT: u8 = 3;
/// 64-bit float tag
pub const TAG_DOUBLE: u8 = 4;
/// Host heap reference tag
pub const TAG_REF: u8 = 5;
/// Module-owned handle tag
pub const TAG_EXTERN: u8 = 6;

impl RawValue {
    /// Create a null value
    pub const fn null() -> Self {
        RawValue {
            tag: TAG_NULL,
            data: 0,
        }
    }

    /// Decode into a [`Value`]
    pub fn decode(self) -> BridgeResult<Value> {
        Ok(match self.tag {
            TAG_NULL => Value::Null,
            TAG_INT => Value::Int(self.data as u32 as i32),
            TAG_LONG => Value::Long(self.data as i64),
            TAG_FLOAT => Value::Float(f32::from_bits(self.data as u32)),
            TAG_DOUBLE => Value::Double(f64::from_bits(self.data)),
            TAG_REF => Value::Ref(ObjRef::from_index(self.data as u32)),
            TAG_EXTERN => Value::Extern(self.data as u32),
            other => {
                return Err(BridgeError::ModuleError(format!(
                    "unknown value tag {}",
                    other
                )))
            }
        })
    }
}

impl Default for RawValue {
    fn default() -> Self {
        RawValue::null()
    }
}

impl From<Value> for RawValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => RawValue::null(),
            Value::Int(i) => RawValue {
                tag: TAG_INT,
                data: i as u32 as u64,
            },
            Value::Long(l) => RawValue {
                tag: TAG_LONG,
                data: l as u64,
            },
            Value::Float(f) => RawValue {
                tag: TAG_FLOAT,
                data: f.to_bits() as u64,
            },
            Value::Double(d) => RawValue {
                tag: TAG_DOUBLE,
                data: d.to_bits(),
            },
            Value::Ref(r) => RawValue {
                tag: TAG_REF,
                data: r.index() as u64,
            },
            Value::Extern(h) => RawValue {
                tag: TAG_EXTERN,
                data: h as u64,
            },
        }
    }
}
