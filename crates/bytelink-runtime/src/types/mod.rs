//! Runtime type bridge
//!
//! Guest types are registered in a [`ClassRegistry`]. Each [`ClassDef`]
//! owns a lazily built [`RuntimeClass`] descriptor (the set of types it
//! answers `instanceOf` for) and a lazily allocated `java.lang.Class`
//! mirror. Adapter types for opaque wrappers and lambdas are registered
//! ahead of use and memoized per (kind, target interface).

mod bridge;
mod class;
mod registry;

pub use class::{AdapterKind, ClassBuilder, ClassDef, ClassOrigin, GuestFn, Method, MethodKind, RuntimeClass};
pub use registry::{ClassRegistry, OBJECT};

/// Index of a class in the registry
pub type ClassId = usize;

/// `ACC_INTERFACE` modifier bit
pub const ACC_INTERFACE: u16 = 0x0200;

/// `ACC_ABSTRACT` modifier bit
pub const ACC_ABSTRACT: u16 = 0x0400;

/// `ACC_ENUM` modifier bit
pub const ACC_ENUM: u16 = 0x4000;

/// Static field holding an enum's constants
pub const ENUM_VALUES_FIELD: &str = "$VALUES";
