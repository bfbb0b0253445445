//! Bytelink SDK - shared types for the guest/host runtime bridge
//!
//! This crate provides the minimal types that both the host runtime and a
//! compiled binary module agree on, without depending on the full
//! `bytelink-runtime`:
//!
//! - [`Value`] - the host-side view of a guest value
//! - [`RawValue`] - the C ABI encoding of a value crossing a module boundary
//! - [`Signature`] / [`TypeCode`] - deterministic signature keys used to name
//!   native methods
//! - [`BridgeError`] - the error taxonomy surfaced by the bridge
//!
//! # Example
//!
//! ```ignore
//! use bytelink_sdk::{Signature, TypeCode};
//!
//! let min = Signature::new("min", TypeCode::Int, vec![TypeCode::Int, TypeCode::Int]);
//! assert_eq!(min.key(), "I$min$I$I");
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod raw;
pub mod signature;
pub mod value;

pub use error::{BridgeError, BridgeResult};
pub use raw::RawValue;
pub use signature::{mangle_name, Signature, TypeCode, CONSTRUCTOR_NAME, DEFAULT_CONSTRUCTOR_KEY};
pub use value::{ObjRef, Value};
