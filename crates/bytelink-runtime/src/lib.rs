//! Bytelink runtime bridge
//!
//! Lets code translated from guest bytecode run against a host environment.
//! The bridge is organised leaf-first:
//!
//! - [`strings`] - host/guest string conversion (direct or exported-accessor)
//! - [`files`] - virtual synchronous file-handle table over pluggable byte sources
//! - [`imports`] - the native-method import table, keyed by owner and signature key
//! - [`types`] - runtime class descriptors, `instanceOf`, adapters and wrapping
//! - [`linker`] - invokedynamic-style call-site linkage for lambdas
//! - [`module`] - the exported surface of compiled binary modules
//! - [`bootstrap`] - asynchronous sequencing for compiled binary modules
//!
//! [`Runtime`] owns all mutable bridge state and is the context every native
//! handler receives.

pub mod bootstrap;
pub mod config;
pub mod files;
pub mod heap;
pub mod imports;
pub mod linker;
pub mod module;
pub mod runtime;
pub mod strings;
pub mod types;

pub use bootstrap::{Bootstrap, BootstrapError};
pub use bytelink_sdk::{BridgeError, BridgeResult, ObjRef, RawValue, Signature, TypeCode, Value};
pub use config::{BridgeConfig, ConfigError, ExecutionMode};
pub use files::{ByteSource, ConsoleWriter, FileTable, MemorySource};
pub use imports::ImportTable;
pub use linker::{CallSite, InvocationKind, LinkRequest, MethodHandleDescriptor, SiteId};
pub use module::{MemoryModule, ModuleExports, ModuleLoader, ReadyModule, SharedLibraryLoader};
pub use runtime::{CoreClasses, Runtime, RuntimeBuilder};
pub use strings::{StringBridge, TextKind};
pub use types::{ClassBuilder, ClassId, ClassRegistry};
