//! Binary execution module surface
//!
//! In exported mode the guest's objects, strings and arrays live inside a
//! precompiled module. The runtime reaches them only through the entry
//! points in [`ModuleExports`]; module-owned values travel as
//! [`Value::Extern`] handles.
//!
//! Modules are produced asynchronously by a [`ModuleLoader`].

mod library;
mod memory;
mod native;

pub use library::{Library, LoadError};
pub use memory::MemoryModule;
pub use native::{SharedLibraryLoader, SharedLibraryModule};

use crate::runtime::Runtime;
use crate::strings::TextKind;
use bytelink_sdk::{BridgeResult, Value};
use std::future::Future;
use std::sync::Arc;

/// Entry points exported by a binary execution module
pub trait ModuleExports: Send + Sync {
    /// Module name used in logs
    fn name(&self) -> &str;

    /// Wire the host import table into the module
    fn link(&self, _rt: &mut Runtime) -> BridgeResult<()> {
        Ok(())
    }

    /// Run the guest runtime's static initialization
    fn bootstrap(&self, rt: &mut Runtime) -> BridgeResult<()>;

    /// Create a module-owned text object
    fn new_text(&self, kind: TextKind, text: &str) -> BridgeResult<Value>;

    /// Read the contents of a module-owned text object
    fn text(&self, handle: u32) -> BridgeResult<String>;

    /// Replace the contents of a module-owned text object
    fn set_text(&self, handle: u32, text: &str) -> BridgeResult<()>;

    /// Create a module-owned array
    fn new_array(&self, items: &[Value]) -> BridgeResult<Value>;

    /// Length of a module-owned array
    fn array_len(&self, handle: u32) -> BridgeResult<usize>;

    /// Read an element of a module-owned array
    fn array_get(&self, handle: u32, index: usize) -> BridgeResult<Value>;

    /// Write an element of a module-owned array
    fn array_set(&self, handle: u32, index: usize, value: Value) -> BridgeResult<()>;

    /// Handle stored in a module-owned file stream, `-1` if none
    fn descriptor_handle(&self, stream: u32) -> BridgeResult<i32>;

    /// Store a handle in a module-owned file stream
    fn set_descriptor_handle(&self, stream: u32, fd: i32) -> BridgeResult<()>;
}

/// Asynchronously produces a ready module
pub trait ModuleLoader: Send {
    /// Load and instantiate the module
    fn instantiate(self) -> impl Future<Output = Result<Arc<dyn ModuleExports>, LoadError>> + Send;
}

/// A module that is already instantiated
pub struct ReadyModule(pub Arc<dyn ModuleExports>);

impl ModuleLoader for ReadyModule {
    async fn instantiate(self) -> Result<Arc<dyn ModuleExports>, LoadError> {
        Ok(self.0)
    }
}
