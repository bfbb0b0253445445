//! Compiled modules loaded from a shared library
//!
//! The library exports a fixed set of `extern "C"` entry points. Host
//! natives are reached through a single dispatch callback handed over by
//! `bytelink_link`; while the module runs, the active [`Runtime`] is
//! published to the callback through a thread-local pointer.

use super::{Library, LoadError, ModuleExports, ModuleLoader};
use crate::runtime::Runtime;
use crate::strings::TextKind;
use bytelink_sdk::{BridgeError, BridgeResult, RawValue, Value};
use std::cell::{Cell, RefCell};
use std::ffi::{c_char, CStr};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::ptr;
use std::sync::Arc;

/// Host callback the module invokes for every native method.
///
/// Returns `0` on success with the result written to `out`, non-zero on
/// failure.
pub type DispatchFn = unsafe extern "C" fn(
    owner: *const c_char,
    key: *const c_char,
    args: *const RawValue,
    argc: usize,
    out: *mut RawValue,
) -> i32;

type LinkFn = unsafe extern "C" fn(dispatch: DispatchFn) -> i32;
type BootstrapFn = unsafe extern "C" fn() -> i32;
type StringNewFn = unsafe extern "C" fn(kind: u8, bytes: *const u8, len: usize) -> RawValue;
type TextGetFn = unsafe extern "C" fn(handle: u32, buf: *mut u8, cap: usize) -> isize;
type TextSetFn = unsafe extern "C" fn(handle: u32, bytes: *const u8, len: usize) -> i32;
type FdGetFn = unsafe extern "C" fn(stream: u32) -> i32;
type FdSetFn = unsafe extern "C" fn(stream: u32, fd: i32) -> i32;
type ArrayNewFn = unsafe extern "C" fn(items: *const RawValue, len: usize) -> RawValue;
type ArrayLenFn = unsafe extern "C" fn(handle: u32) -> isize;
type ArrayGetFn = unsafe extern "C" fn(handle: u32, index: usize, out: *mut RawValue) -> i32;
type ArraySetFn = unsafe extern "C" fn(handle: u32, index: usize, value: RawValue) -> i32;

struct Exports {
    link: LinkFn,
    bootstrap: BootstrapFn,
    string_new: StringNewFn,
    text_get: TextGetFn,
    text_set: TextSetFn,
    fd_get: FdGetFn,
    fd_set: FdSetFn,
    array_new: ArrayNewFn,
    array_len: ArrayLenFn,
    array_get: ArrayGetFn,
    array_set: ArraySetFn,
}

impl Exports {
    fn resolve(library: &Library) -> Result<Self, LoadError> {
        unsafe {
            Ok(Self {
                link: library.get("bytelink_link")?,
                bootstrap: library.get("bytelink_bootstrap")?,
                string_new: library.get("bytelink_string_new")?,
                text_get: library.get("bytelink_text_get")?,
                text_set: library.get("bytelink_text_set")?,
                fd_get: library.get("bytelink_fd_get")?,
                fd_set: library.get("bytelink_fd_set")?,
                array_new: library.get("bytelink_array_new")?,
                array_len: library.get("bytelink_array_len")?,
                array_get: library.get("bytelink_array_get")?,
                array_set: library.get("bytelink_array_set")?,
            })
        }
    }
}

// ============================================================================
// Dispatch
// ============================================================================

thread_local! {
    static ACTIVE: Cell<*mut Runtime> = const { Cell::new(ptr::null_mut()) };
    static LAST_ERROR: RefCell<Option<BridgeError>> = const { RefCell::new(None) };
}

/// Publishes a runtime to [`dispatch`] for the guard's lifetime
struct ActiveRuntime {
    previous: *mut Runtime,
}

impl ActiveRuntime {
    fn enter(rt: &mut Runtime) -> Self {
        let previous = ACTIVE.with(|active| active.replace(rt as *mut Runtime));
        LAST_ERROR.with(|last| last.borrow_mut().take());
        Self { previous }
    }
}

impl Drop for ActiveRuntime {
    fn drop(&mut self) {
        ACTIVE.with(|active| active.set(self.previous));
    }
}

fn take_error(entry: &str, code: i32) -> BridgeError {
    LAST_ERROR
        .with(|last| last.borrow_mut().take())
        .unwrap_or_else(|| BridgeError::ModuleError(format!("{} returned {}", entry, code)))
}

fn record(error: BridgeError) -> i32 {
    log::error!("native dispatch failed: {}", error);
    LAST_ERROR.with(|last| *last.borrow_mut() = Some(error));
    1
}

unsafe fn dispatch_inner(
    owner: *const c_char,
    key: *const c_char,
    args: *const RawValue,
    argc: usize,
) -> BridgeResult<Value> {
    let rt = ACTIVE.with(|active| active.get());
    if rt.is_null() || owner.is_null() || key.is_null() {
        return Err(BridgeError::ModuleError("dispatch outside of a module call".to_string()));
    }
    let owner = CStr::from_ptr(owner)
        .to_str()
        .map_err(|e| BridgeError::ModuleError(format!("owner name: {}", e)))?;
    let key = CStr::from_ptr(key)
        .to_str()
        .map_err(|e| BridgeError::ModuleError(format!("signature key: {}", e)))?;
    let raw = if args.is_null() || argc == 0 {
        &[][..]
    } else {
        std::slice::from_raw_parts(args, argc)
    };
    let values = raw
        .iter()
        .map(|v| v.decode())
        .collect::<BridgeResult<Vec<Value>>>()?;

    (*rt).call_native(owner, key, &values)
}

/// The callback passed to `bytelink_link`
unsafe extern "C" fn dispatch(
    owner: *const c_char,
    key: *const c_char,
    args: *const RawValue,
    argc: usize,
    out: *mut RawValue,
) -> i32 {
    let result = panic::catch_unwind(AssertUnwindSafe(|| dispatch_inner(owner, key, args, argc)));
    match result {
        Ok(Ok(value)) => {
            if !out.is_null() {
                *out = RawValue::from(value);
            }
            0
        }
        Ok(Err(e)) => record(e),
        Err(_) => record(BridgeError::ModuleError("host native panicked".to_string())),
    }
}

// ============================================================================
// Module
// ============================================================================

/// A module backed by a loaded shared library
pub struct SharedLibraryModule {
    name: String,
    exports: Exports,
    // Keeps the entry points above valid.
    _library: Library,
}

impl SharedLibraryModule {
    /// Load the library and resolve every entry point
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let library = Library::open(path)?;
        let exports = Exports::resolve(&library)?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| library.path().to_string());
        log::debug!("loaded module {} from {}", name, library.path());
        Ok(Self {
            name,
            exports,
            _library: library,
        })
    }

    fn check(&self, entry: &str, code: i32) -> BridgeResult<()> {
        if code == 0 {
            Ok(())
        } else {
            Err(BridgeError::ModuleError(format!(
                "{}: {} returned {}",
                self.name, entry, code
            )))
        }
    }
}

impl ModuleExports for SharedLibraryModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn link(&self, rt: &mut Runtime) -> BridgeResult<()> {
        let _active = ActiveRuntime::enter(rt);
        let code = unsafe { (self.exports.link)(dispatch) };
        if code == 0 {
            Ok(())
        } else {
            Err(take_error("bytelink_link", code))
        }
    }

    fn bootstrap(&self, rt: &mut Runtime) -> BridgeResult<()> {
        let _active = ActiveRuntime::enter(rt);
        let code = unsafe { (self.exports.bootstrap)() };
        if code == 0 {
            Ok(())
        } else {
            Err(take_error("bytelink_bootstrap", code))
        }
    }

    fn new_text(&self, kind: TextKind, text: &str) -> BridgeResult<Value> {
        unsafe { (self.exports.string_new)(kind as u8, text.as_ptr(), text.len()) }.decode()
    }

    fn text(&self, handle: u32) -> BridgeResult<String> {
        let mut buf = Vec::new();
        loop {
            let needed = unsafe { (self.exports.text_get)(handle, buf.as_mut_ptr(), buf.len()) };
            let needed = usize::try_from(needed).map_err(|_| {
                BridgeError::InvalidReference(format!("extern #{} is not a live text", handle))
            })?;
            if needed <= buf.len() {
                buf.truncate(needed);
                return String::from_utf8(buf)
                    .map_err(|e| BridgeError::ModuleError(format!("text is not UTF-8: {}", e)));
            }
            buf.resize(needed, 0);
        }
    }

    fn set_text(&self, handle: u32, text: &str) -> BridgeResult<()> {
        let code = unsafe { (self.exports.text_set)(handle, text.as_ptr(), text.len()) };
        self.check("bytelink_text_set", code)
    }

    fn new_array(&self, items: &[Value]) -> BridgeResult<Value> {
        let raw: Vec<RawValue> = items.iter().map(|v| RawValue::from(*v)).collect();
        unsafe { (self.exports.array_new)(raw.as_ptr(), raw.len()) }.decode()
    }

    fn array_len(&self, handle: u32) -> BridgeResult<usize> {
        let len = unsafe { (self.exports.array_len)(handle) };
        usize::try_from(len)
            .map_err(|_| BridgeError::InvalidReference(format!("extern #{} is not a live array", handle)))
    }

    fn array_get(&self, handle: u32, index: usize) -> BridgeResult<Value> {
        let mut out = RawValue::null();
        let code = unsafe { (self.exports.array_get)(handle, index, &mut out) };
        self.check("bytelink_array_get", code)?;
        out.decode()
    }

    fn array_set(&self, handle: u32, index: usize, value: Value) -> BridgeResult<()> {
        let code = unsafe { (self.exports.array_set)(handle, index, RawValue::from(value)) };
        self.check("bytelink_array_set", code)
    }

    fn descriptor_handle(&self, stream: u32) -> BridgeResult<i32> {
        Ok(unsafe { (self.exports.fd_get)(stream) })
    }

    fn set_descriptor_handle(&self, stream: u32, fd: i32) -> BridgeResult<()> {
        let code = unsafe { (self.exports.fd_set)(stream, fd) };
        self.check("bytelink_fd_set", code)
    }
}

/// Loads a [`SharedLibraryModule`] off the async executor
#[derive(Debug, Clone)]
pub struct SharedLibraryLoader {
    path: PathBuf,
}

impl SharedLibraryLoader {
    /// Create a loader for the library at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ModuleLoader for SharedLibraryLoader {
    async fn instantiate(self) -> Result<Arc<dyn ModuleExports>, LoadError> {
        let path = self.path;
        let module = tokio::task::spawn_blocking(move || SharedLibraryModule::open(&path))
            .await
            .map_err(|e| LoadError::PlatformError(format!("module loader task failed: {}", e)))??;
        Ok(Arc::new(module))
    }
}
