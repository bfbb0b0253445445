//! Shared-library loading for compiled modules

use std::ffi::{CStr, CString};
use std::path::Path;
use thiserror::Error;

/// Errors raised while loading or instantiating a module
#[derive(Debug, Error)]
pub enum LoadError {
    /// Library file missing or rejected by the dynamic loader
    #[error("Library not found: {path}")]
    NotFound {
        /// Path that was attempted
        path: String,
    },

    /// A required entry point is not exported
    #[error("Symbol not found: {symbol} in {library}")]
    SymbolNotFound {
        /// Symbol name
        symbol: String,
        /// Library path
        library: String,
    },

    /// The module's link entry point reported failure
    #[error("Module rejected linkage: {0}")]
    Rejected(String),

    /// Platform-specific error
    #[error("Platform error: {0}")]
    PlatformError(String),

    /// Path is not valid UTF-8
    #[error("Invalid UTF-8 in path: {0}")]
    InvalidPath(String),
}

/// An open dynamic library
pub struct Library {
    handle: *mut std::ffi::c_void,
    path: String,
}

// The handle is only passed to dlsym/dlclose, which are thread-safe.
unsafe impl Send for Library {}
unsafe impl Sync for Library {}

impl Library {
    /// Open a shared library with `dlopen(RTLD_NOW | RTLD_LOCAL)`
    #[cfg(unix)]
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path_ref = path.as_ref();
        let path_str = path_ref
            .to_str()
            .ok_or_else(|| LoadError::InvalidPath(format!("{:?}", path_ref)))?;
        let c_path = CString::new(path_str)
            .map_err(|e| LoadError::PlatformError(format!("Invalid path: {}", e)))?;

        let handle = unsafe { libc::dlopen(c_path.as_ptr(), libc::RTLD_NOW | libc::RTLD_LOCAL) };
        if handle.is_null() {
            return Err(LoadError::NotFound {
                path: format!("{}: {}", path_str, last_error()),
            });
        }

        Ok(Library {
            handle,
            path: path_str.to_string(),
        })
    }

    /// Shared libraries are only supported on unix hosts
    #[cfg(not(unix))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        Err(LoadError::PlatformError(format!(
            "cannot load {:?}: shared-library modules need a unix host",
            path.as_ref()
        )))
    }

    /// Look up a function pointer by name.
    ///
    /// # Safety
    ///
    /// `T` must be a function pointer type matching the exported symbol, and
    /// the library must outlive every use of the returned pointer.
    #[cfg(unix)]
    pub unsafe fn get<T: Copy>(&self, symbol: &str) -> Result<T, LoadError> {
        let c_name = CString::new(symbol)
            .map_err(|e| LoadError::PlatformError(format!("Invalid symbol name: {}", e)))?;

        libc::dlerror();
        let ptr = libc::dlsym(self.handle, c_name.as_ptr());
        let err = libc::dlerror();
        if !err.is_null() || ptr.is_null() {
            let detail = if err.is_null() {
                self.path.clone()
            } else {
                format!("{}: {}", self.path, CStr::from_ptr(err).to_string_lossy())
            };
            return Err(LoadError::SymbolNotFound {
                symbol: symbol.to_string(),
                library: detail,
            });
        }

        Ok(std::mem::transmute_copy(&ptr))
    }

    /// Look up a function pointer by name.
    ///
    /// # Safety
    ///
    /// Never returns a pointer on this platform.
    #[cfg(not(unix))]
    pub unsafe fn get<T: Copy>(&self, symbol: &str) -> Result<T, LoadError> {
        Err(LoadError::SymbolNotFound {
            symbol: symbol.to_string(),
            library: self.path.clone(),
        })
    }

    /// Path the library was loaded from
    pub fn path(&self) -> &str {
        &self.path
    }
}

#[cfg(unix)]
fn last_error() -> String {
    unsafe {
        let err = libc::dlerror();
        if err.is_null() {
            "Unknown error".to_string()
        } else {
            CStr::from_ptr(err).to_string_lossy().into_owned()
        }
    }
}

impl Drop for Library {
    fn drop(&mut self) {
        #[cfg(unix)]
        unsafe {
            libc::dlclose(self.handle);
        }
    }
}
