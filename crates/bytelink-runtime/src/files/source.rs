//! Byte sources backing `openForRead`

use super::http::HttpSource;
use crate::config::FileSourceConfig;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors a byte source can report. The file table turns all of them into `-1`.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Nothing at that path
    #[error("Not found: {0}")]
    NotFound(String),

    /// Server answered with something other than 200
    #[error("HTTP {status} for {path}")]
    Status {
        /// Status code
        status: u16,
        /// Requested path
        path: String,
    },

    /// Invalid URL or path
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Malformed response
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Synchronous provider of whole-file byte buffers
pub trait ByteSource: Send + Sync {
    /// Fetch the complete contents at `path`
    fn fetch(&self, path: &str) -> Result<Vec<u8>, FetchError>;

    /// Probe whether `path` exists without keeping its contents
    fn exists(&self, path: &str) -> bool {
        self.fetch(path).is_ok()
    }
}

/// Build the byte source described by configuration
pub fn from_config(config: &FileSourceConfig) -> Result<Arc<dyn ByteSource>, FetchError> {
    Ok(match config {
        FileSourceConfig::Http {
            base_url,
            timeout_ms,
        } => Arc::new(HttpSource::new(
            base_url,
            Duration::from_millis(*timeout_ms),
        )?),
        FileSourceConfig::Directory { root } => Arc::new(DirectorySource::new(root.clone())),
        FileSourceConfig::Memory => Arc::new(MemorySource::new()),
    })
}

// ============================================================================
// Memory
// ============================================================================

/// Buffers staged by the embedder, possibly from other threads
#[derive(Debug, Default)]
pub struct MemorySource {
    files: RwLock<FxHashMap<String, Arc<[u8]>>>,
}

impl MemorySource {
    /// Create an empty source
    pub fn new() -> Self {
        Self {
            files: RwLock::new(FxHashMap::default()),
        }
    }

    /// Stage `bytes` under `path`, replacing any previous contents
    pub fn stage(&self, path: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        let bytes: Vec<u8> = bytes.into();
        self.files.write().insert(path.into(), Arc::from(bytes));
    }

    /// Remove a staged buffer
    pub fn remove(&self, path: &str) -> bool {
        self.files.write().remove(path).is_some()
    }

    /// Number of staged buffers
    pub fn len(&self) -> usize {
        self.files.read().len()
    }

    /// Check if nothing is staged
    pub fn is_empty(&self) -> bool {
        self.files.read().is_empty()
    }
}

impl ByteSource for MemorySource {
    fn fetch(&self, path: &str) -> Result<Vec<u8>, FetchError> {
        self.files
            .read()
            .get(path)
            .map(|bytes| bytes.to_vec())
            .ok_or_else(|| FetchError::NotFound(path.to_string()))
    }

    fn exists(&self, path: &str) -> bool {
        self.files.read().contains_key(path)
    }
}

// ============================================================================
// Directory
// ============================================================================

/// Files below a root directory; paths may not escape the root
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    /// Create a source rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, FetchError> {
        let relative = Path::new(path.trim_start_matches('/'));
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(FetchError::InvalidPath(path.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

impl ByteSource for DirectorySource {
    fn fetch(&self, path: &str) -> Result<Vec<u8>, FetchError> {
        let full = self.resolve(path)?;
        if !full.is_file() {
            return Err(FetchError::NotFound(path.to_string()));
        }
        Ok(std::fs::read(full)?)
    }

    fn exists(&self, path: &str) -> bool {
        self.resolve(path).map(|p| p.is_file()).unwrap_or(false)
    }
}
