//! Native-method import table
//!
//! Two-level lookup: owning type name, then signature key. The table is
//! built once and is read-only afterwards; [`ImportTable::standard`] is
//! shared by every runtime that does not bring its own.
//!
//! Every entry records whether it is a static or an instance native.
//! Instance natives receive the receiver as `args[0]`.

mod charset;
mod invoke;
mod io;
mod lang;
mod numbers;
mod reflect;
mod web;

use crate::runtime::Runtime;
use crate::types::MethodKind;
use bytelink_sdk::{BridgeError, BridgeResult, Value};
use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;

/// A host implementation of a native method
pub type HostFn = Arc<dyn Fn(&mut Runtime, &[Value]) -> BridgeResult<Value> + Send + Sync>;

/// One resolved native
#[derive(Clone)]
pub struct ImportEntry {
    /// Implementation
    pub function: HostFn,
    /// Static or instance
    pub kind: MethodKind,
}

impl fmt::Debug for ImportEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImportEntry").field("kind", &self.kind).finish()
    }
}

static STANDARD: Lazy<Arc<ImportTable>> = Lazy::new(|| {
    let mut builder = ImportTable::builder();
    register_standard(&mut builder);
    Arc::new(builder.build())
});

/// Register every bridged native into `builder`
pub fn register_standard(builder: &mut ImportTableBuilder) {
    lang::register(builder);
    numbers::register(builder);
    reflect::register(builder);
    io::register(builder);
    invoke::register(builder);
    charset::register(builder);
    web::register(builder);
}

/// Immutable native-method table
#[derive(Debug, Default)]
pub struct ImportTable {
    owners: FxHashMap<String, FxHashMap<String, ImportEntry>>,
}

impl ImportTable {
    /// Start building a table
    pub fn builder() -> ImportTableBuilder {
        ImportTableBuilder::default()
    }

    /// The shared table holding every bridged native
    pub fn standard() -> Arc<ImportTable> {
        Arc::clone(&STANDARD)
    }

    /// Resolve `(owner, key)`
    pub fn resolve(&self, owner: &str, key: &str) -> BridgeResult<&ImportEntry> {
        self.owners
            .get(owner)
            .and_then(|keys| keys.get(key))
            .ok_or_else(|| BridgeError::unresolved(owner, key))
    }

    /// Check whether `(owner, key)` is bound
    pub fn contains(&self, owner: &str, key: &str) -> bool {
        self.owners
            .get(owner)
            .map(|keys| keys.contains_key(key))
            .unwrap_or(false)
    }

    /// Number of owners
    pub fn len(&self) -> usize {
        self.owners.len()
    }

    /// Check if the table is empty
    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    /// Owner names, sorted
    pub fn owners(&self) -> Vec<&str> {
        let mut owners: Vec<&str> = self.owners.keys().map(|k| k.as_str()).collect();
        owners.sort_unstable();
        owners
    }

    /// Keys bound for `owner` with their dispatch shape, sorted
    pub fn keys(&self, owner: &str) -> Vec<(&str, MethodKind)> {
        let mut keys: Vec<(&str, MethodKind)> = self
            .owners
            .get(owner)
            .map(|keys| keys.iter().map(|(k, e)| (k.as_str(), e.kind)).collect())
            .unwrap_or_default();
        keys.sort_unstable_by(|a, b| a.0.cmp(b.0));
        keys
    }
}

/// Builder for [`ImportTable`]
#[derive(Default)]
pub struct ImportTableBuilder {
    owners: FxHashMap<String, FxHashMap<String, ImportEntry>>,
}

impl ImportTableBuilder {
    fn insert(&mut self, owner: &str, key: &str, kind: MethodKind, function: HostFn) {
        let previous = self
            .owners
            .entry(owner.to_string())
            .or_default()
            .insert(key.to_string(), ImportEntry { function, kind });
        if previous.is_some() {
            log::warn!("native {}::{} registered twice", owner, key);
        }
    }

    /// Register a static native
    pub fn register_static(
        &mut self,
        owner: &str,
        key: &str,
        function: impl Fn(&mut Runtime, &[Value]) -> BridgeResult<Value> + Send + Sync + 'static,
    ) -> &mut Self {
        self.insert(owner, key, MethodKind::Static, Arc::new(function));
        self
    }

    /// Register an instance native; the receiver arrives as `args[0]`
    pub fn register_instance(
        &mut self,
        owner: &str,
        key: &str,
        function: impl Fn(&mut Runtime, &[Value]) -> BridgeResult<Value> + Send + Sync + 'static,
    ) -> &mut Self {
        self.insert(owner, key, MethodKind::Instance, Arc::new(function));
        self
    }

    /// Finish the table
    pub fn build(self) -> ImportTable {
        ImportTable {
            owners: self.owners,
        }
    }
}

// ============================================================================
// Argument helpers
// ============================================================================

pub(crate) fn arg(args: &[Value], index: usize) -> BridgeResult<Value> {
    args.get(index).copied().ok_or_else(|| {
        BridgeError::ArgumentError(format!(
            "missing argument {} (got {})",
            index,
            args.len()
        ))
    })
}

pub(crate) fn int_arg(args: &[Value], index: usize) -> BridgeResult<i32> {
    arg(args, index)?.expect_i32()
}

pub(crate) fn long_arg(args: &[Value], index: usize) -> BridgeResult<i64> {
    arg(args, index)?.expect_i64()
}

pub(crate) fn float_arg(args: &[Value], index: usize) -> BridgeResult<f32> {
    arg(args, index)?.expect_f32()
}

pub(crate) fn double_arg(args: &[Value], index: usize) -> BridgeResult<f64> {
    arg(args, index)?.expect_f64()
}

/// Index argument that must be non-negative
pub(crate) fn index_arg(args: &[Value], index: usize) -> BridgeResult<usize> {
    let value = int_arg(args, index)?;
    usize::try_from(value)
        .map_err(|_| BridgeError::ArgumentError(format!("negative index {}", value)))
}
