//! Error types for the bridge

/// Result type for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Bridge error types
///
/// Boundary operations (file I/O, numeric parsing) degrade to sentinel
/// values instead of producing these. Every variant here is fatal for the
/// guest call that raised it.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BridgeError {
    /// No native implementation is registered for the owner/key pair
    #[error("Unresolved native method: {owner}.{key}")]
    UnresolvedNativeMethod {
        /// Fully qualified owning type name
        owner: String,
        /// Signature key
        key: String,
    },

    /// The operation exists but is deliberately not supported
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// Method handle carries an invocation kind outside the known set
    #[error("Unsupported invocation kind: {0}")]
    UnsupportedInvocationKind(u8),

    /// Type mismatch during argument or value conversion
    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch {
        /// Expected type name
        expected: String,
        /// Actual type name
        got: String,
    },

    /// Invalid argument
    #[error("Argument error: {0}")]
    ArgumentError(String),

    /// Guest method lookup failed
    #[error("No method {key} on {owner}")]
    MissingMethod {
        /// Type the lookup started from
        owner: String,
        /// Signature key
        key: String,
    },

    /// A type could not be instantiated
    #[error("Cannot instantiate {class}: {reason}")]
    Instantiation {
        /// Type name
        class: String,
        /// Reason
        reason: String,
    },

    /// A reference does not point at a live heap entry of the right shape
    #[error("Invalid reference: {0}")]
    InvalidReference(String),

    /// Binary module failure
    #[error("Module error: {0}")]
    ModuleError(String),
}

impl BridgeError {
    /// Shorthand for a [`BridgeError::TypeMismatch`]
    pub fn type_mismatch(expected: impl Into<String>, got: impl Into<String>) -> Self {
        BridgeError::TypeMismatch {
            expected: expected.into(),
            got: got.into(),
        }
    }

    /// Shorthand for a [`BridgeError::UnresolvedNativeMethod`]
    pub fn unresolved(owner: impl Into<String>, key: impl Into<String>) -> Self {
        BridgeError::UnresolvedNativeMethod {
            owner: owner.into(),
            key: key.into(),
        }
    }
}

impl From<String> for BridgeError {
    fn from(s: String) -> Self {
        BridgeError::ModuleError(s)
    }
}

impl From<&str> for BridgeError {
    fn from(s: &str) -> Self {
        BridgeError::ModuleError(s.to_string())
    }
}
