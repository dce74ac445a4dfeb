// Weft error handling
// Central location for the error types surfaced by the wiring phase

use thiserror::Error;

// Re-export common error handling tools for convenience
pub use anyhow;
pub use thiserror;

/// Result type for wiring operations
pub type WiringResult<T> = Result<T, WiringError>;

/// Error type carried by service invocations.
///
/// The binder and the lazy proxy layer never wrap a callee's failure: a
/// remote or local call that fails surfaces the callee's own error through
/// this boxed type, unchanged.
pub type ServiceError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised while compiling declarations and binding references.
///
/// Every variant is fatal to the wiring phase. There is no partial or
/// best-effort continuation: the caller of the build/resolve operation
/// receives the error and the process is expected to abort startup.
#[derive(Error, Debug)]
pub enum WiringError {
    /// A node was registered under an id that is already taken.
    #[error("duplicate configuration id '{0}'")]
    DuplicateIdentifier(String),

    /// A `property` child is missing its name, or carries neither a value
    /// nor a ref (or both).
    #[error("malformed property tag '{name}': {reason}")]
    MalformedPropertyTag { name: String, reason: String },

    /// A `method` child without a name attribute.
    #[error("method declaration requires a non-empty name attribute")]
    EmptyMethodName,

    /// The target of a service `ref` is declared with non-singleton scope.
    #[error("the exported service ref '{0}' must be singleton scoped")]
    RefMustBeSingleton(String),

    /// A cached reference was reused under the same name with an
    /// incompatible interface.
    #[error("reference '{name}' is already bound to interface '{bound}', which cannot serve '{requested}'")]
    IncompatibleReferenceReuse {
        name: String,
        bound: String,
        requested: String,
    },

    /// A component the wiring depends on is absent from the registry.
    #[error("missing wiring dependency '{0}'")]
    MissingDependency(String),

    /// An operation named a declaration that does not exist or has the
    /// wrong kind.
    #[error("unknown declaration '{id}': {reason}")]
    UnknownDeclaration { id: String, reason: String },
}

impl WiringError {
    /// Stable machine-readable code for each error variant
    pub fn error_code(&self) -> &'static str {
        match self {
            WiringError::DuplicateIdentifier(_) => "WIRING_DUPLICATE_IDENTIFIER",
            WiringError::MalformedPropertyTag { .. } => "WIRING_MALFORMED_PROPERTY_TAG",
            WiringError::EmptyMethodName => "WIRING_EMPTY_METHOD_NAME",
            WiringError::RefMustBeSingleton(_) => "WIRING_REF_MUST_BE_SINGLETON",
            WiringError::IncompatibleReferenceReuse { .. } => "WIRING_INCOMPATIBLE_REFERENCE_REUSE",
            WiringError::MissingDependency(_) => "WIRING_MISSING_DEPENDENCY",
            WiringError::UnknownDeclaration { .. } => "WIRING_UNKNOWN_DECLARATION",
        }
    }
}
