//! Declarative configuration compiler for the Weft wiring resolver
//!
//! Turns declaration trees (tags with attributes and nested children, or
//! flat attribute bags) into a registry of uniquely identified, typed
//! configuration nodes. Attribute-to-field mapping is driven by static
//! per-kind schemas; nested parameters, methods, arguments and
//! provider/consumer composition are handled structurally.

pub mod builder;
pub mod ident;
pub mod node;
pub mod registry;
pub mod schema;

// Re-export key types
pub use builder::GraphBuilder;
pub use ident::{allocate, IdRequest};
pub use node::{
    ConfigKind, ConfigNode, Declaration, FieldValue, DEFAULT_PROTOCOL_ID, HIDDEN_KEY_PREFIX,
    REGISTRY_DISABLED,
};
pub use registry::DeclarationRegistry;
pub use schema::{camel_to_dash, schema, FieldKind, FieldSpec, KindSchema};

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
