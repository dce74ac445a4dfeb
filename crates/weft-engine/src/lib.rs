//! Reference binding engine for the Weft wiring resolver
//!
//! Consumes the configuration nodes produced by `weft-config` and binds
//! consumer references either to locally exported implementations (through
//! lazy proxy handlers woken by export signals) or to remote reference
//! objects resolved through the external RPC proxy factory.

pub mod binder;
pub mod component;
pub mod context;
pub mod events;
pub mod exporter;
pub mod handler;
pub mod invoke;
pub mod reference;

// Re-export key types
pub use binder::{BoundReference, ReferenceBinder};
pub use component::{
    Component, ComponentRegistry, ComponentRegistryExt, InMemoryComponentRegistry,
};
pub use context::WiringContext;
pub use events::{LifecycleBus, LifecycleEvent};
pub use exporter::{exporter_name, ServiceExporter};
pub use handler::LazyProxyHandler;
pub use invoke::{Invocable, Invocation, ServiceFn, ServiceInstance};
pub use reference::{
    InterfaceSpec, ReferenceDeclaration, RemoteProxyFactory, RemoteReference,
};

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
