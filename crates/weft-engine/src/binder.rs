//! Reference binder
//!
//! Resolves a consumer-side reference declaration to a bound component:
//! local bindings alias the exporter's backing instance and hand out lazy
//! proxies; remote bindings register the cached reference object and hand
//! out its resolved remote proxy. Caches are shared across initialization
//! threads; population is compute-if-absent so at most one reference
//! object or handler is constructed per key.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;
use weft_config::{DeclarationRegistry, GraphBuilder};
use weft_error::{ServiceError, WiringError, WiringResult};

use crate::component::{Component, ComponentRegistry, ComponentRegistryExt};
use crate::events::LifecycleEvent;
use crate::exporter::{exporter_name, ServiceExporter};
use crate::handler::LazyProxyHandler;
use crate::invoke::{Invocable, Invocation};
use crate::reference::{ReferenceDeclaration, RemoteProxyFactory, RemoteReference};

/// The component bound to a consumer reference
pub enum BoundReference {
    /// A lazy proxy forwarding to a local exporter's backing instance
    Local(Arc<LazyProxyHandler>),
    /// The resolved remote proxy
    Remote(Arc<dyn Invocable>),
}

impl std::fmt::Debug for BoundReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BoundReference::Local(_) => f.debug_tuple("Local").finish(),
            BoundReference::Remote(_) => f.debug_tuple("Remote").finish(),
        }
    }
}

impl BoundReference {
    pub fn is_local(&self) -> bool {
        matches!(self, BoundReference::Local(_))
    }

    pub fn invocable(&self) -> Arc<dyn Invocable> {
        match self {
            BoundReference::Local(handler) => handler.clone(),
            BoundReference::Remote(proxy) => proxy.clone(),
        }
    }
}

impl Invocable for BoundReference {
    fn invoke(&self, invocation: Invocation) -> Result<Value, ServiceError> {
        match self {
            BoundReference::Local(handler) => handler.invoke(invocation),
            BoundReference::Remote(proxy) => proxy.invoke(invocation),
        }
    }
}

/// Binds consumer reference declarations against the component registry
pub struct ReferenceBinder {
    declarations: Arc<DeclarationRegistry>,
    components: Arc<dyn ComponentRegistry>,
    proxy_factory: Arc<dyn RemoteProxyFactory>,
    builder: GraphBuilder,
    references: RwLock<HashMap<String, Arc<RemoteReference>>>,
    handlers: RwLock<HashMap<String, Arc<LazyProxyHandler>>>,
}

impl ReferenceBinder {
    pub fn new(
        declarations: Arc<DeclarationRegistry>,
        components: Arc<dyn ComponentRegistry>,
        proxy_factory: Arc<dyn RemoteProxyFactory>,
    ) -> Self {
        let builder = GraphBuilder::new(declarations.clone());
        ReferenceBinder {
            declarations,
            components,
            proxy_factory,
            builder,
            references: RwLock::new(HashMap::new()),
            handlers: RwLock::new(HashMap::new()),
        }
    }

    /// Resolve a reference declaration to its bound component
    pub fn resolve(&self, declaration: &ReferenceDeclaration) -> WiringResult<BoundReference> {
        let reference_name = declaration.reference_name();
        let reference = self.reference_if_absent(&reference_name, declaration)?;

        // identity of the potential local exporter, built from the mapped
        // config so legacy default qualifiers are already normalized
        let referenced_name = exporter_name(
            &declaration.interface.name,
            reference.config().literal("version"),
            reference.config().literal("group"),
        );

        let exporter = self.components.get_as::<ServiceExporter>(&referenced_name);
        let local = exporter.is_some() && !reference.forces_remote();

        if local {
            let exporter = exporter.ok_or_else(|| {
                WiringError::MissingDependency(referenced_name.clone())
            })?;
            let target_ref = exporter
                .target_ref()
                .ok_or_else(|| WiringError::MissingDependency(referenced_name.clone()))?;
            // share the exporter's backing instance instead of creating a
            // second component
            self.components.register_alias(target_ref, &reference_name);

            let handler = self.handler_if_absent(&referenced_name);
            tracing::debug!(reference = %reference_name, referenced = %referenced_name, "bound local reference");
            Ok(BoundReference::Local(handler))
        } else {
            if !self.components.has(&reference_name) {
                let component: Component = reference.clone();
                self.components.register(&reference_name, component);
            }
            // a present-but-unexported exporter is activated immediately so
            // a consumer in this process can reach it
            if let Some(exporter) = self.components.get_as::<ServiceExporter>(&referenced_name) {
                if !exporter.is_exported() {
                    exporter.export();
                }
            }
            let proxy = reference.resolve(self.proxy_factory.as_ref())?;
            tracing::debug!(reference = %reference_name, "bound remote reference");
            Ok(BoundReference::Remote(proxy))
        }
    }

    /// Cached reference object lookup: reuse requires interface
    /// compatibility; construction happens at most once per name.
    fn reference_if_absent(
        &self,
        reference_name: &str,
        declaration: &ReferenceDeclaration,
    ) -> WiringResult<Arc<RemoteReference>> {
        if let Some(existing) = self.references.read().get(reference_name) {
            return Self::check_compatible(existing, declaration).map(|_| existing.clone());
        }

        let built = Arc::new(RemoteReference::from_declaration(
            reference_name,
            declaration,
            &self.builder,
            &self.declarations,
        )?);

        match self.references.write().entry(reference_name.to_string()) {
            Entry::Occupied(entry) => {
                // another thread won the race; its entry is the binding
                let existing = entry.get().clone();
                Self::check_compatible(&existing, declaration)?;
                Ok(existing)
            }
            Entry::Vacant(entry) => Ok(entry.insert(built).clone()),
        }
    }

    fn check_compatible(
        existing: &RemoteReference,
        declaration: &ReferenceDeclaration,
    ) -> WiringResult<()> {
        if existing.interface().assignable_to(&declaration.interface) {
            Ok(())
        } else {
            Err(WiringError::IncompatibleReferenceReuse {
                name: existing.name().to_string(),
                bound: existing.interface().name.clone(),
                requested: declaration.interface.name.clone(),
            })
        }
    }

    /// Handler cache: one lazy proxy handler per referenced exporter, built
    /// once and shared by every proxy referencing it.
    fn handler_if_absent(&self, referenced_name: &str) -> Arc<LazyProxyHandler> {
        if let Some(handler) = self.handlers.read().get(referenced_name) {
            return handler.clone();
        }
        self.handlers
            .write()
            .entry(referenced_name.to_string())
            .or_insert_with(|| {
                Arc::new(LazyProxyHandler::new(
                    referenced_name,
                    self.components.clone(),
                ))
            })
            .clone()
    }

    /// Lifecycle subscription: an export signal eagerly resolves the
    /// matching handler and consumes its wake-up-pending entry.
    pub fn on_event(&self, event: &LifecycleEvent) {
        if let LifecycleEvent::ServiceExported { name } = event {
            let handler = self.handlers.write().remove(name);
            if let Some(handler) = handler {
                if let Err(err) = handler.ensure_resolved() {
                    tracing::warn!(name = %name, error = %err, "eager proxy resolution failed");
                }
            }
        }
    }

    /// A cached reference object, if any
    pub fn cached_reference(&self, reference_name: &str) -> Option<Arc<RemoteReference>> {
        self.references.read().get(reference_name).cloned()
    }

    /// A pending (not yet woken) handler, if any
    pub fn pending_handler(&self, referenced_name: &str) -> Option<Arc<LazyProxyHandler>> {
        self.handlers.read().get(referenced_name).cloned()
    }

    /// Drop every cached reference object and handler
    pub fn clear(&self) {
        self.references.write().clear();
        self.handlers.write().clear();
    }
}
