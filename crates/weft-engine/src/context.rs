//! Process-scoped wiring context
//!
//! Owns the declaration registry, the component registry, the lifecycle
//! bus and the reference binder, instead of keeping any of them in ambient
//! static state. Constructed at startup, passed to whoever wires services,
//! and torn down with a single synchronous `close` that clears every
//! cache.

use std::sync::Arc;

use weft_config::{ConfigKind, ConfigNode, Declaration, DeclarationRegistry, GraphBuilder};
use weft_error::{WiringError, WiringResult};

use crate::binder::{BoundReference, ReferenceBinder};
use crate::component::{ComponentRegistry, InMemoryComponentRegistry};
use crate::events::{LifecycleBus, LifecycleEvent};
use crate::exporter::ServiceExporter;
use crate::invoke::{Invocable, ServiceInstance};
use crate::reference::{ReferenceDeclaration, RemoteProxyFactory};

/// The process-scoped wiring state: registries, bus, builder and binder
pub struct WiringContext {
    declarations: Arc<DeclarationRegistry>,
    components: Arc<InMemoryComponentRegistry>,
    bus: Arc<LifecycleBus>,
    binder: Arc<ReferenceBinder>,
    builder: GraphBuilder,
}

impl WiringContext {
    /// Create a context wired to the given RPC proxy factory. The binder
    /// subscribes to the lifecycle bus for export signals.
    pub fn new(proxy_factory: Arc<dyn RemoteProxyFactory>) -> Self {
        let declarations = Arc::new(DeclarationRegistry::new());
        let components = Arc::new(InMemoryComponentRegistry::new());
        let bus = Arc::new(LifecycleBus::new());
        let registry: Arc<dyn ComponentRegistry> = components.clone();
        let binder = Arc::new(ReferenceBinder::new(
            declarations.clone(),
            registry,
            proxy_factory,
        ));

        let subscription = Arc::downgrade(&binder);
        bus.subscribe(move |event| {
            if let Some(binder) = subscription.upgrade() {
                binder.on_event(event);
            }
        });

        let builder = GraphBuilder::new(declarations.clone());
        WiringContext {
            declarations,
            components,
            bus,
            binder,
            builder,
        }
    }

    pub fn declarations(&self) -> &Arc<DeclarationRegistry> {
        &self.declarations
    }

    pub fn components(&self) -> Arc<dyn ComponentRegistry> {
        self.components.clone()
    }

    pub fn bus(&self) -> &Arc<LifecycleBus> {
        &self.bus
    }

    pub fn builder(&self) -> &GraphBuilder {
        &self.builder
    }

    /// Build every declaration, then run the second phase that links
    /// inline protocol values across the whole graph.
    pub fn build_all(&self, declarations: &[Declaration]) -> WiringResult<Vec<ConfigNode>> {
        let mut nodes = Vec::with_capacity(declarations.len());
        for declaration in declarations {
            nodes.push(self.builder.build_tree(declaration)?);
        }
        self.builder.finish();
        Ok(nodes)
    }

    /// Register a local service implementation under its component name
    pub fn register_service(&self, name: &str, service: Arc<dyn Invocable>) {
        self.components
            .register(name, Arc::new(ServiceInstance::new(service)));
    }

    /// Create the exporter for a registered service node and register it
    /// under its exporter name.
    pub fn install_exporter(&self, service_id: &str) -> WiringResult<Arc<ServiceExporter>> {
        let node = self.declarations.get(service_id).ok_or_else(|| {
            WiringError::UnknownDeclaration {
                id: service_id.to_string(),
                reason: "no such registered declaration".to_string(),
            }
        })?;
        if node.kind != ConfigKind::Service {
            return Err(WiringError::UnknownDeclaration {
                id: service_id.to_string(),
                reason: "not a service declaration".to_string(),
            });
        }

        let exporter = Arc::new(ServiceExporter::from_node(&node, self.bus.clone())?);
        self.components.register(exporter.name(), exporter.clone());
        Ok(exporter)
    }

    /// Bind a consumer reference declaration
    pub fn resolve(&self, declaration: &ReferenceDeclaration) -> WiringResult<BoundReference> {
        self.binder.resolve(declaration)
    }

    pub fn binder(&self) -> &Arc<ReferenceBinder> {
        &self.binder
    }

    /// Synchronous, total teardown: every cache is cleared, with no
    /// partial-release semantics.
    pub fn close(&self) {
        tracing::info!("closing wiring context");
        self.bus.publish(&LifecycleEvent::ContextClosed);
        self.binder.clear();
        self.components.clear();
        self.declarations.clear();
    }
}
