//! Lazy proxy handlers
//!
//! A `LazyProxyHandler` stands in for a local exporter's backing instance
//! before the exporter has activated. Resolution happens at most once:
//! either eagerly, when the export signal arrives, or lazily on the first
//! real call. Racing callers block on the same guarded initialization and
//! observe the one resolved target.

use std::sync::Arc;

use once_cell::sync::OnceCell;
use serde_json::Value;
use weft_error::{ServiceError, WiringError, WiringResult};

use crate::component::{ComponentRegistry, ComponentRegistryExt};
use crate::exporter::ServiceExporter;
use crate::invoke::{Invocable, Invocation, ServiceInstance};

/// Deferred-binding forwarding object for one referenced exporter.
///
/// State machine: `Pending -> Resolved`, terminal and irreversible. The
/// transition performs exactly one registry lookup even when the export
/// signal and a first call race.
pub struct LazyProxyHandler {
    referenced_name: String,
    components: Arc<dyn ComponentRegistry>,
    target: OnceCell<Arc<dyn Invocable>>,
}

impl LazyProxyHandler {
    pub fn new(referenced_name: impl Into<String>, components: Arc<dyn ComponentRegistry>) -> Self {
        LazyProxyHandler {
            referenced_name: referenced_name.into(),
            components,
            target: OnceCell::new(),
        }
    }

    pub fn referenced_name(&self) -> &str {
        &self.referenced_name
    }

    pub fn is_resolved(&self) -> bool {
        self.target.get().is_some()
    }

    /// Eagerly resolve the target; used by the export signal path
    pub fn ensure_resolved(&self) -> WiringResult<()> {
        self.resolved_target().map(|_| ())
    }

    fn resolved_target(&self) -> WiringResult<&Arc<dyn Invocable>> {
        self.target.get_or_try_init(|| self.lookup())
    }

    /// The single registry lookup: exporter by referenced name, then its
    /// configured target implementation.
    fn lookup(&self) -> WiringResult<Arc<dyn Invocable>> {
        let exporter = self
            .components
            .get_as::<ServiceExporter>(&self.referenced_name)
            .ok_or_else(|| WiringError::MissingDependency(self.referenced_name.clone()))?;
        let target_ref = exporter
            .target_ref()
            .ok_or_else(|| WiringError::MissingDependency(self.referenced_name.clone()))?;
        let instance = self
            .components
            .get_as::<ServiceInstance>(target_ref)
            .ok_or_else(|| WiringError::MissingDependency(target_ref.to_string()))?;
        tracing::debug!(referenced = %self.referenced_name, target = target_ref, "lazy proxy resolved");
        Ok(instance.invocable())
    }
}

impl Invocable for LazyProxyHandler {
    fn invoke(&self, invocation: Invocation) -> Result<Value, ServiceError> {
        let target = self
            .resolved_target()
            .map_err(|err| Box::new(err) as ServiceError)?;
        // the callee's own failure passes through unwrapped
        target.invoke(invocation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    use serde_json::json;
    use weft_config::{ConfigKind, ConfigNode, FieldValue};

    use crate::component::{Component, InMemoryComponentRegistry};
    use crate::events::LifecycleBus;
    use crate::invoke::ServiceFn;

    /// Registry wrapper that counts lookups of one name
    struct CountingRegistry {
        inner: InMemoryComponentRegistry,
        counted: String,
        lookups: AtomicUsize,
    }

    impl CountingRegistry {
        fn new(counted: &str) -> Self {
            CountingRegistry {
                inner: InMemoryComponentRegistry::new(),
                counted: counted.to_string(),
                lookups: AtomicUsize::new(0),
            }
        }
    }

    impl ComponentRegistry for CountingRegistry {
        fn has(&self, name: &str) -> bool {
            self.inner.has(name)
        }

        fn get(&self, name: &str) -> Option<Component> {
            if name == self.counted {
                self.lookups.fetch_add(1, Ordering::SeqCst);
            }
            self.inner.get(name)
        }

        fn register(&self, name: &str, component: Component) {
            self.inner.register(name, component);
        }

        fn register_alias(&self, existing: &str, alias: &str) {
            self.inner.register_alias(existing, alias);
        }

        fn is_singleton(&self, name: &str) -> bool {
            self.inner.is_singleton(name)
        }

        fn clear(&self) {
            self.inner.clear();
        }
    }

    fn install_exporter(components: &dyn ComponentRegistry, name_hint: &str) -> String {
        let mut node = ConfigNode::new(ConfigKind::Service);
        node.id = name_hint.to_string();
        node.set_field(
            "interface",
            FieldValue::Literal(format!("org.demo.{}", name_hint)),
        );
        node.set_field(
            "ref",
            FieldValue::Reference(format!("{}Impl", name_hint)),
        );
        let exporter =
            ServiceExporter::from_node(&node, Arc::new(LifecycleBus::new())).unwrap();
        let name = exporter.name().to_string();
        components.register(&name, Arc::new(exporter));

        let service = ServiceFn::new(|invocation| Ok(json!({ "served": invocation.method })));
        components.register(
            &format!("{}Impl", name_hint),
            Arc::new(ServiceInstance::new(Arc::new(service))),
        );
        name
    }

    #[test]
    fn test_lazy_resolution_on_first_call() {
        let components: Arc<dyn ComponentRegistry> = Arc::new(InMemoryComponentRegistry::new());
        let name = install_exporter(components.as_ref(), "greeter");

        let handler = LazyProxyHandler::new(&name, components);
        assert!(!handler.is_resolved());

        let result = handler
            .invoke(Invocation::new("greet", Value::Null))
            .unwrap();
        assert_eq!(result, json!({ "served": "greet" }));
        assert!(handler.is_resolved());
    }

    #[test]
    fn test_missing_exporter_is_fatal_dependency() {
        let components: Arc<dyn ComponentRegistry> = Arc::new(InMemoryComponentRegistry::new());
        let handler = LazyProxyHandler::new("exporter:org.demo.Missing", components);

        let err = handler
            .invoke(Invocation::new("greet", Value::Null))
            .unwrap_err();
        assert!(err.to_string().contains("exporter:org.demo.Missing"));
        // failed resolution leaves the handler pending for a later retry
        assert!(!handler.is_resolved());
    }

    #[test]
    fn test_concurrent_first_use_resolves_once() {
        let registry = Arc::new(CountingRegistry::new("exporter:org.demo.greeter"));
        install_exporter(registry.as_ref(), "greeter");
        let components: Arc<dyn ComponentRegistry> = registry.clone();

        let handler = Arc::new(LazyProxyHandler::new(
            "exporter:org.demo.greeter",
            components,
        ));

        let threads: Vec<_> = (0..8)
            .map(|i| {
                let handler = handler.clone();
                thread::spawn(move || {
                    handler
                        .invoke(Invocation::new(format!("call{}", i), Value::Null))
                        .unwrap()
                })
            })
            .collect();
        for thread in threads {
            thread.join().unwrap();
        }

        assert!(handler.is_resolved());
        // exactly one exporter lookup across all racing first calls
        assert_eq!(registry.lookups.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_callee_error_passes_through_unwrapped() {
        let components: Arc<dyn ComponentRegistry> = Arc::new(InMemoryComponentRegistry::new());
        let mut node = ConfigNode::new(ConfigKind::Service);
        node.id = "failing".to_string();
        node.set_field(
            "interface",
            FieldValue::Literal("org.demo.Failing".to_string()),
        );
        node.set_field("ref", FieldValue::Reference("failingImpl".to_string()));
        let exporter = ServiceExporter::from_node(&node, Arc::new(LifecycleBus::new())).unwrap();
        let name = exporter.name().to_string();
        components.register(&name, Arc::new(exporter));
        components.register(
            "failingImpl",
            Arc::new(ServiceInstance::new(Arc::new(ServiceFn::new(|_| {
                Err("backend exploded".into())
            })))),
        );

        let handler = LazyProxyHandler::new(&name, components);
        let err = handler
            .invoke(Invocation::new("greet", Value::Null))
            .unwrap_err();
        assert_eq!(err.to_string(), "backend exploded");
    }
}
