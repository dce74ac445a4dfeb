//! Component registry
//!
//! The host container for named components: exporters, remote references
//! and local service instances. The registry is the seam the binder talks
//! to; `InMemoryComponentRegistry` is the in-process implementation with
//! alias indirection, so a consumer binding can share an exporter's
//! backing instance without a second registration.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

/// A registered component. Components are arbitrary shared objects; typed
/// access goes through [`ComponentRegistryExt::get_as`].
pub type Component = Arc<dyn Any + Send + Sync>;

/// Storage for named components
pub trait ComponentRegistry: Send + Sync {
    fn has(&self, name: &str) -> bool;
    fn get(&self, name: &str) -> Option<Component>;
    fn register(&self, name: &str, component: Component);
    /// Register `alias` as another name for an existing component
    fn register_alias(&self, existing: &str, alias: &str);
    /// Scope of the named component; process containers hold singletons
    fn is_singleton(&self, name: &str) -> bool;
    /// Drop every component and alias
    fn clear(&self);
}

/// Typed lookups over any component registry
pub trait ComponentRegistryExt {
    fn get_as<T: Send + Sync + 'static>(&self, name: &str) -> Option<Arc<T>>;
}

impl<R: ComponentRegistry + ?Sized> ComponentRegistryExt for R {
    fn get_as<T: Send + Sync + 'static>(&self, name: &str) -> Option<Arc<T>> {
        self.get(name).and_then(|component| component.downcast::<T>().ok())
    }
}

/// In-process component registry with alias indirection
#[derive(Default)]
pub struct InMemoryComponentRegistry {
    components: RwLock<HashMap<String, Component>>,
    aliases: RwLock<HashMap<String, String>>,
}

impl InMemoryComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Follow alias links to the canonical component name
    fn resolve_name(&self, name: &str) -> String {
        let aliases = self.aliases.read();
        let mut current = name;
        // alias chains are short; the hop limit only guards a cycle
        for _ in 0..=aliases.len() {
            match aliases.get(current) {
                Some(next) => current = next,
                None => break,
            }
        }
        current.to_string()
    }
}

impl ComponentRegistry for InMemoryComponentRegistry {
    fn has(&self, name: &str) -> bool {
        let canonical = self.resolve_name(name);
        self.components.read().contains_key(&canonical)
    }

    fn get(&self, name: &str) -> Option<Component> {
        let canonical = self.resolve_name(name);
        self.components.read().get(&canonical).cloned()
    }

    fn register(&self, name: &str, component: Component) {
        tracing::debug!(name, "registered component");
        self.components.write().insert(name.to_string(), component);
    }

    fn register_alias(&self, existing: &str, alias: &str) {
        if existing == alias {
            return;
        }
        tracing::debug!(existing, alias, "registered component alias");
        self.aliases
            .write()
            .insert(alias.to_string(), existing.to_string());
    }

    fn is_singleton(&self, _name: &str) -> bool {
        // every component held by the in-process container is a singleton
        true
    }

    fn clear(&self) {
        self.components.write().clear();
        self.aliases.write().clear();
    }
}
