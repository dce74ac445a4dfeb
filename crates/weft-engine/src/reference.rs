//! Consumer-side reference declarations and remote reference objects
//!
//! A `ReferenceDeclaration` is the consumer's statement of intent: a
//! service interface plus an attribute bag of qualifiers. The binder turns
//! it into a cached `RemoteReference`, whose remote proxy is produced
//! lazily through the external `RemoteProxyFactory` seam (the RPC engine
//! lives behind it).

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use once_cell::sync::OnceCell;
use weft_config::{ConfigKind, ConfigNode, DeclarationRegistry, GraphBuilder};
use weft_error::WiringResult;

use crate::invoke::Invocable;

/// A service interface identity with its declared supertypes.
///
/// Assignability is decided statically from the declared names: an
/// interface can serve a request for itself or for any interface it
/// declares as a supertype.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceSpec {
    pub name: String,
    pub extends: BTreeSet<String>,
}

impl InterfaceSpec {
    pub fn new(name: impl Into<String>) -> Self {
        InterfaceSpec {
            name: name.into(),
            extends: BTreeSet::new(),
        }
    }

    /// Declare a supertype
    pub fn with_extends(mut self, parent: impl Into<String>) -> Self {
        self.extends.insert(parent.into());
        self
    }

    /// Whether a binding for this interface can serve the requested one
    pub fn assignable_to(&self, requested: &InterfaceSpec) -> bool {
        self.name == requested.name || self.extends.contains(&requested.name)
    }
}

/// The consumer-side unit handed to the binder
#[derive(Debug, Clone)]
pub struct ReferenceDeclaration {
    pub interface: InterfaceSpec,
    pub attributes: BTreeMap<String, String>,
}

impl ReferenceDeclaration {
    pub fn new(interface: InterfaceSpec) -> Self {
        ReferenceDeclaration {
            interface,
            attributes: BTreeMap::new(),
        }
    }

    /// Set a qualifier attribute (`version`, `group`, `id`, `in-process`, …)
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Identity of this consumer binding: the explicit id when present,
    /// otherwise a deterministic signature of the sorted attribute bag
    /// plus the interface name.
    pub fn reference_name(&self) -> String {
        if let Some(id) = self
            .attributes
            .get("id")
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
        {
            return id.to_string();
        }

        let mut name = String::from("reference");
        if !self.attributes.is_empty() {
            name.push('(');
            let mut first = true;
            for (key, value) in &self.attributes {
                if !first {
                    name.push(',');
                }
                name.push_str(key);
                name.push('=');
                name.push_str(value);
                first = false;
            }
            name.push(')');
        }
        name.push(' ');
        name.push_str(&self.interface.name);
        name
    }
}

/// The seam to the external RPC engine: produces live remote proxies for
/// resolved reference objects.
pub trait RemoteProxyFactory: Send + Sync {
    fn create_proxy(&self, reference: &RemoteReference) -> WiringResult<Arc<dyn Invocable>>;
}

/// A cached consumer-side reference object.
///
/// Carries the reference configuration node built from the declaration's
/// attributes, the independently resolved optional configuration nodes,
/// and the lazily produced remote proxy.
pub struct RemoteReference {
    name: String,
    interface: InterfaceSpec,
    config: ConfigNode,
    registries: Vec<ConfigNode>,
    application: Option<ConfigNode>,
    module: Option<ConfigNode>,
    monitor: Option<ConfigNode>,
    proxy: OnceCell<Arc<dyn Invocable>>,
}

impl RemoteReference {
    /// Build the reference object for a declaration: detached config node
    /// from the attribute bag, plus registry/application/module/monitor
    /// configuration resolved independently (absent entries are skipped,
    /// never errors).
    pub fn from_declaration(
        name: &str,
        declaration: &ReferenceDeclaration,
        builder: &GraphBuilder,
        declarations: &DeclarationRegistry,
    ) -> WiringResult<Self> {
        let mut attributes = declaration.attributes.clone();
        attributes.insert(
            "interface".to_string(),
            declaration.interface.name.clone(),
        );
        let config = builder.build_detached(ConfigKind::Reference, &attributes)?;

        let registries = config
            .literal("registryIds")
            .map(|ids| {
                ids.split(|c: char| c == ',' || c == ' ')
                    .filter(|id| !id.is_empty())
                    .filter_map(|id| declarations.get_kind(id, ConfigKind::Registry))
                    .collect()
            })
            .unwrap_or_default();
        let application = config
            .reference("application")
            .and_then(|id| declarations.get_kind(id, ConfigKind::Application));
        let module = config
            .reference("module")
            .and_then(|id| declarations.get_kind(id, ConfigKind::Module));
        let monitor = config
            .reference("monitor")
            .and_then(|id| declarations.get_kind(id, ConfigKind::Monitor));

        Ok(RemoteReference {
            name: name.to_string(),
            interface: declaration.interface.clone(),
            config,
            registries,
            application,
            module,
            monitor,
            proxy: OnceCell::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn interface(&self) -> &InterfaceSpec {
        &self.interface
    }

    pub fn config(&self) -> &ConfigNode {
        &self.config
    }

    pub fn registries(&self) -> &[ConfigNode] {
        &self.registries
    }

    pub fn application(&self) -> Option<&ConfigNode> {
        self.application.as_ref()
    }

    pub fn module(&self) -> Option<&ConfigNode> {
        self.module.as_ref()
    }

    pub fn monitor(&self) -> Option<&ConfigNode> {
        self.monitor.as_ref()
    }

    /// The declaration forces remote mode when the same-process invocation
    /// flag is explicitly false.
    pub fn forces_remote(&self) -> bool {
        self.config.literal("inProcess") == Some("false")
    }

    /// Resolve the remote proxy through the factory, once; later calls
    /// return the cached proxy.
    pub fn resolve(&self, factory: &dyn RemoteProxyFactory) -> WiringResult<Arc<dyn Invocable>> {
        self.proxy
            .get_or_try_init(|| factory.create_proxy(self))
            .cloned()
    }
}
