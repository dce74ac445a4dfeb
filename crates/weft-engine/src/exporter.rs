//! Service exporters
//!
//! A `ServiceExporter` is the provider-side component that makes a local
//! implementation available for wiring. It is registered in the component
//! registry under a deterministic name derived from the service's
//! interface, version and group, and publishes a `ServiceExported` signal
//! on first activation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use weft_config::{ConfigKind, ConfigNode, FieldValue};
use weft_error::{WiringError, WiringResult};

use crate::events::{LifecycleBus, LifecycleEvent};

/// Deterministic exporter name for a service identity.
///
/// Empty version/group qualifiers are omitted; a consumer-side reference
/// built from the same qualifiers computes the same name.
pub fn exporter_name(interface: &str, version: Option<&str>, group: Option<&str>) -> String {
    let mut name = format!("exporter:{}", interface);
    if let Some(version) = version.filter(|value| !value.is_empty()) {
        name.push(':');
        name.push_str(version);
    }
    if let Some(group) = group.filter(|value| !value.is_empty()) {
        name.push(':');
        name.push_str(group);
    }
    name
}

/// Provider-side exporter for one service configuration node
pub struct ServiceExporter {
    name: String,
    service: ConfigNode,
    interface: String,
    target_ref: Option<String>,
    exported: AtomicBool,
    bus: Arc<LifecycleBus>,
}

impl std::fmt::Debug for ServiceExporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceExporter")
            .field("name", &self.name)
            .field("interface", &self.interface)
            .field("target_ref", &self.target_ref)
            .field("exported", &self.exported)
            .finish()
    }
}

impl ServiceExporter {
    /// Build an exporter from a registered service node
    pub fn from_node(node: &ConfigNode, bus: Arc<LifecycleBus>) -> WiringResult<Self> {
        if node.kind != ConfigKind::Service {
            return Err(WiringError::UnknownDeclaration {
                id: node.id.clone(),
                reason: "not a service declaration".to_string(),
            });
        }
        let interface = node
            .literal("interface")
            .ok_or_else(|| WiringError::UnknownDeclaration {
                id: node.id.clone(),
                reason: "service declares no interface".to_string(),
            })?
            .to_string();

        let target_ref = match node.field("ref") {
            Some(FieldValue::Reference(name)) => Some(name.clone()),
            Some(FieldValue::Node(implementation)) => Some(implementation.id.clone()),
            _ => None,
        };

        let name = exporter_name(&interface, node.literal("version"), node.literal("group"));
        Ok(ServiceExporter {
            name,
            service: node.clone(),
            interface,
            target_ref,
            exported: AtomicBool::new(false),
            bus,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn service(&self) -> &ConfigNode {
        &self.service
    }

    pub fn interface(&self) -> &str {
        &self.interface
    }

    /// Name of the backing implementation component
    pub fn target_ref(&self) -> Option<&str> {
        self.target_ref.as_deref()
    }

    pub fn is_exported(&self) -> bool {
        self.exported.load(Ordering::SeqCst)
    }

    /// Mark the exporter active and publish the export signal, once
    pub fn export(&self) {
        if !self.exported.swap(true, Ordering::SeqCst) {
            tracing::info!(name = %self.name, "service exported");
            self.bus.publish(&LifecycleEvent::ServiceExported {
                name: self.name.clone(),
            });
        }
    }
}
