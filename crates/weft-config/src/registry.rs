//! Declaration registry
//!
//! Holds every registered configuration node, keyed by id. Registration of
//! a duplicate id is a fatal configuration error. Graph building is
//! single-threaded, but the registry is shared with the binding engine
//! afterwards, so reads take a shared lock.

use std::collections::HashMap;

use parking_lot::RwLock;
use weft_error::{WiringError, WiringResult};

use crate::node::{ConfigKind, ConfigNode};

/// Registry of built configuration nodes
#[derive(Debug, Default)]
pub struct DeclarationRegistry {
    nodes: RwLock<HashMap<String, ConfigNode>>,
}

impl DeclarationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.read().contains_key(id)
    }

    /// Register a node under its id. Fails with `DuplicateIdentifier` when
    /// the id is already taken; the node must carry a non-empty id.
    pub fn register(&self, node: ConfigNode) -> WiringResult<()> {
        if node.id.is_empty() {
            return Err(WiringError::UnknownDeclaration {
                id: String::new(),
                reason: "cannot register an anonymous node".to_string(),
            });
        }
        let mut nodes = self.nodes.write();
        if nodes.contains_key(&node.id) {
            return Err(WiringError::DuplicateIdentifier(node.id));
        }
        tracing::debug!(id = %node.id, kind = ?node.kind, "registered configuration node");
        nodes.insert(node.id.clone(), node);
        Ok(())
    }

    /// Replace a previously registered node in place. Used by the builder
    /// to complete a node whose id was claimed before its fields were
    /// mapped.
    pub(crate) fn replace(&self, node: &ConfigNode) {
        self.nodes.write().insert(node.id.clone(), node.clone());
    }

    pub fn get(&self, id: &str) -> Option<ConfigNode> {
        self.nodes.read().get(id).cloned()
    }

    /// Fetch a node only when it has the expected kind
    pub fn get_kind(&self, id: &str, kind: ConfigKind) -> Option<ConfigNode> {
        self.nodes
            .read()
            .get(id)
            .filter(|node| node.kind == kind)
            .cloned()
    }

    /// Singleton scope of a registered node; unknown ids default to true
    pub fn is_singleton(&self, id: &str) -> bool {
        self.nodes
            .read()
            .get(id)
            .map(|node| node.singleton)
            .unwrap_or(true)
    }

    pub fn ids(&self) -> Vec<String> {
        self.nodes.read().keys().cloned().collect()
    }

    /// Ids of all registered nodes of the given kind
    pub fn ids_of_kind(&self, kind: ConfigKind) -> Vec<String> {
        self.nodes
            .read()
            .values()
            .filter(|node| node.kind == kind)
            .map(|node| node.id.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.read().is_empty()
    }

    /// Patch a registered node in place; returns false when absent
    pub fn update(&self, id: &str, patch: impl FnOnce(&mut ConfigNode)) -> bool {
        let mut nodes = self.nodes.write();
        match nodes.get_mut(id) {
            Some(node) => {
                patch(node);
                true
            }
            None => false,
        }
    }

    /// Visit every registered node mutably, in one locked pass
    pub fn for_each_mut(&self, mut visit: impl FnMut(&mut ConfigNode)) {
        let mut nodes = self.nodes.write();
        for node in nodes.values_mut() {
            visit(node);
        }
    }

    /// Drop every registered node
    pub fn clear(&self) {
        self.nodes.write().clear();
    }
}
