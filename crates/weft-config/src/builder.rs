//! Declaration graph builder
//!
//! Walks a declaration tree and produces registered configuration nodes:
//! identifier allocation, kind-specific structural rules (protocol
//! back-patching, service implementation nodes, provider/consumer
//! composition), schema-driven attribute mapping, and the nested
//! parameter/method/argument/property scans.
//!
//! Building is single-threaded: registration order drives identifier
//! disambiguation. `finish` runs the second phase that links inline
//! protocol values independently of declaration order.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use weft_error::{WiringError, WiringResult};

use crate::ident::{self, IdRequest};
use crate::node::{
    ConfigKind, ConfigNode, Declaration, FieldValue, HIDDEN_KEY_PREFIX, REGISTRY_DISABLED,
};
use crate::registry::DeclarationRegistry;
use crate::schema::{self, FieldKind, FieldSpec, KindSchema, CALLBACK_FIELDS};

/// Builds configuration nodes out of declaration trees and registers them
/// into a declaration registry.
#[derive(Debug, Clone)]
pub struct GraphBuilder {
    registry: Arc<DeclarationRegistry>,
}

impl GraphBuilder {
    pub fn new(registry: Arc<DeclarationRegistry>) -> Self {
        GraphBuilder { registry }
    }

    pub fn registry(&self) -> &Arc<DeclarationRegistry> {
        &self.registry
    }

    /// Build a declaration whose kind is derived from its tag
    pub fn build_tree(&self, decl: &Declaration) -> WiringResult<ConfigNode> {
        let kind = ConfigKind::from_tag(&decl.tag).ok_or_else(|| WiringError::UnknownDeclaration {
            id: decl.tag.clone(),
            reason: "not a declarable configuration tag".to_string(),
        })?;
        self.build(decl, kind, kind.requires_id())
    }

    /// Build one declaration as a node of the given kind.
    ///
    /// The node is registered under its resolved id as a side effect;
    /// nodes without an id (nested method/argument descriptors without an
    /// explicit id) stay anonymous.
    pub fn build(
        &self,
        decl: &Declaration,
        kind: ConfigKind,
        id_required: bool,
    ) -> WiringResult<ConfigNode> {
        let id = ident::allocate(
            |candidate| self.registry.contains(candidate),
            IdRequest {
                explicit_id: decl.attribute("id"),
                explicit_name: decl.attribute("name"),
                kind_default: kind.default_id(),
                interface_name: decl.attribute("interface"),
                type_name: kind.type_name(),
                id_required,
            },
        )?;

        let mut node = ConfigNode::new(kind);
        node.singleton = decl.attribute("scope") != Some("prototype");
        if let Some(id) = id {
            node.id = id;
            // Claim the id before children are built, so nested allocation
            // and collision checks see it.
            self.registry.register(node.clone())?;
        }

        match kind {
            ConfigKind::Protocol => {
                if !node.id.is_empty() {
                    self.patch_inline_protocols(&node.id);
                }
            }
            ConfigKind::Service => {
                if let Some(class) = decl.attribute("class") {
                    let implementation = self.build_instance(decl, &node.id, class)?;
                    node.set_field("ref", FieldValue::Node(Box::new(implementation)));
                }
            }
            ConfigKind::Provider => {
                self.build_nested(decl, &node, ConfigKind::Service, true, "service", "provider")?;
            }
            ConfigKind::Consumer => {
                self.build_nested(
                    decl,
                    &node,
                    ConfigKind::Reference,
                    false,
                    "reference",
                    "consumer",
                )?;
            }
            _ => {}
        }

        self.map_fields(decl, kind, &mut node)?;

        if !node.id.is_empty() {
            self.registry.replace(&node);
        }
        Ok(node)
    }

    /// Map an attribute bag to a configuration node without registering it.
    ///
    /// This is the annotation-side path: consumer reference declarations
    /// carry a flat attribute bag instead of a declaration tree.
    pub fn build_detached(
        &self,
        kind: ConfigKind,
        attributes: &BTreeMap<String, String>,
    ) -> WiringResult<ConfigNode> {
        let mut decl = Declaration::new(kind.tag());
        decl.attributes = attributes.clone();

        let mut node = ConfigNode::new(kind);
        node.singleton = decl.attribute("scope") != Some("prototype");
        self.map_fields(&decl, kind, &mut node)?;
        Ok(node)
    }

    /// Second build phase: link every inline protocol value whose name
    /// matches a registered protocol node, regardless of declaration order.
    /// Returns the number of links resolved.
    pub fn finish(&self) -> usize {
        let protocol_ids: HashSet<String> = self
            .registry
            .ids_of_kind(ConfigKind::Protocol)
            .into_iter()
            .collect();

        let mut linked = 0;
        self.registry.for_each_mut(|node| {
            if let Some(name) = inline_protocol_name(node) {
                if protocol_ids.contains(&name) {
                    node.set_field("protocol", FieldValue::Reference(name));
                    linked += 1;
                }
            }
        });
        tracing::debug!(linked, "resolved inline protocol references");
        linked
    }

    /// Rewrite already-registered nodes whose inline protocol value names
    /// the protocol that was just registered.
    fn patch_inline_protocols(&self, protocol_id: &str) {
        self.registry.for_each_mut(|node| {
            if inline_protocol_name(node).as_deref() == Some(protocol_id) {
                node.set_field(
                    "protocol",
                    FieldValue::Reference(protocol_id.to_string()),
                );
            }
        });
    }

    /// Build the anonymous implementation node for a service declaring an
    /// explicit implementation class, from its `property` children.
    fn build_instance(
        &self,
        decl: &Declaration,
        service_id: &str,
        class: &str,
    ) -> WiringResult<ConfigNode> {
        let mut node = ConfigNode::new(ConfigKind::Instance);
        node.id = format!("{}Impl", service_id);
        node.set_field("class", FieldValue::Literal(class.to_string()));
        self.scan_properties(decl, &mut node)?;
        Ok(node)
    }

    /// Build the qualifying structural children of a provider/consumer
    /// node as nodes of the paired kind, wiring their back-reference field
    /// to the parent id.
    fn build_nested(
        &self,
        decl: &Declaration,
        parent: &ConfigNode,
        child_kind: ConfigKind,
        id_required: bool,
        tag: &str,
        back_ref: &str,
    ) -> WiringResult<()> {
        let parent_declared_default = decl.attribute("default").is_some();
        let mut first = true;
        for child_decl in decl.children_tagged(tag) {
            let child = self.build(child_decl, child_kind, id_required)?;
            if !child.id.is_empty() && !parent.id.is_empty() {
                self.registry.update(&child.id, |registered| {
                    registered
                        .set_field(back_ref, FieldValue::Reference(parent.id.clone()));
                    // The first child inherits the unset default flag, once
                    // per parent.
                    if first && !parent_declared_default
                        && !registered.fields.contains_key("default")
                    {
                        registered
                            .set_field("default", FieldValue::Literal("false".to_string()));
                    }
                });
            }
            first = false;
        }
        Ok(())
    }

    /// Schema-driven field mapping plus the structural child scans and the
    /// leftover-attribute fold.
    fn map_fields(
        &self,
        decl: &Declaration,
        kind: ConfigKind,
        node: &mut ConfigNode,
    ) -> WiringResult<()> {
        let schema = schema::schema(kind);
        for spec in &schema.fields {
            match spec.kind {
                FieldKind::Parameters => self.scan_parameters(decl, node),
                FieldKind::Methods => self.scan_methods(decl, node)?,
                FieldKind::Arguments => self.scan_arguments(decl, node)?,
                FieldKind::Literal | FieldKind::Ref => {
                    if let Some(value) = decl.attribute(&spec.external) {
                        self.apply_field(node, kind, spec, value)?;
                    }
                }
            }
        }
        self.fold_leftover_attributes(decl, kind, schema, node);
        Ok(())
    }

    /// Value-resolution rules for a single mapped attribute
    fn apply_field(
        &self,
        node: &mut ConfigNode,
        kind: ConfigKind,
        spec: &FieldSpec,
        value: &str,
    ) -> WiringResult<()> {
        // A registry of "N/A" disables registry participation entirely.
        if spec.field == "registry" && value.eq_ignore_ascii_case(REGISTRY_DISABLED) {
            let mut disabled = ConfigNode::new(ConfigKind::Registry);
            disabled.set_field(
                "address",
                FieldValue::Literal(REGISTRY_DISABLED.to_string()),
            );
            node.set_field("registry", FieldValue::Node(Box::new(disabled)));
            return Ok(());
        }

        // Identifier lists stay literal under "{field}Ids"; they are
        // resolved later against a local or remote configuration source.
        if spec.field == "provider"
            || spec.field == "registry"
            || (spec.field == "protocol" && kind.is_service_shaped())
        {
            node.set_field(
                format!("{}Ids", spec.field),
                FieldValue::Literal(value.to_string()),
            );
            return Ok(());
        }

        match spec.kind {
            FieldKind::Literal => {
                // Legacy schema defaults count as "not specified".
                if !schema::is_legacy_default(spec.field, value) {
                    node.set_field(spec.field, FieldValue::Literal(value.to_string()));
                }
            }
            FieldKind::Ref => {
                if CALLBACK_FIELDS.contains(&spec.field) {
                    self.apply_callback_field(node, spec, value);
                } else {
                    if spec.field == "ref"
                        && self.registry.contains(value)
                        && !self.registry.is_singleton(value)
                    {
                        return Err(WiringError::RefMustBeSingleton(value.to_string()));
                    }
                    node.set_field(spec.field, FieldValue::Reference(value.to_string()));
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// `<componentRef>.<methodName>` callback hooks split on the last dot
    fn apply_callback_field(&self, node: &mut ConfigNode, spec: &FieldSpec, value: &str) {
        match value.rfind('.') {
            Some(split) => {
                let (component, method) = (&value[..split], &value[split + 1..]);
                node.set_field(spec.field, FieldValue::Reference(component.to_string()));
                node.set_field(
                    format!("{}Method", spec.field),
                    FieldValue::Literal(method.to_string()),
                );
            }
            None => node.set_field(spec.field, FieldValue::Reference(value.to_string())),
        }
    }

    /// `<parameter key=.. value=.. hide=..>` children
    fn scan_parameters(&self, decl: &Declaration, node: &mut ConfigNode) {
        for child in decl.children_tagged("parameter") {
            let key = child.attribute("key").unwrap_or_default();
            let value = child.attribute("value").unwrap_or_default();
            let key = if child.attribute("hide") == Some("true") {
                format!("{}{}", HIDDEN_KEY_PREFIX, key)
            } else {
                key.to_string()
            };
            node.parameters.insert(key, value.to_string());
        }
    }

    /// `<method name=..>` children, built as descriptor nodes named
    /// `{id}.{methodName}`
    fn scan_methods(&self, decl: &Declaration, node: &mut ConfigNode) -> WiringResult<()> {
        let mut methods = Vec::new();
        for child in decl.children_tagged("method") {
            let name = child.attribute("name").ok_or(WiringError::EmptyMethodName)?;
            let descriptor_name = format!("{}.{}", node.id, name);
            let mut method = self.build(child, ConfigKind::Method, false)?;
            method.id = descriptor_name;
            methods.push(method);
        }
        if !methods.is_empty() {
            node.set_field("methods", FieldValue::NodeList(methods));
        }
        Ok(())
    }

    /// `<argument index=..>` children, built as descriptor nodes named
    /// `{id}.{index}`
    fn scan_arguments(&self, decl: &Declaration, node: &mut ConfigNode) -> WiringResult<()> {
        let mut arguments = Vec::new();
        for child in decl.children_tagged("argument") {
            let index = child.attribute("index").unwrap_or_default();
            let descriptor_name = format!("{}.{}", node.id, index);
            let mut argument = self.build(child, ConfigKind::Argument, false)?;
            argument.id = descriptor_name;
            arguments.push(argument);
        }
        if !arguments.is_empty() {
            node.set_field("arguments", FieldValue::NodeList(arguments));
        }
        Ok(())
    }

    /// `<property name=.. value=..|ref=..>` children of a service carrying
    /// an explicit implementation class
    fn scan_properties(&self, decl: &Declaration, node: &mut ConfigNode) -> WiringResult<()> {
        for child in decl.children_tagged("property") {
            let name = child
                .attribute("name")
                .ok_or_else(|| WiringError::MalformedPropertyTag {
                    name: String::new(),
                    reason: "missing name attribute".to_string(),
                })?;
            match (child.attribute("value"), child.attribute("ref")) {
                (Some(value), None) => {
                    node.set_field(name, FieldValue::Literal(value.to_string()));
                }
                (None, Some(reference)) => {
                    node.set_field(name, FieldValue::Reference(reference.to_string()));
                }
                (Some(_), Some(_)) => {
                    return Err(WiringError::MalformedPropertyTag {
                        name: name.to_string(),
                        reason: "both value and ref supplied".to_string(),
                    });
                }
                (None, None) => {
                    return Err(WiringError::MalformedPropertyTag {
                        name: name.to_string(),
                        reason: "requires exactly one of value or ref".to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Attributes not consumed by any known field are folded into the
    /// parameters map verbatim.
    fn fold_leftover_attributes(
        &self,
        decl: &Declaration,
        kind: ConfigKind,
        schema: &KindSchema,
        node: &mut ConfigNode,
    ) {
        for (name, value) in &decl.attributes {
            if name.is_empty() || name == "id" || name == "scope" {
                continue;
            }
            if kind == ConfigKind::Service && name == "class" {
                continue;
            }
            if schema.fields.iter().any(|spec| spec.external == *name) {
                continue;
            }
            node.parameters.insert(name.clone(), value.clone());
        }
    }
}

/// The name carried by an inline (unlinked) protocol value on a node
fn inline_protocol_name(node: &ConfigNode) -> Option<String> {
    match node.fields.get("protocol") {
        Some(FieldValue::Node(inline)) if inline.kind == ConfigKind::Protocol => {
            inline.literal("name").map(str::to_string)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> GraphBuilder {
        GraphBuilder::new(Arc::new(DeclarationRegistry::new()))
    }

    fn service(interface: &str) -> Declaration {
        Declaration::new("service").attr("interface", interface)
    }

    #[test]
    fn test_generated_ids_disambiguate() {
        let builder = builder();
        let first = builder.build_tree(&service("org.demo.Greeter")).unwrap();
        let second = builder.build_tree(&service("org.demo.Greeter")).unwrap();
        let third = builder.build_tree(&service("org.demo.Greeter")).unwrap();

        assert_eq!(first.id, "org.demo.Greeter");
        assert_eq!(second.id, "org.demo.Greeter2");
        assert_eq!(third.id, "org.demo.Greeter3");
        assert_eq!(builder.registry().len(), 3);
    }

    #[test]
    fn test_explicit_duplicate_id_is_fatal() {
        let builder = builder();
        builder
            .build_tree(&service("org.demo.Greeter").attr("id", "greeter"))
            .unwrap();
        let err = builder
            .build_tree(&service("org.demo.Other").attr("id", "greeter"))
            .unwrap_err();
        assert!(matches!(err, WiringError::DuplicateIdentifier(id) if id == "greeter"));
    }

    #[test]
    fn test_protocol_default_id() {
        let builder = builder();
        let node = builder
            .build_tree(&Declaration::new("protocol").attr("port", "20880"))
            .unwrap();
        assert_eq!(node.id, "weft");
        assert_eq!(node.literal("port"), Some("20880"));
    }

    #[test]
    fn test_registry_sentinel_disables_registry() {
        let builder = builder();
        let node = builder
            .build_tree(&service("org.demo.Greeter").attr("registry", "n/a"))
            .unwrap();

        let disabled = node.field("registry").and_then(FieldValue::as_node).unwrap();
        assert_eq!(disabled.kind, ConfigKind::Registry);
        assert_eq!(disabled.literal("address"), Some(REGISTRY_DISABLED));
        assert!(node.field("registryIds").is_none());
    }

    #[test]
    fn test_identifier_lists_stay_literal() {
        let builder = builder();
        let node = builder
            .build_tree(
                &service("org.demo.Greeter")
                    .attr("registry", "main,backup")
                    .attr("provider", "edge")
                    .attr("protocol", "weft"),
            )
            .unwrap();

        assert_eq!(node.literal("registryIds"), Some("main,backup"));
        assert_eq!(node.literal("providerIds"), Some("edge"));
        assert_eq!(node.literal("protocolIds"), Some("weft"));
        assert!(node.field("registry").is_none());
        assert!(node.field("provider").is_none());
        assert!(node.field("protocol").is_none());
    }

    #[test]
    fn test_legacy_defaults_are_skipped() {
        let builder = builder();
        let node = builder
            .build_tree(
                &service("org.demo.Greeter")
                    .attr("timeout", "0")
                    .attr("delay", "0")
                    .attr("async", "false")
                    .attr("version", "0.0.0")
                    .attr("retries", "0"),
            )
            .unwrap();

        assert!(node.field("timeout").is_none());
        assert!(node.field("delay").is_none());
        assert!(node.field("async").is_none());
        assert!(node.field("version").is_none());
        // "0" is only a legacy default for specific fields
        assert_eq!(node.literal("retries"), Some("0"));

        let node = builder
            .build_tree(&service("org.demo.Other").attr("timeout", "5"))
            .unwrap();
        assert_eq!(node.literal("timeout"), Some("5"));
    }

    #[test]
    fn test_hidden_parameters() {
        let builder = builder();
        let node = builder
            .build_tree(
                &service("org.demo.Greeter")
                    .child(
                        Declaration::new("parameter")
                            .attr("key", "token")
                            .attr("value", "secret")
                            .attr("hide", "true"),
                    )
                    .child(
                        Declaration::new("parameter")
                            .attr("key", "threads")
                            .attr("value", "8"),
                    ),
            )
            .unwrap();

        assert_eq!(node.parameters.get(".token").map(String::as_str), Some("secret"));
        assert_eq!(node.parameters.get("threads").map(String::as_str), Some("8"));
        assert!(node.parameters.get("token").is_none());
    }

    #[test]
    fn test_leftover_attributes_fold_into_parameters() {
        let builder = builder();
        let node = builder
            .build_tree(&service("org.demo.Greeter").attr("custom-flag", "on"))
            .unwrap();
        assert_eq!(
            node.parameters.get("custom-flag").map(String::as_str),
            Some("on")
        );
    }

    #[test]
    fn test_method_descriptors() {
        let builder = builder();
        let node = builder
            .build_tree(
                &service("org.demo.Greeter").attr("id", "greeter").child(
                    Declaration::new("method")
                        .attr("name", "greet")
                        .attr("timeout", "200")
                        .child(
                            Declaration::new("argument")
                                .attr("index", "0")
                                .attr("callback", "true"),
                        ),
                ),
            )
            .unwrap();

        let methods = node.field("methods").and_then(FieldValue::as_node_list).unwrap();
        assert_eq!(methods.len(), 1);
        assert_eq!(methods[0].id, "greeter.greet");
        assert_eq!(methods[0].literal("timeout"), Some("200"));

        let arguments = methods[0]
            .field("arguments")
            .and_then(FieldValue::as_node_list)
            .unwrap();
        assert_eq!(arguments[0].id, "greeter.greet.0");
        assert_eq!(arguments[0].literal("callback"), Some("true"));
    }

    #[test]
    fn test_empty_method_name_is_fatal() {
        let builder = builder();
        let err = builder
            .build_tree(
                &service("org.demo.Greeter")
                    .attr("id", "greeter")
                    .child(Declaration::new("method").attr("timeout", "200")),
            )
            .unwrap_err();
        assert!(matches!(err, WiringError::EmptyMethodName));
    }

    #[test]
    fn test_callback_hooks_split_on_last_dot() {
        let builder = builder();
        let node = builder
            .build(
                &Declaration::new("method")
                    .attr("name", "greet")
                    .attr("onreturn", "notifier.onGreetReturn"),
                ConfigKind::Method,
                false,
            )
            .unwrap();

        assert_eq!(node.reference("onreturn"), Some("notifier"));
        assert_eq!(node.literal("onreturnMethod"), Some("onGreetReturn"));
    }

    #[test]
    fn test_service_implementation_node() {
        let builder = builder();
        let node = builder
            .build_tree(
                &service("org.demo.Greeter")
                    .attr("id", "greeter")
                    .attr("class", "org.demo.GreeterImpl")
                    .child(
                        Declaration::new("property")
                            .attr("name", "prefix")
                            .attr("value", "hello"),
                    )
                    .child(
                        Declaration::new("property")
                            .attr("name", "store")
                            .attr("ref", "greetingStore"),
                    ),
            )
            .unwrap();

        let implementation = node.field("ref").and_then(FieldValue::as_node).unwrap();
        assert_eq!(implementation.id, "greeterImpl");
        assert_eq!(implementation.kind, ConfigKind::Instance);
        assert_eq!(implementation.literal("class"), Some("org.demo.GreeterImpl"));
        assert_eq!(implementation.literal("prefix"), Some("hello"));
        assert_eq!(implementation.reference("store"), Some("greetingStore"));
        // "class" is consumed by the implementation-node rule
        assert!(node.parameters.get("class").is_none());
    }

    #[test]
    fn test_malformed_property_tags() {
        let builder = builder();
        let err = builder
            .build_tree(
                &service("org.demo.Greeter")
                    .attr("class", "org.demo.GreeterImpl")
                    .child(Declaration::new("property").attr("name", "prefix")),
            )
            .unwrap_err();
        assert!(matches!(err, WiringError::MalformedPropertyTag { .. }));

        let err = builder
            .build_tree(
                &service("org.demo.Other")
                    .attr("class", "org.demo.OtherImpl")
                    .child(
                        Declaration::new("property")
                            .attr("name", "prefix")
                            .attr("value", "a")
                            .attr("ref", "b"),
                    ),
            )
            .unwrap_err();
        assert!(matches!(err, WiringError::MalformedPropertyTag { .. }));

        let err = builder
            .build_tree(
                &service("org.demo.Third")
                    .attr("class", "org.demo.ThirdImpl")
                    .child(Declaration::new("property").attr("value", "a")),
            )
            .unwrap_err();
        assert!(matches!(err, WiringError::MalformedPropertyTag { .. }));
    }

    #[test]
    fn test_provider_composition() {
        let builder = builder();
        builder
            .build_tree(
                &Declaration::new("provider")
                    .attr("id", "edge")
                    .child(service("org.demo.Greeter"))
                    .child(service("org.demo.Parting")),
            )
            .unwrap();

        let first = builder.registry().get("org.demo.Greeter").unwrap();
        let second = builder.registry().get("org.demo.Parting").unwrap();
        assert_eq!(first.reference("provider"), Some("edge"));
        assert_eq!(second.reference("provider"), Some("edge"));
        // only the first child inherits the unset default flag
        assert_eq!(first.literal("default"), Some("false"));
        assert!(second.field("default").is_none());
    }

    #[test]
    fn test_provider_with_explicit_default_leaves_children_alone() {
        let builder = builder();
        builder
            .build_tree(
                &Declaration::new("provider")
                    .attr("id", "edge")
                    .attr("default", "true")
                    .child(service("org.demo.Greeter")),
            )
            .unwrap();

        let child = builder.registry().get("org.demo.Greeter").unwrap();
        assert!(child.field("default").is_none());
        assert_eq!(child.reference("provider"), Some("edge"));
    }

    #[test]
    fn test_consumer_composition() {
        let builder = builder();
        builder
            .build_tree(
                &Declaration::new("consumer")
                    .attr("id", "edge-consumer")
                    .child(
                        Declaration::new("reference")
                            .attr("id", "greeter-ref")
                            .attr("interface", "org.demo.Greeter"),
                    ),
            )
            .unwrap();

        let child = builder.registry().get("greeter-ref").unwrap();
        assert_eq!(child.kind, ConfigKind::Reference);
        assert_eq!(child.reference("consumer"), Some("edge-consumer"));
    }

    #[test]
    fn test_ref_must_be_singleton() {
        let builder = builder();
        let mut prototype = ConfigNode::new(ConfigKind::Instance);
        prototype.id = "greeterImpl".to_string();
        prototype.singleton = false;
        builder.registry().register(prototype).unwrap();

        let err = builder
            .build_tree(&service("org.demo.Greeter").attr("ref", "greeterImpl"))
            .unwrap_err();
        assert!(matches!(err, WiringError::RefMustBeSingleton(name) if name == "greeterImpl"));
    }

    #[test]
    fn test_ref_to_unregistered_name_is_deferred() {
        let builder = builder();
        let node = builder
            .build_tree(&service("org.demo.Greeter").attr("ref", "greeterImpl"))
            .unwrap();
        assert_eq!(node.reference("ref"), Some("greeterImpl"));
    }

    #[test]
    fn test_protocol_back_patches_earlier_nodes() {
        let builder = builder();
        // a node registered before the protocol, holding an inline value
        let mut early = ConfigNode::new(ConfigKind::Service);
        early.id = "greeter".to_string();
        let mut inline = ConfigNode::new(ConfigKind::Protocol);
        inline.set_field("name", FieldValue::Literal("fast".to_string()));
        early.set_field("protocol", FieldValue::Node(Box::new(inline)));
        builder.registry().register(early).unwrap();

        builder
            .build_tree(&Declaration::new("protocol").attr("id", "fast"))
            .unwrap();

        let patched = builder.registry().get("greeter").unwrap();
        assert_eq!(patched.reference("protocol"), Some("fast"));
    }

    #[test]
    fn test_finish_links_forward_references() {
        let builder = builder();
        builder
            .build_tree(&Declaration::new("protocol").attr("id", "fast"))
            .unwrap();

        // registered after the protocol pass, still holding an inline value
        let mut late = ConfigNode::new(ConfigKind::Service);
        late.id = "greeter".to_string();
        let mut inline = ConfigNode::new(ConfigKind::Protocol);
        inline.set_field("name", FieldValue::Literal("fast".to_string()));
        late.set_field("protocol", FieldValue::Node(Box::new(inline)));
        builder.registry().register(late).unwrap();

        assert_eq!(builder.finish(), 1);
        let patched = builder.registry().get("greeter").unwrap();
        assert_eq!(patched.reference("protocol"), Some("fast"));

        // unknown protocol names are left untouched
        let mut other = ConfigNode::new(ConfigKind::Service);
        other.id = "other".to_string();
        let mut inline = ConfigNode::new(ConfigKind::Protocol);
        inline.set_field("name", FieldValue::Literal("missing".to_string()));
        other.set_field("protocol", FieldValue::Node(Box::new(inline)));
        builder.registry().register(other).unwrap();

        assert_eq!(builder.finish(), 0);
        let untouched = builder.registry().get("other").unwrap();
        assert!(untouched.field("protocol").and_then(FieldValue::as_node).is_some());
    }

    #[test]
    fn test_build_detached_maps_attribute_bag() {
        let builder = builder();
        let mut attributes = BTreeMap::new();
        attributes.insert("interface".to_string(), "org.demo.Greeter".to_string());
        attributes.insert("version".to_string(), "1.0.0".to_string());
        attributes.insert("timeout".to_string(), "0".to_string());
        attributes.insert("in-process".to_string(), "false".to_string());

        let node = builder
            .build_detached(ConfigKind::Reference, &attributes)
            .unwrap();
        assert!(node.id.is_empty());
        assert_eq!(node.literal("interface"), Some("org.demo.Greeter"));
        assert_eq!(node.literal("version"), Some("1.0.0"));
        assert_eq!(node.literal("inProcess"), Some("false"));
        assert!(node.field("timeout").is_none());
        assert!(builder.registry().is_empty());
    }

    #[test]
    fn test_nested_children_see_claimed_parent_id() {
        let builder = builder();
        // the provider claims its generated id before children build, so a
        // child generating the same candidate gets a suffix
        builder
            .build_tree(
                &Declaration::new("provider")
                    .attr("id", "org.demo.Greeter")
                    .child(service("org.demo.Greeter")),
            )
            .unwrap();

        let child = builder.registry().get("org.demo.Greeter2").unwrap();
        assert_eq!(child.kind, ConfigKind::Service);
        assert_eq!(child.reference("provider"), Some("org.demo.Greeter"));
    }
}
