// Core data model for the declaration compiler
//
// A `Declaration` is the structured input (a tag with attributes and
// nested children, or an annotation-style attribute bag flattened into a
// childless tag). Building a declaration produces a `ConfigNode`: a
// uniquely identified, typed configuration object whose fields hold
// literals, references to other named nodes, or nested anonymous nodes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Reserved prefix marking a parameter key as hidden from external listing
pub const HIDDEN_KEY_PREFIX: &str = ".";

/// Sentinel registry address that disables registry participation
pub const REGISTRY_DISABLED: &str = "N/A";

/// Default identifier for protocol nodes that declare neither id nor name
pub const DEFAULT_PROTOCOL_ID: &str = "weft";

/// The kind of a configuration node.
///
/// `Instance` is never declared directly: it is the kind of the anonymous
/// implementation node synthesized for a service that carries an explicit
/// implementation class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ConfigKind {
    Protocol,
    Provider,
    Consumer,
    Service,
    Reference,
    Method,
    Argument,
    Registry,
    Application,
    Module,
    Monitor,
    Instance,
}

impl ConfigKind {
    /// The declaration tag for this kind
    pub fn tag(&self) -> &'static str {
        match self {
            ConfigKind::Protocol => "protocol",
            ConfigKind::Provider => "provider",
            ConfigKind::Consumer => "consumer",
            ConfigKind::Service => "service",
            ConfigKind::Reference => "reference",
            ConfigKind::Method => "method",
            ConfigKind::Argument => "argument",
            ConfigKind::Registry => "registry",
            ConfigKind::Application => "application",
            ConfigKind::Module => "module",
            ConfigKind::Monitor => "monitor",
            ConfigKind::Instance => "instance",
        }
    }

    /// Map a declarable tag to its kind. `Instance` is synthesized, never
    /// declared, so it has no tag mapping here.
    pub fn from_tag(tag: &str) -> Option<ConfigKind> {
        match tag {
            "protocol" => Some(ConfigKind::Protocol),
            "provider" => Some(ConfigKind::Provider),
            "consumer" => Some(ConfigKind::Consumer),
            "service" => Some(ConfigKind::Service),
            "reference" => Some(ConfigKind::Reference),
            "method" => Some(ConfigKind::Method),
            "argument" => Some(ConfigKind::Argument),
            "registry" => Some(ConfigKind::Registry),
            "application" => Some(ConfigKind::Application),
            "module" => Some(ConfigKind::Module),
            "monitor" => Some(ConfigKind::Monitor),
            _ => None,
        }
    }

    /// Fully-qualified configuration type name, the identifier fallback of
    /// last resort.
    pub fn type_name(&self) -> &'static str {
        match self {
            ConfigKind::Protocol => "weft.config.ProtocolConfig",
            ConfigKind::Provider => "weft.config.ProviderConfig",
            ConfigKind::Consumer => "weft.config.ConsumerConfig",
            ConfigKind::Service => "weft.config.ServiceConfig",
            ConfigKind::Reference => "weft.config.ReferenceConfig",
            ConfigKind::Method => "weft.config.MethodConfig",
            ConfigKind::Argument => "weft.config.ArgumentConfig",
            ConfigKind::Registry => "weft.config.RegistryConfig",
            ConfigKind::Application => "weft.config.ApplicationConfig",
            ConfigKind::Module => "weft.config.ModuleConfig",
            ConfigKind::Monitor => "weft.config.MonitorConfig",
            ConfigKind::Instance => "weft.config.InstanceConfig",
        }
    }

    /// Kind-specific default identifier, consulted before the interface
    /// name when generating an id.
    pub fn default_id(&self) -> Option<&'static str> {
        match self {
            ConfigKind::Protocol => Some(DEFAULT_PROTOCOL_ID),
            _ => None,
        }
    }

    /// Service-shaped kinds keep their `protocol` attribute literal (as
    /// `protocolIds`) instead of resolving it as a reference.
    pub fn is_service_shaped(&self) -> bool {
        matches!(self, ConfigKind::Service | ConfigKind::Provider)
    }

    /// Whether a top-level declaration of this kind must end up with an id.
    /// Method, argument and instance nodes are anonymous unless they carry
    /// an explicit id.
    pub fn requires_id(&self) -> bool {
        !matches!(
            self,
            ConfigKind::Method | ConfigKind::Argument | ConfigKind::Instance
        )
    }
}

/// A field value on a configuration node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    /// A literal string value
    Literal(String),
    /// A reference to another named configuration node or component
    Reference(String),
    /// An anonymous inline node (implementation node, disabled registry)
    Node(Box<ConfigNode>),
    /// A list of nested descriptor nodes (methods, arguments)
    NodeList(Vec<ConfigNode>),
}

impl FieldValue {
    pub fn as_literal(&self) -> Option<&str> {
        match self {
            FieldValue::Literal(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<&str> {
        match self {
            FieldValue::Reference(name) => Some(name),
            _ => None,
        }
    }

    pub fn as_node(&self) -> Option<&ConfigNode> {
        match self {
            FieldValue::Node(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_node_list(&self) -> Option<&[ConfigNode]> {
        match self {
            FieldValue::NodeList(nodes) => Some(nodes),
            _ => None,
        }
    }
}

/// A uniquely identified, typed configuration object produced by building
/// a declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigNode {
    /// Unique id within the declaration registry; empty for anonymous nodes
    pub id: String,
    pub kind: ConfigKind,
    /// Mapped fields, keyed by the internal (camelCase) field name
    pub fields: BTreeMap<String, FieldValue>,
    /// Free-form parameters, including attributes not consumed by any field
    pub parameters: BTreeMap<String, String>,
    /// Singleton scope flag; cleared by `scope="prototype"`
    pub singleton: bool,
}

impl ConfigNode {
    /// Create an anonymous node of the given kind
    pub fn new(kind: ConfigKind) -> Self {
        ConfigNode {
            id: String::new(),
            kind,
            fields: BTreeMap::new(),
            parameters: BTreeMap::new(),
            singleton: true,
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Literal field accessor
    pub fn literal(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(FieldValue::as_literal)
    }

    /// Reference field accessor
    pub fn reference(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(FieldValue::as_reference)
    }

    pub fn set_field(&mut self, name: impl Into<String>, value: FieldValue) {
        self.fields.insert(name.into(), value);
    }

    /// Parameters that are not marked hidden
    pub fn visible_parameters(&self) -> impl Iterator<Item = (&str, &str)> {
        self.parameters
            .iter()
            .filter(|(key, _)| !key.starts_with(HIDDEN_KEY_PREFIX))
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }
}

/// The structured, attribute-bearing input describing a desired
/// service/reference configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Declaration {
    pub tag: String,
    pub attributes: BTreeMap<String, String>,
    pub children: Vec<Declaration>,
}

impl Declaration {
    pub fn new(tag: impl Into<String>) -> Self {
        Declaration {
            tag: tag.into(),
            attributes: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    /// Set an attribute
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Append a nested child declaration
    pub fn child(mut self, child: Declaration) -> Self {
        self.children.push(child);
        self
    }

    /// Trimmed, non-empty attribute value
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .get(name)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }

    /// Children with the given tag
    pub fn children_tagged<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Declaration> {
        self.children.iter().filter(move |child| child.tag == tag)
    }
}
