// Static field schemas for configuration kinds
//
// Each kind declares the fields its configuration type exposes. External
// attribute names are derived from the camelCase field names once, when the
// table is first used, and drive the attribute-to-field mapping without any
// runtime introspection.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::node::ConfigKind;

/// How a field consumes declaration input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// A primitive/literal-valued field
    Literal,
    /// A field holding a reference to another named node or component
    Ref,
    /// Structural: scans nested `parameter` children
    Parameters,
    /// Structural: scans nested `method` children
    Methods,
    /// Structural: scans nested `argument` children
    Arguments,
}

/// A field with its derived external attribute name
#[derive(Debug, Clone)]
pub struct FieldSpec {
    /// Internal camelCase field name
    pub field: &'static str,
    /// External dash-separated attribute name
    pub external: String,
    pub kind: FieldKind,
}

/// The compiled schema for one configuration kind
#[derive(Debug, Clone)]
pub struct KindSchema {
    pub kind: ConfigKind,
    pub fields: Vec<FieldSpec>,
}

impl KindSchema {
    pub fn field_named(&self, external: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|spec| spec.external == external)
    }
}

/// Convert a camelCase field name to its dash-separated external form
pub fn camel_to_dash(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 2);
    for ch in name.chars() {
        if ch.is_ascii_uppercase() {
            out.push('-');
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

/// Callback hook fields whose values have the `<componentRef>.<method>` form
pub const CALLBACK_FIELDS: &[&str] = &["onreturn", "onthrow", "oninvoke"];

/// Legacy default literals treated as "not specified", for backward
/// compatibility with older declaration schemas.
pub const LEGACY_DEFAULTS: &[(&str, &str)] = &[
    ("async", "false"),
    ("timeout", "0"),
    ("delay", "0"),
    ("version", "0.0.0"),
    ("stat", "-1"),
    ("reliable", "false"),
];

/// Whether a literal value is a legacy default for the given field
pub fn is_legacy_default(field: &str, value: &str) -> bool {
    LEGACY_DEFAULTS
        .iter()
        .any(|(name, default)| *name == field && *default == value)
}

type RawField = (&'static str, FieldKind);

const PROTOCOL_FIELDS: &[RawField] = &[
    ("name", FieldKind::Literal),
    ("host", FieldKind::Literal),
    ("port", FieldKind::Literal),
    ("threads", FieldKind::Literal),
    ("ioThreads", FieldKind::Literal),
    ("queues", FieldKind::Literal),
    ("accepts", FieldKind::Literal),
    ("codec", FieldKind::Literal),
    ("serialization", FieldKind::Literal),
    ("charset", FieldKind::Literal),
    ("payload", FieldKind::Literal),
    ("buffer", FieldKind::Literal),
    ("heartbeat", FieldKind::Literal),
    ("accesslog", FieldKind::Literal),
    ("transporter", FieldKind::Literal),
    ("server", FieldKind::Literal),
    ("client", FieldKind::Literal),
    ("register", FieldKind::Literal),
    ("default", FieldKind::Literal),
    ("parameters", FieldKind::Parameters),
];

const SERVICE_FIELDS: &[RawField] = &[
    ("interface", FieldKind::Literal),
    ("path", FieldKind::Literal),
    ("version", FieldKind::Literal),
    ("group", FieldKind::Literal),
    ("delay", FieldKind::Literal),
    ("timeout", FieldKind::Literal),
    ("retries", FieldKind::Literal),
    ("loadbalance", FieldKind::Literal),
    ("async", FieldKind::Literal),
    ("token", FieldKind::Literal),
    ("deprecated", FieldKind::Literal),
    ("dynamic", FieldKind::Literal),
    ("accesslog", FieldKind::Literal),
    ("register", FieldKind::Literal),
    ("warmup", FieldKind::Literal),
    ("weight", FieldKind::Literal),
    ("serialization", FieldKind::Literal),
    ("ref", FieldKind::Ref),
    ("provider", FieldKind::Ref),
    ("protocol", FieldKind::Ref),
    ("registry", FieldKind::Ref),
    ("application", FieldKind::Ref),
    ("module", FieldKind::Ref),
    ("monitor", FieldKind::Ref),
    ("methods", FieldKind::Methods),
    ("parameters", FieldKind::Parameters),
];

const REFERENCE_FIELDS: &[RawField] = &[
    ("interface", FieldKind::Literal),
    ("version", FieldKind::Literal),
    ("group", FieldKind::Literal),
    ("timeout", FieldKind::Literal),
    ("retries", FieldKind::Literal),
    ("loadbalance", FieldKind::Literal),
    ("async", FieldKind::Literal),
    ("actives", FieldKind::Literal),
    ("check", FieldKind::Literal),
    ("url", FieldKind::Literal),
    ("client", FieldKind::Literal),
    ("sticky", FieldKind::Literal),
    ("protocol", FieldKind::Literal),
    ("inProcess", FieldKind::Literal),
    ("consumer", FieldKind::Ref),
    ("registry", FieldKind::Ref),
    ("application", FieldKind::Ref),
    ("module", FieldKind::Ref),
    ("monitor", FieldKind::Ref),
    ("methods", FieldKind::Methods),
    ("parameters", FieldKind::Parameters),
];

const PROVIDER_FIELDS: &[RawField] = &[
    ("host", FieldKind::Literal),
    ("port", FieldKind::Literal),
    ("contextPath", FieldKind::Literal),
    ("threads", FieldKind::Literal),
    ("ioThreads", FieldKind::Literal),
    ("queues", FieldKind::Literal),
    ("accepts", FieldKind::Literal),
    ("codec", FieldKind::Literal),
    ("charset", FieldKind::Literal),
    ("payload", FieldKind::Literal),
    ("buffer", FieldKind::Literal),
    ("transporter", FieldKind::Literal),
    ("server", FieldKind::Literal),
    ("client", FieldKind::Literal),
    ("delay", FieldKind::Literal),
    ("timeout", FieldKind::Literal),
    ("retries", FieldKind::Literal),
    ("loadbalance", FieldKind::Literal),
    ("async", FieldKind::Literal),
    ("default", FieldKind::Literal),
    ("registry", FieldKind::Ref),
    ("protocol", FieldKind::Ref),
    ("monitor", FieldKind::Ref),
    ("parameters", FieldKind::Parameters),
];

const CONSUMER_FIELDS: &[RawField] = &[
    ("timeout", FieldKind::Literal),
    ("retries", FieldKind::Literal),
    ("loadbalance", FieldKind::Literal),
    ("async", FieldKind::Literal),
    ("connections", FieldKind::Literal),
    ("check", FieldKind::Literal),
    ("sticky", FieldKind::Literal),
    ("default", FieldKind::Literal),
    ("client", FieldKind::Literal),
    ("threads", FieldKind::Literal),
    ("queues", FieldKind::Literal),
    ("registry", FieldKind::Ref),
    ("monitor", FieldKind::Ref),
    ("parameters", FieldKind::Parameters),
];

const METHOD_FIELDS: &[RawField] = &[
    ("name", FieldKind::Literal),
    ("timeout", FieldKind::Literal),
    ("retries", FieldKind::Literal),
    ("loadbalance", FieldKind::Literal),
    ("async", FieldKind::Literal),
    ("actives", FieldKind::Literal),
    ("executes", FieldKind::Literal),
    ("deprecated", FieldKind::Literal),
    ("sticky", FieldKind::Literal),
    ("oninvoke", FieldKind::Ref),
    ("onreturn", FieldKind::Ref),
    ("onthrow", FieldKind::Ref),
    ("parameters", FieldKind::Parameters),
    ("arguments", FieldKind::Arguments),
];

const ARGUMENT_FIELDS: &[RawField] = &[
    ("index", FieldKind::Literal),
    ("type", FieldKind::Literal),
    ("callback", FieldKind::Literal),
];

const REGISTRY_FIELDS: &[RawField] = &[
    ("address", FieldKind::Literal),
    ("port", FieldKind::Literal),
    ("username", FieldKind::Literal),
    ("password", FieldKind::Literal),
    ("protocol", FieldKind::Literal),
    ("timeout", FieldKind::Literal),
    ("session", FieldKind::Literal),
    ("file", FieldKind::Literal),
    ("wait", FieldKind::Literal),
    ("check", FieldKind::Literal),
    ("dynamic", FieldKind::Literal),
    ("register", FieldKind::Literal),
    ("subscribe", FieldKind::Literal),
    ("default", FieldKind::Literal),
    ("parameters", FieldKind::Parameters),
];

const APPLICATION_FIELDS: &[RawField] = &[
    ("name", FieldKind::Literal),
    ("version", FieldKind::Literal),
    ("owner", FieldKind::Literal),
    ("organization", FieldKind::Literal),
    ("architecture", FieldKind::Literal),
    ("environment", FieldKind::Literal),
    ("compiler", FieldKind::Literal),
    ("logger", FieldKind::Literal),
    ("default", FieldKind::Literal),
    ("parameters", FieldKind::Parameters),
];

const MODULE_FIELDS: &[RawField] = &[
    ("name", FieldKind::Literal),
    ("version", FieldKind::Literal),
    ("owner", FieldKind::Literal),
    ("organization", FieldKind::Literal),
    ("default", FieldKind::Literal),
];

const MONITOR_FIELDS: &[RawField] = &[
    ("protocol", FieldKind::Literal),
    ("address", FieldKind::Literal),
    ("username", FieldKind::Literal),
    ("password", FieldKind::Literal),
    ("group", FieldKind::Literal),
    ("version", FieldKind::Literal),
    ("interval", FieldKind::Literal),
    ("default", FieldKind::Literal),
    ("parameters", FieldKind::Parameters),
];

// Instance nodes are built from property children only.
const INSTANCE_FIELDS: &[RawField] = &[];

static SCHEMAS: Lazy<HashMap<ConfigKind, KindSchema>> = Lazy::new(|| {
    let tables: &[(ConfigKind, &[RawField])] = &[
        (ConfigKind::Protocol, PROTOCOL_FIELDS),
        (ConfigKind::Provider, PROVIDER_FIELDS),
        (ConfigKind::Consumer, CONSUMER_FIELDS),
        (ConfigKind::Service, SERVICE_FIELDS),
        (ConfigKind::Reference, REFERENCE_FIELDS),
        (ConfigKind::Method, METHOD_FIELDS),
        (ConfigKind::Argument, ARGUMENT_FIELDS),
        (ConfigKind::Registry, REGISTRY_FIELDS),
        (ConfigKind::Application, APPLICATION_FIELDS),
        (ConfigKind::Module, MODULE_FIELDS),
        (ConfigKind::Monitor, MONITOR_FIELDS),
        (ConfigKind::Instance, INSTANCE_FIELDS),
    ];

    tables
        .iter()
        .map(|(kind, raw)| {
            let fields = raw
                .iter()
                .map(|(field, field_kind)| FieldSpec {
                    field,
                    external: camel_to_dash(field),
                    kind: *field_kind,
                })
                .collect();
            (*kind, KindSchema { kind: *kind, fields })
        })
        .collect()
});

/// The compiled schema for a configuration kind
pub fn schema(kind: ConfigKind) -> &'static KindSchema {
    // every kind has a table above
    &SCHEMAS[&kind]
}
