// Identifier allocation for configuration nodes
//
// Candidates are tried in priority order: explicit id, explicit name,
// kind-specific default, declared interface name, configuration type name.
// Explicit identifiers are never disambiguated: a collision on an explicit
// id or name is a fatal `DuplicateIdentifier`. Generated identifiers are
// disambiguated with an increasing counter suffix starting at 2.

use weft_error::{WiringError, WiringResult};

/// Inputs for a single identifier allocation
#[derive(Debug, Clone, Copy, Default)]
pub struct IdRequest<'a> {
    pub explicit_id: Option<&'a str>,
    pub explicit_name: Option<&'a str>,
    pub kind_default: Option<&'a str>,
    pub interface_name: Option<&'a str>,
    pub type_name: &'a str,
    /// Whether the node must end up with an id even when none was declared
    pub id_required: bool,
}

/// Allocate a node identifier against the set of ids already taken.
///
/// Returns `None` when the node stays anonymous: no explicit id was given
/// and `id_required` is false.
pub fn allocate(contains: impl Fn(&str) -> bool, request: IdRequest<'_>) -> WiringResult<Option<String>> {
    // An explicit id is honored even when no id is required.
    if let Some(id) = non_empty(request.explicit_id) {
        if contains(id) {
            return Err(WiringError::DuplicateIdentifier(id.to_string()));
        }
        return Ok(Some(id.to_string()));
    }

    if !request.id_required {
        return Ok(None);
    }

    // Explicit names fail fast on collision, like explicit ids.
    if let Some(name) = non_empty(request.explicit_name) {
        if contains(name) {
            return Err(WiringError::DuplicateIdentifier(name.to_string()));
        }
        return Ok(Some(name.to_string()));
    }

    let base = non_empty(request.kind_default)
        .or_else(|| non_empty(request.interface_name))
        .unwrap_or(request.type_name);

    let mut candidate = base.to_string();
    let mut counter = 2;
    while contains(&candidate) {
        candidate = format!("{}{}", base, counter);
        counter += 1;
    }
    Ok(Some(candidate))
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn taken(ids: &[&str]) -> HashSet<String> {
        ids.iter().map(|id| id.to_string()).collect()
    }

    #[test]
    fn test_explicit_id_wins() {
        let existing = taken(&[]);
        let id = allocate(
            |id| existing.contains(id),
            IdRequest {
                explicit_id: Some("greeter"),
                explicit_name: Some("ignored"),
                interface_name: Some("org.demo.Greeter"),
                type_name: "weft.config.ServiceConfig",
                id_required: true,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(id.as_deref(), Some("greeter"));
    }

    #[test]
    fn test_explicit_id_duplicate_is_fatal() {
        let existing = taken(&["greeter"]);
        let err = allocate(
            |id| existing.contains(id),
            IdRequest {
                explicit_id: Some("greeter"),
                type_name: "weft.config.ServiceConfig",
                id_required: true,
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, WiringError::DuplicateIdentifier(id) if id == "greeter"));
    }

    #[test]
    fn test_explicit_name_duplicate_is_fatal() {
        let existing = taken(&["greeter"]);
        let err = allocate(
            |id| existing.contains(id),
            IdRequest {
                explicit_name: Some("greeter"),
                type_name: "weft.config.ServiceConfig",
                id_required: true,
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, WiringError::DuplicateIdentifier(_)));
    }

    #[test]
    fn test_generated_ids_disambiguate_from_two() {
        let existing = taken(&["org.demo.Greeter", "org.demo.Greeter2"]);
        let id = allocate(
            |id| existing.contains(id),
            IdRequest {
                interface_name: Some("org.demo.Greeter"),
                type_name: "weft.config.ServiceConfig",
                id_required: true,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(id.as_deref(), Some("org.demo.Greeter3"));
    }

    #[test]
    fn test_kind_default_precedes_interface() {
        let existing = taken(&[]);
        let id = allocate(
            |id| existing.contains(id),
            IdRequest {
                kind_default: Some("weft"),
                interface_name: Some("org.demo.Greeter"),
                type_name: "weft.config.ProtocolConfig",
                id_required: true,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(id.as_deref(), Some("weft"));
    }

    #[test]
    fn test_type_name_is_last_resort() {
        let existing = taken(&[]);
        let id = allocate(
            |id| existing.contains(id),
            IdRequest {
                type_name: "weft.config.ProviderConfig",
                id_required: true,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(id.as_deref(), Some("weft.config.ProviderConfig"));
    }

    #[test]
    fn test_anonymous_when_not_required() {
        let existing = taken(&[]);
        let id = allocate(
            |id| existing.contains(id),
            IdRequest {
                explicit_name: Some("greet"),
                type_name: "weft.config.MethodConfig",
                id_required: false,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(id, None);
    }
}
