//! Resource Identifiers
//!
//! A [`ResourceId`] is built from the loosely-typed `name`, `parent_id` and
//! `type@api-version` strings of a configuration and renders the canonical
//! ARM resource path used to address the generic resource API.
//!
//! # Path grammar
//!
//! - `/subscriptions/{sub}`
//! - `/subscriptions/{sub}/resourceGroups/{rg}`
//! - `{scope}/providers/{namespace}/{kind}/{name}[/{kind}/{name}...]`
//!
//! where `{scope}` is empty (tenant root) or itself a resource path. The
//! persisted id appends `?api-version={version}` to the resource path.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use thiserror::Error;

const PROVIDERS: &str = "providers";
const SUBSCRIPTIONS: &str = "subscriptions";
const RESOURCE_GROUPS: &str = "resourceGroups";
const RESOURCES_NAMESPACE: &str = "Microsoft.Resources";
const API_VERSION_PARAM: &str = "api-version=";

/// Characters that would end the path or split the query of a persisted id
const RESERVED: &[char] = &['?', '&', '#'];

/// Errors raised while building or parsing identifiers
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    #[error("invalid name {0:?}: must be non-empty and must not contain '/', '?', '&' or '#'")]
    InvalidName(String),

    #[error("invalid resource type {input:?}: {reason}")]
    InvalidResourceType { input: String, reason: String },

    #[error("invalid parent_id {input:?}: {reason}")]
    InvalidParentId { input: String, reason: String },

    #[error("malformed resource id {input:?}: {reason}")]
    MalformedResourceId { input: String, reason: String },
}

// =============================================================================
// Resource types
// =============================================================================

/// ARM resource type, e.g. `Microsoft.Network/virtualNetworks/subnets`
///
/// Comparison ignores ASCII case.
#[derive(Debug, Clone)]
pub struct ResourceType {
    namespace: String,
    kinds: Vec<String>,
}

impl ResourceType {
    /// Parse `Namespace/kind[/kind...]`
    pub fn parse(input: &str) -> Option<Self> {
        let mut parts = input.split('/');
        let namespace = parts.next()?;
        let kinds: Vec<String> = parts.map(str::to_string).collect();

        let valid = |s: &str| !s.is_empty() && !s.contains('@') && !s.contains('?');
        if !valid(namespace) || kinds.is_empty() || !kinds.iter().all(|k| valid(k)) {
            return None;
        }

        Some(Self {
            namespace: namespace.to_string(),
            kinds,
        })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn kinds(&self) -> &[String] {
        &self.kinds
    }

    pub fn last_kind(&self) -> &str {
        self.kinds.last().map(String::as_str).unwrap_or_default()
    }

    /// Type of the enclosing resource for nested types (`None` for top-level types)
    pub fn parent_type(&self) -> Option<ResourceType> {
        if self.kinds.len() < 2 {
            return None;
        }
        Some(Self {
            namespace: self.namespace.clone(),
            kinds: self.kinds[..self.kinds.len() - 1].to_vec(),
        })
    }

    fn is_builtin(&self, kind: &str) -> bool {
        self.namespace.eq_ignore_ascii_case(RESOURCES_NAMESPACE)
            && self.kinds.len() == 1
            && self.kinds[0].eq_ignore_ascii_case(kind)
    }

    pub fn is_subscription(&self) -> bool {
        self.is_builtin(SUBSCRIPTIONS)
    }

    pub fn is_resource_group(&self) -> bool {
        self.is_builtin(RESOURCE_GROUPS)
    }

    fn builtin(kind: &str) -> Self {
        Self {
            namespace: RESOURCES_NAMESPACE.to_string(),
            kinds: vec![kind.to_string()],
        }
    }
}

impl PartialEq for ResourceType {
    fn eq(&self, other: &Self) -> bool {
        self.namespace.eq_ignore_ascii_case(&other.namespace)
            && self.kinds.len() == other.kinds.len()
            && self
                .kinds
                .iter()
                .zip(&other.kinds)
                .all(|(a, b)| a.eq_ignore_ascii_case(b))
    }
}

impl Eq for ResourceType {}

impl Hash for ResourceType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.namespace.to_ascii_lowercase().hash(state);
        for kind in &self.kinds {
            kind.to_ascii_lowercase().hash(state);
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.kinds.join("/"))
    }
}

impl FromStr for ResourceType {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| IdError::InvalidResourceType {
            input: s.to_string(),
            reason: "expected Namespace/kind[/kind...]".to_string(),
        })
    }
}

/// Split `Namespace/kind@version` into its type and API version
pub fn parse_type_and_version(input: &str) -> Result<(ResourceType, String), IdError> {
    let invalid = |reason: &str| IdError::InvalidResourceType {
        input: input.to_string(),
        reason: reason.to_string(),
    };

    let (type_part, version) = input
        .split_once('@')
        .ok_or_else(|| invalid("expected Namespace/kind@api-version"))?;

    if !is_valid_api_version(version) {
        return Err(invalid("api version must be a single non-empty value"));
    }

    let resource_type = ResourceType::parse(type_part)
        .ok_or_else(|| invalid("expected Namespace/kind[/kind...] before '@'"))?;

    Ok((resource_type, version.to_string()))
}

fn is_valid_api_version(version: &str) -> bool {
    !version.is_empty() && !version.contains(['@', '/']) && !version.contains(RESERVED)
}

// =============================================================================
// Resource paths
// =============================================================================

/// A resource path split into the scope it lives under, its type and its name
#[derive(Debug, Clone, PartialEq, Eq)]
struct PathParts {
    parent: String,
    resource_type: ResourceType,
    name: String,
}

fn join_segments(segments: &[&str]) -> String {
    if segments.is_empty() {
        String::new()
    } else {
        format!("/{}", segments.join("/"))
    }
}

/// Decompose a resource path. `Ok(None)` is the tenant root.
fn split_resource_path(path: &str) -> Result<Option<PathParts>, String> {
    if path.is_empty() || path == "/" {
        return Ok(None);
    }

    let Some(rest) = path.strip_prefix('/') else {
        return Err("must start with '/'".to_string());
    };

    let segments: Vec<&str> = rest.split('/').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err("contains an empty segment".to_string());
    }
    if path.contains(RESERVED) {
        return Err("contains '?', '&' or '#'".to_string());
    }
    if segments.len() % 2 != 0 {
        return Err("has an odd number of segments".to_string());
    }

    // Rightmost `providers` at an even offset followed by namespace and at least one kind/name pair
    let provider_pos = (0..segments.len())
        .step_by(2)
        .rev()
        .find(|&i| i + 2 < segments.len() && segments[i].eq_ignore_ascii_case(PROVIDERS));

    let Some(pos) = provider_pos else {
        return match segments.as_slice() {
            [subs, _] if subs.eq_ignore_ascii_case(SUBSCRIPTIONS) => Ok(Some(PathParts {
                parent: String::new(),
                resource_type: ResourceType::builtin(SUBSCRIPTIONS),
                name: segments[1].to_string(),
            })),
            [subs, _, groups, name]
                if subs.eq_ignore_ascii_case(SUBSCRIPTIONS)
                    && groups.eq_ignore_ascii_case(RESOURCE_GROUPS) =>
            {
                Ok(Some(PathParts {
                    parent: join_segments(&segments[..2]),
                    resource_type: ResourceType::builtin(RESOURCE_GROUPS),
                    name: name.to_string(),
                }))
            }
            _ => Err("is not a subscription, resource group or provider resource path".to_string()),
        };
    };

    let scope = &segments[..pos];
    split_resource_path(&join_segments(scope))
        .map_err(|reason| format!("scope {:?} {}", join_segments(scope), reason))?;

    let pairs = &segments[pos + 2..];
    let kinds: Vec<String> = pairs.iter().step_by(2).map(|s| s.to_string()).collect();
    let parent = if kinds.len() == 1 {
        join_segments(scope)
    } else {
        join_segments(&segments[..segments.len() - 2])
    };

    Ok(Some(PathParts {
        parent,
        resource_type: ResourceType {
            namespace: segments[pos + 1].to_string(),
            kinds,
        },
        name: segments[segments.len() - 1].to_string(),
    }))
}

// =============================================================================
// Resource ids
// =============================================================================

/// Identifier of a generic ARM resource
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceId {
    name: String,
    parent_id: String,
    resource_type: ResourceType,
    api_version: String,
    azure_resource_id: String,
}

impl ResourceId {
    /// Build from raw configuration strings; `type_and_version` is `Namespace/kind@version`
    pub fn build(name: &str, parent_id: &str, type_and_version: &str) -> Result<Self, IdError> {
        let (resource_type, api_version) = parse_type_and_version(type_and_version)?;
        Self::from_parts(name, parent_id, resource_type, &api_version)
    }

    /// Build from an already parsed type and a separate API version
    pub fn from_parts(
        name: &str,
        parent_id: &str,
        resource_type: ResourceType,
        api_version: &str,
    ) -> Result<Self, IdError> {
        if name.is_empty() || name.contains('/') || name.contains(RESERVED) {
            return Err(IdError::InvalidName(name.to_string()));
        }
        if !is_valid_api_version(api_version) {
            return Err(IdError::InvalidResourceType {
                input: format!("{}@{}", resource_type, api_version),
                reason: "api version must be a single non-empty value".to_string(),
            });
        }

        let invalid_parent = |reason: String| IdError::InvalidParentId {
            input: parent_id.to_string(),
            reason,
        };

        let parent = split_resource_path(parent_id).map_err(invalid_parent)?;
        let parent_id = if parent.is_some() { parent_id } else { "" };

        let azure_resource_id = if resource_type.is_subscription() {
            if parent.is_some() {
                return Err(invalid_parent(
                    "subscriptions can only live at the tenant root".to_string(),
                ));
            }
            format!("/{}/{}", SUBSCRIPTIONS, name)
        } else if resource_type.is_resource_group() {
            match &parent {
                Some(p) if p.resource_type.is_subscription() => {
                    format!("{}/{}/{}", parent_id, RESOURCE_GROUPS, name)
                }
                _ => {
                    return Err(invalid_parent(
                        "resource groups must be created under a subscription".to_string(),
                    ))
                }
            }
        } else if let Some(expected) = resource_type.parent_type() {
            match &parent {
                Some(p) if p.resource_type == expected => {
                    format!("{}/{}/{}", parent_id, resource_type.last_kind(), name)
                }
                _ => {
                    return Err(invalid_parent(format!(
                        "{} must be nested under a resource of type {}",
                        resource_type, expected
                    )))
                }
            }
        } else {
            format!(
                "{}/{}/{}/{}/{}",
                parent_id,
                PROVIDERS,
                resource_type.namespace(),
                resource_type.last_kind(),
                name
            )
        };

        Ok(Self {
            name: name.to_string(),
            parent_id: parent_id.to_string(),
            resource_type,
            api_version: api_version.to_string(),
            azure_resource_id,
        })
    }

    /// Parse a persisted id (`{resource path}?api-version={version}`)
    pub fn parse(input: &str) -> Result<Self, IdError> {
        let malformed = |reason: &str| IdError::MalformedResourceId {
            input: input.to_string(),
            reason: reason.to_string(),
        };

        let (path, query) = input
            .split_once('?')
            .ok_or_else(|| malformed("missing ?api-version= suffix"))?;

        let api_version = query
            .strip_prefix(API_VERSION_PARAM)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| malformed("query must be exactly api-version={version}"))?;

        let parts = split_resource_path(path)
            .map_err(|reason| malformed(&format!("resource path {}", reason)))?
            .ok_or_else(|| malformed("does not address a resource"))?;

        Self::from_parts(&parts.name, &parts.parent, parts.resource_type, api_version)
            .map_err(|e| malformed(&e.to_string()))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent_id(&self) -> &str {
        &self.parent_id
    }

    pub fn resource_type(&self) -> &ResourceType {
        &self.resource_type
    }

    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    /// Canonical ARM path used to address the resource API
    pub fn azure_resource_id(&self) -> &str {
        &self.azure_resource_id
    }

    /// `type@api-version` as configured
    pub fn type_and_version(&self) -> String {
        format!("{}@{}", self.resource_type, self.api_version)
    }

    /// Persisted state key
    pub fn id(&self) -> String {
        format!("{}?{}{}", self.azure_resource_id, API_VERSION_PARAM, self.api_version)
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id())
    }
}

impl FromStr for ResourceId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUB: &str = "/subscriptions/00000000-0000-0000-0000-000000000000";
    const RG: &str = "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/rg1";

    #[test]
    fn test_build_root_scope() {
        let id = ResourceId::build("foo", "", "Provider.Test/widgets@2021-01-01").unwrap();
        assert_eq!(id.azure_resource_id(), "/providers/Provider.Test/widgets/foo");
        assert_eq!(id.parent_id(), "");
        assert_eq!(id.api_version(), "2021-01-01");
        assert_eq!(id.id(), "/providers/Provider.Test/widgets/foo?api-version=2021-01-01");
    }

    #[test]
    fn test_build_under_resource_group() {
        let id = ResourceId::build("acct", RG, "Microsoft.Storage/storageAccounts@2023-01-01")
            .unwrap();
        assert_eq!(
            id.azure_resource_id(),
            format!("{}/providers/Microsoft.Storage/storageAccounts/acct", RG)
        );
    }

    #[test]
    fn test_build_builtin_scopes() {
        let sub = ResourceId::build(
            "00000000-0000-0000-0000-000000000000",
            "",
            "Microsoft.Resources/subscriptions@2020-01-01",
        )
        .unwrap();
        assert_eq!(sub.azure_resource_id(), SUB);

        let rg = ResourceId::build("rg1", SUB, "Microsoft.Resources/resourceGroups@2021-04-01")
            .unwrap();
        assert_eq!(rg.azure_resource_id(), RG);

        let err = ResourceId::build("rg1", RG, "Microsoft.Resources/resourceGroups@2021-04-01")
            .unwrap_err();
        assert!(matches!(err, IdError::InvalidParentId { .. }));
    }

    #[test]
    fn test_build_nested_type() {
        let vnet = format!("{}/providers/Microsoft.Network/virtualNetworks/vnet1", RG);
        let id = ResourceId::build(
            "subnet1",
            &vnet,
            "Microsoft.Network/virtualNetworks/subnets@2022-07-01",
        )
        .unwrap();
        assert_eq!(id.azure_resource_id(), format!("{}/subnets/subnet1", vnet));

        let err = ResourceId::build(
            "subnet1",
            RG,
            "Microsoft.Network/virtualNetworks/subnets@2022-07-01",
        )
        .unwrap_err();
        assert!(matches!(err, IdError::InvalidParentId { .. }));
    }

    #[test]
    fn test_build_extension_resource() {
        let vnet = format!("{}/providers/Microsoft.Network/virtualNetworks/vnet1", RG);
        let id = ResourceId::build("lock1", &vnet, "Microsoft.Authorization/locks@2016-09-01")
            .unwrap();
        assert_eq!(
            id.azure_resource_id(),
            format!("{}/providers/Microsoft.Authorization/locks/lock1", vnet)
        );
        assert_eq!(ResourceId::parse(&id.id()).unwrap(), id);
    }

    #[test]
    fn test_build_rejects_bad_input() {
        assert!(matches!(
            ResourceId::build("", RG, "A.B/c@v1"),
            Err(IdError::InvalidName(_))
        ));
        assert!(matches!(
            ResourceId::build("a/b", RG, "A.B/c@v1"),
            Err(IdError::InvalidName(_))
        ));

        for bad_name in ["a?b", "a&b", "a#b"] {
            assert!(
                matches!(
                    ResourceId::build(bad_name, RG, "A.B/c@v1"),
                    Err(IdError::InvalidName(_))
                ),
                "{} should be rejected",
                bad_name
            );
        }

        for bad_type in [
            "A.B/c",
            "A.B@v1",
            "A.B/c@",
            "@v1",
            "A.B//c@v1",
            "A.B/c@v1@v2",
            "A.B/c@v1&foo=bar",
            "A.B/c@v1?x",
            "A.B/c@v1#frag",
        ] {
            assert!(
                matches!(
                    ResourceId::build("x", RG, bad_type),
                    Err(IdError::InvalidResourceType { .. })
                ),
                "{} should be rejected",
                bad_type
            );
        }

        for bad_parent in [
            "subscriptions/x",
            "/subscriptions",
            "/subscriptions/x/",
            "/foo/bar",
            "/subscriptions/x?y",
            "/subscriptions/x/resourceGroups/a#b",
        ] {
            assert!(
                matches!(
                    ResourceId::build("x", bad_parent, "A.B/c@v1"),
                    Err(IdError::InvalidParentId { .. })
                ),
                "{} should be rejected",
                bad_parent
            );
        }
    }

    #[test]
    fn test_parse_round_trip() {
        let vnet = format!("{}/providers/Microsoft.Network/virtualNetworks/vnet1", RG);
        let cases = [
            ("foo", "", "Provider.Test/widgets@2021-01-01"),
            ("rg1", SUB, "Microsoft.Resources/resourceGroups@2021-04-01"),
            ("acct", RG, "Microsoft.Storage/storageAccounts@2023-01-01"),
            ("subnet1", vnet.as_str(), "Microsoft.Network/virtualNetworks/subnets@2022-07-01"),
            ("mg1", "", "Microsoft.Management/managementGroups@2021-04-01"),
        ];

        for (name, parent, type_and_version) in cases {
            let built = ResourceId::build(name, parent, type_and_version).unwrap();
            let parsed: ResourceId = built.to_string().parse().unwrap();
            assert_eq!(parsed, built);
            assert_eq!(parsed.name(), name);
            assert_eq!(parsed.parent_id(), parent);
            assert_eq!(parsed.type_and_version(), type_and_version);
        }
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in [
            "/providers/Provider.Test/widgets/foo",
            "/providers/Provider.Test/widgets/foo?api-version=",
            "/providers/Provider.Test/widgets?api-version=v1",
            "providers/Provider.Test/widgets/foo?api-version=v1",
            "/?api-version=v1",
            "/foo/bar?api-version=v1",
            "/providers/Provider.Test/widgets/foo?api-version=v1&foo=bar",
            "/providers/Provider.Test/widgets/foo?foo=bar&api-version=v1",
            "/providers/Provider.Test/widgets/a?b?api-version=v1",
        ] {
            assert!(
                matches!(ResourceId::parse(bad), Err(IdError::MalformedResourceId { .. })),
                "{} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_resource_type_case_insensitive() {
        let a = ResourceType::parse("Microsoft.Network/virtualNetworks").unwrap();
        let b = ResourceType::parse("microsoft.network/VIRTUALNETWORKS").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "Microsoft.Network/virtualNetworks");
    }

    #[test]
    fn test_from_parts_rejects_reserved_api_version() {
        let widgets = ResourceType::parse("Provider.Test/widgets").unwrap();
        for bad in ["", "v1&foo=bar", "v1?x", "v1#x"] {
            assert!(
                matches!(
                    ResourceId::from_parts("foo", "", widgets.clone(), bad),
                    Err(IdError::InvalidResourceType { .. })
                ),
                "{:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_split_resource_path() {
        assert_eq!(split_resource_path(""), Ok(None));
        assert!(split_resource_path(RG).unwrap().is_some());
        assert!(split_resource_path("/subscriptions/x/resourceGroups").is_err());
        assert!(split_resource_path("/subscriptions/x?y").is_err());
    }
}
