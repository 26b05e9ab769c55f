//! Well-known response fields
//!
//! `tags`, `location` and `identity` are the only parts of a response body
//! with a typed representation in state. Each is optional: resource types
//! that do not support a facet simply omit it, which flattens to the empty
//! value rather than an error.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub type Tags = BTreeMap<String, String>;

const IDENTITY_NONE: &str = "None";

/// Managed identity block as stored in state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityBlock {
    #[serde(rename = "type")]
    pub identity_type: String,
    #[serde(default)]
    pub identity_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub principal_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
}

/// All well-known fields of one response body
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WellKnownFields {
    pub tags: Tags,
    pub location: Option<String>,
    pub identity: Option<IdentityBlock>,
}

impl WellKnownFields {
    /// Flatten from a response body; non-object bodies give empty fields
    pub fn from_body(body: &Value) -> Self {
        let Value::Object(map) = body else {
            return Self::default();
        };

        Self {
            tags: flatten_tags(map.get("tags")),
            location: flatten_location(map.get("location")),
            identity: flatten_identity(map.get("identity")),
        }
    }
}

// =============================================================================
// Flatten
// =============================================================================

/// Tags as a string map. Scalars are stringified, nested values dropped.
pub fn flatten_tags(tags: Option<&Value>) -> Tags {
    let Some(Value::Object(map)) = tags else {
        return Tags::new();
    };

    map.iter()
        .filter_map(|(key, value)| {
            let value = match value {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                Value::Null => String::new(),
                Value::Array(_) | Value::Object(_) => return None,
            };
            Some((key.clone(), value))
        })
        .collect()
}

/// Normalize an Azure location: `West Europe` -> `westeurope`
pub fn normalize_location(location: &str) -> String {
    location.to_lowercase().replace(' ', "")
}

pub fn flatten_location(location: Option<&Value>) -> Option<String> {
    location
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(normalize_location)
}

/// Identity block, normalizing `userAssignedIdentities` shape variants.
///
/// The API reports user assigned identities as an object keyed by id, but
/// lists and single ids are accepted as well.
pub fn flatten_identity(identity: Option<&Value>) -> Option<IdentityBlock> {
    let Some(Value::Object(map)) = identity else {
        return None;
    };

    let identity_type = map.get("type").and_then(Value::as_str)?;
    if identity_type.is_empty() || identity_type.eq_ignore_ascii_case(IDENTITY_NONE) {
        return None;
    }

    let mut identity_ids: Vec<String> = match map.get("userAssignedIdentities") {
        Some(Value::Object(ids)) => ids.keys().cloned().collect(),
        Some(Value::Array(ids)) => ids
            .iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s.clone()),
                Value::Object(o) => o.get("id").and_then(Value::as_str).map(str::to_string),
                _ => None,
            })
            .collect(),
        Some(Value::String(id)) if !id.is_empty() => vec![id.clone()],
        _ => Vec::new(),
    };
    identity_ids.sort();
    identity_ids.dedup();

    let string_field = |key: &str| {
        map.get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    Some(IdentityBlock {
        identity_type: normalize_identity_type(identity_type),
        identity_ids,
        principal_id: string_field("principalId"),
        tenant_id: string_field("tenantId"),
    })
}

/// `SystemAssigned,UserAssigned` and `SystemAssigned, UserAssigned` are the same type
fn normalize_identity_type(identity_type: &str) -> String {
    identity_type
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

// =============================================================================
// Expand (state -> request body)
// =============================================================================

pub fn expand_tags(tags: &Tags) -> Value {
    Value::Object(
        tags.iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect(),
    )
}

pub fn expand_identity(identity: &IdentityBlock) -> Value {
    let mut map = Map::new();
    map.insert(
        "type".to_string(),
        Value::String(identity.identity_type.clone()),
    );

    if !identity.identity_ids.is_empty() {
        let ids: Map<String, Value> = identity
            .identity_ids
            .iter()
            .map(|id| (id.clone(), Value::Object(Map::new())))
            .collect();
        map.insert("userAssignedIdentities".to_string(), Value::Object(ids));
    }

    Value::Object(map)
}
