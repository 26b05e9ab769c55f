//! Persisted state and configuration inputs of generic resources

use super::id::{IdError, ResourceId};
use super::merge::merge_into;
use super::projection::project_to_string;
use super::well_known::{expand_identity, expand_tags, IdentityBlock, Tags, WellKnownFields};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Inputs of a generic data source
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataSourceConfig {
    pub name: String,
    #[serde(default)]
    pub parent_id: String,
    /// `Namespace/kind@api-version`
    #[serde(rename = "type")]
    pub resource_type: String,
    #[serde(default)]
    pub response_export_values: Vec<String>,
}

impl DataSourceConfig {
    pub fn resource_id(&self) -> Result<ResourceId, IdError> {
        ResourceId::build(&self.name, &self.parent_id, &self.resource_type)
    }
}

/// Inputs of a managed generic resource
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceConfig {
    pub name: String,
    #[serde(default)]
    pub parent_id: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    /// Request body, opaque apart from the well-known fields merged into it
    #[serde(default)]
    pub body: Value,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub tags: Option<Tags>,
    #[serde(default)]
    pub identity: Option<IdentityBlock>,
    #[serde(default)]
    pub response_export_values: Vec<String>,
}

impl ResourceConfig {
    pub fn resource_id(&self) -> Result<ResourceId, IdError> {
        ResourceId::build(&self.name, &self.parent_id, &self.resource_type)
    }

    /// The PUT body: `body` with location, tags and identity merged on top.
    ///
    /// Returns `None` when `body` is neither an object nor null.
    pub fn request_body(&self) -> Option<Value> {
        let mut request = match &self.body {
            Value::Null => Value::Object(Map::new()),
            Value::Object(_) => self.body.clone(),
            _ => return None,
        };

        let mut well_known = Map::new();
        if let Some(location) = &self.location {
            well_known.insert("location".to_string(), Value::String(location.clone()));
        }
        if let Some(tags) = &self.tags {
            well_known.insert("tags".to_string(), expand_tags(tags));
        }
        if let Some(identity) = &self.identity {
            well_known.insert("identity".to_string(), expand_identity(identity));
        }

        merge_into(&mut request, Value::Object(well_known));
        Some(request)
    }
}

/// State written back after every read
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceState {
    pub id: String,
    pub name: String,
    pub parent_id: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    #[serde(default)]
    pub tags: Tags,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub identity: Option<IdentityBlock>,
    /// Serialized projection of `response_export_values`
    pub output: String,
}

impl ResourceState {
    /// Reconcile a response body against the identifier and export paths
    pub fn from_response<S: AsRef<str>>(id: &ResourceId, body: &Value, export_paths: &[S]) -> Self {
        let WellKnownFields {
            tags,
            location,
            identity,
        } = WellKnownFields::from_body(body);

        Self {
            id: id.id(),
            name: id.name().to_string(),
            parent_id: id.parent_id().to_string(),
            resource_type: id.type_and_version(),
            tags,
            location,
            identity,
            output: project_to_string(body, export_paths),
        }
    }

    /// Decode `output` back into JSON
    pub fn output_value(&self) -> serde_json::Result<Value> {
        serde_json::from_str(&self.output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const RG: &str = "/subscriptions/s/resourceGroups/rg";

    #[test]
    fn test_state_from_response() {
        let id = ResourceId::build("acct", RG, "Microsoft.Storage/storageAccounts@2023-01-01")
            .unwrap();
        let body = json!({
            "location": "West US",
            "tags": {"env": "dev"},
            "properties": {"primaryEndpoints": {"blob": "https://acct.blob"}, "secret": "x"}
        });

        let state = ResourceState::from_response(&id, &body, &["properties.primaryEndpoints.blob"]);
        assert_eq!(state.id, id.id());
        assert_eq!(state.name, "acct");
        assert_eq!(state.parent_id, RG);
        assert_eq!(state.resource_type, "Microsoft.Storage/storageAccounts@2023-01-01");
        assert_eq!(state.location.as_deref(), Some("westus"));
        assert_eq!(state.tags["env"], "dev");
        assert_eq!(
            state.output_value().unwrap(),
            json!({"properties": {"primaryEndpoints": {"blob": "https://acct.blob"}}})
        );
    }

    #[test]
    fn test_state_without_export_paths() {
        let id = ResourceId::build("foo", "", "Provider.Test/widgets@2021-01-01").unwrap();
        let paths: Vec<String> = Vec::new();
        let state = ResourceState::from_response(&id, &json!({"tags": null}), &paths);
        assert_eq!(state.output, "{}");
        assert!(state.tags.is_empty());
    }

    #[test]
    fn test_request_body_merges_well_known_fields() {
        let config = ResourceConfig {
            name: "acct".to_string(),
            parent_id: RG.to_string(),
            resource_type: "Microsoft.Storage/storageAccounts@2023-01-01".to_string(),
            body: json!({"kind": "StorageV2", "tags": {"from_body": "1"}}),
            location: Some("westus".to_string()),
            tags: Some(Tags::from([("env".to_string(), "dev".to_string())])),
            ..ResourceConfig::default()
        };

        assert_eq!(
            config.request_body().unwrap(),
            json!({
                "kind": "StorageV2",
                "location": "westus",
                "tags": {"from_body": "1", "env": "dev"}
            })
        );
    }

    #[test]
    fn test_request_body_rejects_non_object() {
        let config = ResourceConfig {
            body: json!([1, 2]),
            ..ResourceConfig::default()
        };
        assert!(config.request_body().is_none());

        let empty = ResourceConfig::default();
        assert_eq!(empty.request_body(), Some(json!({})));
    }

    #[test]
    fn test_config_deserializes_type_field() {
        let config: DataSourceConfig = serde_json::from_value(json!({
            "name": "foo",
            "type": "Provider.Test/widgets@2021-01-01",
            "response_export_values": ["properties"]
        }))
        .unwrap();
        assert_eq!(config.parent_id, "");
        assert_eq!(
            config.resource_id().unwrap().azure_resource_id(),
            "/providers/Provider.Test/widgets/foo"
        );
    }
}
