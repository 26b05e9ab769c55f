//! Generic resource layer
//!
//! This module turns loosely-typed configuration into canonical resource
//! identifiers and reconciles arbitrary API responses into state. Nothing
//! here knows about specific resource types: apart from tags, location and
//! identity every response is opaque JSON.
//!
//! # Architecture
//!
//! - [`id`] - Builds, renders and parses resource identifiers
//! - [`export_path`] - Extracts parts of a response by path expression
//! - [`merge`] - Deep merge of JSON values
//! - [`projection`] - Folds export path results into the `output` value
//! - [`well_known`] - Flattens tags, location and identity
//! - [`state`] - Configuration inputs and persisted state
//! - [`lifecycle`] - CRUD, import and data source reads against the API
//!
//! # Example
//!
//! ```ignore
//! use armgen::resource::{ResourceId, project};
//!
//! let id = ResourceId::build("foo", "", "Provider.Test/widgets@2021-01-01")?;
//! let body = client.get(id.azure_resource_id(), id.api_version()).await?;
//! let output = project(&body, &["properties.provisioningState"]);
//! ```

pub mod export_path;
pub mod id;
pub mod lifecycle;
pub mod merge;
pub mod projection;
pub mod state;
pub mod well_known;

pub use export_path::{extract, ExportPath};
pub use id::{IdError, ResourceId, ResourceType};
pub use lifecycle::{LifecycleError, ProviderContext};
pub use merge::{merge, merge_into};
pub use projection::{project, project_to_string};
pub use state::{DataSourceConfig, ResourceConfig, ResourceState};
pub use well_known::{flatten_identity, flatten_location, flatten_tags, IdentityBlock, Tags, WellKnownFields};
