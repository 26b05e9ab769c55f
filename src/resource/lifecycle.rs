//! Resource lifecycle
//!
//! Create/read/update/delete/import of generic resources and the generic
//! data source read. Every operation receives the client and timeouts via
//! an explicit [`ProviderContext`] and runs under its own timeout.

use super::id::ResourceId;
use super::state::{DataSourceConfig, ResourceConfig, ResourceState};
use crate::azure::{is_not_found, ResourceClient};
use crate::config::Timeouts;
use anyhow::{Context, Result};
use futures::future::join_all;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Lifecycle level failures
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    #[error("a resource with the ID {id:?} already exists - to be managed this resource needs to be imported into the state")]
    RequiresImport { id: String },

    #[error("request body for {id:?} must be a JSON object")]
    InvalidBody { id: String },

    #[error("cannot import non-existent remote object {id:?}")]
    ImportNotFound { id: String },
}

/// Everything an operation needs, passed explicitly
#[derive(Debug, Clone)]
pub struct ProviderContext {
    pub client: ResourceClient,
    pub timeouts: Timeouts,
}

impl ProviderContext {
    pub fn new(client: ResourceClient, timeouts: Timeouts) -> Self {
        Self { client, timeouts }
    }
}

async fn with_timeout<T, F>(operation: &'static str, limit: Duration, future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, future).await {
        Ok(result) => result,
        Err(_) => Err(LifecycleError::Timeout {
            operation,
            after: limit,
        }
        .into()),
    }
}

// =============================================================================
// Data source
// =============================================================================

/// Read a resource addressed by name/parent/type and project its response
pub async fn read_data_source(
    ctx: &ProviderContext,
    config: &DataSourceConfig,
) -> Result<ResourceState> {
    let id = config.resource_id()?;
    tracing::info!("read data source {}", id);

    with_timeout("read", ctx.timeouts.read(), async {
        let body = ctx
            .client
            .get(id.azure_resource_id(), id.api_version())
            .await
            .map_err(|e| {
                if is_not_found(&e) {
                    e.context(format!("not found {:?}", id.id()))
                } else {
                    e.context(format!("reading {:?}", id.id()))
                }
            })?;

        Ok(ResourceState::from_response(
            &id,
            &body,
            &config.response_export_values,
        ))
    })
    .await
}

/// Read several data sources concurrently; results keep the input order
pub async fn read_many(
    ctx: &ProviderContext,
    configs: &[DataSourceConfig],
) -> Vec<Result<ResourceState>> {
    join_all(configs.iter().map(|config| read_data_source(ctx, config))).await
}

// =============================================================================
// Managed resources
// =============================================================================

async fn put_resource(
    ctx: &ProviderContext,
    id: &ResourceId,
    config: &ResourceConfig,
) -> Result<()> {
    let body = config
        .request_body()
        .ok_or_else(|| LifecycleError::InvalidBody { id: id.id() })?;

    ctx.client
        .create_or_update(id.azure_resource_id(), id.api_version(), &body)
        .await
}

/// Create a resource; fails if it already exists remotely
pub async fn create(ctx: &ProviderContext, config: &ResourceConfig) -> Result<ResourceState> {
    let id = config.resource_id()?;
    tracing::info!("create {}", id);

    with_timeout("create", ctx.timeouts.create(), async {
        match ctx.client.get(id.azure_resource_id(), id.api_version()).await {
            Ok(_) => {
                return Err(anyhow::Error::from(LifecycleError::RequiresImport { id: id.id() }))
            }
            Err(e) if is_not_found(&e) => {}
            Err(e) => {
                return Err(e.context(format!("checking for presence of existing {:?}", id.id())))
            }
        }

        put_resource(ctx, &id, config)
            .await
            .with_context(|| format!("creating {:?}", id.id()))
    })
    .await?;

    read(ctx, &id.id(), &config.response_export_values)
        .await?
        .with_context(|| format!("{:?} disappeared after creation", id.id()))
}

/// Update an existing resource in place
pub async fn update(ctx: &ProviderContext, config: &ResourceConfig) -> Result<ResourceState> {
    let id = config.resource_id()?;
    tracing::info!("update {}", id);

    with_timeout("update", ctx.timeouts.update(), async {
        put_resource(ctx, &id, config)
            .await
            .with_context(|| format!("updating {:?}", id.id()))
    })
    .await?;

    read(ctx, &id.id(), &config.response_export_values)
        .await?
        .with_context(|| format!("{:?} disappeared after update", id.id()))
}

/// Refresh state from a persisted id. `Ok(None)` means the resource is gone.
pub async fn read<S: AsRef<str>>(
    ctx: &ProviderContext,
    id: &str,
    export_paths: &[S],
) -> Result<Option<ResourceState>> {
    let id = ResourceId::parse(id)?;

    with_timeout("read", ctx.timeouts.read(), async {
        match ctx.client.get(id.azure_resource_id(), id.api_version()).await {
            Ok(body) => Ok(Some(ResourceState::from_response(&id, &body, export_paths))),
            Err(e) if is_not_found(&e) => {
                tracing::info!("{} was not found - removing from state", id);
                Ok(None)
            }
            Err(e) => Err(e.context(format!("reading {:?}", id.id()))),
        }
    })
    .await
}

/// Delete a resource; an already missing resource counts as deleted
pub async fn delete(ctx: &ProviderContext, id: &str) -> Result<()> {
    let id = ResourceId::parse(id)?;
    tracing::info!("delete {}", id);

    with_timeout("delete", ctx.timeouts.delete(), async {
        match ctx
            .client
            .delete(id.azure_resource_id(), id.api_version())
            .await
        {
            Ok(()) => Ok(()),
            Err(e) if is_not_found(&e) => {
                tracing::info!("{} already deleted", id);
                Ok(())
            }
            Err(e) => Err(e.context(format!("deleting {:?}", id.id()))),
        }
    })
    .await
}

/// Adopt an existing remote resource into state
pub async fn import<S: AsRef<str>>(
    ctx: &ProviderContext,
    id: &str,
    export_paths: &[S],
) -> Result<ResourceState> {
    let parsed = ResourceId::parse(id)?;
    tracing::info!("import {}", parsed);

    read(ctx, id, export_paths)
        .await?
        .ok_or_else(|| LifecycleError::ImportNotFound { id: parsed.id() }.into())
}
