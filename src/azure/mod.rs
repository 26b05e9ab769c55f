//! ARM API interaction module
//!
//! This module provides the plumbing for talking to the Azure Resource
//! Manager generic resource API.
//!
//! # Module Structure
//!
//! - [`auth`] - Bearer token credentials
//! - [`client`] - Resource client addressing resources by canonical path
//! - [`http`] - HTTP utilities and API error types
//!
//! # Example
//!
//! ```ignore
//! use armgen::azure::{auth::ArmCredentials, client::ResourceClient};
//!
//! async fn example() -> anyhow::Result<()> {
//!     let client = ResourceClient::new(DEFAULT_ENDPOINT, ArmCredentials::from_env())?;
//!     let body = client.get("/subscriptions/xxx/resourceGroups/rg", "2021-04-01").await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod http;

pub use client::{ResourceClient, DEFAULT_ENDPOINT};
pub use http::{is_not_found, ClientError};
