//! Generic Resource Client
//!
//! Addresses any ARM resource by its canonical resource path and API
//! version, combining credentials and HTTP functionality.

use super::auth::ArmCredentials;
use super::http::{ArmHttpClient, ArmResponse, ClientError};
use anyhow::{Context, Result};
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// Public Azure cloud Resource Manager endpoint
pub const DEFAULT_ENDPOINT: &str = "https://management.azure.com";

/// Delay between long running operation polls when the API gives no `Retry-After`
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Client for the generic resource API
#[derive(Clone, Debug)]
pub struct ResourceClient {
    pub credentials: ArmCredentials,
    pub http: ArmHttpClient,
    endpoint: Url,
    poll_interval: Duration,
}

impl ResourceClient {
    /// Create a new client for `endpoint`
    pub fn new(endpoint: &str, credentials: ArmCredentials) -> Result<Self> {
        let endpoint = Url::parse(endpoint)
            .with_context(|| format!("Invalid Resource Manager endpoint {:?}", endpoint))?;

        Ok(Self {
            credentials,
            http: ArmHttpClient::new()?,
            endpoint,
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    /// Override the long running operation poll interval
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Build the request URL for a resource path
    pub fn resource_url(&self, azure_resource_id: &str, api_version: &str) -> Url {
        let mut url = self.endpoint.clone();
        let base = self.endpoint.path().trim_end_matches('/');
        url.set_path(&format!("{}{}", base, azure_resource_id));
        url.query_pairs_mut()
            .clear()
            .append_pair("api-version", api_version);
        url
    }

    async fn token(&self) -> Result<Option<String>> {
        self.credentials.get_token().await
    }

    /// Read a resource, returning its response body
    pub async fn get(&self, azure_resource_id: &str, api_version: &str) -> Result<Value> {
        let url = self.resource_url(azure_resource_id, api_version);
        let token = self.token().await?;
        let response = self.http.get(url.as_str(), token.as_deref()).await?;
        Ok(response.body)
    }

    /// Create or update a resource and wait until ARM reports it finished.
    ///
    /// The final resource state is not fetched; callers read it back.
    pub async fn create_or_update(
        &self,
        azure_resource_id: &str,
        api_version: &str,
        body: &Value,
    ) -> Result<()> {
        let url = self.resource_url(azure_resource_id, api_version);
        let token = self.token().await?;
        let response = self.http.put(url.as_str(), token.as_deref(), body).await?;

        if response.is_pending() {
            self.wait_for_completion(&response).await?;
        }

        Ok(())
    }

    /// Delete a resource and wait until ARM reports it gone
    pub async fn delete(&self, azure_resource_id: &str, api_version: &str) -> Result<()> {
        let url = self.resource_url(azure_resource_id, api_version);
        let token = self.token().await?;
        let response = self.http.delete(url.as_str(), token.as_deref()).await?;

        if response.is_pending() {
            self.wait_for_completion(&response).await?;
        }

        Ok(())
    }

    /// Poll an `Azure-AsyncOperation`/`Location` URL until the operation ends
    async fn wait_for_completion(&self, accepted: &ArmResponse) -> Result<()> {
        let Some(poll_url) = accepted.poll_url.clone() else {
            return Ok(());
        };
        let mut delay = accepted.retry_after.unwrap_or(self.poll_interval);

        loop {
            tokio::time::sleep(delay).await;

            let token = self.token().await?;
            let response = self
                .http
                .get(&poll_url, token.as_deref())
                .await
                .context("Failed to poll long running operation")?;

            match response.body.get("status").and_then(Value::as_str) {
                Some(status) if status.eq_ignore_ascii_case("Succeeded") => return Ok(()),
                Some(status)
                    if status.eq_ignore_ascii_case("Failed")
                        || status.eq_ignore_ascii_case("Canceled") =>
                {
                    let message = response
                        .body
                        .pointer("/error/message")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string();
                    return Err(ClientError::OperationFailed {
                        status: status.to_string(),
                        message,
                    }
                    .into());
                }
                Some(status) => tracing::debug!("operation still {}", status),
                None if response.status == reqwest::StatusCode::ACCEPTED => {
                    tracing::debug!("operation still accepted")
                }
                None => return Ok(()),
            }

            delay = response.retry_after.unwrap_or(self.poll_interval);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_url() {
        let client = ResourceClient::new(DEFAULT_ENDPOINT, ArmCredentials::anonymous()).unwrap();
        let url = client.resource_url("/providers/Provider.Test/widgets/foo", "2021-01-01");
        assert_eq!(
            url.as_str(),
            "https://management.azure.com/providers/Provider.Test/widgets/foo?api-version=2021-01-01"
        );
    }

    #[test]
    fn test_resource_url_keeps_endpoint_prefix() {
        let client =
            ResourceClient::new("http://localhost:8080/arm/", ArmCredentials::anonymous()).unwrap();
        let url = client.resource_url("/subscriptions/s", "v1");
        assert_eq!(url.as_str(), "http://localhost:8080/arm/subscriptions/s?api-version=v1");
    }

    #[test]
    fn test_invalid_endpoint() {
        assert!(ResourceClient::new("not a url", ArmCredentials::anonymous()).is_err());
    }
}
