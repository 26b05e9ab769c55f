//! HTTP utilities for ARM REST API calls

use crate::resource::IdError;
use anyhow::{Context, Result};
use reqwest::{Client, Method, StatusCode};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Maximum length of an error shown to the user
const MAX_DISPLAY_ERROR_LENGTH: usize = 512;

const ASYNC_OPERATION_HEADER: &str = "Azure-AsyncOperation";

/// Errors reported by the ARM API
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("resource not found ({code}): {message}")]
    NotFound { code: String, message: String },

    #[error("API request failed: {status} {code}: {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    #[error("long running operation ended with status {status}: {message}")]
    OperationFailed { status: String, message: String },
}

/// Whether `error` (or anything in its chain) is a not-found response
pub fn is_not_found(error: &anyhow::Error) -> bool {
    error
        .chain()
        .any(|e| matches!(e.downcast_ref::<ClientError>(), Some(ClientError::NotFound { .. })))
}

/// Sanitize response body for logging
/// Truncates long responses and masks potentially sensitive patterns
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let cut = (0..=MAX_LOG_BODY_LENGTH)
            .rev()
            .find(|i| body.is_char_boundary(*i))
            .unwrap_or(0);
        format!("{}... [truncated, {} bytes total]", &body[..cut], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// Pull `error.code` / `error.message` out of an ARM error body
fn error_details(body: &str) -> (String, String) {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let error = parsed.as_ref().and_then(|v| v.get("error"));
    let field = |key: &str| {
        error
            .and_then(|e| e.get(key))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    (field("code"), field("message"))
}

/// A successful response plus the headers needed to follow long running operations
#[derive(Debug, Clone)]
pub struct ArmResponse {
    pub status: StatusCode,
    pub body: Value,
    /// `Azure-AsyncOperation` or `Location` header
    pub poll_url: Option<String>,
    pub retry_after: Option<Duration>,
}

impl ArmResponse {
    /// Whether the request was accepted but not yet finished
    pub fn is_pending(&self) -> bool {
        self.poll_url.is_some()
            && matches!(self.status, StatusCode::CREATED | StatusCode::ACCEPTED)
    }
}

/// HTTP client wrapper for ARM API calls
#[derive(Clone, Debug)]
pub struct ArmHttpClient {
    client: Client,
}

impl ArmHttpClient {
    /// Create a new HTTP client
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("armgen/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }

    /// Send a request and decode the JSON response
    pub async fn send(
        &self,
        method: Method,
        url: &str,
        token: Option<&str>,
        body: Option<&Value>,
    ) -> Result<ArmResponse> {
        tracing::debug!("{} {}", method, url);

        let mut request = self.client.request(method, url);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.context("Failed to send request")?;

        let status = response.status();
        let headers = response.headers();
        let poll_url = headers
            .get(ASYNC_OPERATION_HEADER)
            .or_else(|| headers.get(reqwest::header::LOCATION))
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let retry_after = headers
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs);

        let text = response
            .text()
            .await
            .context("Failed to read response body")?;

        if !status.is_success() {
            // Security: Only log sanitized/truncated error body to avoid leaking sensitive data
            tracing::error!("API error: {} - {}", status, sanitize_for_log(&text));
            let (code, message) = error_details(&text);
            if status == StatusCode::NOT_FOUND {
                return Err(ClientError::NotFound { code, message }.into());
            }
            return Err(ClientError::Api {
                status: status.as_u16(),
                code,
                message,
            }
            .into());
        }

        // Handle empty response
        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).context("Failed to parse response JSON")?
        };

        Ok(ArmResponse {
            status,
            body,
            poll_url,
            retry_after,
        })
    }

    pub async fn get(&self, url: &str, token: Option<&str>) -> Result<ArmResponse> {
        self.send(Method::GET, url, token, None).await
    }

    pub async fn put(&self, url: &str, token: Option<&str>, body: &Value) -> Result<ArmResponse> {
        self.send(Method::PUT, url, token, Some(body)).await
    }

    pub async fn delete(&self, url: &str, token: Option<&str>) -> Result<ArmResponse> {
        self.send(Method::DELETE, url, token, None).await
    }
}

/// Format an ARM API error for display
/// Security: Sanitizes error messages to avoid leaking sensitive API details
pub fn format_arm_error(error: &anyhow::Error) -> String {
    if let Some(client_error) = error.chain().find_map(|e| e.downcast_ref::<ClientError>()) {
        match client_error {
            // Outermost context names the resource that was looked up
            ClientError::NotFound { .. } => {
                return format!("Resource not found: {}", sanitize_for_display(&error.to_string()))
            }
            ClientError::Api { status: 401, .. } => {
                return "Authentication failed. Run 'az account get-access-token' and set ARM_ACCESS_TOKEN."
                    .to_string()
            }
            ClientError::Api { status: 403, .. } => {
                return "Permission denied. Check your Azure RBAC role assignments.".to_string()
            }
            ClientError::Api { status: 409, .. } => {
                return "Resource conflict. The resource may already exist or be in use.".to_string()
            }
            ClientError::Api { status: 429, .. } => {
                return "Rate limit exceeded. Please try again later.".to_string()
            }
            ClientError::Api { status, .. } if *status >= 500 => {
                return "Azure service temporarily unavailable. Please try again.".to_string()
            }
            _ => {}
        }
    }

    let error_str = format!("{:#}", error);

    // Identifier errors echo the offending input, keep all of it
    if error.chain().any(|e| e.downcast_ref::<IdError>().is_some()) {
        return sanitize_for_display(&error_str);
    }

    // Truncate long error messages and remove potential sensitive data
    let sanitized = sanitize_for_display(&error_str)
        .chars()
        .take(MAX_DISPLAY_ERROR_LENGTH)
        .collect::<String>();

    if sanitized.len() < error_str.len() {
        format!("{}...", sanitized)
    } else {
        sanitized
    }
}

fn sanitize_for_display(message: &str) -> String {
    message
        .chars()
        .filter(|c| c.is_ascii_graphic() || *c == ' ')
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_truncates() {
        let long = "x".repeat(500);
        let sanitized = sanitize_for_log(&long);
        assert!(sanitized.starts_with(&"x".repeat(200)));
        assert!(sanitized.contains("500 bytes total"));
    }

    #[test]
    fn test_error_details() {
        let (code, message) =
            error_details(r#"{"error":{"code":"ResourceNotFound","message":"gone"}}"#);
        assert_eq!(code, "ResourceNotFound");
        assert_eq!(message, "gone");

        let (code, message) = error_details("<html>bad gateway</html>");
        assert!(code.is_empty());
        assert!(message.is_empty());
    }

    #[test]
    fn test_is_not_found_through_context() {
        let err: anyhow::Error = ClientError::NotFound {
            code: "ResourceNotFound".to_string(),
            message: String::new(),
        }
        .into();
        let err = err.context("reading resource");
        assert!(is_not_found(&err));

        let other: anyhow::Error = ClientError::Api {
            status: 500,
            code: String::new(),
            message: String::new(),
        }
        .into();
        assert!(!is_not_found(&other));
    }

    #[test]
    fn test_format_arm_error() {
        let err: anyhow::Error = ClientError::Api {
            status: 403,
            code: "AuthorizationFailed".to_string(),
            message: "no".to_string(),
        }
        .into();
        assert!(format_arm_error(&err).contains("Permission denied"));
    }

    #[test]
    fn test_format_not_found_keeps_resource_id() {
        let id = "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Storage/storageAccounts/acct?api-version=2023-01-01";
        let err: anyhow::Error = ClientError::NotFound {
            code: "ResourceNotFound".to_string(),
            message: "gone".to_string(),
        }
        .into();
        let err = err.context(format!("not found {:?}", id));

        let formatted = format_arm_error(&err);
        assert!(formatted.starts_with("Resource not found"));
        assert!(formatted.contains(id), "{}", formatted);
    }

    #[test]
    fn test_format_id_error_keeps_full_input() {
        let parent = format!(
            "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/{}/providers/Microsoft.Network/virtualNetworks/vnet1",
            "a-rather-long-resource-group-name-".repeat(4)
        );
        let err = crate::resource::ResourceId::build(
            "subnet1",
            &parent,
            "Microsoft.Storage/storageAccounts/blobServices@2023-01-01",
        )
        .unwrap_err();
        let err = anyhow::Error::from(err).context("building resource id");

        let formatted = format_arm_error(&err);
        assert!(formatted.len() > 160);
        assert!(formatted.contains(&parent), "{}", formatted);
    }

    #[test]
    fn test_format_generic_error_is_truncated() {
        let err = anyhow::anyhow!("{}", "x".repeat(2000));
        let formatted = format_arm_error(&err);
        assert!(formatted.ends_with("..."));
        assert_eq!(formatted.len(), MAX_DISPLAY_ERROR_LENGTH + 3);
    }
}
