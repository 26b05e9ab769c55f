//! ARM Authentication
//!
//! Bearer token credentials for the Resource Manager API. Tokens are
//! obtained out of band (e.g. `az account get-access-token`) and handed in
//! through the CLI, the `ARM_ACCESS_TOKEN` environment variable or directly.

use anyhow::Result;
use std::sync::Arc;

/// Environment variable holding a pre-acquired access token
pub const TOKEN_ENV_VAR: &str = "ARM_ACCESS_TOKEN";

/// ARM credentials holder
#[derive(Clone, Default)]
pub struct ArmCredentials {
    token: Option<Arc<str>>,
}

impl std::fmt::Debug for ArmCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Security: never print the token itself
        f.debug_struct("ArmCredentials").finish_non_exhaustive()
    }
}

impl ArmCredentials {
    /// Credentials using a fixed bearer token
    pub fn with_token(token: impl Into<String>) -> Self {
        let token: String = token.into();
        Self {
            token: Some(Arc::from(token)),
        }
    }

    /// Credentials that send no `Authorization` header
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Read the token from `ARM_ACCESS_TOKEN`, anonymous if unset
    pub fn from_env() -> Self {
        match std::env::var(TOKEN_ENV_VAR) {
            Ok(token) if !token.trim().is_empty() => Self::with_token(token.trim()),
            _ => {
                tracing::warn!("{} not set, requests will be unauthenticated", TOKEN_ENV_VAR);
                Self::anonymous()
            }
        }
    }

    /// Get the access token for API calls, if any
    pub async fn get_token(&self) -> Result<Option<String>> {
        Ok(self.token.as_deref().map(str::to_string))
    }
}
