// ============================================
// Credential Provider
// ============================================
//
// Supplies the bearer header for upstream ranking requests.
// Tokens come from the OAuth2 client-credentials grant and are refreshed
// once they are inside the safety margin of their advertised lifetime.

use crate::error::{Result, SyncError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info};

/// Refresh this long before the token actually expires
pub const DEFAULT_REFRESH_MARGIN: Duration = Duration::from_secs(5 * 60);

#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Value for the `Authorization` header, e.g. `Bearer abc...`
    async fn auth_header(&self) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct TokenRequest<'a> {
    grant_type: &'static str,
    client_id: &'a str,
    client_secret: &'a str,
    scope: &'static str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

struct CachedToken {
    header: String,
    expires_at: Instant,
}

/// OAuth2 client-credentials provider with an in-memory token cache
pub struct ClientCredentialsProvider {
    http: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    refresh_margin: Duration,
    cached: Mutex<Option<CachedToken>>,
}

impl ClientCredentialsProvider {
    pub fn new(
        http: reqwest::Client,
        oauth_base_url: &str,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            http,
            token_url: format!("{}/oauth/token", oauth_base_url.trim_end_matches('/')),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            refresh_margin: DEFAULT_REFRESH_MARGIN,
            cached: Mutex::new(None),
        }
    }

    async fn request_token(&self) -> Result<CachedToken> {
        let response = self
            .http
            .post(&self.token_url)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&TokenRequest {
                grant_type: "client_credentials",
                client_id: &self.client_id,
                client_secret: &self.client_secret,
                scope: "public",
            })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(SyncError::Auth(format!(
                "token endpoint returned {}: {}",
                status.as_u16(),
                body
            )));
        }

        let token: TokenResponse = serde_json::from_str(&body)?;
        info!(expires_in = token.expires_in, "Obtained upstream access token");

        Ok(CachedToken {
            header: format!("Bearer {}", token.access_token),
            expires_at: Instant::now() + Duration::from_secs(token.expires_in),
        })
    }
}

#[async_trait]
impl CredentialProvider for ClientCredentialsProvider {
    async fn auth_header(&self) -> Result<String> {
        let mut cached = self.cached.lock().await;

        if let Some(token) = cached.as_ref() {
            if Instant::now() + self.refresh_margin < token.expires_at {
                return Ok(token.header.clone());
            }
            debug!("Access token inside refresh margin, renewing");
        }

        let token = self.request_token().await?;
        let header = token.header.clone();
        *cached = Some(token);
        Ok(header)
    }
}

/// Fixed header, for deployments that inject a long-lived token
pub struct StaticCredentials {
    header: String,
}

impl StaticCredentials {
    pub fn bearer(token: &str) -> Self {
        Self {
            header: format!("Bearer {token}"),
        }
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentials {
    async fn auth_header(&self) -> Result<String> {
        Ok(self.header.clone())
    }
}
