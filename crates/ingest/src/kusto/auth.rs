//! AAD application (client-credentials) tokens.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info};

use adx_core::config::AuthConfig;

use crate::client::{ClientError, CredentialProvider};

const LOGIN_BASE: &str = "https://login.microsoftonline.com";

/// Tokens are refreshed this long before the service says they expire.
const EXPIRY_MARGIN: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    /// Seconds; some endpoints send it as a string.
    #[serde(default)]
    expires_in: Option<serde_json::Value>,
}

/// Parse a token endpoint response into the token and its lifetime.
pub fn parse_token_response(body: &str) -> Result<(String, Duration), ClientError> {
    let resp: TokenResponse = serde_json::from_str(body)
        .map_err(|e| ClientError::Parse(format!("token response: {e}")))?;
    let secs = match resp.expires_in {
        Some(serde_json::Value::Number(n)) => n.as_u64().unwrap_or(0),
        Some(serde_json::Value::String(s)) => s.parse().unwrap_or(0),
        _ => 0,
    };
    Ok((resp.access_token, Duration::from_secs(secs)))
}

struct CachedToken {
    token: String,
    refresh_at: Instant,
}

/// Client-credentials provider for a service principal.
pub struct AadAppCredentials {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    authority: String,
    login_base: String,
    cache: Mutex<HashMap<String, CachedToken>>,
}

impl AadAppCredentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>, authority: impl Into<String>) -> Self {
        Self {
            http: super::http_client(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            authority: authority.into(),
            login_base: LOGIN_BASE.to_string(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(auth: &AuthConfig) -> Self {
        Self::new(&auth.client_id, &auth.client_secret, &auth.authority)
    }

    /// Point at a different login host (sovereign clouds, local stubs).
    pub fn with_login_base(mut self, base: impl Into<String>) -> Self {
        self.login_base = base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn token_url(&self) -> String {
        format!("{}/{}/oauth2/v2.0/token", self.login_base, self.authority)
    }

    async fn fetch_token(&self, resource: &str) -> Result<(String, Duration), ClientError> {
        let scope = format!("{}/.default", resource.trim_end_matches('/'));
        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("scope", scope.as_str()),
        ];

        let response = self
            .http
            .post(self.token_url())
            .form(&form)
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ClientError::Transport(format!("token response body: {e}")))?;
        match status {
            200 => parse_token_response(&body),
            400 | 401 | 403 => Err(ClientError::Auth(format!("token request rejected ({status}): {body}"))),
            _ => Err(ClientError::Service { status, message: body }),
        }
    }
}

impl std::fmt::Debug for AadAppCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AadAppCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .field("authority", &self.authority)
            .finish()
    }
}

#[async_trait]
impl CredentialProvider for AadAppCredentials {
    fn application_id(&self) -> &str {
        &self.client_id
    }

    async fn access_token(&self, resource: &str) -> Result<String, ClientError> {
        let mut cache = self.cache.lock().await;
        if let Some(cached) = cache.get(resource) {
            if Instant::now() < cached.refresh_at {
                return Ok(cached.token.clone());
            }
            debug!(resource = %resource, "Cached token near expiry, refreshing");
        }

        let (token, lifetime) = self.fetch_token(resource).await?;
        info!(resource = %resource, expires_in_secs = lifetime.as_secs(), "Acquired access token");
        cache.insert(
            resource.to_string(),
            CachedToken {
                token: token.clone(),
                refresh_at: Instant::now() + lifetime.saturating_sub(EXPIRY_MARGIN),
            },
        );
        Ok(token)
    }
}
