use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Authority used by the service's SDKs when none is configured.
pub const DEFAULT_AUTHORITY: &str = "microsoft.com";

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_required(profile: &str, key: &'static str) -> Result<String, ConfigError> {
    profiled_env_opt(profile, key).ok_or(ConfigError::MissingVar(key))
}

fn profiled_env_u32(profile: &str, key: &str, default: u32) -> u32 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_u64(profile: &str, key: &str, default: u64) -> u64 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_f64(profile: &str, key: &str, default: f64) -> f64 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(default)
}

fn profiled_env_bool(profile: &str, key: &str, default: bool) -> bool {
    match profiled_env_opt(profile, key) {
        Some(v) => matches!(v.to_ascii_lowercase().as_str(), "true" | "1" | "yes"),
        None => default,
    }
}

// ── Top-level config ──────────────────────────────────────────

/// Everything the ingestion runner needs, resolved once at startup.
///
/// Profile is read from `ADX_PROFILE`. When set (e.g. `PROD`), every key is
/// first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub cluster: ClusterConfig,
    pub auth: AuthConfig,
    pub ingest: IngestSettings,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    pub fn from_env() -> Result<Self, ConfigError> {
        let profile = env_or("ADX_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Result<Self, ConfigError> {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Ok(Self {
            profile: p.to_string(),
            cluster: ClusterConfig::from_env_profiled(p)?,
            auth: AuthConfig::from_env_profiled(p)?,
            ingest: IngestSettings::from_env_profiled(p),
        })
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!("  cluster:  endpoint={}, database={}", self.cluster.endpoint, self.cluster.database);
        tracing::info!("  auth:     client_id={}, authority={}", self.auth.client_id, self.auth.authority);
        tracing::info!(
            "  ingest:   max_wait={}s, poll={}ms..{}ms x{}, retries={}, reset_table={}",
            self.ingest.max_wait_secs,
            self.ingest.poll_initial_ms,
            self.ingest.poll_max_ms,
            self.ingest.poll_multiplier,
            self.ingest.poll_max_retries,
            self.ingest.reset_table,
        );
    }

    /// Return a redacted view safe for printing (no secrets).
    pub fn redacted_summary(&self) -> serde_json::Value {
        serde_json::json!({
            "profile": self.profile_label(),
            "cluster": {
                "endpoint": self.cluster.endpoint,
                "database": self.cluster.database,
            },
            "auth": {
                "client_id": self.auth.client_id,
                "authority": self.auth.authority,
                "client_secret": "***",
            },
            "ingest": {
                "max_wait_secs": self.ingest.max_wait_secs,
                "poll_initial_ms": self.ingest.poll_initial_ms,
                "poll_max_ms": self.ingest.poll_max_ms,
                "poll_multiplier": self.ingest.poll_multiplier,
                "poll_max_retries": self.ingest.poll_max_retries,
                "reset_table": self.ingest.reset_table,
            },
        })
    }
}

// ── Cluster ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Query/management endpoint, e.g. `https://mycluster.westeurope.kusto.windows.net`.
    pub endpoint: String,
    pub database: String,
}

impl ClusterConfig {
    fn from_env_profiled(p: &str) -> Result<Self, ConfigError> {
        let endpoint = profiled_env_required(p, "KUSTO_ENDPOINT")?;
        let parsed = url::Url::parse(&endpoint).map_err(|e| ConfigError::InvalidVar {
            key: "KUSTO_ENDPOINT",
            reason: e.to_string(),
        })?;
        if parsed.host_str().is_none() {
            return Err(ConfigError::InvalidVar {
                key: "KUSTO_ENDPOINT",
                reason: "endpoint has no host".into(),
            });
        }
        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            database: profiled_env_required(p, "KUSTO_DB")?,
        })
    }
}

// ── Service principal ─────────────────────────────────────────

#[derive(Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub client_id: String,
    #[serde(skip_serializing)]
    pub client_secret: String,
    /// AAD tenant id or domain.
    pub authority: String,
}

impl AuthConfig {
    fn from_env_profiled(p: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            client_id: profiled_env_required(p, "AZURE_SP_CLIENT_ID")?,
            client_secret: profiled_env_required(p, "AZURE_SP_CLIENT_SECRET")?,
            authority: profiled_env_or(p, "AZURE_SP_AUTHORITY", DEFAULT_AUTHORITY),
        })
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .field("authority", &self.authority)
            .finish()
    }
}

// ── Ingestion / polling ───────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestSettings {
    pub max_wait_secs: u64,
    pub poll_initial_ms: u64,
    pub poll_max_ms: u64,
    pub poll_multiplier: f64,
    /// Consecutive failed status queries tolerated before giving up.
    pub poll_max_retries: u32,
    /// Drop and recreate the table before ingesting (otherwise create-merge).
    pub reset_table: bool,
}

impl IngestSettings {
    fn from_env_profiled(p: &str) -> Self {
        let poll_initial_ms = profiled_env_u64(p, "INGEST_POLL_INITIAL_MS", 1_000).max(1);
        Self {
            max_wait_secs: profiled_env_u64(p, "INGEST_MAX_WAIT_SECS", 600),
            poll_initial_ms,
            poll_max_ms: profiled_env_u64(p, "INGEST_POLL_MAX_MS", 30_000).max(poll_initial_ms),
            poll_multiplier: profiled_env_f64(p, "INGEST_POLL_MULTIPLIER", 2.0).max(1.0),
            poll_max_retries: profiled_env_u32(p, "INGEST_POLL_MAX_RETRIES", 3),
            reset_table: profiled_env_bool(p, "INGEST_RESET_TABLE", true),
        }
    }

    pub fn max_wait(&self) -> Duration {
        Duration::from_secs(self.max_wait_secs)
    }
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            max_wait_secs: 600,
            poll_initial_ms: 1_000,
            poll_max_ms: 30_000,
            poll_multiplier: 2.0,
            poll_max_retries: 3,
            reset_table: true,
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
