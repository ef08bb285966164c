//! Bindings to a Kusto cluster: AAD tokens, management commands over REST,
//! and direct blob ingestion.

pub mod auth;
pub mod ingest;
pub mod rest;

pub use auth::AadAppCredentials;
pub use ingest::KustoIngestClient;
pub use rest::KustoClient;

use std::time::Duration;

/// Upper bound for a single HTTP exchange with the cluster or the login host.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}
