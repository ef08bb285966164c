//! Management command execution over the Kusto v1 REST endpoint.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use crate::client::{ClientError, ControlPlaneClient, CredentialProvider, ResultColumn, ResultSet};

const APP_NAME: &str = "adx-ingest";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct V1Response {
    #[serde(default)]
    tables: Vec<V1Table>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct V1Table {
    #[serde(default)]
    columns: Vec<V1Column>,
    #[serde(default)]
    rows: Vec<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct V1Column {
    column_name: String,
    #[serde(default)]
    data_type: String,
}

/// Decode the first table of a v1 response body.
pub fn parse_v1_response(body: &str) -> Result<ResultSet, ClientError> {
    let resp: V1Response =
        serde_json::from_str(body).map_err(|e| ClientError::Parse(format!("v1 response: {e}")))?;
    let Some(table) = resp.tables.into_iter().next() else {
        return Ok(ResultSet::default());
    };
    Ok(ResultSet {
        columns: table
            .columns
            .into_iter()
            .map(|c| ResultColumn {
                name: c.column_name,
                data_type: c.data_type,
            })
            .collect(),
        rows: table.rows,
    })
}

fn error_field<'a>(error: Option<&'a serde_json::Value>, key: &str) -> &'a str {
    error.and_then(|e| e.get(key)).and_then(|v| v.as_str()).unwrap_or("")
}

/// Turn a non-success response into a [`ClientError`].
pub fn classify_error(status: u16, body: &str) -> ClientError {
    let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();
    let error = parsed.as_ref().and_then(|v| v.get("error"));

    let code = error_field(error, "code");
    let kind = error_field(error, "@type");
    let message = match error_field(error, "@message") {
        "" => match error_field(error, "message") {
            "" => body.trim().to_string(),
            m => m.to_string(),
        },
        m => m.to_string(),
    };

    if status == 401 || status == 403 {
        return ClientError::Auth(message);
    }
    if status == 404 || code.contains("EntityNotFound") || kind.contains("NotFoundException") {
        return ClientError::NotFound(message);
    }
    ClientError::Service { status, message }
}

/// Control-plane client for one cluster endpoint.
pub struct KustoClient {
    http: reqwest::Client,
    endpoint: String,
    credentials: Arc<dyn CredentialProvider>,
}

impl KustoClient {
    pub fn new(endpoint: impl Into<String>, credentials: Arc<dyn CredentialProvider>) -> Self {
        Self {
            http: super::http_client(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            credentials,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ControlPlaneClient for KustoClient {
    async fn execute(&self, database: &str, command: &str) -> Result<ResultSet, ClientError> {
        let token = self.credentials.access_token(&self.endpoint).await?;
        let url = format!("{}/v1/rest/mgmt", self.endpoint);
        let request_id = format!("{APP_NAME};{}", Uuid::new_v4());

        // Commands can carry blob tokens; only the verb is logged.
        let verb = command.split_whitespace().take(2).collect::<Vec<_>>().join(" ");
        debug!(
            database = %database,
            request_id = %request_id,
            command = %verb,
            "Executing management command"
        );

        let response = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {token}"))
            .header("x-ms-client-request-id", &request_id)
            .header("x-ms-app", APP_NAME)
            .json(&json!({ "db": database, "csl": command }))
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        if status != 200 {
            return Err(classify_error(status, &body));
        }
        parse_v1_response(&body)
    }
}
