//! Blob source locations with their access token kept out of logs.

use std::fmt;

use crate::error::SchemaError;

/// Remote blob to ingest from, plus the access token needed to read it.
///
/// The token (typically a SAS query string) is sensitive: `Debug` and
/// `Display` only ever show scheme, host and path.
#[derive(Clone, PartialEq, Eq)]
pub struct SourceLocation {
    uri: url::Url,
    token: Option<String>,
}

impl SourceLocation {
    /// Build from a blob URI. A query string already on the URI is treated as
    /// the access token.
    pub fn new(uri: &str) -> Result<Self, SchemaError> {
        let mut parsed = url::Url::parse(uri).map_err(|e| SchemaError::InvalidSource(e.to_string()))?;
        if !matches!(parsed.scheme(), "https" | "http") || parsed.host_str().is_none() {
            return Err(SchemaError::InvalidSource(format!(
                "expected an http(s) blob URI, got scheme {}",
                parsed.scheme()
            )));
        }
        let token = parsed.query().filter(|q| !q.is_empty()).map(|q| format!("?{q}"));
        parsed.set_query(None);
        Ok(Self { uri: parsed, token })
    }

    /// Attach (or replace) the access token. A leading `?` is optional.
    pub fn with_token(mut self, token: impl AsRef<str>) -> Self {
        let token = token.as_ref().trim_start_matches('?');
        self.token = if token.is_empty() {
            None
        } else {
            Some(format!("?{token}"))
        };
        self
    }

    /// `https://{account}.blob.core.windows.net/{container}/{file}{token}`
    pub fn azure_blob(
        account: &str,
        container: &str,
        file: &str,
        token: Option<&str>,
    ) -> Result<Self, SchemaError> {
        let source = Self::new(&format!(
            "https://{account}.blob.core.windows.net/{container}/{file}"
        ))?;
        Ok(match token {
            Some(t) => source.with_token(t),
            None => source,
        })
    }

    /// Full URI including the token. Only hand this to the service.
    pub fn expose_uri(&self) -> String {
        match &self.token {
            Some(token) => format!("{}{}", self.uri, token),
            None => self.uri.to_string(),
        }
    }

    /// URI safe for logs.
    pub fn redacted(&self) -> String {
        self.uri.to_string()
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// Last path segment, e.g. `StormEvents.csv`.
    pub fn file_name(&self) -> Option<&str> {
        self.uri
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|s| !s.is_empty())
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.redacted())?;
        if self.has_token() {
            f.write_str("?<redacted>")?;
        }
        Ok(())
    }
}

impl fmt::Debug for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceLocation")
            .field("uri", &self.redacted())
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
