//! HTTP request primitive for the platform REST API.
//!
//! One synchronous-in-effect exchange per call: the caller awaits the
//! response before issuing the next request. Transport errors propagate as
//! fatal; 4xx/5xx statuses do not: domain operations inspect the returned
//! status and decide what it means for them.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use tracing::{debug, warn};

use crate::config::Settings;
use crate::error::{ClientError, ClientResult};

/// A collection response: `count` plus `items`.
///
/// Some endpoints report `count` as a JSON number and others as a string;
/// [`de_count`] accepts both.
#[derive(Debug, Deserialize)]
pub struct Collection<T> {
    #[serde(default, deserialize_with = "de_count")]
    pub count: i64,
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

fn de_count<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::Number(n) => Ok(n.as_i64().unwrap_or(0)),
        serde_json::Value::String(s) => s.parse().map_err(serde::de::Error::custom),
        serde_json::Value::Null => Ok(0),
        other => Err(serde::de::Error::custom(format!(
            "unexpected count representation: {other}"
        ))),
    }
}

/// Decoded response plus the HTTP status it arrived with.
#[derive(Debug)]
pub struct ApiResponse<T> {
    pub status: StatusCode,
    /// Decoded body; `None` on an error status or an empty success body.
    pub body: Option<T>,
}

impl<T> ApiResponse<T> {
    /// Map a non-success status to a typed API error, otherwise return the
    /// decoded body (if any).
    pub fn success(self, path: &str) -> ClientResult<Option<T>> {
        if self.status.is_success() {
            Ok(self.body)
        } else {
            Err(ClientError::Api {
                status: self.status.as_u16(),
                path: path.to_string(),
                detail: format!("HTTP {}", self.status),
            })
        }
    }

    /// Like [`ApiResponse::success`] but requires a decoded body.
    pub fn require(self, path: &str) -> ClientResult<T> {
        self.success(path)?.ok_or_else(|| ClientError::Decode {
            path: path.to_string(),
            detail: "empty response body".to_string(),
        })
    }
}

/// Authenticated channel to the platform REST API.
#[derive(Debug)]
pub struct PlatformClient {
    base_url: String,
    access_token: String,
    http: Client,
    calls: AtomicU64,
}

impl PlatformClient {
    /// Build the underlying HTTP client from the settings.
    pub fn build_http(settings: &Settings) -> ClientResult<Client> {
        Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .danger_accept_invalid_certs(!settings.tls_verify)
            .user_agent(concat!("authmodel/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ClientError::InvalidConfig(format!("failed to build HTTP client: {e}")))
    }

    pub fn new(base_url: String, access_token: String, http: Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token,
            http,
            calls: AtomicU64::new(0),
        }
    }

    /// Number of REST calls issued so far, for the disconnect log line.
    #[must_use]
    pub fn call_count(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    /// Perform one exchange against the API.
    ///
    /// The body is decoded into `T` only on a success status; an empty
    /// success body yields `body: None`. Error statuses are warn-logged and
    /// returned to the caller undecoded; they are never an `Err` here.
    pub async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        content_type: Option<&str>,
        body: Option<serde_json::Value>,
    ) -> ClientResult<ApiResponse<T>> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%method, path, "calling platform REST API");

        let mut builder = self
            .http
            .request(method, &url)
            .bearer_auth(&self.access_token)
            .header("Accept", "application/json")
            .header("Content-Type", content_type.unwrap_or("application/json"));
        if !query.is_empty() {
            builder = builder.query(query);
        }
        if let Some(body) = body {
            builder = builder.json(&body);
        }

        let response = builder.send().await?;
        self.calls.fetch_add(1, Ordering::Relaxed);

        let status = response.status();
        let text = response.text().await.unwrap_or_default();

        if !status.is_success() {
            warn!(%status, path, body = %text, "error status in REST response");
            return Ok(ApiResponse { status, body: None });
        }

        debug!(%status, path, "successful REST response");
        if text.is_empty() {
            return Ok(ApiResponse { status, body: None });
        }
        let body = serde_json::from_str(&text).map_err(|e| ClientError::Decode {
            path: path.to_string(),
            detail: e.to_string(),
        })?;
        Ok(ApiResponse {
            status,
            body: Some(body),
        })
    }

    /// An exchange whose response body is irrelevant.
    pub async fn call_unit(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        content_type: Option<&str>,
        body: Option<serde_json::Value>,
    ) -> ClientResult<StatusCode> {
        let response: ApiResponse<serde_json::Value> =
            self.call(method, path, query, content_type, body).await?;
        Ok(response.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Item {
        id: String,
    }

    #[test]
    fn collection_count_accepts_number() {
        let parsed: Collection<Item> =
            serde_json::from_str(r#"{"count": 2, "items": [{"id":"a"},{"id":"b"}]}"#).unwrap();
        assert_eq!(parsed.count, 2);
        assert_eq!(parsed.items.len(), 2);
    }

    #[test]
    fn collection_count_accepts_string() {
        let parsed: Collection<Item> = serde_json::from_str(r#"{"count": "0"}"#).unwrap();
        assert_eq!(parsed.count, 0);
        assert!(parsed.items.is_empty());
    }

    #[test]
    fn collection_defaults_when_fields_missing() {
        let parsed: Collection<Item> = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed.count, 0);
        assert!(parsed.items.is_empty());
    }
}
