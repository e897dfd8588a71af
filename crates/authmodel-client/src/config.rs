//! Connection settings resolved once at startup and threaded explicitly
//! into every component constructor.

use crate::error::{ClientError, ClientResult};

/// Default page-size limit sent with collection requests. The platform
/// paginates with one large `limit` parameter rather than cursors.
pub const DEFAULT_RESPONSE_LIMIT: u32 = 1000;

/// Default storage server instance name.
pub const DEFAULT_STORAGE_SERVER: &str = "shared-default";

/// Resolved connection settings for one process run.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Base URL of the platform, e.g. `https://platform.example.com`.
    pub base_url: String,
    /// Storage server instance used for library access controls.
    pub storage_server: String,
    /// Page-size limit for collection requests.
    pub response_limit: u32,
    /// Whether to validate the server TLS certificate.
    pub tls_verify: bool,
    /// HTTP request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            storage_server: DEFAULT_STORAGE_SERVER.to_string(),
            response_limit: DEFAULT_RESPONSE_LIMIT,
            tls_verify: true,
            timeout_secs: 60,
        }
    }
}

impl Settings {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Validate the settings before connecting. A malformed base
    /// configuration is fatal.
    pub fn validate(&self) -> ClientResult<()> {
        if self.base_url.is_empty() {
            return Err(ClientError::InvalidConfig(
                "base URL must be provided".to_string(),
            ));
        }
        reqwest::Url::parse(&self.base_url)
            .map_err(|e| ClientError::InvalidConfig(format!("base URL: {e}")))?;
        if self.storage_server.is_empty() {
            return Err(ClientError::InvalidConfig(
                "storage server name must be provided".to_string(),
            ));
        }
        Ok(())
    }

    /// The `limit` query value for collection requests.
    #[must_use]
    pub fn limit(&self) -> String {
        self.response_limit.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_rejects_empty_base_url() {
        let settings = Settings::default();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn validate_rejects_malformed_base_url() {
        let settings = Settings::new("not a url");
        assert!(settings.validate().is_err());
    }

    #[test]
    fn validate_accepts_https_url() {
        let settings = Settings::new("https://platform.example.com");
        assert!(settings.validate().is_ok());
    }
}
