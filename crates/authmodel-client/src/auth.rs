//! OAuth token acquisition for the platform login service.
//!
//! Two paths: a static pre-acquired token (from the platform CLI's
//! credential cache) or the resource-owner password grant against the
//! platform token endpoint.

use serde::Deserialize;
use tracing::debug;

use crate::error::{ClientError, ClientResult};

/// Credentials used to open a session.
#[derive(Clone)]
pub enum Credentials {
    /// A pre-acquired bearer token.
    Token(String),
    /// Resource-owner password grant.
    Password {
        user: String,
        password: String,
        client_id: String,
        client_secret: String,
    },
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Token(_) => f.debug_struct("Token").field("token", &"[REDACTED]").finish(),
            Self::Password { user, client_id, .. } => f
                .debug_struct("Password")
                .field("user", user)
                .field("password", &"[REDACTED]")
                .field("client_id", client_id)
                .field("client_secret", &"[REDACTED]")
                .finish(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Acquire a bearer token for the given credentials.
///
/// A failure here is fatal: the caller aborts the run rather than retrying.
pub async fn acquire_token(
    http: &reqwest::Client,
    base_url: &str,
    credentials: &Credentials,
) -> ClientResult<String> {
    match credentials {
        Credentials::Token(token) => Ok(token.clone()),
        Credentials::Password {
            user,
            password,
            client_id,
            client_secret,
        } => {
            let token_url = format!("{base_url}/oauth/token");
            debug!(token_url, user, "acquiring access token via password grant");
            let response = http
                .post(&token_url)
                .basic_auth(client_id, Some(client_secret))
                .form(&[
                    ("grant_type", "password"),
                    ("username", user.as_str()),
                    ("password", password.as_str()),
                ])
                .send()
                .await
                .map_err(|e| ClientError::Auth(format!("token request failed: {e}")))?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_else(|_| "<no body>".to_string());
                return Err(ClientError::Auth(format!(
                    "token endpoint returned {status}: {body}"
                )));
            }

            let token: TokenResponse = response
                .json()
                .await
                .map_err(|e| ClientError::Auth(format!("failed to parse token response: {e}")))?;
            Ok(token.access_token)
        }
    }
}
