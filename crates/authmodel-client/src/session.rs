//! Session lifecycle: connect, elevated storage sub-session, disconnect.

use reqwest::Method;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::auth::{acquire_token, Credentials};
use crate::client::PlatformClient;
use crate::config::Settings;
use crate::error::{ClientError, ClientResult};

#[derive(Debug, Deserialize)]
struct StorageSessionInfo {
    id: String,
}

/// One authenticated run against the platform.
///
/// Created once per process invocation. Holds the REST channel and the
/// privilege-elevated storage sub-session used for library access-control
/// operations; the sub-session is torn down on [`Session::disconnect`].
#[derive(Debug)]
pub struct Session {
    client: PlatformClient,
    settings: Settings,
    storage_session: Option<String>,
    connected: bool,
}

impl Session {
    /// Resolve settings and credentials into a connected session.
    ///
    /// Fails fatally if any step fails: base URL validation, token
    /// acquisition, storage session creation, or privilege elevation.
    /// There is no retry; a connection failure aborts the run.
    pub async fn connect(settings: Settings, credentials: Credentials) -> ClientResult<Self> {
        debug!("connecting to the platform");
        settings.validate()?;

        let http = PlatformClient::build_http(&settings)?;
        let token = acquire_token(&http, &settings.base_url, &credentials).await?;
        let client = PlatformClient::new(settings.base_url.clone(), token, http);

        let mut session = Self {
            client,
            settings,
            storage_session: None,
            connected: false,
        };
        session.open_storage_session().await?;
        session.connected = true;
        debug!("connected to the platform");
        Ok(session)
    }

    #[must_use]
    pub fn client(&self) -> &PlatformClient {
        &self.client
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The elevated storage sub-session id.
    pub fn storage_session(&self) -> ClientResult<&str> {
        self.storage_session
            .as_deref()
            .ok_or(ClientError::NotConnected)
    }

    /// Tear down the storage sub-session. Idempotent: a no-op when not
    /// connected.
    pub async fn disconnect(&mut self) {
        if !self.connected {
            return;
        }
        if let Some(id) = self.storage_session.take() {
            debug!(session = %id, "destroying storage session");
            let path = format!(
                "/storage/servers/{}/sessions/{id}",
                self.settings.storage_server
            );
            if let Err(e) = self.client.call_unit(Method::DELETE, &path, &[], None, None).await {
                warn!(error = %e, "failed to destroy storage session; left for server expiry");
            }
        }
        self.connected = false;
        debug!(calls = self.client.call_count(), "disconnected from the platform");
    }

    /// Whether the storage sub-session is still known to the server.
    pub async fn validate_storage_session(&self) -> ClientResult<bool> {
        let Some(id) = self.storage_session.as_deref() else {
            return Ok(false);
        };
        let path = format!(
            "/storage/servers/{}/sessions/{id}",
            self.settings.storage_server
        );
        let response = self
            .client
            .call::<StorageSessionInfo>(Method::GET, &path, &[], None, None)
            .await?;
        Ok(response.status.is_success() && response.body.is_some())
    }

    /// Open the storage sub-session and elevate it to superuser so library
    /// access controls can be edited regardless of the caller's own grants.
    async fn open_storage_session(&mut self) -> ClientResult<()> {
        let server = &self.settings.storage_server;
        debug!(server, "creating storage session");
        let created: StorageSessionInfo = self
            .client
            .call(
                Method::POST,
                &format!("/storage/servers/{server}/sessions"),
                &[],
                None,
                None,
            )
            .await?
            .require(&format!("/storage/servers/{server}/sessions"))?;

        debug!(session = %created.id, "elevating privileges for storage session");
        let elevate_path = format!("/storageAccess/servers/{server}/admin/assumeRole/superUser");
        let status = self
            .client
            .call_unit(
                Method::PUT,
                &elevate_path,
                &[("sessionId", created.id.clone())],
                None,
                None,
            )
            .await?;
        if !status.is_success() {
            return Err(ClientError::Api {
                status: status.as_u16(),
                path: elevate_path,
                detail: "privilege elevation failed".to_string(),
            });
        }

        self.storage_session = Some(created.id);
        Ok(())
    }
}
