//! Transactional access-control apply for storage libraries.
//!
//! Protocol per library edit: lock → begin transaction → replace or remove
//! entries → commit. The lock is an advisory, server-enforced intent
//! signal; a failed lock is logged and does not block the remaining steps.
//! A failed mutate still proceeds to commit (the server reaps abandoned
//! transaction state on session expiry) but the mutate error is propagated
//! to the caller rather than swallowed.

use reqwest::Method;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{ClientError, ClientResult};
use crate::session::Session;

/// Identity classification on an access-control entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityType {
    User,
    Group,
}

/// One logical access-control declaration: an identity and the set of
/// permissions it is granted (or denied) on a library.
#[derive(Debug, Clone)]
pub struct AccessControl {
    pub identity: String,
    pub identity_type: IdentityType,
    /// `grant` or `deny`.
    pub kind: String,
    pub permissions: Vec<String>,
    pub version: Option<i64>,
    pub table_filter: Option<String>,
}

impl AccessControl {
    pub fn grant(identity: impl Into<String>, identity_type: IdentityType, permissions: Vec<String>) -> Self {
        Self {
            identity: identity.into(),
            identity_type,
            kind: "grant".to_string(),
            permissions,
            version: None,
            table_filter: None,
        }
    }
}

/// One wire entry as accepted by the library-control endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AclEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,
    #[serde(rename = "type")]
    pub kind: String,
    pub permission: String,
    pub identity_type: IdentityType,
    pub identity: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_filter: Option<String>,
}

/// Expand logical declarations into wire entries: one declaration with N
/// permissions becomes N entries sharing identity, type, version, and
/// row filter.
#[must_use]
pub fn expand_entries(controls: &[AccessControl]) -> Vec<AclEntry> {
    let mut entries = Vec::new();
    for control in controls {
        for permission in &control.permissions {
            entries.push(AclEntry {
                version: control.version,
                kind: control.kind.clone(),
                permission: permission.clone(),
                identity_type: control.identity_type,
                identity: control.identity.clone(),
                table_filter: control.table_filter.clone(),
            });
        }
    }
    entries
}

const CONTROLS_MEDIA_TYPE: &str = "application/vnd.platform.access.controls+json";

/// Access-control operations on one named storage library, performed
/// through the session's elevated storage sub-session.
pub struct LibraryAcl<'a> {
    session: &'a Session,
    name: String,
}

impl<'a> LibraryAcl<'a> {
    pub fn new(session: &'a Session, name: impl Into<String>) -> Self {
        Self {
            session,
            name: name.into(),
        }
    }

    fn server(&self) -> &str {
        &self.session.settings().storage_server
    }

    fn session_query(&self) -> ClientResult<Vec<(&'static str, String)>> {
        Ok(vec![("sessionId", self.session.storage_session()?.to_string())])
    }

    /// Whether the library is visible in the current session scope.
    pub async fn exists(&self) -> ClientResult<bool> {
        debug!(library = %self.name, "validating storage library");
        let mut query = self.session_query()?;
        query.push(("includeHidden", "true".to_string()));
        query.push(("limit", self.session.settings().limit()));
        query.push(("filter", format!("eq(\"name\",\"{}\")", self.name)));
        let path = format!("/storage/servers/{}/libraries", self.server());
        let response: crate::client::Collection<serde_json::Value> = self
            .session
            .client()
            .call(Method::GET, &path, &query, None, None)
            .await?
            .require(&path)?;
        Ok(response.count > 0)
    }

    /// Replace the library's full entry list with the expanded entries.
    pub async fn replace(&self, controls: &[AccessControl]) -> ClientResult<()> {
        info!(library = %self.name, "applying access controls, replacing all existing");
        self.transact(Method::PUT, expand_entries(controls)).await
    }

    /// Remove exactly the listed entries.
    pub async fn remove(&self, controls: &[AccessControl]) -> ClientResult<()> {
        info!(library = %self.name, "removing listed access controls");
        self.transact(Method::DELETE, expand_entries(controls)).await
    }

    /// Remove every entry on the library.
    pub async fn remove_all(&self) -> ClientResult<()> {
        info!(library = %self.name, "removing all access controls");
        self.transact(Method::DELETE, Vec::new()).await
    }

    /// Run one lock → begin → mutate → commit cycle.
    async fn transact(&self, method: Method, entries: Vec<AclEntry>) -> ClientResult<()> {
        self.lock().await?;
        self.session_action("start").await?;
        let mutated = self.mutate(method, entries).await;
        if let Err(e) = &mutated {
            warn!(library = %self.name, error = %e, "mutate failed inside access-control transaction");
        }
        self.session_action("commit").await?;
        mutated
    }

    /// Signal exclusive edit intent. Best-effort: a non-success status is
    /// logged and the transaction proceeds.
    async fn lock(&self) -> ClientResult<()> {
        debug!(library = %self.name, "locking storage library");
        let path = format!(
            "/storageAccess/servers/{}/libraryControls/{}/lock",
            self.server(),
            self.name
        );
        let query = self.session_query()?;
        let status = self
            .session
            .client()
            .call_unit(Method::POST, &path, &query, None, None)
            .await?;
        if !status.is_success() {
            warn!(library = %self.name, %status, "failed to lock storage library, continuing");
        }
        Ok(())
    }

    /// Start or commit the server-side transaction scoped to the session.
    async fn session_action(&self, action: &str) -> ClientResult<()> {
        debug!(action, "access-control transaction");
        let path = format!(
            "/storage/servers/{}/sessions/{}",
            self.server(),
            self.session.storage_session()?
        );
        let status = self
            .session
            .client()
            .call_unit(
                Method::POST,
                &path,
                &[("action", action.to_string())],
                None,
                None,
            )
            .await?;
        if status.is_success() {
            Ok(())
        } else {
            Err(ClientError::Api {
                status: status.as_u16(),
                path,
                detail: format!("transaction {action} failed"),
            })
        }
    }

    async fn mutate(&self, method: Method, entries: Vec<AclEntry>) -> ClientResult<()> {
        let path = format!(
            "/storageAccess/servers/{}/libraryControls/{}",
            self.server(),
            self.name
        );
        let query = self.session_query()?;
        let body = serde_json::to_value(&entries).map_err(|e| ClientError::Decode {
            path: path.clone(),
            detail: e.to_string(),
        })?;
        let status = self
            .session
            .client()
            .call_unit(method, &path, &query, Some(CONTROLS_MEDIA_TYPE), Some(body))
            .await?;
        if status.is_success() {
            Ok(())
        } else {
            Err(ClientError::Api {
                status: status.as_u16(),
                path,
                detail: "access-control mutation failed".to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expansion_creates_one_entry_per_permission() {
        let controls = vec![AccessControl::grant(
            "Analysts",
            IdentityType::Group,
            vec!["readInfo".to_string(), "select".to_string()],
        )];
        let entries = expand_entries(&controls);
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.identity == "Analysts"));
        assert!(entries.iter().all(|e| e.identity_type == IdentityType::Group));
        assert_eq!(entries[0].permission, "readInfo");
        assert_eq!(entries[1].permission, "select");
    }

    #[test]
    fn expansion_preserves_version_and_filter_across_entries() {
        let mut control = AccessControl::grant(
            "scientist1",
            IdentityType::User,
            vec!["select".to_string(), "limitedPromote".to_string()],
        );
        control.version = Some(1);
        control.table_filter = Some("region='EMEA'".to_string());
        let entries = expand_entries(&[control]);
        assert_eq!(entries.len(), 2);
        for entry in &entries {
            assert_eq!(entry.version, Some(1));
            assert_eq!(entry.table_filter.as_deref(), Some("region='EMEA'"));
        }
    }

    #[test]
    fn expansion_of_empty_list_is_empty() {
        assert!(expand_entries(&[]).is_empty());
    }

    #[test]
    fn entry_serializes_with_wire_field_names() {
        let entries = expand_entries(&[AccessControl::grant(
            "Analysts",
            IdentityType::Group,
            vec!["readInfo".to_string()],
        )]);
        let wire = serde_json::to_value(&entries).unwrap();
        assert_eq!(
            wire,
            serde_json::json!([{
                "type": "grant",
                "permission": "readInfo",
                "identityType": "group",
                "identity": "Analysts",
            }])
        );
    }
}
