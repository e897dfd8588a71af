//! Typed operations on content folders.
//!
//! Folder parents are a relation, not ownership: a folder references its
//! parent by path prefix only. Resolved URIs are kept in an explicit
//! path→URI index built up over the run, so repeated lookups of the same
//! path cost one request.

use std::collections::HashMap;

use reqwest::Method;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::client::PlatformClient;
use crate::error::{ClientError, ClientResult};

#[derive(Debug, Deserialize)]
struct FolderInfo {
    id: String,
}

/// Folder client bound to a connected platform channel.
pub struct Folders<'a> {
    client: &'a PlatformClient,
    limit: String,
    /// Path→URI index for folders resolved during this run.
    index: HashMap<String, String>,
}

impl<'a> Folders<'a> {
    pub fn new(client: &'a PlatformClient, response_limit: u32) -> Self {
        Self {
            client,
            limit: response_limit.to_string(),
            index: HashMap::new(),
        }
    }

    /// Resolve a folder path to its URI, or `None` when it does not exist.
    /// A 404 from the lookup endpoint means "absent", not an error.
    pub async fn validate(&mut self, path: &str) -> ClientResult<Option<String>> {
        if let Some(uri) = self.index.get(path) {
            return Ok(Some(uri.clone()));
        }
        debug!(path, "validating content folder");
        let response = self
            .client
            .call::<FolderInfo>(
                Method::GET,
                "/folders/folders/@item",
                &[("path", path.to_string()), ("limit", self.limit.clone())],
                None,
                None,
            )
            .await?;
        if !response.status.is_success() {
            debug!(path, "content folder does not exist");
            return Ok(None);
        }
        let info = response.body.ok_or_else(|| ClientError::Decode {
            path: "/folders/folders/@item".to_string(),
            detail: "empty response body".to_string(),
        })?;
        let uri = format!("/folders/folders/{}", info.id);
        debug!(path, uri, "content folder exists");
        self.index.insert(path.to_string(), uri.clone());
        Ok(Some(uri))
    }

    /// Create a folder path, creating missing ancestors as needed, and
    /// return its URI. No-op when the path already exists.
    ///
    /// Near-root paths (depth < 3, e.g. `/shared`) are created without a
    /// parent; deeper paths require (and recursively create) their parent.
    pub async fn create(&mut self, path: &str) -> ClientResult<String> {
        if let Some(uri) = self.validate(path).await? {
            debug!(path, uri, "folder not created as it already exists");
            return Ok(uri);
        }

        let elements: Vec<&str> = path.split('/').collect();
        let depth = elements.len();
        let name = elements.last().copied().unwrap_or_default();
        if name.is_empty() {
            return Err(ClientError::InvalidConfig(format!(
                "malformed folder path: {path}"
            )));
        }

        let parent_uri = if depth < 3 {
            "none".to_string()
        } else {
            let parent_path = elements[..depth - 1].join("/");
            Box::pin(self.create(&parent_path)).await?
        };

        info!(path, "creating content folder as it does not exist");
        let body = serde_json::json!({ "name": name, "type": "folder" });
        let created: FolderInfo = self
            .client
            .call(
                Method::POST,
                "/folders/folders",
                &[("parentFolderUri", parent_uri)],
                None,
                Some(body),
            )
            .await?
            .require("/folders/folders")?;
        let uri = format!("/folders/folders/{}", created.id);
        self.index.insert(path.to_string(), uri.clone());
        Ok(uri)
    }

    /// Delete a folder if it exists. Returns `true` when a deletion was
    /// issued.
    pub async fn delete(&mut self, path: &str, recursive: bool) -> ClientResult<bool> {
        let Some(uri) = self.validate(path).await? else {
            warn!(path, "cannot delete content folder as it does not exist");
            return Ok(false);
        };
        info!(path, uri, recursive, "deleting content folder");
        let mut query: Vec<(&str, String)> = Vec::new();
        if recursive {
            query.push(("recursive", "true".to_string()));
        }
        let status = self
            .client
            .call_unit(Method::DELETE, &uri, &query, None, None)
            .await?;
        self.index.remove(path);
        if status.is_success() {
            Ok(true)
        } else {
            Err(ClientError::Api {
                status: status.as_u16(),
                path: uri,
                detail: format!("failed to delete folder {path}"),
            })
        }
    }
}
