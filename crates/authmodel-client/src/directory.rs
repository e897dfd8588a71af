//! Typed operations on directory principals (users and custom groups).

use reqwest::Method;
use serde::Deserialize;
use tracing::{debug, error, info};

use crate::client::{Collection, PlatformClient};
use crate::error::{ClientError, ClientResult};

/// The fixed super-administrators group. Never deleted or emptied by any
/// code path, regardless of flags.
pub const SUPER_ADMIN_GROUP: &str = "PlatformAdministrators";

/// The well-known wildcard principal. Not a real user; never nested.
pub const WILDCARD_PRINCIPAL: &str = "*";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrincipalKind {
    User,
    Group,
}

impl PrincipalKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Group => "group",
        }
    }

    /// The membership endpoint segment for this kind.
    fn member_segment(self) -> &'static str {
        match self {
            Self::User => "userMembers",
            Self::Group => "groupMembers",
        }
    }
}

impl std::fmt::Display for PrincipalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A desired principal with its declared parent groups.
#[derive(Debug, Clone)]
pub struct Principal {
    pub id: String,
    pub kind: PrincipalKind,
    pub name: String,
    pub description: String,
    pub parents: Vec<String>,
}

impl Principal {
    pub fn group(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            description: String::new(),
            id,
            kind: PrincipalKind::Group,
            parents: Vec::new(),
        }
    }

    pub fn user(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            description: String::new(),
            id,
            kind: PrincipalKind::User,
            parents: Vec::new(),
        }
    }
}

/// A direct member of a group as reported by the directory service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Member {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: PrincipalKind,
}

/// A group as reported by the directory service.
#[derive(Debug, Clone, Deserialize)]
pub struct GroupInfo {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// Directory client bound to a connected platform channel.
pub struct Directory<'a> {
    client: &'a PlatformClient,
    limit: String,
}

impl<'a> Directory<'a> {
    pub fn new(client: &'a PlatformClient, response_limit: u32) -> Self {
        Self {
            client,
            limit: response_limit.to_string(),
        }
    }

    /// Whether a principal exists on the platform.
    ///
    /// Groups are queried by exact-id filter. Users are assumed to exist by
    /// convention and never validated, except the wildcard principal,
    /// which is not a real user.
    pub async fn validate(&self, id: &str, kind: PrincipalKind) -> ClientResult<bool> {
        match kind {
            PrincipalKind::User => Ok(id != WILDCARD_PRINCIPAL),
            PrincipalKind::Group => {
                debug!(id, "validating custom group");
                let response: Collection<GroupInfo> = self
                    .client
                    .call(
                        Method::GET,
                        "/identities/groups",
                        &[
                            ("filter", format!("eq(id,'{id}')")),
                            ("limit", self.limit.clone()),
                        ],
                        None,
                        None,
                    )
                    .await?
                    .require("/identities/groups")?;
                Ok(response.count > 0)
            }
        }
    }

    /// Create a group without nesting. No-op when the group already exists.
    pub async fn create_group(&self, id: &str, name: &str, description: &str) -> ClientResult<()> {
        if self.validate(id, PrincipalKind::Group).await? {
            debug!(id, "custom group already exists");
            return Ok(());
        }
        let name = if name.is_empty() { id } else { name };
        let description = if description.is_empty() {
            "Automatically created by authmodel"
        } else {
            description
        };
        info!(id, name, "creating custom group");
        let body = serde_json::json!({
            "id": id,
            "name": name,
            "description": description,
            "state": "active",
        });
        let status = self
            .client
            .call_unit(
                Method::POST,
                "/identities/groups",
                &[],
                Some("application/vnd.platform.identity.group+json"),
                Some(body),
            )
            .await?;
        if status.is_success() {
            Ok(())
        } else {
            Err(ClientError::Api {
                status: status.as_u16(),
                path: "/identities/groups".to_string(),
                detail: format!("failed to create group {id}"),
            })
        }
    }

    /// Nest a principal under a group.
    pub async fn nest(&self, parent: &str, member_id: &str, kind: PrincipalKind) -> ClientResult<()> {
        info!(parent, member = member_id, %kind, "nesting principal");
        let path = format!(
            "/identities/groups/{parent}/{}/{member_id}",
            kind.member_segment()
        );
        let status = self.client.call_unit(Method::PUT, &path, &[], None, None).await?;
        if status.is_success() {
            Ok(())
        } else {
            Err(ClientError::Api {
                status: status.as_u16(),
                path,
                detail: format!("failed to nest {member_id} under {parent}"),
            })
        }
    }

    /// Create a principal and establish its declared nestings.
    ///
    /// Groups are created first (no-op if present), then nested under each
    /// declared parent. Users are never created, only nested. A missing
    /// parent is an item-scoped error: logged, that nesting skipped.
    pub async fn create(&self, principal: &Principal) -> ClientResult<()> {
        if principal.kind == PrincipalKind::Group {
            self.create_group(&principal.id, &principal.name, &principal.description)
                .await?;
        }
        for parent in &principal.parents {
            if self.validate(parent, PrincipalKind::Group).await? {
                self.nest(parent, &principal.id, principal.kind).await?;
            } else {
                error!(
                    id = %principal.id,
                    parent = %parent,
                    "parent group does not exist, cannot nest principal"
                );
            }
        }
        Ok(())
    }

    /// Delete a group. Returns `false` when the deletion was refused or the
    /// group did not exist.
    ///
    /// The super-administrators group is refused unconditionally.
    pub async fn delete_group(&self, id: &str) -> ClientResult<bool> {
        if id == SUPER_ADMIN_GROUP {
            error!(id, "refusing to delete the super-administrators group");
            return Ok(false);
        }
        if !self.validate(id, PrincipalKind::Group).await? {
            debug!(id, "cannot delete custom group as it does not exist");
            return Ok(false);
        }
        info!(id, "deleting custom group");
        let path = format!("/identities/groups/{id}");
        let status = self.client.call_unit(Method::DELETE, &path, &[], None, None).await?;
        if status.is_success() {
            Ok(true)
        } else {
            Err(ClientError::Api {
                status: status.as_u16(),
                path,
                detail: format!("failed to delete group {id}"),
            })
        }
    }

    /// Direct members of a group. Empty on a zero count.
    pub async fn members(&self, group: &str) -> ClientResult<Vec<Member>> {
        let path = format!("/identities/groups/{group}/members");
        let response: Collection<Member> = self
            .client
            .call(
                Method::GET,
                &path,
                &[
                    ("showDuplicates", "true".to_string()),
                    ("limit", self.limit.clone()),
                ],
                None,
                None,
            )
            .await?
            .require(&path)?;
        if response.count == 0 {
            debug!(group, "custom group does not have any members");
            return Ok(Vec::new());
        }
        Ok(response.items)
    }

    /// Remove one direct membership. Guarded for the super-administrators
    /// group, which is never emptied.
    pub async fn remove_member(&self, group: &str, member: &Member) -> ClientResult<()> {
        if group == SUPER_ADMIN_GROUP {
            error!(group, "refusing to remove members from the super-administrators group");
            return Ok(());
        }
        info!(group, member = %member.id, "deleting group membership");
        let path = format!(
            "/identities/groups/{group}/{}/{}",
            member.kind.member_segment(),
            member.id
        );
        let status = self.client.call_unit(Method::DELETE, &path, &[], None, None).await?;
        if status.is_success() {
            Ok(())
        } else {
            Err(ClientError::Api {
                status: status.as_u16(),
                path,
                detail: format!("failed to remove {} from {group}", member.id),
            })
        }
    }

    /// Remove every direct member of a group.
    pub async fn remove_all_members(&self, group: &str) -> ClientResult<()> {
        if group == SUPER_ADMIN_GROUP {
            error!(group, "refusing to empty the super-administrators group");
            return Ok(());
        }
        if !self.validate(group, PrincipalKind::Group).await? {
            debug!(group, "group does not exist, nothing to remove");
            return Ok(());
        }
        for member in self.members(group).await? {
            self.remove_member(group, &member).await?;
        }
        Ok(())
    }

    /// All locally provisioned custom groups.
    pub async fn list_groups(&self) -> ClientResult<Vec<GroupInfo>> {
        let response: Collection<GroupInfo> = self
            .client
            .call(
                Method::GET,
                "/identities/groups",
                &[
                    ("providerId", "local".to_string()),
                    ("limit", self.limit.clone()),
                ],
                None,
                None,
            )
            .await?
            .require("/identities/groups")?;
        if response.count == 0 {
            debug!("no custom groups exist");
        }
        Ok(response.items)
    }
}
