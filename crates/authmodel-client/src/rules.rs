//! Idempotent assertion of authorization rules.
//!
//! The platform permits duplicate rules for the same (principal, scope)
//! pair, so asserting a rule always deletes every matching rule first and
//! then creates exactly one when the desired state is enabled. Repeated
//! runs converge on a single rule instead of accumulating duplicates, at
//! the cost of a brief window with no rule in place.

use reqwest::Method;
use serde::Deserialize;
use tracing::{debug, info};

use crate::client::{Collection, PlatformClient};
use crate::error::{ClientError, ClientResult};

/// Principal classification used by the rules service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrincipalType {
    Group,
    User,
    AuthenticatedUsers,
    Everyone,
}

impl PrincipalType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Group => "group",
            Self::User => "user",
            Self::AuthenticatedUsers => "authenticatedUsers",
            Self::Everyone => "everyone",
        }
    }
}

/// The authorization target of a rule. Exactly one of a container URI
/// (inherited), an object URI (single addressable object), or the
/// every-URI flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    Container(String),
    Object(String),
    Every,
}

/// Whether a rule grants or denies its permissions. Only grants are
/// exercised by the shipped patterns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RuleType {
    #[default]
    Grant,
    Deny,
}

impl RuleType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Grant => "grant",
            Self::Deny => "prohibit",
        }
    }
}

/// A single desired permission grant.
#[derive(Debug, Clone)]
pub struct Rule {
    pub principal: String,
    pub principal_type: PrincipalType,
    pub scope: Scope,
    pub permissions: Vec<String>,
    pub rule_type: RuleType,
    /// `true` asserts the rule into existence; `false` asserts its absence.
    pub enabled: bool,
    pub description: String,
}

impl Rule {
    pub fn grant(
        principal: impl Into<String>,
        principal_type: PrincipalType,
        scope: Scope,
        permissions: Vec<String>,
    ) -> Self {
        Self {
            principal: principal.into(),
            principal_type,
            scope,
            permissions,
            rule_type: RuleType::Grant,
            enabled: true,
            description: String::new(),
        }
    }

    /// Build the exact-match filter expression for this rule.
    ///
    /// Group principals are keyed on `principal`, all other principal types
    /// on `principalType`. The every-URI scope is only meaningful for
    /// non-group principal types; a group principal with it is a caller
    /// contract violation.
    pub fn filter(&self) -> ClientResult<String> {
        let filter = match (&self.principal_type, &self.scope) {
            (PrincipalType::Group, Scope::Container(uri)) => {
                format!("and(eq(principal,'{}'),eq(containerUri,'{uri}'))", self.principal)
            }
            (PrincipalType::Group, Scope::Object(uri)) => {
                format!("and(eq(principal,'{}'),eq(objectUri,'{uri}'))", self.principal)
            }
            (PrincipalType::Group, Scope::Every) => {
                return Err(ClientError::InvalidRule(format!(
                    "group principal {} requires a container or object URI",
                    self.principal
                )));
            }
            (other, Scope::Container(uri)) => {
                format!(
                    "and(eq(principalType,'{}'),eq(containerUri,'{uri}'))",
                    other.as_str()
                )
            }
            (other, Scope::Object(uri)) => {
                format!(
                    "and(eq(principalType,'{}'),eq(objectUri,'{uri}'))",
                    other.as_str()
                )
            }
            (other, Scope::Every) => format!("eq(principalType,'{}')", other.as_str()),
        };
        Ok(filter)
    }

    /// The creation request body.
    fn body(&self) -> serde_json::Value {
        let mut body = serde_json::json!({
            "permissions": self.permissions,
            "principal": self.principal,
            "principalType": self.principal_type.as_str(),
            "type": self.rule_type.as_str(),
            "enabled": self.enabled,
            "description": self.description,
        });
        match &self.scope {
            Scope::Container(uri) => body["containerUri"] = uri.clone().into(),
            Scope::Object(uri) => body["objectUri"] = uri.clone().into(),
            Scope::Every => {}
        }
        body
    }
}

#[derive(Debug, Deserialize)]
struct RuleInfo {
    id: String,
}

/// Rule engine bound to a connected platform channel.
pub struct RuleEngine<'a> {
    client: &'a PlatformClient,
    limit: String,
}

impl<'a> RuleEngine<'a> {
    pub fn new(client: &'a PlatformClient, response_limit: u32) -> Self {
        Self {
            client,
            limit: response_limit.to_string(),
        }
    }

    /// Server-assigned ids of every rule matching this rule's filter. The
    /// remote model permits duplicates, so all ids are collected.
    pub async fn existing_ids(&self, rule: &Rule) -> ClientResult<Vec<String>> {
        let filter = rule.filter()?;
        let response: Collection<RuleInfo> = self
            .client
            .call(
                Method::GET,
                "/authorization/rules",
                &[("filter", filter), ("limit", self.limit.clone())],
                None,
                None,
            )
            .await?
            .require("/authorization/rules")?;
        if response.count == 0 {
            debug!(principal = %rule.principal, "authorization rule does not exist");
        }
        Ok(response.items.into_iter().map(|r| r.id).collect())
    }

    /// Make remote state match the rule's desired `enabled` state.
    ///
    /// Deletes every matching rule, then creates exactly one when
    /// `enabled` is true. When `enabled` is false the deletions already
    /// achieved the goal.
    pub async fn assert(&self, rule: &Rule) -> ClientResult<()> {
        debug!(principal = %rule.principal, scope = ?rule.scope, "asserting authorization rule");
        for id in self.existing_ids(rule).await? {
            info!(id, "removing existing authorization rule");
            let path = format!("/authorization/rules/{id}");
            let status = self.client.call_unit(Method::DELETE, &path, &[], None, None).await?;
            if !status.is_success() {
                return Err(ClientError::Api {
                    status: status.as_u16(),
                    path,
                    detail: format!("failed to delete rule {id}"),
                });
            }
        }
        if !rule.enabled {
            return Ok(());
        }
        let status = self
            .client
            .call_unit(
                Method::POST,
                "/authorization/rules",
                &[],
                Some("application/vnd.platform.authorization.rule+json"),
                Some(rule.body()),
            )
            .await?;
        if status.is_success() {
            info!(principal = %rule.principal, "created authorization rule");
            Ok(())
        } else {
            Err(ClientError::Api {
                status: status.as_u16(),
                path: "/authorization/rules".to_string(),
                detail: format!("failed to create rule for {}", rule.principal),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(principal_type: PrincipalType, scope: Scope) -> Rule {
        Rule::grant("Analysts", principal_type, scope, vec!["read".to_string()])
    }

    #[test]
    fn filter_group_container_scope() {
        let r = rule(
            PrincipalType::Group,
            Scope::Container("/folders/folders/f1".to_string()),
        );
        assert_eq!(
            r.filter().unwrap(),
            "and(eq(principal,'Analysts'),eq(containerUri,'/folders/folders/f1'))"
        );
    }

    #[test]
    fn filter_group_object_scope() {
        let r = rule(
            PrincipalType::Group,
            Scope::Object("/folders/folders/f1/**".to_string()),
        );
        assert_eq!(
            r.filter().unwrap(),
            "and(eq(principal,'Analysts'),eq(objectUri,'/folders/folders/f1/**'))"
        );
    }

    #[test]
    fn filter_non_group_keys_on_principal_type() {
        let r = rule(
            PrincipalType::AuthenticatedUsers,
            Scope::Container("/folders/folders/f1".to_string()),
        );
        assert_eq!(
            r.filter().unwrap(),
            "and(eq(principalType,'authenticatedUsers'),eq(containerUri,'/folders/folders/f1'))"
        );
    }

    #[test]
    fn filter_every_scope_for_non_group() {
        let r = rule(PrincipalType::AuthenticatedUsers, Scope::Every);
        assert_eq!(r.filter().unwrap(), "eq(principalType,'authenticatedUsers')");
    }

    #[test]
    fn filter_every_scope_for_group_is_contract_violation() {
        let r = rule(PrincipalType::Group, Scope::Every);
        assert!(matches!(r.filter(), Err(ClientError::InvalidRule(_))));
    }

    #[test]
    fn body_sets_exactly_one_scope_uri() {
        let r = rule(
            PrincipalType::Group,
            Scope::Container("/folders/folders/f1".to_string()),
        );
        let body = r.body();
        assert_eq!(body["containerUri"], "/folders/folders/f1");
        assert!(body.get("objectUri").is_none());

        let r = rule(
            PrincipalType::Group,
            Scope::Object("/objects/o1".to_string()),
        );
        let body = r.body();
        assert_eq!(body["objectUri"], "/objects/o1");
        assert!(body.get("containerUri").is_none());
    }
}
