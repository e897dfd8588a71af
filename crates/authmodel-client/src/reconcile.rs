//! Group-hierarchy reconciliation: diff a desired-state graph against the
//! live directory and converge membership edges.
//!
//! Both graphs key groups by id; edges are parent→member. The plan is
//! computed fully before any mutation and is deterministic: creations
//! first (sorted by id), then missing nestings, then superfluous
//! membership removals, then group deletions. Reconciliation is not
//! transactional across the graph; an item-scoped failure leaves that
//! edge unconverged and the rest applied.

use std::collections::BTreeMap;

use tracing::{debug, error, info};

use crate::directory::{Directory, Member, PrincipalKind, SUPER_ADMIN_GROUP};
use crate::error::ClientResult;
use crate::input::Row;

/// One group and its direct members, keyed by member id.
#[derive(Debug, Clone, Default)]
pub struct GroupNode {
    pub name: String,
    pub members: BTreeMap<String, PrincipalKind>,
}

/// A set of groups with their membership edges, keyed by group id.
///
/// Target and current graphs never share nodes; membership comparison
/// across graphs is by id only.
#[derive(Debug, Clone, Default)]
pub struct GroupGraph {
    pub groups: BTreeMap<String, GroupNode>,
}

impl GroupGraph {
    /// Build the desired-state graph from group-structure rows.
    ///
    /// A row with an empty `GroupID` is an item-scoped error: logged and
    /// skipped. A parent referenced before (or without) its own row gets
    /// an implicit node named after its id.
    #[must_use]
    pub fn from_rows(rows: &[Row]) -> Self {
        let mut graph = Self::default();
        for row in rows {
            let group = row.get("GroupID").map(String::as_str).unwrap_or_default();
            if group.is_empty() {
                error!("the GroupID always needs to be provided");
                continue;
            }
            let name = row.get("GroupName").map(String::as_str).unwrap_or_default();
            let node = graph.groups.entry(group.to_string()).or_default();
            if !name.is_empty() {
                node.name = name.to_string();
            }

            let parent = row
                .get("ParentGroupID")
                .map(String::as_str)
                .unwrap_or_default();
            if !parent.is_empty() {
                graph
                    .groups
                    .entry(parent.to_string())
                    .or_default()
                    .members
                    .insert(group.to_string(), PrincipalKind::Group);
            }

            let user = row.get("UserID").map(String::as_str).unwrap_or_default();
            if !user.is_empty() {
                graph
                    .groups
                    .entry(group.to_string())
                    .or_default()
                    .members
                    .insert(user.to_string(), PrincipalKind::User);
            }
        }
        graph
    }

    /// Read the current-state graph live: enumerate all custom groups,
    /// then fetch and classify each group's direct members.
    pub async fn from_remote(directory: &Directory<'_>) -> ClientResult<Self> {
        let mut graph = Self::default();
        for group in directory.list_groups().await? {
            let members = directory.members(&group.id).await?;
            let node = graph.groups.entry(group.id).or_default();
            node.name = group.name;
            for member in &members {
                node.members.insert(member.id.clone(), member.kind);
            }
            // A sub-group seen only as a member edge still counts as
            // present, so it is not re-created.
            for member in members {
                if member.kind == PrincipalKind::Group {
                    graph.groups.entry(member.id).or_default();
                }
            }
        }
        debug!(groups = graph.groups.len(), "read current group state");
        Ok(graph)
    }

    fn has_member(&self, group: &str, member: &str) -> bool {
        self.groups
            .get(group)
            .is_some_and(|node| node.members.contains_key(member))
    }
}

/// One step of a reconciliation plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOp {
    CreateGroup { id: String, name: String },
    Nest { parent: String, member: Member },
    RemoveMember { group: String, member: Member },
    DeleteGroup { id: String },
}

/// Compute the operations that converge `current` onto `target`.
///
/// Groups absent from the target are deleted only when `delete_groups`
/// is set; the super-administrators group is never deleted or emptied.
#[must_use]
pub fn plan(target: &GroupGraph, current: &GroupGraph, delete_groups: bool) -> Vec<ReconcileOp> {
    let mut ops = Vec::new();

    for (id, node) in &target.groups {
        if !current.groups.contains_key(id) {
            ops.push(ReconcileOp::CreateGroup {
                id: id.clone(),
                name: if node.name.is_empty() {
                    id.clone()
                } else {
                    node.name.clone()
                },
            });
        }
    }

    for (id, node) in &target.groups {
        for (member, kind) in &node.members {
            if !current.has_member(id, member) {
                ops.push(ReconcileOp::Nest {
                    parent: id.clone(),
                    member: Member {
                        id: member.clone(),
                        kind: *kind,
                    },
                });
            }
        }
    }

    for (id, node) in &current.groups {
        if id == SUPER_ADMIN_GROUP {
            continue;
        }
        if !target.groups.contains_key(id) {
            continue;
        }
        for (member, kind) in &node.members {
            if !target.has_member(id, member) {
                ops.push(ReconcileOp::RemoveMember {
                    group: id.clone(),
                    member: Member {
                        id: member.clone(),
                        kind: *kind,
                    },
                });
            }
        }
    }

    if delete_groups {
        for id in current.groups.keys() {
            if id != SUPER_ADMIN_GROUP && !target.groups.contains_key(id) {
                ops.push(ReconcileOp::DeleteGroup { id: id.clone() });
            }
        }
    }

    ops
}

/// Outcome counts of one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub created: usize,
    pub nested: usize,
    pub removed_members: usize,
    pub deleted: usize,
    pub failed: usize,
}

/// Applies reconciliation plans through the directory client.
pub struct Reconciler<'a> {
    directory: &'a Directory<'a>,
}

impl<'a> Reconciler<'a> {
    pub fn new(directory: &'a Directory<'a>) -> Self {
        Self { directory }
    }

    /// One full reconciliation pass: build both graphs, plan, apply.
    ///
    /// Item-scoped failures are logged and counted; anything else aborts
    /// the pass immediately.
    pub async fn sync(&self, rows: &[Row], delete_groups: bool) -> ClientResult<ReconcileSummary> {
        let target = GroupGraph::from_rows(rows);
        let current = GroupGraph::from_remote(self.directory).await?;

        if !delete_groups {
            for id in current.groups.keys() {
                if !target.groups.contains_key(id) {
                    info!(group = %id, "the group no longer exists in the desired target state");
                }
            }
        }

        let plan = plan(&target, &current, delete_groups);
        info!(operations = plan.len(), "applying reconciliation plan");

        let mut summary = ReconcileSummary::default();
        for op in plan {
            let result = self.apply(&op, &mut summary).await;
            if let Err(e) = result {
                if e.is_item_scoped() {
                    error!(operation = ?op, error = %e, "reconciliation step failed");
                    summary.failed += 1;
                } else {
                    return Err(e);
                }
            }
        }
        Ok(summary)
    }

    async fn apply(&self, op: &ReconcileOp, summary: &mut ReconcileSummary) -> ClientResult<()> {
        match op {
            ReconcileOp::CreateGroup { id, name } => {
                self.directory.create_group(id, name, "").await?;
                summary.created += 1;
            }
            ReconcileOp::Nest { parent, member } => {
                self.directory.nest(parent, &member.id, member.kind).await?;
                summary.nested += 1;
            }
            ReconcileOp::RemoveMember { group, member } => {
                self.directory.remove_member(group, member).await?;
                summary.removed_members += 1;
            }
            ReconcileOp::DeleteGroup { id } => {
                if self.directory.delete_group(id).await? {
                    summary.deleted += 1;
                }
            }
        }
        Ok(())
    }
}
