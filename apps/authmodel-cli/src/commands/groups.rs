//! Custom group structure commands.

use std::path::PathBuf;

use clap::{Args, Subcommand};
use tracing::{error, info};

use authmodel_client::directory::{Directory, Principal, PrincipalKind};
use authmodel_client::input::{self, GROUPS_SCHEMA};
use authmodel_client::reconcile::Reconciler;
use authmodel_client::Session;

use crate::commands::{cell, open_session, tolerate};
use crate::config::ConnectionArgs;
use crate::error::CliResult;

#[derive(Args, Debug)]
pub struct GroupsArgs {
    #[command(subcommand)]
    pub command: GroupsCommands,
}

#[derive(Subcommand, Debug)]
pub enum GroupsCommands {
    /// Apply a custom group structure
    Apply(ApplyArgs),

    /// Remove a custom group structure
    Remove(RemoveArgs),

    /// Synchronize a custom group structure (apply and/or remove automatically)
    Sync(SyncArgs),
}

#[derive(Args, Debug)]
pub struct ApplyArgs {
    /// Group-structure CSV file
    pub groups: PathBuf,
}

#[derive(Args, Debug)]
pub struct RemoveArgs {
    /// Group-structure CSV file
    pub groups: PathBuf,

    /// Remove only the members of each group
    #[arg(long, short = 'm')]
    pub members: bool,
}

#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Group-structure CSV file
    pub groups: PathBuf,

    /// Delete groups no longer present in the desired state
    #[arg(long, short = 'g')]
    pub delete_groups: bool,
}

pub async fn execute(args: GroupsArgs, conn: &ConnectionArgs) -> CliResult<()> {
    match args.command {
        GroupsCommands::Apply(a) => {
            info!(groups = %a.groups.display(), "applying a custom group structure");
            let rows = input::read_csv(&a.groups, &GROUPS_SCHEMA)?;
            let mut session = open_session(conn).await?;
            let result = apply(&session, &rows).await;
            session.disconnect().await;
            result
        }
        GroupsCommands::Remove(a) => {
            if a.members {
                info!(groups = %a.groups.display(), "removing members from a custom group structure");
            } else {
                info!(groups = %a.groups.display(), "removing a custom group structure entirely");
            }
            let rows = input::read_csv(&a.groups, &GROUPS_SCHEMA)?;
            let mut session = open_session(conn).await?;
            let result = remove(&session, &rows, a.members).await;
            session.disconnect().await;
            result
        }
        GroupsCommands::Sync(a) => {
            info!(groups = %a.groups.display(), delete_groups = a.delete_groups, "synchronizing a custom group structure");
            let rows = input::read_csv(&a.groups, &GROUPS_SCHEMA)?;
            let mut session = open_session(conn).await?;
            let result = sync(&session, &rows, a.delete_groups).await;
            session.disconnect().await;
            result
        }
    }
}

async fn apply(session: &Session, rows: &[input::Row]) -> CliResult<()> {
    let directory = Directory::new(session.client(), session.settings().response_limit);
    for row in rows {
        let group = cell(row, "GroupID");
        if group.is_empty() {
            error!("the GroupID always needs to be provided");
            continue;
        }
        let name = cell(row, "GroupName");
        let mut principal = Principal::group(group);
        if !name.is_empty() {
            principal.name = name.to_string();
        }
        let parent = cell(row, "ParentGroupID");
        if !parent.is_empty() {
            principal.parents.push(parent.to_string());
        }
        tolerate(directory.create(&principal).await)?;

        let user = cell(row, "UserID");
        if !user.is_empty() {
            info!(group, user, "nesting user");
            tolerate(directory.nest(group, user, PrincipalKind::User).await)?;
        }
    }
    Ok(())
}

async fn remove(session: &Session, rows: &[input::Row], members_only: bool) -> CliResult<()> {
    let directory = Directory::new(session.client(), session.settings().response_limit);
    for row in rows.iter().rev() {
        let group = cell(row, "GroupID");
        if group.is_empty() {
            continue;
        }
        if members_only {
            tolerate(directory.remove_all_members(group).await)?;
        } else {
            tolerate(directory.delete_group(group).await.map(|_| ()))?;
        }
    }
    Ok(())
}

async fn sync(session: &Session, rows: &[input::Row], delete_groups: bool) -> CliResult<()> {
    let directory = Directory::new(session.client(), session.settings().response_limit);
    let summary = Reconciler::new(&directory).sync(rows, delete_groups).await?;
    info!(
        created = summary.created,
        nested = summary.nested,
        removed_members = summary.removed_members,
        deleted = summary.deleted,
        failed = summary.failed,
        "synchronization finished"
    );
    Ok(())
}
