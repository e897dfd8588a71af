//! Folder access pattern commands.
//!
//! A pattern file names principals and permissions per pattern; a folder
//! file lists content folders and the pattern each one uses. The two are
//! inner-joined on the pattern name and every joined row becomes one
//! authorization-rule assertion.

use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};
use tracing::{error, info};

use authmodel_client::directory::Directory;
use authmodel_client::folders::Folders;
use authmodel_client::input::{self, split_permissions, FOLDERS_SCHEMA, PATTERN_SCHEMA};
use authmodel_client::rules::{PrincipalType, Rule, RuleEngine, Scope};
use authmodel_client::Session;

use crate::commands::{cell, open_session, tolerate, tolerate_value};
use crate::config::ConnectionArgs;
use crate::error::CliResult;

#[derive(Args, Debug)]
pub struct AccessArgs {
    #[command(subcommand)]
    pub command: AccessCommands,
}

#[derive(Subcommand, Debug)]
pub enum AccessCommands {
    /// Apply an access pattern to a list of content folders
    Apply(ApplyArgs),

    /// Remove an access pattern from a list of content folders
    Remove(RemoveArgs),
}

#[derive(Args, Debug)]
pub struct ApplyArgs {
    /// Access-pattern CSV file
    pub pattern: PathBuf,

    /// Folder-list CSV file
    pub folders: PathBuf,

    /// Create missing custom groups
    #[arg(long, short = 'g')]
    pub create_groups: bool,

    /// Create missing content folders
    #[arg(long, short = 'f')]
    pub create_folders: bool,
}

#[derive(Args, Debug)]
pub struct RemoveArgs {
    /// Access-pattern CSV file
    pub pattern: PathBuf,

    /// Folder-list CSV file
    pub folders: PathBuf,

    /// Delete listed custom groups
    #[arg(long, short = 'g')]
    pub delete_groups: bool,

    /// Delete listed content folders if empty
    #[arg(long, short = 'f')]
    pub delete_folders: bool,
}

pub async fn execute(args: AccessArgs, conn: &ConnectionArgs) -> CliResult<()> {
    match args.command {
        AccessCommands::Apply(a) => {
            info!(
                pattern = %a.pattern.display(),
                folders = %a.folders.display(),
                create_groups = a.create_groups,
                create_folders = a.create_folders,
                "applying access pattern to content folders"
            );
            let joined = join_inputs(&a.pattern, &a.folders)?;
            let mut session = open_session(conn).await?;
            let result = apply(&session, &joined, a.create_groups, a.create_folders).await;
            session.disconnect().await;
            result
        }
        AccessCommands::Remove(a) => {
            info!(
                pattern = %a.pattern.display(),
                folders = %a.folders.display(),
                delete_groups = a.delete_groups,
                delete_folders = a.delete_folders,
                "removing access pattern from content folders"
            );
            let joined = join_inputs(&a.pattern, &a.folders)?;
            let mut session = open_session(conn).await?;
            let result = remove(&session, &joined, a.delete_groups, a.delete_folders).await;
            session.disconnect().await;
            result
        }
    }
}

fn join_inputs(pattern: &Path, folders: &Path) -> CliResult<Vec<input::Row>> {
    let pattern_rows = input::read_csv(pattern, &PATTERN_SCHEMA)?;
    let folder_rows = input::read_csv(folders, &FOLDERS_SCHEMA)?;
    Ok(input::inner_join(&folder_rows, &pattern_rows, "Pattern"))
}

/// Map a joined row's grant type and folder URI to a rule scope. Unknown
/// grant types are item-scoped errors.
fn scope_for(row: &input::Row, uri: String) -> Option<Scope> {
    match cell(row, "GrantType") {
        "object" => Some(Scope::Object(format!("{uri}/**"))),
        "conveyed" => Some(Scope::Container(uri)),
        other => {
            error!(grant_type = other, "unknown grant type for a folder pattern");
            None
        }
    }
}

async fn apply(
    session: &Session,
    joined: &[input::Row],
    create_groups: bool,
    create_folders: bool,
) -> CliResult<()> {
    let limit = session.settings().response_limit;
    let directory = Directory::new(session.client(), limit);
    let engine = RuleEngine::new(session.client(), limit);
    let mut folders = Folders::new(session.client(), limit);

    for row in joined {
        let principal = cell(row, "Principal");
        let directory_path = cell(row, "Directory");
        if create_groups {
            tolerate(directory.create_group(principal, principal, "").await)?;
        }

        let uri = if create_folders {
            tolerate_value(folders.create(directory_path).await)?
        } else {
            folders.validate(directory_path).await?
        };
        let Some(uri) = uri else {
            error!(path = directory_path, "folder does not exist and should not be created");
            continue;
        };
        let Some(scope) = scope_for(row, uri) else {
            continue;
        };

        let mut rule = Rule::grant(
            principal,
            PrincipalType::Group,
            scope,
            split_permissions(cell(row, "Permissions")),
        );
        rule.description = "Automatically enabled by authmodel".to_string();
        tolerate(engine.assert(&rule).await)?;
    }
    Ok(())
}

async fn remove(
    session: &Session,
    joined: &[input::Row],
    delete_groups: bool,
    delete_folders: bool,
) -> CliResult<()> {
    let limit = session.settings().response_limit;
    let directory = Directory::new(session.client(), limit);
    let engine = RuleEngine::new(session.client(), limit);
    let mut folders = Folders::new(session.client(), limit);

    for row in joined.iter().rev() {
        let principal = cell(row, "Principal");
        let directory_path = cell(row, "Directory");
        if delete_groups {
            tolerate(directory.delete_group(principal).await.map(|_| ()))?;
        }

        let Some(uri) = folders.validate(directory_path).await? else {
            error!(path = directory_path, "folder does not exist");
            continue;
        };
        if delete_folders {
            tolerate(folders.delete(directory_path, false).await.map(|_| ()))?;
        }
        let Some(scope) = scope_for(row, uri) else {
            continue;
        };

        let mut rule = Rule::grant(
            principal,
            PrincipalType::Group,
            scope,
            split_permissions(cell(row, "Permissions")),
        );
        rule.enabled = false;
        rule.description = "Automatically disabled by authmodel".to_string();
        tolerate(engine.assert(&rule).await)?;
    }
    Ok(())
}
