//! Storage-library access pattern commands.
//!
//! Joined (library × pattern) rows are grouped per library; each library
//! gets one transactional replace (or remove-all) of its full entry list.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};
use tracing::{error, info};

use authmodel_client::acl::{AccessControl, IdentityType, LibraryAcl};
use authmodel_client::directory::Directory;
use authmodel_client::input::{self, split_permissions, LIBRARIES_SCHEMA, PATTERN_SCHEMA};
use authmodel_client::Session;

use crate::commands::{cell, open_session, tolerate};
use crate::config::ConnectionArgs;
use crate::error::CliResult;

#[derive(Args, Debug)]
pub struct LibraryArgs {
    #[command(subcommand)]
    pub command: LibraryCommands,
}

#[derive(Subcommand, Debug)]
pub enum LibraryCommands {
    /// Apply an access pattern to a list of storage libraries
    Apply(ApplyArgs),

    /// Remove all access controls from a list of storage libraries
    Remove(RemoveArgs),
}

#[derive(Args, Debug)]
pub struct ApplyArgs {
    /// Access-pattern CSV file
    pub pattern: PathBuf,

    /// Library-list CSV file
    pub libraries: PathBuf,

    /// Create missing custom groups
    #[arg(long, short = 'g')]
    pub create_groups: bool,
}

#[derive(Args, Debug)]
pub struct RemoveArgs {
    /// Access-pattern CSV file
    pub pattern: PathBuf,

    /// Library-list CSV file
    pub libraries: PathBuf,

    /// Delete listed custom groups
    #[arg(long, short = 'g')]
    pub delete_groups: bool,
}

pub async fn execute(args: LibraryArgs, conn: &ConnectionArgs) -> CliResult<()> {
    match args.command {
        LibraryCommands::Apply(a) => {
            info!(
                pattern = %a.pattern.display(),
                libraries = %a.libraries.display(),
                create_groups = a.create_groups,
                "applying access pattern to storage libraries"
            );
            let backlog = build_backlog(&a.pattern, &a.libraries)?;
            let mut session = open_session(conn).await?;
            let result = apply(&session, &backlog, a.create_groups).await;
            session.disconnect().await;
            result
        }
        LibraryCommands::Remove(a) => {
            info!(
                pattern = %a.pattern.display(),
                libraries = %a.libraries.display(),
                delete_groups = a.delete_groups,
                "removing access controls from storage libraries"
            );
            let backlog = build_backlog(&a.pattern, &a.libraries)?;
            let mut session = open_session(conn).await?;
            let result = remove(&session, &backlog, a.delete_groups).await;
            session.disconnect().await;
            result
        }
    }
}

/// Per-library access-control declarations, in library order.
fn build_backlog(
    pattern: &Path,
    libraries: &Path,
) -> CliResult<BTreeMap<String, Vec<AccessControl>>> {
    let pattern_rows = input::read_csv(pattern, &PATTERN_SCHEMA)?;
    let library_rows = input::read_csv(libraries, &LIBRARIES_SCHEMA)?;
    let joined = input::inner_join(&library_rows, &pattern_rows, "Pattern");

    let mut backlog: BTreeMap<String, Vec<AccessControl>> = BTreeMap::new();
    for row in &joined {
        if cell(row, "GrantType") != "library" {
            continue;
        }
        backlog
            .entry(cell(row, "Library").to_string())
            .or_default()
            .push(AccessControl::grant(
                cell(row, "Principal"),
                IdentityType::Group,
                split_permissions(cell(row, "Permissions")),
            ));
    }
    Ok(backlog)
}

async fn apply(
    session: &Session,
    backlog: &BTreeMap<String, Vec<AccessControl>>,
    create_groups: bool,
) -> CliResult<()> {
    let directory = Directory::new(session.client(), session.settings().response_limit);
    for (library, controls) in backlog {
        let acl = LibraryAcl::new(session, library);
        if !acl.exists().await? {
            error!(library, "storage library does not exist");
            continue;
        }
        if create_groups {
            for control in controls {
                tolerate(
                    directory
                        .create_group(&control.identity, &control.identity, "")
                        .await,
                )?;
            }
        }
        tolerate(acl.replace(controls).await)?;
    }
    Ok(())
}

async fn remove(
    session: &Session,
    backlog: &BTreeMap<String, Vec<AccessControl>>,
    delete_groups: bool,
) -> CliResult<()> {
    let directory = Directory::new(session.client(), session.settings().response_limit);
    for (library, controls) in backlog {
        let acl = LibraryAcl::new(session, library);
        if !acl.exists().await? {
            error!(library, "storage library does not exist");
            continue;
        }
        if delete_groups {
            for control in controls {
                tolerate(directory.delete_group(&control.identity).await.map(|_| ()))?;
            }
        }
        tolerate(acl.remove_all().await)?;
    }
    Ok(())
}
