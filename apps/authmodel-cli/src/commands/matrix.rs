//! Capability-matrix commands: direct (URI, principal, permissions)
//! triples asserted as object-scoped authorization rules.

use std::path::PathBuf;

use clap::{Args, Subcommand};
use tracing::{error, info};

use authmodel_client::directory::Directory;
use authmodel_client::input::{self, split_permissions, MATRIX_SCHEMA};
use authmodel_client::rules::{PrincipalType, Rule, RuleEngine, Scope};
use authmodel_client::Session;

use crate::commands::{cell, open_session, tolerate};
use crate::config::ConnectionArgs;
use crate::error::CliResult;

#[derive(Args, Debug)]
pub struct MatrixArgs {
    #[command(subcommand)]
    pub command: MatrixCommands,
}

#[derive(Subcommand, Debug)]
pub enum MatrixCommands {
    /// Apply a capability matrix
    Apply(ApplyArgs),

    /// Remove a capability matrix
    Remove(RemoveArgs),
}

#[derive(Args, Debug)]
pub struct ApplyArgs {
    /// Capability-matrix CSV file
    pub matrix: PathBuf,

    /// Create missing custom groups
    #[arg(long, short = 'g')]
    pub create_groups: bool,
}

#[derive(Args, Debug)]
pub struct RemoveArgs {
    /// Capability-matrix CSV file
    pub matrix: PathBuf,

    /// Delete listed custom groups
    #[arg(long, short = 'g')]
    pub delete_groups: bool,
}

pub async fn execute(args: MatrixArgs, conn: &ConnectionArgs) -> CliResult<()> {
    match args.command {
        MatrixCommands::Apply(a) => {
            info!(matrix = %a.matrix.display(), create_groups = a.create_groups, "applying a capability matrix");
            let rows = input::read_csv(&a.matrix, &MATRIX_SCHEMA)?;
            let mut session = open_session(conn).await?;
            let result = assert_rows(&session, &rows, a.create_groups, false, true).await;
            session.disconnect().await;
            result
        }
        MatrixCommands::Remove(a) => {
            info!(matrix = %a.matrix.display(), delete_groups = a.delete_groups, "removing a capability matrix");
            let rows = input::read_csv(&a.matrix, &MATRIX_SCHEMA)?;
            let mut session = open_session(conn).await?;
            let result = assert_rows(&session, &rows, false, a.delete_groups, false).await;
            session.disconnect().await;
            result
        }
    }
}

async fn assert_rows(
    session: &Session,
    rows: &[input::Row],
    create_groups: bool,
    delete_groups: bool,
    enabled: bool,
) -> CliResult<()> {
    let limit = session.settings().response_limit;
    let directory = Directory::new(session.client(), limit);
    let engine = RuleEngine::new(session.client(), limit);

    for row in rows {
        let principal = cell(row, "Principal");
        let uri = cell(row, "URI");
        if create_groups {
            tolerate(directory.create_group(principal, principal, "").await)?;
        }
        if delete_groups {
            tolerate(directory.delete_group(principal).await.map(|_| ()))?;
        }
        if uri.is_empty() {
            error!(principal, "capability matrix row has no URI");
            continue;
        }
        let mut rule = Rule::grant(
            principal,
            PrincipalType::Group,
            Scope::Object(uri.to_string()),
            split_permissions(cell(row, "Permissions")),
        );
        rule.enabled = enabled;
        rule.description = if enabled {
            "Automatically enabled by authmodel".to_string()
        } else {
            "Automatically disabled by authmodel".to_string()
        };
        tolerate(engine.assert(&rule).await)?;
    }
    Ok(())
}
