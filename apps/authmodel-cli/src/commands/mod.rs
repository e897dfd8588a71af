//! Subcommand implementations.

pub mod access;
pub mod groups;
pub mod library;
pub mod matrix;

use tracing::error;

use authmodel_client::input::Row;
use authmodel_client::{ClientResult, Session};

use crate::config::{self, ConnectionArgs};
use crate::error::CliResult;

/// Resolve configuration and open a connected session.
pub(crate) async fn open_session(args: &ConnectionArgs) -> CliResult<Session> {
    let (settings, credentials) = config::resolve(args)?;
    Ok(Session::connect(settings, credentials).await?)
}

/// Apply the item-scoped failure policy: log and skip business-rule
/// errors, abort on everything else.
pub(crate) fn tolerate(result: ClientResult<()>) -> CliResult<()> {
    match result {
        Ok(()) => Ok(()),
        Err(e) if e.is_item_scoped() => {
            error!(error = %e, "skipping item");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// Like [`tolerate`] but carrying a value; a skipped item yields `None`.
pub(crate) fn tolerate_value<T>(result: ClientResult<T>) -> CliResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_item_scoped() => {
            error!(error = %e, "skipping item");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

/// Fetch a cell from a tabular input row.
pub(crate) fn cell<'a>(row: &'a Row, column: &str) -> &'a str {
    row.get(column).map(String::as_str).unwrap_or_default()
}
