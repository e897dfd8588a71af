//! Desired-state input files.
//!
//! Tabular inputs are CSV with a fixed header schema. Headers are
//! sanitized (non-alphanumeric characters stripped, which also absorbs a
//! UTF-8 BOM) before comparison, and a mismatch is fatal for the run.
//! Rows come back as flat string maps keyed by the schema column names;
//! the CLI layer turns them into domain values.

use std::collections::HashMap;
use std::path::Path;

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{ClientError, ClientResult};

/// One tabular input row, keyed by schema column name.
pub type Row = HashMap<String, String>;

/// Group-structure file: one row per (group, optional parent, optional
/// user member).
pub const GROUPS_SCHEMA: [&str; 4] = ["ParentGroupID", "GroupID", "GroupName", "UserID"];

/// Access-pattern definition: named patterns, one principal per row.
pub const PATTERN_SCHEMA: [&str; 4] = ["Pattern", "Principal", "GrantType", "Permissions"];

/// Folder list referencing patterns by name.
pub const FOLDERS_SCHEMA: [&str; 2] = ["Directory", "Pattern"];

/// Storage-library list referencing patterns by name.
pub const LIBRARIES_SCHEMA: [&str; 2] = ["Library", "Pattern"];

/// Capability matrix: direct (URI, principal, permissions) triples.
pub const MATRIX_SCHEMA: [&str; 3] = ["URI", "Principal", "Permissions"];

fn sanitize(column: &str) -> String {
    column.chars().filter(char::is_ascii_alphanumeric).collect()
}

fn io_error(path: &Path, detail: impl ToString) -> ClientError {
    ClientError::Io {
        path: path.display().to_string(),
        detail: detail.to_string(),
    }
}

/// Read a CSV file, validating its sanitized header row against the
/// expected schema.
pub fn read_csv(path: &Path, schema: &[&str]) -> ClientResult<Vec<Row>> {
    debug!(path = %path.display(), "reading tabular input file");
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| io_error(path, e))?;

    let found: Vec<String> = reader
        .headers()
        .map_err(|e| io_error(path, e))?
        .iter()
        .map(sanitize)
        .collect();
    let expected: Vec<String> = schema.iter().map(|s| (*s).to_string()).collect();
    if found != expected {
        return Err(ClientError::SchemaMismatch {
            path: path.display().to_string(),
            expected,
            found,
        });
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| io_error(path, e))?;
        let row: Row = schema
            .iter()
            .zip(record.iter())
            .map(|(col, value)| ((*col).to_string(), value.to_string()))
            .collect();
        rows.push(row);
    }
    debug!(path = %path.display(), rows = rows.len(), "read tabular input file");
    Ok(rows)
}

/// Read a JSON file into a typed structure.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> ClientResult<T> {
    debug!(path = %path.display(), "reading structured input file");
    let raw = std::fs::read_to_string(path).map_err(|e| io_error(path, e))?;
    serde_json::from_str(&raw).map_err(|e| ClientError::Decode {
        path: path.display().to_string(),
        detail: e.to_string(),
    })
}

/// Inner-join two row sets on a shared column. Each left row is paired
/// with every right row carrying the same join-key value; unmatched left
/// rows are dropped. The merged row carries the right row's columns on
/// top of the left row's.
#[must_use]
pub fn inner_join(left: &[Row], right: &[Row], key: &str) -> Vec<Row> {
    let mut joined = Vec::new();
    for l in left {
        let Some(value) = l.get(key) else { continue };
        for r in right {
            if r.get(key) == Some(value) {
                let mut merged = l.clone();
                merged.extend(r.iter().map(|(k, v)| (k.clone(), v.clone())));
                joined.push(merged);
            }
        }
    }
    joined
}

/// Split a comma-delimited permissions cell, dropping empty segments.
#[must_use]
pub fn split_permissions(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}
