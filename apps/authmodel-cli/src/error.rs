//! CLI error types and exit codes.

use authmodel_client::ClientError;
use thiserror::Error;

/// Exit codes:
/// - 0: success
/// - 1: general error
/// - 2: authentication failure
/// - 3: network error
/// - 4: validation / input error
/// - 5: server error
pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Auth(_) => 2,
            CliError::Network(_) => 3,
            CliError::Validation(_) | CliError::Config(_) | CliError::Io(_) => 4,
            CliError::Server(_) => 5,
            CliError::Api { status, .. } => {
                if *status >= 500 {
                    5
                } else if *status == 401 || *status == 403 {
                    2
                } else {
                    4
                }
            }
        }
    }
}

impl From<ClientError> for CliError {
    fn from(e: ClientError) -> Self {
        match e {
            ClientError::InvalidConfig(m) => CliError::Config(m),
            ClientError::Auth(m) => CliError::Auth(m),
            ClientError::NotConnected => CliError::Auth("not connected to the platform".to_string()),
            ClientError::Transport(e) => CliError::Network(e.to_string()),
            ClientError::Decode { path, detail } => {
                CliError::Server(format!("undecodable response from {path}: {detail}"))
            }
            ClientError::Api {
                status,
                path,
                detail,
            } => CliError::Api {
                status,
                message: format!("{path}: {detail}"),
            },
            ClientError::InvalidRule(m) => CliError::Validation(m),
            ClientError::Io { path, detail } => CliError::Io(format!("{path}: {detail}")),
            e @ ClientError::SchemaMismatch { .. } => CliError::Validation(e.to_string()),
        }
    }
}
