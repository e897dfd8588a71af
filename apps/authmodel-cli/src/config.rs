//! Settings and credential resolution.
//!
//! Precedence: command-line flags (and their `AUTHMODEL_*` environment
//! variables, via clap) over the optional profile file
//! `~/.authmodel/config.json`, over built-in defaults.

use std::path::PathBuf;

use clap::Args;
use serde::Deserialize;
use tracing::debug;

use authmodel_client::auth::Credentials;
use authmodel_client::Settings;

use crate::error::{CliError, CliResult};

const DEFAULT_CLIENT_ID: &str = "authmodel";

/// Connection options shared by every subcommand.
#[derive(Args, Debug)]
pub struct ConnectionArgs {
    /// Base URL of the platform, e.g. https://platform.example.com
    #[arg(long, env = "AUTHMODEL_BASE_URL", global = true)]
    pub base_url: Option<String>,

    /// Pre-acquired bearer token (skips the password grant)
    #[arg(long, env = "AUTHMODEL_TOKEN", global = true, hide_env_values = true)]
    pub token: Option<String>,

    /// User for the password grant
    #[arg(long, env = "AUTHMODEL_USER", global = true)]
    pub user: Option<String>,

    /// Password for the password grant
    #[arg(long, env = "AUTHMODEL_PASSWORD", global = true, hide_env_values = true)]
    pub password: Option<String>,

    /// OAuth client id for the password grant
    #[arg(long, env = "AUTHMODEL_CLIENT_ID", global = true)]
    pub client_id: Option<String>,

    /// OAuth client secret for the password grant
    #[arg(
        long,
        env = "AUTHMODEL_CLIENT_SECRET",
        global = true,
        hide_env_values = true
    )]
    pub client_secret: Option<String>,

    /// Storage server instance used for library access controls
    #[arg(long, env = "AUTHMODEL_STORAGE_SERVER", global = true)]
    pub storage_server: Option<String>,

    /// Page-size limit for collection requests
    #[arg(long, env = "AUTHMODEL_RESPONSE_LIMIT", global = true)]
    pub response_limit: Option<u32>,

    /// Skip TLS certificate validation
    #[arg(long, env = "AUTHMODEL_INSECURE", global = true)]
    pub insecure: bool,
}

/// Optional profile file, camelCase keys.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct Profile {
    base_url: Option<String>,
    access_token: Option<String>,
    user: Option<String>,
    password: Option<String>,
    client_id: Option<String>,
    client_secret: Option<String>,
    storage_server: Option<String>,
    response_limit: Option<u32>,
    validate_tls: Option<bool>,
    timeout_secs: Option<u64>,
}

fn profile_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".authmodel").join("config.json"))
}

fn load_profile() -> CliResult<Profile> {
    let Some(path) = profile_path() else {
        return Ok(Profile::default());
    };
    if !path.exists() {
        return Ok(Profile::default());
    }
    debug!(path = %path.display(), "loading profile");
    let raw = std::fs::read_to_string(&path)
        .map_err(|e| CliError::Io(format!("{}: {e}", path.display())))?;
    serde_json::from_str(&raw)
        .map_err(|e| CliError::Config(format!("malformed profile {}: {e}", path.display())))
}

/// Resolve the final settings and credentials for this run.
pub fn resolve(args: &ConnectionArgs) -> CliResult<(Settings, Credentials)> {
    let profile = load_profile()?;
    resolve_with(args, profile)
}

fn resolve_with(args: &ConnectionArgs, profile: Profile) -> CliResult<(Settings, Credentials)> {
    let base_url = args
        .base_url
        .clone()
        .or(profile.base_url)
        .ok_or_else(|| CliError::Config("base URL must be provided".to_string()))?;

    let mut settings = Settings::new(base_url);
    if let Some(server) = args.storage_server.clone().or(profile.storage_server) {
        settings.storage_server = server;
    }
    if let Some(limit) = args.response_limit.or(profile.response_limit) {
        settings.response_limit = limit;
    }
    if let Some(timeout) = profile.timeout_secs {
        settings.timeout_secs = timeout;
    }
    settings.tls_verify = if args.insecure {
        false
    } else {
        profile.validate_tls.unwrap_or(true)
    };

    let credentials = if let Some(token) = args.token.clone().or(profile.access_token) {
        Credentials::Token(token)
    } else {
        let user = args
            .user
            .clone()
            .or(profile.user)
            .ok_or_else(|| CliError::Config("no token and no user/password provided".to_string()))?;
        let password = args
            .password
            .clone()
            .or(profile.password)
            .ok_or_else(|| CliError::Config("password must be provided".to_string()))?;
        Credentials::Password {
            user,
            password,
            client_id: args
                .client_id
                .clone()
                .or(profile.client_id)
                .unwrap_or_else(|| DEFAULT_CLIENT_ID.to_string()),
            client_secret: args
                .client_secret
                .clone()
                .or(profile.client_secret)
                .unwrap_or_default(),
        }
    };

    Ok((settings, credentials))
}
