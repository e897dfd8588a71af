//! authmodel CLI - provision and reconcile platform access-control state.
//!
//! Subcommands operate on declarative CSV descriptions of desired state:
//! - `groups` applies, removes, or synchronizes custom group structures
//! - `access` applies or removes folder access patterns
//! - `library` applies or removes storage-library access patterns
//! - `matrix` applies or removes a capability matrix

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod error;

use error::CliResult;

/// Provision and reconcile platform access-control state
#[derive(Parser)]
#[command(name = "authmodel")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(flatten)]
    connection: config::ConnectionArgs,

    /// Raise log verbosity to debug
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage custom group structures
    Groups(commands::groups::GroupsArgs),

    /// Apply or remove folder access patterns
    Access(commands::access::AccessArgs),

    /// Apply or remove storage-library access patterns
    Library(commands::library::LibraryArgs),

    /// Apply or remove a capability matrix
    Matrix(commands::matrix::MatrixArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(()) => {}
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(e.exit_code());
        }
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> CliResult<()> {
    let Cli {
        connection,
        command,
        verbose: _,
    } = cli;
    match command {
        Commands::Groups(args) => commands::groups::execute(args, &connection).await,
        Commands::Access(args) => commands::access::execute(args, &connection).await,
        Commands::Library(args) => commands::library::execute(args, &connection).await,
        Commands::Matrix(args) => commands::matrix::execute(args, &connection).await,
    }
}
