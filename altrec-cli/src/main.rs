//! Altrec CLI - product alternatives from the terminal

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{auth, queries, recommend, status};

/// Altrec - ask for and recommend alternatives to products
#[derive(Parser)]
#[command(name = "altrec", version, about, long_about = None)]
struct Cli {
    /// Show debug diagnostics on stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account and sign in
    Register {
        /// Account email (prompted when omitted)
        #[arg(long)]
        email: Option<String>,
        /// Display name (prompted when omitted)
        #[arg(long)]
        name: Option<String>,
        /// Profile photo URL
        #[arg(long)]
        photo: Option<String>,
        /// Password (falls back to ALTREC_PASSWORD, then a prompt)
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Sign in with email and password, or through the identity provider
    Login {
        /// Account email (prompted when omitted)
        #[arg(long)]
        email: Option<String>,
        /// Password (falls back to ALTREC_PASSWORD, then a prompt)
        #[arg(short, long)]
        password: Option<String>,
        /// Use the provider's sign-in flow instead of a password
        #[arg(long, conflicts_with_all = ["email", "password"])]
        provider: bool,
    },

    /// Sign out and forget the stored session
    Logout,

    /// Show who is signed in and where the client points
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Update the display name and photo of the signed-in account
    Profile {
        /// New display name
        #[arg(long)]
        name: Option<String>,
        /// New profile photo URL
        #[arg(long)]
        photo: Option<String>,
    },

    /// Check whether a view is reachable with the current session
    Route {
        /// View path, e.g. /my-queries
        path: String,
    },

    /// Browse and manage queries
    Queries {
        #[command(subcommand)]
        command: queries::QueriesCommands,
    },

    /// Recommend alternatives and review recommendations
    Recommend {
        #[command(subcommand)]
        command: recommend::RecommendCommands,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            output::error(&format!("Failed to start runtime: {}", e));
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Register { email, name, photo, password } => {
            auth::register(email, name, photo, password).await
        }
        Commands::Login { email, password, provider } => auth::login(email, password, provider).await,
        Commands::Logout => auth::logout().await,
        Commands::Status { json } => status::run(json).await,
        Commands::Profile { name, photo } => auth::profile(name, photo).await,
        Commands::Route { path } => status::route(&path).await,
        Commands::Queries { command } => queries::run(command).await,
        Commands::Recommend { command } => recommend::run(command).await,
    }
}
