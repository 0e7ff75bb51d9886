//! Tessera CLI - credits for mosaic exports

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{admin, auth, billing, credits, doctor};

/// Tessera - credit accounting for mosaic exports
#[derive(Parser)]
#[command(name = "tessera", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account and log in
    Signup {
        #[arg(long)]
        email: String,
        /// Password (or TESSERA_PASSWORD, or prompt)
        #[arg(long)]
        password: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Log in and save the session token
    Login {
        #[arg(long)]
        email: String,
        /// Password (or TESSERA_PASSWORD, or prompt)
        #[arg(long)]
        password: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Revoke the saved session
    Logout,

    /// Show the logged-in account
    Whoami {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show balance, recent activity and prices
    Credits {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show ledger history
    History {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 20)]
        limit: u32,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Spend credits on a billable action
    Use {
        /// Action type, e.g. download_png (defaults to the configured action)
        action: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List credit packages and subscription plans
    Packages {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Buy a credit package
    Buy {
        /// Package id
        package_id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Subscribe to a plan
    Subscribe {
        /// Plan name, e.g. monthly
        plan: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Administrative operations
    Admin {
        #[command(subcommand)]
        command: admin::AdminCommands,
    },

    /// Run ledger health checks
    Doctor {
        /// Show verbose output
        #[arg(long, short)]
        verbose: bool,
        /// Delete expired sessions before checking
        #[arg(long)]
        purge_sessions: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_env("TESSERA_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Signup { email, password, json } => auth::signup(&email, password, json),
        Commands::Login { email, password, json } => auth::login(&email, password, json),
        Commands::Logout => auth::logout(),
        Commands::Whoami { json } => auth::whoami(json),
        Commands::Credits { json } => credits::overview(json),
        Commands::History { page, limit, json } => credits::history(page, limit, json),
        Commands::Use { action, json } => credits::track(action, json),
        Commands::Packages { json } => billing::packages(json),
        Commands::Buy { package_id, json } => billing::buy(package_id, json),
        Commands::Subscribe { plan, json } => billing::subscribe(&plan, json),
        Commands::Admin { command } => admin::run(command),
        Commands::Doctor { verbose, purge_sessions, json } => doctor::run(verbose, purge_sessions, json),
    }
}
