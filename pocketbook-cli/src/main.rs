//! Pocketbook CLI - import bank statements into your expense book

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod output;

use commands::{import, logs, setup, summary};

/// Pocketbook - personal finance in your terminal
#[derive(Parser)]
#[command(name = "pb", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import expenses from a CSV bank statement
    Import(import::ImportArgs),

    /// Show totals for the signed-in user
    Summary {
        /// Also list the N most recent expenses
        #[arg(long)]
        recent: Option<usize>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Set the user expenses are imported for
    Setup {
        /// User id (prints the current one when omitted)
        user_id: Option<String>,
    },

    /// View and manage the event log
    Logs {
        #[command(subcommand)]
        command: logs::LogsCommands,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Import(args) => import::run(args).await,
        Commands::Summary { recent, json } => summary::run(recent, json).await,
        Commands::Setup { user_id } => setup::run(user_id),
        Commands::Logs { command } => logs::run(command),
    }
}
