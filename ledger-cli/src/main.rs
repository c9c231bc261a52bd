//! Ledger CLI - accounts and transfers in your terminal

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod output;

use commands::{account, transfer, user};

/// Ledger - users, accounts and idempotent transfers
#[derive(Parser)]
#[command(name = "ledger", version, about, long_about = None)]
struct Cli {
    /// Log debug output to stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage users
    User {
        #[command(subcommand)]
        command: user::UserCommands,
    },

    /// Manage accounts
    Account {
        #[command(subcommand)]
        command: account::AccountCommands,
    },

    /// Move funds between two accounts of the same currency
    Transfer {
        /// Source account ID
        #[arg(long)]
        from: String,
        /// Destination account ID
        #[arg(long)]
        to: String,
        /// Amount to move
        #[arg(long)]
        amount: String,
        /// Idempotency key; repeating it returns the original receipt
        #[arg(long)]
        request_id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

impl Commands {
    fn wants_json(&self) -> bool {
        match self {
            Commands::User { command } => match command {
                user::UserCommands::New { json, .. }
                | user::UserCommands::Show { json, .. }
                | user::UserCommands::Update { json, .. }
                | user::UserCommands::Remove { json, .. }
                | user::UserCommands::Accounts { json, .. } => *json,
            },
            Commands::Account { command } => match command {
                account::AccountCommands::New { json, .. }
                | account::AccountCommands::Show { json, .. }
                | account::AccountCommands::Deposit { json, .. }
                | account::AccountCommands::History { json, .. }
                | account::AccountCommands::Remove { json, .. } => *json,
            },
            Commands::Transfer { json, .. } => *json,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    commands::init_logging(cli.verbose);

    let json = cli.command.wants_json();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if json {
                match serde_json::to_string_pretty(&commands::failure_envelope(&e)) {
                    Ok(envelope) => println!("{}", envelope),
                    Err(_) => output::error(&format!("{:#}", e)),
                }
            } else {
                output::error(&format!("{:#}", e));
            }
            ExitCode::from(commands::exit_code(&e))
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::User { command } => user::run(command),
        Commands::Account { command } => account::run(command),
        Commands::Transfer { from, to, amount, request_id, json } => {
            transfer::run(&from, &to, &amount, &request_id, json)
        }
    }
}
