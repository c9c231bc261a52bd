//! User command - manage account owners

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use comfy_table::Cell;
use dialoguer::Input;
use serde::Serialize;
use uuid::Uuid;

use ledger_core::{Account, NewUser, User};

use super::{emit, get_context, parse_id};
use crate::output;

#[derive(Subcommand)]
pub enum UserCommands {
    /// Create a user (prompts for missing fields)
    New {
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show a user
    Show {
        /// User ID
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Change a user's name or email (omitted fields keep their value)
    Update {
        /// User ID
        id: String,
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete a user without accounts
    Remove {
        /// User ID
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List a user's accounts
    Accounts {
        /// User ID
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Serialize)]
struct Created {
    user_id: Uuid,
}

pub fn run(command: UserCommands) -> Result<()> {
    match command {
        UserCommands::New { first_name, last_name, email, json } => {
            run_new(first_name, last_name, email, json)
        }
        UserCommands::Show { id, json } => run_show(&id, json),
        UserCommands::Update { id, first_name, last_name, email, json } => {
            run_update(&id, first_name, last_name, email, json)
        }
        UserCommands::Remove { id, json } => run_remove(&id, json),
        UserCommands::Accounts { id, json } => run_accounts(&id, json),
    }
}

fn prompt_if_missing(value: Option<String>, prompt: &str) -> Result<String> {
    match value {
        Some(v) => Ok(v),
        None => Ok(Input::new().with_prompt(prompt).interact_text()?),
    }
}

fn run_new(
    first_name: Option<String>,
    last_name: Option<String>,
    email: Option<String>,
    json: bool,
) -> Result<()> {
    let fields = NewUser::new(
        prompt_if_missing(first_name, "First name")?,
        prompt_if_missing(last_name, "Last name")?,
        prompt_if_missing(email, "Email")?,
    );

    let ctx = get_context()?;
    let result = ctx
        .user_service
        .create_user(fields)
        .map(|user_id| Created { user_id });

    emit(json, result, |created| {
        output::success("User created");
        println!("  User ID: {}", created.user_id);
        Ok(())
    })
}

fn print_user(user: &User) {
    println!();
    println!("  {} {}", user.first_name.bold(), user.last_name.bold());
    println!("  {}", user.email);
    println!("  {}", user.id.to_string().dimmed());
    println!();
}

fn run_show(id: &str, json: bool) -> Result<()> {
    let user_id = parse_id(id, "user")?;
    let ctx = get_context()?;

    emit(json, ctx.user_service.get_user(user_id), |user| {
        print_user(user);
        Ok(())
    })
}

fn run_update(
    id: &str,
    first_name: Option<String>,
    last_name: Option<String>,
    email: Option<String>,
    json: bool,
) -> Result<()> {
    let user_id = parse_id(id, "user")?;
    let ctx = get_context()?;

    let result = ctx.user_service.get_user(user_id).and_then(|current| {
        let fields = NewUser::new(
            first_name.unwrap_or(current.first_name),
            last_name.unwrap_or(current.last_name),
            email.unwrap_or(current.email),
        );
        ctx.user_service.update_user(user_id, fields)
    });

    emit(json, result, |user| {
        output::success("User updated");
        print_user(user);
        Ok(())
    })
}

fn run_remove(id: &str, json: bool) -> Result<()> {
    let user_id = parse_id(id, "user")?;
    let ctx = get_context()?;

    emit(json, ctx.user_service.delete_user(user_id), |removed| {
        output::success(&format!("User {} removed", removed));
        Ok(())
    })
}

fn run_accounts(id: &str, json: bool) -> Result<()> {
    let user_id = parse_id(id, "user")?;
    let ctx = get_context()?;

    emit(json, ctx.account_service.get_accounts_for_user(user_id), |accounts| {
        print_accounts(accounts);
        Ok(())
    })
}

fn print_accounts(accounts: &[Account]) {
    if accounts.is_empty() {
        output::hint("No accounts");
        return;
    }

    let mut table = output::create_table();
    table.set_header(vec!["Account ID", "Currency", "Balance", "Opened"]);
    for account in accounts {
        table.add_row(vec![
            Cell::new(account.id),
            Cell::new(&account.currency),
            output::amount_cell(account.balance, &account.currency),
            Cell::new(account.created_at.format("%Y-%m-%d %H:%M")),
        ]);
    }
    println!("{table}");
}
