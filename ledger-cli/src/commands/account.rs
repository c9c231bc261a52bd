//! Account command - open, fund, inspect and close accounts

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use comfy_table::Cell;
use dialoguer::Confirm;
use serde::Serialize;
use uuid::Uuid;

use ledger_core::{Error, Transfer};

use super::{emit, get_context, parse_amount, parse_id};
use crate::output;

#[derive(Subcommand)]
pub enum AccountCommands {
    /// Open an account for a user
    New {
        /// Owner's user ID
        #[arg(long)]
        user: String,
        /// Three-letter currency code
        #[arg(long, default_value = "USD")]
        currency: String,
        /// Opening balance
        #[arg(long, default_value = "0")]
        balance: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show an account's currency and balance
    Show {
        /// Account ID
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Add funds to an account
    Deposit {
        /// Account ID
        id: String,
        /// Amount to add
        amount: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List transfers in and out of an account
    History {
        /// Account ID
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete an account
    Remove {
        /// Account ID
        id: String,
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
        /// Output as JSON (requires --force)
        #[arg(long)]
        json: bool,
    },
}

#[derive(Serialize)]
struct Created {
    account_id: Uuid,
}

pub fn run(command: AccountCommands) -> Result<()> {
    match command {
        AccountCommands::New { user, currency, balance, json } => {
            run_new(&user, &currency, &balance, json)
        }
        AccountCommands::Show { id, json } => run_show(&id, json),
        AccountCommands::Deposit { id, amount, json } => run_deposit(&id, &amount, json),
        AccountCommands::History { id, json } => run_history(&id, json),
        AccountCommands::Remove { id, force, json } => run_remove(&id, force, json),
    }
}

fn run_new(user: &str, currency: &str, balance: &str, json: bool) -> Result<()> {
    let user_id = parse_id(user, "user")?;
    let balance = parse_amount(balance)?;
    let ctx = get_context()?;

    let result = ctx
        .account_service
        .create_account(user_id, currency, balance)
        .map(|account_id| Created { account_id });

    emit(json, result, |created| {
        output::success("Account created");
        println!("  Account ID: {}", created.account_id);
        Ok(())
    })
}

fn run_show(id: &str, json: bool) -> Result<()> {
    let account_id = parse_id(id, "account")?;
    let ctx = get_context()?;

    emit(json, ctx.account_service.get_account(account_id), |account| {
        println!(
            "\n  {}  {}\n",
            output::format_amount(account.balance).bold(),
            account.currency
        );
        Ok(())
    })
}

fn run_deposit(id: &str, amount: &str, json: bool) -> Result<()> {
    let account_id = parse_id(id, "account")?;
    let amount = parse_amount(amount)?;
    let ctx = get_context()?;

    emit(json, ctx.account_service.deposit(account_id, amount), |account| {
        output::success(&format!(
            "Deposited. New balance: {} {}",
            output::format_amount(account.balance),
            account.currency
        ));
        Ok(())
    })
}

fn run_history(id: &str, json: bool) -> Result<()> {
    let account_id = parse_id(id, "account")?;
    let ctx = get_context()?;

    let result = ctx.account_service.find(account_id).and_then(|account| {
        let transfers = ctx.account_service.get_transfers(account_id)?;
        Ok((account.currency, transfers))
    });

    let (currency, transfers) = result?;
    emit(json, Ok(transfers), |transfers| {
        print_history(account_id, &currency, transfers);
        Ok(())
    })
}

fn print_history(account_id: Uuid, currency: &str, transfers: &[Transfer]) {
    if transfers.is_empty() {
        output::hint("No transfers");
        return;
    }

    let mut table = output::create_table();
    table.set_header(vec!["When", "Direction", "Counterparty", "Amount", "Request ID"]);
    for transfer in transfers {
        let (direction, counterparty) = if transfer.from_account_id == account_id {
            ("out".red(), transfer.to_account_id)
        } else {
            ("in".green(), transfer.from_account_id)
        };
        table.add_row(vec![
            Cell::new(transfer.created_at.format("%Y-%m-%d %H:%M:%S")),
            Cell::new(direction),
            Cell::new(counterparty),
            output::amount_cell(transfer.amount, currency),
            Cell::new(&transfer.request_id),
        ]);
    }
    println!("{table}");
}

fn run_remove(id: &str, force: bool, json: bool) -> Result<()> {
    let account_id = parse_id(id, "account")?;
    if json && !force {
        return Err(Error::invalid("--json cannot prompt; pass --force to remove").into());
    }

    let ctx = get_context()?;

    // Confirm removal unless --force
    if !force {
        let account = ctx.account_service.find(account_id)?;
        println!(
            "\n{}",
            format!(
                "This will delete account {} holding {} {}.",
                account.id,
                output::format_amount(account.balance),
                account.currency
            )
            .yellow()
        );
        output::hint("Transfer records that mention it are kept.\n");

        if !Confirm::new()
            .with_prompt("Are you sure?")
            .default(false)
            .interact()?
        {
            output::hint("Cancelled\n");
            return Ok(());
        }
    }

    emit(json, ctx.account_service.delete_account(account_id), |removed| {
        output::success(&format!("Account {} removed", removed));
        Ok(())
    })
}
