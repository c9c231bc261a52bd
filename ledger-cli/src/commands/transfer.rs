//! Transfer command - move funds between two accounts

use anyhow::Result;

use ledger_core::TransferRequest;

use super::{emit, get_context, parse_amount, parse_id};
use crate::output;

pub fn run(from: &str, to: &str, amount: &str, request_id: &str, json: bool) -> Result<()> {
    let from = parse_id(from, "source account")?;
    let to = parse_id(to, "destination account")?;
    let amount = parse_amount(amount)?;
    let ctx = get_context()?;

    let request = TransferRequest::new(from, to, amount, request_id);
    emit(json, ctx.transfer_service.transfer(&request), |receipt| {
        output::success("Transfer complete");
        println!("  Request ID: {}", receipt.request_id);
        println!("  Receipt:    {}", receipt.receipt);
        Ok(())
    })
}
