//! Transfer service - validated, idempotent, atomic movement of funds

use std::sync::Arc;

use rust_decimal::Decimal;

use crate::config::RetryPolicy;
use crate::domain::money::{self, credit};
use crate::domain::result::{Error, Result};
use crate::domain::{validate_request_id, Transfer, TransferReceipt, TransferRequest};
use crate::ports::LedgerStore;

use super::retry::run_with_retry;

/// Outcome of one attempt at the unit of work
enum Applied {
    New(Transfer),
    Replayed(Transfer),
}

/// Transfer engine
///
/// Checks run in a fixed order and the first failure wins:
/// 1. source and destination differ
/// 2. amount is positive and the request id is well-formed
/// 3. a transfer with this request id already exists -> its receipt is returned
/// 4. both accounts exist
/// 5. the source covers the amount
/// 6. both accounts use the same currency
///
/// Steps 3-6 and the writes run inside one unit of work. A write conflict or
/// a request-id collision with a concurrent caller re-runs that unit of work,
/// so the loser of an idempotency race returns the winner's receipt.
pub struct TransferService<S: LedgerStore> {
    store: Arc<S>,
    retry: RetryPolicy,
}

impl<S: LedgerStore> TransferService<S> {
    pub fn new(store: Arc<S>, retry: RetryPolicy) -> Self {
        Self { store, retry }
    }

    /// Move `request.amount` from one account to another, at most once per request id
    pub fn transfer(&self, request: &TransferRequest) -> Result<TransferReceipt> {
        if request.from_account_id == request.to_account_id {
            return Err(Error::invalid("source and destination must differ"));
        }
        let amount = money::validate_amount(request.amount)?;
        validate_request_id(&request.request_id)?;

        let applied = run_with_retry(&self.retry, "transfer", || self.apply(request, amount))?;

        match applied {
            Applied::New(transfer) => {
                tracing::info!(
                    request_id = %transfer.request_id,
                    from = %transfer.from_account_id,
                    to = %transfer.to_account_id,
                    "Transfer applied"
                );
                Ok(transfer.receipt())
            }
            Applied::Replayed(transfer) => {
                tracing::debug!(
                    request_id = %transfer.request_id,
                    "Request id already applied, returning original receipt"
                );
                Ok(transfer.receipt())
            }
        }
    }

    fn apply(&self, request: &TransferRequest, amount: Decimal) -> Result<Applied> {
        self.store.run_atomic(|tx| {
            if let Some(existing) = tx.get_transfer_by_request_id(&request.request_id)? {
                return Ok(Applied::Replayed(existing));
            }

            let from = tx.get_account(request.from_account_id)?.ok_or_else(|| {
                Error::not_found(format!("account {}", request.from_account_id))
            })?;
            let to = tx.get_account(request.to_account_id)?.ok_or_else(|| {
                Error::not_found(format!("account {}", request.to_account_id))
            })?;

            if from.balance < amount {
                return Err(Error::invalid("insufficient funds"));
            }
            if from.currency != to.currency {
                return Err(Error::invalid(format!(
                    "currency mismatch: {} vs {}",
                    from.currency, to.currency
                )));
            }
            let to_balance = credit(to.balance, amount)?;
            let from_balance = money::to_ledger_scale(from.balance - amount);

            let transfer = Transfer::from_request(request, amount);
            tx.update_balance(from.id, from.balance, from_balance)?;
            tx.update_balance(to.id, to.balance, to_balance)?;
            tx.insert_transfer(&transfer)?;

            Ok(Applied::New(transfer))
        })
    }
}
