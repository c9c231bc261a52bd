//! Transfer domain model

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::result::{Error, Result};

/// Longest request id the store accepts
pub const MAX_REQUEST_ID_LEN: usize = 40;

/// A completed movement of funds between two accounts
///
/// Transfers are written once, in the same unit of work as the two balance
/// updates, and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transfer {
    pub id: Uuid,
    pub from_account_id: Uuid,
    pub to_account_id: Uuid,
    pub amount: Decimal,
    /// Client-supplied idempotency key, unique across all transfers
    pub request_id: String,
    /// Opaque token proving completion
    pub receipt: String,
    pub created_at: DateTime<Utc>,
}

/// A caller's request to move `amount` from one account to another
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub from_account_id: Uuid,
    pub to_account_id: Uuid,
    pub amount: Decimal,
    pub request_id: String,
}

/// What a successful (or replayed) transfer returns
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransferReceipt {
    pub request_id: String,
    pub receipt: String,
}

impl Transfer {
    /// Build the record for a validated request, generating a new receipt
    pub fn from_request(request: &TransferRequest, amount: Decimal) -> Self {
        Self {
            id: Uuid::new_v4(),
            from_account_id: request.from_account_id,
            to_account_id: request.to_account_id,
            amount,
            request_id: request.request_id.clone(),
            receipt: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
        }
    }

    pub fn receipt(&self) -> TransferReceipt {
        TransferReceipt {
            request_id: self.request_id.clone(),
            receipt: self.receipt.clone(),
        }
    }

    pub fn involves(&self, account_id: Uuid) -> bool {
        self.from_account_id == account_id || self.to_account_id == account_id
    }
}

impl TransferRequest {
    pub fn new(
        from_account_id: Uuid,
        to_account_id: Uuid,
        amount: Decimal,
        request_id: impl Into<String>,
    ) -> Self {
        Self {
            from_account_id,
            to_account_id,
            amount,
            request_id: request_id.into(),
        }
    }
}

/// Reject empty or over-long request ids
pub fn validate_request_id(request_id: &str) -> Result<()> {
    if request_id.trim().is_empty() {
        return Err(Error::invalid("request id cannot be empty"));
    }
    if request_id.chars().count() > MAX_REQUEST_ID_LEN {
        return Err(Error::invalid(format!(
            "request id cannot exceed {} characters",
            MAX_REQUEST_ID_LEN
        )));
    }
    Ok(())
}
