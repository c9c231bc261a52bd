//! End-to-end tests against a DuckDB file in a temporary directory

use std::str::FromStr;

use rust_decimal::Decimal;
use tempfile::TempDir;
use uuid::Uuid;

use ledger_core::config::Config;
use ledger_core::domain::result::Result;
use ledger_core::{
    ErrorKind, LedgerContext, NewUser, OperationResult, TransferReceipt, TransferRequest,
};

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

struct TestLedger {
    _dir: TempDir,
    ctx: LedgerContext,
    user_id: Uuid,
}

impl TestLedger {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let ctx = LedgerContext::new(dir.path()).unwrap();
        let user_id = ctx
            .user_service
            .create_user(NewUser::new("Test", "User", "test@example.com"))
            .unwrap();
        Self { _dir: dir, ctx, user_id }
    }

    fn account(&self, currency: &str, balance: &str) -> Uuid {
        self.ctx
            .account_service
            .create_account(self.user_id, currency, dec(balance))
            .unwrap()
    }

    fn balance(&self, id: Uuid) -> Decimal {
        self.ctx.account_service.get_account(id).unwrap().balance
    }

    fn transfer(&self, from: Uuid, to: Uuid, amount: &str, request_id: &str) -> Result<TransferReceipt> {
        self.ctx
            .transfer_service
            .transfer(&TransferRequest::new(from, to, dec(amount), request_id))
    }
}

#[test]
fn test_deposit_then_transfer_then_replay() {
    let ledger = TestLedger::new();
    let a = ledger.account("usd", "0");
    let b = ledger.account("usd", "0");

    let after_deposit = ledger.ctx.account_service.deposit(a, dec("10.0000")).unwrap();
    assert_eq!(after_deposit.balance.to_string(), "10.0000");
    assert_eq!(after_deposit.currency, "USD");

    let receipt = ledger.transfer(a, b, "10.0000", "req-1").unwrap();
    assert_eq!(receipt.request_id, "req-1");
    assert!(!receipt.receipt.is_empty());
    assert_eq!(ledger.balance(a), Decimal::ZERO);
    assert_eq!(ledger.balance(b), dec("10"));

    let replay = ledger.transfer(a, b, "10.0000", "req-1").unwrap();
    assert_eq!(
        serde_json::to_string(&receipt).unwrap(),
        serde_json::to_string(&replay).unwrap()
    );
    assert_eq!(ledger.balance(a), Decimal::ZERO);
    assert_eq!(ledger.balance(b), dec("10"));
    assert_eq!(ledger.ctx.account_service.get_transfers(a).unwrap().len(), 1);
}

#[test]
fn test_rejections_leave_balances_unchanged() {
    let ledger = TestLedger::new();
    let a = ledger.account("usd", "10");
    let b = ledger.account("usd", "0");
    let c = ledger.account("eur", "0");

    let same = ledger.transfer(a, a, "1.0000", "req-2").unwrap_err();
    assert_eq!(same.kind(), ErrorKind::InvalidRequest);

    let overdraft = ledger.transfer(a, b, "1000000.0000", "req-3").unwrap_err();
    assert_eq!(overdraft.kind(), ErrorKind::InvalidRequest);

    let currency = ledger.transfer(a, c, "1", "req-4").unwrap_err();
    assert_eq!(currency.kind(), ErrorKind::InvalidRequest);

    let missing = ledger.transfer(a, Uuid::new_v4(), "1", "req-5").unwrap_err();
    assert_eq!(missing.kind(), ErrorKind::NotFound);

    assert_eq!(ledger.balance(a), dec("10"));
    assert_eq!(ledger.balance(b), Decimal::ZERO);
    assert_eq!(ledger.balance(c), Decimal::ZERO);
    assert!(ledger.ctx.account_service.get_transfers(a).unwrap().is_empty());
}

#[test]
fn test_deleted_account_keeps_transfer_history_of_counterparty() {
    let ledger = TestLedger::new();
    let a = ledger.account("usd", "5");
    let b = ledger.account("usd", "0");
    ledger.transfer(a, b, "5", "req-1").unwrap();

    assert_eq!(ledger.ctx.account_service.delete_account(a).unwrap(), a);

    let history = ledger.ctx.account_service.get_transfers(b).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].from_account_id, a);

    let err = ledger.transfer(b, a, "1", "req-2").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    // The request id still maps to the completed transfer
    let replay = ledger.transfer(a, b, "5", "req-1").unwrap();
    assert_eq!(replay.request_id, "req-1");
}

#[test]
fn test_user_lifecycle() {
    let ledger = TestLedger::new();
    let users = &ledger.ctx.user_service;

    let updated = users
        .update_user(ledger.user_id, NewUser::new("Renamed", "User", "renamed@example.com"))
        .unwrap();
    assert_eq!(users.get_user(ledger.user_id).unwrap(), updated);

    let account = ledger.account("usd", "0");
    assert_eq!(
        users.delete_user(ledger.user_id).unwrap_err().kind(),
        ErrorKind::InvalidRequest
    );

    ledger.ctx.account_service.delete_account(account).unwrap();
    users.delete_user(ledger.user_id).unwrap();
    assert_eq!(
        users.get_user(ledger.user_id).unwrap_err().kind(),
        ErrorKind::NotFound
    );
}

#[test]
fn test_ledger_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let (a, b) = {
        let ctx = LedgerContext::new(dir.path()).unwrap();
        let user = ctx
            .user_service
            .create_user(NewUser::new("Persistent", "User", "p@example.com"))
            .unwrap();
        let a = ctx.account_service.create_account(user, "usd", dec("12.3456")).unwrap();
        let b = ctx.account_service.create_account(user, "usd", Decimal::ZERO).unwrap();
        ctx.transfer_service
            .transfer(&TransferRequest::new(a, b, dec("2.3456"), "req-1"))
            .unwrap();
        (a, b)
    };

    let ctx = LedgerContext::new(dir.path()).unwrap();
    assert_eq!(ctx.account_service.get_account(a).unwrap().balance, dec("10"));
    assert_eq!(
        ctx.account_service.get_account(b).unwrap().balance.to_string(),
        "2.3456"
    );
    let db_path = ctx.store.db_path().unwrap();
    assert_eq!(db_path, dir.path().join(Config::default().database));
    assert!(db_path.exists());
}

#[test]
fn test_operation_result_envelope() {
    let ledger = TestLedger::new();
    let missing = Uuid::new_v4();

    let result: OperationResult<_> = ledger.ctx.account_service.get_account(missing).into();
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["success"], false);
    assert_eq!(json["error_kind"], "not_found");
}
