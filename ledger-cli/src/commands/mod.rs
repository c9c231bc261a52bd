//! CLI command implementations

pub mod account;
pub mod transfer;
pub mod user;

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use ledger_core::config::Config;
use ledger_core::{Error, ErrorKind, LedgerContext, OperationResult};

/// Get the ledger directory from environment or default
pub fn get_ledger_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("LEDGER_DIR") {
        return Ok(PathBuf::from(dir));
    }
    let home = dirs::home_dir().context("Could not find home directory; set LEDGER_DIR")?;
    Ok(home.join(".ledger"))
}

/// Get or create ledger context
pub fn get_context() -> Result<LedgerContext> {
    let ledger_dir = get_ledger_dir()?;
    LedgerContext::new(&ledger_dir)
        .with_context(|| format!("Failed to open ledger in {}", ledger_dir.display()))
}

/// Install the stderr log subscriber
///
/// Filter precedence: `--verbose`, then `RUST_LOG`, then `logLevel` from settings.
pub fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            let level = get_ledger_dir()
                .ok()
                .and_then(|dir| Config::load(&dir).ok())
                .map(|config| config.log_level)
                .unwrap_or_else(|| "warn".to_string());
            EnvFilter::new(level)
        })
    };

    // A second init (tests) is harmless
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Outward classification of a failed command
///
/// Anything that is not a ledger error (I/O, prompts, settings) is internal.
pub fn error_kind(err: &anyhow::Error) -> ErrorKind {
    err.downcast_ref::<Error>()
        .map(Error::kind)
        .unwrap_or(ErrorKind::Internal)
}

/// Process exit code for a failed command
pub fn exit_code(err: &anyhow::Error) -> u8 {
    match error_kind(err) {
        ErrorKind::InvalidRequest => 2,
        ErrorKind::NotFound => 3,
        ErrorKind::Internal => 1,
    }
}

/// JSON envelope for a failed command
pub fn failure_envelope(err: &anyhow::Error) -> OperationResult<()> {
    OperationResult {
        success: false,
        data: None,
        error: Some(format!("{:#}", err)),
        error_kind: Some(error_kind(err)),
    }
}

pub fn parse_id(value: &str, what: &str) -> Result<Uuid> {
    Uuid::parse_str(value.trim())
        .map_err(|_| Error::invalid(format!("'{}' is not a valid {} id", value, what)).into())
}

pub fn parse_amount(value: &str) -> Result<Decimal> {
    Decimal::from_str(value.trim())
        .map_err(|_| Error::invalid(format!("'{}' is not a valid amount", value)).into())
}

/// Print a successful core result, either as a JSON envelope or through `render`
///
/// Failures are returned untouched; `main` reports them.
pub fn emit<T: Serialize>(
    json: bool,
    result: ledger_core::domain::result::Result<T>,
    render: impl FnOnce(&T) -> Result<()>,
) -> Result<()> {
    let data = result?;
    if json {
        println!("{}", serde_json::to_string_pretty(&OperationResult::ok(data))?);
        Ok(())
    } else {
        render(&data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_follow_error_kind() {
        assert_eq!(exit_code(&Error::invalid("bad").into()), 2);
        assert_eq!(exit_code(&Error::not_found("gone").into()), 3);
        assert_eq!(exit_code(&Error::internal("boom").into()), 1);
        assert_eq!(exit_code(&anyhow::anyhow!("plain")), 1);

        let wrapped = anyhow::Error::from(Error::not_found("gone")).context("while showing");
        assert_eq!(exit_code(&wrapped), 3);
    }

    #[test]
    fn test_failure_envelope() {
        let envelope = failure_envelope(&Error::invalid("insufficient funds").into());
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error_kind"], "invalid_request");
        assert!(json["error"].as_str().unwrap().contains("insufficient funds"));
    }

    #[test]
    fn test_parse_helpers_reject_garbage_as_invalid_request() {
        assert_eq!(exit_code(&parse_id("nope", "account").unwrap_err()), 2);
        assert_eq!(exit_code(&parse_amount("ten").unwrap_err()), 2);
        assert_eq!(parse_amount(" 10.50 ").unwrap(), Decimal::new(1050, 2));
    }
}
