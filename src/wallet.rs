//! Connected wallet account, kept in the cookie session.

use actix_session::Session;

use crate::errors::AppError;
use crate::models::Amount;

const ACCOUNT_KEY: &str = "account";
const BALANCE_KEY: &str = "balance";
const FLASH_KEY: &str = "flash";

/// Accept `0x` followed by 40 hex digits.
pub fn is_valid_account(account: &str) -> bool {
    account.len() == 42
        && account.starts_with("0x")
        && account[2..].bytes().all(|b| b.is_ascii_hexdigit())
}

pub fn connect(session: &Session, account: &str, balance: Option<&Amount>) -> Result<(), AppError> {
    if !is_valid_account(account) {
        return Err(AppError::Validation(
            [("account".to_string(), "Account must be 0x followed by 40 hex digits".to_string())].into(),
        ));
    }
    session.renew();
    session
        .insert(ACCOUNT_KEY, account)
        .map_err(|e| AppError::Session(format!("Failed to store account: {e}")))?;
    if let Some(balance) = balance {
        session
            .insert(BALANCE_KEY, balance.to_string())
            .map_err(|e| AppError::Session(format!("Failed to store balance: {e}")))?;
    }
    log::info!("Wallet connected: {account}");
    Ok(())
}

pub fn disconnect(session: &Session) {
    if let Some(account) = current_account(session) {
        log::info!("Wallet disconnected: {account}");
    }
    session.purge();
}

pub fn current_account(session: &Session) -> Option<String> {
    session.get::<String>(ACCOUNT_KEY).unwrap_or(None)
}

/// Balance reported at connect time, if any.
pub fn known_balance(session: &Session) -> Option<Amount> {
    session
        .get::<String>(BALANCE_KEY)
        .unwrap_or(None)
        .and_then(|s| s.parse().ok())
}

pub fn require_account(session: &Session) -> Result<String, AppError> {
    current_account(session).ok_or(AppError::NotConnected)
}

pub fn set_flash(session: &Session, message: &str) {
    if let Err(e) = session.insert(FLASH_KEY, message) {
        log::warn!("Could not store flash message: {e}");
    }
}

pub fn take_flash(session: &Session) -> Option<String> {
    let flash = session.get::<String>(FLASH_KEY).unwrap_or(None);
    if flash.is_some() {
        session.remove(FLASH_KEY);
    }
    flash
}
