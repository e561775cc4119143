use actix_session::Session;
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::format::{format_wei_to_eth, short_address};
use crate::models::Amount;
use crate::state::AppState;
use crate::wallet;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectRequest {
    pub account: String,
    /// Spendable balance in wei, as a decimal string.
    #[serde(default)]
    pub balance: Option<Amount>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WalletStatus {
    connected: bool,
    account: Option<String>,
    short_address: Option<String>,
    flash: Option<String>,
}

fn status_of(session: &Session) -> WalletStatus {
    let account = wallet::current_account(session);
    WalletStatus {
        connected: account.is_some(),
        short_address: account.as_deref().map(short_address),
        account,
        flash: wallet::take_flash(session),
    }
}

/// GET /api/wallet
pub async fn status(session: Session) -> HttpResponse {
    HttpResponse::Ok().json(status_of(&session))
}

/// POST /api/wallet/connect
pub async fn connect(session: Session, body: web::Json<ConnectRequest>) -> Result<HttpResponse, AppError> {
    wallet::connect(&session, body.account.trim(), body.balance.as_ref())?;
    Ok(HttpResponse::Ok().json(status_of(&session)))
}

/// POST /api/wallet/disconnect
pub async fn disconnect(session: Session) -> HttpResponse {
    wallet::disconnect(&session);
    HttpResponse::Ok().json(status_of(&session))
}

/// GET /api/account - ledger record of the connected account
pub async fn account(state: web::Data<AppState>, session: Session) -> Result<HttpResponse, AppError> {
    let account = wallet::require_account(&session)?;
    let user = state.ledger.get_user_data(&account).await?;
    let profile_hash = if user.is_registered {
        Some(state.ledger.get_user_profile_hash(&account).await?).filter(|h| !h.is_empty())
    } else {
        None
    };
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "account": account,
        "isRegistered": user.is_registered,
        "profileHash": profile_hash,
        "totalEarned": format_wei_to_eth(&user.total_earned, 4),
        "totalSpent": format_wei_to_eth(&user.total_spent, 4),
        "totalEarnedWei": user.total_earned,
        "totalSpentWei": user.total_spent,
    })))
}
