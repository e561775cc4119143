use actix_session::Session;
use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::format::format_wei_to_eth;
use crate::models::MinimumRequirements;
use crate::state::{AppState, POLL_DRAFT};
use crate::store::drafts::draft_key;
use crate::submission;
use crate::wallet;
use crate::wizard::{FieldErrors, PollForm, ProfileForm, Wizard, WizardForm};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WizardView<'a, F> {
    step: u8,
    total_steps: u8,
    form: &'a F,
    errors: &'a FieldErrors,
    last_saved: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    total_cost: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    completion: Option<u8>,
}

fn poll_view(w: &Wizard<PollForm>) -> serde_json::Value {
    let view = WizardView {
        step: w.step(),
        total_steps: PollForm::STEPS,
        form: &w.form,
        errors: w.errors(),
        last_saved: w.last_saved(),
        total_cost: w.form.total_cost().map(|c| format_wei_to_eth(&c, 4)),
        completion: None,
    };
    serde_json::to_value(view).unwrap_or_default()
}

fn profile_view(w: &Wizard<ProfileForm>) -> serde_json::Value {
    let view = WizardView {
        step: w.step(),
        total_steps: ProfileForm::STEPS,
        form: &w.form,
        errors: w.errors(),
        last_saved: w.last_saved(),
        total_cost: None,
        completion: Some(w.form.completion()),
    };
    serde_json::to_value(view).unwrap_or_default()
}

/// Run `f` on the account's poll wizard, resuming from a saved draft if one exists.
fn with_poll_wizard<R>(state: &AppState, account: &str, f: impl FnOnce(&mut Wizard<PollForm>, &mut bool) -> R) -> R {
    let key = draft_key(POLL_DRAFT, account);
    let draft = state.with_drafts(|d| d.get(&key).cloned());
    state.with_forms(account, |forms| {
        let wizard = forms.poll.get_or_insert_with(|| match draft {
            Some(draft) => {
                let form = serde_json::from_value::<PollForm>(draft.data).unwrap_or_else(|e| {
                    log::warn!("Discarding unreadable poll draft {key}: {e}");
                    PollForm::default()
                });
                let mut w = Wizard::new(form);
                w.mark_saved(draft.saved_at);
                w
            }
            None => Wizard::default(),
        });
        f(wizard, &mut forms.poll_dirty)
    })
}

/// Reward floors from the ledger; `None` falls back to the contract defaults.
async fn ledger_minimums(state: &AppState) -> Option<MinimumRequirements> {
    match state.ledger.get_minimum_requirements().await {
        Ok(minimums) => Some(minimums),
        Err(e) => {
            log::warn!("Could not read minimum requirements: {e}");
            None
        }
    }
}

/// GET /api/wizard/poll
pub async fn poll_state(state: web::Data<AppState>, session: Session) -> Result<HttpResponse, AppError> {
    let account = wallet::require_account(&session)?;
    let view = with_poll_wizard(&state, &account, |w, _| poll_view(w));
    Ok(HttpResponse::Ok().json(view))
}

/// PUT /api/wizard/poll - replace the form contents
pub async fn poll_update(
    state: web::Data<AppState>,
    session: Session,
    body: web::Json<PollForm>,
) -> Result<HttpResponse, AppError> {
    let account = wallet::require_account(&session)?;
    let view = with_poll_wizard(&state, &account, |w, dirty| {
        w.update(body.into_inner());
        *dirty = true;
        poll_view(w)
    });
    Ok(HttpResponse::Ok().json(view))
}

/// POST /api/wizard/poll/next
pub async fn poll_next(state: web::Data<AppState>, session: Session) -> Result<HttpResponse, AppError> {
    let account = wallet::require_account(&session)?;
    let balance = wallet::known_balance(&session);
    let minimums = ledger_minimums(&state).await;
    with_poll_wizard(&state, &account, |w, _| {
        w.form.balance = balance;
        w.form.minimums = minimums;
        if w.next() {
            Ok(HttpResponse::Ok().json(poll_view(w)))
        } else {
            Err(AppError::Validation(w.errors().clone()))
        }
    })
}

/// POST /api/wizard/poll/questions - append an empty question
pub async fn poll_add_question(state: web::Data<AppState>, session: Session) -> Result<HttpResponse, AppError> {
    let account = wallet::require_account(&session)?;
    let view = with_poll_wizard(&state, &account, |w, dirty| {
        w.form.add_question();
        *dirty = true;
        poll_view(w)
    });
    Ok(HttpResponse::Ok().json(view))
}

/// DELETE /api/wizard/poll/questions/{index}
pub async fn poll_remove_question(
    state: web::Data<AppState>,
    session: Session,
    path: web::Path<usize>,
) -> Result<HttpResponse, AppError> {
    let account = wallet::require_account(&session)?;
    let index = path.into_inner();
    let view = with_poll_wizard(&state, &account, |w, dirty| {
        w.form.remove_question(index);
        *dirty = true;
        poll_view(w)
    });
    Ok(HttpResponse::Ok().json(view))
}

/// POST /api/wizard/poll/back
pub async fn poll_back(state: web::Data<AppState>, session: Session) -> Result<HttpResponse, AppError> {
    let account = wallet::require_account(&session)?;
    let view = with_poll_wizard(&state, &account, |w, _| {
        w.back();
        poll_view(w)
    });
    Ok(HttpResponse::Ok().json(view))
}

/// POST /api/wizard/poll/draft - save now, regardless of step validity
pub async fn poll_draft(state: web::Data<AppState>, session: Session) -> Result<HttpResponse, AppError> {
    let account = wallet::require_account(&session)?;
    let data = with_poll_wizard(&state, &account, |w, _| serde_json::to_value(&w.form))
        .map_err(|e| AppError::Rejected(format!("Could not encode draft: {e}")))?;
    let now = Utc::now();
    state.with_drafts(|d| d.save(&draft_key(POLL_DRAFT, &account), data, now))?;
    let view = with_poll_wizard(&state, &account, |w, dirty| {
        w.mark_saved(now);
        *dirty = false;
        poll_view(w)
    });
    Ok(HttpResponse::Ok().json(view))
}

/// POST /api/wizard/poll/submit
///
/// The wizard and its draft are only cleared once the poll is cached.
pub async fn poll_submit(state: web::Data<AppState>, session: Session) -> Result<HttpResponse, AppError> {
    let account = wallet::require_account(&session)?;
    let balance = wallet::known_balance(&session);
    let minimums = ledger_minimums(&state).await;
    let form = with_poll_wizard(&state, &account, |w, _| {
        w.form.balance = balance;
        w.form.minimums = minimums;
        if w.validate_all() {
            Ok(w.form.clone())
        } else {
            Err(AppError::Validation(w.errors().clone()))
        }
    })?;

    let outcome = submission::submit_poll(&state, &account, &form).await?;

    state.with_forms(&account, |forms| {
        forms.poll = None;
        forms.poll_dirty = false;
    });
    let key = draft_key(POLL_DRAFT, &account);
    if let Err(e) = state.with_drafts(|d| d.remove(&key)) {
        log::error!("Could not clear poll draft {key}: {e}");
    }
    wallet::set_flash(&session, "Poll created");
    Ok(HttpResponse::Created().json(outcome))
}

fn with_profile_wizard<R>(state: &AppState, account: &str, f: impl FnOnce(&mut Wizard<ProfileForm>) -> R) -> R {
    state.with_forms(account, |forms| f(forms.profile.get_or_insert_with(Wizard::default)))
}

/// GET /api/wizard/profile
pub async fn profile_state(state: web::Data<AppState>, session: Session) -> Result<HttpResponse, AppError> {
    let account = wallet::require_account(&session)?;
    let view = with_profile_wizard(&state, &account, |w| profile_view(w));
    Ok(HttpResponse::Ok().json(view))
}

/// PUT /api/wizard/profile
pub async fn profile_update(
    state: web::Data<AppState>,
    session: Session,
    body: web::Json<ProfileForm>,
) -> Result<HttpResponse, AppError> {
    let account = wallet::require_account(&session)?;
    let view = with_profile_wizard(&state, &account, |w| {
        w.update(body.into_inner());
        profile_view(w)
    });
    Ok(HttpResponse::Ok().json(view))
}

#[derive(Deserialize)]
pub struct IndustryToggle {
    pub industry: String,
    pub checked: bool,
}

/// POST /api/wizard/profile/industries
pub async fn profile_toggle_industry(
    state: web::Data<AppState>,
    session: Session,
    body: web::Json<IndustryToggle>,
) -> Result<HttpResponse, AppError> {
    let account = wallet::require_account(&session)?;
    let view = with_profile_wizard(&state, &account, |w| {
        w.form.toggle_industry(&body.industry, body.checked);
        profile_view(w)
    });
    Ok(HttpResponse::Ok().json(view))
}

/// POST /api/wizard/profile/next
pub async fn profile_next(state: web::Data<AppState>, session: Session) -> Result<HttpResponse, AppError> {
    let account = wallet::require_account(&session)?;
    with_profile_wizard(&state, &account, |w| {
        if w.next() {
            Ok(HttpResponse::Ok().json(profile_view(w)))
        } else {
            Err(AppError::Validation(w.errors().clone()))
        }
    })
}

/// POST /api/wizard/profile/back
pub async fn profile_back(state: web::Data<AppState>, session: Session) -> Result<HttpResponse, AppError> {
    let account = wallet::require_account(&session)?;
    let view = with_profile_wizard(&state, &account, |w| {
        w.back();
        profile_view(w)
    });
    Ok(HttpResponse::Ok().json(view))
}

/// POST /api/wizard/profile/submit
pub async fn profile_submit(state: web::Data<AppState>, session: Session) -> Result<HttpResponse, AppError> {
    let account = wallet::require_account(&session)?;
    let form = with_profile_wizard(&state, &account, |w| {
        if w.validate_all() {
            Ok(w.form.clone())
        } else {
            Err(AppError::Validation(w.errors().clone()))
        }
    })?;

    let outcome = submission::register_profile(&state, &account, &form).await?;

    state.with_forms(&account, |forms| forms.profile = None);
    wallet::set_flash(&session, "Profile complete");
    Ok(HttpResponse::Created().json(outcome))
}
