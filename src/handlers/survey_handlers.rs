use std::collections::BTreeMap;

use actix_session::Session;
use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::AppError;
use crate::reconcile::load_poll;
use crate::state::{AppState, survey_draft_form};
use crate::store::drafts::draft_key;
use crate::submission;
use crate::wallet;
use crate::wizard::survey::{Answer, SurveyQuestion, SurveyStep};
use crate::wizard::Survey;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SurveyView {
    poll_id: String,
    questions: Vec<&'static SurveyQuestion>,
    current: usize,
    question: &'static SurveyQuestion,
    answers: BTreeMap<u8, Answer>,
    progress: u8,
    can_advance: bool,
    pending_advance: Option<DateTime<Utc>>,
    ready_to_submit: bool,
}

fn view_of(poll_id: &str, survey: &Survey) -> SurveyView {
    let questions = survey.active_questions();
    SurveyView {
        poll_id: poll_id.to_string(),
        current: survey.current_index(),
        ready_to_submit: survey.current_index() + 1 >= questions.len() && survey.is_current_answered(),
        questions,
        question: survey.current_question(),
        answers: survey.answers().clone(),
        progress: survey.progress(),
        can_advance: survey.is_current_answered(),
        pending_advance: survey.pending_advance(),
    }
}

/// Resolve the path id to the poll's view id. Unknown polls are a 404 and
/// never get survey state.
async fn resolve_poll_id(state: &AppState, id: &str) -> Result<String, AppError> {
    let local = state.all_polls();
    let view = load_poll(id, &local, state.ledger.as_ref(), state.metadata.as_ref()).await?;
    Ok(view.id)
}

/// Run `f` on the account's survey for `poll_id`, restoring autosaved answers
/// the first time it is opened. Pending auto-advances are applied first.
fn with_survey<R>(state: &AppState, account: &str, poll_id: &str, f: impl FnOnce(&mut Survey) -> R) -> R {
    let key = draft_key(&survey_draft_form(poll_id), account);
    let saved: Option<BTreeMap<u8, Answer>> = state.with_drafts(|d| {
        d.get(&key)
            .and_then(|draft| serde_json::from_value(draft.data.clone()).ok())
    });
    state.with_forms(account, |forms| {
        let survey = forms
            .surveys
            .entry(poll_id.to_string())
            .or_insert_with(|| saved.map(Survey::from_answers).unwrap_or_default());
        survey.tick(Utc::now());
        f(survey)
    })
}

fn autosave_answers(state: &AppState, account: &str, poll_id: &str, answers: &BTreeMap<u8, Answer>) {
    let key = draft_key(&survey_draft_form(poll_id), account);
    let data = match serde_json::to_value(answers) {
        Ok(v) => v,
        Err(e) => {
            log::error!("Could not encode survey answers: {e}");
            return;
        }
    };
    if let Err(e) = state.with_drafts(|d| d.save(&key, data, Utc::now())) {
        log::error!("Survey autosave failed for {key}: {e}");
    }
}

/// GET /api/polls/{id}/survey
pub async fn current(
    state: web::Data<AppState>,
    session: Session,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let account = wallet::require_account(&session)?;
    let poll_id = resolve_poll_id(&state, &path.into_inner()).await?;
    let view = with_survey(&state, &account, &poll_id, |s| view_of(&poll_id, s));
    Ok(HttpResponse::Ok().json(view))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRequest {
    pub question_id: u8,
    pub answer: Value,
}

/// POST /api/polls/{id}/survey/answer
pub async fn answer(
    state: web::Data<AppState>,
    session: Session,
    path: web::Path<String>,
    body: web::Json<AnswerRequest>,
) -> Result<HttpResponse, AppError> {
    let account = wallet::require_account(&session)?;
    let poll_id = resolve_poll_id(&state, &path.into_inner()).await?;
    let (view, answers) = with_survey(&state, &account, &poll_id, |s| {
        s.answer(body.question_id, &body.answer, Utc::now())?;
        Ok::<_, crate::wizard::FieldErrors>((view_of(&poll_id, s), s.answers().clone()))
    })
    .map_err(AppError::Validation)?;
    autosave_answers(&state, &account, &poll_id, &answers);
    Ok(HttpResponse::Ok().json(view))
}

/// POST /api/polls/{id}/survey/next
pub async fn next(
    state: web::Data<AppState>,
    session: Session,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let account = wallet::require_account(&session)?;
    let poll_id = resolve_poll_id(&state, &path.into_inner()).await?;
    let view = with_survey(&state, &account, &poll_id, |s| {
        s.next().map(|step| {
            let mut view = view_of(&poll_id, s);
            view.ready_to_submit = step == SurveyStep::ReadyToSubmit;
            view
        })
    })
    .map_err(AppError::Validation)?;
    Ok(HttpResponse::Ok().json(view))
}

/// POST /api/polls/{id}/survey/back
pub async fn back(
    state: web::Data<AppState>,
    session: Session,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let account = wallet::require_account(&session)?;
    let poll_id = resolve_poll_id(&state, &path.into_inner()).await?;
    let view = with_survey(&state, &account, &poll_id, |s| {
        s.back();
        view_of(&poll_id, s)
    });
    Ok(HttpResponse::Ok().json(view))
}

/// POST /api/polls/{id}/survey/submit
///
/// On failure the answers stay in place so the survey can be retried.
pub async fn submit(
    state: web::Data<AppState>,
    session: Session,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let account = wallet::require_account(&session)?;
    let poll_id = resolve_poll_id(&state, &path.into_inner()).await?;
    let responses = with_survey(&state, &account, &poll_id, |s| {
        let errors = s.validate();
        if errors.is_empty() { Ok(s.responses()) } else { Err(errors) }
    })
    .map_err(AppError::Validation)?;

    let outcome = submission::submit_feedback(&state, &account, &poll_id, responses).await?;

    state.with_forms(&account, |forms| forms.surveys.remove(&poll_id));
    let key = draft_key(&survey_draft_form(&poll_id), &account);
    if let Err(e) = state.with_drafts(|d| d.remove(&key)) {
        log::error!("Could not clear survey draft {key}: {e}");
    }
    Ok(HttpResponse::Created().json(outcome))
}
