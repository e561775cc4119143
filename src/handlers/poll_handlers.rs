use actix_session::Session;
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::format::{format_date, format_wei_to_eth};
use crate::models::LocalFeedback;
use crate::models::rules::{PollSummary, poll_summary};
use crate::reconcile::{
    BrowseFilter, CombinedPollView, ListingMode, PollCard, SkippedPoll, load_listing, load_poll,
};
use crate::state::AppState;
use crate::submission;
use crate::wallet;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SkippedOut {
    chain_id: u64,
    reason: String,
}

impl From<SkippedPoll> for SkippedOut {
    fn from(s: SkippedPoll) -> Self {
        SkippedOut { chain_id: s.chain_id, reason: s.reason }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ListingResponse {
    polls: Vec<PollCard>,
    skipped: Vec<SkippedOut>,
    chain_error: Option<String>,
}

/// GET /api/polls/browse?search=&category=&status=active|all
pub async fn browse(
    state: web::Data<AppState>,
    session: Session,
    query: web::Query<BrowseFilter>,
) -> HttpResponse {
    let viewer = wallet::current_account(&session);
    let listing = load_listing(
        state.all_polls(),
        state.ledger.as_ref(),
        state.metadata.as_ref(),
        ListingMode::Browse { viewer: viewer.as_deref() },
    )
    .await;

    let polls = query.apply(listing.polls);
    HttpResponse::Ok().json(ListingResponse {
        polls: polls.iter().map(CombinedPollView::card).collect(),
        skipped: listing.skipped.into_iter().map(Into::into).collect(),
        chain_error: listing.chain_error,
    })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DashboardSummary {
    total_polls: usize,
    active_polls: usize,
    total_responses: u64,
    feedback_given: usize,
    total_earned: String,
    total_spent: String,
    is_registered: bool,
}

/// GET /api/polls/dashboard - the connected account's own polls
pub async fn dashboard(state: web::Data<AppState>, session: Session) -> Result<HttpResponse, AppError> {
    let account = wallet::require_account(&session)?;
    let listing = load_listing(
        state.all_polls(),
        state.ledger.as_ref(),
        state.metadata.as_ref(),
        ListingMode::Dashboard { viewer: &account },
    )
    .await;

    let user = match state.ledger.get_user_data(&account).await {
        Ok(user) => user,
        Err(e) => {
            log::warn!("Could not read account {account}: {e}");
            Default::default()
        }
    };
    let feedback_given = state.read_store(|s| s.get_feedbacks_by_respondent(&account).len());
    let summary = DashboardSummary {
        total_polls: listing.polls.len(),
        active_polls: listing.polls.iter().filter(|p| p.is_active()).count(),
        total_responses: listing.polls.iter().map(|p| p.progress().received).sum(),
        feedback_given,
        total_earned: format_wei_to_eth(&user.total_earned, 4),
        total_spent: format_wei_to_eth(&user.total_spent, 4),
        is_registered: user.is_registered,
    };

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "summary": summary,
        "polls": listing.polls.iter().map(CombinedPollView::card).collect::<Vec<_>>(),
        "skipped": listing.skipped.into_iter().map(SkippedOut::from).collect::<Vec<_>>(),
        "chainError": listing.chain_error,
    })))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FeedbackOut {
    id: String,
    respondent: String,
    responses: Vec<String>,
    date: String,
    tx_hash: Option<String>,
    reward: String,
}

impl From<&LocalFeedback> for FeedbackOut {
    fn from(f: &LocalFeedback) -> Self {
        FeedbackOut {
            id: f.id.clone(),
            respondent: f.respondent.clone(),
            responses: f.responses.clone(),
            date: format_date(&f.created_at),
            tx_hash: f.tx_hash.clone(),
            reward: format_wei_to_eth(&f.reward_amount, 4),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PollDetail {
    #[serde(flatten)]
    card: PollCard,
    questions: Vec<String>,
    duration_days: Option<u32>,
    chain_id: Option<u64>,
    summary: PollSummary,
    feedbacks: Vec<FeedbackOut>,
    is_owner: bool,
}

/// GET /api/polls/{id} - a cached id, `blockchain_<n>` or `<n>`
pub async fn detail(
    state: web::Data<AppState>,
    session: Session,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let local = state.all_polls();
    let view = load_poll(&id, &local, state.ledger.as_ref(), state.metadata.as_ref()).await?;
    let viewer = wallet::current_account(&session);
    let progress = view.progress();

    let mut feedbacks = view.feedbacks().to_vec();
    if view.local_data().is_none() {
        feedbacks = state.read_store(|s| s.get_feedbacks_by_poll(&view.id));
    }

    Ok(HttpResponse::Ok().json(PollDetail {
        card: view.card(),
        questions: view.questions(),
        duration_days: view.duration_days(),
        chain_id: view.chain_id(),
        summary: poll_summary(
            &view.reward_pool(),
            &view.reward_per_feedback(),
            progress.received,
            progress.max,
            view.is_active(),
        ),
        feedbacks: feedbacks.iter().map(FeedbackOut::from).collect(),
        is_owner: viewer.as_deref().is_some_and(|v| view.is_created_by(v)),
    }))
}

#[derive(Deserialize)]
pub struct FeedbackRequest {
    pub responses: Vec<String>,
}

/// POST /api/polls/{id}/feedback
pub async fn submit_feedback(
    state: web::Data<AppState>,
    session: Session,
    path: web::Path<String>,
    body: web::Json<FeedbackRequest>,
) -> Result<HttpResponse, AppError> {
    let account = wallet::require_account(&session)?;
    let poll_id = path.into_inner();
    let outcome =
        submission::submit_feedback(&state, &account, &poll_id, body.into_inner().responses).await?;
    Ok(HttpResponse::Created().json(outcome))
}
