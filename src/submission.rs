//! Submit actions: write the local cache first, then push to the metadata
//! store and the ledger. Remote failures after the local write are reported
//! as notices; the local record stays.

use chrono::Utc;
use serde::Serialize;

use crate::errors::AppError;
use crate::models::rules::{calculate_poll_cost, can_submit_feedback};
use crate::models::{NewFeedback, PollMetadata};
use crate::reconcile::load_poll;
use crate::state::AppState;
use crate::wizard::{FieldErrors, PollForm, ProfileForm};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    fn success(message: impl Into<String>) -> Self {
        Notice { level: NoticeLevel::Success, message: message.into() }
    }

    fn info(message: impl Into<String>) -> Self {
        Notice { level: NoticeLevel::Info, message: message.into() }
    }

    fn error(message: impl Into<String>) -> Self {
        Notice { level: NoticeLevel::Error, message: message.into() }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollSubmission {
    pub local_id: String,
    pub ipfs_hash: Option<String>,
    pub tx_hash: Option<String>,
    pub contract_id: Option<u64>,
    pub notices: Vec<Notice>,
}

/// Create a poll from a validated form.
pub async fn submit_poll(state: &AppState, creator: &str, form: &PollForm) -> Result<PollSubmission, AppError> {
    let new_poll = form.to_new_poll(creator).ok_or_else(|| {
        AppError::Validation(FieldErrors::from([(
            "rewardPerFeedback".to_string(),
            "Enter a valid ETH amount".to_string(),
        )]))
    })?;
    let per = new_poll.reward_per_feedback.clone();
    let max = new_poll.max_feedbacks;
    let document = PollMetadata {
        title: new_poll.title.clone(),
        description: new_poll.description.clone(),
        questions: new_poll.questions.clone(),
        category: new_poll.category.clone(),
        duration: new_poll.duration,
        created_at: Utc::now(),
        created_by: creator.to_string(),
    };

    let local_id = state.mutate_store(|s| s.add_poll(new_poll));
    log::info!("Poll {local_id} cached for {creator}");
    let mut out = PollSubmission {
        local_id: local_id.clone(),
        ipfs_hash: None,
        tx_hash: None,
        contract_id: None,
        notices: vec![Notice::success("Poll created locally! Uploading to IPFS and blockchain...")],
    };

    let uploaded = match serde_json::to_value(&document) {
        Ok(value) => state.metadata.upload(&value).await.map_err(|e| e.to_string()),
        Err(e) => Err(e.to_string()),
    };
    let data_hash = match uploaded {
        Ok(hash) => {
            state.mutate_store(|s| s.update_poll_ipfs_hash(&local_id, &hash));
            out.notices.push(Notice::success("Metadata uploaded to IPFS!"));
            out.ipfs_hash = Some(hash.clone());
            hash
        }
        Err(e) => {
            log::warn!("Metadata upload for {local_id} failed: {e}");
            out.notices.push(Notice::error("Failed to upload to IPFS, but poll saved locally"));
            String::new()
        }
    };

    let cost = match state.ledger.calculate_poll_cost(&per, max).await {
        Ok(cost) => cost,
        Err(e) => {
            log::warn!("Ledger cost read for {local_id} failed, pricing locally: {e}");
            calculate_poll_cost(&per, max)
        }
    };
    let tx_hash = match state.ledger.create_poll(creator, &data_hash, &per, max, &cost).await {
        Ok(tx) => tx,
        Err(e) => {
            log::warn!("Ledger create for {local_id} failed: {e}");
            out.notices.push(Notice::error("Blockchain transaction failed, but poll saved locally"));
            return Ok(out);
        }
    };
    out.tx_hash = Some(tx_hash.clone());
    out.notices.push(Notice::success("Poll creation transaction submitted!"));

    match find_created_poll(state, creator, &data_hash).await {
        Some(contract_id) => {
            state.mutate_store(|s| s.update_poll_contract_id(&local_id, contract_id, &tx_hash));
            out.contract_id = Some(contract_id);
            out.notices.push(Notice::success("Poll successfully created on blockchain!"));
        }
        None => {
            log::warn!("Could not identify chain id for {local_id} after tx {tx_hash}");
            out.notices.push(Notice::info("Transaction submitted; the poll will link once confirmed"));
        }
    }
    Ok(out)
}

/// Newest ledger poll, if it is the one just created by `creator` with `data_hash`.
async fn find_created_poll(state: &AppState, creator: &str, data_hash: &str) -> Option<u64> {
    let total = state.ledger.get_total_polls().await.ok()?;
    if total == 0 {
        return None;
    }
    let details = state.ledger.get_poll_details(total).await.ok()?;
    let hash = state.ledger.get_poll_data_hash(total).await.ok()?;
    (details.is_created_by(creator) && hash == data_hash).then_some(total)
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackSubmission {
    pub feedback_id: String,
    pub poll_id: String,
    pub tx_hash: Option<String>,
    pub notices: Vec<Notice>,
}

/// Record responses to a poll, then submit on the ledger when the poll is on chain.
pub async fn submit_feedback(
    state: &AppState,
    respondent: &str,
    poll_id: &str,
    responses: Vec<String>,
) -> Result<FeedbackSubmission, AppError> {
    if responses.is_empty() || responses.iter().any(|r| r.trim().is_empty()) {
        return Err(AppError::Validation(FieldErrors::from([(
            "responses".to_string(),
            "Please answer all questions".to_string(),
        )])));
    }

    let local = state.all_polls();
    let view = load_poll(poll_id, &local, state.ledger.as_ref(), state.metadata.as_ref()).await?;
    if view.is_created_by(respondent) {
        return Err(AppError::Rejected("You cannot give feedback on your own poll".into()));
    }

    let mut has_submitted = view.feedbacks().iter().any(|f| f.is_from(respondent))
        || state.read_store(|s| {
            s.get_feedbacks_by_respondent(respondent)
                .iter()
                .any(|f| f.poll_id == view.id)
        });
    let chain_id = view.chain_id();
    if let (false, Some(id)) = (has_submitted, chain_id) {
        match state.ledger.has_user_submitted_feedback(id, respondent).await {
            Ok(done) => has_submitted = done,
            Err(e) => log::warn!("Could not check prior feedback on chain poll {id}: {e}"),
        }
    }
    let progress = view.progress();
    can_submit_feedback(view.is_active(), progress.received, progress.max, has_submitted)
        .map_err(|reason| AppError::Rejected(reason.to_string()))?;

    let responses: Vec<String> = responses.into_iter().map(|r| r.trim().to_string()).collect();
    let feedback_id = state.mutate_store(|s| {
        s.add_feedback(NewFeedback {
            poll_id: view.id.clone(),
            poll_contract_id: chain_id,
            respondent: respondent.to_string(),
            responses,
            reward_amount: view.reward_per_feedback(),
        })
    });
    log::info!("Feedback {feedback_id} cached for poll {}", view.id);

    let mut out = FeedbackSubmission {
        feedback_id: feedback_id.clone(),
        poll_id: view.id.clone(),
        tx_hash: None,
        notices: vec![Notice::success("Feedback submitted locally!")],
    };

    if let Some(id) = chain_id {
        out.notices.push(Notice::info("Submitting to blockchain..."));
        match state.ledger.submit_feedback(respondent, id).await {
            Ok(tx) => {
                state.mutate_store(|s| s.update_feedback_tx_hash(&feedback_id, &tx));
                let short: String = tx.chars().take(10).collect();
                out.notices.push(Notice::success(format!("Transaction submitted! Hash: {short}...")));
                out.tx_hash = Some(tx);
            }
            Err(e) => {
                log::warn!("Ledger feedback for chain poll {id} failed: {e}");
                out.notices.push(Notice::error("Blockchain submission failed, but feedback saved locally"));
            }
        }
    }
    Ok(out)
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSubmission {
    pub profile_hash: String,
    pub tx_hash: String,
}

/// Pin the profile document and register the account with its hash.
/// Either failure is returned as an error; the caller keeps the form.
pub async fn register_profile(
    state: &AppState,
    account: &str,
    form: &ProfileForm,
) -> Result<ProfileSubmission, AppError> {
    if state.ledger.get_user_data(account).await?.is_registered {
        return Err(AppError::Rejected("Account is already registered".into()));
    }
    let document = serde_json::to_value(form.to_metadata(account, Utc::now()))
        .map_err(|e| AppError::Rejected(format!("Could not encode profile: {e}")))?;
    let profile_hash = state.metadata.upload(&document).await?;
    let tx_hash = state.ledger.register_user(account, &profile_hash).await?;
    log::info!("Registered {account} with profile {profile_hash}");
    Ok(ProfileSubmission { profile_hash, tx_hash })
}
