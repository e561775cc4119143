use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::amount::Amount;

/// A poll cached on the client before (or independently of) chain confirmation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalPoll {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_id: Option<u64>,
    pub title: String,
    pub description: String,
    pub questions: Vec<String>,
    pub category: String,
    pub duration: u32,
    pub reward_pool: Amount,
    pub reward_per_feedback: Amount,
    pub max_feedbacks: u64,
    pub creator: String,
    pub created_at: DateTime<Utc>,
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipfs_hash: Option<String>,
    #[serde(default)]
    pub feedbacks: Vec<LocalFeedback>,
}

/// A feedback submission cached on the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalFeedback {
    pub id: String,
    pub poll_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll_contract_id: Option<u64>,
    pub respondent: String,
    pub responses: Vec<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    pub reward_amount: Amount,
}

/// Input for `LocalPollStore::add_poll`. Identifier, timestamp and the
/// feedback list are assigned by the store.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPoll {
    pub title: String,
    pub description: String,
    pub questions: Vec<String>,
    pub category: String,
    pub duration: u32,
    pub reward_pool: Amount,
    pub reward_per_feedback: Amount,
    pub max_feedbacks: u64,
    pub creator: String,
}

/// Input for `LocalPollStore::add_feedback`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFeedback {
    pub poll_id: String,
    pub poll_contract_id: Option<u64>,
    pub respondent: String,
    pub responses: Vec<String>,
    pub reward_amount: Amount,
}

impl LocalPoll {
    pub fn is_created_by(&self, account: &str) -> bool {
        self.creator.eq_ignore_ascii_case(account)
    }
}

impl LocalFeedback {
    pub fn is_from(&self, account: &str) -> bool {
        self.respondent.eq_ignore_ascii_case(account)
    }
}
