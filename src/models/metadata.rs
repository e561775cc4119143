use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Poll description document pinned to the content-addressed store.
/// The ledger only keeps its content hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollMetadata {
    pub title: String,
    pub description: String,
    pub questions: Vec<String>,
    pub category: String,
    pub duration: u32,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
}

/// Respondent profile document referenced by the ledger's `profileHash`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileMetadata {
    pub full_name: String,
    pub email: String,
    pub age: u8,
    pub location: String,
    pub occupation: String,
    pub industries: Vec<String>,
    pub survey_frequency: String,
    pub email_notifications: bool,
    pub in_app_notifications: bool,
    pub wallet: String,
    pub created_at: DateTime<Utc>,
}
