use serde::{Deserialize, Serialize};

use super::amount::Amount;
use super::rules::{MINIMUM_PER_FEEDBACK, MINIMUM_TOTAL_REWARD};

/// Poll record as reported by the ledger contract's `getPollDetails`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainPollRecord {
    pub creator: String,
    pub reward_pool: Amount,
    pub reward_per_feedback: Amount,
    pub feedbacks_received: u64,
    pub max_feedbacks: u64,
    pub is_active: bool,
}

/// Account record as reported by the ledger contract's `users` mapping.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAccount {
    pub total_earned: Amount,
    pub total_spent: Amount,
    pub profile_hash: String,
    pub is_registered: bool,
}

/// Reward floors reported by `getMinimumRequirements`. The pool must be
/// strictly greater than `min_total`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MinimumRequirements {
    pub min_total: Amount,
    pub min_per_feedback: Amount,
}

impl Default for MinimumRequirements {
    fn default() -> Self {
        MinimumRequirements {
            min_total: Amount::from(MINIMUM_TOTAL_REWARD),
            min_per_feedback: Amount::from(MINIMUM_PER_FEEDBACK),
        }
    }
}

impl ChainPollRecord {
    pub fn is_created_by(&self, account: &str) -> bool {
        self.creator.eq_ignore_ascii_case(account)
    }
}
