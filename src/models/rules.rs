use serde::Serialize;

use super::amount::Amount;
use super::chain::MinimumRequirements;
use crate::format::{format_wei_to_eth, short_address};

/// Minimum total reward pool enforced by the ledger contract (10 gwei + 1).
pub const MINIMUM_TOTAL_REWARD: u64 = 10_000_000_001;
/// Minimum reward per feedback enforced by the ledger contract (1 gwei).
pub const MINIMUM_PER_FEEDBACK: u64 = 1_000_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PollStatus {
    Active,
    Full,
    Completed,
}

impl PollStatus {
    pub fn label(&self) -> &'static str {
        match self {
            PollStatus::Active => "Active",
            PollStatus::Full => "Full",
            PollStatus::Completed => "Completed",
        }
    }
}

pub fn poll_status(is_active: bool, received: u64, max: u64) -> PollStatus {
    if !is_active {
        PollStatus::Completed
    } else if received >= max {
        PollStatus::Full
    } else {
        PollStatus::Active
    }
}

/// Responses received as a whole percentage of the maximum, clamped to 0..=100.
/// Zero when `max` is zero.
pub fn calculate_progress(received: u64, max: u64) -> u8 {
    if max == 0 {
        return 0;
    }
    let pct = (received as u128 * 100) / max as u128;
    pct.min(100) as u8
}

pub fn calculate_poll_cost(reward_per_feedback: &Amount, max_feedbacks: u64) -> Amount {
    reward_per_feedback.times(max_feedbacks)
}

/// Form field a reward rule applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollParam {
    RewardPerFeedback,
    MaxFeedbacks,
    RewardPool,
}

impl PollParam {
    pub fn field(&self) -> &'static str {
        match self {
            PollParam::RewardPerFeedback => "rewardPerFeedback",
            PollParam::MaxFeedbacks => "maxFeedbacks",
            PollParam::RewardPool => "rewardPool",
        }
    }
}

/// Validate reward parameters against `minimums`, tagging each violation
/// with the parameter it concerns.
pub fn validate_poll_params_with(
    reward_per_feedback: &Amount,
    max_feedbacks: u64,
    minimums: &MinimumRequirements,
) -> Vec<(PollParam, String)> {
    let mut errors = Vec::new();

    if *reward_per_feedback < minimums.min_per_feedback {
        errors.push((
            PollParam::RewardPerFeedback,
            format!(
                "Reward per feedback must be at least {} ETH",
                format_wei_to_eth(&minimums.min_per_feedback, 9)
            ),
        ));
    }
    if max_feedbacks == 0 {
        errors.push((PollParam::MaxFeedbacks, "Max feedbacks must be greater than 0".to_string()));
    }
    if calculate_poll_cost(reward_per_feedback, max_feedbacks) <= minimums.min_total {
        errors.push((
            PollParam::RewardPool,
            format!(
                "Total reward pool must be greater than {} ETH",
                format_wei_to_eth(&minimums.min_total, 9)
            ),
        ));
    }
    errors
}

/// Validate reward parameters against the contract minimums.
/// Returns every violated rule, empty when valid.
pub fn validate_poll_params(reward_per_feedback: &Amount, max_feedbacks: u64) -> Vec<String> {
    validate_poll_params_with(reward_per_feedback, max_feedbacks, &MinimumRequirements::default())
        .into_iter()
        .map(|(_, message)| message)
        .collect()
}

/// Why a feedback submission is refused, if it is.
pub fn can_submit_feedback(
    is_active: bool,
    received: u64,
    max: u64,
    has_submitted: bool,
) -> Result<(), &'static str> {
    if has_submitted {
        return Err("Already submitted feedback");
    }
    if !is_active {
        return Err("Poll is not active");
    }
    if received >= max {
        return Err("Maximum feedbacks reached");
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollSummary {
    pub total_reward: String,
    pub reward_per_feedback: String,
    pub progress: u8,
    pub status: PollStatus,
    pub remaining_slots: u64,
}

pub fn poll_summary(
    reward_pool: &Amount,
    reward_per_feedback: &Amount,
    received: u64,
    max: u64,
    is_active: bool,
) -> PollSummary {
    PollSummary {
        total_reward: format_wei_to_eth(reward_pool, 4),
        reward_per_feedback: format_wei_to_eth(reward_per_feedback, 4),
        progress: calculate_progress(received, max),
        status: poll_status(is_active, received, max),
        remaining_slots: max.saturating_sub(received),
    }
}

/// Basic CIDv0 check: `Qm` followed by 44 base58 characters.
pub fn is_valid_content_hash(hash: &str) -> bool {
    const BASE58: &str = "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";
    hash.len() == 46
        && hash.starts_with("Qm")
        && hash[2..].chars().all(|c| BASE58.contains(c))
}

/// Creator label for listings; "Unknown" when absent.
pub fn creator_label(creator: Option<&str>) -> String {
    match creator {
        Some(c) if !c.is_empty() => short_address(c),
        _ => "Unknown".to_string(),
    }
}
