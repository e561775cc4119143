use serde::{Deserialize, Serialize};

use super::validate::{check, validate_choice, validate_range, validate_text};
use super::{FieldErrors, WizardForm};
use crate::format::{format_wei_to_eth, parse_eth_to_wei};
use crate::models::rules::{calculate_poll_cost, validate_poll_params_with};
use crate::models::{Amount, MinimumRequirements, NewPoll};

pub const CATEGORIES: [&str; 5] = ["technology", "business", "design", "marketing", "other"];
pub const MAX_QUESTIONS: usize = 10;
pub const MAX_FEEDBACKS_LIMIT: u64 = 100;

pub const STEP_BASICS: u8 = 1;
pub const STEP_QUESTIONS: u8 = 2;
pub const STEP_REWARDS: u8 = 3;
pub const STEP_REVIEW: u8 = 4;

/// Poll creation form: basics, questions, rewards, review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PollForm {
    pub title: String,
    pub description: String,
    pub questions: Vec<String>,
    pub category: String,
    pub duration: u32,
    /// Ether amount as typed, e.g. "0.001".
    pub reward_per_feedback: String,
    pub max_feedbacks: u64,
    /// Spendable balance of the connected account, when the wallet reported one.
    #[serde(skip)]
    pub balance: Option<Amount>,
    /// Reward floors read from the ledger; the contract defaults when unset.
    #[serde(skip)]
    pub minimums: Option<MinimumRequirements>,
}

impl Default for PollForm {
    fn default() -> Self {
        PollForm {
            title: String::new(),
            description: String::new(),
            questions: vec![String::new()],
            category: String::new(),
            duration: 7,
            reward_per_feedback: "0.001".to_string(),
            max_feedbacks: 10,
            balance: None,
            minimums: None,
        }
    }
}

impl PollForm {
    pub fn add_question(&mut self) {
        if self.questions.len() < MAX_QUESTIONS {
            self.questions.push(String::new());
        }
    }

    /// The last remaining question cannot be removed.
    pub fn remove_question(&mut self, index: usize) {
        if self.questions.len() > 1 && index < self.questions.len() {
            self.questions.remove(index);
        }
    }

    pub fn reward_per_feedback_wei(&self) -> Option<Amount> {
        parse_eth_to_wei(&self.reward_per_feedback).ok()
    }

    /// Total deposit for the current reward settings.
    pub fn total_cost(&self) -> Option<Amount> {
        self.reward_per_feedback_wei()
            .map(|per| calculate_poll_cost(&per, self.max_feedbacks))
    }

    fn validate_basics(&self, errors: &mut FieldErrors) {
        check(errors, "title", validate_text(&self.title, "Title", 5, 100));
        check(errors, "description", validate_text(&self.description, "Description", 20, 1000));
        check(
            errors,
            "category",
            validate_choice(&self.category, "Select a category", &CATEGORIES),
        );
    }

    fn validate_questions(&self, errors: &mut FieldErrors) {
        if self.questions.iter().all(|q| q.trim().is_empty()) {
            errors.insert("questions".into(), "Add at least one question".into());
        } else {
            for (i, q) in self.questions.iter().enumerate() {
                check(errors, &format!("questions.{i}"), validate_text(q, "Question", 1, 500));
            }
        }
        if self.questions.len() > MAX_QUESTIONS {
            errors.insert(
                "questions".into(),
                format!("At most {MAX_QUESTIONS} questions are allowed"),
            );
        }
        check(
            errors,
            "duration",
            validate_range(Some(u64::from(self.duration)), "Duration", 1, 30),
        );
    }

    fn validate_rewards(&self, errors: &mut FieldErrors) {
        check(
            errors,
            "maxFeedbacks",
            validate_range(Some(self.max_feedbacks), "Max feedbacks", 1, MAX_FEEDBACKS_LIMIT),
        );
        let Some(per) = self.reward_per_feedback_wei() else {
            errors.insert("rewardPerFeedback".into(), "Enter a valid ETH amount".into());
            return;
        };
        let minimums = self.minimums.clone().unwrap_or_default();
        for (param, message) in validate_poll_params_with(&per, self.max_feedbacks, &minimums) {
            errors.entry(param.field().to_string()).or_insert(message);
        }
        let total = calculate_poll_cost(&per, self.max_feedbacks);
        if let Some(balance) = &self.balance {
            if total > *balance {
                errors.insert(
                    "rewardPool".into(),
                    format!(
                        "Total reward pool of {} ETH exceeds your balance of {} ETH",
                        format_wei_to_eth(&total, 4),
                        format_wei_to_eth(balance, 4)
                    ),
                );
            }
        }
    }

    /// Cache input for a validated form; `None` if the reward cannot be parsed.
    pub fn to_new_poll(&self, creator: &str) -> Option<NewPoll> {
        let per = self.reward_per_feedback_wei()?;
        Some(NewPoll {
            title: self.title.trim().to_string(),
            description: self.description.trim().to_string(),
            questions: self
                .questions
                .iter()
                .map(|q| q.trim())
                .filter(|q| !q.is_empty())
                .map(String::from)
                .collect(),
            category: self.category.trim().to_lowercase(),
            duration: self.duration,
            reward_pool: calculate_poll_cost(&per, self.max_feedbacks),
            reward_per_feedback: per,
            max_feedbacks: self.max_feedbacks,
            creator: creator.to_string(),
        })
    }
}

impl WizardForm for PollForm {
    const STEPS: u8 = STEP_REVIEW;

    fn validate_step(&self, step: u8) -> FieldErrors {
        let mut errors = FieldErrors::new();
        match step {
            STEP_BASICS => self.validate_basics(&mut errors),
            STEP_QUESTIONS => self.validate_questions(&mut errors),
            STEP_REWARDS => self.validate_rewards(&mut errors),
            _ => {}
        }
        errors
    }
}
