//! Local poll cache.
//!
//! Polls and feedback created on this client before (or without) chain
//! confirmation. Feedback records live only in the flat `feedbacks` list;
//! the per-poll `feedbacks` field is derived from it whenever a poll is read
//! or a snapshot is taken, so a transaction reference attached to a feedback
//! is visible through both views at once.

pub mod drafts;
pub mod persist;
pub mod seed;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::models::{LocalFeedback, LocalPoll, NewFeedback, NewPoll};

/// Immutable copy of the cache in its persisted layout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub polls: Vec<LocalPoll>,
    pub feedbacks: Vec<LocalFeedback>,
}

#[derive(Debug, Clone, Default)]
pub struct LocalPollStore {
    /// Insertion order; `feedbacks` of each entry is always empty.
    polls: Vec<LocalPoll>,
    feedbacks: Vec<LocalFeedback>,
}

const ID_SUFFIX_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

fn random_suffix() -> String {
    let mut rng = rand::rng();
    (0..9)
        .map(|_| ID_SUFFIX_ALPHABET[rng.random_range(0..ID_SUFFIX_ALPHABET.len())] as char)
        .collect()
}

fn newest_first<T>(items: &mut [T], key: impl Fn(&T) -> DateTime<Utc>) {
    items.sort_by_key(|item| std::cmp::Reverse(key(item)));
}

impl LocalPollStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store from a persisted snapshot.
    ///
    /// Feedback embedded in a poll but missing from the flat list is moved
    /// into the flat list. When both copies exist the one carrying a
    /// transaction reference wins.
    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        let mut store = LocalPollStore {
            polls: Vec::with_capacity(snapshot.polls.len()),
            feedbacks: snapshot.feedbacks,
        };
        for poll in snapshot.polls {
            store.insert_poll(poll);
        }
        store
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            polls: self.polls.iter().map(|p| self.with_feedbacks(p)).collect(),
            feedbacks: self.feedbacks.clone(),
        }
    }

    pub fn poll_count(&self) -> usize {
        self.polls.len()
    }

    pub fn feedback_count(&self) -> usize {
        self.feedbacks.len()
    }

    fn with_feedbacks(&self, poll: &LocalPoll) -> LocalPoll {
        let mut out = poll.clone();
        out.feedbacks = self
            .feedbacks
            .iter()
            .filter(|f| f.poll_id == poll.id)
            .cloned()
            .collect();
        out
    }

    fn fresh_id(&self, prefix: &str, at: DateTime<Utc>) -> String {
        loop {
            let id = format!("{prefix}_{}_{}", at.timestamp_millis(), random_suffix());
            let taken = self.polls.iter().any(|p| p.id == id)
                || self.feedbacks.iter().any(|f| f.id == id);
            if !taken {
                return id;
            }
        }
    }

    fn merge_feedback(&mut self, feedback: LocalFeedback) {
        match self.feedbacks.iter_mut().find(|f| f.id == feedback.id) {
            Some(existing) => {
                if existing.tx_hash.is_none() && feedback.tx_hash.is_some() {
                    existing.tx_hash = feedback.tx_hash;
                }
            }
            None => self.feedbacks.push(feedback),
        }
    }

    // -- polls ---------------------------------------------------------------

    pub fn add_poll(&mut self, data: NewPoll) -> String {
        self.add_poll_at(data, Utc::now())
    }

    /// `add_poll` with an explicit creation time.
    pub fn add_poll_at(&mut self, data: NewPoll, created_at: DateTime<Utc>) -> String {
        let id = self.fresh_id("poll", created_at);
        self.polls.push(LocalPoll {
            id: id.clone(),
            contract_id: None,
            title: data.title,
            description: data.description,
            questions: data.questions,
            category: data.category,
            duration: data.duration,
            reward_pool: data.reward_pool,
            reward_per_feedback: data.reward_per_feedback,
            max_feedbacks: data.max_feedbacks,
            creator: data.creator,
            created_at,
            is_active: true,
            tx_hash: None,
            ipfs_hash: None,
            feedbacks: Vec::new(),
        });
        id
    }

    /// Insert a fully formed record, keeping its identifier.
    /// Returns false (and changes nothing) if the identifier is already cached.
    pub fn insert_poll(&mut self, mut poll: LocalPoll) -> bool {
        if self.polls.iter().any(|p| p.id == poll.id) {
            return false;
        }
        for feedback in std::mem::take(&mut poll.feedbacks) {
            self.merge_feedback(feedback);
        }
        self.polls.push(poll);
        true
    }

    /// Attach the chain identifier and creation transaction.
    /// A chain identifier, once set, is never replaced by a different one.
    pub fn update_poll_contract_id(&mut self, local_id: &str, contract_id: u64, tx_hash: &str) {
        let Some(poll) = self.polls.iter_mut().find(|p| p.id == local_id) else {
            return;
        };
        match poll.contract_id {
            Some(existing) if existing != contract_id => {
                log::warn!(
                    "Poll {local_id} already linked to chain poll {existing}, ignoring {contract_id}"
                );
            }
            _ => {
                poll.contract_id = Some(contract_id);
                poll.tx_hash = Some(tx_hash.to_string());
            }
        }
    }

    pub fn update_poll_ipfs_hash(&mut self, local_id: &str, ipfs_hash: &str) {
        if let Some(poll) = self.polls.iter_mut().find(|p| p.id == local_id) {
            poll.ipfs_hash = Some(ipfs_hash.to_string());
        }
    }

    pub fn get_poll_by_id(&self, id: &str) -> Option<LocalPoll> {
        self.polls
            .iter()
            .find(|p| p.id == id)
            .map(|p| self.with_feedbacks(p))
    }

    pub fn get_poll_by_contract_id(&self, contract_id: u64) -> Option<LocalPoll> {
        self.polls
            .iter()
            .find(|p| p.contract_id == Some(contract_id))
            .map(|p| self.with_feedbacks(p))
    }

    /// Case-insensitive creator match, newest first.
    pub fn get_polls_by_creator(&self, creator: &str) -> Vec<LocalPoll> {
        let mut polls: Vec<LocalPoll> = self
            .polls
            .iter()
            .filter(|p| p.is_created_by(creator))
            .map(|p| self.with_feedbacks(p))
            .collect();
        newest_first(&mut polls, |p| p.created_at);
        polls
    }

    pub fn get_all_polls(&self) -> Vec<LocalPoll> {
        let mut polls: Vec<LocalPoll> = self.polls.iter().map(|p| self.with_feedbacks(p)).collect();
        newest_first(&mut polls, |p| p.created_at);
        polls
    }

    // -- feedback ------------------------------------------------------------

    /// Record a submission. The owning poll is not checked: feedback for an
    /// uncached poll id is kept in the flat list and simply never shows up
    /// under any poll.
    pub fn add_feedback(&mut self, data: NewFeedback) -> String {
        self.add_feedback_at(data, Utc::now())
    }

    pub fn add_feedback_at(&mut self, data: NewFeedback, created_at: DateTime<Utc>) -> String {
        let id = self.fresh_id("feedback", created_at);
        self.feedbacks.push(LocalFeedback {
            id: id.clone(),
            poll_id: data.poll_id,
            poll_contract_id: data.poll_contract_id,
            respondent: data.respondent,
            responses: data.responses,
            created_at,
            tx_hash: None,
            reward_amount: data.reward_amount,
        });
        id
    }

    pub fn update_feedback_tx_hash(&mut self, feedback_id: &str, tx_hash: &str) {
        if let Some(feedback) = self.feedbacks.iter_mut().find(|f| f.id == feedback_id) {
            feedback.tx_hash = Some(tx_hash.to_string());
        }
    }

    pub fn get_feedback_by_id(&self, feedback_id: &str) -> Option<LocalFeedback> {
        self.feedbacks.iter().find(|f| f.id == feedback_id).cloned()
    }

    pub fn get_feedbacks_by_poll(&self, poll_id: &str) -> Vec<LocalFeedback> {
        let mut out: Vec<LocalFeedback> = self
            .feedbacks
            .iter()
            .filter(|f| f.poll_id == poll_id)
            .cloned()
            .collect();
        newest_first(&mut out, |f| f.created_at);
        out
    }

    pub fn get_feedbacks_by_respondent(&self, respondent: &str) -> Vec<LocalFeedback> {
        let mut out: Vec<LocalFeedback> = self
            .feedbacks
            .iter()
            .filter(|f| f.is_from(respondent))
            .cloned()
            .collect();
        newest_first(&mut out, |f| f.created_at);
        out
    }

    // -- utility -------------------------------------------------------------

    pub fn clear_all_data(&mut self) {
        self.polls.clear();
        self.feedbacks.clear();
    }

    /// Seed the demonstration polls, skipping any identifier already cached.
    /// Returns how many polls were added.
    pub fn initialize_mock_polls(&mut self) -> usize {
        seed::mock_polls(Utc::now())
            .into_iter()
            .filter(|poll| self.insert_poll(poll.clone()))
            .count()
    }
}
