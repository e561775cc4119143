//! Read/write access to the poll ledger contract.
//!
//! [`PollLedger`] mirrors the contract ABI one method per call. Write calls
//! take the sending account explicitly (the wallet connector signs on its
//! behalf) and return a transaction reference. [`InMemoryLedger`] applies the
//! contract's rules in process and backs demo runs and tests.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use rand::Rng;

use crate::models::rules::calculate_poll_cost;
use crate::models::{Amount, ChainPollRecord, MinimumRequirements, UserAccount};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// The contract rejected the call.
    Reverted(String),
    /// The call did not reach the contract.
    Transport(String),
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerError::Reverted(reason) => write!(f, "execution reverted: {reason}"),
            LedgerError::Transport(e) => write!(f, "ledger transport error: {e}"),
        }
    }
}

impl std::error::Error for LedgerError {}

#[async_trait]
pub trait PollLedger: Send + Sync {
    async fn register_user(&self, sender: &str, profile_hash: &str) -> Result<String, LedgerError>;

    /// `value` is the payment attached to the transaction and must equal
    /// `reward_per_feedback * max_feedbacks`.
    async fn create_poll(
        &self,
        sender: &str,
        data_hash: &str,
        reward_per_feedback: &Amount,
        max_feedbacks: u64,
        value: &Amount,
    ) -> Result<String, LedgerError>;

    async fn submit_feedback(&self, sender: &str, poll_id: u64) -> Result<String, LedgerError>;

    async fn get_poll_details(&self, poll_id: u64) -> Result<ChainPollRecord, LedgerError>;

    async fn get_poll_data_hash(&self, poll_id: u64) -> Result<String, LedgerError>;

    async fn get_user_data(&self, account: &str) -> Result<UserAccount, LedgerError>;

    async fn get_user_profile_hash(&self, account: &str) -> Result<String, LedgerError>;

    async fn has_user_submitted_feedback(
        &self,
        poll_id: u64,
        account: &str,
    ) -> Result<bool, LedgerError>;

    async fn calculate_poll_cost(
        &self,
        reward_per_feedback: &Amount,
        max_feedbacks: u64,
    ) -> Result<Amount, LedgerError>;

    async fn get_minimum_requirements(&self) -> Result<MinimumRequirements, LedgerError>;

    /// Poll identifiers are `1..=total`.
    async fn get_total_polls(&self) -> Result<u64, LedgerError>;
}

// ---------------------------------------------------------------------------
// In-memory ledger
// ---------------------------------------------------------------------------

struct StoredPoll {
    record: ChainPollRecord,
    data_hash: String,
    respondents: HashSet<String>,
}

#[derive(Default)]
struct LedgerState {
    polls: Vec<StoredPoll>,
    users: HashMap<String, UserAccount>,
    minimums: MinimumRequirements,
}

impl LedgerState {
    fn poll(&self, poll_id: u64) -> Result<&StoredPoll, LedgerError> {
        poll_index(poll_id)
            .and_then(|i| self.polls.get(i))
            .ok_or_else(|| LedgerError::Reverted("Poll does not exist".to_string()))
    }

    fn is_registered(&self, account: &str) -> bool {
        self.users
            .get(&account.to_lowercase())
            .is_some_and(|u| u.is_registered)
    }
}

fn poll_index(poll_id: u64) -> Option<usize> {
    poll_id.checked_sub(1).map(|i| i as usize)
}

fn tx_reference() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();
    format!("0x{}", hex::encode(bytes))
}

#[derive(Default)]
pub struct InMemoryLedger {
    state: Mutex<LedgerState>,
    unreadable: Mutex<HashSet<u64>>,
    fail_writes: AtomicBool,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a poll record directly, bypassing registration and payment.
    /// Returns the assigned poll identifier.
    pub fn push_poll(&self, record: ChainPollRecord, data_hash: &str) -> u64 {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.polls.push(StoredPoll {
            record,
            data_hash: data_hash.to_string(),
            respondents: HashSet::new(),
        });
        state.polls.len() as u64
    }

    /// Make reads of one poll fail with a transport error.
    pub fn make_unreadable(&self, poll_id: u64) {
        let mut set = self.unreadable.lock().unwrap_or_else(|e| e.into_inner());
        set.insert(poll_id);
    }

    /// Replace the reward floors the contract enforces and reports.
    pub fn set_minimum_requirements(&self, minimums: MinimumRequirements) {
        self.lock().minimums = minimums;
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_readable(&self, poll_id: u64) -> Result<(), LedgerError> {
        let set = self.unreadable.lock().unwrap_or_else(|e| e.into_inner());
        if set.contains(&poll_id) {
            return Err(LedgerError::Transport(format!("rpc timeout reading poll {poll_id}")));
        }
        Ok(())
    }

    fn check_writable(&self) -> Result<(), LedgerError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(LedgerError::Transport("transaction rejected by wallet".to_string()));
        }
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl PollLedger for InMemoryLedger {
    async fn register_user(&self, sender: &str, profile_hash: &str) -> Result<String, LedgerError> {
        self.check_writable()?;
        let mut state = self.lock();
        let user = state.users.entry(sender.to_lowercase()).or_default();
        if user.is_registered {
            return Err(LedgerError::Reverted("User already registered".to_string()));
        }
        user.is_registered = true;
        user.profile_hash = profile_hash.to_string();
        Ok(tx_reference())
    }

    async fn create_poll(
        &self,
        sender: &str,
        data_hash: &str,
        reward_per_feedback: &Amount,
        max_feedbacks: u64,
        value: &Amount,
    ) -> Result<String, LedgerError> {
        self.check_writable()?;
        let mut state = self.lock();
        if !state.is_registered(sender) {
            return Err(LedgerError::Reverted("User not registered".to_string()));
        }
        if *reward_per_feedback < state.minimums.min_per_feedback {
            return Err(LedgerError::Reverted("Reward per feedback too low".to_string()));
        }
        if max_feedbacks == 0 {
            return Err(LedgerError::Reverted("Max feedbacks must be positive".to_string()));
        }
        let cost = calculate_poll_cost(reward_per_feedback, max_feedbacks);
        if cost <= state.minimums.min_total {
            return Err(LedgerError::Reverted("Total reward too low".to_string()));
        }
        if *value != cost {
            return Err(LedgerError::Reverted("Incorrect payment amount".to_string()));
        }

        state.polls.push(StoredPoll {
            record: ChainPollRecord {
                creator: sender.to_string(),
                reward_pool: cost.clone(),
                reward_per_feedback: reward_per_feedback.clone(),
                feedbacks_received: 0,
                max_feedbacks,
                is_active: true,
            },
            data_hash: data_hash.to_string(),
            respondents: HashSet::new(),
        });
        if let Some(user) = state.users.get_mut(&sender.to_lowercase()) {
            user.total_spent = &user.total_spent + &cost;
        }
        Ok(tx_reference())
    }

    async fn submit_feedback(&self, sender: &str, poll_id: u64) -> Result<String, LedgerError> {
        self.check_writable()?;
        let mut state = self.lock();
        if !state.is_registered(sender) {
            return Err(LedgerError::Reverted("User not registered".to_string()));
        }
        let key = sender.to_lowercase();
        let reward = {
            let poll = state.poll(poll_id)?;
            if poll.record.is_created_by(sender) {
                return Err(LedgerError::Reverted("Cannot respond to own poll".to_string()));
            }
            if !poll.record.is_active {
                return Err(LedgerError::Reverted("Poll is not active".to_string()));
            }
            if poll.respondents.contains(&key) {
                return Err(LedgerError::Reverted("Already submitted feedback".to_string()));
            }
            if poll.record.feedbacks_received >= poll.record.max_feedbacks {
                return Err(LedgerError::Reverted("Poll is full".to_string()));
            }
            poll.record.reward_per_feedback.clone()
        };

        if let Some(poll) = poll_index(poll_id).and_then(|i| state.polls.get_mut(i)) {
            poll.respondents.insert(key.clone());
            poll.record.feedbacks_received += 1;
            poll.record.reward_pool = poll.record.reward_pool.saturating_sub(&reward);
            if poll.record.feedbacks_received >= poll.record.max_feedbacks {
                poll.record.is_active = false;
            }
        }
        if let Some(user) = state.users.get_mut(&key) {
            user.total_earned = &user.total_earned + &reward;
        }
        Ok(tx_reference())
    }

    async fn get_poll_details(&self, poll_id: u64) -> Result<ChainPollRecord, LedgerError> {
        self.check_readable(poll_id)?;
        Ok(self.lock().poll(poll_id)?.record.clone())
    }

    async fn get_poll_data_hash(&self, poll_id: u64) -> Result<String, LedgerError> {
        self.check_readable(poll_id)?;
        Ok(self.lock().poll(poll_id)?.data_hash.clone())
    }

    async fn get_user_data(&self, account: &str) -> Result<UserAccount, LedgerError> {
        Ok(self
            .lock()
            .users
            .get(&account.to_lowercase())
            .cloned()
            .unwrap_or_default())
    }

    async fn get_user_profile_hash(&self, account: &str) -> Result<String, LedgerError> {
        Ok(self.get_user_data(account).await?.profile_hash)
    }

    async fn has_user_submitted_feedback(
        &self,
        poll_id: u64,
        account: &str,
    ) -> Result<bool, LedgerError> {
        self.check_readable(poll_id)?;
        Ok(self
            .lock()
            .poll(poll_id)?
            .respondents
            .contains(&account.to_lowercase()))
    }

    async fn calculate_poll_cost(
        &self,
        reward_per_feedback: &Amount,
        max_feedbacks: u64,
    ) -> Result<Amount, LedgerError> {
        Ok(calculate_poll_cost(reward_per_feedback, max_feedbacks))
    }

    async fn get_minimum_requirements(&self) -> Result<MinimumRequirements, LedgerError> {
        Ok(self.lock().minimums.clone())
    }

    async fn get_total_polls(&self) -> Result<u64, LedgerError> {
        Ok(self.lock().polls.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE: &str = "0xA11CE00000000000000000000000000000000001";
    const BOB: &str = "0xB0B0000000000000000000000000000000000002";

    fn wei(v: u64) -> Amount {
        Amount::from(v)
    }

    #[tokio::test]
    async fn create_requires_registration_and_exact_payment() {
        let ledger = InMemoryLedger::new();
        let per = wei(1_000_000_000_000_000);
        let err = ledger.create_poll(ALICE, "QmA", &per, 5, &per.times(5)).await;
        assert_eq!(err, Err(LedgerError::Reverted("User not registered".into())));

        ledger.register_user(ALICE, "QmProfile").await.unwrap();
        let err = ledger.create_poll(ALICE, "QmA", &per, 5, &per).await;
        assert_eq!(err, Err(LedgerError::Reverted("Incorrect payment amount".into())));

        let tx = ledger.create_poll(ALICE, "QmA", &per, 5, &per.times(5)).await.unwrap();
        assert!(tx.starts_with("0x") && tx.len() == 66);
        assert_eq!(ledger.get_total_polls().await.unwrap(), 1);
        assert_eq!(ledger.get_poll_data_hash(1).await.unwrap(), "QmA");
        let user = ledger.get_user_data(&ALICE.to_lowercase()).await.unwrap();
        assert_eq!(user.total_spent, per.times(5));
    }

    #[tokio::test]
    async fn feedback_pays_respondent_and_closes_full_poll() {
        let ledger = InMemoryLedger::new();
        let per = wei(1_000_000_000_000_000);
        ledger.register_user(ALICE, "QmA").await.unwrap();
        ledger.register_user(BOB, "QmB").await.unwrap();
        ledger.create_poll(ALICE, "QmP", &per, 2, &per.times(2)).await.unwrap();

        assert!(ledger.submit_feedback(ALICE, 1).await.is_err());
        ledger.submit_feedback(BOB, 1).await.unwrap();
        assert_eq!(
            ledger.submit_feedback(BOB, 1).await,
            Err(LedgerError::Reverted("Already submitted feedback".into()))
        );
        assert!(ledger.has_user_submitted_feedback(1, BOB).await.unwrap());
        let bob = ledger.get_user_data(BOB).await.unwrap();
        assert_eq!(bob.total_earned, per);

        let details = ledger.get_poll_details(1).await.unwrap();
        assert_eq!(details.feedbacks_received, 1);
        assert_eq!(details.reward_pool, per);
        assert!(details.is_active);
    }

    #[tokio::test]
    async fn contract_reads_follow_configured_minimums() {
        let ledger = InMemoryLedger::new();
        assert_eq!(
            ledger.get_minimum_requirements().await.unwrap(),
            MinimumRequirements::default()
        );
        let per = wei(1_000_000_000_000_000);
        assert_eq!(ledger.calculate_poll_cost(&per, 4).await.unwrap(), per.times(4));

        ledger.register_user(ALICE, "QmProfileA").await.unwrap();
        assert_eq!(ledger.get_user_profile_hash(&ALICE.to_lowercase()).await.unwrap(), "QmProfileA");
        assert_eq!(ledger.get_user_profile_hash(BOB).await.unwrap(), "");

        ledger.set_minimum_requirements(MinimumRequirements {
            min_total: wei(0),
            min_per_feedback: wei(2_000_000_000_000_000),
        });
        let err = ledger.create_poll(ALICE, "QmA", &per, 4, &per.times(4)).await;
        assert_eq!(err, Err(LedgerError::Reverted("Reward per feedback too low".into())));
    }

    #[tokio::test]
    async fn unknown_poll_and_unreadable_poll() {
        let ledger = InMemoryLedger::new();
        assert!(matches!(ledger.get_poll_details(0).await, Err(LedgerError::Reverted(_))));
        assert!(matches!(ledger.get_poll_details(3).await, Err(LedgerError::Reverted(_))));
        ledger.push_poll(
            ChainPollRecord {
                creator: ALICE.into(),
                reward_pool: wei(0),
                reward_per_feedback: wei(0),
                feedbacks_received: 0,
                max_feedbacks: 0,
                is_active: true,
            },
            "QmX",
        );
        ledger.make_unreadable(1);
        assert!(matches!(ledger.get_poll_details(1).await, Err(LedgerError::Transport(_))));
    }
}
