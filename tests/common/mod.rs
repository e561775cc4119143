//! Shared test infrastructure for integration tests.
//!
//! # Setup
//! - `setup_state()` - AppState with a temp-dir cache and in-memory clients
//! - `register()` - mark an account as registered on the in-memory ledger
//! - `push_chain_poll()` - pin metadata and append a ledger poll

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tempfile::TempDir;

use validify::clients::{InMemoryLedger, InMemoryMetadataStore, MetadataClient, PollLedger};
use validify::models::{Amount, ChainPollRecord, NewPoll, PollMetadata};
use validify::state::AppState;
use validify::store::LocalPollStore;
use validify::store::drafts::DraftStore;
use validify::store::persist::FileBackend;
use validify::wizard::PollForm;

// ============================================================================
// TEST CONSTANTS
// ============================================================================

pub const ALICE: &str = "0xa11ce00000000000000000000000000000000001";
pub const BOB: &str = "0xb0b0000000000000000000000000000000000002";
pub const CAROL: &str = "0xca7013000000000000000000000000000000c003";

/// 0.001 ETH, the form's default reward per feedback.
pub const MILLI_ETH: u64 = 1_000_000_000_000_000;

// ============================================================================
// STATE SETUP
// ============================================================================

/// Application state backed by a temp directory, with handles to the
/// in-memory clients so tests can arrange ledger and metadata contents.
///
/// `dir` must be kept alive for the cache files to remain valid.
pub struct TestEnv {
    pub dir: TempDir,
    pub state: AppState,
    pub ledger: Arc<InMemoryLedger>,
    pub metadata: Arc<InMemoryMetadataStore>,
}

pub fn setup_state() -> TestEnv {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let ledger = Arc::new(InMemoryLedger::new());
    let metadata = Arc::new(InMemoryMetadataStore::new());
    let state = AppState::new(
        LocalPollStore::new(),
        Some(FileBackend::in_dir(dir.path())),
        DraftStore::open(dir.path()),
        metadata.clone(),
        ledger.clone(),
    );
    TestEnv { dir, state, ledger, metadata }
}

/// Register `account` on the in-memory ledger.
pub async fn register(ledger: &InMemoryLedger, account: &str) {
    ledger
        .register_user(account, "QmTestProfile")
        .await
        .expect("register user");
}

// ============================================================================
// FIXTURES
// ============================================================================

pub fn new_poll(title: &str, creator: &str) -> NewPoll {
    NewPoll {
        title: title.to_string(),
        description: format!("{title} description"),
        questions: vec!["What do you think?".to_string()],
        category: "technology".to_string(),
        duration: 7,
        reward_pool: Amount::from(10 * MILLI_ETH),
        reward_per_feedback: Amount::from(MILLI_ETH),
        max_feedbacks: 10,
        creator: creator.to_string(),
    }
}

pub fn chain_record(creator: &str, received: u64, max: u64) -> ChainPollRecord {
    ChainPollRecord {
        creator: creator.to_string(),
        reward_pool: Amount::from(MILLI_ETH).times(max),
        reward_per_feedback: Amount::from(MILLI_ETH),
        feedbacks_received: received,
        max_feedbacks: max,
        is_active: true,
    }
}

pub fn poll_metadata(title: &str, creator: &str, created_at: DateTime<Utc>) -> PollMetadata {
    PollMetadata {
        title: title.to_string(),
        description: format!("{title} description"),
        questions: vec!["First question?".to_string(), "Second question?".to_string()],
        category: "design".to_string(),
        duration: 14,
        created_at,
        created_by: creator.to_string(),
    }
}

/// Pin a metadata document and append a ledger poll pointing at it.
/// Returns the ledger poll id.
pub async fn push_chain_poll(
    env: &TestEnv,
    record: ChainPollRecord,
    metadata: &PollMetadata,
) -> u64 {
    let document = serde_json::to_value(metadata).expect("encode metadata");
    let hash = env.metadata.upload(&document).await.expect("upload metadata");
    env.ledger.push_poll(record, &hash)
}

/// A poll form that passes every wizard step.
pub fn valid_poll_form() -> PollForm {
    PollForm {
        title: "Remote work tooling".to_string(),
        description: "Which tools keep distributed teams productive?".to_string(),
        questions: vec![
            "Which chat tool do you use?".to_string(),
            "How often do you meet in person?".to_string(),
        ],
        category: "business".to_string(),
        ..PollForm::default()
    }
}
