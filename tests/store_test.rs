/// Integration tests for the local poll cache and its on-disk file.
///
/// Covers identifier uniqueness, creator/respondent queries, chain linking,
/// write-through persistence via `AppState`, and legacy layout migration.

use std::collections::HashSet;

use chrono::{Duration, Utc};

use validify::models::{Amount, NewFeedback};
use validify::store::LocalPollStore;
use validify::store::persist::{FileBackend, SCHEMA_VERSION, STORE_FILE};

mod common;
use common::{ALICE, BOB, new_poll, setup_state};

fn feedback(poll_id: &str, respondent: &str) -> NewFeedback {
    NewFeedback {
        poll_id: poll_id.to_string(),
        poll_contract_id: None,
        respondent: respondent.to_string(),
        responses: vec!["Yes".to_string()],
        reward_amount: Amount::from(1_000u64),
    }
}

// ---------------------------------------------------------------------------
// Identifiers and queries
// ---------------------------------------------------------------------------

#[test]
fn test_poll_ids_unique_at_same_instant() {
    let mut store = LocalPollStore::new();
    let at = Utc::now();
    let ids: HashSet<String> = (0..500)
        .map(|i| store.add_poll_at(new_poll(&format!("Poll {i}"), ALICE), at))
        .collect();
    assert_eq!(ids.len(), 500);
    assert!(ids.iter().all(|id| id.starts_with("poll_")));
}

#[test]
fn test_polls_by_creator_ignores_case_and_sorts_newest_first() {
    let mut store = LocalPollStore::new();
    let t1 = Utc::now() - Duration::hours(2);
    let t2 = Utc::now();
    let older = store.add_poll_at(new_poll("Older poll", ALICE), t1);
    let newer = store.add_poll_at(new_poll("Newer poll", &ALICE.to_uppercase().replace("0X", "0x")), t2);
    store.add_poll_at(new_poll("Someone else", BOB), t2);

    let mine = store.get_polls_by_creator(ALICE);
    let ids: Vec<&str> = mine.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec![newer.as_str(), older.as_str()]);

    let all = store.get_all_polls();
    assert_eq!(all.len(), 3);
    assert_eq!(all[2].id, older);
}

#[test]
fn test_contract_id_link_visible_by_both_ids() {
    let mut store = LocalPollStore::new();
    let id = store.add_poll(new_poll("Linked poll", ALICE));
    store.update_poll_contract_id(&id, 7, "0xabc");

    let by_local = store.get_poll_by_id(&id).expect("poll by local id");
    assert_eq!(by_local.contract_id, Some(7));
    assert_eq!(by_local.tx_hash.as_deref(), Some("0xabc"));

    let by_chain = store.get_poll_by_contract_id(7).expect("poll by chain id");
    assert_eq!(by_chain.id, id);
    assert!(store.get_poll_by_contract_id(8).is_none());
}

#[test]
fn test_feedback_tx_hash_visible_through_poll_and_flat_list() {
    let mut store = LocalPollStore::new();
    let poll_id = store.add_poll(new_poll("Poll with feedback", ALICE));
    let fb = store.add_feedback(feedback(&poll_id, BOB));
    store.update_feedback_tx_hash(&fb, "0xfeed");

    let flat = store.get_feedback_by_id(&fb).expect("flat feedback");
    assert_eq!(flat.tx_hash.as_deref(), Some("0xfeed"));

    let poll = store.get_poll_by_id(&poll_id).expect("poll");
    assert_eq!(poll.feedbacks.len(), 1);
    assert_eq!(poll.feedbacks[0].tx_hash.as_deref(), Some("0xfeed"));

    assert_eq!(store.get_feedbacks_by_respondent(&BOB.to_uppercase().replace("0X", "0x")).len(), 1);
}

#[test]
fn test_clear_all_data_then_reseed() {
    let mut store = LocalPollStore::new();
    store.add_poll(new_poll("Temporary", ALICE));
    assert_eq!(store.initialize_mock_polls(), 3);
    store.clear_all_data();
    assert_eq!(store.poll_count(), 0);
    assert_eq!(store.feedback_count(), 0);
    assert_eq!(store.initialize_mock_polls(), 3);
    assert_eq!(store.initialize_mock_polls(), 0);
}

// ---------------------------------------------------------------------------
// Persistence through AppState
// ---------------------------------------------------------------------------

#[test]
fn test_mutations_write_through_to_disk() {
    let env = setup_state();
    let poll_id = env.state.mutate_store(|s| s.add_poll(new_poll("Persisted poll", ALICE)));
    let fb = env.state.mutate_store(|s| s.add_feedback(feedback(&poll_id, BOB)));
    env.state.mutate_store(|s| s.update_feedback_tx_hash(&fb, "0x01"));

    let backend = FileBackend::in_dir(env.dir.path());
    let (snapshot, report) = backend.load().expect("load cache file");
    assert!(report.migrated_from.is_none());
    assert!(report.rejected.is_empty());
    assert_eq!(snapshot, env.state.snapshot());

    let reloaded = LocalPollStore::from_snapshot(snapshot);
    let poll = reloaded.get_poll_by_id(&poll_id).expect("reloaded poll");
    assert_eq!(poll.feedbacks[0].tx_hash.as_deref(), Some("0x01"));
}

#[test]
fn test_cache_file_carries_schema_version() {
    let env = setup_state();
    env.state.mutate_store(|s| s.add_poll(new_poll("Versioned", ALICE)));
    let text = std::fs::read_to_string(env.dir.path().join(STORE_FILE)).expect("read cache file");
    let value: serde_json::Value = serde_json::from_str(&text).expect("cache file is JSON");
    assert_eq!(value["version"], SCHEMA_VERSION);
    assert_eq!(value["polls"].as_array().map(Vec::len), Some(1));
}

#[test]
fn test_unversioned_file_is_migrated_and_bad_records_rejected() {
    let dir = tempfile::TempDir::new().expect("temp dir");
    let legacy = serde_json::json!({
        "polls": [
            {
                "id": "poll_1",
                "title": "Legacy poll",
                "description": "Saved before the file was versioned",
                "questions": ["Q1"],
                "category": "other",
                "duration": 7,
                "rewardPool": "10000000000000000",
                "rewardPerFeedback": "1000000000000000",
                "maxFeedbacks": 10,
                "creator": ALICE,
                "createdAt": "2024-01-01T00:00:00Z",
                "isActive": true,
                "feedbacks": []
            },
            { "id": 42 }
        ],
        "feedbacks": []
    });
    std::fs::write(dir.path().join(STORE_FILE), legacy.to_string()).expect("write legacy file");

    let (snapshot, report) = FileBackend::in_dir(dir.path()).load().expect("load legacy file");
    assert_eq!(report.migrated_from, Some(0));
    assert_eq!(report.rejected.len(), 1);
    assert_eq!(report.rejected[0].kind, "poll");
    assert_eq!(report.rejected[0].index, 1);
    assert_eq!(snapshot.polls.len(), 1);
    assert_eq!(snapshot.polls[0].title, "Legacy poll");
}
