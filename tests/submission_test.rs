/// Integration tests for the create-poll, feedback and profile flows.
///
/// The cache write always happens first; metadata and ledger failures are
/// reported as notices without undoing it.

use chrono::Utc;

use validify::clients::PollLedger;
use validify::errors::AppError;
use validify::submission::{NoticeLevel, register_profile, submit_feedback, submit_poll};
use validify::wizard::ProfileForm;

mod common;
use common::{
    ALICE, BOB, CAROL, MILLI_ETH, chain_record, new_poll, poll_metadata, push_chain_poll, register,
    setup_state, valid_poll_form,
};

fn answers(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("Answer {i}")).collect()
}

// ---------------------------------------------------------------------------
// Create poll
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_submit_poll_links_cache_entry_to_ledger() {
    let env = setup_state();
    register(&env.ledger, ALICE).await;

    let out = submit_poll(&env.state, ALICE, &valid_poll_form())
        .await
        .expect("submit poll");

    assert_eq!(out.contract_id, Some(1));
    assert!(out.tx_hash.is_some());
    assert!(out.ipfs_hash.is_some());
    assert!(out.notices.iter().all(|n| n.level != NoticeLevel::Error));

    let cached = env
        .state
        .read_store(|s| s.get_poll_by_id(&out.local_id))
        .expect("cached poll");
    assert_eq!(cached.contract_id, Some(1));
    assert_eq!(cached.tx_hash, out.tx_hash);
    assert_eq!(cached.ipfs_hash, out.ipfs_hash);

    let hash = env.ledger.get_poll_data_hash(1).await.expect("ledger hash");
    assert_eq!(Some(hash), out.ipfs_hash);
    let user = env.ledger.get_user_data(ALICE).await.expect("user data");
    assert_eq!(user.total_spent.to_string(), (10 * MILLI_ETH).to_string());
    let priced = env
        .ledger
        .calculate_poll_cost(&cached.reward_per_feedback, cached.max_feedbacks)
        .await
        .expect("cost read");
    assert_eq!(priced, user.total_spent);
}

#[tokio::test]
async fn test_submit_poll_keeps_cache_entry_when_ledger_rejects() {
    let env = setup_state();

    let out = submit_poll(&env.state, ALICE, &valid_poll_form())
        .await
        .expect("submit poll");

    assert_eq!(out.contract_id, None);
    assert!(out.tx_hash.is_none());
    assert!(out.notices.iter().any(|n| n.level == NoticeLevel::Error));
    let cached = env
        .state
        .read_store(|s| s.get_poll_by_id(&out.local_id))
        .expect("cached poll");
    assert_eq!(cached.contract_id, None);
    assert_eq!(env.ledger.get_total_polls().await.expect("total"), 0);
}

#[tokio::test]
async fn test_submit_poll_continues_after_metadata_upload_failure() {
    let env = setup_state();
    register(&env.ledger, ALICE).await;
    env.metadata.set_fail_uploads(true);

    let out = submit_poll(&env.state, ALICE, &valid_poll_form())
        .await
        .expect("submit poll");

    assert!(out.ipfs_hash.is_none());
    assert!(out.notices.iter().any(|n| n.level == NoticeLevel::Error));
    assert_eq!(out.contract_id, Some(1));
    assert_eq!(env.ledger.get_poll_data_hash(1).await.expect("ledger hash"), "");
}

// ---------------------------------------------------------------------------
// Feedback
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_feedback_on_chain_poll_recorded_in_both_places() {
    let env = setup_state();
    register(&env.ledger, BOB).await;
    let chain_id = push_chain_poll(&env, chain_record(ALICE, 0, 3), &poll_metadata("Chain poll", ALICE, Utc::now())).await;
    let view_id = format!("blockchain_{chain_id}");

    let out = submit_feedback(&env.state, BOB, &view_id, answers(2))
        .await
        .expect("submit feedback");
    assert!(out.tx_hash.is_some());

    let cached = env
        .state
        .read_store(|s| s.get_feedback_by_id(&out.feedback_id))
        .expect("cached feedback");
    assert_eq!(cached.poll_contract_id, Some(chain_id));
    assert_eq!(cached.tx_hash, out.tx_hash);
    assert!(env.ledger.has_user_submitted_feedback(chain_id, BOB).await.expect("check"));

    let again = submit_feedback(&env.state, BOB, &view_id, answers(2)).await;
    assert!(matches!(again, Err(AppError::Rejected(_))));
}

#[tokio::test]
async fn test_feedback_on_own_poll_rejected() {
    let env = setup_state();
    let poll_id = env.state.mutate_store(|s| s.add_poll(new_poll("Mine", ALICE)));

    let err = submit_feedback(&env.state, &ALICE.to_uppercase().replace("0X", "0x"), &poll_id, answers(1))
        .await
        .expect_err("own poll");
    assert!(matches!(err, AppError::Rejected(_)));
    assert_eq!(env.state.read_store(|s| s.feedback_count()), 0);
}

#[tokio::test]
async fn test_feedback_requires_every_answer() {
    let env = setup_state();
    let poll_id = env.state.mutate_store(|s| s.add_poll(new_poll("Needs answers", ALICE)));

    let err = submit_feedback(&env.state, BOB, &poll_id, vec!["Yes".to_string(), "  ".to_string()])
        .await
        .expect_err("blank answer");
    assert!(matches!(err, AppError::Validation(ref fields) if fields.contains_key("responses")));
}

#[tokio::test]
async fn test_feedback_on_cached_poll_stays_local() {
    let env = setup_state();
    let poll_id = env.state.mutate_store(|s| s.add_poll(new_poll("Cached only", ALICE)));

    let out = submit_feedback(&env.state, BOB, &poll_id, answers(1))
        .await
        .expect("submit feedback");
    assert!(out.tx_hash.is_none());
    assert_eq!(out.poll_id, poll_id);

    let poll = env.state.read_store(|s| s.get_poll_by_id(&poll_id)).expect("poll");
    assert_eq!(poll.feedbacks.len(), 1);

    let again = submit_feedback(&env.state, BOB, &poll_id, answers(1)).await;
    assert!(matches!(again, Err(AppError::Rejected(_))));
}

#[tokio::test]
async fn test_demo_poll_feedback_never_reaches_new_ledger_poll() {
    let env = setup_state();
    env.state.mutate_store(|s| s.initialize_mock_polls());
    register(&env.ledger, ALICE).await;
    register(&env.ledger, BOB).await;

    let created = submit_poll(&env.state, ALICE, &valid_poll_form())
        .await
        .expect("submit poll");
    assert_eq!(created.contract_id, Some(1));

    let out = submit_feedback(&env.state, BOB, "mock_poll_1", answers(4))
        .await
        .expect("submit feedback");
    assert!(out.tx_hash.is_none());
    assert_eq!(out.poll_id, "mock_poll_1");

    let details = env.ledger.get_poll_details(1).await.expect("ledger poll");
    assert_eq!(details.feedbacks_received, 0);
    let bob = env.ledger.get_user_data(BOB).await.expect("user data");
    assert!(bob.total_earned.is_zero());
}

#[tokio::test]
async fn test_feedback_on_foreign_ledger_claim_stays_local() {
    let env = setup_state();
    register(&env.ledger, CAROL).await;
    let chain_id = push_chain_poll(&env, chain_record(ALICE, 0, 3), &poll_metadata("Alice chain", ALICE, Utc::now())).await;
    let poll_id = env.state.mutate_store(|s| {
        let id = s.add_poll(new_poll("Bob cached", BOB));
        s.update_poll_contract_id(&id, chain_id, "0xstale");
        id
    });

    let out = submit_feedback(&env.state, CAROL, &poll_id, answers(1))
        .await
        .expect("submit feedback");
    assert!(out.tx_hash.is_none());
    let cached = env
        .state
        .read_store(|s| s.get_feedback_by_id(&out.feedback_id))
        .expect("cached feedback");
    assert_eq!(cached.poll_contract_id, None);
    assert!(!env.ledger.has_user_submitted_feedback(chain_id, CAROL).await.expect("check"));
}

#[tokio::test]
async fn test_feedback_on_full_poll_rejected() {
    let env = setup_state();
    let chain_id = push_chain_poll(&env, chain_record(ALICE, 3, 3), &poll_metadata("Full poll", ALICE, Utc::now())).await;

    let err = submit_feedback(&env.state, BOB, &format!("blockchain_{chain_id}"), answers(1))
        .await
        .expect_err("full poll");
    assert!(matches!(err, AppError::Rejected(_)));
}

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_register_profile_once() {
    let env = setup_state();
    let form = ProfileForm {
        full_name: "Bob Builder".to_string(),
        email: "bob@example.com".to_string(),
        age: Some(40),
        location: "Oslo".to_string(),
        occupation: "Engineer".to_string(),
        industries: vec!["Technology".to_string()],
        survey_frequency: "weekly".to_string(),
        ..ProfileForm::default()
    };

    let out = register_profile(&env.state, BOB, &form).await.expect("register");
    let user = env.ledger.get_user_data(BOB).await.expect("user data");
    assert!(user.is_registered);
    assert_eq!(user.profile_hash, out.profile_hash);

    let again = register_profile(&env.state, BOB, &form).await;
    assert!(matches!(again, Err(AppError::Rejected(_))));
}
