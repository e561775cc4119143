/// Integration tests for poll reconciliation across the cache and the ledger.
///
/// Each test arranges cached polls, ledger records and pinned metadata, then
/// checks the merged listing or single-poll view the handlers serve.

use chrono::{Duration, Utc};

use validify::errors::AppError;
use validify::reconcile::{
    BrowseFilter, CombinedPollView, LinkStatus, ListingMode, PollKind, StatusFilter, load_listing,
    load_poll,
};

mod common;
use common::{ALICE, BOB, CAROL, chain_record, new_poll, poll_metadata, push_chain_poll, register, setup_state};

fn ids(views: &[CombinedPollView]) -> Vec<&str> {
    views.iter().map(|v| v.id.as_str()).collect()
}

// ---------------------------------------------------------------------------
// Listings
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_linked_cached_poll_listed_once_as_combined() {
    let env = setup_state();
    let meta = poll_metadata("Chain title", ALICE, Utc::now());
    let chain_id = push_chain_poll(&env, chain_record(ALICE, 2, 5), &meta).await;
    let local_id = env.state.mutate_store(|s| {
        let id = s.add_poll(new_poll("Local title", ALICE));
        s.update_poll_contract_id(&id, chain_id, "0xtx");
        id
    });

    let listing = load_listing(
        env.state.all_polls(),
        env.ledger.as_ref(),
        env.metadata.as_ref(),
        ListingMode::Browse { viewer: None },
    )
    .await;

    assert_eq!(listing.polls.len(), 1);
    let view = &listing.polls[0];
    assert_eq!(view.id, local_id);
    assert_eq!(view.kind(), PollKind::Combined);
    assert_eq!(view.link_status(), LinkStatus::Confirmed(chain_id));
    assert_eq!(view.title(), "Local title");
    assert_eq!(view.chain_id(), Some(chain_id));
}

#[tokio::test]
async fn test_unreadable_ledger_poll_skipped_others_listed() {
    let env = setup_state();
    let now = Utc::now();
    for i in 0..3 {
        let meta = poll_metadata(&format!("Chain poll {i}"), ALICE, now - Duration::hours(i));
        push_chain_poll(&env, chain_record(ALICE, 0, 5), &meta).await;
    }
    env.ledger.make_unreadable(2);

    let listing = load_listing(
        Vec::new(),
        env.ledger.as_ref(),
        env.metadata.as_ref(),
        ListingMode::Browse { viewer: None },
    )
    .await;

    assert_eq!(ids(&listing.polls), vec!["blockchain_1", "blockchain_3"]);
    assert_eq!(listing.skipped.len(), 1);
    assert_eq!(listing.skipped[0].chain_id, 2);
    assert!(listing.chain_error.is_none());
}

#[tokio::test]
async fn test_browse_excludes_viewer_polls_in_both_sources() {
    let env = setup_state();
    let now = Utc::now();
    push_chain_poll(&env, chain_record(ALICE, 0, 5), &poll_metadata("Alice chain", ALICE, now)).await;
    push_chain_poll(&env, chain_record(BOB, 0, 5), &poll_metadata("Bob chain", BOB, now)).await;
    env.state.mutate_store(|s| {
        s.add_poll(new_poll("Alice cached", &ALICE.to_uppercase().replace("0X", "0x")));
        s.add_poll(new_poll("Carol cached", CAROL));
    });

    let listing = load_listing(
        env.state.all_polls(),
        env.ledger.as_ref(),
        env.metadata.as_ref(),
        ListingMode::Browse { viewer: Some(ALICE) },
    )
    .await;

    let titles: Vec<String> = listing.polls.iter().map(|v| v.title()).collect();
    assert_eq!(titles.len(), 2);
    assert!(titles.contains(&"Bob chain".to_string()));
    assert!(titles.contains(&"Carol cached".to_string()));
}

#[tokio::test]
async fn test_listing_sorted_newest_first_across_sources() {
    let env = setup_state();
    let t1 = Utc::now() - Duration::days(3);
    let t2 = Utc::now() - Duration::days(1);
    let local_id = env.state.mutate_store(|s| s.add_poll_at(new_poll("Older cached", BOB), t1));
    push_chain_poll(&env, chain_record(CAROL, 0, 5), &poll_metadata("Newer chain", CAROL, t2)).await;

    let listing = load_listing(
        env.state.all_polls(),
        env.ledger.as_ref(),
        env.metadata.as_ref(),
        ListingMode::Browse { viewer: None },
    )
    .await;

    assert_eq!(ids(&listing.polls), vec!["blockchain_1", local_id.as_str()]);
}

#[tokio::test]
async fn test_metadata_outage_falls_back_to_placeholders() {
    let env = setup_state();
    push_chain_poll(&env, chain_record(BOB, 1, 4), &poll_metadata("Hidden", BOB, Utc::now())).await;
    env.metadata.set_fail_fetches(true);

    let listing = load_listing(
        Vec::new(),
        env.ledger.as_ref(),
        env.metadata.as_ref(),
        ListingMode::Browse { viewer: None },
    )
    .await;

    assert_eq!(listing.polls.len(), 1);
    let view = &listing.polls[0];
    assert_eq!(view.title(), "Poll #1");
    assert_eq!(view.description(), "No description available");
    assert_eq!(view.category(), "Other");
    assert!(view.created_at().is_none());
    assert_eq!(view.progress().received, 1);
}

#[tokio::test]
async fn test_stale_chain_link_surfaces_as_unconfirmed() {
    let env = setup_state();
    let local_id = env.state.mutate_store(|s| {
        let id = s.add_poll(new_poll("Stale link", ALICE));
        s.update_poll_contract_id(&id, 99, "0xgone");
        id
    });

    let listing = load_listing(
        env.state.all_polls(),
        env.ledger.as_ref(),
        env.metadata.as_ref(),
        ListingMode::Browse { viewer: None },
    )
    .await;

    assert_eq!(ids(&listing.polls), vec![local_id.as_str()]);
    assert_eq!(listing.polls[0].kind(), PollKind::Local);
    assert_eq!(listing.polls[0].link_status(), LinkStatus::Unconfirmed(99));
    assert_eq!(listing.polls[0].chain_id(), None);
}

#[tokio::test]
async fn test_two_cached_polls_claiming_one_ledger_id() {
    let env = setup_state();
    let chain_id = push_chain_poll(&env, chain_record(ALICE, 0, 5), &poll_metadata("Alice chain", ALICE, Utc::now())).await;
    let (impostor, owner) = env.state.mutate_store(|s| {
        let impostor = s.add_poll(new_poll("Demo poll", BOB));
        s.update_poll_contract_id(&impostor, chain_id, "0xdemo");
        let owner = s.add_poll(new_poll("Alice cached", ALICE));
        s.update_poll_contract_id(&owner, chain_id, "0xreal");
        (impostor, owner)
    });

    let listing = load_listing(
        env.state.all_polls(),
        env.ledger.as_ref(),
        env.metadata.as_ref(),
        ListingMode::Browse { viewer: None },
    )
    .await;

    assert_eq!(listing.polls.len(), 2);
    let by_id = |id: &str| listing.polls.iter().find(|v| v.id == id).expect("view listed");
    assert_eq!(by_id(&owner).link_status(), LinkStatus::Confirmed(chain_id));
    assert_eq!(by_id(&impostor).kind(), PollKind::Local);
    assert_eq!(by_id(&impostor).link_status(), LinkStatus::Unconfirmed(chain_id));
    assert_eq!(by_id(&impostor).chain_id(), None);

    let local = env.state.all_polls();
    let view = load_poll(&impostor, &local, env.ledger.as_ref(), env.metadata.as_ref())
        .await
        .expect("load impostor");
    assert_eq!(view.kind(), PollKind::Local);
    assert_eq!(view.creator(), Some(BOB));

    let view = load_poll(&format!("blockchain_{chain_id}"), &local, env.ledger.as_ref(), env.metadata.as_ref())
        .await
        .expect("load by chain id");
    assert_eq!(view.id, owner);
}

#[tokio::test]
async fn test_cached_claim_with_wrong_metadata_hash_not_linked() {
    let env = setup_state();
    let chain_id = push_chain_poll(&env, chain_record(ALICE, 0, 5), &poll_metadata("Alice chain", ALICE, Utc::now())).await;
    env.state.mutate_store(|s| {
        let id = s.add_poll(new_poll("Same creator, other poll", ALICE));
        s.update_poll_ipfs_hash(&id, "QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG");
        s.update_poll_contract_id(&id, chain_id, "0xtx");
    });

    let listing = load_listing(
        env.state.all_polls(),
        env.ledger.as_ref(),
        env.metadata.as_ref(),
        ListingMode::Browse { viewer: None },
    )
    .await;

    assert_eq!(listing.polls.len(), 2);
    assert!(listing.polls.iter().all(|v| v.kind() != PollKind::Combined));
    assert!(listing.polls.iter().any(|v| v.link_status() == LinkStatus::Unconfirmed(chain_id)));
}

#[tokio::test]
async fn test_malformed_ledger_hash_not_fetched() {
    let env = setup_state();
    let document = serde_json::to_value(poll_metadata("Should not load", BOB, Utc::now())).expect("encode");
    env.metadata.insert("not-a-cid", document);
    env.ledger.push_poll(chain_record(BOB, 0, 5), "not-a-cid");

    let listing = load_listing(
        Vec::new(),
        env.ledger.as_ref(),
        env.metadata.as_ref(),
        ListingMode::Browse { viewer: None },
    )
    .await;

    assert_eq!(listing.polls.len(), 1);
    assert_eq!(listing.polls[0].title(), "Poll #1");
    assert!(listing.skipped.is_empty());
}

#[tokio::test]
async fn test_dashboard_reads_ledger_only_for_registered_viewer() {
    let env = setup_state();
    let now = Utc::now();
    push_chain_poll(&env, chain_record(ALICE, 0, 5), &poll_metadata("Alice chain", ALICE, now)).await;
    env.state.mutate_store(|s| {
        s.add_poll(new_poll("Alice cached", ALICE));
        s.add_poll(new_poll("Bob cached", BOB));
    });

    let before = load_listing(
        env.state.all_polls(),
        env.ledger.as_ref(),
        env.metadata.as_ref(),
        ListingMode::Dashboard { viewer: ALICE },
    )
    .await;
    assert_eq!(before.polls.len(), 1);
    assert_eq!(before.polls[0].title(), "Alice cached");

    register(&env.ledger, ALICE).await;
    let after = load_listing(
        env.state.all_polls(),
        env.ledger.as_ref(),
        env.metadata.as_ref(),
        ListingMode::Dashboard { viewer: ALICE },
    )
    .await;
    assert_eq!(after.polls.len(), 2);
    assert!(after.polls.iter().all(|v| v.is_created_by(ALICE)));
}

#[tokio::test]
async fn test_progress_percentage_bounded() {
    let env = setup_state();
    push_chain_poll(&env, chain_record(BOB, 7, 5), &poll_metadata("Overfull", BOB, Utc::now())).await;
    push_chain_poll(&env, chain_record(BOB, 0, 0), &poll_metadata("Empty", BOB, Utc::now())).await;

    let listing = load_listing(
        Vec::new(),
        env.ledger.as_ref(),
        env.metadata.as_ref(),
        ListingMode::Browse { viewer: None },
    )
    .await;

    assert_eq!(listing.polls.len(), 2);
    for view in &listing.polls {
        let p = view.progress();
        assert!(p.percentage <= 100);
        if p.max == 0 {
            assert_eq!(p.percentage, 0);
        } else {
            assert_eq!(p.percentage, 100);
        }
    }
}

#[tokio::test]
async fn test_browse_filter_on_reconciled_views() {
    let env = setup_state();
    push_chain_poll(&env, chain_record(BOB, 0, 5), &poll_metadata("Design survey", BOB, Utc::now())).await;
    env.state.mutate_store(|s| s.add_poll(new_poll("Tech survey", CAROL)));

    let listing = load_listing(
        env.state.all_polls(),
        env.ledger.as_ref(),
        env.metadata.as_ref(),
        ListingMode::Browse { viewer: None },
    )
    .await;

    let filter = BrowseFilter {
        search: Some("SURVEY".to_string()),
        category: Some("design".to_string()),
        status: StatusFilter::All,
    };
    let hits = filter.apply(listing.polls);
    assert_eq!(ids(&hits), vec!["blockchain_1"]);
}

// ---------------------------------------------------------------------------
// Single poll
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_load_poll_by_chain_id_resolves_linked_cache_entry() {
    let env = setup_state();
    let chain_id = push_chain_poll(&env, chain_record(ALICE, 0, 5), &poll_metadata("On chain", ALICE, Utc::now())).await;
    let local_id = env.state.mutate_store(|s| {
        let id = s.add_poll(new_poll("Cached copy", ALICE));
        s.update_poll_contract_id(&id, chain_id, "0xtx");
        id
    });
    let local = env.state.all_polls();

    let by_chain = load_poll(&format!("blockchain_{chain_id}"), &local, env.ledger.as_ref(), env.metadata.as_ref())
        .await
        .expect("load by chain id");
    assert_eq!(by_chain.id, local_id);
    assert_eq!(by_chain.kind(), PollKind::Combined);

    let by_local = load_poll(&local_id, &local, env.ledger.as_ref(), env.metadata.as_ref())
        .await
        .expect("load by local id");
    assert_eq!(by_local.kind(), PollKind::Combined);
    assert_eq!(by_local.questions(), vec!["What do you think?".to_string()]);
}

#[tokio::test]
async fn test_load_poll_unknown_ids_not_found() {
    let env = setup_state();
    for id in ["poll_missing", "blockchain_5", "blockchain_0"] {
        let err = load_poll(id, &[], env.ledger.as_ref(), env.metadata.as_ref())
            .await
            .expect_err("unknown poll");
        assert!(matches!(err, AppError::NotFound(_)), "{id}: {err}");
    }
}
