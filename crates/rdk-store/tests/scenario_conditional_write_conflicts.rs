//! Scenario: Conditional Write Conflicts
//!
//! # Invariants under test
//!
//! 1. Loading an empty store returns a seeded initial document and an absent
//!    token.
//! 2. A save with an absent token succeeds only while no document exists.
//! 3. A save with an absent token against an existing document conflicts.
//! 4. A save with the current token succeeds and rotates the token.
//! 5. A save with a stale token conflicts and never mutates the stored
//!    document; the previously saved document is still retrievable
//!    unchanged.
//! 6. Two writers racing from the same token: the first save wins, the second
//!    fails with a conflict, and the first write survives intact.
//!
//! All against the in-memory backend; the Postgres backend has its own
//! DB-gated scenario.

use rdk_schemas::{ApplicationState, StateSeed};
use rdk_store::{MemoryStateStore, StateStore};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn seed() -> StateSeed {
    StateSeed::new(
        vec!["north".to_string(), "south".to_string()],
        vec!["KWA1".to_string()],
    )
}

fn store() -> MemoryStateStore {
    MemoryStateStore::new("test", seed())
}

fn with_water(mut state: ApplicationState, gallons: f64) -> ApplicationState {
    for p in &mut state.puddles {
        p.estimated_gallons_remaining = gallons;
    }
    state
}

// ---------------------------------------------------------------------------
// 1. Empty store loads seeded initial state
// ---------------------------------------------------------------------------

#[tokio::test]
async fn empty_store_loads_seeded_initial_state_with_absent_token() {
    let store = store();

    let (state, token) = store.load().await.expect("load");
    assert!(token.is_none(), "absent document must yield an absent token");
    assert_eq!(state.puddles.len(), 2);
    assert_eq!(state.stations.len(), 1);
    assert!(state
        .puddles
        .iter()
        .all(|p| p.estimated_gallons_remaining == 0.0 && !p.drained_at_last_observation_time));
}

// ---------------------------------------------------------------------------
// 2 + 3. Absent-token save is create-only
// ---------------------------------------------------------------------------

#[tokio::test]
async fn absent_token_save_succeeds_only_on_absent_document() {
    let store = store();
    let (state, token) = store.load().await.expect("load");
    assert!(token.is_none());

    store
        .save(&state, None)
        .await
        .expect("create of a fresh document must succeed");

    // Second create attempt must conflict.
    let err = store
        .save(&state, None)
        .await
        .expect_err("create against an existing document must conflict");
    assert!(err.is_conflict(), "expected Conflict, got: {err}");
}

// ---------------------------------------------------------------------------
// 4. Current token rotates on save
// ---------------------------------------------------------------------------

#[tokio::test]
async fn save_with_current_token_rotates_the_token() {
    let store = store();
    let (state, _) = store.load().await.expect("load");
    store.save(&state, None).await.expect("create");

    let (state, first) = store.load().await.expect("reload");
    let first = first.expect("token after create");

    store
        .save(&state, Some(&first))
        .await
        .expect("save with current token");

    let (_, second) = store.load().await.expect("reload");
    let second = second.expect("token after save");
    assert_ne!(
        first, second,
        "a successful save must produce a new version token"
    );
}

// ---------------------------------------------------------------------------
// 5. Stale token never mutates the stored document
// ---------------------------------------------------------------------------

#[tokio::test]
async fn stale_token_save_conflicts_and_leaves_document_unchanged() {
    let store = store();
    let (initial, _) = store.load().await.expect("load");
    store.save(&initial, None).await.expect("create");

    let (state, stale) = store.load().await.expect("load");
    let stale = stale.expect("token");

    // Advance the document once; `stale` now lags one revision behind.
    let watered = with_water(state.clone(), 10.0);
    store.save(&watered, Some(&stale)).await.expect("save");

    // Attempt to overwrite with the stale token and different content.
    let overwrite = with_water(state, 999.0);
    let err = store
        .save(&overwrite, Some(&stale))
        .await
        .expect_err("stale token must be rejected");
    assert!(err.is_conflict());

    let (current, _) = store.load().await.expect("reload");
    assert_eq!(
        current.puddles[0].estimated_gallons_remaining, 10.0,
        "rejected write must not have touched the stored document"
    );
}

// ---------------------------------------------------------------------------
// 6. Race from one token: first save wins
// ---------------------------------------------------------------------------

#[tokio::test]
async fn two_writers_racing_from_one_token_first_wins_second_conflicts() {
    let store = store();
    let (initial, _) = store.load().await.expect("load");
    store.save(&initial, None).await.expect("create");

    // Both writers load the same revision.
    let (state_a, token_a) = store.load().await.expect("load a");
    let (state_b, token_b) = store.load().await.expect("load b");
    let token_a = token_a.expect("token a");
    let token_b = token_b.expect("token b");
    assert_eq!(token_a, token_b, "both writers start from the same revision");

    let write_a = with_water(state_a, 5.0);
    let write_b = with_water(state_b, 7.0);

    store
        .save(&write_a, Some(&token_a))
        .await
        .expect("first writer must win");
    let err = store
        .save(&write_b, Some(&token_b))
        .await
        .expect_err("second writer must conflict");
    assert!(err.is_conflict());

    let (current, _) = store.load().await.expect("reload");
    assert_eq!(
        current.puddles[0].estimated_gallons_remaining, 5.0,
        "the winning write must survive intact"
    );
}
