mod common;

use std::collections::HashSet;
use std::time::Duration;

use common::*;
use event_hunter_lib::db::Store;
use event_hunter_lib::error::{LifecycleError, ValidationError};
use event_hunter_lib::lifecycle::{LifecycleController, LifecycleSettings, RefreshOutcome};
use event_hunter_lib::models::{Candidate, CandidateId, Coords, EventDraft, EventStatus};
use event_hunter_lib::taxonomy::Category;

fn draft(lat: &str, lng: &str) -> EventDraft {
    EventDraft {
        title: "Expo Moda Norte".to_string(),
        description: "Runway shows from local designers".to_string(),
        date: "2030-11-20".to_string(),
        location: "Cintermex".to_string(),
        lat: lat.to_string(),
        lng: lng.to_string(),
    }
}

#[tokio::test]
async fn approve_moves_event_with_classified_category() {
    let categorizer = ScriptedCategorizer::default().reply("Mixer", 0, Ok(Category::Networking));
    let controller = controller(
        categorizer,
        ScriptedDiscoverer::default(),
        vec![approved(1, "Run", Category::Sports), pending(2, "Mixer")],
    );

    let event = controller.approve(2).await.expect("approve should succeed");

    assert_eq!(event.status, EventStatus::Approved);
    assert_eq!(event.category, Category::Networking);
    assert!(controller.pending().is_empty());
    assert_eq!(ids(&controller.approved()), vec![1, 2]);
}

#[tokio::test]
async fn approve_survives_classifier_failure() {
    let categorizer = ScriptedCategorizer::default().reply("Mixer", 0, Err("model offline"));
    let controller = controller(
        categorizer,
        ScriptedDiscoverer::default(),
        vec![pending(2, "Mixer")],
    );

    let event = controller.approve(2).await.expect("failure is not fatal");

    assert_eq!(event.category, Category::Uncategorized);
    assert_eq!(event.status, EventStatus::Approved);
    assert!(controller.pending().is_empty());
    assert_eq!(ids(&controller.approved()), vec![2]);
}

#[tokio::test]
async fn approve_times_out_to_sentinel() {
    let categorizer = ScriptedCategorizer::default().reply("Slow", 5_000, Ok(Category::Fun));
    let controller = LifecycleController::new(
        categorizer,
        ScriptedDiscoverer::default(),
        LifecycleSettings {
            collaborator_timeout: Duration::from_millis(50),
            ..settings()
        },
    )
    .with_events(vec![pending(9, "Slow")]);

    let event = controller.approve(9).await.unwrap();

    assert_eq!(event.category, Category::Uncategorized);
    assert_eq!(ids(&controller.approved()), vec![9]);
}

#[tokio::test]
async fn approve_requires_a_pending_event() {
    let controller = controller(
        ScriptedCategorizer::default(),
        ScriptedDiscoverer::default(),
        vec![approved(1, "Run", Category::Sports)],
    );

    assert_eq!(controller.approve(1).await, Err(LifecycleError::NotPending(1)));
    assert_eq!(controller.approve(77).await, Err(LifecycleError::NotPending(77)));
    assert_eq!(ids(&controller.approved()), vec![1]);
}

#[tokio::test]
async fn overlapping_approvals_each_apply_fully() {
    let categorizer = ScriptedCategorizer::default()
        .reply("Slow", 80, Ok(Category::Fun))
        .reply("Fast", 10, Ok(Category::Family));
    let controller = controller(
        categorizer,
        ScriptedDiscoverer::default(),
        vec![pending(1, "Slow"), pending(2, "Fast"), pending(3, "Untouched")],
    );

    let (slow, fast) = tokio::join!(controller.approve(1), controller.approve(2));

    assert_eq!(slow.unwrap().category, Category::Fun);
    assert_eq!(fast.unwrap().category, Category::Family);
    assert_eq!(ids(&controller.pending()), vec![3]);
    // Resolution order, not call order.
    assert_eq!(ids(&controller.approved()), vec![2, 1]);
}

#[tokio::test]
async fn duplicate_approval_in_flight_is_refused() {
    let categorizer = ScriptedCategorizer::default().reply("Mixer", 30, Ok(Category::Networking));
    let controller = controller(categorizer, ScriptedDiscoverer::default(), vec![pending(5, "Mixer")]);

    let (first, second) = tokio::join!(controller.approve(5), controller.approve(5));

    assert!(first.is_ok());
    assert_eq!(second, Err(LifecycleError::TransitionInFlight(5)));
    assert_eq!(ids(&controller.approved()), vec![5]);

    // The marker is cleared once the first approval finishes.
    assert_eq!(controller.approve(5).await, Err(LifecycleError::NotPending(5)));
}

#[tokio::test]
async fn reject_during_classification_wins() {
    let categorizer = ScriptedCategorizer::default().reply("Mixer", 60, Ok(Category::Networking));
    let controller = controller(categorizer, ScriptedDiscoverer::default(), vec![pending(5, "Mixer")]);

    let (approval, rejected) = tokio::join!(controller.approve(5), async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        controller.reject(5)
    });

    assert!(rejected);
    assert_eq!(approval, Err(LifecycleError::NotPending(5)));
    assert!(controller.approved().is_empty());
    assert!(controller.pending().is_empty());
}

#[tokio::test]
async fn reject_is_idempotent() {
    let controller = controller(
        ScriptedCategorizer::default(),
        ScriptedDiscoverer::default(),
        vec![pending(1, "A"), pending(2, "B")],
    );

    assert!(controller.reject(1));
    let after_first = controller.snapshot();
    assert!(!controller.reject(1));
    assert_eq!(controller.snapshot(), after_first);
    assert_eq!(ids(&after_first.pending), vec![2]);
}

#[tokio::test]
async fn promote_creates_pending_event_with_fallback_coords() {
    let discoverer =
        ScriptedDiscoverer::default().batch(0, Ok(vec![scraped("Feria"), scraped("Concierto")]));
    let controller = controller(ScriptedCategorizer::default(), discoverer, vec![pending(1, "Old")]);
    assert_eq!(controller.refresh_candidates().await, RefreshOutcome::Replaced(2));
    let handle = controller.candidates()[0].handle;

    let event = controller.promote_scraped(handle).unwrap();

    let pending = controller.pending();
    assert_eq!(pending.len(), 2);
    assert_eq!(pending[0], event);
    assert_eq!(event.title, "Feria");
    assert_eq!(event.status, EventStatus::Pending);
    assert_eq!(event.category, Category::Uncategorized);
    assert_eq!(
        event.coords,
        Coords {
            lat: 25.6751,
            lng: -100.3185
        }
    );
    assert!(event.image_url.contains(&event.id.to_string()));

    let remaining = controller.candidates();
    assert_eq!(remaining.len(), 1);
    assert!(remaining.iter().all(|c| c.handle != handle));
    assert_eq!(
        controller.promote_scraped(handle),
        Err(LifecycleError::UnknownCandidate(handle))
    );
}

#[tokio::test]
async fn candidates_with_the_same_title_are_independent() {
    let discoverer =
        ScriptedDiscoverer::default().batch(0, Ok(vec![scraped("Feria"), scraped("Feria")]));
    let controller = controller(ScriptedCategorizer::default(), discoverer, Vec::new());
    controller.refresh_candidates().await;
    let handles: Vec<CandidateId> = controller.candidates().iter().map(|c| c.handle).collect();

    controller.promote_scraped(handles[0]).unwrap();

    let remaining = controller.candidates();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].handle, handles[1]);
}

#[tokio::test]
async fn discard_only_touches_candidates() {
    let discoverer =
        ScriptedDiscoverer::default().batch(0, Ok(vec![scraped("Feria"), scraped("Concierto")]));
    let controller = controller(
        ScriptedCategorizer::default(),
        discoverer,
        vec![approved(1, "Run", Category::Sports), pending(2, "Mixer")],
    );
    controller.refresh_candidates().await;
    let before = controller.snapshot();
    let handle = before.candidates[1].handle;

    assert!(controller.discard_scraped(handle));
    assert!(!controller.discard_scraped(handle));

    let after = controller.snapshot();
    assert_eq!(after.approved, before.approved);
    assert_eq!(after.pending, before.pending);
    assert_eq!(after.candidates, before.candidates[..1].to_vec());
}

#[tokio::test]
async fn refresh_replaces_stale_candidates() {
    let discoverer = ScriptedDiscoverer::default()
        .batch(0, Ok(vec![scraped("Old A"), scraped("Old B")]))
        .batch(0, Ok(vec![scraped("New")]));
    let controller = controller(ScriptedCategorizer::default(), discoverer, Vec::new());

    controller.refresh_candidates().await;
    let old_handles: HashSet<CandidateId> =
        controller.candidates().iter().map(|c| c.handle).collect();
    assert_eq!(controller.refresh_candidates().await, RefreshOutcome::Replaced(1));

    let current = controller.candidates();
    assert_eq!(current.len(), 1);
    assert_eq!(current[0].scraped.title, "New");
    assert!(!old_handles.contains(&current[0].handle));
}

#[tokio::test]
async fn refresh_failure_clears_candidates() {
    let discoverer = ScriptedDiscoverer::default()
        .batch(0, Ok(vec![scraped("Feria")]))
        .batch(0, Err("quota exceeded"));
    let controller = controller(ScriptedCategorizer::default(), discoverer, Vec::new());

    controller.refresh_candidates().await;
    assert_eq!(controller.refresh_candidates().await, RefreshOutcome::Replaced(0));
    assert!(controller.candidates().is_empty());
}

#[tokio::test]
async fn superseded_refresh_result_is_dropped() {
    let discoverer = ScriptedDiscoverer::default()
        .batch(100, Ok(vec![scraped("Stale A"), scraped("Stale B")]))
        .batch(10, Ok(vec![scraped("Fresh")]));
    let controller = controller(ScriptedCategorizer::default(), discoverer, Vec::new());

    let (first, second) = tokio::join!(controller.refresh_candidates(), async {
        tokio::time::sleep(Duration::from_millis(5)).await;
        controller.refresh_candidates().await
    });

    assert_eq!(first, RefreshOutcome::Superseded);
    assert_eq!(second, RefreshOutcome::Replaced(1));
    let titles: Vec<String> = controller
        .candidates()
        .into_iter()
        .map(|c| c.scraped.title)
        .collect();
    assert_eq!(titles, vec!["Fresh"]);
}

#[tokio::test]
async fn add_manual_parses_coordinates_and_prepends() {
    let categorizer =
        ScriptedCategorizer::default().reply("Expo Moda Norte", 0, Ok(Category::Fashion));
    let controller = controller(
        categorizer,
        ScriptedDiscoverer::default(),
        vec![approved(1, "Run", Category::Sports)],
    );

    let event = controller.add_manual(draft("25.67", "-100.31")).await.unwrap();

    assert_eq!(
        event.coords,
        Coords {
            lat: 25.67,
            lng: -100.31
        }
    );
    assert_eq!(event.status, EventStatus::Approved);
    assert_eq!(event.category, Category::Fashion);
    assert_eq!(event.image_url, format!("https://picsum.photos/seed/{}/400/300", event.id));
    assert_eq!(ids(&controller.approved()), vec![event.id, 1]);
    assert!(controller.pending().is_empty());
}

#[tokio::test]
async fn add_manual_rejects_non_numeric_latitude() {
    let controller = controller(
        ScriptedCategorizer::default(),
        ScriptedDiscoverer::default(),
        vec![approved(1, "Run", Category::Sports)],
    );
    let before = controller.snapshot();

    let result = controller.add_manual(draft("north", "-100.31")).await;

    assert!(matches!(
        result,
        Err(LifecycleError::Validation(ValidationError::InvalidNumber {
            field: "latitude",
            ..
        }))
    ));
    assert_eq!(controller.snapshot(), before);
}

#[tokio::test]
async fn invalid_drafts_never_reach_the_classifier() {
    let categorizer = ScriptedCategorizer::default();
    let controller =
        LifecycleController::new(&categorizer, ScriptedDiscoverer::default(), settings());

    assert!(controller.add_manual(draft("25.6", "")).await.is_err());
    controller.add_manual(draft("25.6", "-100.3")).await.unwrap();

    assert_eq!(categorizer.call_count(), 1);
    assert_eq!(controller.approved().len(), 1);
}

#[tokio::test]
async fn new_ids_are_unique_across_collections() {
    let discoverer = ScriptedDiscoverer::default()
        .batch(0, Ok(vec![scraped("A"), scraped("B"), scraped("C")]));
    let controller = controller(ScriptedCategorizer::default(), discoverer, vec![pending(1, "Seed")]);
    controller.refresh_candidates().await;

    for candidate in controller.candidates() {
        controller.promote_scraped(candidate.handle).unwrap();
    }
    for _ in 0..3 {
        controller.add_manual(draft("25.6", "-100.3")).await.unwrap();
    }

    let all = controller.all_events();
    let unique: HashSet<i64> = all.iter().map(|e| e.id).collect();
    assert_eq!(all.len(), 7);
    assert_eq!(unique.len(), 7);
}

#[tokio::test]
async fn loads_and_partitions_events_from_the_store() {
    let store = Store::open_in_memory().unwrap();
    let controller = LifecycleController::from_source(
        ScriptedCategorizer::default(),
        ScriptedDiscoverer::default(),
        settings(),
        &store,
    )
    .unwrap();

    let state = controller.snapshot();
    assert!(!state.approved.is_empty());
    assert!(!state.pending.is_empty());
    assert!(state.approved.iter().all(|e| e.status == EventStatus::Approved));
    assert!(state.pending.iter().all(|e| e.status == EventStatus::Pending));
    assert_eq!(controller.all_events().len(), store.list_events().unwrap().len());
}

#[tokio::test]
async fn restored_candidate_without_successor_handle_is_dropped() {
    let discoverer = ScriptedDiscoverer::default().batch(0, Ok(vec![scraped("Fresh")]));
    let controller = controller(ScriptedCategorizer::default(), discoverer, Vec::new())
        .with_candidates(vec![
            Candidate {
                handle: CandidateId(u32::MAX),
                scraped: scraped("Edge"),
            },
            Candidate {
                handle: CandidateId(3),
                scraped: scraped("Kept"),
            },
        ]);

    let restored: Vec<_> = controller.candidates().iter().map(|c| c.handle).collect();
    assert_eq!(restored, vec![CandidateId(3)]);

    assert_eq!(controller.refresh_candidates().await, RefreshOutcome::Replaced(1));
    assert_eq!(controller.candidates()[0].handle, CandidateId(4));
}

#[tokio::test]
async fn new_events_after_largest_id_report_exhaustion() {
    let categorizer = ScriptedCategorizer::default();
    let controller =
        LifecycleController::new(&categorizer, ScriptedDiscoverer::default(), settings())
            .with_events(vec![pending(i64::MAX, "Last")])
            .with_candidates(vec![Candidate {
                handle: CandidateId(0),
                scraped: scraped("Waiting"),
            }]);

    let added = controller.add_manual(draft("25.67", "-100.31")).await;
    assert_eq!(added, Err(LifecycleError::IdsExhausted(i64::MAX)));
    assert!(controller.approved().is_empty());

    let promoted = controller.promote_scraped(CandidateId(0));
    assert_eq!(promoted, Err(LifecycleError::IdsExhausted(i64::MAX)));
    assert_eq!(controller.candidates().len(), 1);
    assert_eq!(ids(&controller.pending()), vec![i64::MAX]);
}
