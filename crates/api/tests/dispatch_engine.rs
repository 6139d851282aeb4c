//! Dispatch engine behaviour tests against the in-memory ports.
//!
//! Covers the cascade invariants end to end: at most one Pending offer per
//! booking, strict activation order, immutable terminal states, exhaustion,
//! the single-winner guarantee, and the expiry sweep.

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use chrono::Utc;

use motoaid_api::engine::testing::MemoryWorld;
use motoaid_api::engine::{DispatchController, DispatchError, RespondAction};
use motoaid_core::dispatch::{BookingStatus, NOTICE_REQUEST, NOTICE_SKIPPED, NOTICE_STATUS};
use motoaid_core::types::DbId;
use motoaid_db::models::booking::CreateEmergencyBooking;
use motoaid_db::repositories::NextCandidate;

const CUSTOMER: DbId = 10;
const CUSTOMER_USER: DbId = 100;
const W1: DbId = 1;
const W2: DbId = 2;
const W3: DbId = 3;
const W1_OWNER: DbId = 101;
const W2_OWNER: DbId = 102;
const W3_OWNER: DbId = 103;

/// A world with one customer and three workshops, and an engine wired to it
/// with a 5-minute TTL.
fn setup() -> (Arc<MemoryWorld>, DispatchController) {
    let world = MemoryWorld::new();
    world.add_customer(CUSTOMER, CUSTOMER_USER);
    world.add_workshop(W1, W1_OWNER);
    world.add_workshop(W2, W2_OWNER);
    world.add_workshop(W3, W3_OWNER);

    let engine = DispatchController::new(
        world.clone(),
        world.clone(),
        world.clone(),
        Duration::from_secs(300),
    );
    (world, engine)
}

fn booking_input() -> CreateEmergencyBooking {
    CreateEmergencyBooking {
        customer_id: CUSTOMER,
        vehicle_id: 7,
        service_id: 1,
        notes: Some("flat tyre on the highway shoulder".to_string()),
        address: "12 Haifa St".to_string(),
        address_city: Some("Nablus".to_string()),
        address_street: Some("Haifa St".to_string()),
        latitude: None,
        longitude: None,
        price: 120.0,
    }
}

fn offer_statuses(world: &MemoryWorld, booking_id: DbId) -> Vec<Option<String>> {
    world
        .offers(booking_id)
        .into_iter()
        .map(|o| o.status)
        .collect()
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_activates_only_the_first_candidate() {
    let (world, engine) = setup();

    let booking = engine
        .create(booking_input(), &[W1, W2, W3])
        .await
        .unwrap();

    assert_eq!(booking.status, "Requested");
    assert_eq!(
        offer_statuses(&world, booking.id),
        vec![Some("Pending".to_string()), None, None]
    );
    assert_eq!(world.pending_count(booking.id), 1);

    let offers = world.offers(booking.id);
    assert!(offers[0].expires_at.is_some());
    assert!(offers[1].expires_at.is_none());

    // First workshop's owner and the customer were both told.
    let notices = world.notices();
    assert_eq!(notices.len(), 2);
    assert_eq!(notices[0].receiver, W1_OWNER);
    assert_eq!(notices[0].category, NOTICE_REQUEST);
    assert_eq!(notices[1].receiver, CUSTOMER_USER);
    assert_eq!(notices[1].category, NOTICE_STATUS);
}

#[tokio::test]
async fn create_with_empty_candidate_list_persists_nothing() {
    let (world, engine) = setup();

    let result = engine.create(booking_input(), &[]).await;

    assert_matches!(result, Err(DispatchError::InvalidCandidateList));
    assert!(world.notices().is_empty());
}

#[tokio::test]
async fn create_with_unknown_customer_fails() {
    let (_world, engine) = setup();

    let mut input = booking_input();
    input.customer_id = 999;
    let result = engine.create(input, &[W1]).await;

    assert_matches!(result, Err(DispatchError::CustomerNotFound(999)));
}

// ---------------------------------------------------------------------------
// Respond
// ---------------------------------------------------------------------------

#[tokio::test]
async fn reject_cascades_to_the_next_candidate() {
    let (world, engine) = setup();
    let booking = engine
        .create(booking_input(), &[W1, W2, W3])
        .await
        .unwrap();
    let offer1 = world.offers(booking.id)[0].id;

    let status = engine
        .respond(offer1, RespondAction::Reject)
        .await
        .unwrap();

    assert_eq!(status, BookingStatus::Requested);
    assert_eq!(
        offer_statuses(&world, booking.id),
        vec![
            Some("Rejected".to_string()),
            Some("Pending".to_string()),
            None
        ]
    );
    assert_eq!(world.pending_count(booking.id), 1);
    assert_eq!(world.booking(booking.id).unwrap().status, "Requested");

    // The next candidate got an offer notice.
    let notices = world.notices();
    let last = notices.last().unwrap();
    assert_eq!(last.receiver, W2_OWNER);
    assert_eq!(last.category, NOTICE_REQUEST);
}

#[tokio::test]
async fn accept_confirms_booking_and_closes_the_queue() {
    let (world, engine) = setup();
    let booking = engine
        .create(booking_input(), &[W1, W2, W3])
        .await
        .unwrap();
    let offer1 = world.offers(booking.id)[0].id;

    engine
        .respond(offer1, RespondAction::Reject)
        .await
        .unwrap();
    let offer2 = world.offers(booking.id)[1].id;

    let status = engine
        .respond(offer2, RespondAction::Accept)
        .await
        .unwrap();

    assert_eq!(status, BookingStatus::Confirmed);
    let stored = world.booking(booking.id).unwrap();
    assert_eq!(stored.status, "Confirmed");
    assert_eq!(stored.confirmed_workshop_id, Some(W2));

    // Candidate #3 was never Pending but is no longer eligible either.
    assert_eq!(
        offer_statuses(&world, booking.id),
        vec![
            Some("Rejected".to_string()),
            Some("Accepted".to_string()),
            Some("Rejected".to_string())
        ]
    );
    assert_eq!(world.pending_count(booking.id), 0);
}

#[tokio::test]
async fn accept_stamps_response_time() {
    let (world, engine) = setup();
    let booking = engine.create(booking_input(), &[W1]).await.unwrap();
    let offer1 = world.offers(booking.id)[0].id;

    engine
        .respond(offer1, RespondAction::Accept)
        .await
        .unwrap();

    let offer = &world.offers(booking.id)[0];
    assert!(offer.response_time.is_some());
}

#[tokio::test]
async fn responding_twice_fails_and_mutates_nothing() {
    let (world, engine) = setup();
    let booking = engine.create(booking_input(), &[W1, W2]).await.unwrap();
    let offer1 = world.offers(booking.id)[0].id;

    engine
        .respond(offer1, RespondAction::Accept)
        .await
        .unwrap();
    let before = offer_statuses(&world, booking.id);

    let second = engine.respond(offer1, RespondAction::Accept).await;
    assert_matches!(second, Err(DispatchError::NoPendingRequest));

    let third = engine.respond(offer1, RespondAction::Reject).await;
    assert_matches!(third, Err(DispatchError::NoPendingRequest));

    assert_eq!(offer_statuses(&world, booking.id), before);
    assert_eq!(world.booking(booking.id).unwrap().status, "Confirmed");
}

#[tokio::test]
async fn responding_to_an_unknown_offer_fails() {
    let (_world, engine) = setup();

    let result = engine.respond(12345, RespondAction::Accept).await;

    assert_matches!(result, Err(DispatchError::NoPendingRequest));
}

#[tokio::test]
async fn unactivated_candidate_cannot_respond() {
    let (world, engine) = setup();
    let booking = engine.create(booking_input(), &[W1, W2]).await.unwrap();
    // Candidate #2 has not been activated yet.
    let offer2 = world.offers(booking.id)[1].id;

    let result = engine.respond(offer2, RespondAction::Accept).await;

    assert_matches!(result, Err(DispatchError::NoPendingRequest));
    assert_eq!(world.pending_count(booking.id), 1);
}

// ---------------------------------------------------------------------------
// Skip / ordering / exhaustion
// ---------------------------------------------------------------------------

#[tokio::test]
async fn skip_advances_strictly_in_sequence_order() {
    let (world, engine) = setup();
    let booking = engine
        .create(booking_input(), &[W1, W2, W3])
        .await
        .unwrap();

    let outcome = engine.skip(booking.id).await.unwrap();
    assert_matches!(&outcome, NextCandidate::Activated(o) if o.workshop_id == W2);
    assert_eq!(
        offer_statuses(&world, booking.id),
        vec![
            Some("Skipped".to_string()),
            Some("Pending".to_string()),
            None
        ]
    );
    assert_eq!(world.pending_count(booking.id), 1);

    let outcome = engine.skip(booking.id).await.unwrap();
    assert_matches!(&outcome, NextCandidate::Activated(o) if o.workshop_id == W3);
    assert_eq!(world.pending_count(booking.id), 1);
}

#[tokio::test]
async fn skipping_the_last_candidate_exhausts_the_booking() {
    let (world, engine) = setup();
    let booking = engine.create(booking_input(), &[W1]).await.unwrap();

    let outcome = engine.skip(booking.id).await.unwrap();

    assert_matches!(outcome, NextCandidate::Exhausted);
    assert_eq!(
        offer_statuses(&world, booking.id),
        vec![Some("Skipped".to_string())]
    );
    assert_eq!(world.booking(booking.id).unwrap().status, "Exhausted");

    // The customer was told nobody is available.
    let last = world.notices().last().cloned().unwrap();
    assert_eq!(last.receiver, CUSTOMER_USER);
    assert_eq!(last.category, NOTICE_STATUS);
}

#[tokio::test]
async fn rejecting_every_candidate_exhausts_the_booking() {
    let (world, engine) = setup();
    let booking = engine
        .create(booking_input(), &[W1, W2, W3])
        .await
        .unwrap();

    for expected in [BookingStatus::Requested, BookingStatus::Requested] {
        let offers = world.offers(booking.id);
        let pending = offers.iter().find(|o| o.is_pending()).unwrap();
        let status = engine
            .respond(pending.id, RespondAction::Reject)
            .await
            .unwrap();
        assert_eq!(status, expected);
        assert!(world.pending_count(booking.id) <= 1);
    }

    let offers = world.offers(booking.id);
    let pending = offers.iter().find(|o| o.is_pending()).unwrap();
    let status = engine
        .respond(pending.id, RespondAction::Reject)
        .await
        .unwrap();

    assert_eq!(status, BookingStatus::Exhausted);
    assert_eq!(world.booking(booking.id).unwrap().status, "Exhausted");
    assert_eq!(world.pending_count(booking.id), 0);

    let skip_after = engine.skip(booking.id).await;
    assert_matches!(skip_after, Err(DispatchError::NoPendingRequest));
}

#[tokio::test]
async fn skip_without_a_pending_offer_fails() {
    let (world, engine) = setup();
    let booking = engine.create(booking_input(), &[W1]).await.unwrap();
    let offer1 = world.offers(booking.id)[0].id;
    engine
        .respond(offer1, RespondAction::Accept)
        .await
        .unwrap();

    let result = engine.skip(booking.id).await;

    assert_matches!(result, Err(DispatchError::NoPendingRequest));
    // Confirmed stays confirmed; nothing went Pending again.
    assert_eq!(world.booking(booking.id).unwrap().status, "Confirmed");
    assert_eq!(world.pending_count(booking.id), 0);
}

// ---------------------------------------------------------------------------
// Extend
// ---------------------------------------------------------------------------

#[tokio::test]
async fn extend_refreshes_expiry_and_keeps_the_offer_pending() {
    let (world, engine) = setup();
    let booking = engine.create(booking_input(), &[W1, W2]).await.unwrap();
    let before = world.offers(booking.id)[0].expires_at.unwrap();

    let new_expiry = engine.extend(booking.id).await.unwrap();

    assert!(new_expiry >= before);
    let offer = world.offers(booking.id)[0].clone();
    assert!(offer.is_pending());
    assert_eq!(offer.expires_at, Some(new_expiry));

    // Still Pending, so a response afterwards succeeds.
    let status = engine
        .respond(offer.id, RespondAction::Accept)
        .await
        .unwrap();
    assert_eq!(status, BookingStatus::Confirmed);
}

#[tokio::test]
async fn extend_without_a_pending_offer_fails() {
    let (_world, engine) = setup();

    let result = engine.extend(999).await;

    assert_matches!(result, Err(DispatchError::NoPendingRequest));
}

// ---------------------------------------------------------------------------
// Cancel
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cancel_closes_the_pending_offer_and_stops_the_cascade() {
    let (world, engine) = setup();
    let booking = engine
        .create(booking_input(), &[W1, W2, W3])
        .await
        .unwrap();

    engine.cancel(booking.id).await.unwrap();

    assert_eq!(world.booking(booking.id).unwrap().status, "Cancelled");
    // The Pending offer was closed; the rest were never activated.
    assert_eq!(
        offer_statuses(&world, booking.id),
        vec![Some("Skipped".to_string()), None, None]
    );

    // No further candidate activity is possible.
    assert_matches!(
        engine.skip(booking.id).await,
        Err(DispatchError::NoPendingRequest)
    );
    assert_matches!(
        engine.extend(booking.id).await,
        Err(DispatchError::NoPendingRequest)
    );

    let last = world.notices().last().cloned().unwrap();
    assert_eq!(last.receiver, W1_OWNER);
    assert_eq!(last.category, NOTICE_SKIPPED);
}

#[tokio::test]
async fn cancel_is_only_legal_from_requested() {
    let (world, engine) = setup();
    let booking = engine.create(booking_input(), &[W1]).await.unwrap();
    let offer1 = world.offers(booking.id)[0].id;
    engine
        .respond(offer1, RespondAction::Accept)
        .await
        .unwrap();

    let result = engine.cancel(booking.id).await;

    assert_matches!(result, Err(DispatchError::InvalidTransition));
    assert_eq!(world.booking(booking.id).unwrap().status, "Confirmed");
}

#[tokio::test]
async fn cancel_unknown_booking_fails() {
    let (_world, engine) = setup();

    let result = engine.cancel(404).await;

    assert_matches!(result, Err(DispatchError::BookingNotFound(404)));
}

// ---------------------------------------------------------------------------
// Race safety
// ---------------------------------------------------------------------------

#[tokio::test]
async fn respond_and_skip_racing_have_exactly_one_winner() {
    let (world, engine) = setup();
    let booking = engine.create(booking_input(), &[W1, W2]).await.unwrap();
    let offer1 = world.offers(booking.id)[0].id;

    let (accepted, skipped) = tokio::join!(
        engine.respond(offer1, RespondAction::Accept),
        engine.skip(booking.id)
    );

    let winners = [accepted.is_ok(), skipped.is_ok()]
        .iter()
        .filter(|ok| **ok)
        .count();
    assert_eq!(winners, 1, "exactly one of respond/skip must win");

    // The loser observed a state conflict, not a system failure.
    if let Err(err) = &accepted {
        assert_matches!(err, DispatchError::NoPendingRequest);
    }
    if let Err(err) = &skipped {
        assert_matches!(err, DispatchError::NoPendingRequest);
    }

    // Whichever won, the single-pending invariant held.
    assert!(world.pending_count(booking.id) <= 1);
    let status = world.booking(booking.id).unwrap().status;
    if accepted.is_ok() {
        assert_eq!(status, "Confirmed");
    } else {
        assert_eq!(status, "Requested");
    }
}

// ---------------------------------------------------------------------------
// Expiry sweep
// ---------------------------------------------------------------------------

#[tokio::test]
async fn sweep_skips_lapsed_offers_and_cascades() {
    let (world, engine) = setup();
    let booking = engine.create(booking_input(), &[W1, W2]).await.unwrap();

    world.force_expire_pending(booking.id);
    let advanced = engine.expire_lapsed().await.unwrap();

    assert_eq!(advanced, 1);
    assert_eq!(
        offer_statuses(&world, booking.id),
        vec![Some("Skipped".to_string()), Some("Pending".to_string())]
    );
    // The fresh offer is not lapsed, so a second sweep is a no-op.
    let advanced = engine.expire_lapsed().await.unwrap();
    assert_eq!(advanced, 0);
    assert_eq!(world.pending_count(booking.id), 1);
}

#[tokio::test]
async fn sweep_exhausts_a_lapsed_final_candidate() {
    let (world, engine) = setup();
    let booking = engine.create(booking_input(), &[W1]).await.unwrap();

    world.force_expire_pending(booking.id);
    let advanced = engine.expire_lapsed().await.unwrap();

    assert_eq!(advanced, 1);
    assert_eq!(world.booking(booking.id).unwrap().status, "Exhausted");
}

#[tokio::test]
async fn sweep_ignores_offers_that_are_still_fresh() {
    let (world, engine) = setup();
    let booking = engine.create(booking_input(), &[W1, W2]).await.unwrap();

    let advanced = engine.expire_lapsed().await.unwrap();

    assert_eq!(advanced, 0);
    assert_eq!(
        offer_statuses(&world, booking.id),
        vec![Some("Pending".to_string()), None]
    );
    // Expiries stay in the future.
    let offer = &world.offers(booking.id)[0];
    assert!(offer.expires_at.unwrap() > Utc::now());
}
