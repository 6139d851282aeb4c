//! The dispatch state machine.
//!
//! Offer lifecycle: `Unactivated -> Pending -> {Accepted | Rejected | Skipped}`.
//! Booking lifecycle: `Requested -> {Confirmed | Exhausted | Cancelled}`.
//!
//! All transitions funnel through [`DispatchController`]; workshops and
//! customers never touch the ledger directly. Expiry is enforced lazily by
//! [`DispatchController::expire_lapsed`], driven from a periodic background
//! sweep rather than per-booking timers.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Deserialize;

use motoaid_core::dispatch::{
    BookingStatus, OfferStatus, NOTICE_EXTENSION, NOTICE_REQUEST, NOTICE_SKIPPED, NOTICE_STATUS,
};
use motoaid_core::types::{DbId, Timestamp};
use motoaid_db::models::booking::{CreateEmergencyBooking, EmergencyBooking};
use motoaid_db::repositories::{CancelOutcome, NextCandidate};

use super::ports::{BookingStore, DispatchError, NotificationGateway, OfferLedger};

/// Seeded system account used as the sender of engine-generated notices
/// when no acting user applies.
pub const SYSTEM_USER: DbId = 1;

/// A workshop's answer to its Pending offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RespondAction {
    Accept,
    Reject,
}

/// The dispatch engine's state machine, wired with injected capabilities.
pub struct DispatchController {
    ledger: Arc<dyn OfferLedger>,
    bookings: Arc<dyn BookingStore>,
    notifier: Arc<dyn NotificationGateway>,
    offer_ttl: chrono::Duration,
}

impl DispatchController {
    pub fn new(
        ledger: Arc<dyn OfferLedger>,
        bookings: Arc<dyn BookingStore>,
        notifier: Arc<dyn NotificationGateway>,
        offer_ttl: Duration,
    ) -> Self {
        Self {
            ledger,
            bookings,
            notifier,
            offer_ttl: chrono::Duration::from_std(offer_ttl)
                .unwrap_or_else(|_| chrono::Duration::seconds(300)),
        }
    }

    fn next_deadline(&self) -> Timestamp {
        Utc::now() + self.offer_ttl
    }

    fn ttl_minutes(&self) -> i64 {
        self.offer_ttl.num_minutes().max(1)
    }

    fn offer_message(&self) -> String {
        format!(
            "New emergency request in your area. Respond within {} minutes or it moves to the next workshop.",
            self.ttl_minutes()
        )
    }

    /// Create a booking with its candidate queue and activate candidate #1.
    ///
    /// Validates synchronously before persisting anything: the candidate list
    /// must be non-empty and the customer must exist.
    pub async fn create(
        &self,
        input: CreateEmergencyBooking,
        workshop_ids: &[DbId],
    ) -> Result<EmergencyBooking, DispatchError> {
        if workshop_ids.is_empty() {
            return Err(DispatchError::InvalidCandidateList);
        }
        let customer_user = self
            .bookings
            .customer_user(input.customer_id)
            .await?
            .ok_or(DispatchError::CustomerNotFound(input.customer_id))?;

        let booking = self.bookings.create_booking(&input).await?;
        let first = self
            .ledger
            .create_queue(booking.id, workshop_ids, self.next_deadline())
            .await?;

        tracing::info!(
            booking_id = booking.id,
            candidates = workshop_ids.len(),
            first_workshop = first.workshop_id,
            "Emergency booking created"
        );

        self.notify_workshop(
            customer_user,
            first.workshop_id,
            &self.offer_message(),
            NOTICE_REQUEST,
        )
        .await;
        self.notifier
            .notify(
                SYSTEM_USER,
                customer_user,
                &format!(
                    "Emergency request sent. Waiting up to {} minutes for the workshop to respond.",
                    self.ttl_minutes()
                ),
                NOTICE_STATUS,
            )
            .await;

        Ok(booking)
    }

    /// Apply a workshop's accept/reject to its Pending offer.
    ///
    /// Fails with [`DispatchError::NoPendingRequest`] unless the offer is
    /// currently Pending -- the guard against stale or duplicate answers.
    /// Returns the booking's status after the transition.
    pub async fn respond(
        &self,
        offer_id: DbId,
        action: RespondAction,
    ) -> Result<BookingStatus, DispatchError> {
        match action {
            RespondAction::Accept => {
                let offer = self
                    .ledger
                    .accept(offer_id)
                    .await?
                    .ok_or(DispatchError::NoPendingRequest)?;

                tracing::info!(
                    offer_id,
                    booking_id = offer.booking_id,
                    workshop_id = offer.workshop_id,
                    "Offer accepted; booking confirmed"
                );

                if let Some(customer_user) =
                    self.bookings.booking_customer_user(offer.booking_id).await?
                {
                    let sender = self
                        .bookings
                        .workshop_owner(offer.workshop_id)
                        .await?
                        .unwrap_or(SYSTEM_USER);
                    self.notifier
                        .notify(
                            sender,
                            customer_user,
                            "Your emergency request was accepted by the workshop.",
                            NOTICE_STATUS,
                        )
                        .await;
                }

                Ok(BookingStatus::Confirmed)
            }
            RespondAction::Reject => {
                let offer = self
                    .ledger
                    .mark_terminal(offer_id, OfferStatus::Rejected)
                    .await?
                    .ok_or(DispatchError::NoPendingRequest)?;

                tracing::info!(
                    offer_id,
                    booking_id = offer.booking_id,
                    workshop_id = offer.workshop_id,
                    "Offer rejected"
                );

                let customer_user = self
                    .bookings
                    .booking_customer_user(offer.booking_id)
                    .await?
                    .unwrap_or(SYSTEM_USER);
                self.notify_workshop(
                    customer_user,
                    offer.workshop_id,
                    "This emergency request is closed for your workshop.",
                    NOTICE_SKIPPED,
                )
                .await;

                match self.cascade(offer.booking_id).await? {
                    NextCandidate::Activated(_) => Ok(BookingStatus::Requested),
                    NextCandidate::Exhausted => Ok(BookingStatus::Exhausted),
                    NextCandidate::Closed => self.booking_status(offer.booking_id).await,
                }
            }
        }
    }

    /// Skip the current Pending offer and advance the queue.
    ///
    /// Used by the customer/operator who does not want to wait out the TTL,
    /// and by the expiry sweep once `expires_at` has passed.
    pub async fn skip(&self, booking_id: DbId) -> Result<NextCandidate, DispatchError> {
        let pending = self
            .ledger
            .current_pending(booking_id)
            .await?
            .ok_or(DispatchError::NoPendingRequest)?;
        let skipped = self
            .ledger
            .mark_terminal(pending.id, OfferStatus::Skipped)
            .await?
            .ok_or(DispatchError::NoPendingRequest)?;

        tracing::info!(
            booking_id,
            offer_id = skipped.id,
            workshop_id = skipped.workshop_id,
            "Offer skipped"
        );

        let customer_user = self
            .bookings
            .booking_customer_user(booking_id)
            .await?
            .unwrap_or(SYSTEM_USER);
        self.notify_workshop(
            customer_user,
            skipped.workshop_id,
            "Time is up. This emergency request was passed to another workshop.",
            NOTICE_SKIPPED,
        )
        .await;

        self.cascade(booking_id).await
    }

    /// Grant the current Pending offer a fresh TTL. Returns the new expiry.
    pub async fn extend(&self, booking_id: DbId) -> Result<Timestamp, DispatchError> {
        let deadline = self.next_deadline();
        let offer = self
            .ledger
            .extend(booking_id, deadline)
            .await?
            .ok_or(DispatchError::NoPendingRequest)?;

        tracing::info!(
            booking_id,
            offer_id = offer.id,
            expires_at = %deadline,
            "Offer window extended"
        );

        let customer_user = self
            .bookings
            .booking_customer_user(booking_id)
            .await?
            .unwrap_or(SYSTEM_USER);
        self.notify_workshop(
            customer_user,
            offer.workshop_id,
            &format!(
                "You have been granted {} more minutes to respond to the emergency request.",
                self.ttl_minutes()
            ),
            NOTICE_EXTENSION,
        )
        .await;

        Ok(deadline)
    }

    /// Withdraw a booking that has not been confirmed yet.
    ///
    /// Only legal from `Requested`; closes the Pending offer (if any) in the
    /// same step so no cascade can follow.
    pub async fn cancel(&self, booking_id: DbId) -> Result<(), DispatchError> {
        match self.bookings.cancel(booking_id).await? {
            CancelOutcome::Cancelled(closed) => {
                tracing::info!(booking_id, "Booking cancelled");
                if let Some(offer) = closed {
                    let customer_user = self
                        .bookings
                        .booking_customer_user(booking_id)
                        .await?
                        .unwrap_or(SYSTEM_USER);
                    self.notify_workshop(
                        customer_user,
                        offer.workshop_id,
                        "The customer cancelled this emergency request.",
                        NOTICE_SKIPPED,
                    )
                    .await;
                }
                Ok(())
            }
            CancelOutcome::NotCancellable => {
                match self.bookings.find_booking(booking_id).await? {
                    None => Err(DispatchError::BookingNotFound(booking_id)),
                    Some(_) => Err(DispatchError::InvalidTransition),
                }
            }
        }
    }

    /// Skip every booking whose Pending offer has lapsed, and repair any
    /// booking stranded in `Requested` with nothing left to activate.
    ///
    /// Returns how many bookings were advanced. Individual failures are
    /// logged and do not stop the sweep; losing a race to a late response is
    /// the expected case, not a failure.
    pub async fn expire_lapsed(&self) -> Result<usize, DispatchError> {
        let lapsed = self.ledger.lapsed_bookings(Utc::now()).await?;
        let mut advanced = 0;

        for booking_id in lapsed {
            match self.skip(booking_id).await {
                Ok(_) => advanced += 1,
                Err(err) if err.is_conflict() => {
                    tracing::debug!(booking_id, "Lapsed offer already handled");
                }
                Err(err) => {
                    tracing::error!(booking_id, error = %err, "Expiry skip failed");
                }
            }
        }

        for booking_id in self.bookings.stalled_requested().await? {
            if self.bookings.mark_exhausted(booking_id).await? {
                tracing::warn!(booking_id, "Repaired stalled booking to Exhausted");
                if let Some(customer_user) =
                    self.bookings.booking_customer_user(booking_id).await?
                {
                    self.notifier
                        .notify(
                            SYSTEM_USER,
                            customer_user,
                            "No workshop accepted your emergency request. Please submit a new request to try again.",
                            NOTICE_STATUS,
                        )
                        .await;
                }
            }
        }

        Ok(advanced)
    }

    /// Advance the queue after a non-accept terminal transition: activate the
    /// next candidate or conclude the booking as Exhausted.
    async fn cascade(&self, booking_id: DbId) -> Result<NextCandidate, DispatchError> {
        let outcome = self
            .ledger
            .activate_next(booking_id, self.next_deadline())
            .await?;

        match &outcome {
            NextCandidate::Activated(next) => {
                tracing::info!(
                    booking_id,
                    offer_id = next.id,
                    workshop_id = next.workshop_id,
                    sequence = next.sequence,
                    "Cascaded to next candidate"
                );
                let customer_user = self
                    .bookings
                    .booking_customer_user(booking_id)
                    .await?
                    .unwrap_or(SYSTEM_USER);
                self.notify_workshop(
                    customer_user,
                    next.workshop_id,
                    &self.offer_message(),
                    NOTICE_REQUEST,
                )
                .await;
            }
            NextCandidate::Exhausted => {
                tracing::info!(booking_id, "Candidate queue exhausted");
                if let Some(customer_user) =
                    self.bookings.booking_customer_user(booking_id).await?
                {
                    self.notifier
                        .notify(
                            SYSTEM_USER,
                            customer_user,
                            "No workshop accepted your emergency request. Please submit a new request to try again.",
                            NOTICE_STATUS,
                        )
                        .await;
                }
            }
            NextCandidate::Closed => {
                tracing::debug!(booking_id, "Cascade skipped; booking no longer open");
            }
        }

        Ok(outcome)
    }

    async fn booking_status(&self, booking_id: DbId) -> Result<BookingStatus, DispatchError> {
        let booking = self
            .bookings
            .find_booking(booking_id)
            .await?
            .ok_or(DispatchError::BookingNotFound(booking_id))?;
        booking.booking_status().ok_or_else(|| {
            DispatchError::storage(format!(
                "booking {booking_id} has unknown status {:?}",
                booking.status
            ))
        })
    }

    /// Deliver a notice to a workshop's owner, if the workshop resolves.
    async fn notify_workshop(&self, sender: DbId, workshop_id: DbId, message: &str, category: &str) {
        match self.bookings.workshop_owner(workshop_id).await {
            Ok(Some(owner)) => self.notifier.notify(sender, owner, message, category).await,
            Ok(None) => {
                tracing::warn!(workshop_id, "No owner found for workshop; notice dropped")
            }
            Err(err) => {
                tracing::warn!(workshop_id, error = %err, "Owner lookup failed; notice dropped")
            }
        }
    }
}
