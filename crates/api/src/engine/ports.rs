//! Capability traits the dispatch engine is wired with.
//!
//! These are infrastructure seams only; the cascade rules live in
//! [`super::controller`]. Production wiring uses the SQL adapters in
//! [`super::sql`]; tests use the in-memory world in [`super::testing`].

use async_trait::async_trait;
use motoaid_core::dispatch::OfferStatus;
use motoaid_core::types::{DbId, Timestamp};
use motoaid_db::models::booking::{CreateEmergencyBooking, EmergencyBooking};
use motoaid_db::models::offer::CandidateOffer;
use motoaid_db::repositories::{CancelOutcome, NextCandidate};

/// Errors surfaced by dispatch operations.
///
/// The state-conflict variants (`NoPendingRequest`, `InvalidTransition`) are
/// expected races, not system failures: someone else already handled the
/// offer and the caller lost the write.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("candidate list must contain at least one workshop")]
    InvalidCandidateList,

    #[error("customer {0} not found")]
    CustomerNotFound(DbId),

    #[error("booking {0} not found")]
    BookingNotFound(DbId),

    #[error("no pending offer to act on")]
    NoPendingRequest,

    #[error("offer is not in a state that allows this transition")]
    InvalidTransition,

    #[error("storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl DispatchError {
    /// Wrap an adapter-level failure.
    pub fn storage(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        DispatchError::Storage(err.into())
    }

    /// Whether this is an expected lost-the-race outcome rather than a fault.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            DispatchError::NoPendingRequest | DispatchError::InvalidTransition
        )
    }
}

/// Durable record of a booking's candidate queue and each offer's state.
///
/// Implementations must make every transition an atomic conditional update
/// (transition only if the current status still allows it): the first writer
/// wins and the loser observes `None`/a conflict, never a double transition.
#[async_trait]
pub trait OfferLedger: Send + Sync {
    /// Create the full queue for a booking, activating the first candidate
    /// with the given expiry. Fails with [`DispatchError::InvalidCandidateList`]
    /// on an empty list. Returns the activated first offer.
    async fn create_queue(
        &self,
        booking_id: DbId,
        workshop_ids: &[DbId],
        expires_at: Timestamp,
    ) -> Result<CandidateOffer, DispatchError>;

    /// The single Pending offer for a booking, if any.
    async fn current_pending(
        &self,
        booking_id: DbId,
    ) -> Result<Option<CandidateOffer>, DispatchError>;

    /// Accept a Pending offer: offer Accepted, booking Confirmed with this
    /// offer's workshop, every other non-terminal sibling Rejected -- all or
    /// nothing. Returns `None` when the offer was not Pending or the booking
    /// had already left `Requested`.
    async fn accept(&self, offer_id: DbId) -> Result<Option<CandidateOffer>, DispatchError>;

    /// Settle a Pending offer as `Rejected` or `Skipped`, stamping the
    /// response time. Returns `None` when the offer was not Pending.
    async fn mark_terminal(
        &self,
        offer_id: DbId,
        status: OfferStatus,
    ) -> Result<Option<CandidateOffer>, DispatchError>;

    /// Refresh the expiry of a booking's Pending offer. Returns `None` when
    /// nothing is Pending.
    async fn extend(
        &self,
        booking_id: DbId,
        expires_at: Timestamp,
    ) -> Result<Option<CandidateOffer>, DispatchError>;

    /// Activate the lowest-sequence unactivated candidate with the given
    /// expiry, or mark the booking Exhausted when none remains. The two
    /// outcomes commit atomically with respect to each other.
    async fn activate_next(
        &self,
        booking_id: DbId,
        expires_at: Timestamp,
    ) -> Result<NextCandidate, DispatchError>;

    /// Booking ids whose Pending offer expired at or before `now`.
    async fn lapsed_bookings(&self, now: Timestamp) -> Result<Vec<DbId>, DispatchError>;
}

/// Persistence for the booking record itself, plus the user lookups the
/// engine needs to address notifications.
#[async_trait]
pub trait BookingStore: Send + Sync {
    /// The user behind a customer id, or `None` for an unknown customer.
    async fn customer_user(&self, customer_id: DbId) -> Result<Option<DbId>, DispatchError>;

    async fn create_booking(
        &self,
        input: &CreateEmergencyBooking,
    ) -> Result<EmergencyBooking, DispatchError>;

    async fn find_booking(
        &self,
        booking_id: DbId,
    ) -> Result<Option<EmergencyBooking>, DispatchError>;

    /// The user behind a booking's customer.
    async fn booking_customer_user(
        &self,
        booking_id: DbId,
    ) -> Result<Option<DbId>, DispatchError>;

    /// The owning user of a workshop.
    async fn workshop_owner(&self, workshop_id: DbId) -> Result<Option<DbId>, DispatchError>;

    /// Move a `Requested` booking to `Cancelled`, closing its Pending offer
    /// in the same step so no further cascade can occur.
    async fn cancel(&self, booking_id: DbId) -> Result<CancelOutcome, DispatchError>;

    /// Conditionally mark a `Requested` booking Exhausted (sweep repair).
    async fn mark_exhausted(&self, booking_id: DbId) -> Result<bool, DispatchError>;

    /// Bookings stuck in `Requested` with nothing Pending and nothing left
    /// to activate (sweep repair).
    async fn stalled_requested(&self) -> Result<Vec<DbId>, DispatchError>;
}

/// One-way delivery of human-readable events to users.
///
/// Strictly fire-and-forget: implementations log failures and never surface
/// them, so a broken notification channel cannot roll back a state change.
#[async_trait]
pub trait NotificationGateway: Send + Sync {
    async fn notify(&self, sender: DbId, receiver: DbId, message: &str, category: &str);
}
