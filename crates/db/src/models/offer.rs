//! Candidate offer entity: one row per workshop in a booking's queue.

use motoaid_core::dispatch::OfferStatus;
use motoaid_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `emergency_booking_offers` table.
///
/// `status` is NULL while the candidate is still waiting its turn.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CandidateOffer {
    pub id: DbId,
    pub booking_id: DbId,
    pub workshop_id: DbId,
    /// Rank in the original ordered candidate list, starting at 1.
    pub sequence: i32,
    pub status: Option<String>,
    pub expires_at: Option<Timestamp>,
    pub sent_at: Timestamp,
    pub response_time: Option<Timestamp>,
}

impl CandidateOffer {
    /// Typed view of the status column (`None` = not yet activated).
    ///
    /// An unrecognized string also yields `None`; the schema only ever
    /// stores the four known statuses.
    pub fn offer_status(&self) -> Option<OfferStatus> {
        self.status.as_deref().and_then(OfferStatus::parse)
    }

    pub fn is_pending(&self) -> bool {
        self.offer_status() == Some(OfferStatus::Pending)
    }
}
