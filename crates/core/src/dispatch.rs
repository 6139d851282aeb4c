//! Emergency dispatch state machine: statuses, transitions, and constants.
//!
//! This module lives in `core` (zero internal deps) so it can be used by both
//! the API/repository layer and any future worker or CLI tooling.
//!
//! An emergency booking holds an ordered queue of candidate offers, one per
//! workshop. In the database an offer's status column is NULL until the
//! candidate is activated, which maps to `Option::<OfferStatus>::None` here.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Timing
// ---------------------------------------------------------------------------

/// Default time a Pending offer stays open before it may be skipped: 5 minutes.
pub const DEFAULT_OFFER_TTL_SECS: u64 = 300;

// ---------------------------------------------------------------------------
// Notification categories
// ---------------------------------------------------------------------------

/// A workshop received a new emergency offer.
pub const NOTICE_REQUEST: &str = "EmergencyRequest";

/// A booking-level status update for the customer.
pub const NOTICE_STATUS: &str = "EmergencyStatus";

/// A workshop's response window was extended.
pub const NOTICE_EXTENSION: &str = "EmergencyExtension";

/// A workshop's offer window closed without a response.
pub const NOTICE_SKIPPED: &str = "EmergencySkipped";

// ---------------------------------------------------------------------------
// Offer state machine
// ---------------------------------------------------------------------------

/// Status of a single candidate offer once it has been activated.
///
/// The unactivated state is represented as `None` (NULL in the database), so
/// a full offer slot state is `Option<OfferStatus>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OfferStatus {
    /// The candidate holds the offer and the response window is open.
    Pending,
    /// The candidate took the job. Terminal, and terminal for the queue.
    Accepted,
    /// The candidate declined, or the slot was closed by a winner elsewhere.
    Rejected,
    /// The response window lapsed or was skipped by the customer/operator.
    Skipped,
}

impl OfferStatus {
    /// Database string form.
    pub fn as_str(self) -> &'static str {
        match self {
            OfferStatus::Pending => "Pending",
            OfferStatus::Accepted => "Accepted",
            OfferStatus::Rejected => "Rejected",
            OfferStatus::Skipped => "Skipped",
        }
    }

    /// Parse the database string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Pending" => Some(OfferStatus::Pending),
            "Accepted" => Some(OfferStatus::Accepted),
            "Rejected" => Some(OfferStatus::Rejected),
            "Skipped" => Some(OfferStatus::Skipped),
            _ => None,
        }
    }

    /// Terminal offer states are immutable once reached.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OfferStatus::Accepted | OfferStatus::Rejected | OfferStatus::Skipped
        )
    }
}

/// Returns whether an offer may move from `from` to `to`.
///
/// The only legal moves are activation (`None -> Pending`) and settling a
/// Pending offer (`Pending -> Accepted | Rejected | Skipped`).
pub fn offer_can_transition(from: Option<OfferStatus>, to: OfferStatus) -> bool {
    match (from, to) {
        (None, OfferStatus::Pending) => true,
        (Some(OfferStatus::Pending), t) => t.is_terminal(),
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// Booking state machine
// ---------------------------------------------------------------------------

/// Overall status of an emergency booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookingStatus {
    /// Created; the candidate queue is being worked through.
    Requested,
    /// A workshop accepted. Terminal.
    Confirmed,
    /// Every candidate declined or was skipped. Terminal.
    Exhausted,
    /// The customer withdrew the request before any acceptance. Terminal.
    Cancelled,
}

impl BookingStatus {
    /// Database string form.
    pub fn as_str(self) -> &'static str {
        match self {
            BookingStatus::Requested => "Requested",
            BookingStatus::Confirmed => "Confirmed",
            BookingStatus::Exhausted => "Exhausted",
            BookingStatus::Cancelled => "Cancelled",
        }
    }

    /// Parse the database string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Requested" => Some(BookingStatus::Requested),
            "Confirmed" => Some(BookingStatus::Confirmed),
            "Exhausted" => Some(BookingStatus::Exhausted),
            "Cancelled" => Some(BookingStatus::Cancelled),
            _ => None,
        }
    }

    /// Terminal booking states permit no further candidate activity.
    pub fn is_terminal(self) -> bool {
        !matches!(self, BookingStatus::Requested)
    }
}

/// Returns whether a booking may move from `from` to `to`.
///
/// All three terminal states are reachable only from `Requested`.
pub fn booking_can_transition(from: BookingStatus, to: BookingStatus) -> bool {
    matches!(from, BookingStatus::Requested) && to.is_terminal()
}
