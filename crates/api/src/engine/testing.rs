//! In-memory implementations of the engine ports for tests.
//!
//! [`MemoryWorld`] plays all three capabilities at once over a single mutex,
//! mirroring the SQL adapters' semantics (conditional transitions, atomic
//! accept, activate-or-exhaust) without a database. Construct one `Arc` and
//! hand clones to [`super::DispatchController::new`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;

use motoaid_core::dispatch::{BookingStatus, OfferStatus};
use motoaid_core::types::{DbId, Timestamp};
use motoaid_db::models::booking::{CreateEmergencyBooking, EmergencyBooking};
use motoaid_db::models::offer::CandidateOffer;
use motoaid_db::repositories::{CancelOutcome, NextCandidate};

use super::ports::{BookingStore, DispatchError, NotificationGateway, OfferLedger};

/// A notification captured by the in-memory gateway.
#[derive(Debug, Clone)]
pub struct RecordedNotice {
    pub sender: DbId,
    pub receiver: DbId,
    pub message: String,
    pub category: String,
}

#[derive(Default)]
struct WorldState {
    next_id: DbId,
    customers: HashMap<DbId, DbId>,
    workshop_owners: HashMap<DbId, DbId>,
    bookings: HashMap<DbId, EmergencyBooking>,
    offers: Vec<CandidateOffer>,
    notices: Vec<RecordedNotice>,
}

impl WorldState {
    fn allocate_id(&mut self) -> DbId {
        self.next_id += 1;
        self.next_id
    }

    fn booking_status(&self, booking_id: DbId) -> Option<BookingStatus> {
        self.bookings
            .get(&booking_id)
            .and_then(|b| b.booking_status())
    }
}

/// Shared in-memory backing store for all three engine ports.
pub struct MemoryWorld {
    state: Mutex<WorldState>,
}

impl MemoryWorld {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(WorldState::default()),
        })
    }

    fn lock(&self) -> MutexGuard<'_, WorldState> {
        self.state.lock().expect("world mutex poisoned")
    }

    /// Register a customer and the user behind it.
    pub fn add_customer(&self, customer_id: DbId, user_id: DbId) {
        self.lock().customers.insert(customer_id, user_id);
    }

    /// Register a workshop and its owning user.
    pub fn add_workshop(&self, workshop_id: DbId, owner_user_id: DbId) {
        self.lock().workshop_owners.insert(workshop_id, owner_user_id);
    }

    /// Snapshot of a booking row.
    pub fn booking(&self, booking_id: DbId) -> Option<EmergencyBooking> {
        self.lock().bookings.get(&booking_id).cloned()
    }

    /// Snapshot of a booking's offer queue, in candidate order.
    pub fn offers(&self, booking_id: DbId) -> Vec<CandidateOffer> {
        let mut offers: Vec<_> = self
            .lock()
            .offers
            .iter()
            .filter(|o| o.booking_id == booking_id)
            .cloned()
            .collect();
        offers.sort_by_key(|o| o.sequence);
        offers
    }

    /// How many of a booking's offers are currently Pending.
    pub fn pending_count(&self, booking_id: DbId) -> usize {
        self.offers(booking_id)
            .iter()
            .filter(|o| o.is_pending())
            .count()
    }

    /// All notifications recorded so far, in delivery order.
    pub fn notices(&self) -> Vec<RecordedNotice> {
        self.lock().notices.clone()
    }

    /// Force a booking's Pending offer to look expired.
    pub fn force_expire_pending(&self, booking_id: DbId) {
        let mut state = self.lock();
        for offer in state
            .offers
            .iter_mut()
            .filter(|o| o.booking_id == booking_id)
        {
            if offer.status.as_deref() == Some("Pending") {
                offer.expires_at = Some(Utc::now() - chrono::Duration::seconds(1));
            }
        }
    }
}

#[async_trait]
impl OfferLedger for MemoryWorld {
    async fn create_queue(
        &self,
        booking_id: DbId,
        workshop_ids: &[DbId],
        expires_at: Timestamp,
    ) -> Result<CandidateOffer, DispatchError> {
        if workshop_ids.is_empty() {
            return Err(DispatchError::InvalidCandidateList);
        }
        let mut state = self.lock();
        let mut first = None;
        for (i, workshop_id) in workshop_ids.iter().enumerate() {
            let id = state.allocate_id();
            let offer = CandidateOffer {
                id,
                booking_id,
                workshop_id: *workshop_id,
                sequence: (i + 1) as i32,
                status: (i == 0).then(|| "Pending".to_string()),
                expires_at: (i == 0).then_some(expires_at),
                sent_at: Utc::now(),
                response_time: None,
            };
            if i == 0 {
                first = Some(offer.clone());
            }
            state.offers.push(offer);
        }
        first.ok_or(DispatchError::InvalidCandidateList)
    }

    async fn current_pending(
        &self,
        booking_id: DbId,
    ) -> Result<Option<CandidateOffer>, DispatchError> {
        Ok(self
            .lock()
            .offers
            .iter()
            .filter(|o| o.booking_id == booking_id && o.is_pending())
            .min_by_key(|o| o.sequence)
            .cloned())
    }

    async fn accept(&self, offer_id: DbId) -> Result<Option<CandidateOffer>, DispatchError> {
        let mut state = self.lock();

        let Some(idx) = state
            .offers
            .iter()
            .position(|o| o.id == offer_id && o.is_pending())
        else {
            return Ok(None);
        };
        let (booking_id, workshop_id) = {
            let offer = &state.offers[idx];
            (offer.booking_id, offer.workshop_id)
        };
        if state.booking_status(booking_id) != Some(BookingStatus::Requested) {
            return Ok(None);
        }

        let now = Utc::now();
        state.offers[idx].status = Some("Accepted".to_string());
        state.offers[idx].response_time = Some(now);
        let accepted = state.offers[idx].clone();

        for offer in state
            .offers
            .iter_mut()
            .filter(|o| o.booking_id == booking_id && o.id != offer_id)
        {
            let terminal = offer
                .offer_status()
                .is_some_and(|s| s.is_terminal());
            if !terminal {
                offer.status = Some("Rejected".to_string());
                offer.response_time = Some(now);
            }
        }

        if let Some(booking) = state.bookings.get_mut(&booking_id) {
            booking.status = "Confirmed".to_string();
            booking.confirmed_workshop_id = Some(workshop_id);
        }

        Ok(Some(accepted))
    }

    async fn mark_terminal(
        &self,
        offer_id: DbId,
        status: OfferStatus,
    ) -> Result<Option<CandidateOffer>, DispatchError> {
        let mut state = self.lock();
        let Some(offer) = state
            .offers
            .iter_mut()
            .find(|o| o.id == offer_id && o.is_pending())
        else {
            return Ok(None);
        };
        offer.status = Some(status.as_str().to_string());
        offer.response_time = Some(Utc::now());
        Ok(Some(offer.clone()))
    }

    async fn extend(
        &self,
        booking_id: DbId,
        expires_at: Timestamp,
    ) -> Result<Option<CandidateOffer>, DispatchError> {
        let mut state = self.lock();
        let Some(offer) = state
            .offers
            .iter_mut()
            .find(|o| o.booking_id == booking_id && o.is_pending())
        else {
            return Ok(None);
        };
        offer.expires_at = Some(expires_at);
        Ok(Some(offer.clone()))
    }

    async fn activate_next(
        &self,
        booking_id: DbId,
        expires_at: Timestamp,
    ) -> Result<NextCandidate, DispatchError> {
        let mut state = self.lock();

        if state.booking_status(booking_id) != Some(BookingStatus::Requested) {
            return Ok(NextCandidate::Closed);
        }

        let next = state
            .offers
            .iter_mut()
            .filter(|o| o.booking_id == booking_id && o.status.is_none())
            .min_by_key(|o| o.sequence);

        match next {
            Some(offer) => {
                offer.status = Some("Pending".to_string());
                offer.expires_at = Some(expires_at);
                offer.sent_at = Utc::now();
                let activated = offer.clone();
                Ok(NextCandidate::Activated(activated))
            }
            None => {
                if let Some(booking) = state.bookings.get_mut(&booking_id) {
                    booking.status = "Exhausted".to_string();
                }
                Ok(NextCandidate::Exhausted)
            }
        }
    }

    async fn lapsed_bookings(&self, now: Timestamp) -> Result<Vec<DbId>, DispatchError> {
        let state = self.lock();
        let mut ids: Vec<DbId> = state
            .offers
            .iter()
            .filter(|o| o.is_pending() && o.expires_at.is_some_and(|e| e <= now))
            .map(|o| o.booking_id)
            .collect();
        ids.sort_unstable();
        ids.dedup();
        Ok(ids)
    }
}

#[async_trait]
impl BookingStore for MemoryWorld {
    async fn customer_user(&self, customer_id: DbId) -> Result<Option<DbId>, DispatchError> {
        Ok(self.lock().customers.get(&customer_id).copied())
    }

    async fn create_booking(
        &self,
        input: &CreateEmergencyBooking,
    ) -> Result<EmergencyBooking, DispatchError> {
        let mut state = self.lock();
        let id = state.allocate_id();
        let booking = EmergencyBooking {
            id,
            customer_id: input.customer_id,
            vehicle_id: input.vehicle_id,
            service_id: input.service_id,
            notes: input.notes.clone(),
            address: input.address.clone(),
            address_city: input.address_city.clone(),
            address_street: input.address_street.clone(),
            latitude: input.latitude,
            longitude: input.longitude,
            price: input.price,
            status: "Requested".to_string(),
            confirmed_workshop_id: None,
            created_at: Utc::now(),
        };
        state.bookings.insert(id, booking.clone());
        Ok(booking)
    }

    async fn find_booking(
        &self,
        booking_id: DbId,
    ) -> Result<Option<EmergencyBooking>, DispatchError> {
        Ok(self.lock().bookings.get(&booking_id).cloned())
    }

    async fn booking_customer_user(
        &self,
        booking_id: DbId,
    ) -> Result<Option<DbId>, DispatchError> {
        let state = self.lock();
        Ok(state
            .bookings
            .get(&booking_id)
            .and_then(|b| state.customers.get(&b.customer_id).copied()))
    }

    async fn workshop_owner(&self, workshop_id: DbId) -> Result<Option<DbId>, DispatchError> {
        Ok(self.lock().workshop_owners.get(&workshop_id).copied())
    }

    async fn cancel(&self, booking_id: DbId) -> Result<CancelOutcome, DispatchError> {
        let mut state = self.lock();

        if state.booking_status(booking_id) != Some(BookingStatus::Requested) {
            return Ok(CancelOutcome::NotCancellable);
        }
        if let Some(booking) = state.bookings.get_mut(&booking_id) {
            booking.status = "Cancelled".to_string();
        }

        let closed = state
            .offers
            .iter_mut()
            .find(|o| o.booking_id == booking_id && o.is_pending())
            .map(|offer| {
                offer.status = Some("Skipped".to_string());
                offer.response_time = Some(Utc::now());
                offer.clone()
            });

        Ok(CancelOutcome::Cancelled(closed))
    }

    async fn mark_exhausted(&self, booking_id: DbId) -> Result<bool, DispatchError> {
        let mut state = self.lock();
        if state.booking_status(booking_id) != Some(BookingStatus::Requested) {
            return Ok(false);
        }
        if let Some(booking) = state.bookings.get_mut(&booking_id) {
            booking.status = "Exhausted".to_string();
            return Ok(true);
        }
        Ok(false)
    }

    async fn stalled_requested(&self) -> Result<Vec<DbId>, DispatchError> {
        let state = self.lock();
        let mut stalled = Vec::new();
        for (id, booking) in &state.bookings {
            if booking.booking_status() != Some(BookingStatus::Requested) {
                continue;
            }
            let open = state.offers.iter().any(|o| {
                o.booking_id == *id && (o.status.is_none() || o.is_pending())
            });
            if !open {
                stalled.push(*id);
            }
        }
        stalled.sort_unstable();
        Ok(stalled)
    }
}

#[async_trait]
impl NotificationGateway for MemoryWorld {
    async fn notify(&self, sender: DbId, receiver: DbId, message: &str, category: &str) {
        self.lock().notices.push(RecordedNotice {
            sender,
            receiver,
            message: message.to_string(),
            category: category.to_string(),
        });
    }
}
