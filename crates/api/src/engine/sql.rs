//! SQL adapters for the engine's capability traits.
//!
//! Thin delegation to the `motoaid-db` repositories; the conditional-update
//! and transaction guarantees live there.

use async_trait::async_trait;
use motoaid_core::dispatch::OfferStatus;
use motoaid_core::types::{DbId, Timestamp};
use motoaid_db::models::booking::{CreateEmergencyBooking, EmergencyBooking};
use motoaid_db::models::offer::CandidateOffer;
use motoaid_db::repositories::{
    BookingRepo, CancelOutcome, CustomerRepo, NextCandidate, OfferRepo, WorkshopRepo,
};
use motoaid_db::DbPool;

use super::ports::{BookingStore, DispatchError, OfferLedger};

/// [`OfferLedger`] backed by the `emergency_booking_offers` table.
#[derive(Clone)]
pub struct SqlOfferLedger {
    pool: DbPool,
}

impl SqlOfferLedger {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OfferLedger for SqlOfferLedger {
    async fn create_queue(
        &self,
        booking_id: DbId,
        workshop_ids: &[DbId],
        expires_at: Timestamp,
    ) -> Result<CandidateOffer, DispatchError> {
        if workshop_ids.is_empty() {
            return Err(DispatchError::InvalidCandidateList);
        }
        OfferRepo::create_queue(&self.pool, booking_id, workshop_ids, expires_at)
            .await
            .map_err(DispatchError::storage)
    }

    async fn current_pending(
        &self,
        booking_id: DbId,
    ) -> Result<Option<CandidateOffer>, DispatchError> {
        OfferRepo::current_pending(&self.pool, booking_id)
            .await
            .map_err(DispatchError::storage)
    }

    async fn accept(&self, offer_id: DbId) -> Result<Option<CandidateOffer>, DispatchError> {
        OfferRepo::accept(&self.pool, offer_id)
            .await
            .map_err(DispatchError::storage)
    }

    async fn mark_terminal(
        &self,
        offer_id: DbId,
        status: OfferStatus,
    ) -> Result<Option<CandidateOffer>, DispatchError> {
        OfferRepo::mark_terminal(&self.pool, offer_id, status.as_str())
            .await
            .map_err(DispatchError::storage)
    }

    async fn extend(
        &self,
        booking_id: DbId,
        expires_at: Timestamp,
    ) -> Result<Option<CandidateOffer>, DispatchError> {
        OfferRepo::extend_pending(&self.pool, booking_id, expires_at)
            .await
            .map_err(DispatchError::storage)
    }

    async fn activate_next(
        &self,
        booking_id: DbId,
        expires_at: Timestamp,
    ) -> Result<NextCandidate, DispatchError> {
        OfferRepo::activate_next(&self.pool, booking_id, expires_at)
            .await
            .map_err(DispatchError::storage)
    }

    async fn lapsed_bookings(&self, now: Timestamp) -> Result<Vec<DbId>, DispatchError> {
        OfferRepo::lapsed_booking_ids(&self.pool, now)
            .await
            .map_err(DispatchError::storage)
    }
}

/// [`BookingStore`] backed by the booking/customer/workshop tables.
#[derive(Clone)]
pub struct SqlBookingStore {
    pool: DbPool,
}

impl SqlBookingStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookingStore for SqlBookingStore {
    async fn customer_user(&self, customer_id: DbId) -> Result<Option<DbId>, DispatchError> {
        CustomerRepo::find_user(&self.pool, customer_id)
            .await
            .map_err(DispatchError::storage)
    }

    async fn create_booking(
        &self,
        input: &CreateEmergencyBooking,
    ) -> Result<EmergencyBooking, DispatchError> {
        BookingRepo::create(&self.pool, input)
            .await
            .map_err(DispatchError::storage)
    }

    async fn find_booking(
        &self,
        booking_id: DbId,
    ) -> Result<Option<EmergencyBooking>, DispatchError> {
        BookingRepo::find_by_id(&self.pool, booking_id)
            .await
            .map_err(DispatchError::storage)
    }

    async fn booking_customer_user(
        &self,
        booking_id: DbId,
    ) -> Result<Option<DbId>, DispatchError> {
        BookingRepo::customer_user(&self.pool, booking_id)
            .await
            .map_err(DispatchError::storage)
    }

    async fn workshop_owner(&self, workshop_id: DbId) -> Result<Option<DbId>, DispatchError> {
        WorkshopRepo::owner_user(&self.pool, workshop_id)
            .await
            .map_err(DispatchError::storage)
    }

    async fn cancel(&self, booking_id: DbId) -> Result<CancelOutcome, DispatchError> {
        BookingRepo::cancel(&self.pool, booking_id)
            .await
            .map_err(DispatchError::storage)
    }

    async fn mark_exhausted(&self, booking_id: DbId) -> Result<bool, DispatchError> {
        BookingRepo::mark_exhausted(&self.pool, booking_id)
            .await
            .map_err(DispatchError::storage)
    }

    async fn stalled_requested(&self) -> Result<Vec<DbId>, DispatchError> {
        BookingRepo::stalled_requested(&self.pool)
            .await
            .map_err(DispatchError::storage)
    }
}
