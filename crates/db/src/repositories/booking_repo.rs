//! Repository for the `emergency_bookings` table.

use motoaid_core::types::DbId;
use sqlx::PgPool;

use crate::models::booking::{
    CreateEmergencyBooking, CustomerBookingRow, EmergencyBooking, WorkshopBookingRow,
};
use crate::models::offer::CandidateOffer;

/// Column list for `emergency_bookings` queries.
const COLUMNS: &str = "id, customer_id, vehicle_id, service_id, notes, address, \
    address_city, address_street, latitude, longitude, price, status, \
    confirmed_workshop_id, created_at";

/// Result of a cancel attempt.
#[derive(Debug)]
pub enum CancelOutcome {
    /// The booking moved to Cancelled; carries the Pending offer that was
    /// closed alongside it, if there was one.
    Cancelled(Option<CandidateOffer>),
    /// The booking had already left `Requested`; nothing was changed.
    NotCancellable,
}

/// Provides CRUD operations for emergency bookings.
pub struct BookingRepo;

impl BookingRepo {
    /// Insert a new booking in the `Requested` state, returning the row.
    pub async fn create(
        pool: &PgPool,
        input: &CreateEmergencyBooking,
    ) -> Result<EmergencyBooking, sqlx::Error> {
        let query = format!(
            "INSERT INTO emergency_bookings
                (customer_id, vehicle_id, service_id, notes, address,
                 address_city, address_street, latitude, longitude, price)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, EmergencyBooking>(&query)
            .bind(input.customer_id)
            .bind(input.vehicle_id)
            .bind(input.service_id)
            .bind(&input.notes)
            .bind(&input.address)
            .bind(&input.address_city)
            .bind(&input.address_street)
            .bind(input.latitude)
            .bind(input.longitude)
            .bind(input.price)
            .fetch_one(pool)
            .await
    }

    /// Find a booking by its primary key.
    pub async fn find_by_id(
        pool: &PgPool,
        booking_id: DbId,
    ) -> Result<Option<EmergencyBooking>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM emergency_bookings WHERE id = $1");
        sqlx::query_as::<_, EmergencyBooking>(&query)
            .bind(booking_id)
            .fetch_optional(pool)
            .await
    }

    /// Cancel a booking that is still `Requested`, closing its Pending offer
    /// (if any) as Skipped in the same transaction so no cascade can follow.
    pub async fn cancel(pool: &PgPool, booking_id: DbId) -> Result<CancelOutcome, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let cancelled = sqlx::query(
            "UPDATE emergency_bookings
             SET status = 'Cancelled'
             WHERE id = $1 AND status = 'Requested'",
        )
        .bind(booking_id)
        .execute(&mut *tx)
        .await?;

        if cancelled.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(CancelOutcome::NotCancellable);
        }

        let closed = sqlx::query_as::<_, CandidateOffer>(
            "UPDATE emergency_booking_offers
             SET status = 'Skipped', response_time = NOW()
             WHERE booking_id = $1 AND status = 'Pending'
             RETURNING id, booking_id, workshop_id, sequence, status, expires_at, \
                 sent_at, response_time",
        )
        .bind(booking_id)
        .fetch_optional(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(CancelOutcome::Cancelled(closed))
    }

    /// Conditionally mark a `Requested` booking as Exhausted.
    ///
    /// Returns `true` when the row was updated. Normal cascades exhaust
    /// bookings inside [`crate::repositories::OfferRepo::activate_next`];
    /// this exists for the sweep's stall repair.
    pub async fn mark_exhausted(pool: &PgPool, booking_id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE emergency_bookings
             SET status = 'Exhausted'
             WHERE id = $1 AND status = 'Requested'",
        )
        .bind(booking_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Bookings stuck in `Requested` with no Pending and no unactivated
    /// offers left. The engine cannot produce this state itself; the sweep
    /// repairs it if outside interference does.
    pub async fn stalled_requested(pool: &PgPool) -> Result<Vec<DbId>, sqlx::Error> {
        let rows: Vec<(DbId,)> = sqlx::query_as(
            "SELECT b.id FROM emergency_bookings b
             WHERE b.status = 'Requested'
               AND NOT EXISTS (
                   SELECT 1 FROM emergency_booking_offers o
                   WHERE o.booking_id = b.id
                     AND (o.status = 'Pending' OR o.status IS NULL)
               )",
        )
        .fetch_all(pool)
        .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    /// The user id behind a booking's customer, for notifications.
    pub async fn customer_user(
        pool: &PgPool,
        booking_id: DbId,
    ) -> Result<Option<DbId>, sqlx::Error> {
        let row: Option<(DbId,)> = sqlx::query_as(
            "SELECT c.user_id FROM customers c
             JOIN emergency_bookings b ON b.customer_id = c.id
             WHERE b.id = $1",
        )
        .bind(booking_id)
        .fetch_optional(pool)
        .await?;
        Ok(row.map(|(id,)| id))
    }

    /// A customer's bookings, newest first, with service name and queue size.
    pub async fn list_for_customer(
        pool: &PgPool,
        customer_id: DbId,
    ) -> Result<Vec<CustomerBookingRow>, sqlx::Error> {
        sqlx::query_as::<_, CustomerBookingRow>(
            "SELECT b.id, b.vehicle_id, s.name AS service_name, b.notes, b.address,
                    b.price, b.status, b.confirmed_workshop_id, b.created_at,
                    (SELECT COUNT(*) FROM emergency_booking_offers o
                     WHERE o.booking_id = b.id) AS candidate_count
             FROM emergency_bookings b
             JOIN emergency_services s ON s.id = b.service_id
             WHERE b.customer_id = $1
             ORDER BY b.created_at DESC",
        )
        .bind(customer_id)
        .fetch_all(pool)
        .await
    }

    /// A workshop's live offers (Pending or Accepted) with booking context,
    /// newest booking first.
    pub async fn list_for_workshop(
        pool: &PgPool,
        workshop_id: DbId,
    ) -> Result<Vec<WorkshopBookingRow>, sqlx::Error> {
        sqlx::query_as::<_, WorkshopBookingRow>(
            "SELECT o.id AS offer_id, b.id AS booking_id, o.status AS offer_status,
                    o.expires_at, b.vehicle_id, s.name AS service_name, b.notes,
                    b.address, b.price, b.status AS booking_status, b.created_at
             FROM emergency_booking_offers o
             JOIN emergency_bookings b ON b.id = o.booking_id
             JOIN emergency_services s ON s.id = b.service_id
             WHERE o.workshop_id = $1
               AND o.status IN ('Pending', 'Accepted')
             ORDER BY b.created_at DESC",
        )
        .bind(workshop_id)
        .fetch_all(pool)
        .await
    }
}
