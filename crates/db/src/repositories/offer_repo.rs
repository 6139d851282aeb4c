//! Repository for the `emergency_booking_offers` table.
//!
//! Every state transition here is a conditional update (`... AND status =
//! 'Pending'` or `status IS NULL`), so two writers racing on the same offer
//! serialize on the row: the first commits, the second affects zero rows and
//! the caller observes the conflict.

use motoaid_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::offer::CandidateOffer;

/// Column list for `emergency_booking_offers` queries.
const COLUMNS: &str =
    "id, booking_id, workshop_id, sequence, status, expires_at, sent_at, response_time";

/// Result of trying to activate the next candidate in a booking's queue.
#[derive(Debug)]
pub enum NextCandidate {
    /// The next unactivated offer is now Pending.
    Activated(CandidateOffer),
    /// No unactivated offers remained; the booking was marked Exhausted.
    Exhausted,
    /// The booking had already left `Requested`; nothing was changed.
    Closed,
}

/// Provides queue operations for candidate offers.
pub struct OfferRepo;

impl OfferRepo {
    /// Insert the full candidate queue for a booking, in list order.
    ///
    /// The first row is created `Pending` with the given expiry; the rest are
    /// unactivated (NULL status). Returns the activated first offer. A
    /// non-empty list is a caller precondition, enforced at the engine edge.
    pub async fn create_queue(
        pool: &PgPool,
        booking_id: DbId,
        workshop_ids: &[DbId],
        expires_at: Timestamp,
    ) -> Result<CandidateOffer, sqlx::Error> {
        let (first_workshop, rest) = workshop_ids
            .split_first()
            .ok_or(sqlx::Error::RowNotFound)?;

        let mut tx = pool.begin().await?;

        let insert = format!(
            "INSERT INTO emergency_booking_offers
                (booking_id, workshop_id, sequence, status, expires_at)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );

        let first = sqlx::query_as::<_, CandidateOffer>(&insert)
            .bind(booking_id)
            .bind(first_workshop)
            .bind(1i32)
            .bind(Some("Pending"))
            .bind(Some(expires_at))
            .fetch_one(&mut *tx)
            .await?;

        for (i, workshop_id) in rest.iter().enumerate() {
            sqlx::query_as::<_, CandidateOffer>(&insert)
                .bind(booking_id)
                .bind(workshop_id)
                .bind((i + 2) as i32)
                .bind(None::<&str>)
                .bind(None::<Timestamp>)
                .fetch_one(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(first)
    }

    /// The single Pending offer for a booking, if any.
    pub async fn current_pending(
        pool: &PgPool,
        booking_id: DbId,
    ) -> Result<Option<CandidateOffer>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM emergency_booking_offers
             WHERE booking_id = $1 AND status = 'Pending'
             ORDER BY sequence ASC
             LIMIT 1"
        );
        sqlx::query_as::<_, CandidateOffer>(&query)
            .bind(booking_id)
            .fetch_optional(pool)
            .await
    }

    /// The full offer queue for a booking, in candidate order.
    pub async fn list_for_booking(
        pool: &PgPool,
        booking_id: DbId,
    ) -> Result<Vec<CandidateOffer>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM emergency_booking_offers
             WHERE booking_id = $1
             ORDER BY sequence ASC"
        );
        sqlx::query_as::<_, CandidateOffer>(&query)
            .bind(booking_id)
            .fetch_all(pool)
            .await
    }

    /// Settle a Pending offer as Rejected or Skipped, stamping the response
    /// time. Returns `None` if the offer was not Pending (already settled,
    /// never activated, or unknown id).
    pub async fn mark_terminal(
        pool: &PgPool,
        offer_id: DbId,
        status: &str,
    ) -> Result<Option<CandidateOffer>, sqlx::Error> {
        let query = format!(
            "UPDATE emergency_booking_offers
             SET status = $2, response_time = NOW()
             WHERE id = $1 AND status = 'Pending'
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, CandidateOffer>(&query)
            .bind(offer_id)
            .bind(status)
            .fetch_optional(pool)
            .await
    }

    /// Accept a Pending offer: the offer becomes Accepted, the booking
    /// becomes Confirmed with this offer's workshop, and every other
    /// non-terminal offer on the booking becomes Rejected -- one transaction.
    ///
    /// Returns `None` (nothing changed) if the offer was not Pending or the
    /// booking had already left `Requested`.
    pub async fn accept(
        pool: &PgPool,
        offer_id: DbId,
    ) -> Result<Option<CandidateOffer>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let settle = format!(
            "UPDATE emergency_booking_offers
             SET status = 'Accepted', response_time = NOW()
             WHERE id = $1 AND status = 'Pending'
             RETURNING {COLUMNS}"
        );
        let Some(offer) = sqlx::query_as::<_, CandidateOffer>(&settle)
            .bind(offer_id)
            .fetch_optional(&mut *tx)
            .await?
        else {
            tx.rollback().await?;
            return Ok(None);
        };

        let confirmed = sqlx::query(
            "UPDATE emergency_bookings
             SET status = 'Confirmed', confirmed_workshop_id = $2
             WHERE id = $1 AND status = 'Requested'",
        )
        .bind(offer.booking_id)
        .bind(offer.workshop_id)
        .execute(&mut *tx)
        .await?;

        if confirmed.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        sqlx::query(
            "UPDATE emergency_booking_offers
             SET status = 'Rejected', response_time = NOW()
             WHERE booking_id = $1 AND id <> $2
               AND (status IS NULL OR status = 'Pending')",
        )
        .bind(offer.booking_id)
        .bind(offer.id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(offer))
    }

    /// Refresh the expiry on a booking's Pending offer.
    ///
    /// Returns the refreshed offer, or `None` if nothing is Pending.
    pub async fn extend_pending(
        pool: &PgPool,
        booking_id: DbId,
        expires_at: Timestamp,
    ) -> Result<Option<CandidateOffer>, sqlx::Error> {
        let query = format!(
            "UPDATE emergency_booking_offers
             SET expires_at = $2
             WHERE booking_id = $1 AND status = 'Pending'
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, CandidateOffer>(&query)
            .bind(booking_id)
            .bind(expires_at)
            .fetch_optional(pool)
            .await
    }

    /// Activate the lowest-sequence unactivated offer, or mark the booking
    /// Exhausted when none remains -- one transaction, so a crash can never
    /// strand the booking between the two outcomes.
    pub async fn activate_next(
        pool: &PgPool,
        booking_id: DbId,
        expires_at: Timestamp,
    ) -> Result<NextCandidate, sqlx::Error> {
        let mut tx = pool.begin().await?;

        // Lock the booking row so concurrent cascades on it serialize.
        let status: Option<(String,)> =
            sqlx::query_as("SELECT status FROM emergency_bookings WHERE id = $1 FOR UPDATE")
                .bind(booking_id)
                .fetch_optional(&mut *tx)
                .await?;

        match status {
            Some((s,)) if s == "Requested" => {}
            _ => {
                tx.rollback().await?;
                return Ok(NextCandidate::Closed);
            }
        }

        let activate = format!(
            "UPDATE emergency_booking_offers
             SET status = 'Pending', expires_at = $2, sent_at = NOW()
             WHERE id = (
                 SELECT id FROM emergency_booking_offers
                 WHERE booking_id = $1 AND status IS NULL
                 ORDER BY sequence ASC
                 LIMIT 1
             )
             RETURNING {COLUMNS}"
        );
        let next = sqlx::query_as::<_, CandidateOffer>(&activate)
            .bind(booking_id)
            .bind(expires_at)
            .fetch_optional(&mut *tx)
            .await?;

        let outcome = match next {
            Some(offer) => NextCandidate::Activated(offer),
            None => {
                sqlx::query(
                    "UPDATE emergency_bookings
                     SET status = 'Exhausted'
                     WHERE id = $1 AND status = 'Requested'",
                )
                .bind(booking_id)
                .execute(&mut *tx)
                .await?;
                NextCandidate::Exhausted
            }
        };

        tx.commit().await?;
        Ok(outcome)
    }

    /// Booking ids whose Pending offer's expiry has passed.
    pub async fn lapsed_booking_ids(
        pool: &PgPool,
        now: Timestamp,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        let rows: Vec<(DbId,)> = sqlx::query_as(
            "SELECT DISTINCT booking_id FROM emergency_booking_offers
             WHERE status = 'Pending' AND expires_at IS NOT NULL AND expires_at <= $1",
        )
        .bind(now)
        .fetch_all(pool)
        .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}
