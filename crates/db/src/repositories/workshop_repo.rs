//! Repository for the `workshops` table.

use motoaid_core::types::DbId;
use sqlx::PgPool;

use crate::models::workshop::WorkshopCandidateRow;

/// Lookup operations for workshops.
pub struct WorkshopRepo;

impl WorkshopRepo {
    /// The owning user of a workshop, for notifications.
    pub async fn owner_user(
        pool: &PgPool,
        workshop_id: DbId,
    ) -> Result<Option<DbId>, sqlx::Error> {
        let row: Option<(DbId,)> =
            sqlx::query_as("SELECT owner_user_id FROM workshops WHERE id = $1")
                .bind(workshop_id)
                .fetch_optional(pool)
                .await?;
        Ok(row.map(|(id,)| id))
    }

    /// All workshops offering a given emergency service, with their quoted
    /// price and address fields. Unordered; the caller ranks.
    pub async fn candidates_for_service(
        pool: &PgPool,
        service_id: DbId,
    ) -> Result<Vec<WorkshopCandidateRow>, sqlx::Error> {
        sqlx::query_as::<_, WorkshopCandidateRow>(
            "SELECT w.id AS workshop_id, w.name, wes.price,
                    w.city, w.street, w.latitude, w.longitude
             FROM workshop_emergency_services wes
             JOIN workshops w ON w.id = wes.workshop_id
             WHERE wes.service_id = $1",
        )
        .bind(service_id)
        .fetch_all(pool)
        .await
    }
}
