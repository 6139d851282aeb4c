//! Repository for the `emergency_services` catalog table.

use sqlx::PgPool;

use crate::models::service::EmergencyService;

/// Column list for `emergency_services` queries.
const COLUMNS: &str = "id, name, description, category, is_active";

/// Read operations for the emergency service catalog.
pub struct ServiceRepo;

impl ServiceRepo {
    /// All active emergency services, in id order.
    pub async fn list_active(pool: &PgPool) -> Result<Vec<EmergencyService>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM emergency_services
             WHERE is_active = TRUE
             ORDER BY id ASC"
        );
        sqlx::query_as::<_, EmergencyService>(&query)
            .fetch_all(pool)
            .await
    }
}
