//! Repository for the `customers` table.

use motoaid_core::types::DbId;
use sqlx::PgPool;

/// Lookup operations for customers.
pub struct CustomerRepo;

impl CustomerRepo {
    /// The user id behind a customer, or `None` for an unknown customer.
    pub async fn find_user(
        pool: &PgPool,
        customer_id: DbId,
    ) -> Result<Option<DbId>, sqlx::Error> {
        let row: Option<(DbId,)> =
            sqlx::query_as("SELECT user_id FROM customers WHERE id = $1")
                .bind(customer_id)
                .fetch_optional(pool)
                .await?;
        Ok(row.map(|(id,)| id))
    }
}
