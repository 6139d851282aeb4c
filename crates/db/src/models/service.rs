//! Emergency service catalog entity.

use motoaid_core::types::DbId;
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `emergency_services` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct EmergencyService {
    pub id: DbId,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub is_active: bool,
}
