//! Notification entity model.

use motoaid_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `notifications` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Notification {
    pub id: DbId,
    pub sender_user_id: DbId,
    pub receiver_user_id: DbId,
    pub message: String,
    pub category: String,
    pub is_read: bool,
    pub created_at: Timestamp,
}
