//! Notification gateway backed by the `notifications` table.
//!
//! The engine treats notification delivery as a best-effort side channel, so
//! this adapter swallows storage failures after logging them. Push/email/SMS
//! transports would subscribe to the same rows; none are wired here.

use async_trait::async_trait;
use motoaid_core::types::DbId;
use motoaid_db::repositories::NotificationRepo;
use motoaid_db::DbPool;

use crate::engine::NotificationGateway;

/// Writes in-app notification rows, fire-and-forget.
#[derive(Clone)]
pub struct StoredNotificationGateway {
    pool: DbPool,
}

impl StoredNotificationGateway {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationGateway for StoredNotificationGateway {
    async fn notify(&self, sender: DbId, receiver: DbId, message: &str, category: &str) {
        match NotificationRepo::create(&self.pool, sender, receiver, message, category).await {
            Ok(id) => {
                tracing::debug!(notification_id = id, receiver, category, "Notification stored");
            }
            Err(err) => {
                // The state transition already committed; never propagate.
                tracing::warn!(receiver, category, error = %err, "Notification insert failed");
            }
        }
    }
}
