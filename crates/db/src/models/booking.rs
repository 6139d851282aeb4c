//! Emergency booking entity models and DTOs.

use motoaid_core::dispatch::BookingStatus;
use motoaid_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `emergency_bookings` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct EmergencyBooking {
    pub id: DbId,
    pub customer_id: DbId,
    pub vehicle_id: DbId,
    pub service_id: DbId,
    pub notes: Option<String>,
    pub address: String,
    pub address_city: Option<String>,
    pub address_street: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub price: f64,
    pub status: String,
    pub confirmed_workshop_id: Option<DbId>,
    pub created_at: Timestamp,
}

impl EmergencyBooking {
    /// Typed view of the status column.
    pub fn booking_status(&self) -> Option<BookingStatus> {
        BookingStatus::parse(&self.status)
    }
}

/// DTO for inserting a booking. The offer queue is created separately.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateEmergencyBooking {
    pub customer_id: DbId,
    pub vehicle_id: DbId,
    pub service_id: DbId,
    pub notes: Option<String>,
    pub address: String,
    pub address_city: Option<String>,
    pub address_street: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub price: f64,
}

/// Customer-facing list row: booking plus service name and queue size.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CustomerBookingRow {
    pub id: DbId,
    pub vehicle_id: DbId,
    pub service_name: String,
    pub notes: Option<String>,
    pub address: String,
    pub price: f64,
    pub status: String,
    pub confirmed_workshop_id: Option<DbId>,
    pub created_at: Timestamp,
    pub candidate_count: i64,
}

/// Workshop-facing list row: the workshop's live offers with booking context.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct WorkshopBookingRow {
    pub offer_id: DbId,
    pub booking_id: DbId,
    pub offer_status: String,
    pub expires_at: Option<Timestamp>,
    pub vehicle_id: DbId,
    pub service_name: String,
    pub notes: Option<String>,
    pub address: String,
    pub price: f64,
    pub booking_status: String,
    pub created_at: Timestamp,
}
