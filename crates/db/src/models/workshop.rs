//! Workshop search read models.

use motoaid_core::types::DbId;
use serde::Serialize;
use sqlx::FromRow;

/// A workshop offering a given emergency service, with its quoted price.
///
/// Produced by the candidate search query; scoring happens in `core`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct WorkshopCandidateRow {
    pub workshop_id: DbId,
    pub name: String,
    pub price: f64,
    pub city: Option<String>,
    pub street: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}
