pub mod emergency;
pub mod health;
pub mod notification;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /emergency/services                          emergency service catalog
/// /emergency/search/{service_id}               ranked candidate workshops
/// /emergency/bookings                          create, list (?customer_id)
/// /emergency/bookings/{id}/skip                skip current offer (POST)
/// /emergency/bookings/{id}/extend              extend current offer (POST)
/// /emergency/bookings/{id}/cancel              cancel booking (POST)
/// /emergency/bookings/{id}/offers              full offer queue (GET)
/// /emergency/offers/{id}/respond               accept/reject offer (POST)
/// /emergency/workshops/{id}/bookings           a workshop's live offers
///
/// /notifications                               list (?user_id)
/// /notifications/unread-count                  unread count (?user_id)
/// /notifications/read-all                      mark all read (POST)
/// /notifications/{id}/read                     mark one read (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/emergency", emergency::router())
        .nest("/notifications", notification::router())
}
