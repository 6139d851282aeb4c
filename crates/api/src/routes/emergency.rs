//! Route definitions for the `/emergency` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::emergency;
use crate::state::AppState;

/// Routes mounted at `/emergency`.
///
/// ```text
/// GET    /services                    -> list_services
/// GET    /search/{service_id}         -> search_workshops (?city&street&lat&lon)
/// POST   /bookings                    -> create_booking
/// GET    /bookings                    -> list_customer_bookings (?customer_id)
/// POST   /bookings/{id}/skip          -> skip_booking
/// POST   /bookings/{id}/extend        -> extend_booking
/// POST   /bookings/{id}/cancel        -> cancel_booking
/// GET    /bookings/{id}/offers        -> list_booking_offers
/// POST   /offers/{id}/respond         -> respond_offer
/// GET    /workshops/{id}/bookings     -> list_workshop_bookings
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/services", get(emergency::list_services))
        .route("/search/{service_id}", get(emergency::search_workshops))
        .route(
            "/bookings",
            get(emergency::list_customer_bookings).post(emergency::create_booking),
        )
        .route("/bookings/{id}/skip", post(emergency::skip_booking))
        .route("/bookings/{id}/extend", post(emergency::extend_booking))
        .route("/bookings/{id}/cancel", post(emergency::cancel_booking))
        .route("/bookings/{id}/offers", get(emergency::list_booking_offers))
        .route("/offers/{id}/respond", post(emergency::respond_offer))
        .route(
            "/workshops/{id}/bookings",
            get(emergency::list_workshop_bookings),
        )
}
