//! Handlers for the emergency dispatch resource.
//!
//! The write endpoints (create, respond, skip, extend, cancel) delegate to
//! the [`DispatchController`]; the read endpoints query the repositories
//! directly.
//!
//! [`DispatchController`]: crate::engine::DispatchController

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use motoaid_core::dispatch::BookingStatus;
use motoaid_core::error::CoreError;
use motoaid_core::scoring::{self, CustomerLocation, GeoPoint};
use motoaid_core::types::{DbId, Timestamp};
use motoaid_db::models::booking::CreateEmergencyBooking;
use motoaid_db::models::offer::CandidateOffer;
use motoaid_db::repositories::{
    BookingRepo, NextCandidate, OfferRepo, ServiceRepo, WorkshopRepo,
};

use crate::engine::RespondAction;
use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Body of `POST /emergency/bookings`.
#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
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
    /// Candidate workshops in dispatch order. The engine offers the job to
    /// these one at a time, in exactly this order.
    pub workshop_ids: Vec<DbId>,
}

/// Body of `POST /emergency/offers/{id}/respond`.
#[derive(Debug, Deserialize)]
pub struct RespondRequest {
    pub action: RespondAction,
}

#[derive(Debug, Serialize)]
pub struct RespondResponse {
    pub status: BookingStatus,
}

#[derive(Debug, Serialize)]
pub struct SkipResponse {
    pub outcome: &'static str,
    pub next_offer: Option<CandidateOffer>,
}

#[derive(Debug, Serialize)]
pub struct ExtendResponse {
    pub expires_at: Timestamp,
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub status: BookingStatus,
}

/// Query string of `GET /emergency/search/{service_id}`.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub city: String,
    pub street: String,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

/// One ranked result of the candidate search.
#[derive(Debug, Serialize)]
pub struct RankedWorkshop {
    pub workshop_id: DbId,
    pub name: String,
    pub price: f64,
    pub city: Option<String>,
    pub street: Option<String>,
    pub score: i32,
    pub distance_km: Option<f64>,
}

/// Query string of `GET /emergency/bookings`.
#[derive(Debug, Deserialize)]
pub struct CustomerBookingsQuery {
    pub customer_id: DbId,
}

// ---------------------------------------------------------------------------
// Write endpoints (dispatch engine)
// ---------------------------------------------------------------------------

/// POST /api/v1/emergency/bookings
///
/// Create an emergency booking and start the offer cascade on the supplied
/// candidate list.
pub async fn create_booking(
    State(state): State<AppState>,
    Json(input): Json<CreateBookingRequest>,
) -> AppResult<impl IntoResponse> {
    validate_create(&input)?;

    let create = CreateEmergencyBooking {
        customer_id: input.customer_id,
        vehicle_id: input.vehicle_id,
        service_id: input.service_id,
        notes: input.notes,
        address: input.address,
        address_city: input.address_city,
        address_street: input.address_street,
        latitude: input.latitude,
        longitude: input.longitude,
        price: input.price,
    };

    let booking = state.engine.create(create, &input.workshop_ids).await?;

    Ok((StatusCode::CREATED, Json(DataResponse { data: booking })))
}

/// POST /api/v1/emergency/offers/{id}/respond
///
/// A workshop accepts or rejects its Pending offer. Returns the booking's
/// status after the transition; 409 if the offer is no longer Pending.
pub async fn respond_offer(
    State(state): State<AppState>,
    Path(offer_id): Path<DbId>,
    Json(input): Json<RespondRequest>,
) -> AppResult<impl IntoResponse> {
    let status = state.engine.respond(offer_id, input.action).await?;
    Ok(Json(DataResponse {
        data: RespondResponse { status },
    }))
}

/// POST /api/v1/emergency/bookings/{id}/skip
///
/// Skip the current Pending offer without waiting out its TTL and advance
/// to the next candidate.
pub async fn skip_booking(
    State(state): State<AppState>,
    Path(booking_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let data = match state.engine.skip(booking_id).await? {
        NextCandidate::Activated(offer) => SkipResponse {
            outcome: "activated",
            next_offer: Some(offer),
        },
        NextCandidate::Exhausted => SkipResponse {
            outcome: "exhausted",
            next_offer: None,
        },
        NextCandidate::Closed => SkipResponse {
            outcome: "closed",
            next_offer: None,
        },
    };
    Ok(Json(DataResponse { data }))
}

/// POST /api/v1/emergency/bookings/{id}/extend
///
/// Grant the current Pending offer a fresh response window.
pub async fn extend_booking(
    State(state): State<AppState>,
    Path(booking_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let expires_at = state.engine.extend(booking_id).await?;
    Ok(Json(DataResponse {
        data: ExtendResponse { expires_at },
    }))
}

/// POST /api/v1/emergency/bookings/{id}/cancel
///
/// Withdraw a booking that has not been confirmed yet.
pub async fn cancel_booking(
    State(state): State<AppState>,
    Path(booking_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    state.engine.cancel(booking_id).await?;
    Ok(Json(DataResponse {
        data: CancelResponse {
            status: BookingStatus::Cancelled,
        },
    }))
}

// ---------------------------------------------------------------------------
// Read endpoints
// ---------------------------------------------------------------------------

/// GET /api/v1/emergency/services
///
/// The active emergency service catalog.
pub async fn list_services(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let services = ServiceRepo::list_active(&state.pool).await?;
    Ok(Json(DataResponse { data: services }))
}

/// GET /api/v1/emergency/search/{service_id}
///
/// Workshops offering the service, ranked by locality score and distance.
/// Advisory only: callers choose how many candidates to dispatch to, and in
/// what final order.
pub async fn search_workshops(
    State(state): State<AppState>,
    Path(service_id): Path<DbId>,
    Query(query): Query<SearchQuery>,
) -> AppResult<impl IntoResponse> {
    if query.city.trim().is_empty() || query.street.trim().is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "city and street are required".to_string(),
        )));
    }

    let customer = CustomerLocation {
        city: query.city,
        street: query.street,
        point: match (query.lat, query.lon) {
            (Some(latitude), Some(longitude)) => Some(GeoPoint {
                latitude,
                longitude,
            }),
            _ => None,
        },
    };

    let rows = WorkshopRepo::candidates_for_service(&state.pool, service_id).await?;

    let mut ranked: Vec<RankedWorkshop> = rows
        .into_iter()
        .map(|row| {
            let point = match (row.latitude, row.longitude) {
                (Some(latitude), Some(longitude)) => Some(GeoPoint {
                    latitude,
                    longitude,
                }),
                _ => None,
            };
            let score = scoring::score_candidate(
                &customer,
                row.city.as_deref(),
                row.street.as_deref(),
                point,
            );
            RankedWorkshop {
                workshop_id: row.workshop_id,
                name: row.name,
                price: row.price,
                city: row.city,
                street: row.street,
                score: score.points,
                distance_km: score.distance_km,
            }
        })
        .collect();

    ranked.sort_by(|a, b| {
        scoring::compare_scores(
            &scoring::SiteScore {
                points: a.score,
                distance_km: a.distance_km,
            },
            &scoring::SiteScore {
                points: b.score,
                distance_km: b.distance_km,
            },
        )
    });

    Ok(Json(DataResponse { data: ranked }))
}

/// GET /api/v1/emergency/bookings?customer_id={id}
///
/// A customer's emergency bookings, newest first.
pub async fn list_customer_bookings(
    State(state): State<AppState>,
    Query(query): Query<CustomerBookingsQuery>,
) -> AppResult<impl IntoResponse> {
    let bookings = BookingRepo::list_for_customer(&state.pool, query.customer_id).await?;
    Ok(Json(DataResponse { data: bookings }))
}

/// GET /api/v1/emergency/workshops/{workshop_id}/bookings
///
/// A workshop's live offers (Pending or Accepted) with booking context.
pub async fn list_workshop_bookings(
    State(state): State<AppState>,
    Path(workshop_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let bookings = BookingRepo::list_for_workshop(&state.pool, workshop_id).await?;
    Ok(Json(DataResponse { data: bookings }))
}

/// GET /api/v1/emergency/bookings/{id}/offers
///
/// The booking's full offer queue, in candidate order (audit view).
pub async fn list_booking_offers(
    State(state): State<AppState>,
    Path(booking_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    BookingRepo::find_by_id(&state.pool, booking_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Booking",
            id: booking_id,
        }))?;

    let offers = OfferRepo::list_for_booking(&state.pool, booking_id).await?;
    Ok(Json(DataResponse { data: offers }))
}

// ---------------------------------------------------------------------------
// Validation helpers
// ---------------------------------------------------------------------------

/// Validate a create request before anything is persisted.
fn validate_create(input: &CreateBookingRequest) -> AppResult<()> {
    if input.workshop_ids.is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "workshop_ids must contain at least one workshop".to_string(),
        )));
    }
    if input.address.trim().is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "address is required".to_string(),
        )));
    }
    if !input.price.is_finite() || input.price < 0.0 {
        return Err(AppError::Core(CoreError::Validation(
            "price must be a non-negative number".to_string(),
        )));
    }
    Ok(())
}
