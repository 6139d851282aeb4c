//! Repository structs: one per table, stateless, parameterized SQL only.

pub mod booking_repo;
pub mod customer_repo;
pub mod notification_repo;
pub mod offer_repo;
pub mod service_repo;
pub mod workshop_repo;

pub use booking_repo::{BookingRepo, CancelOutcome};
pub use customer_repo::CustomerRepo;
pub use notification_repo::NotificationRepo;
pub use offer_repo::{NextCandidate, OfferRepo};
pub use service_repo::ServiceRepo;
pub use workshop_repo::WorkshopRepo;
