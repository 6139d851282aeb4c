//! The emergency dispatch engine.
//!
//! Given an ordered candidate list, the engine offers the job to exactly one
//! workshop at a time, bounds each offer with a TTL, and cascades to the next
//! candidate on reject/skip until one accepts or the queue runs dry.
//!
//! [`DispatchController`] owns the state machine. It talks to the world
//! through three injected capabilities ([`OfferLedger`], [`BookingStore`],
//! [`NotificationGateway`]), so the whole engine runs unchanged against the
//! SQL adapters in production and the in-memory world in tests.

pub mod controller;
pub mod ports;
pub mod sql;
pub mod testing;

pub use controller::{DispatchController, RespondAction};
pub use ports::{BookingStore, DispatchError, NotificationGateway, OfferLedger};
pub use sql::{SqlBookingStore, SqlOfferLedger};
