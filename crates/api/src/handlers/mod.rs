//! Request handlers.
//!
//! Each submodule provides async handler functions for a single resource.
//! Handlers validate input, delegate to the dispatch engine or the
//! repositories in `motoaid_db`, and map errors via [`AppError`].
//!
//! [`AppError`]: crate::error::AppError

pub mod emergency;
pub mod notification;
