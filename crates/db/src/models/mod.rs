//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - `Deserialize` create DTOs for inserts where the table has them
//! - Read-model row structs for the handler list queries

pub mod booking;
pub mod notification;
pub mod offer;
pub mod service;
pub mod workshop;
