//! API handlers for Velin REST endpoints.
//!
//! Authentication is handled upstream by the gateway; handlers receive the
//! acting patron's id in the request payload.

pub mod fees;
pub mod health;
pub mod loans;
pub mod openapi;
pub mod reservations;
