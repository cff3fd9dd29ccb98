//! Data Transfer Objects for the marketplace API
//!
//! Request and response shapes exchanged between the server and its clients.
//! Domain entities are returned as-is; DTOs only cover inputs and listings.

pub mod job;
pub mod notification;
