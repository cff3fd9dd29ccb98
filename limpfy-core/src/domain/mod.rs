//! Core domain types
//!
//! This module contains the core domain structures used across Limpfy services.
//! They are shared between the server (for persistence and fan-out) and the
//! client (for decoding API responses).

pub mod actor;
pub mod event;
pub mod job;
pub mod notification;
