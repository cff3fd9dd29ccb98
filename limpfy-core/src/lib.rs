//! Limpfy Core
//!
//! Core types and the job lifecycle rules for the Limpfy cleaning marketplace.
//!
//! This crate contains:
//! - Domain types: Core business entities (Job, Actor, Notification, events)
//! - DTOs: Data transfer objects shared by the server and the HTTP client
//! - Lifecycle: The pure state machine deciding which transitions are legal

pub mod domain;
pub mod dto;
pub mod lifecycle;
