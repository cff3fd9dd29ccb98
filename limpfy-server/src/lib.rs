//! Limpfy marketplace server
//!
//! HTTP API, persistence, notification delivery and the settlement sweep
//! around the pure lifecycle engine in `limpfy-core`.

pub mod api;
pub mod config;
pub mod db;
pub mod repository;
pub mod scheduler;
pub mod service;
pub mod shutdown;
