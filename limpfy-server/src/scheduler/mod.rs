//! Scheduler layer for the server
//!
//! Background work driven by time rather than requests. The settlement sweep
//! releases payment for jobs whose dispute window closed without a dispute.

pub mod sweeper;

pub use sweeper::{SettlementSweeper, SweepReport};
