//! Service Module
//!
//! Business logic layer for the server. Services connect the lifecycle
//! engine to the repositories and own every side effect of a transition.

pub mod clock;
pub mod job;
pub mod notification;
pub mod payment;

pub use clock::{Clock, ManualClock, SystemClock};
pub use job::{JobError, JobService};
pub use notification::{NotificationBus, PublishError, RetryPolicy};
pub use payment::{
    LoggingPaymentGateway, PaymentGateway, PaymentInstruction, PaymentNotifier,
};
