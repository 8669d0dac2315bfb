pub mod engine;
pub mod events;
pub mod worker;

pub use engine::{HoldReceipt, ReservationEngine};
pub use events::{ReleaseReason, ReservationEvent};
pub use worker::run_expiry_worker;
