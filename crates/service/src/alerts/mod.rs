//! Price alerts.
//!
//! - [`service`] -- create, list, toggle, and delete on behalf of an owner.
//! - [`engine`] -- fires eligible alerts against incoming price ticks.

pub mod engine;
pub mod service;

pub use engine::{AlertEngine, TriggeredAlert};
pub use service::{AlertService, CreateAlertRequest};
