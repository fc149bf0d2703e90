//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod identity_repo;
pub mod price_alert_repo;
pub mod refresh_token_repo;

pub use identity_repo::IdentityRepo;
pub use price_alert_repo::PriceAlertRepo;
pub use refresh_token_repo::RefreshTokenRepo;
