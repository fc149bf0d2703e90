//! Domain logic shared by the storage and service layers.
//!
//! This crate has no internal dependencies so it can be used by the
//! repository layer, the services, and any future worker or CLI tooling.

pub mod alert;
pub mod error;
pub mod hashing;
pub mod oauth;
pub mod roles;
pub mod totp;
pub mod types;
pub mod validation;
