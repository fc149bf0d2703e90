//! Authentication primitives.
//!
//! - [`password`] -- Argon2id password hashing and verification.
//! - [`jwt`] -- JWT signing and validation for access and refresh tokens.

pub mod jwt;
pub mod password;
