//! Identity, session, two-factor, and price-alert services.
//!
//! Every component talks to storage through
//! [`CredentialStore`](markethub_db::CredentialStore) and is wired together by
//! [`state::AppState`].

pub mod alerts;
pub mod auth;
pub mod background;
pub mod config;
pub mod error;
pub mod identity;
pub mod price_feed;
pub mod state;
pub mod tokens;
pub mod two_factor;
