use std::ops::RangeInclusive;
use std::str::FromStr;

use markethub_core::totp::{TotpConfig, DEFAULT_ISSUER, DEFAULT_SKEW_STEPS};

use crate::auth::jwt::{JwtConfig, DEFAULT_ACCESS_EXPIRY_MINS, DEFAULT_REFRESH_EXPIRY_DAYS};
use crate::auth::password::DEFAULT_MIN_PASSWORD_LENGTH;

/// Default alert evaluation interval in seconds.
const DEFAULT_ALERT_EVAL_INTERVAL_SECS: u64 = 10;
/// Default market-data REST endpoint.
const DEFAULT_PRICE_FEED_URL: &str = "https://api.binance.com";
/// Default quote asset stripped from feed pairs (`BTCUSDT` -> `BTC`).
const DEFAULT_PRICE_QUOTE_ASSET: &str = "USDT";
/// Upper bound for access token lifetime (one day).
const MAX_ACCESS_EXPIRY_MINS: i64 = 24 * 60;
/// Upper bound for refresh token lifetime.
const MAX_REFRESH_EXPIRY_DAYS: i64 = 365;

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} must not be empty")]
    Empty { name: &'static str },

    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

/// Service configuration loaded from environment variables.
///
/// Everything except `JWT_SECRET` has a default suitable for local
/// development.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// JWT signing secret and token lifetimes.
    pub jwt: JwtConfig,
    /// TOTP issuer label and verification window.
    pub totp: TotpConfig,
    pub min_password_length: usize,
    /// Seconds between alert evaluation passes.
    pub alert_eval_interval_secs: u64,
    /// Base URL of the REST price feed.
    pub price_feed_url: String,
    pub price_quote_asset: String,
}

impl ServiceConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var                    | Required | Default                   |
    /// |----------------------------|----------|---------------------------|
    /// | `JWT_SECRET`               | **yes**  | --                        |
    /// | `JWT_ACCESS_EXPIRY_MINS`   | no       | `60`                      |
    /// | `JWT_REFRESH_EXPIRY_DAYS`  | no       | `7`                       |
    /// | `TOTP_ISSUER`              | no       | `MarketHub`               |
    /// | `TOTP_SKEW_STEPS`          | no       | `1`                       |
    /// | `MIN_PASSWORD_LENGTH`      | no       | `8`                       |
    /// | `ALERT_EVAL_INTERVAL_SECS` | no       | `10`                      |
    /// | `PRICE_FEED_URL`           | no       | `https://api.binance.com` |
    /// | `PRICE_QUOTE_ASSET`        | no       | `USDT`                    |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret = lookup("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?;
        if secret.is_empty() {
            return Err(ConfigError::Empty { name: "JWT_SECRET" });
        }

        let jwt = JwtConfig {
            secret,
            access_token_expiry_mins: parse_in_range(
                &lookup,
                "JWT_ACCESS_EXPIRY_MINS",
                DEFAULT_ACCESS_EXPIRY_MINS,
                1..=MAX_ACCESS_EXPIRY_MINS,
            )?,
            refresh_token_expiry_days: parse_in_range(
                &lookup,
                "JWT_REFRESH_EXPIRY_DAYS",
                DEFAULT_REFRESH_EXPIRY_DAYS,
                1..=MAX_REFRESH_EXPIRY_DAYS,
            )?,
        };

        let totp = TotpConfig {
            issuer: lookup("TOTP_ISSUER").unwrap_or_else(|| DEFAULT_ISSUER.into()),
            skew_steps: parse_or(&lookup, "TOTP_SKEW_STEPS", DEFAULT_SKEW_STEPS)?,
            ..TotpConfig::default()
        };

        Ok(Self {
            jwt,
            totp,
            min_password_length: parse_or(
                &lookup,
                "MIN_PASSWORD_LENGTH",
                DEFAULT_MIN_PASSWORD_LENGTH,
            )?,
            alert_eval_interval_secs: parse_or(
                &lookup,
                "ALERT_EVAL_INTERVAL_SECS",
                DEFAULT_ALERT_EVAL_INTERVAL_SECS,
            )?,
            price_feed_url: lookup("PRICE_FEED_URL")
                .unwrap_or_else(|| DEFAULT_PRICE_FEED_URL.into()),
            price_quote_asset: lookup("PRICE_QUOTE_ASSET")
                .unwrap_or_else(|| DEFAULT_PRICE_QUOTE_ASSET.into()),
        })
    }
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}

/// Like [`parse_or`], but a parsed value outside `range` is rejected.
fn parse_in_range<F>(
    lookup: &F,
    name: &'static str,
    default: i64,
    range: RangeInclusive<i64>,
) -> Result<i64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let value = parse_or(lookup, name, default)?;
    if range.contains(&value) {
        Ok(value)
    } else {
        Err(ConfigError::Invalid {
            name,
            value: value.to_string(),
        })
    }
}
