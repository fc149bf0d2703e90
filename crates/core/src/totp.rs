//! Time-based one-time passwords (RFC 6238) for two-factor authentication.
//!
//! Secrets are 16-character Base32 strings (80 bits). Codes are 6-digit
//! HMAC-SHA1 values over a 30-second time step, accepted within a small
//! window of neighbouring steps to absorb clock skew between the server and
//! the authenticator app.

use hmac::{Hmac, Mac};
use rand::Rng;
use sha1::Sha1;
use subtle::ConstantTimeEq;

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Number of characters in a generated shared secret.
pub const SECRET_LENGTH: usize = 16;

/// RFC 4648 Base32 alphabet. Secrets are drawn uniformly from it.
pub const BASE32_ALPHABET: &[u8; 32] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

/// Default issuer label shown by authenticator apps.
pub const DEFAULT_ISSUER: &str = "MarketHub";

/// Default time step in seconds.
pub const DEFAULT_STEP_SECS: u64 = 30;

/// Default number of code digits.
pub const DEFAULT_DIGITS: u32 = 6;

/// Default number of steps accepted on either side of the current one.
pub const DEFAULT_SKEW_STEPS: u64 = 1;

type HmacSha1 = Hmac<Sha1>;

/// Parameters for code generation and verification.
#[derive(Debug, Clone)]
pub struct TotpConfig {
    /// Issuer label embedded in provisioning URIs.
    pub issuer: String,
    /// Time step in seconds.
    pub step_secs: u64,
    /// Number of digits per code.
    pub digits: u32,
    /// Tolerance window, in steps, on each side of the current step.
    pub skew_steps: u64,
}

impl Default for TotpConfig {
    fn default() -> Self {
        Self {
            issuer: DEFAULT_ISSUER.to_string(),
            step_secs: DEFAULT_STEP_SECS,
            digits: DEFAULT_DIGITS,
            skew_steps: DEFAULT_SKEW_STEPS,
        }
    }
}

// ---------------------------------------------------------------------------
// Secrets and provisioning
// ---------------------------------------------------------------------------

/// Generate a new shared secret from the thread-local CSPRNG.
pub fn generate_secret() -> String {
    let mut rng = rand::rng();
    (0..SECRET_LENGTH)
        .map(|_| BASE32_ALPHABET[rng.random_range(0..BASE32_ALPHABET.len())] as char)
        .collect()
}

/// Build the `otpauth://` URI an authenticator app scans during enrollment.
///
/// The layout is fixed: `otpauth://totp/<issuer>:<email>?secret=<secret>&issuer=<issuer>`.
pub fn provisioning_uri(issuer: &str, account_email: &str, secret: &str) -> String {
    format!("otpauth://totp/{issuer}:{account_email}?secret={secret}&issuer={issuer}")
}

fn decode_secret(secret: &str) -> Result<Vec<u8>, CoreError> {
    let normalized: String = secret
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| c.to_ascii_uppercase())
        .collect();
    base32::decode(base32::Alphabet::RFC4648 { padding: false }, &normalized)
        .filter(|bytes| !bytes.is_empty())
        .ok_or_else(|| CoreError::Internal("Two-factor secret is not valid Base32".into()))
}

// ---------------------------------------------------------------------------
// Code generation
// ---------------------------------------------------------------------------

/// HOTP value (RFC 4226) for a raw key and counter.
pub fn hotp(key: &[u8], counter: u64, digits: u32) -> Result<String, CoreError> {
    let mut mac = HmacSha1::new_from_slice(key)
        .map_err(|e| CoreError::Internal(format!("HMAC key rejected: {e}")))?;
    mac.update(&counter.to_be_bytes());
    let hash = mac.finalize().into_bytes();

    // Dynamic truncation.
    let offset = (hash[hash.len() - 1] & 0x0f) as usize;
    let binary = (u32::from(hash[offset] & 0x7f) << 24)
        | (u32::from(hash[offset + 1]) << 16)
        | (u32::from(hash[offset + 2]) << 8)
        | u32::from(hash[offset + 3]);

    let code = u64::from(binary) % 10u64.pow(digits);
    Ok(format!("{code:0width$}", width = digits as usize))
}

/// The code for `secret` at the given Unix time.
pub fn code_at(secret: &str, unix_secs: u64, config: &TotpConfig) -> Result<String, CoreError> {
    let key = decode_secret(secret)?;
    hotp(&key, unix_secs / config.step_secs, config.digits)
}

// ---------------------------------------------------------------------------
// Verification
// ---------------------------------------------------------------------------

/// Check `code` against `secret` at the given Unix time.
///
/// Accepts codes for the current step and `skew_steps` steps on either side.
/// Codes that are not exactly `digits` ASCII digits are rejected without
/// touching the secret. Comparison is constant time.
pub fn verify_code(
    secret: &str,
    code: &str,
    unix_secs: u64,
    config: &TotpConfig,
) -> Result<bool, CoreError> {
    let code = code.trim();
    if code.len() != config.digits as usize || !code.bytes().all(|b| b.is_ascii_digit()) {
        return Ok(false);
    }

    let key = decode_secret(secret)?;
    let current = unix_secs / config.step_secs;
    let first = current.saturating_sub(config.skew_steps);
    let last = current.saturating_add(config.skew_steps);

    let mut matched = false;
    for counter in first..=last {
        let expected = hotp(&key, counter, config.digits)?;
        // No early return: every window slot costs the same.
        matched |= bool::from(expected.as_bytes().ct_eq(code.as_bytes()));
    }
    Ok(matched)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// ASCII "12345678901234567890", the RFC 4226 / RFC 6238 SHA-1 test key.
    const RFC_KEY: &[u8] = b"12345678901234567890";
    const RFC_SECRET_B32: &str = "GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ";

    #[test]
    fn hotp_matches_rfc4226_vectors() {
        let expected = [
            "755224", "287082", "359152", "969429", "338314", "254676", "287922", "162583",
            "399871", "520489",
        ];
        for (counter, want) in expected.iter().enumerate() {
            assert_eq!(&hotp(RFC_KEY, counter as u64, 6).unwrap(), want);
        }
    }

    #[test]
    fn totp_matches_rfc6238_sha1_vectors() {
        let config = TotpConfig::default();
        // 8-digit RFC values truncated to their last 6 digits.
        let vectors = [
            (59, "287082"),
            (1_111_111_109, "081804"),
            (1_111_111_111, "050471"),
            (1_234_567_890, "005924"),
            (2_000_000_000, "279037"),
            (20_000_000_000, "353130"),
        ];
        for (time, want) in vectors {
            assert_eq!(code_at(RFC_SECRET_B32, time, &config).unwrap(), want, "t={time}");
        }
    }

    #[test]
    fn totp_eight_digit_vector() {
        let config = TotpConfig {
            digits: 8,
            ..TotpConfig::default()
        };
        assert_eq!(code_at(RFC_SECRET_B32, 59, &config).unwrap(), "94287082");
    }

    #[test]
    fn verify_accepts_current_and_adjacent_steps() {
        let config = TotpConfig::default();
        let now = 1_234_567_890;
        let current = code_at(RFC_SECRET_B32, now, &config).unwrap();
        let previous = code_at(RFC_SECRET_B32, now - 30, &config).unwrap();
        let next = code_at(RFC_SECRET_B32, now + 30, &config).unwrap();

        assert!(verify_code(RFC_SECRET_B32, &current, now, &config).unwrap());
        assert!(verify_code(RFC_SECRET_B32, &previous, now, &config).unwrap());
        assert!(verify_code(RFC_SECRET_B32, &next, now, &config).unwrap());
    }

    #[test]
    fn verify_rejects_codes_outside_window() {
        let config = TotpConfig::default();
        let now = 1_234_567_890;
        let stale = code_at(RFC_SECRET_B32, now - 120, &config).unwrap();
        let current = code_at(RFC_SECRET_B32, now, &config).unwrap();
        // Guard against the rare collision of two steps sharing a code.
        if stale != current {
            assert!(!verify_code(RFC_SECRET_B32, &stale, now, &config).unwrap());
        }
    }

    #[test]
    fn verify_rejects_malformed_codes() {
        let config = TotpConfig::default();
        for code in ["", "12345", "1234567", "12a456", "      "] {
            assert!(!verify_code(RFC_SECRET_B32, code, 59, &config).unwrap());
        }
    }

    #[test]
    fn any_six_digits_is_not_enough() {
        let config = TotpConfig::default();
        // 287082 is valid at t=59; 000000 is not valid in the window around it.
        assert!(!verify_code(RFC_SECRET_B32, "000000", 59, &config).unwrap());
    }

    #[test]
    fn generated_secret_has_expected_shape() {
        let secret = generate_secret();
        assert_eq!(secret.len(), SECRET_LENGTH);
        assert!(secret.bytes().all(|b| BASE32_ALPHABET.contains(&b)));
        // 16 Base32 characters decode to exactly 10 bytes.
        assert_eq!(decode_secret(&secret).unwrap().len(), 10);
    }

    #[test]
    fn generated_secrets_differ() {
        assert_ne!(generate_secret(), generate_secret());
    }

    #[test]
    fn generated_secret_round_trips_through_verification() {
        let config = TotpConfig::default();
        let secret = generate_secret();
        let code = code_at(&secret, 1_700_000_000, &config).unwrap();
        assert!(verify_code(&secret, &code, 1_700_000_000, &config).unwrap());
    }

    #[test]
    fn provisioning_uri_layout_is_exact() {
        let uri = provisioning_uri("MarketHub", "a@x.com", "JBSWY3DPEHPK3PXP");
        assert_eq!(
            uri,
            "otpauth://totp/MarketHub:a@x.com?secret=JBSWY3DPEHPK3PXP&issuer=MarketHub"
        );
    }

    #[test]
    fn invalid_secret_is_an_internal_error() {
        let config = TotpConfig::default();
        assert!(verify_code("not base32!", "123456", 59, &config).is_err());
    }
}
