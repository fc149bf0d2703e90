//! Price alert conditions and tick matching.
//!
//! An alert fires when a tick for its symbol crosses the target price in the
//! configured direction. Both comparisons are inclusive: a tick exactly at the
//! target triggers.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Maximum length of a normalized symbol.
pub const MAX_SYMBOL_LENGTH: usize = 20;

/// Direction in which the price must move to trigger an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertCondition {
    /// Trigger when `price >= target`.
    Above,
    /// Trigger when `price <= target`.
    Below,
}

impl AlertCondition {
    pub fn as_str(self) -> &'static str {
        match self {
            AlertCondition::Above => "above",
            AlertCondition::Below => "below",
        }
    }

    /// Whether `price` satisfies this condition against `target`.
    pub fn is_met(self, target: f64, price: f64) -> bool {
        match self {
            AlertCondition::Above => price >= target,
            AlertCondition::Below => price <= target,
        }
    }
}

impl std::fmt::Display for AlertCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for AlertCondition {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "above" => Ok(AlertCondition::Above),
            "below" => Ok(AlertCondition::Below),
            other => Err(CoreError::Validation(format!(
                "Condition must be 'above' or 'below', got '{other}'"
            ))),
        }
    }
}

/// One observed price for a symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceTick {
    pub symbol: String,
    pub price: f64,
}

impl PriceTick {
    pub fn new(symbol: impl Into<String>, price: f64) -> Self {
        Self {
            symbol: symbol.into(),
            price,
        }
    }
}

/// Canonical form of a symbol: trimmed and uppercased.
pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_ascii_uppercase()
}

/// Normalize and validate a symbol supplied by an alert owner.
pub fn validate_symbol(symbol: &str) -> Result<String, CoreError> {
    let normalized = normalize_symbol(symbol);
    if normalized.is_empty() {
        return Err(CoreError::Validation("Symbol is required".into()));
    }
    if normalized.len() > MAX_SYMBOL_LENGTH {
        return Err(CoreError::Validation(format!(
            "Symbol must be at most {MAX_SYMBOL_LENGTH} characters"
        )));
    }
    if !normalized.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return Err(CoreError::Validation(format!(
            "Symbol '{normalized}' must be alphanumeric"
        )));
    }
    Ok(normalized)
}

/// Validate that a target price is a positive, finite number.
pub fn validate_target_price(target: f64) -> Result<(), CoreError> {
    if !target.is_finite() || target <= 0.0 {
        return Err(CoreError::Validation(format!(
            "Target price must be a positive number, got {target}"
        )));
    }
    Ok(())
}

/// Find the first tick, in input order, that triggers an alert.
///
/// `symbol` is expected in normalized form; tick symbols are normalized
/// before comparison. Returns `None` when no tick for the symbol satisfies
/// the condition.
pub fn first_trigger<'a>(
    symbol: &str,
    condition: AlertCondition,
    target: f64,
    ticks: &'a [PriceTick],
) -> Option<&'a PriceTick> {
    ticks.iter().find(|tick| {
        normalize_symbol(&tick.symbol) == symbol && condition.is_met(target, tick.price)
    })
}
