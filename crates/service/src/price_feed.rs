//! Sources of current market prices for the alert evaluator.

use async_trait::async_trait;
use markethub_core::alert::PriceTick;
use serde::Deserialize;

/// Errors from a price source.
#[derive(Debug, thiserror::Error)]
pub enum PriceFeedError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The feed returned a non-2xx status code.
    #[error("Price feed error ({status}): {body}")]
    ApiError { status: u16, body: String },
}

/// Anything that can report the latest price per symbol.
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn latest_prices(&self) -> Result<Vec<PriceTick>, PriceFeedError>;
}

/// One entry of Binance's `GET /api/v3/ticker/price` response.
#[derive(Debug, Deserialize)]
pub struct TickerPrice {
    pub symbol: String,
    /// Decimal string, e.g. `"50000.01000000"`.
    pub price: String,
}

/// REST client for the Binance spot ticker endpoint.
pub struct BinanceSource {
    client: reqwest::Client,
    api_url: String,
    quote_asset: String,
}

impl BinanceSource {
    /// * `api_url` - Base URL, e.g. `https://api.binance.com`.
    /// * `quote_asset` - Pairs quoted in this asset are reported under their
    ///   base symbol (`BTCUSDT` becomes `BTC`); other pairs are dropped.
    pub fn new(api_url: String, quote_asset: String) -> Self {
        Self::with_client(reqwest::Client::new(), api_url, quote_asset)
    }

    pub fn with_client(client: reqwest::Client, api_url: String, quote_asset: String) -> Self {
        Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            quote_asset: quote_asset.to_ascii_uppercase(),
        }
    }
}

#[async_trait]
impl PriceSource for BinanceSource {
    async fn latest_prices(&self) -> Result<Vec<PriceTick>, PriceFeedError> {
        let response = self
            .client
            .get(format!("{}/api/v3/ticker/price", self.api_url))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PriceFeedError::ApiError {
                status: status.as_u16(),
                body,
            });
        }

        let entries: Vec<TickerPrice> = response.json().await?;
        Ok(ticks_for_quote(&entries, &self.quote_asset))
    }
}

/// Keep pairs quoted in `quote_asset`, keyed by base symbol.
///
/// Entries with unparsable or non-positive prices are skipped.
pub fn ticks_for_quote(entries: &[TickerPrice], quote_asset: &str) -> Vec<PriceTick> {
    entries
        .iter()
        .filter_map(|entry| {
            let base = entry.symbol.strip_suffix(quote_asset)?;
            if base.is_empty() {
                return None;
            }
            let price: f64 = entry.price.parse().ok()?;
            (price.is_finite() && price > 0.0).then(|| PriceTick::new(base, price))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(symbol: &str, price: &str) -> TickerPrice {
        TickerPrice {
            symbol: symbol.to_string(),
            price: price.to_string(),
        }
    }

    #[test]
    fn strips_quote_asset() {
        let ticks = ticks_for_quote(
            &[entry("BTCUSDT", "50000.01000000"), entry("ETHUSDT", "3000")],
            "USDT",
        );
        assert_eq!(
            ticks,
            vec![PriceTick::new("BTC", 50_000.01), PriceTick::new("ETH", 3000.0)]
        );
    }

    #[test]
    fn drops_other_quotes_and_bad_prices() {
        let ticks = ticks_for_quote(
            &[
                entry("ETHBTC", "0.05"),
                entry("USDT", "1"),
                entry("XRPUSDT", "n/a"),
                entry("DOGEUSDT", "0"),
            ],
            "USDT",
        );
        assert!(ticks.is_empty());
    }

    #[test]
    fn parses_binance_payload() {
        let body = r#"[{"symbol":"BTCUSDT","price":"61234.50000000"}]"#;
        let entries: Vec<TickerPrice> = serde_json::from_str(body).unwrap();
        let ticks = ticks_for_quote(&entries, "USDT");
        assert_eq!(ticks, vec![PriceTick::new("BTC", 61_234.5)]);
    }
}
