//! CoinGecko market data provider implementation.
//!
//! Uses four endpoints of the public v3 API:
//! - `/coins/markets` for the top asset listing
//! - `/simple/price` for single spot prices
//! - `/coins/{id}` for asset details
//! - `/coins/{id}/market_chart` for historical series
//!
//! The free tier rejects bursts with HTTP 429; the caller's budget reacts to
//! the [`MarketDataError::RateLimited`] this module raises for it.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use log::debug;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::errors::MarketDataError;
use crate::models::{MarketAsset, PricePoint};
use crate::provider::PriceProvider;

const DEFAULT_BASE_URL: &str = "https://api.coingecko.com/api/v3";
const PROVIDER_ID: &str = "COINGECKO";

/// CoinGecko client configuration.
#[derive(Clone, Debug)]
pub struct CoinGeckoConfig {
    pub base_url: String,
    /// Quote currency for all prices.
    pub vs_currency: String,
    pub timeout: Duration,
}

impl Default for CoinGeckoConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            vs_currency: "usd".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// CoinGecko price provider.
pub struct CoinGeckoProvider {
    client: Client,
    config: CoinGeckoConfig,
}

// ============================================================================
// Response structures for the CoinGecko API
// ============================================================================

/// One entry of the `/coins/markets` listing.
#[derive(Debug, Deserialize)]
struct CoinMarketEntry {
    id: String,
    symbol: String,
    name: String,
    image: Option<String>,
    current_price: Option<Decimal>,
    market_cap: Option<Decimal>,
    price_change_percentage_24h: Option<Decimal>,
    last_updated: Option<DateTime<Utc>>,
}

impl CoinMarketEntry {
    /// Convert to the domain model. Entries without a price are unusable
    /// for valuation and are skipped by the caller.
    fn into_asset(self) -> Option<MarketAsset> {
        Some(MarketAsset {
            id: self.id,
            symbol: self.symbol.to_uppercase(),
            name: self.name,
            icon_url: self.image,
            current_price: self.current_price?,
            market_cap: self.market_cap,
            price_change_24h: self.price_change_percentage_24h,
            last_updated: self.last_updated,
        })
    }
}

/// `/coins/{id}` response, reduced to the fields we map.
#[derive(Debug, Deserialize)]
struct CoinDetailsResponse {
    id: String,
    symbol: String,
    name: String,
    image: Option<CoinImage>,
    market_data: Option<CoinMarketData>,
    last_updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct CoinImage {
    large: Option<String>,
    small: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CoinMarketData {
    current_price: HashMap<String, Decimal>,
    market_cap: Option<HashMap<String, Decimal>>,
    price_change_percentage_24h: Option<Decimal>,
}

/// `/coins/{id}/market_chart` response. Each point is `[unix_ms, value]`.
#[derive(Debug, Deserialize)]
struct MarketChartResponse {
    prices: Vec<(i64, Decimal)>,
}

// ============================================================================
// CoinGeckoProvider implementation
// ============================================================================

impl CoinGeckoProvider {
    pub fn new(config: CoinGeckoConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { client, config }
    }

    /// Make a GET request and decode the JSON payload.
    async fn fetch_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<T, MarketDataError> {
        let url = reqwest::Url::parse_with_params(
            &format!("{}/{}", self.config.base_url, path),
            params,
        )
        .map_err(|e| MarketDataError::Malformed(format!("Failed to build URL: {}", e)))?;

        debug!("CoinGecko request: {}", url);

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                MarketDataError::Timeout
            } else {
                MarketDataError::Network(e)
            }
        })?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(MarketDataError::RateLimited);
        }
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(MarketDataError::AssetNotFound(path.to_string()));
        }
        if !status.is_success() {
            return Err(MarketDataError::Provider(format!("HTTP {}", status)));
        }

        let text = response
            .text()
            .await
            .map_err(|e| MarketDataError::Provider(e.to_string()))?;

        serde_json::from_str(&text)
            .map_err(|e| MarketDataError::Malformed(format!("Failed to parse response: {}", e)))
    }

    /// Rewrite path-based not-found errors to carry the asset id.
    fn not_found_as(err: MarketDataError, asset_id: &str) -> MarketDataError {
        match err {
            MarketDataError::AssetNotFound(_) => {
                MarketDataError::AssetNotFound(asset_id.to_string())
            }
            other => other,
        }
    }

    fn details_into_asset(
        response: CoinDetailsResponse,
        vs_currency: &str,
    ) -> Result<MarketAsset, MarketDataError> {
        let market_data = response.market_data.ok_or_else(|| {
            MarketDataError::Malformed(format!("No market data for {}", response.id))
        })?;
        let current_price = market_data
            .current_price
            .get(vs_currency)
            .copied()
            .ok_or_else(|| {
                MarketDataError::Malformed(format!(
                    "No {} price for {}",
                    vs_currency, response.id
                ))
            })?;

        Ok(MarketAsset {
            id: response.id,
            symbol: response.symbol.to_uppercase(),
            name: response.name,
            icon_url: response
                .image
                .and_then(|i| i.large.or(i.small)),
            current_price,
            market_cap: market_data
                .market_cap
                .and_then(|m| m.get(vs_currency).copied()),
            price_change_24h: market_data.price_change_percentage_24h,
            last_updated: response.last_updated,
        })
    }
}

#[async_trait]
impl PriceProvider for CoinGeckoProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    async fn fetch_top_assets(&self, limit: usize) -> Result<Vec<MarketAsset>, MarketDataError> {
        let per_page = limit.to_string();
        let params = [
            ("vs_currency", self.config.vs_currency.as_str()),
            ("order", "market_cap_desc"),
            ("per_page", per_page.as_str()),
            ("page", "1"),
            ("sparkline", "false"),
        ];

        let entries: Vec<CoinMarketEntry> = self.fetch_json("coins/markets", &params).await?;
        Ok(entries
            .into_iter()
            .filter_map(CoinMarketEntry::into_asset)
            .collect())
    }

    async fn fetch_spot_price(&self, asset_id: &str) -> Result<Decimal, MarketDataError> {
        let params = [
            ("ids", asset_id),
            ("vs_currencies", self.config.vs_currency.as_str()),
        ];

        let response: HashMap<String, HashMap<String, Decimal>> = self
            .fetch_json("simple/price", &params)
            .await
            .map_err(|e| Self::not_found_as(e, asset_id))?;

        response
            .get(asset_id)
            .and_then(|quotes| quotes.get(&self.config.vs_currency))
            .copied()
            .ok_or_else(|| MarketDataError::AssetNotFound(asset_id.to_string()))
    }

    async fn fetch_asset_details(&self, asset_id: &str) -> Result<MarketAsset, MarketDataError> {
        let params = [
            ("localization", "false"),
            ("tickers", "false"),
            ("market_data", "true"),
            ("community_data", "false"),
            ("developer_data", "false"),
        ];

        let response: CoinDetailsResponse = self
            .fetch_json(&format!("coins/{}", asset_id), &params)
            .await
            .map_err(|e| Self::not_found_as(e, asset_id))?;

        Self::details_into_asset(response, &self.config.vs_currency)
    }

    async fn fetch_market_chart(
        &self,
        asset_id: &str,
        days: u32,
    ) -> Result<Vec<PricePoint>, MarketDataError> {
        let days = days.to_string();
        let params = [
            ("vs_currency", self.config.vs_currency.as_str()),
            ("days", days.as_str()),
        ];

        let response: MarketChartResponse = self
            .fetch_json(&format!("coins/{}/market_chart", asset_id), &params)
            .await
            .map_err(|e| Self::not_found_as(e, asset_id))?;

        let mut points: Vec<PricePoint> = response
            .prices
            .into_iter()
            .filter_map(|(unix_ms, price)| {
                let timestamp = Utc.timestamp_millis_opt(unix_ms).single()?;
                Some(PricePoint { timestamp, price })
            })
            .collect();
        points.sort_by_key(|p| p.timestamp);
        Ok(points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_markets_entry() {
        let json = r#"[{
            "id": "bitcoin",
            "symbol": "btc",
            "name": "Bitcoin",
            "image": "https://assets.coingecko.com/coins/images/1/large/bitcoin.png",
            "current_price": 50000.0,
            "market_cap": 980000000000.0,
            "price_change_percentage_24h": -1.25,
            "last_updated": "2024-06-01T12:00:00.000Z"
        }]"#;

        let entries: Vec<CoinMarketEntry> = serde_json::from_str(json).unwrap();
        let asset = entries.into_iter().next().unwrap().into_asset().unwrap();

        assert_eq!(asset.id, "bitcoin");
        assert_eq!(asset.symbol, "BTC");
        assert_eq!(asset.current_price, dec!(50000));
        assert_eq!(asset.price_change_24h, Some(dec!(-1.25)));
        assert!(asset.icon_url.is_some());
    }

    #[test]
    fn test_markets_entry_without_price_is_skipped() {
        let json = r#"[{
            "id": "obscure-coin",
            "symbol": "obs",
            "name": "Obscure",
            "image": null,
            "current_price": null,
            "market_cap": null,
            "price_change_percentage_24h": null,
            "last_updated": null
        }]"#;

        let entries: Vec<CoinMarketEntry> = serde_json::from_str(json).unwrap();
        assert!(entries.into_iter().next().unwrap().into_asset().is_none());
    }

    #[test]
    fn test_parse_simple_price() {
        let json = r#"{"bitcoin": {"usd": 50123.45}}"#;
        let response: HashMap<String, HashMap<String, Decimal>> =
            serde_json::from_str(json).unwrap();

        assert_eq!(
            response.get("bitcoin").and_then(|q| q.get("usd")).copied(),
            Some(dec!(50123.45))
        );
    }

    #[test]
    fn test_parse_coin_details() {
        let json = r#"{
            "id": "ethereum",
            "symbol": "eth",
            "name": "Ethereum",
            "image": {"large": "https://example.com/eth.png", "small": null},
            "market_data": {
                "current_price": {"usd": 3000.5, "eur": 2800.0},
                "market_cap": {"usd": 360000000000.0},
                "price_change_percentage_24h": 2.1
            },
            "last_updated": "2024-06-01T12:00:00.000Z"
        }"#;

        let response: CoinDetailsResponse = serde_json::from_str(json).unwrap();
        let asset = CoinGeckoProvider::details_into_asset(response, "usd").unwrap();

        assert_eq!(asset.id, "ethereum");
        assert_eq!(asset.symbol, "ETH");
        assert_eq!(asset.current_price, dec!(3000.5));
        assert_eq!(asset.market_cap, Some(dec!(360000000000)));
    }

    #[test]
    fn test_details_without_market_data_is_malformed() {
        let json = r#"{"id": "x", "symbol": "x", "name": "X"}"#;
        let response: CoinDetailsResponse = serde_json::from_str(json).unwrap();
        let err = CoinGeckoProvider::details_into_asset(response, "usd").unwrap_err();
        assert!(matches!(err, MarketDataError::Malformed(_)));
    }

    #[test]
    fn test_parse_market_chart() {
        let json = r#"{
            "prices": [[1717243200000, 50000.0], [1717329600000, 51000.0]],
            "market_caps": [],
            "total_volumes": []
        }"#;

        let response: MarketChartResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.prices.len(), 2);
        assert_eq!(response.prices[0].1, dec!(50000));
    }
}
