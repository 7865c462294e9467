//! Market data endpoints: price history and statistics

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use super::{ApiClient, ApiError, PriceHistoryApi};
use crate::types::{format_date_time, PriceBar, RawPriceHistory};

/// Performance summary for one symbol
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StockPerformance {
    pub symbol: String,
    /// Formatted percentage, e.g. "12.34%"
    pub total_return: String,
    pub volatility: String,
    pub start_price: f64,
    pub end_price: f64,
    pub price_change: f64,
    pub total_days: u32,
    pub average_volume: f64,
    /// Month label -> return in percent
    pub monthly_performance: HashMap<String, f64>,
}

/// Aggregate statistics across the whole market
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MarketOverview {
    pub total_stocks: u64,
    pub total_market_cap: f64,
    pub stocks_by_sector: HashMap<String, u64>,
    pub market_cap_by_sector: HashMap<String, f64>,
    pub average_stock_price: f64,
    pub last_update: String,
}

impl ApiClient {
    /// Performance statistics for a single symbol
    pub async fn stock_performance(&self, symbol: &str) -> Result<StockPerformance, ApiError> {
        self.rest
            .get_json(&["api", "market", "stocks", symbol, "performance"], &[])
            .await
    }

    /// Best performing symbols, ranked by the backend
    pub async fn top_performers(&self, limit: usize) -> Result<Vec<StockPerformance>, ApiError> {
        self.rest
            .get_json(
                &["api", "market", "stocks", "top-performers"],
                &[("limit", limit.to_string())],
            )
            .await
    }

    /// Market-wide aggregate statistics
    pub async fn market_overview(&self) -> Result<MarketOverview, ApiError> {
        self.rest.get_json(&["api", "market", "overview"], &[]).await
    }

    async fn fetch_history(
        &self,
        symbol: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<PriceBar>, ApiError> {
        let raw: Vec<RawPriceHistory> = self
            .rest
            .get_json(&["api", "market", "stocks", symbol, "history"], query)
            .await?;
        debug!(symbol = %symbol, points = raw.len(), "Fetched price history");
        Ok(raw.into_iter().map(PriceBar::from).collect())
    }
}

#[async_trait]
impl PriceHistoryApi for ApiClient {
    async fn price_history(
        &self,
        symbol: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<PriceBar>, ApiError> {
        let query = [
            ("startDate", format_date_time(start)),
            ("endDate", format_date_time(end)),
        ];
        self.fetch_history(symbol, &query).await
    }

    async fn full_price_history(&self, symbol: &str) -> Result<Vec<PriceBar>, ApiError> {
        self.fetch_history(symbol, &[]).await
    }
}
