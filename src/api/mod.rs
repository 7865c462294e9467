//! Backend API client
//!
//! Typed access to the PiBourse backend: price history, market statistics,
//! simulation clock control and time-travel sessions. All endpoints live under
//! a configurable base URL and speak JSON.

mod clock;
mod market;
mod rest;
mod time_travel;

pub use clock::CommandAck;
pub use market::{MarketOverview, StockPerformance};
pub use rest::RestClient;
pub use time_travel::{
    AlternativeTrade, LearningInsight, RiskLevel, SessionStarted, SessionStatus, TimeTravelResult,
    TimeTravelSessionRecord, TradeAction, TradeComparison, TradeReceipt,
};

use async_trait::async_trait;
use chrono::NaiveDateTime;
use std::time::Duration;
use thiserror::Error;

use crate::types::{PriceBar, SimulationClockState};

/// Errors raised by backend calls
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid base url: {0}")]
    InvalidBaseUrl(String),
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Price history endpoints used by the chart loader
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PriceHistoryApi: Send + Sync {
    /// Bars for `symbol` within the inclusive `[start, end]` window
    async fn price_history(
        &self,
        symbol: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<PriceBar>, ApiError>;

    /// Every bar the backend has for `symbol`
    async fn full_price_history(&self, symbol: &str) -> Result<Vec<PriceBar>, ApiError>;
}

/// Simulation clock endpoints
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ClockApi: Send + Sync {
    async fn status(&self) -> Result<SimulationClockState, ApiError>;
    async fn start(&self) -> Result<CommandAck, ApiError>;
    async fn stop(&self) -> Result<CommandAck, ApiError>;
    async fn reset(&self) -> Result<CommandAck, ApiError>;
}

/// Time-travel session endpoints
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TimeTravelApi: Send + Sync {
    async fn start_session(
        &self,
        player_id: &str,
        rewind_to: NaiveDateTime,
    ) -> Result<SessionStarted, ApiError>;

    async fn complete_session(&self, session_id: &str) -> Result<TimeTravelResult, ApiError>;

    async fn record_trade(
        &self,
        session_id: &str,
        trade: AlternativeTrade,
    ) -> Result<TradeReceipt, ApiError>;

    async fn preview(&self, session_id: &str) -> Result<TimeTravelResult, ApiError>;

    async fn player_sessions(
        &self,
        player_id: &str,
    ) -> Result<Vec<TimeTravelSessionRecord>, ApiError>;
}

/// Client for every backend endpoint the game uses
#[derive(Debug, Clone)]
pub struct ApiClient {
    rest: RestClient,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        Ok(Self {
            rest: RestClient::new(base_url, timeout)?,
        })
    }

    /// Base URL every endpoint hangs off
    pub fn base_url(&self) -> &str {
        self.rest.base_url()
    }
}
