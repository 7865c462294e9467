//! Configuration sections

use serde::Deserialize;
use std::time::Duration;

use crate::types::Timeframe;

/// Upper bound for `chart.extend_days`
pub const MAX_EXTEND_DAYS: i64 = 366;

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Backend base URL, e.g. `http://localhost:8080`
    pub base_url: String,
    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClockConfig {
    /// Status poll cadence in milliseconds
    pub poll_interval_ms: u64,
}

impl ClockConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChartConfig {
    /// Symbol shown at startup
    pub symbol: String,
    /// Initial timeframe label (1M, 3M, 6M, YTD)
    pub timeframe: String,
    pub width: u32,
    pub height: u32,
    /// Days added past the window end when the window is empty
    pub extend_days: i64,
    /// How long to wait for the rendering library
    pub library_timeout_ms: u64,
}

impl ChartConfig {
    /// Parsed timeframe, falling back to one month on an unknown label
    pub fn timeframe(&self) -> Timeframe {
        Timeframe::from_str(&self.timeframe).unwrap_or_default()
    }

    /// Window extension, `None` unless `extend_days` is within `0..=MAX_EXTEND_DAYS`
    pub fn extend_by(&self) -> Option<chrono::Duration> {
        if !(0..=MAX_EXTEND_DAYS).contains(&self.extend_days) {
            return None;
        }
        chrono::Duration::try_days(self.extend_days)
    }

    pub fn library_timeout(&self) -> Duration {
        Duration::from_millis(self.library_timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TimeTravelConfig {
    pub player_id: String,
    /// Calendar year the game is played in
    pub game_year: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
    /// Default `EnvFilter` directive; `RUST_LOG` takes precedence
    pub filter: String,
}
