//! Core types used throughout the PiBourse client
//!
//! Price bars, chart queries, clock snapshots and chart timeframes.

use chrono::{Months, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Wire format for date-time query parameters (`LocalDateTime` on the backend)
pub const DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Format a game date-time the way the backend expects it in query strings
pub fn format_date_time(value: NaiveDateTime) -> String {
    value.format(DATE_TIME_FORMAT).to_string()
}

/// One trading interval's OHLCV as rendered by the chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    /// Epoch seconds (backend local time read as UTC)
    pub time: i64,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: u64,
}

impl PriceBar {
    /// Close at or above open
    pub fn is_bullish(&self) -> bool {
        self.close >= self.open
    }
}

/// Price history record as served by `/api/market/stocks/{symbol}/history`.
///
/// Prices are `BigDecimal` on the backend and may arrive as JSON numbers or strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPriceHistory {
    pub date_time: NaiveDateTime,
    pub open_price: Decimal,
    pub high_price: Decimal,
    pub low_price: Decimal,
    pub close_price: Decimal,
    #[serde(default)]
    pub volume: Option<u64>,
}

impl From<RawPriceHistory> for PriceBar {
    fn from(raw: RawPriceHistory) -> Self {
        Self {
            time: raw.date_time.and_utc().timestamp(),
            open: raw.open_price,
            high: raw.high_price,
            low: raw.low_price,
            close: raw.close_price,
            volume: raw.volume.unwrap_or_default(),
        }
    }
}

/// Symbol plus inclusive date window requested by a chart
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartQuery {
    pub symbol: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl ChartQuery {
    pub fn new(symbol: impl Into<String>, start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self {
            symbol: symbol.into(),
            start,
            end,
        }
    }

    /// Window ending at `end` and spanning the given timeframe
    pub fn for_timeframe(
        symbol: impl Into<String>,
        timeframe: Timeframe,
        end: NaiveDateTime,
        game_year: i32,
    ) -> Self {
        Self::new(symbol, timeframe.window_start(end, game_year), end)
    }

    /// Symbol must be non-empty and `end` must not precede `start`
    pub fn validate(&self) -> Result<(), String> {
        if self.symbol.trim().is_empty() {
            return Err("symbol must not be empty".to_string());
        }
        if self.end < self.start {
            return Err(format!(
                "window end {} precedes start {}",
                format_date_time(self.end),
                format_date_time(self.start)
            ));
        }
        Ok(())
    }
}

impl fmt::Display for ChartQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{} -> {}]",
            self.symbol,
            format_date_time(self.start),
            format_date_time(self.end)
        )
    }
}

/// Cached view of the backend simulation clock
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationClockState {
    pub current_game_time: NaiveDateTime,
    pub active: bool,
    #[serde(default)]
    pub compression_info: Option<String>,
}

/// Chart timeframes available on daily data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    OneMonth,
    ThreeMonths,
    SixMonths,
    YearToDate,
}

impl Default for Timeframe {
    fn default() -> Self {
        Timeframe::OneMonth
    }
}

impl Timeframe {
    pub const ALL: [Timeframe; 4] = [
        Timeframe::OneMonth,
        Timeframe::ThreeMonths,
        Timeframe::SixMonths,
        Timeframe::YearToDate,
    ];

    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "1M" => Some(Timeframe::OneMonth),
            "3M" => Some(Timeframe::ThreeMonths),
            "6M" => Some(Timeframe::SixMonths),
            "YTD" => Some(Timeframe::YearToDate),
            _ => None,
        }
    }

    /// `(bar_spacing, min_bar_spacing)` tuned so the whole window fits
    pub fn bar_spacing(&self) -> (f64, f64) {
        match self {
            Timeframe::OneMonth => (4.0, 1.5),
            Timeframe::ThreeMonths => (3.0, 1.0),
            Timeframe::SixMonths => (2.0, 0.8),
            Timeframe::YearToDate => (1.5, 0.5),
        }
    }

    /// Start of the window ending at `end`.
    ///
    /// YTD keeps the time of day of `end` and moves to January 1st of the game year.
    pub fn window_start(&self, end: NaiveDateTime, game_year: i32) -> NaiveDateTime {
        let start = match self {
            Timeframe::OneMonth => end.checked_sub_signed(chrono::Duration::days(30)),
            Timeframe::ThreeMonths => end.checked_sub_months(Months::new(3)),
            Timeframe::SixMonths => end.checked_sub_months(Months::new(6)),
            Timeframe::YearToDate => {
                NaiveDate::from_ymd_opt(game_year, 1, 1).map(|day| day.and_time(end.time()))
            }
        };
        start.unwrap_or(end)
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Timeframe::OneMonth => write!(f, "1M"),
            Timeframe::ThreeMonths => write!(f, "3M"),
            Timeframe::SixMonths => write!(f, "6M"),
            Timeframe::YearToDate => write!(f, "YTD"),
        }
    }
}
