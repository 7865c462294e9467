//! Chart widget interface and series conversion

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::ChartError;
use crate::types::PriceBar;

/// Translucent volume colours so bars stay behind the candles
pub const VOLUME_UP_COLOR: &str = "#10b98150";
pub const VOLUME_DOWN_COLOR: &str = "#ef444450";

/// Shared slot holding the live widget, empty before init and after destroy
pub type WidgetHandle = Arc<Mutex<Option<Box<dyn ChartWidget>>>>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandlePoint {
    pub time: i64,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VolumePoint {
    pub time: i64,
    pub value: u64,
    pub color: &'static str,
}

/// Candle and volume series built from the same bars
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SeriesData {
    pub candles: Vec<CandlePoint>,
    pub volumes: Vec<VolumePoint>,
}

impl SeriesData {
    pub fn from_bars(bars: &[PriceBar]) -> Self {
        let mut series = Self {
            candles: Vec::with_capacity(bars.len()),
            volumes: Vec::with_capacity(bars.len()),
        };
        for bar in bars {
            series.candles.push(CandlePoint {
                time: bar.time,
                open: bar.open,
                high: bar.high,
                low: bar.low,
                close: bar.close,
            });
            series.volumes.push(VolumePoint {
                time: bar.time,
                value: bar.volume,
                color: if bar.is_bullish() {
                    VOLUME_UP_COLOR
                } else {
                    VOLUME_DOWN_COLOR
                },
            });
        }
        series
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }
}

/// Partial option update; `None` fields are left untouched by the widget
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ChartOptions {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub bar_spacing: Option<f64>,
    pub min_bar_spacing: Option<f64>,
}

impl ChartOptions {
    pub fn size(width: u32, height: u32) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
            ..Default::default()
        }
    }

    pub fn spacing(bar_spacing: f64, min_bar_spacing: f64) -> Self {
        Self {
            bar_spacing: Some(bar_spacing),
            min_bar_spacing: Some(min_bar_spacing),
            ..Default::default()
        }
    }

    /// Fields set in `other` override ours
    pub fn merge(self, other: ChartOptions) -> Self {
        Self {
            width: other.width.or(self.width),
            height: other.height.or(self.height),
            bar_spacing: other.bar_spacing.or(self.bar_spacing),
            min_bar_spacing: other.min_bar_spacing.or(self.min_bar_spacing),
        }
    }
}

/// A live chart instance of the rendering library
pub trait ChartWidget: Send {
    /// Replace both series
    fn set_data(&mut self, series: &SeriesData) -> Result<(), ChartError>;

    fn apply_options(&mut self, options: &ChartOptions) -> Result<(), ChartError>;

    /// Rescale the time axis so every bar is visible
    fn fit_content(&mut self);

    /// Release the instance; no other call is made afterwards
    fn destroy(&mut self);
}

/// Loads the rendering library (if needed) and builds widgets
#[async_trait]
pub trait ChartWidgetFactory: Send + Sync {
    async fn create(&self, options: &ChartOptions) -> Result<Box<dyn ChartWidget>, ChartError>;
}
