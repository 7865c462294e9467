//! Candlestick chart module
//!
//! The rendering library is an external collaborator reached through the
//! narrow [`ChartWidget`] interface. [`ChartSurface`] owns a widget's lifecycle
//! and [`ChartDataLoader`] fills it with price history.

mod loader;
mod surface;
mod widget;

pub use loader::{ChartDataLoader, ChartViewState, LoadError, LoadOutcome, LoadStage};
pub use surface::ChartSurface;
pub use widget::{
    CandlePoint, ChartOptions, ChartWidget, ChartWidgetFactory, SeriesData, VolumePoint,
    WidgetHandle, VOLUME_DOWN_COLOR, VOLUME_UP_COLOR,
};

use thiserror::Error;

/// Failures of the chart widget or its lifecycle
#[derive(Debug, Error)]
pub enum ChartError {
    #[error("chart widget creation failed: {0}")]
    WidgetCreation(String),
    #[error("timed out after {0} ms waiting for the chart library")]
    LibraryTimeout(u64),
    #[error("chart is not ready")]
    NotReady,
    #[error("chart widget rejected the update: {0}")]
    Render(String),
}
