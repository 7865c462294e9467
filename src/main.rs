//! PiBourse client
//!
//! Follows the simulation clock, keeps the configured symbol's chart loaded
//! for the current game day and tracks the time-travel timeline.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use pibourse_client::api::{ApiClient, TimeTravelApi};
use pibourse_client::chart::{
    ChartDataLoader, ChartError, ChartOptions, ChartSurface, ChartWidget, ChartWidgetFactory,
    LoadError, LoadOutcome, SeriesData,
};
use pibourse_client::clock::{year_progress, SimulationClock};
use pibourse_client::config::AppConfig;
use pibourse_client::logging::init_tracing;
use pibourse_client::time_travel::{MonthTimeline, TimeTravelFlow};
use pibourse_client::types::{ChartQuery, SimulationClockState};

/// How long to wait for the first clock status before using the default date
const FIRST_STATUS_TIMEOUT: Duration = Duration::from_secs(3);

/// Widget that renders into the log
struct LogWidget {
    options: ChartOptions,
}

impl ChartWidget for LogWidget {
    fn set_data(&mut self, series: &SeriesData) -> Result<(), ChartError> {
        match (series.candles.first(), series.candles.last()) {
            (Some(first), Some(last)) => info!(
                bars = series.len(),
                first_open = %first.open,
                last_close = %last.close,
                "Chart series updated"
            ),
            _ => info!("Chart cleared, no data"),
        }
        Ok(())
    }

    fn apply_options(&mut self, options: &ChartOptions) -> Result<(), ChartError> {
        self.options = self.options.merge(*options);
        debug!(options = ?self.options, "Chart options applied");
        Ok(())
    }

    fn fit_content(&mut self) {
        debug!("Chart fitted to content");
    }

    fn destroy(&mut self) {
        debug!("Chart released");
    }
}

struct LogWidgetFactory;

#[async_trait]
impl ChartWidgetFactory for LogWidgetFactory {
    async fn create(&self, options: &ChartOptions) -> Result<Box<dyn ChartWidget>, ChartError> {
        Ok(Box::new(LogWidget { options: *options }))
    }
}

fn report(result: Result<LoadOutcome, LoadError>) {
    match result {
        Ok(LoadOutcome::Rendered { stage, bars }) => {
            info!(stage = %stage, bars, "Chart loaded")
        }
        Ok(LoadOutcome::NoData) => warn!("No price history available for this symbol"),
        Ok(LoadOutcome::Superseded) => debug!("Chart load superseded"),
        Err(e) => error!(error = %e, "Chart load failed"),
    }
}

/// Game date used until the clock answers: February 1st, 09:30
fn default_game_time(year: i32) -> Result<NaiveDateTime> {
    NaiveDate::from_ymd_opt(year, 2, 1)
        .and_then(|d| d.and_hms_opt(9, 30, 0))
        .with_context(|| format!("no default game date for year {year}"))
}

async fn first_game_time(
    clock_rx: &mut watch::Receiver<Option<SimulationClockState>>,
    year: i32,
) -> Result<NaiveDateTime> {
    let first = tokio::time::timeout(
        FIRST_STATUS_TIMEOUT,
        clock_rx.wait_for(|state| state.is_some()),
    )
    .await;
    if let Ok(Ok(state)) = first {
        if let Some(state) = state.as_ref() {
            return Ok(state.current_game_time);
        }
    }
    warn!("Clock status unavailable, using default game date");
    default_game_time(year)
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load()?;
    config.validate()?;
    init_tracing(&config.logging)?;
    info!(config = %config, "Starting PiBourse client");

    let api = Arc::new(
        ApiClient::new(&config.api.base_url, config.api.timeout())
            .context("Failed to create API client")?,
    );
    let year = config.time_travel.game_year;
    let symbol = config.chart.symbol.clone();
    let timeframe = config.chart.timeframe();

    let mut clock = SimulationClock::new(api.clone(), config.clock.poll_interval());
    let mut clock_rx = clock.subscribe();
    clock.connect();
    let game_time = first_game_time(&mut clock_rx, year).await?;

    let mut surface = ChartSurface::new(config.chart.width, config.chart.height, timeframe);
    surface
        .init(&LogWidgetFactory, config.chart.library_timeout())
        .await
        .context("Chart initialization failed")?;
    let (_width_tx, width_rx) = watch::channel(config.chart.width);
    surface.observe_resize(width_rx);

    let loader = Arc::new(ChartDataLoader::new(
        api.clone(),
        surface.widget(),
        config
            .chart
            .extend_by()
            .context("chart.extend_days out of range")?,
    ));
    report(
        loader
            .load(ChartQuery::for_timeframe(&symbol, timeframe, game_time, year))
            .await,
    );
    match api.stock_performance(&symbol).await {
        Ok(perf) => info!(
            symbol = %perf.symbol,
            total_return = %perf.total_return,
            volatility = %perf.volatility,
            "Symbol performance"
        ),
        Err(e) => warn!(symbol = %symbol, error = %e, "Could not fetch symbol performance"),
    }

    let mut flow = TimeTravelFlow::new(
        api.clone(),
        config.time_travel.player_id.clone(),
        MonthTimeline::new(year)?,
    );
    flow.on_clock_update(game_time);
    match api.player_sessions(&config.time_travel.player_id).await {
        Ok(sessions) => info!(count = sessions.len(), "Previous time travel sessions"),
        Err(e) => warn!(error = %e, "Could not list time travel sessions"),
    }

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    let mut last_day = game_time.date();

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Shutdown requested");
                break;
            }
            changed = clock_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let Some(state) = clock_rx.borrow_and_update().clone() else {
                    continue;
                };
                let now = state.current_game_time;
                flow.on_clock_update(now);
                debug!(
                    game_time = %now,
                    year_progress = year_progress(now, year),
                    unlocked_month = flow.timeline().furthest_unlocked(),
                    "Clock tick"
                );

                if now.date() != last_day {
                    last_day = now.date();
                    let loader = Arc::clone(&loader);
                    let query = ChartQuery::for_timeframe(&symbol, timeframe, now, year);
                    tokio::spawn(async move {
                        report(loader.load(query).await);
                    });
                }
            }
        }
    }

    clock.disconnect().await;
    surface.destroy().await;
    info!("PiBourse client stopped");
    Ok(())
}
