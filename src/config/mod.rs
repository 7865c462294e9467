//! Configuration management for the PiBourse client
//!
//! Built-in defaults, optional `config/default` and `config/local` files, then
//! `PIBOURSE__*` environment variables (with `.env` loaded first).

mod types;

pub use types::*;

use anyhow::{bail, Context, Result};
use config::{Config, ConfigBuilder, Environment, File};
use config::builder::DefaultState;
use serde::Deserialize;

use crate::types::Timeframe;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub clock: ClockConfig,
    pub chart: ChartConfig,
    pub time_travel: TimeTravelConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from files and environment
    pub fn load() -> Result<Self> {
        // Load .env file first
        dotenvy::dotenv().ok();

        let config = Self::defaults()?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // Override with environment variables (PIBOURSE__*)
            .add_source(Environment::with_prefix("PIBOURSE").separator("__"))
            .build()
            .context("Failed to build configuration")?;

        let app_config: AppConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        Ok(app_config)
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>> {
        Ok(Config::builder()
            // API defaults
            .set_default("api.base_url", "http://localhost:8080")?
            .set_default("api.timeout_ms", 30_000)?
            // Clock defaults
            .set_default("clock.poll_interval_ms", 1_000)?
            // Chart defaults
            .set_default("chart.symbol", "AAPL")?
            .set_default("chart.timeframe", "1M")?
            .set_default("chart.width", 800)?
            .set_default("chart.height", 480)?
            .set_default("chart.extend_days", 7)?
            .set_default("chart.library_timeout_ms", 5_000)?
            // Time travel defaults
            .set_default("time_travel.player_id", "player-001")?
            .set_default("time_travel.game_year", 2023)?
            // Logging defaults
            .set_default("logging.json", false)?
            .set_default("logging.filter", "info")?)
    }

    /// Generate a one-line digest of the config for logging
    pub fn digest(&self) -> String {
        format!(
            "api={} poll_ms={} symbol={} timeframe={} player={} year={}",
            self.api.base_url,
            self.clock.poll_interval_ms,
            self.chart.symbol,
            self.chart.timeframe(),
            self.time_travel.player_id,
            self.time_travel.game_year
        )
    }

    /// Reject settings the client cannot run with
    pub fn validate(&self) -> Result<()> {
        reqwest::Url::parse(&self.api.base_url)
            .with_context(|| format!("api.base_url '{}' is not a valid URL", self.api.base_url))?;

        if self.clock.poll_interval_ms == 0 {
            bail!("clock.poll_interval_ms must be greater than zero");
        }
        if self.chart.symbol.trim().is_empty() {
            bail!("chart.symbol must not be empty");
        }
        if Timeframe::from_str(&self.chart.timeframe).is_none() {
            bail!(
                "chart.timeframe '{}' is not one of 1M, 3M, 6M, YTD",
                self.chart.timeframe
            );
        }
        if self.chart.extend_by().is_none() {
            bail!(
                "chart.extend_days {} must be between 0 and {}",
                self.chart.extend_days,
                MAX_EXTEND_DAYS
            );
        }
        let year = self.time_travel.game_year;
        if chrono::NaiveDate::from_ymd_opt(year, 1, 1).is_none()
            || year
                .checked_add(1)
                .and_then(|next| chrono::NaiveDate::from_ymd_opt(next, 1, 1))
                .is_none()
        {
            bail!(
                "time_travel.game_year {} is out of range",
                self.time_travel.game_year
            );
        }

        Ok(())
    }
}

impl std::fmt::Display for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.digest())
    }
}
