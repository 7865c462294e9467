//! Chart Data Loader
//!
//! Fetches price history for a chart query and renders it. An empty window is
//! relaxed in fixed stages, each issued only after the previous one came back
//! empty:
//!
//! 1. the requested window `[start, end]`
//! 2. the window extended by `extend_by` past `end` (once per load)
//! 3. the full history of the symbol
//!
//! If every stage is empty the chart is cleared and flagged as having no data.
//! Any transport or HTTP failure aborts the load without further stages.
//!
//! Loads are tagged with a monotonically increasing request id. A load whose
//! id is no longer the latest when its data arrives is discarded, so a slow
//! response for an old symbol can never overwrite a newer chart.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::widget::{SeriesData, WidgetHandle};
use super::ChartError;
use crate::api::{ApiError, PriceHistoryApi};
use crate::types::{ChartQuery, PriceBar};

/// Escalation stage that produced the rendered bars
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStage {
    Window,
    Extended,
    FullHistory,
}

impl fmt::Display for LoadStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadStage::Window => write!(f, "window"),
            LoadStage::Extended => write!(f, "extended"),
            LoadStage::FullHistory => write!(f, "full_history"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Rendered { stage: LoadStage, bars: usize },
    /// Every stage came back empty; the chart was cleared
    NoData,
    /// A newer load was issued before this one finished; nothing was applied
    Superseded,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("invalid chart query: {0}")]
    InvalidQuery(String),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Chart(#[from] ChartError),
}

/// What the hosting view displays around the chart
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChartViewState {
    pub query: Option<ChartQuery>,
    /// A network call of the current load is outstanding
    pub loading: bool,
    pub has_data: bool,
    /// Every stage was empty
    pub no_data: bool,
    pub error: Option<String>,
    pub stage: Option<LoadStage>,
}

struct Fetched {
    stage: Option<LoadStage>,
    bars: Vec<PriceBar>,
}

pub struct ChartDataLoader {
    api: Arc<dyn PriceHistoryApi>,
    widget: WidgetHandle,
    extend_by: chrono::Duration,
    latest_request: AtomicU64,
    state: watch::Sender<ChartViewState>,
}

impl ChartDataLoader {
    pub fn new(
        api: Arc<dyn PriceHistoryApi>,
        widget: WidgetHandle,
        extend_by: chrono::Duration,
    ) -> Self {
        let (state, _) = watch::channel(ChartViewState::default());
        Self {
            api,
            widget,
            extend_by,
            latest_request: AtomicU64::new(0),
            state,
        }
    }

    /// Current view state
    pub fn state(&self) -> ChartViewState {
        self.state.borrow().clone()
    }

    /// Receive every view state change
    pub fn subscribe(&self) -> watch::Receiver<ChartViewState> {
        self.state.subscribe()
    }

    /// Load `query` and render the first non-empty stage.
    ///
    /// Call again whenever the symbol or window changes; the extension stage is
    /// attempted once per call.
    pub async fn load(&self, query: ChartQuery) -> Result<LoadOutcome, LoadError> {
        // Even a rejected query supersedes every load issued before it
        let request_id = self.latest_request.fetch_add(1, Ordering::SeqCst) + 1;
        if let Err(reason) = query.validate() {
            self.fail(reason.clone());
            return Err(LoadError::InvalidQuery(reason));
        }

        debug!(request_id, query = %query, "Chart load started");
        self.state.send_modify(|s| {
            s.query = Some(query.clone());
            s.loading = true;
            s.error = None;
        });

        let fetched = self.fetch_with_escalation(&query).await;

        // Hold the widget while checking freshness so an older load cannot
        // render after a newer one has been issued.
        let mut guard = self.widget.lock().await;
        if self.latest_request.load(Ordering::SeqCst) != request_id {
            debug!(request_id, query = %query, "Discarding superseded chart load");
            return Ok(LoadOutcome::Superseded);
        }

        let fetched = match fetched {
            Ok(fetched) => fetched,
            Err(e) => {
                warn!(query = %query, error = %e, "Chart load failed");
                self.fail(e.to_string());
                return Err(e.into());
            }
        };

        let Some(widget) = guard.as_mut() else {
            self.fail(ChartError::NotReady.to_string());
            return Err(ChartError::NotReady.into());
        };

        let series = SeriesData::from_bars(&fetched.bars);
        if let Err(e) = widget.set_data(&series) {
            warn!(query = %query, error = %e, "Chart rejected series");
            self.fail(e.to_string());
            return Err(e.into());
        }
        if !series.is_empty() {
            widget.fit_content();
        }

        let outcome = match fetched.stage {
            Some(stage) => LoadOutcome::Rendered {
                stage,
                bars: series.len(),
            },
            None => LoadOutcome::NoData,
        };
        self.state.send_modify(|s| {
            s.loading = false;
            s.error = None;
            s.has_data = fetched.stage.is_some();
            s.no_data = fetched.stage.is_none();
            s.stage = fetched.stage;
        });
        info!(query = %query, outcome = ?outcome, "Chart load finished");
        Ok(outcome)
    }

    async fn fetch_with_escalation(&self, query: &ChartQuery) -> Result<Fetched, ApiError> {
        let symbol = query.symbol.as_str();

        let bars = self
            .api
            .price_history(symbol, query.start, query.end)
            .await?;
        debug!(symbol = %symbol, points = bars.len(), stage = %LoadStage::Window, "Stage finished");
        if !bars.is_empty() {
            return Ok(Fetched {
                stage: Some(LoadStage::Window),
                bars,
            });
        }

        match query.end.checked_add_signed(self.extend_by) {
            Some(extended_end) => {
                let bars = self
                    .api
                    .price_history(symbol, query.start, extended_end)
                    .await?;
                debug!(symbol = %symbol, points = bars.len(), stage = %LoadStage::Extended, "Stage finished");
                if !bars.is_empty() {
                    return Ok(Fetched {
                        stage: Some(LoadStage::Extended),
                        bars,
                    });
                }
            }
            None => {
                debug!(symbol = %symbol, end = %query.end, "Extended window out of range, skipping");
            }
        }

        let bars = self.api.full_price_history(symbol).await?;
        debug!(symbol = %symbol, points = bars.len(), stage = %LoadStage::FullHistory, "Stage finished");
        if !bars.is_empty() {
            return Ok(Fetched {
                stage: Some(LoadStage::FullHistory),
                bars,
            });
        }

        Ok(Fetched {
            stage: None,
            bars: Vec::new(),
        })
    }

    fn fail(&self, message: String) {
        self.state.send_modify(|s| {
            s.loading = false;
            s.has_data = false;
            s.no_data = false;
            s.stage = None;
            s.error = Some(message);
        });
    }
}
