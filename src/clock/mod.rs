//! Simulation Clock Poller
//!
//! One background task polls the backend clock status and publishes the latest
//! snapshot through a `watch` channel, so any number of subscribers see the
//! same value. Control commands go straight to the backend; the cached state is
//! only ever updated by the next successful poll.

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, info, warn};

use crate::api::{ApiError, ClockApi, CommandAck};
use crate::types::SimulationClockState;

/// Default polling cadence
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

struct PollerTask {
    shutdown_tx: mpsc::Sender<()>,
    handle: JoinHandle<()>,
}

pub struct SimulationClock {
    api: Arc<dyn ClockApi>,
    poll_interval: Duration,
    state_tx: Arc<watch::Sender<Option<SimulationClockState>>>,
    task: Option<PollerTask>,
}

impl SimulationClock {
    pub fn new(api: Arc<dyn ClockApi>, poll_interval: Duration) -> Self {
        let (state_tx, _) = watch::channel(None);
        Self {
            api,
            poll_interval,
            state_tx: Arc::new(state_tx),
            task: None,
        }
    }

    /// Start polling. Returns `false` if the poller is already running.
    pub fn connect(&mut self) -> bool {
        if self.is_running() {
            debug!("Clock poller already running");
            return false;
        }

        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let handle = tokio::spawn(run_poller(
            Arc::clone(&self.api),
            Arc::clone(&self.state_tx),
            self.poll_interval,
            shutdown_rx,
        ));
        self.task = Some(PollerTask {
            shutdown_tx,
            handle,
        });
        info!(interval_ms = self.poll_interval.as_millis() as u64, "Clock poller started");
        true
    }

    /// Stop polling and wait for the task to exit. Subscribers keep the last value.
    pub async fn disconnect(&mut self) {
        let Some(task) = self.task.take() else {
            return;
        };
        let _ = task.shutdown_tx.send(()).await;
        if let Err(e) = task.handle.await {
            warn!(error = %e, "Clock poller task ended abnormally");
        }
        info!("Clock poller stopped");
    }

    pub fn is_running(&self) -> bool {
        self.task
            .as_ref()
            .is_some_and(|task| !task.handle.is_finished())
    }

    /// Latest snapshot, `None` until the first successful poll
    pub fn latest(&self) -> Option<SimulationClockState> {
        self.state_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<SimulationClockState>> {
        self.state_tx.subscribe()
    }

    /// Published snapshots as a stream, starting with the current value
    pub fn stream(&self) -> WatchStream<Option<SimulationClockState>> {
        WatchStream::new(self.subscribe())
    }

    pub async fn start_acceleration(&self) -> Result<CommandAck, ApiError> {
        let ack = self.api.start().await?;
        info!(compression = ?ack.compression, "Clock acceleration started");
        Ok(ack)
    }

    pub async fn stop_acceleration(&self) -> Result<CommandAck, ApiError> {
        let ack = self.api.stop().await?;
        info!("Clock acceleration stopped");
        Ok(ack)
    }

    pub async fn reset(&self) -> Result<CommandAck, ApiError> {
        let ack = self.api.reset().await?;
        info!(message = ?ack.message, "Clock reset");
        Ok(ack)
    }
}

impl Drop for SimulationClock {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.handle.abort();
        }
    }
}

async fn run_poller(
    api: Arc<dyn ClockApi>,
    state_tx: Arc<watch::Sender<Option<SimulationClockState>>>,
    poll_interval: Duration,
    mut shutdown_rx: mpsc::Receiver<()>,
) {
    // First tick completes immediately
    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match api.status().await {
                    Ok(status) => {
                        debug!(
                            game_time = %status.current_game_time,
                            active = status.active,
                            "Clock status"
                        );
                        state_tx.send_replace(Some(status));
                    }
                    Err(e) => {
                        warn!(error = %e, "Clock status poll failed, keeping last value");
                    }
                }
            }
            _ = shutdown_rx.recv() => {
                debug!("Clock poller shutdown requested");
                break;
            }
        }
    }
}

/// Share of the game year elapsed at `time`, as a percentage in `[0, 100]`
pub fn year_progress(time: NaiveDateTime, year: i32) -> f64 {
    let (Some(start), Some(end)) = (
        NaiveDate::from_ymd_opt(year, 1, 1).and_then(|d| d.and_hms_opt(0, 0, 0)),
        NaiveDate::from_ymd_opt(year + 1, 1, 1).and_then(|d| d.and_hms_opt(0, 0, 0)),
    ) else {
        return 0.0;
    };
    if time.year() < year {
        return 0.0;
    }

    let total = (end - start).num_seconds() as f64;
    let elapsed = (time - start).num_seconds() as f64;
    (elapsed / total * 100.0).clamp(0.0, 100.0)
}
