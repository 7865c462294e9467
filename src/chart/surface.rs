//! Chart surface: owns one widget from creation to teardown
//!
//! The widget is created under a library-load timeout, resized whenever the
//! container width changes and destroyed only after the resize observer has
//! been disconnected.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::widget::{ChartOptions, ChartWidgetFactory, WidgetHandle};
use super::ChartError;
use crate::types::Timeframe;

pub struct ChartSurface {
    widget: WidgetHandle,
    options: ChartOptions,
    default_width: u32,
    height: u32,
    timeframe: Timeframe,
    resize_observer: Option<JoinHandle<()>>,
}

impl ChartSurface {
    pub fn new(width: u32, height: u32, timeframe: Timeframe) -> Self {
        let (bar_spacing, min_bar_spacing) = timeframe.bar_spacing();
        Self {
            widget: Arc::new(Mutex::new(None)),
            options: ChartOptions::size(width, height)
                .merge(ChartOptions::spacing(bar_spacing, min_bar_spacing)),
            default_width: width,
            height,
            timeframe,
            resize_observer: None,
        }
    }

    /// Shared slot the data loader renders into
    pub fn widget(&self) -> WidgetHandle {
        Arc::clone(&self.widget)
    }

    pub fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    pub fn options(&self) -> ChartOptions {
        self.options
    }

    pub async fn is_ready(&self) -> bool {
        self.widget.lock().await.is_some()
    }

    /// Create the widget, replacing any existing one.
    ///
    /// On failure or timeout nothing is left behind and the surface stays not ready.
    pub async fn init(
        &mut self,
        factory: &dyn ChartWidgetFactory,
        library_timeout: Duration,
    ) -> Result<(), ChartError> {
        if self.is_ready().await {
            self.destroy().await;
        }

        debug!(
            width = ?self.options.width,
            height = ?self.options.height,
            "Creating chart widget"
        );
        let widget = match tokio::time::timeout(library_timeout, factory.create(&self.options))
            .await
        {
            Ok(Ok(widget)) => widget,
            Ok(Err(e)) => {
                warn!(error = %e, "Chart widget creation failed");
                return Err(e);
            }
            Err(_) => {
                let millis = library_timeout.as_millis() as u64;
                warn!(timeout_ms = millis, "Chart library did not load in time");
                return Err(ChartError::LibraryTimeout(millis));
            }
        };

        *self.widget.lock().await = Some(widget);
        info!(timeframe = %self.timeframe, "Chart widget ready");
        Ok(())
    }

    /// Watch the container width and reapply layout on every change.
    ///
    /// A zero width falls back to the configured width.
    pub fn observe_resize(&mut self, mut container_width: watch::Receiver<u32>) {
        self.disconnect_resize_observer();

        let widget = Arc::clone(&self.widget);
        let default_width = self.default_width;
        let height = self.height;
        self.resize_observer = Some(tokio::spawn(async move {
            while container_width.changed().await.is_ok() {
                let width = match *container_width.borrow_and_update() {
                    0 => default_width,
                    w => w,
                };
                let mut guard = widget.lock().await;
                if let Some(widget) = guard.as_mut() {
                    if let Err(e) = widget.apply_options(&ChartOptions::size(width, height)) {
                        warn!(error = %e, width, "Chart resize failed");
                    }
                }
            }
            debug!("Container width channel closed, resize observer stopped");
        }));
    }

    /// Apply the timeframe's bar spacing and refit the visible range
    pub async fn select_timeframe(&mut self, timeframe: Timeframe) -> Result<(), ChartError> {
        self.timeframe = timeframe;
        let (bar_spacing, min_bar_spacing) = timeframe.bar_spacing();
        let spacing = ChartOptions::spacing(bar_spacing, min_bar_spacing);
        self.options = self.options.merge(spacing);

        let mut guard = self.widget.lock().await;
        let widget = guard.as_mut().ok_or(ChartError::NotReady)?;
        widget.apply_options(&spacing)?;
        widget.fit_content();
        debug!(timeframe = %timeframe, bar_spacing, "Timeframe applied");
        Ok(())
    }

    /// Disconnect the resize observer, then destroy the widget
    pub async fn destroy(&mut self) {
        self.disconnect_resize_observer();
        if let Some(mut widget) = self.widget.lock().await.take() {
            widget.destroy();
            debug!("Chart widget destroyed");
        }
    }

    fn disconnect_resize_observer(&mut self) {
        if let Some(handle) = self.resize_observer.take() {
            handle.abort();
        }
    }
}

impl Drop for ChartSurface {
    fn drop(&mut self) {
        self.disconnect_resize_observer();
    }
}
