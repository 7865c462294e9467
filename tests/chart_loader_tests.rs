//! Chart loading end to end: surface, loader and a scripted backend

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::{NaiveDate, NaiveDateTime};
    use pibourse_client::api::{ApiClient, ApiError, PriceHistoryApi};
    use pibourse_client::chart::{
        ChartDataLoader, ChartError, ChartOptions, ChartSurface, ChartWidget, ChartWidgetFactory,
        LoadOutcome, LoadStage, SeriesData,
    };
    use pibourse_client::types::{ChartQuery, PriceBar, Timeframe};
    use rust_decimal_macros::dec;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Window {
            symbol: String,
            start: NaiveDateTime,
            end: NaiveDateTime,
        },
        Full {
            symbol: String,
        },
    }

    /// Backend returning fixed bar counts per symbol and stage.
    ///
    /// The first bounded request ever made for a symbol reads `window`, later
    /// bounded requests read `extended`.
    #[derive(Default)]
    struct ScriptedBackend {
        window: HashMap<&'static str, usize>,
        extended: HashMap<&'static str, usize>,
        full: HashMap<&'static str, usize>,
        latency: HashMap<&'static str, Duration>,
        calls: Mutex<Vec<Call>>,
    }

    impl ScriptedBackend {
        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        async fn delay(&self, symbol: &str) {
            if let Some(latency) = self.latency.get(symbol) {
                tokio::time::sleep(*latency).await;
            }
        }
    }

    #[async_trait]
    impl PriceHistoryApi for ScriptedBackend {
        async fn price_history(
            &self,
            symbol: &str,
            start: NaiveDateTime,
            end: NaiveDateTime,
        ) -> Result<Vec<PriceBar>, ApiError> {
            let first_attempt = !self
                .calls()
                .iter()
                .any(|c| matches!(c, Call::Window { symbol: s, .. } if s == symbol));
            self.calls.lock().unwrap().push(Call::Window {
                symbol: symbol.to_string(),
                start,
                end,
            });
            self.delay(symbol).await;
            let table = if first_attempt {
                &self.window
            } else {
                &self.extended
            };
            Ok(bars(table.get(symbol).copied().unwrap_or(0)))
        }

        async fn full_price_history(&self, symbol: &str) -> Result<Vec<PriceBar>, ApiError> {
            self.calls.lock().unwrap().push(Call::Full {
                symbol: symbol.to_string(),
            });
            self.delay(symbol).await;
            Ok(bars(self.full.get(symbol).copied().unwrap_or(0)))
        }
    }

    #[derive(Default)]
    struct Screen {
        rendered: Vec<usize>,
        fits: usize,
    }

    struct ScreenWidget(Arc<Mutex<Screen>>);

    impl ChartWidget for ScreenWidget {
        fn set_data(&mut self, series: &SeriesData) -> Result<(), ChartError> {
            self.0.lock().unwrap().rendered.push(series.len());
            Ok(())
        }

        fn apply_options(&mut self, _options: &ChartOptions) -> Result<(), ChartError> {
            Ok(())
        }

        fn fit_content(&mut self) {
            self.0.lock().unwrap().fits += 1;
        }

        fn destroy(&mut self) {}
    }

    struct ScreenFactory(Arc<Mutex<Screen>>);

    #[async_trait]
    impl ChartWidgetFactory for ScreenFactory {
        async fn create(
            &self,
            _options: &ChartOptions,
        ) -> Result<Box<dyn ChartWidget>, ChartError> {
            Ok(Box::new(ScreenWidget(Arc::clone(&self.0))))
        }
    }

    fn bars(count: usize) -> Vec<PriceBar> {
        (0..count)
            .map(|i| PriceBar {
                time: 1_675_243_800 + (i as i64) * 86_400,
                open: dec!(150.25),
                high: dec!(152.00),
                low: dec!(149.10),
                close: dec!(151.40),
                volume: 42_000,
            })
            .collect()
    }

    fn at(month: u32, day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, month, day)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .expect("valid date")
    }

    type Harness = (
        Arc<ScriptedBackend>,
        Arc<ChartDataLoader>,
        Arc<Mutex<Screen>>,
        ChartSurface,
    );

    async fn setup(backend: ScriptedBackend) -> Harness {
        let screen = Arc::new(Mutex::new(Screen::default()));
        let mut surface = ChartSurface::new(800, 480, Timeframe::OneMonth);
        surface
            .init(&ScreenFactory(Arc::clone(&screen)), Duration::from_secs(5))
            .await
            .expect("surface init");

        let backend = Arc::new(backend);
        let loader = Arc::new(ChartDataLoader::new(
            backend.clone(),
            surface.widget(),
            chrono::Duration::days(7),
        ));
        (backend, loader, screen, surface)
    }

    // ============================================================================
    // Escalation
    // ============================================================================

    #[tokio::test(start_paused = true)]
    async fn test_window_with_data_single_request() {
        let mut backend = ScriptedBackend::default();
        backend.window.insert("AAPL", 20);
        backend.latency.insert("AAPL", Duration::from_millis(200));
        let (backend, loader, screen, _surface) = setup(backend).await;

        let mut state_rx = loader.subscribe();
        let task = tokio::spawn({
            let loader = Arc::clone(&loader);
            async move { loader.load(ChartQuery::new("AAPL", at(2, 1), at(3, 3))).await }
        });

        state_rx.changed().await.expect("state published");
        assert!(state_rx.borrow_and_update().loading);

        let outcome = task.await.expect("task joins").expect("load succeeds");
        assert_eq!(
            outcome,
            LoadOutcome::Rendered {
                stage: LoadStage::Window,
                bars: 20
            }
        );
        assert_eq!(backend.calls().len(), 1);
        assert_eq!(screen.lock().unwrap().rendered, vec![20]);

        let state = loader.state();
        assert!(!state.loading);
        assert!(!state.no_data);
        assert!(state.has_data);
    }

    #[tokio::test]
    async fn test_unknown_symbol_walks_every_stage_in_order() {
        let (backend, loader, screen, _surface) = setup(ScriptedBackend::default()).await;

        let outcome = loader
            .load(ChartQuery::new("ZZZZ", at(2, 1), at(3, 3)))
            .await
            .expect("load succeeds");

        assert_eq!(outcome, LoadOutcome::NoData);
        assert_eq!(
            backend.calls(),
            vec![
                Call::Window {
                    symbol: "ZZZZ".to_string(),
                    start: at(2, 1),
                    end: at(3, 3)
                },
                Call::Window {
                    symbol: "ZZZZ".to_string(),
                    start: at(2, 1),
                    end: at(3, 10)
                },
                Call::Full {
                    symbol: "ZZZZ".to_string()
                },
            ]
        );

        let screen = screen.lock().unwrap();
        assert_eq!(screen.rendered, vec![0]);
        assert_eq!(screen.fits, 0);

        let state = loader.state();
        assert!(state.no_data);
        assert!(!state.loading);
        assert!(state.error.is_none());
    }

    #[tokio::test]
    async fn test_each_load_gets_its_own_extension() {
        let mut backend = ScriptedBackend::default();
        backend.full.insert("MSFT", 12);
        let (backend, loader, _screen, _surface) = setup(backend).await;

        for _ in 0..2 {
            let outcome = loader
                .load(ChartQuery::new("MSFT", at(2, 1), at(3, 3)))
                .await
                .expect("load succeeds");
            assert_eq!(
                outcome,
                LoadOutcome::Rendered {
                    stage: LoadStage::FullHistory,
                    bars: 12
                }
            );
        }

        let extended = backend
            .calls()
            .iter()
            .filter(|c| matches!(c, Call::Window { end, .. } if *end == at(3, 10)))
            .count();
        assert_eq!(extended, 2);
        assert_eq!(backend.calls().len(), 6);
    }

    // ============================================================================
    // Stale responses
    // ============================================================================

    #[tokio::test(start_paused = true)]
    async fn test_slow_older_load_is_discarded() {
        let mut backend = ScriptedBackend::default();
        backend.window.insert("SLOW", 30);
        backend.window.insert("FAST", 8);
        backend.latency.insert("SLOW", Duration::from_secs(5));
        backend.latency.insert("FAST", Duration::from_secs(1));
        let (_backend, loader, screen, _surface) = setup(backend).await;

        let (older, newer) = tokio::join!(
            loader.load(ChartQuery::new("SLOW", at(2, 1), at(3, 3))),
            loader.load(ChartQuery::new("FAST", at(2, 1), at(3, 3))),
        );

        assert_eq!(older.expect("older load"), LoadOutcome::Superseded);
        assert_eq!(
            newer.expect("newer load"),
            LoadOutcome::Rendered {
                stage: LoadStage::Window,
                bars: 8
            }
        );
        assert_eq!(screen.lock().unwrap().rendered, vec![8]);

        let state = loader.state();
        assert_eq!(state.query.map(|q| q.symbol), Some("FAST".to_string()));
        assert!(!state.loading);
    }

    // ============================================================================
    // Transport
    // ============================================================================

    #[tokio::test]
    async fn test_unreachable_backend_is_a_transport_error() {
        let client = ApiClient::new("http://127.0.0.1:9", Duration::from_secs(2))
            .expect("valid base url");

        let err = client
            .price_history("AAPL", at(2, 1), at(3, 3))
            .await
            .expect_err("nothing listens on the discard port");

        assert!(matches!(err, ApiError::Transport(_)));
    }
}
