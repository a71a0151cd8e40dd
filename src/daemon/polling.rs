use crate::core::clock::Clock;
use crate::core::models::{OperatingWindow, Route, TravelTime};
use crate::core::state::DashboardState;
use crate::history::{self, SampleStore, StoreError};
use crate::providers::TravelTimeProvider;
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    OutsideOperatingWindow,
    AlreadyInFlight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Skipped(SkipReason),
    Updated { persisted: bool },
    Unavailable,
}

/// Fetches travel times for one route, at most one request at a time and only
/// inside the operating window.
pub struct Poller {
    provider: Arc<dyn TravelTimeProvider>,
    store: Arc<SampleStore>,
    state: DashboardState,
    clock: Arc<dyn Clock>,
    route: Route,
    window: OperatingWindow,
}

impl Poller {
    pub fn new(
        provider: Arc<dyn TravelTimeProvider>,
        store: Arc<SampleStore>,
        state: DashboardState,
        clock: Arc<dyn Clock>,
        route: Route,
        window: OperatingWindow,
    ) -> Self {
        Self {
            provider,
            store,
            state,
            clock,
            route,
            window,
        }
    }

    pub async fn maybe_fetch(&self) -> FetchOutcome {
        let now = self.clock.now();
        if !self.window.contains(&now) {
            tracing::debug!(%now, "Outside operating window, skipping fetch");
            return FetchOutcome::Skipped(SkipReason::OutsideOperatingWindow);
        }

        let Some(_flight) = self.state.try_begin_fetch() else {
            tracing::debug!("Fetch already in flight, dropping trigger");
            return FetchOutcome::Skipped(SkipReason::AlreadyInFlight);
        };

        let started = Instant::now();
        let outcome = match self.provider.fetch(&self.route).await {
            Ok(travel) => self.record(travel).await,
            Err(e) => {
                tracing::warn!(
                    provider = self.provider.name(),
                    error = %e,
                    "Travel time lookup failed"
                );
                self.state.apply_failure().await;
                FetchOutcome::Unavailable
            }
        };

        let elapsed = started.elapsed();
        let next_in = self.state.reset_countdown(elapsed).await;
        tracing::debug!(
            ?outcome,
            elapsed_ms = elapsed.as_millis() as u64,
            next_in_secs = next_in,
            "Fetch attempt finished"
        );

        outcome
    }

    /// Reloads the history log and replaces the chart shown on the dashboard.
    pub async fn rebuild_chart(&self) {
        let samples = history::load_or_empty(&self.store);
        let chart = history::rebuild(&samples);
        tracing::debug!(
            samples = samples.len(),
            points = chart.total_points(),
            "Rebuilt weekly chart"
        );
        self.state.set_chart(chart).await;
    }

    async fn record(&self, travel: TravelTime) -> FetchOutcome {
        match self.store.append(&travel.duration_text) {
            Ok(sample) => {
                tracing::info!(
                    minutes = sample.duration_minutes,
                    distance = %travel.distance_text,
                    "Recorded travel time"
                );
                self.state.apply_success(travel, sample.timestamp).await;
                self.rebuild_chart().await;
                FetchOutcome::Updated { persisted: true }
            }
            Err(StoreError::Validation(e)) => {
                tracing::warn!(error = %e, "Provider returned an unusable duration");
                self.state.apply_failure().await;
                FetchOutcome::Unavailable
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to persist travel sample");
                self.state.apply_success(travel, self.clock.now()).await;
                FetchOutcome::Updated { persisted: false }
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::core::models::{Route, TravelMode, TravelTime};
    use crate::providers::{ProviderError, TravelTimeProvider};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::sync::Notify;

    #[derive(Debug, Clone)]
    pub enum Reply {
        Travel(&'static str),
        HttpError,
    }

    /// Scripted provider. When `hold` is set, each lookup waits for a
    /// `release()` before answering.
    pub struct FakeProvider {
        reply: Mutex<Reply>,
        calls: AtomicUsize,
        hold: bool,
        entered: Notify,
        release: Notify,
    }

    impl FakeProvider {
        pub fn replying(reply: Reply) -> Self {
            Self {
                reply: Mutex::new(reply),
                calls: AtomicUsize::new(0),
                hold: false,
                entered: Notify::new(),
                release: Notify::new(),
            }
        }

        pub fn held(reply: Reply) -> Self {
            Self {
                hold: true,
                ..Self::replying(reply)
            }
        }

        pub fn set_reply(&self, reply: Reply) {
            *self.reply.lock().unwrap() = reply;
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub async fn wait_entered(&self) {
            self.entered.notified().await;
        }

        pub fn release(&self) {
            self.release.notify_one();
        }
    }

    #[async_trait]
    impl TravelTimeProvider for FakeProvider {
        fn name(&self) -> &'static str {
            "Fake"
        }

        async fn fetch(&self, _route: &Route) -> Result<TravelTime, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.entered.notify_one();
            if self.hold {
                self.release.notified().await;
            }

            let reply = self.reply.lock().unwrap().clone();
            match reply {
                Reply::Travel(duration) => Ok(TravelTime {
                    duration_text: duration.to_string(),
                    distance_text: "24.3 km".to_string(),
                }),
                Reply::HttpError => Err(ProviderError::Status {
                    status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
                    body: "backend error".to_string(),
                }),
            }
        }

        fn has_valid_credentials(&self) -> bool {
            true
        }

        fn credential_error_hint(&self) -> &'static str {
            ""
        }
    }

    pub fn route() -> Route {
        Route {
            origin: "Main St 1".to_string(),
            destination: "Harbor Rd 9".to_string(),
            travel_mode: TravelMode::Driving,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{route, FakeProvider, Reply};
    use super::*;
    use crate::core::clock::testing::{datetime, FixedClock};
    use crate::core::models::{LOADING_DISTANCE, LOADING_DURATION, UNAVAILABLE};
    use chrono::Weekday;
    use std::time::Duration;
    use tempfile::TempDir;

    const INTERVAL: Duration = Duration::from_secs(600);

    struct Harness {
        _dir: TempDir,
        clock: Arc<FixedClock>,
        provider: Arc<FakeProvider>,
        store: Arc<SampleStore>,
        state: DashboardState,
        poller: Arc<Poller>,
    }

    fn harness(provider: FakeProvider, clock: FixedClock) -> Harness {
        let dir = TempDir::new().unwrap();
        let log_path = dir.path().join("travel_log.txt");
        harness_at(dir, log_path, provider, clock)
    }

    fn harness_at(
        dir: TempDir,
        log_path: std::path::PathBuf,
        provider: FakeProvider,
        clock: FixedClock,
    ) -> Harness {
        let clock = Arc::new(clock);
        let provider = Arc::new(provider);
        let store = Arc::new(SampleStore::new(
            log_path,
            chrono::Duration::days(7),
            Arc::clone(&clock) as Arc<dyn Clock>,
        ));
        let state = DashboardState::new(INTERVAL);
        let poller = Arc::new(Poller::new(
            Arc::clone(&provider) as Arc<dyn TravelTimeProvider>,
            Arc::clone(&store),
            state.clone(),
            Arc::clone(&clock) as Arc<dyn Clock>,
            route(),
            OperatingWindow::default(),
        ));

        Harness {
            _dir: dir,
            clock,
            provider,
            store,
            state,
            poller,
        }
    }

    fn monday_morning() -> FixedClock {
        // 2024-06-03 is a Monday
        FixedClock::at(2024, 6, 3, 9, 15, 0)
    }

    #[tokio::test]
    async fn test_successful_fetch_records_sample() {
        let h = harness(FakeProvider::replying(Reply::Travel("23 mins")), monday_morning());
        h.state.tick_countdown(Duration::from_secs(1)).await;

        let outcome = h.poller.maybe_fetch().await;
        assert_eq!(outcome, FetchOutcome::Updated { persisted: true });
        assert_eq!(h.provider.calls(), 1);

        let snapshot = h.state.snapshot().await;
        assert_eq!(snapshot.duration_text, "23 mins");
        assert_eq!(snapshot.distance_text, "24.3 km");
        assert_eq!(snapshot.last_update, Some(datetime(2024, 6, 3, 9, 15, 0)));
        assert!(!snapshot.in_flight);
        assert!(snapshot.seconds_until_next_fetch >= 599);

        let monday = snapshot.chart.series(Weekday::Mon);
        assert_eq!(monday.len(), 1);
        assert!((monday[0].hour - 9.25).abs() < f64::EPSILON);
        assert_eq!(monday[0].minutes, 23);
        let peak = snapshot.chart.peak.unwrap();
        assert_eq!((peak.weekday, peak.minutes), (Weekday::Mon, 23));

        assert_eq!(h.store.load_all().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_http_failure_shows_sentinel() {
        let h = harness(FakeProvider::replying(Reply::HttpError), monday_morning());
        for _ in 0..10 {
            h.state.tick_countdown(Duration::from_secs(1)).await;
        }

        let outcome = h.poller.maybe_fetch().await;
        assert_eq!(outcome, FetchOutcome::Unavailable);

        let snapshot = h.state.snapshot().await;
        assert_eq!(snapshot.duration_text, UNAVAILABLE);
        assert_eq!(snapshot.distance_text, UNAVAILABLE);
        assert!(snapshot.last_update.is_none());
        assert!(!snapshot.in_flight);
        assert!(snapshot.seconds_until_next_fetch >= 599);
        assert!(!h.store.path().exists());
    }

    #[tokio::test]
    async fn test_malformed_duration_takes_unavailable_path() {
        let h = harness(FakeProvider::replying(Reply::Travel("23 mins")), monday_morning());
        h.poller.maybe_fetch().await;
        let before = std::fs::read_to_string(h.store.path()).unwrap();

        h.provider.set_reply(Reply::Travel("N/A"));
        h.clock.advance(chrono::Duration::minutes(10));
        let outcome = h.poller.maybe_fetch().await;

        assert_eq!(outcome, FetchOutcome::Unavailable);
        assert_eq!(std::fs::read_to_string(h.store.path()).unwrap(), before);

        let snapshot = h.state.snapshot().await;
        assert_eq!(snapshot.duration_text, UNAVAILABLE);
        assert_eq!(snapshot.chart.total_points(), 1);
    }

    #[tokio::test]
    async fn test_outside_operating_window_is_noop() {
        let cases = [
            datetime(2024, 6, 3, 8, 59, 59),
            datetime(2024, 6, 3, 20, 0, 0),
            datetime(2024, 6, 8, 12, 0, 0),
            datetime(2024, 6, 9, 10, 0, 0),
        ];

        let h = harness(FakeProvider::replying(Reply::Travel("23 mins")), monday_morning());
        for now in cases {
            h.clock.set(now);
            let outcome = h.poller.maybe_fetch().await;
            assert_eq!(
                outcome,
                FetchOutcome::Skipped(SkipReason::OutsideOperatingWindow)
            );
        }

        assert_eq!(h.provider.calls(), 0);
        let snapshot = h.state.snapshot().await;
        assert_eq!(snapshot.duration_text, LOADING_DURATION);
        assert_eq!(snapshot.distance_text, LOADING_DISTANCE);
        assert!(snapshot.last_update.is_none());
        assert_eq!(snapshot.seconds_until_next_fetch, INTERVAL.as_secs());
        assert!(!h.store.path().exists());
    }

    #[tokio::test]
    async fn test_triggers_while_in_flight_are_dropped() {
        let h = harness(FakeProvider::held(Reply::Travel("23 mins")), monday_morning());

        let first = tokio::spawn({
            let poller = Arc::clone(&h.poller);
            async move { poller.maybe_fetch().await }
        });
        h.provider.wait_entered().await;
        assert!(h.state.is_in_flight());

        for _ in 0..2 {
            let outcome = h.poller.maybe_fetch().await;
            assert_eq!(outcome, FetchOutcome::Skipped(SkipReason::AlreadyInFlight));
        }

        h.provider.release();
        let outcome = first.await.unwrap();
        assert_eq!(outcome, FetchOutcome::Updated { persisted: true });
        assert_eq!(h.provider.calls(), 1);
        assert!(!h.state.is_in_flight());
    }

    #[tokio::test]
    async fn test_flag_released_after_failure() {
        let h = harness(FakeProvider::replying(Reply::HttpError), monday_morning());

        h.poller.maybe_fetch().await;
        assert!(!h.state.is_in_flight());

        h.provider.set_reply(Reply::Travel("31 mins"));
        let outcome = h.poller.maybe_fetch().await;
        assert_eq!(outcome, FetchOutcome::Updated { persisted: true });
        assert_eq!(h.provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_store_failure_still_updates_display() {
        let dir = TempDir::new().unwrap();
        // A directory in place of the log file makes every write fail
        let log_path = dir.path().join("travel_log.txt");
        std::fs::create_dir(&log_path).unwrap();

        let h = harness_at(
            dir,
            log_path,
            FakeProvider::replying(Reply::Travel("47 mins")),
            monday_morning(),
        );

        let outcome = h.poller.maybe_fetch().await;
        assert_eq!(outcome, FetchOutcome::Updated { persisted: false });

        let snapshot = h.state.snapshot().await;
        assert_eq!(snapshot.duration_text, "47 mins");
        assert_eq!(snapshot.last_update, Some(datetime(2024, 6, 3, 9, 15, 0)));
        assert!(!snapshot.in_flight);
    }

    #[tokio::test]
    async fn test_rebuild_chart_from_existing_history() {
        let h = harness(FakeProvider::replying(Reply::Travel("23 mins")), monday_morning());
        std::fs::write(
            h.store.path(),
            "Timestamp: 2024-06-03 08:30:00, Duration: 35 mins\n\
             Timestamp: 2024-06-01 10:00:00, Duration: 12 mins\n",
        )
        .unwrap();

        h.poller.rebuild_chart().await;

        let snapshot = h.state.snapshot().await;
        assert_eq!(snapshot.chart.total_points(), 1);
        assert_eq!(snapshot.chart.bucket(Weekday::Mon, 8.5), vec![35]);
        assert_eq!(h.provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_rebuild_chart_without_history() {
        let h = harness(FakeProvider::replying(Reply::Travel("23 mins")), monday_morning());

        h.poller.rebuild_chart().await;

        let snapshot = h.state.snapshot().await;
        assert!(snapshot.chart.is_empty());
        assert!(snapshot.chart.peak.is_none());
    }
}
