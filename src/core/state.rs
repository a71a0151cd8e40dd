use crate::core::models::{ColorTier, TravelTime, LOADING_DISTANCE, LOADING_DURATION, UNAVAILABLE};
use crate::history::WeeklyChart;
use chrono::NaiveDateTime;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

#[derive(Debug)]
struct StateInner {
    duration_text: String,
    distance_text: String,
    last_update: Option<NaiveDateTime>,
    until_next_fetch: Duration,
    chart: WeeklyChart,
}

/// Live dashboard state shared between the scheduler triggers and the renderer.
#[derive(Clone)]
pub struct DashboardState {
    inner: Arc<RwLock<StateInner>>,
    in_flight: Arc<AtomicBool>,
    interval: Duration,
}

/// Read-only copy of the dashboard state handed to renderers.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    pub duration_text: String,
    pub distance_text: String,
    pub last_update: Option<NaiveDateTime>,
    pub in_flight: bool,
    pub seconds_until_next_fetch: u64,
    pub interval_secs: u64,
    pub chart: WeeklyChart,
}

impl DashboardSnapshot {
    pub fn color_tier(&self) -> Option<ColorTier> {
        ColorTier::for_text(&self.duration_text)
    }

    /// Fraction of the fetch interval already elapsed, in `[0, 1]`.
    pub fn progress(&self) -> f64 {
        if self.interval_secs == 0 {
            return 1.0;
        }
        let remaining = self.seconds_until_next_fetch.min(self.interval_secs);
        (self.interval_secs - remaining) as f64 / self.interval_secs as f64
    }
}

/// Held for the duration of one fetch attempt. Dropping it clears the
/// in-flight flag, whichever way the attempt ends.
#[derive(Debug)]
pub struct FlightGuard {
    flag: Arc<AtomicBool>,
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

impl DashboardState {
    pub fn new(interval: Duration) -> Self {
        Self {
            inner: Arc::new(RwLock::new(StateInner {
                duration_text: LOADING_DURATION.to_string(),
                distance_text: LOADING_DISTANCE.to_string(),
                last_update: None,
                until_next_fetch: interval,
                chart: WeeklyChart::default(),
            })),
            in_flight: Arc::new(AtomicBool::new(false)),
            interval,
        }
    }

    pub fn try_begin_fetch(&self) -> Option<FlightGuard> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| FlightGuard {
                flag: Arc::clone(&self.in_flight),
            })
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub async fn apply_success(&self, travel: TravelTime, at: NaiveDateTime) {
        let mut inner = self.inner.write().await;
        inner.duration_text = travel.duration_text;
        inner.distance_text = travel.distance_text;
        inner.last_update = Some(at);
    }

    pub async fn apply_failure(&self) {
        let mut inner = self.inner.write().await;
        inner.duration_text = UNAVAILABLE.to_string();
        inner.distance_text = UNAVAILABLE.to_string();
    }

    /// Restarts the countdown after a completed fetch attempt, discounting the
    /// time the attempt itself took.
    pub async fn reset_countdown(&self, elapsed: Duration) -> u64 {
        let remaining = self
            .interval
            .saturating_sub(Duration::from_secs(elapsed.as_secs()));
        self.inner.write().await.until_next_fetch = remaining;
        remaining.as_secs()
    }

    /// Advances the countdown by one refresh period, flooring at zero.
    pub async fn tick_countdown(&self, period: Duration) -> u64 {
        let mut inner = self.inner.write().await;
        inner.until_next_fetch = inner.until_next_fetch.saturating_sub(period);
        inner.until_next_fetch.as_secs()
    }

    pub async fn set_chart(&self, chart: WeeklyChart) {
        self.inner.write().await.chart = chart;
    }

    pub async fn snapshot(&self) -> DashboardSnapshot {
        let inner = self.inner.read().await;
        DashboardSnapshot {
            duration_text: inner.duration_text.clone(),
            distance_text: inner.distance_text.clone(),
            last_update: inner.last_update,
            in_flight: self.is_in_flight(),
            seconds_until_next_fetch: inner.until_next_fetch.as_secs(),
            interval_secs: self.interval.as_secs(),
            chart: inner.chart.clone(),
        }
    }
}
