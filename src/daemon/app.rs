use crate::core::clock::{Clock, SystemClock};
use crate::core::settings::Settings;
use crate::core::state::DashboardState;
use crate::daemon::polling::Poller;
use crate::history::SampleStore;
use crate::providers::{DistanceMatrixProvider, TravelTimeProvider};
use crate::ui::{Renderer, TextRenderer};
use anyhow::{Context, Result};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

pub async fn run(settings: Settings) -> Result<()> {
    settings.validate()?;
    let route = settings.require_route()?;
    let log_path = settings.log_path()?;

    tracing::info!(
        origin = %route.origin,
        destination = %route.destination,
        log = %log_path.display(),
        interval_secs = settings.polling.interval_secs,
        "Starting traffic board"
    );

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let store = Arc::new(SampleStore::new(
        log_path,
        settings.retention(),
        Arc::clone(&clock),
    ));

    let provider = DistanceMatrixProvider::new(&settings.provider)
        .context("Failed to build travel time client")?;
    if !provider.has_valid_credentials() {
        tracing::warn!(
            hint = provider.credential_error_hint(),
            "No API key configured, lookups will fail"
        );
    }

    let state = DashboardState::new(settings.fetch_interval());
    let poller = Arc::new(Poller::new(
        Arc::new(provider),
        store,
        state.clone(),
        Arc::clone(&clock),
        route.clone(),
        settings.operating_window(),
    ));

    poller.rebuild_chart().await;

    let mut renderer = TextRenderer::stdout(route, clock);
    run_scheduler(
        poller,
        state,
        &mut renderer,
        Schedule {
            fetch_every: settings.fetch_interval(),
            refresh_every: settings.refresh_interval(),
        },
        shutdown_signal(),
    )
    .await;

    tracing::info!("Traffic board stopped");
    Ok(())
}

#[derive(Debug, Clone, Copy)]
pub struct Schedule {
    pub fetch_every: Duration,
    pub refresh_every: Duration,
}

/// Drives the fetch and refresh triggers until `shutdown` resolves. Fetches
/// run on their own task so a slow lookup never delays a redraw.
pub async fn run_scheduler<R: Renderer>(
    poller: Arc<Poller>,
    state: DashboardState,
    renderer: &mut R,
    schedule: Schedule,
    shutdown: impl Future<Output = ()>,
) {
    let mut fetch_interval = tokio::time::interval(schedule.fetch_every);
    fetch_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut refresh_interval = tokio::time::interval(schedule.refresh_every);
    refresh_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("Shutdown requested");
                break;
            }
            _ = fetch_interval.tick() => {
                let poller = Arc::clone(&poller);
                tokio::spawn(async move {
                    let outcome = poller.maybe_fetch().await;
                    tracing::debug!(?outcome, "Fetch trigger handled");
                });
            }
            _ = refresh_interval.tick() => {
                state.tick_countdown(schedule.refresh_every).await;
                let snapshot = state.snapshot().await;
                if let Err(e) = renderer.render(&snapshot) {
                    tracing::warn!(error = %e, "Failed to render dashboard");
                }
            }
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
