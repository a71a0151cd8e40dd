use crate::core::duration;
use crate::core::models::{ColorTier, Route, TravelMode, TravelTime};
use crate::core::settings::Settings;
use crate::providers::{DistanceMatrixProvider, ProviderError, TravelTimeProvider};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct StatusOutput {
    origin: String,
    destination: String,
    travel_mode: TravelMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    distance: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    minutes: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tier: Option<ColorTier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(with = "chrono::serde::ts_seconds")]
    fetched_at: DateTime<Utc>,
}

pub async fn run(json: bool) -> Result<()> {
    let settings = Settings::load()?;
    settings.validate()?;
    let route = settings.require_route()?;
    let provider = DistanceMatrixProvider::new(&settings.provider)?;

    let output = fetch_status(&provider, &route).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_text_output(&output);
    }

    Ok(())
}

async fn fetch_status(provider: &dyn TravelTimeProvider, route: &Route) -> StatusOutput {
    if !provider.has_valid_credentials() {
        return status_from(
            route,
            Err(ProviderError::Credentials(provider.credential_error_hint())),
        );
    }

    let result = provider.fetch(route).await;
    if let Err(e) = &result {
        tracing::warn!(provider = provider.name(), error = %e, "Travel time lookup failed");
    }
    status_from(route, result)
}

fn status_from(route: &Route, result: Result<TravelTime, ProviderError>) -> StatusOutput {
    let mut output = StatusOutput {
        origin: route.origin.clone(),
        destination: route.destination.clone(),
        travel_mode: route.travel_mode,
        duration: None,
        distance: None,
        minutes: None,
        tier: None,
        error: None,
        fetched_at: Utc::now(),
    };

    match result {
        Ok(travel) => {
            output.minutes = duration::parse_minutes(&travel.duration_text).ok();
            output.tier = output.minutes.map(ColorTier::for_minutes);
            output.duration = Some(travel.duration_text);
            output.distance = Some(travel.distance_text);
        }
        Err(e) => output.error = Some(e.to_string()),
    }

    output
}

fn print_text_output(output: &StatusOutput) {
    println!("{} -> {}", output.origin, output.destination);

    if let Some(error) = &output.error {
        println!("  Error: {}", error);
        return;
    }

    if let Some(duration) = &output.duration {
        let tier = output
            .tier
            .map(|t| format!(" ({})", tier_label(t)))
            .unwrap_or_default();
        println!("  {:<10} {}{}", "Duration:", duration, tier);
    }

    if let Some(distance) = &output.distance {
        println!("  {:<10} {}", "Distance:", distance);
    }
}

fn tier_label(tier: ColorTier) -> &'static str {
    match tier {
        ColorTier::Ok => "ok",
        ColorTier::Warn => "warn",
        ColorTier::Alert => "alert",
    }
}
