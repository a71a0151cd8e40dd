use crate::core::models::{Route, TravelTime};
use crate::core::settings::ProviderSettings;
use crate::providers::{ProviderError, TravelTimeProvider};
use async_trait::async_trait;
use serde::Deserialize;

const STATUS_OK: &str = "OK";

#[derive(Debug, Deserialize)]
struct MatrixResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    rows: Vec<MatrixRow>,
}

#[derive(Debug, Deserialize)]
struct MatrixRow {
    #[serde(default)]
    elements: Vec<MatrixElement>,
}

#[derive(Debug, Deserialize)]
struct MatrixElement {
    status: String,
    #[serde(default)]
    duration: Option<TextValue>,
    #[serde(default)]
    duration_in_traffic: Option<TextValue>,
    #[serde(default)]
    distance: Option<TextValue>,
}

#[derive(Debug, Deserialize)]
struct TextValue {
    text: String,
}

pub struct DistanceMatrixProvider {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl DistanceMatrixProvider {
    pub fn new(settings: &ProviderSettings) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout())
            .build()?;

        Ok(Self {
            client,
            endpoint: settings.endpoint.clone(),
            api_key: settings.resolve_api_key(),
        })
    }
}

#[async_trait]
impl TravelTimeProvider for DistanceMatrixProvider {
    fn name(&self) -> &'static str {
        "Google Distance Matrix"
    }

    async fn fetch(&self, route: &Route) -> Result<TravelTime, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ProviderError::Credentials(self.credential_error_hint()))?;

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("origins", route.origin.as_str()),
                ("destinations", route.destination.as_str()),
                ("mode", route.travel_mode.as_query()),
                ("departure_time", "now"),
                ("traffic_model", "best_guess"),
                ("key", api_key),
            ])
            .header("Accept", "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status { status, body });
        }

        let body: MatrixResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;

        parse_response(body)
    }

    fn has_valid_credentials(&self) -> bool {
        self.api_key.is_some()
    }

    fn credential_error_hint(&self) -> &'static str {
        "Set provider.api_key in config.toml or export TRAFFIC_BOARD_API_KEY"
    }
}

fn parse_response(body: MatrixResponse) -> Result<TravelTime, ProviderError> {
    if body.status != STATUS_OK {
        return Err(ProviderError::Api {
            status: body.status,
            message: body.error_message,
        });
    }

    let element = body
        .rows
        .into_iter()
        .next()
        .and_then(|row| row.elements.into_iter().next())
        .ok_or_else(|| ProviderError::Malformed("response has no route elements".to_string()))?;

    if element.status != STATUS_OK {
        return Err(ProviderError::Api {
            status: element.status,
            message: None,
        });
    }

    let duration = element
        .duration_in_traffic
        .or(element.duration)
        .ok_or_else(|| ProviderError::Malformed("element has no duration".to_string()))?;
    let distance = element
        .distance
        .ok_or_else(|| ProviderError::Malformed("element has no distance".to_string()))?;

    Ok(TravelTime {
        duration_text: duration.text,
        distance_text: distance.text,
    })
}
