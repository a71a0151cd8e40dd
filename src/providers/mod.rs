mod distance_matrix;

use crate::core::models::{Route, TravelTime};
use async_trait::async_trait;
use thiserror::Error;

pub use distance_matrix::DistanceMatrixProvider;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Missing API key. {0}")]
    Credentials(&'static str),

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Provider returned HTTP {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Provider reported {status}{}", api_suffix(.message))]
    Api {
        status: String,
        message: Option<String>,
    },

    #[error("Malformed provider response: {0}")]
    Malformed(String),
}

fn api_suffix(message: &Option<String>) -> String {
    message
        .as_deref()
        .map(|m| format!(": {m}"))
        .unwrap_or_default()
}

/// Travel time lookup for a single route, departing now.
#[async_trait]
pub trait TravelTimeProvider: Send + Sync {
    fn name(&self) -> &'static str;
    async fn fetch(&self, route: &Route) -> Result<TravelTime, ProviderError>;
    fn has_valid_credentials(&self) -> bool;
    fn credential_error_hint(&self) -> &'static str;
}
