mod aggregate;
mod store;

use crate::core::models::Sample;

pub use aggregate::{rebuild, WeeklyChart};
pub use store::{SampleStore, StoreError};

/// Loads retained samples, treating an unreadable or missing log as empty history.
pub fn load_or_empty(store: &SampleStore) -> Vec<Sample> {
    match store.load_all() {
        Ok(samples) => samples,
        Err(StoreError::Unavailable { path, source }) => {
            tracing::info!(
                path = %path.display(),
                error = %source,
                "History log not readable, starting with empty history"
            );
            Vec::new()
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load history");
            Vec::new()
        }
    }
}
