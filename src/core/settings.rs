use crate::core::models::{OperatingWindow, Route, TravelMode};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "https://maps.googleapis.com/maps/api/distancematrix/json";
pub const DEFAULT_API_KEY_ENV: &str = "TRAFFIC_BOARD_API_KEY";
pub const MAX_RETENTION_DAYS: u32 = 3650;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub route: RouteSettings,
    pub polling: PollingSettings,
    pub schedule: ScheduleSettings,
    pub history: HistorySettings,
    pub provider: ProviderSettings,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteSettings {
    pub origin: String,
    pub destination: String,
    pub travel_mode: TravelMode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingSettings {
    pub interval_secs: u64,
    pub refresh_secs: u64,
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            interval_secs: 600,
            refresh_secs: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleSettings {
    pub start_hour: u32,
    pub end_hour: u32,
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        let window = OperatingWindow::default();
        Self {
            start_hour: window.start_hour,
            end_hour: window.end_hour,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistorySettings {
    pub retention_days: u32,
    pub log_path: Option<PathBuf>,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            retention_days: 7,
            log_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub api_key_env: String,
    pub timeout_secs: u64,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: None,
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            timeout_secs: 30,
        }
    }
}

impl ProviderSettings {
    /// The key from the config file, else from the configured environment variable.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(|| std::env::var(&self.api_key_env).ok())
            .filter(|k| !k.is_empty())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Settings {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("traffic-board").join("config.toml"))
    }

    pub fn load() -> Result<Self> {
        let path = Self::config_path().context("Could not determine config directory")?;

        if !path.exists() {
            tracing::info!(?path, "Config file not found, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let settings: Settings = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        tracing::info!(?path, "Loaded config");
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.polling.interval_secs == 0 {
            anyhow::bail!("polling.interval_secs must be greater than 0");
        }
        if self.polling.refresh_secs == 0 {
            anyhow::bail!("polling.refresh_secs must be greater than 0");
        }
        if self.schedule.end_hour > 24 || self.schedule.start_hour >= self.schedule.end_hour {
            anyhow::bail!(
                "schedule must satisfy start_hour < end_hour <= 24, got {}..{}",
                self.schedule.start_hour,
                self.schedule.end_hour
            );
        }
        if self.history.retention_days == 0 || self.history.retention_days > MAX_RETENTION_DAYS {
            anyhow::bail!(
                "history.retention_days must be between 1 and {}, got {}",
                MAX_RETENTION_DAYS,
                self.history.retention_days
            );
        }
        if self.provider.timeout_secs == 0 {
            anyhow::bail!("provider.timeout_secs must be greater than 0");
        }
        Ok(())
    }

    pub fn require_route(&self) -> Result<Route> {
        if self.route.origin.trim().is_empty() {
            anyhow::bail!("route.origin must be set in {}", self.config_path_display());
        }
        if self.route.destination.trim().is_empty() {
            anyhow::bail!(
                "route.destination must be set in {}",
                self.config_path_display()
            );
        }
        Ok(Route {
            origin: self.route.origin.clone(),
            destination: self.route.destination.clone(),
            travel_mode: self.route.travel_mode,
        })
    }

    pub fn operating_window(&self) -> OperatingWindow {
        OperatingWindow {
            start_hour: self.schedule.start_hour,
            end_hour: self.schedule.end_hour,
        }
    }

    pub fn fetch_interval(&self) -> Duration {
        Duration::from_secs(self.polling.interval_secs)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.polling.refresh_secs)
    }

    pub fn retention(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.history.retention_days))
    }

    pub fn log_path(&self) -> Result<PathBuf> {
        match &self.history.log_path {
            Some(path) => Ok(path.clone()),
            None => dirs::data_dir()
                .map(|p| p.join("traffic-board").join("travel_log.txt"))
                .context("Could not determine data directory"),
        }
    }

    fn config_path_display(&self) -> String {
        Self::config_path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "config.toml".to_string())
    }
}
