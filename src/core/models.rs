use crate::core::duration::{self, ValidationError};
use chrono::{Datelike, NaiveDateTime, Timelike, Weekday};
use serde::{Deserialize, Serialize};

pub const UNAVAILABLE: &str = "Unavailable";
pub const LOADING_DURATION: &str = "Loading duration...";
pub const LOADING_DISTANCE: &str = "Loading distance...";

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Weekdays shown on the chart, in display order.
pub const CHART_DAYS: [Weekday; 5] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub origin: String,
    pub destination: String,
    pub travel_mode: TravelMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TravelMode {
    #[default]
    Driving,
    Walking,
    Bicycling,
    Transit,
}

impl TravelMode {
    pub fn as_query(&self) -> &'static str {
        match self {
            TravelMode::Driving => "driving",
            TravelMode::Walking => "walking",
            TravelMode::Bicycling => "bicycling",
            TravelMode::Transit => "transit",
        }
    }
}

/// Display strings returned by a successful provider lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TravelTime {
    pub duration_text: String,
    pub distance_text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: NaiveDateTime,
    pub duration_minutes: u32,
}

impl Sample {
    pub fn parse(timestamp: NaiveDateTime, duration_text: &str) -> Result<Self, ValidationError> {
        Ok(Self {
            timestamp,
            duration_minutes: duration::parse_minutes(duration_text)?,
        })
    }

    pub fn weekday(&self) -> Weekday {
        self.timestamp.weekday()
    }

    /// Time of day as a fractional hour, at minute resolution (09:15 -> 9.25).
    pub fn hour_of_day(&self) -> f64 {
        hour_of_day(&self.timestamp)
    }
}

pub fn hour_of_day(timestamp: &NaiveDateTime) -> f64 {
    timestamp.hour() as f64 + timestamp.minute() as f64 / 60.0
}

pub fn weekday_label(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Mon",
        Weekday::Tue => "Tue",
        Weekday::Wed => "Wed",
        Weekday::Thu => "Thu",
        Weekday::Fri => "Fri",
        Weekday::Sat => "Sat",
        Weekday::Sun => "Sun",
    }
}

/// Weekday hours during which the provider may be polled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperatingWindow {
    pub start_hour: u32,
    pub end_hour: u32,
}

impl OperatingWindow {
    pub fn contains(&self, now: &NaiveDateTime) -> bool {
        let is_weekday = now.weekday().num_days_from_monday() < 5;
        is_weekday && (self.start_hour..self.end_hour).contains(&now.hour())
    }
}

impl Default for OperatingWindow {
    fn default() -> Self {
        Self {
            start_hour: 9,
            end_hour: 20,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorTier {
    Ok,
    Warn,
    Alert,
}

impl ColorTier {
    pub fn for_minutes(minutes: u32) -> Self {
        match minutes {
            0..=29 => ColorTier::Ok,
            30..=45 => ColorTier::Warn,
            _ => ColorTier::Alert,
        }
    }

    /// Tier for a display string, or `None` for placeholder and sentinel text.
    pub fn for_text(text: &str) -> Option<Self> {
        duration::parse_minutes(text).ok().map(Self::for_minutes)
    }
}
