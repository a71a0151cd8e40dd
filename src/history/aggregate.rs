use crate::core::models::{Sample, CHART_DAYS};
use chrono::Weekday;
use serde::Serialize;

const HOUR_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChartPoint {
    pub hour: f64,
    pub minutes: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DaySeries {
    pub weekday: Weekday,
    pub points: Vec<ChartPoint>,
}

impl DaySeries {
    pub fn peak(&self) -> Option<ChartPoint> {
        first_max(self.points.iter().copied(), |p| p.minutes)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PeakPoint {
    pub weekday: Weekday,
    pub hour: f64,
    pub minutes: u32,
}

/// Chart-ready view of the retained history: one series per working day,
/// each ordered by time of day, plus the single busiest moment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyChart {
    pub days: Vec<DaySeries>,
    pub peak: Option<PeakPoint>,
}

impl WeeklyChart {
    pub fn series(&self, weekday: Weekday) -> &[ChartPoint] {
        self.days
            .iter()
            .find(|d| d.weekday == weekday)
            .map(|d| d.points.as_slice())
            .unwrap_or(&[])
    }

    /// Durations observed at one weekday and time of day, in log order.
    pub fn bucket(&self, weekday: Weekday, hour: f64) -> Vec<u32> {
        self.series(weekday)
            .iter()
            .filter(|p| (p.hour - hour).abs() < HOUR_EPSILON)
            .map(|p| p.minutes)
            .collect()
    }

    pub fn total_points(&self) -> usize {
        self.days.iter().map(|d| d.points.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total_points() == 0
    }
}

impl Default for WeeklyChart {
    fn default() -> Self {
        rebuild(&[])
    }
}

pub fn rebuild(samples: &[Sample]) -> WeeklyChart {
    let mut days: Vec<DaySeries> = CHART_DAYS
        .iter()
        .map(|&weekday| DaySeries {
            weekday,
            points: Vec::new(),
        })
        .collect();

    let mut peak: Option<PeakPoint> = None;

    for sample in samples {
        let weekday = sample.weekday();
        let Some(series) = days.iter_mut().find(|d| d.weekday == weekday) else {
            continue;
        };

        let point = ChartPoint {
            hour: sample.hour_of_day(),
            minutes: sample.duration_minutes,
        };
        series.points.push(point);

        if peak.map_or(true, |p| point.minutes > p.minutes) {
            peak = Some(PeakPoint {
                weekday,
                hour: point.hour,
                minutes: point.minutes,
            });
        }
    }

    for series in &mut days {
        series.points.sort_by(|a, b| a.hour.total_cmp(&b.hour));
    }

    WeeklyChart { days, peak }
}

fn first_max<T>(items: impl Iterator<Item = T>, key: impl Fn(&T) -> u32) -> Option<T> {
    items.fold(None, |best, item| match best {
        Some(b) if key(&item) <= key(&b) => Some(b),
        _ => Some(item),
    })
}
